//! Capability catalog
//!
//! Authoritative, read-mostly source of model and provider metadata.
//! Readers take an immutable snapshot; admin-driven updates swap in a new
//! snapshot that is visible to the next lookup.

pub mod builtin;
pub mod profiles;

use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::path::Path;
use std::sync::{Arc, RwLock};

use anyhow::Context;
use tracing::{debug, info};

use crate::{
    error::{AppError, AppResult},
    types::{Capability, SubscriberTier, TaskCategory},
};

pub use profiles::{
    CatalogDocument, ModelComparison, ModelProfile, ProviderProfile, Recommendation,
};

/// Point-in-time view of the catalog
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    revision: u64,
    models: BTreeMap<String, ModelProfile>,
    providers: BTreeMap<String, ProviderProfile>,
}

impl CatalogSnapshot {
    fn from_document(document: CatalogDocument, revision: u64) -> Self {
        Self {
            revision,
            models: document
                .models
                .into_iter()
                .map(|m| (m.id.clone(), m))
                .collect(),
            providers: document
                .providers
                .into_iter()
                .map(|p| (p.id.clone(), p))
                .collect(),
        }
    }

    /// Monotonic counter bumped on every update
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn model(&self, model_id: &str) -> Option<&ModelProfile> {
        self.models.get(model_id)
    }

    /// All models, ordered by id
    pub fn models(&self) -> impl Iterator<Item = &ModelProfile> {
        self.models.values()
    }

    pub fn provider(&self, provider_id: &str) -> Option<&ProviderProfile> {
        self.providers.get(provider_id)
    }

    /// All providers, ordered by id
    pub fn providers(&self) -> impl Iterator<Item = &ProviderProfile> {
        self.providers.values()
    }

    pub fn enabled_providers(&self) -> impl Iterator<Item = &ProviderProfile> {
        self.providers.values().filter(|p| p.enabled)
    }

    /// Token counts that fit exactly the same enabled providers as `tokens`
    ///
    /// Context size is the only token-dependent eligibility rule, so a
    /// routing decision holds for every count in this range.
    pub fn context_band(&self, tokens: u64) -> RangeInclusive<u64> {
        let mut low = 1;
        let mut high = u64::MAX;
        for provider in self.enabled_providers() {
            if provider.max_tokens < tokens {
                low = low.max(provider.max_tokens + 1);
            } else {
                high = high.min(provider.max_tokens);
            }
        }
        low..=high
    }
}

/// Weights (quality, speed, cost) used to rank models for a task
fn task_weights(task: TaskCategory) -> (f64, f64, f64) {
    match task {
        TaskCategory::Chat => (0.4, 0.4, 0.2),
        TaskCategory::Code => (0.6, 0.2, 0.2),
        TaskCategory::Creative => (0.6, 0.1, 0.3),
        TaskCategory::Rag => (0.4, 0.3, 0.3),
        TaskCategory::Analysis => (0.7, 0.1, 0.2),
    }
}

/// Capability catalog service
pub struct CapabilityCatalog {
    current: RwLock<Arc<CatalogSnapshot>>,
}

impl CapabilityCatalog {
    /// Create a catalog from a document, rejecting invalid entries
    pub fn new(document: CatalogDocument) -> AppResult<Self> {
        document.validate()?;
        Ok(Self {
            current: RwLock::new(Arc::new(CatalogSnapshot::from_document(document, 1))),
        })
    }

    /// Create a catalog populated with the built-in models and providers
    pub fn with_defaults() -> AppResult<Self> {
        Self::new(builtin::default_document())
    }

    /// Load a JSON catalog document from disk
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let document = read_document(path)?;
        let catalog = Self::new(document)
            .with_context(|| format!("Invalid catalog file {}", path.display()))?;
        info!(path = %path.display(), "Catalog loaded from file");
        Ok(catalog)
    }

    /// Current snapshot; cheap to take, never blocks on writers for long
    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        self.current.read().unwrap().clone()
    }

    /// Look up a model by id
    pub fn lookup(&self, model_id: &str) -> AppResult<ModelProfile> {
        self.snapshot()
            .model(model_id)
            .cloned()
            .ok_or_else(|| AppError::ModelNotFound(model_id.to_string()))
    }

    /// Models carrying a capability tag, ordered by id
    pub fn filter_by_capability(&self, capability: Capability) -> Vec<ModelProfile> {
        self.snapshot()
            .models()
            .filter(|m| m.has_capability(capability))
            .cloned()
            .collect()
    }

    /// Quality, speed and cost of each requested model, in request order
    pub fn compare(&self, model_ids: &[String]) -> AppResult<Vec<ModelComparison>> {
        if model_ids.is_empty() {
            return Err(AppError::InvalidRequest(
                "at least one model id is required".to_string(),
            ));
        }

        let snapshot = self.snapshot();
        model_ids
            .iter()
            .map(|id| {
                snapshot
                    .model(id)
                    .map(|m| ModelComparison {
                        id: m.id.clone(),
                        quality: m.quality,
                        speed: m.speed,
                        cost: m.cost,
                    })
                    .ok_or_else(|| AppError::ModelNotFound(id.clone()))
            })
            .collect()
    }

    /// Rank the models a tier may use for a task
    ///
    /// Only models carrying the task's required capability are ranked. Score is a task-specific weighted sum of quality, speed and inverted
    /// cost. Ties go to the lower unit cost, then to the model id.
    pub fn recommend_for_task(
        &self,
        task: TaskCategory,
        tier: SubscriberTier,
    ) -> Vec<Recommendation> {
        let (w_quality, w_speed, w_cost) = task_weights(task);

        let mut ranked: Vec<Recommendation> = self
            .snapshot()
            .models()
            .filter(|m| tier.satisfies(m.min_tier))
            .filter(|m| m.has_capability(task.required_capability()))
            .map(|m| Recommendation {
                model_id: m.id.clone(),
                score: w_quality * m.quality + w_speed * m.speed + w_cost * (1.0 - m.cost),
                unit_cost: m.unit_cost,
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.unit_cost.total_cmp(&b.unit_cost))
                .then_with(|| a.model_id.cmp(&b.model_id))
        });

        debug!(task = %task, tier = %tier, count = ranked.len(), "Ranked models for task");
        ranked
    }

    /// Replace the whole provider table
    pub fn replace_providers(&self, providers: Vec<ProviderProfile>) -> AppResult<()> {
        profiles::validate_providers(&providers)?;
        self.update(|snapshot| {
            snapshot.providers = providers.into_iter().map(|p| (p.id.clone(), p)).collect();
        });
        Ok(())
    }

    /// Insert or replace a single provider
    pub fn upsert_provider(&self, provider: ProviderProfile) -> AppResult<()> {
        profiles::validate_provider(&provider)?;
        self.update(|snapshot| {
            snapshot.providers.insert(provider.id.clone(), provider);
        });
        Ok(())
    }

    /// Enable or disable a provider
    pub fn set_provider_enabled(&self, provider_id: &str, enabled: bool) -> AppResult<()> {
        if self.snapshot().provider(provider_id).is_none() {
            return Err(AppError::ProviderNotFound(provider_id.to_string()));
        }
        self.update(|snapshot| {
            if let Some(provider) = snapshot.providers.get_mut(provider_id) {
                provider.enabled = enabled;
            }
        });
        Ok(())
    }

    /// Replace the whole model table
    pub fn replace_models(&self, models: Vec<ModelProfile>) -> AppResult<()> {
        profiles::validate_models(&models)?;
        self.update(|snapshot| {
            snapshot.models = models.into_iter().map(|m| (m.id.clone(), m)).collect();
        });
        Ok(())
    }

    /// Re-read a catalog file and swap it in
    pub fn reload_from_file(&self, path: &Path) -> anyhow::Result<()> {
        let document = read_document(path)?;
        document
            .validate()
            .with_context(|| format!("Invalid catalog file {}", path.display()))?;
        self.update(|snapshot| {
            let revision = snapshot.revision;
            *snapshot = CatalogSnapshot::from_document(document, revision);
        });
        Ok(())
    }

    fn update(&self, apply: impl FnOnce(&mut CatalogSnapshot)) {
        let mut current = self.current.write().unwrap();
        let mut next = CatalogSnapshot::clone(&current);
        apply(&mut next);
        next.revision = current.revision + 1;
        info!(
            revision = next.revision,
            providers = next.providers.len(),
            models = next.models.len(),
            "Catalog updated"
        );
        *current = Arc::new(next);
    }
}

fn read_document(path: &Path) -> anyhow::Result<CatalogDocument> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse catalog file {}", path.display()))
}

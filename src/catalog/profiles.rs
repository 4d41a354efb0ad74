//! Catalog data models
//!
//! Model and provider profiles as they appear in a catalog document, plus the
//! result rows of catalog queries.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    types::{Capability, SubscriberTier},
};

fn default_context_window() -> u64 {
    8_192
}

fn default_enabled() -> bool {
    true
}

/// Task-independent description of a model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelProfile {
    pub id: String,
    pub family: String,
    /// Output quality in [0, 1]
    pub quality: f64,
    /// Generation speed in [0, 1]
    pub speed: f64,
    /// Relative expense in [0, 1], 1 being the most expensive model
    pub cost: f64,
    #[serde(default)]
    pub capabilities: BTreeSet<Capability>,
    /// Reference price per 1K tokens
    #[serde(default)]
    pub unit_cost: f64,
    #[serde(default = "default_context_window")]
    pub context_window: u64,
    #[serde(default)]
    pub min_tier: SubscriberTier,
}

impl ModelProfile {
    pub fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}

/// A routable backend serving one model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderProfile {
    pub id: String,
    pub model_id: String,
    /// Price per 1K tokens; 0 for local and free-tier providers
    pub unit_cost: f64,
    pub max_tokens: u64,
    pub baseline_latency_ms: u64,
    #[serde(default)]
    pub capabilities: BTreeSet<Capability>,
    #[serde(default)]
    pub min_tier: SubscriberTier,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Runs on-premise; the only kind eligible for private requests
    #[serde(default)]
    pub local: bool,
    /// Reachability endpoint probed by the health monitor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_url: Option<String>,
}

impl ProviderProfile {
    pub fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    pub fn is_free(&self) -> bool {
        self.unit_cost == 0.0
    }
}

/// Serialized form of a catalog (built-in defaults or a JSON file)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogDocument {
    #[serde(default)]
    pub models: Vec<ModelProfile>,
    #[serde(default)]
    pub providers: Vec<ProviderProfile>,
}

impl CatalogDocument {
    /// Check score ranges, prices and id uniqueness
    pub fn validate(&self) -> AppResult<()> {
        validate_models(&self.models)?;
        validate_providers(&self.providers)
    }
}

fn unit_interval(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

pub(crate) fn validate_models(models: &[ModelProfile]) -> AppResult<()> {
    let mut seen = HashSet::new();
    for model in models {
        if model.id.trim().is_empty() {
            return Err(AppError::InvalidRequest("model id must not be empty".into()));
        }
        if !seen.insert(model.id.as_str()) {
            return Err(AppError::InvalidRequest(format!(
                "duplicate model id '{}'",
                model.id
            )));
        }
        if !(unit_interval(model.quality) && unit_interval(model.speed) && unit_interval(model.cost))
        {
            return Err(AppError::InvalidRequest(format!(
                "scores of model '{}' must lie in [0, 1]",
                model.id
            )));
        }
        if !model.unit_cost.is_finite() || model.unit_cost < 0.0 {
            return Err(AppError::InvalidRequest(format!(
                "unit cost of model '{}' must be non-negative",
                model.id
            )));
        }
    }
    Ok(())
}

pub(crate) fn validate_providers(providers: &[ProviderProfile]) -> AppResult<()> {
    let mut seen = HashSet::new();
    for provider in providers {
        validate_provider(provider)?;
        if !seen.insert(provider.id.as_str()) {
            return Err(AppError::InvalidRequest(format!(
                "duplicate provider id '{}'",
                provider.id
            )));
        }
    }
    Ok(())
}

pub(crate) fn validate_provider(provider: &ProviderProfile) -> AppResult<()> {
    if provider.id.trim().is_empty() {
        return Err(AppError::InvalidRequest("provider id must not be empty".into()));
    }
    if !provider.unit_cost.is_finite() || provider.unit_cost < 0.0 {
        return Err(AppError::InvalidRequest(format!(
            "unit cost of provider '{}' must be non-negative",
            provider.id
        )));
    }
    if provider.max_tokens == 0 {
        return Err(AppError::InvalidRequest(format!(
            "max_tokens of provider '{}' must be positive",
            provider.id
        )));
    }
    Ok(())
}

/// One row of a model comparison table
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ModelComparison {
    pub id: String,
    pub quality: f64,
    pub speed: f64,
    pub cost: f64,
}

/// A ranked model recommendation for a task
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Recommendation {
    pub model_id: String,
    pub score: f64,
    pub unit_cost: f64,
}

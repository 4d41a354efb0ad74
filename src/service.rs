//! Routing service
//!
//! Entry point used by the gateway: wraps the pure routing engine with the
//! live catalog, the health monitor and the decision cache.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

use crate::{
    cache::{CacheStatus, DecisionCache, Fingerprint, TokenRange},
    catalog::{CapabilityCatalog, ModelProfile, ProviderProfile},
    error::{AppError, AppResult},
    health::{HealthMonitor, HealthStatus},
    routes::metrics,
    routing::{self, RoutingEngine},
    types::{Credentials, ProviderChoice, RoutingRequest},
};

/// Provider selection with health awareness and decision caching
pub struct RoutingService {
    catalog: Arc<CapabilityCatalog>,
    monitor: Arc<HealthMonitor>,
    engine: RoutingEngine,
    cache: DecisionCache,
}

impl RoutingService {
    pub fn new(
        catalog: Arc<CapabilityCatalog>,
        monitor: Arc<HealthMonitor>,
        engine: RoutingEngine,
        cache: DecisionCache,
    ) -> Self {
        Self {
            catalog,
            monitor,
            engine,
            cache,
        }
    }

    pub fn catalog(&self) -> &Arc<CapabilityCatalog> {
        &self.catalog
    }

    pub fn monitor(&self) -> &Arc<HealthMonitor> {
        &self.monitor
    }

    pub fn engine(&self) -> &RoutingEngine {
        &self.engine
    }

    pub fn cache(&self) -> &DecisionCache {
        &self.cache
    }

    /// Choose a provider for `request`
    ///
    /// Decisions are cached per fingerprint and per range of token counts
    /// that fit the same providers. A cached decision is repriced for the
    /// actual token count, and dropped if its primary has since gone down.
    #[instrument(skip_all, fields(task = %request.task, tier = %request.tier, tokens = request.estimated_tokens))]
    pub async fn select_provider(
        &self,
        request: &RoutingRequest,
        credentials: &Credentials,
    ) -> AppResult<ProviderChoice> {
        request.validate()?;

        let key = Fingerprint::of(request, credentials, self.engine.budget_constrained(request));
        match self.resolve(request, credentials, &key).await {
            Ok((choice, status)) => {
                metrics::record_decision("selected", &choice.provider_id, status.as_str());
                info!(
                    provider = %choice.provider_id,
                    model = %choice.model_id,
                    cost = choice.estimated_cost,
                    byok = choice.is_byok,
                    cache = status.as_str(),
                    "Provider selected"
                );
                Ok(choice)
            }
            Err(e) => {
                metrics::record_decision("rejected", "", "miss");
                warn!(error = %e, "No provider selected");
                Err(e)
            }
        }
    }

    async fn resolve(
        &self,
        request: &RoutingRequest,
        credentials: &Credentials,
        key: &Fingerprint,
    ) -> AppResult<(ProviderChoice, CacheStatus)> {
        let tokens = request.estimated_tokens;
        let compute = || self.compute(request, credentials, key);
        let (mut choice, status) = self.cache.get_or_compute(key, tokens, compute).await?;
        metrics::record_cache_operation("lookup", status.as_str());
        if status == CacheStatus::Miss {
            return Ok((choice, status));
        }

        let health = self.monitor.snapshot();
        if !health.is_available(&choice.provider_id) {
            debug!(provider = %choice.provider_id, "Cached primary is down, recomputing");
            metrics::record_cache_operation("invalidate", "primary_down");
            self.cache.invalidate(key);
            let compute = || self.compute(request, credentials, key);
            let (fresh, _) = self.cache.get_or_compute(key, tokens, compute).await?;
            return Ok((fresh, CacheStatus::Miss));
        }

        let catalog = self.catalog.snapshot();
        choice.fallback_chain.retain(|id| {
            health.is_available(id)
                && catalog
                    .provider(id)
                    .is_some_and(|p| p.enabled && tokens <= p.max_tokens)
        });
        choice.estimated_cost = if choice.is_byok {
            0.0
        } else {
            choice.unit_cost * tokens as f64 / 1000.0
        };
        Ok((choice, status))
    }

    fn compute(
        &self,
        request: &RoutingRequest,
        credentials: &Credentials,
        key: &Fingerprint,
    ) -> AppResult<(ProviderChoice, TokenRange)> {
        let catalog = self.catalog.snapshot();
        let health = self.monitor.snapshot();
        let mut choice = self.engine.select(request, credentials, &catalog, &health)?;
        choice.fingerprint = Some(key.to_string());
        Ok((choice, catalog.context_band(request.estimated_tokens)))
    }

    /// Platform cost of serving `request` with `provider_id`
    pub fn estimate_cost(
        &self,
        request: &RoutingRequest,
        provider_id: &str,
        byok: bool,
    ) -> AppResult<f64> {
        request.validate()?;
        let catalog = self.catalog.snapshot();
        let provider = catalog
            .provider(provider_id)
            .ok_or_else(|| AppError::ProviderNotFound(provider_id.to_string()))?;
        Ok(routing::estimate_cost(request, provider, byok))
    }

    pub fn report_outcome(&self, provider_id: &str, success: bool, latency: Duration) -> AppResult<()> {
        self.monitor.report_outcome(provider_id, success, latency)
    }

    pub fn get_status(&self, provider_id: &str) -> HealthStatus {
        self.monitor.get_status(provider_id)
    }

    pub fn list_healthy(&self) -> Vec<String> {
        self.monitor.list_healthy().into_iter().collect()
    }

    /// Replace the provider set
    ///
    /// Health state of removed providers is dropped and every cached
    /// decision is invalidated.
    pub fn update_providers(&self, providers: Vec<ProviderProfile>) -> AppResult<()> {
        self.catalog.replace_providers(providers)?;
        self.after_catalog_change();
        Ok(())
    }

    pub fn upsert_provider(&self, provider: ProviderProfile) -> AppResult<()> {
        self.catalog.upsert_provider(provider)?;
        self.after_catalog_change();
        Ok(())
    }

    /// Replace the model table
    ///
    /// Cached decisions scored against the old quality values are dropped.
    pub fn update_models(&self, models: Vec<ModelProfile>) -> AppResult<()> {
        self.catalog.replace_models(models)?;
        self.after_catalog_change();
        Ok(())
    }

    pub fn set_provider_enabled(&self, provider_id: &str, enabled: bool) -> AppResult<()> {
        self.catalog.set_provider_enabled(provider_id, enabled)?;
        self.after_catalog_change();
        Ok(())
    }

    /// Reload the whole catalog from a JSON document on disk
    pub fn reload_catalog(&self, path: &Path) -> anyhow::Result<()> {
        self.catalog.reload_from_file(path)?;
        self.after_catalog_change();
        Ok(())
    }

    fn after_catalog_change(&self) {
        let catalog = self.catalog.snapshot();
        self.monitor
            .retain_providers(catalog.providers().map(|p| p.id.as_str()));
        self.cache.invalidate_all();
        metrics::record_cache_operation("invalidate", "catalog_update");
    }

    /// Drop cached decisions whose primary goes down, and purge expired
    /// entries every `purge_interval`
    pub fn spawn_invalidation_listener(self: &Arc<Self>, purge_interval: Duration) -> JoinHandle<()> {
        let service = Arc::clone(self);
        let mut changes = self.monitor.subscribe();

        tokio::spawn(async move {
            let mut purge = tokio::time::interval(purge_interval);
            purge.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            purge.tick().await;

            loop {
                tokio::select! {
                    change = changes.recv() => match change {
                        Ok(change) if change.to == HealthStatus::Down => {
                            let dropped = service.cache.invalidate_provider(&change.provider_id);
                            if dropped > 0 {
                                metrics::record_cache_operation("invalidate", "provider_down");
                            }
                        }
                        Ok(_) => {}
                        Err(RecvError::Lagged(missed)) => {
                            warn!(missed, "Missed status changes, invalidating all cached decisions");
                            service.cache.invalidate_all();
                        }
                        Err(RecvError::Closed) => break,
                    },
                    _ = purge.tick() => {
                        let purged = service.cache.purge_expired();
                        if purged > 0 {
                            debug!(purged, "Purged expired routing decisions");
                        }
                    }
                }
            }
            debug!("Invalidation listener stopped");
        })
    }
}

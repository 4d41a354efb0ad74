//! Routewise - provider selection for a multi-backend LLM gateway
//!
//! This library decides which LLM provider serves each request. It keeps a
//! capability catalog of models and providers, tracks provider health in the
//! background, scores eligible providers against the caller's trade-off, and
//! caches decisions for identical requests.

pub mod cache;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod error;
pub mod health;
pub mod routes;
pub mod routing;
pub mod service;
pub mod types;

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};

pub use crate::cache::DecisionCache;
pub use crate::catalog::CapabilityCatalog;
pub use crate::clock::{Clock, SystemClock};
pub use crate::config::Config;
pub use crate::health::{HealthMonitor, HealthProbe, HttpHealthProbe};
pub use crate::routing::RoutingEngine;
pub use crate::service::RoutingService;

/// Application state shared across all request handlers
pub struct AppState {
    pub config: Config,
    pub service: Arc<RoutingService>,
    pub start_time: Instant,
}

impl AppState {
    /// Create a new application state
    ///
    /// Loads the catalog from `config.catalog_path` when set, otherwise uses
    /// the built-in catalog. Providers are probed over HTTP.
    pub fn new(config: Config) -> Result<Self> {
        let catalog = match &config.catalog_path {
            Some(path) => CapabilityCatalog::from_file(path)?,
            None => CapabilityCatalog::with_defaults().context("Invalid built-in catalog")?,
        };

        // Probe client; the per-probe bound is enforced by the monitor
        let http_client = reqwest::Client::builder()
            .pool_max_idle_per_host(10)
            .timeout(config.health.probe_timeout)
            .build()?;
        let probe: Arc<dyn HealthProbe> = Arc::new(HttpHealthProbe::new(http_client));

        Ok(Self::with_parts(
            config,
            Arc::new(catalog),
            probe,
            Arc::new(SystemClock),
        ))
    }

    fn with_parts(
        config: Config,
        catalog: Arc<CapabilityCatalog>,
        probe: Arc<dyn HealthProbe>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let monitor = Arc::new(HealthMonitor::new(
            catalog.clone(),
            probe,
            clock.clone(),
            config.health.clone(),
        ));
        let service = RoutingService::new(
            catalog,
            monitor,
            RoutingEngine::new(config.routing.clone()),
            DecisionCache::new(config.cache_ttl, clock),
        );

        Self {
            config,
            service: Arc::new(service),
            start_time: Instant::now(),
        }
    }

    /// Create an application state with an injected probe and clock
    #[cfg(any(test, feature = "test-utils"))]
    pub fn new_for_testing(
        config: Config,
        catalog: Arc<CapabilityCatalog>,
        probe: Arc<dyn HealthProbe>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::with_parts(config, catalog, probe, clock)
    }
}

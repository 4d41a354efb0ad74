//! Common test utilities for Routewise
//!
//! Shared fixtures: a catalog, a routing service with an injected clock and
//! probe, and an HTTP test server over the full router.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum_test::TestServer;

use routewise::{
    cache::DecisionCache,
    catalog::{builtin::default_document, CapabilityCatalog, CatalogDocument, ProviderProfile},
    clock::ManualClock,
    health::{HealthConfig, HealthMonitor, HealthProbe, ProbeOutcome},
    routes::create_router,
    routing::{RoutingConfig, RoutingEngine},
    service::RoutingService,
    types::{Capability, SubscriberTier},
    AppState, Config,
};

/// Probe that always succeeds and counts calls
#[derive(Default)]
pub struct CountingProbe {
    pub calls: AtomicUsize,
}

impl CountingProbe {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HealthProbe for CountingProbe {
    async fn probe(&self, _provider: &ProviderProfile) -> ProbeOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        ProbeOutcome::success(Duration::from_millis(5))
    }
}

/// Test configuration with defaults for every component
pub fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        catalog_path: None,
        health: HealthConfig::default(),
        routing: RoutingConfig::default(),
        cache_ttl: Duration::from_secs(300),
    }
}

/// A provider profile with general capabilities
pub fn provider(id: &str, model_id: &str, unit_cost: f64, latency_ms: u64, local: bool) -> ProviderProfile {
    ProviderProfile {
        id: id.to_string(),
        model_id: model_id.to_string(),
        unit_cost,
        max_tokens: 16_384,
        baseline_latency_ms: latency_ms,
        capabilities: [
            Capability::Chat,
            Capability::Code,
            Capability::Creative,
            Capability::Retrieval,
            Capability::Analysis,
        ]
        .into_iter()
        .collect(),
        min_tier: SubscriberTier::Free,
        enabled: true,
        local,
        health_url: None,
    }
}

pub struct TestHarness {
    pub catalog: Arc<CapabilityCatalog>,
    pub monitor: Arc<HealthMonitor>,
    pub service: Arc<RoutingService>,
    pub clock: Arc<ManualClock>,
    pub probe: Arc<CountingProbe>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_document(default_document())
    }

    pub fn with_document(document: CatalogDocument) -> Self {
        let catalog = Arc::new(CapabilityCatalog::new(document).expect("valid catalog"));
        let clock = Arc::new(ManualClock::default());
        let probe = Arc::new(CountingProbe::default());
        let monitor = Arc::new(HealthMonitor::new(
            catalog.clone(),
            probe.clone(),
            clock.clone(),
            HealthConfig::default(),
        ));
        let service = Arc::new(RoutingService::new(
            catalog.clone(),
            monitor.clone(),
            RoutingEngine::default(),
            DecisionCache::new(Duration::from_secs(300), clock.clone()),
        ));

        Self {
            catalog,
            monitor,
            service,
            clock,
            probe,
        }
    }

    /// Report enough consecutive failures to mark `provider_id` DOWN
    pub fn force_down(&self, provider_id: &str) {
        for _ in 0..self.monitor.config().down_after_failures {
            self.service
                .report_outcome(provider_id, false, Duration::from_millis(50))
                .expect("known provider");
        }
    }
}

/// Test server over the full router with the built-in catalog
pub fn test_server() -> TestServer {
    let catalog = Arc::new(CapabilityCatalog::with_defaults().expect("valid catalog"));
    let state = AppState::new_for_testing(
        test_config(),
        catalog,
        Arc::new(CountingProbe::default()),
        Arc::new(ManualClock::default()),
    );
    TestServer::new(create_router(Arc::new(state))).expect("test server")
}

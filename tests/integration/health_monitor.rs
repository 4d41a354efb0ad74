//! Health monitor integration tests
//!
//! Probe scheduling under tokio's paused clock and the HTTP probe against a
//! mock health surface.

use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use routewise::{
    catalog::{CapabilityCatalog, CatalogDocument},
    clock::ManualClock,
    health::{HealthConfig, HealthMonitor, HealthProbe, HealthStatus, HttpHealthProbe},
    types::{Credentials, RoutingRequest, SubscriberTier, TaskCategory},
};

use crate::common::{provider, TestHarness};

#[tokio::test(start_paused = true)]
async fn test_probes_run_every_interval_until_stopped() {
    let harness = TestHarness::new();
    let probed = harness.catalog.snapshot().enabled_providers().count();

    let handle = harness.monitor.start();

    // First cycle runs immediately
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(harness.probe.calls(), probed);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(harness.probe.calls(), probed * 2);

    handle.stop().await;
    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(harness.probe.calls(), probed * 2);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_handle_stops_probing() {
    let harness = TestHarness::new();
    let probed = harness.catalog.snapshot().enabled_providers().count();

    let handle = harness.monitor.start();
    tokio::time::sleep(Duration::from_millis(1)).await;
    drop(handle);

    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(harness.probe.calls(), probed);
}

fn mock_catalog(server: &MockServer) -> Arc<CapabilityCatalog> {
    let mut up = provider("up", "up-model", 0.0, 100, false);
    up.health_url = Some(format!("{}/up", server.uri()));
    let mut flaky = provider("flaky", "flaky-model", 0.0, 100, false);
    flaky.health_url = Some(format!("{}/flaky", server.uri()));
    let unprobed = provider("unprobed", "unprobed-model", 0.0, 100, false);

    Arc::new(
        CapabilityCatalog::new(CatalogDocument {
            models: vec![],
            providers: vec![up, flaky, unprobed],
        })
        .unwrap(),
    )
}

#[tokio::test]
async fn test_http_probe_treats_2xx_as_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/up"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let catalog = mock_catalog(&server);
    let probe = HttpHealthProbe::new(reqwest::Client::new());
    let snapshot = catalog.snapshot();

    assert!(probe.probe(snapshot.provider("up").unwrap()).await.success);
    assert!(!probe.probe(snapshot.provider("flaky").unwrap()).await.success);
}

#[tokio::test]
async fn test_failing_health_surface_marks_provider_down() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/up"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let monitor = HealthMonitor::new(
        mock_catalog(&server),
        Arc::new(HttpHealthProbe::new(reqwest::Client::new())),
        Arc::new(ManualClock::default()),
        HealthConfig::default(),
    );
    let mut changes = monitor.subscribe();

    for _ in 0..3 {
        // Providers without a health URL are skipped
        assert_eq!(monitor.run_cycle().await, 2);
    }

    assert_eq!(monitor.get_status("up"), HealthStatus::Healthy);
    assert_eq!(monitor.get_status("flaky"), HealthStatus::Down);
    assert_eq!(monitor.get_status("unprobed"), HealthStatus::Healthy);
    assert!(monitor.snapshot().get("unprobed").is_none());

    let mut flaky = Vec::new();
    while let Ok(change) = changes.try_recv() {
        assert_eq!(change.provider_id, "flaky");
        flaky.push(change.to);
    }
    assert_eq!(flaky, vec![HealthStatus::Degraded, HealthStatus::Down]);

    let healthy: Vec<_> = monitor.list_healthy().into_iter().collect();
    assert_eq!(healthy, vec!["unprobed".to_string(), "up".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_routing_never_waits_on_a_probe() {
    let harness = TestHarness::new();
    let request = RoutingRequest::new(TaskCategory::Chat, 100, SubscriberTier::Pro);

    harness
        .service
        .select_provider(&request, &Credentials::new())
        .await
        .unwrap();
    assert_eq!(harness.probe.calls(), 0);
}

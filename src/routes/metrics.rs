//! Prometheus metrics endpoint
//!
//! Exposes routing, cache and health metrics in Prometheus format.

use axum::response::IntoResponse;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;

use crate::health::HealthStatus;

/// Global Prometheus handle for metrics export
static PROMETHEUS_HANDLE: Lazy<PrometheusHandle> = Lazy::new(|| {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
});

/// Initialize metrics (call once at startup)
pub fn init_metrics() {
    let _ = &*PROMETHEUS_HANDLE;
    register_metrics();
}

fn register_metrics() {
    metrics::describe_counter!(
        "routewise_decisions_total",
        "Routing decisions by outcome"
    );
    metrics::describe_counter!(
        "routewise_cache_operations_total",
        "Decision cache operations"
    );
    metrics::describe_counter!(
        "routewise_health_probes_total",
        "Health probes by provider and result"
    );
    metrics::describe_gauge!(
        "routewise_provider_status",
        "Provider status (2 healthy, 1 degraded, 0 down)"
    );
}

/// Prometheus metrics endpoint handler
pub async fn prometheus_metrics() -> impl IntoResponse {
    PROMETHEUS_HANDLE.render()
}

/// Record a routing decision
///
/// `outcome` is `selected` or `rejected`; `provider` is empty on rejection.
pub fn record_decision(outcome: &str, provider: &str, cache: &str) {
    metrics::counter!(
        "routewise_decisions_total",
        "outcome" => outcome.to_string(),
        "provider" => provider.to_string(),
        "cache" => cache.to_string()
    )
    .increment(1);
}

/// Record cache operation
pub fn record_cache_operation(operation: &str, result: &str) {
    metrics::counter!(
        "routewise_cache_operations_total",
        "operation" => operation.to_string(),
        "result" => result.to_string()
    )
    .increment(1);
}

/// Record one probe result
pub fn record_probe(provider: &str, success: bool) {
    let result = if success { "success" } else { "failure" };
    metrics::counter!(
        "routewise_health_probes_total",
        "provider" => provider.to_string(),
        "result" => result
    )
    .increment(1);
}

/// Publish the current status of a provider
pub fn set_provider_status(provider: &str, status: HealthStatus) {
    metrics::gauge!("routewise_provider_status", "provider" => provider.to_string())
        .set(status.as_gauge());
}

//! Health check endpoints
//!
//! Provides endpoints for monitoring and container orchestration:
//! - `/health` - Service health with provider availability summary
//! - `/health/live` - Liveness probe
//! - `/v1/providers/health` - Per-provider health as seen by the router

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::{
    error::{AppError, AppResult},
    health::{HealthStatus, ProviderHealth},
    AppState,
};

/// Overall service status
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Counts of enabled providers by status
#[derive(Debug, Default, Serialize)]
pub struct ProviderSummary {
    pub healthy: usize,
    pub degraded: usize,
    pub down: usize,
}

/// Full health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: ServiceStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub timestamp: String,
    pub catalog_revision: u64,
    pub providers: ProviderSummary,
    pub cached_decisions: usize,
}

/// Simple health response for liveness
#[derive(Debug, Serialize)]
pub struct SimpleHealthResponse {
    pub status: ServiceStatus,
}

/// Health of every cataloged provider
#[derive(Debug, Serialize)]
pub struct ProviderHealthList {
    pub providers: Vec<ProviderHealth>,
    /// Enabled providers currently usable for routing
    pub healthy: Vec<String>,
}

/// Full health check endpoint
///
/// Unhealthy (503) when no enabled provider is usable, degraded when some
/// provider is degraded or down.
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthResponse>) {
    let catalog = state.service.catalog().snapshot();
    let health = state.service.monitor().snapshot();

    let mut summary = ProviderSummary::default();
    for provider in catalog.enabled_providers() {
        match health.status(&provider.id) {
            HealthStatus::Healthy => summary.healthy += 1,
            HealthStatus::Degraded => summary.degraded += 1,
            HealthStatus::Down => summary.down += 1,
        }
    }

    let overall_status = if summary.healthy + summary.degraded == 0 {
        ServiceStatus::Unhealthy
    } else if summary.degraded + summary.down > 0 {
        ServiceStatus::Degraded
    } else {
        ServiceStatus::Healthy
    };

    let status_code = match overall_status {
        ServiceStatus::Healthy | ServiceStatus::Degraded => StatusCode::OK,
        ServiceStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    let response = HealthResponse {
        status: overall_status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        catalog_revision: catalog.revision(),
        providers: summary,
        cached_decisions: state.service.cache().len(),
    };

    (status_code, Json(response))
}

/// Liveness probe endpoint
pub async fn liveness_check() -> (StatusCode, Json<SimpleHealthResponse>) {
    (
        StatusCode::OK,
        Json(SimpleHealthResponse {
            status: ServiceStatus::Healthy,
        }),
    )
}

/// GET /v1/providers/health
pub async fn list_provider_health(State(state): State<Arc<AppState>>) -> Json<ProviderHealthList> {
    let catalog = state.service.catalog().snapshot();
    let health = state.service.monitor().snapshot();

    let providers = catalog
        .providers()
        .map(|p| {
            health
                .get(&p.id)
                .cloned()
                .unwrap_or_else(|| ProviderHealth::unprobed(&p.id))
        })
        .collect();

    Json(ProviderHealthList {
        providers,
        healthy: state.service.list_healthy(),
    })
}

/// GET /v1/providers/:provider_id/health
pub async fn get_provider_health(
    State(state): State<Arc<AppState>>,
    Path(provider_id): Path<String>,
) -> AppResult<Json<ProviderHealth>> {
    if state.service.catalog().snapshot().provider(&provider_id).is_none() {
        return Err(AppError::ProviderNotFound(provider_id));
    }

    let health = state
        .service
        .monitor()
        .snapshot()
        .get(&provider_id)
        .cloned()
        .unwrap_or_else(|| ProviderHealth::unprobed(&provider_id));
    Ok(Json(health))
}

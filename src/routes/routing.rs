//! Routing endpoints
//!
//! Provider selection, cost estimation and call outcome feedback.

use std::sync::Arc;
use std::time::Duration;

use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppResult,
    types::{Credentials, ProviderChoice, RoutingRequest},
    AppState,
};

use super::parse_body;

/// Body of `POST /v1/route`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteRequest {
    pub request: RoutingRequest,
    /// Providers the caller holds its own API key for
    #[serde(default)]
    pub credentials: Credentials,
}

/// Body of `POST /v1/route/estimate`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimateRequest {
    pub request: RoutingRequest,
    pub provider: String,
    #[serde(default)]
    pub byok: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EstimateResponse {
    pub provider: String,
    pub cost: f64,
    pub is_byok: bool,
}

/// Body of `POST /v1/outcomes`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeReport {
    pub provider: String,
    pub success: bool,
    #[serde(default)]
    pub latency_ms: u64,
}

/// POST /v1/route
pub async fn select_provider(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> AppResult<Json<ProviderChoice>> {
    let RouteRequest {
        request,
        credentials,
    } = parse_body(&body)?;
    let choice = state.service.select_provider(&request, &credentials).await?;
    Ok(Json(choice))
}

/// POST /v1/route/estimate
pub async fn estimate_cost(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> AppResult<Json<EstimateResponse>> {
    let estimate: EstimateRequest = parse_body(&body)?;
    let cost = state
        .service
        .estimate_cost(&estimate.request, &estimate.provider, estimate.byok)?;
    Ok(Json(EstimateResponse {
        provider: estimate.provider,
        cost,
        is_byok: estimate.byok,
    }))
}

/// POST /v1/outcomes
pub async fn report_outcome(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> AppResult<StatusCode> {
    let report: OutcomeReport = parse_body(&body)?;
    state.service.report_outcome(
        &report.provider,
        report.success,
        Duration::from_millis(report.latency_ms),
    )?;
    Ok(StatusCode::NO_CONTENT)
}

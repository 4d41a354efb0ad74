//! HTTP routes for Routewise
//!
//! This module defines all HTTP endpoints exposed by the routing sidecar.

pub mod health;
pub mod metrics;
pub mod models;
pub mod routing;

use std::sync::Arc;

use axum::{
    body::Bytes,
    routing::{get, post},
    Router,
};
use serde::de::DeserializeOwned;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    error::{AppError, AppResult},
    AppState,
};

/// Parse a JSON request body, reporting failures as invalid requests
pub(crate) fn parse_body<T: DeserializeOwned>(body: &Bytes) -> AppResult<T> {
    serde_json::from_slice(body)
        .map_err(|e| AppError::InvalidRequest(format!("Invalid request body: {}", e)))
}

/// Create the main application router
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/v1/route", post(routing::select_provider))
        .route("/v1/route/estimate", post(routing::estimate_cost))
        .route("/v1/outcomes", post(routing::report_outcome))
        .route("/v1/providers/health", get(health::list_provider_health))
        .route("/v1/providers/:provider_id/health", get(health::get_provider_health))
        .route("/v1/models", get(models::list_models))
        .route("/v1/models/compare", post(models::compare_models))
        .route("/v1/models/recommend", get(models::recommend_model))
        .route("/v1/models/:model_id", get(models::get_model));

    // Public routes (health checks, metrics)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/live", get(health::liveness_check))
        .route("/metrics", get(metrics::prometheus_metrics));

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

//! Model catalog endpoints
//!
//! Read-only queries over the capability catalog.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    catalog::{ModelComparison, ModelProfile, Recommendation},
    error::AppResult,
    types::{Capability, SubscriberTier, TaskCategory},
    AppState,
};

use super::parse_body;

#[derive(Debug, Deserialize)]
pub struct ModelsQuery {
    pub capability: Option<String>,
}

/// Models list response
#[derive(Debug, Clone, Serialize)]
pub struct ModelsResponse {
    pub revision: u64,
    pub data: Vec<ModelProfile>,
}

/// Body of `POST /v1/models/compare`
#[derive(Debug, Deserialize)]
pub struct CompareRequest {
    pub models: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CompareResponse {
    pub data: Vec<ModelComparison>,
}

#[derive(Debug, Deserialize)]
pub struct RecommendQuery {
    pub task: String,
    pub tier: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecommendResponse {
    pub task: TaskCategory,
    pub tier: SubscriberTier,
    pub data: Vec<Recommendation>,
}

/// GET /v1/models
///
/// Every cataloged model, or only those tagged with `?capability=`.
pub async fn list_models(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ModelsQuery>,
) -> AppResult<Json<ModelsResponse>> {
    let catalog = state.service.catalog();
    let data = match query.capability {
        Some(raw) => catalog.filter_by_capability(raw.parse::<Capability>()?),
        None => catalog.snapshot().models().cloned().collect(),
    };

    Ok(Json(ModelsResponse {
        revision: catalog.snapshot().revision(),
        data,
    }))
}

/// GET /v1/models/:model_id
pub async fn get_model(
    State(state): State<Arc<AppState>>,
    Path(model_id): Path<String>,
) -> AppResult<Json<ModelProfile>> {
    Ok(Json(state.service.catalog().lookup(&model_id)?))
}

/// POST /v1/models/compare
pub async fn compare_models(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> AppResult<Json<CompareResponse>> {
    let request: CompareRequest = parse_body(&body)?;
    let data = state.service.catalog().compare(&request.models)?;
    Ok(Json(CompareResponse { data }))
}

/// GET /v1/models/recommend
pub async fn recommend_model(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RecommendQuery>,
) -> AppResult<Json<RecommendResponse>> {
    let task: TaskCategory = query.task.parse()?;
    let tier = match query.tier {
        Some(raw) => raw.parse()?,
        None => SubscriberTier::default(),
    };

    let data = state.service.catalog().recommend_for_task(task, tier);
    Ok(Json(RecommendResponse { task, tier, data }))
}

//! HTTP endpoint integration tests
//!
//! Exercises the full router over the built-in catalog:
//! - POST /v1/route, /v1/route/estimate, /v1/outcomes
//! - GET /v1/providers/health, /v1/providers/:id/health
//! - GET /v1/models, /v1/models/:id, /v1/models/recommend, POST /v1/models/compare
//! - GET /health, /health/live, /metrics

use axum::http::StatusCode;
use serde_json::{json, Value};

use crate::common::test_server;

#[tokio::test]
async fn test_liveness() {
    let server = test_server();
    let response = server.get("/health/live").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], "healthy");
}

#[tokio::test]
async fn test_health_reports_provider_summary() {
    let server = test_server();
    let response = server.get("/health").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["providers"]["healthy"], 8);
    assert_eq!(body["providers"]["down"], 0);
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_route_returns_choice() {
    let server = test_server();
    let response = server
        .post("/v1/route")
        .json(&json!({
            "request": {
                "task": "code",
                "estimated_tokens": 2000,
                "tier": "trial",
                "tradeoff": "eco"
            }
        }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["estimated_cost"], 0.0);
    assert_eq!(body["is_byok"], false);
    assert!(body["provider_id"].is_string());
    assert!(body["fallback_chain"].is_array());
    assert!(body["fingerprint"].is_string());
}

#[tokio::test]
async fn test_route_private_request_is_local() {
    let server = test_server();
    let response = server
        .post("/v1/route")
        .json(&json!({
            "request": {
                "task": "chat",
                "estimated_tokens": 500,
                "tier": "enterprise",
                "privacy": true,
                "remaining_budget": 500.0,
                "tradeoff": "precision"
            }
        }))
        .await;
    response.assert_status_ok();

    let provider = response.json::<Value>()["provider_id"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(["ollama-llama3", "ollama-qwen-coder", "vllm-mistral"].contains(&provider.as_str()));
}

#[tokio::test]
async fn test_route_rejects_unknown_enum_value() {
    let server = test_server();
    let response = server
        .post("/v1/route")
        .json(&json!({
            "request": { "task": "poetry", "estimated_tokens": 100, "tier": "pro" }
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"]["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn test_route_rejects_zero_tokens() {
    let server = test_server();
    let response = server
        .post("/v1/route")
        .json(&json!({
            "request": { "task": "chat", "estimated_tokens": 0, "tier": "pro" }
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_route_without_eligible_provider() {
    let server = test_server();
    let response = server
        .post("/v1/route")
        .json(&json!({
            "request": {
                "task": "code",
                "estimated_tokens": 1000,
                "tier": "pro",
                "model_override": "no-such-model"
            }
        }))
        .await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        response.json::<Value>()["error"]["code"],
        "NO_ELIGIBLE_PROVIDER"
    );
}

#[tokio::test]
async fn test_estimate_cost() {
    let server = test_server();
    let request = json!({ "task": "chat", "estimated_tokens": 2000, "tier": "pro" });

    let response = server
        .post("/v1/route/estimate")
        .json(&json!({ "request": request, "provider": "openai-gpt4o" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert!((body["cost"].as_f64().unwrap() - 0.01).abs() < 1e-9);
    assert_eq!(body["is_byok"], false);

    let response = server
        .post("/v1/route/estimate")
        .json(&json!({ "request": request, "provider": "openai-gpt4o", "byok": true }))
        .await;
    assert_eq!(response.json::<Value>()["cost"], 0.0);

    server
        .post("/v1/route/estimate")
        .json(&json!({ "request": request, "provider": "nope" }))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_outcomes_update_provider_health() {
    let server = test_server();

    for _ in 0..3 {
        server
            .post("/v1/outcomes")
            .json(&json!({ "provider": "anthropic-haiku", "success": false, "latency_ms": 900 }))
            .await
            .assert_status(StatusCode::NO_CONTENT);
    }

    let response = server.get("/v1/providers/anthropic-haiku/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "down");
    assert_eq!(body["consecutive_failures"], 3);

    let list: Value = server.get("/v1/providers/health").await.json();
    let healthy = list["healthy"].as_array().unwrap();
    assert!(!healthy.contains(&json!("anthropic-haiku")));
    assert_eq!(list["providers"].as_array().unwrap().len(), 8);

    let summary: Value = server.get("/health").await.json();
    assert_eq!(summary["status"], "degraded");
    assert_eq!(summary["providers"]["down"], 1);
}

#[tokio::test]
async fn test_outcome_for_unknown_provider() {
    let server = test_server();
    server
        .post("/v1/outcomes")
        .json(&json!({ "provider": "nope", "success": true }))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    server
        .get("/v1/providers/nope/health")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_models_filtered_by_capability() {
    let server = test_server();
    let response = server
        .get("/v1/models")
        .add_query_param("capability", "vision")
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    let models = body["data"].as_array().unwrap();
    assert!(!models.is_empty());
    for model in models {
        let capabilities = model["capabilities"].as_array().unwrap();
        assert!(capabilities.contains(&json!("vision")));
    }

    server
        .get("/v1/models")
        .add_query_param("capability", "telepathy")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_model_lookup() {
    let server = test_server();
    let response = server.get("/v1/models/gpt-4o").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["id"], "gpt-4o");

    let response = server.get("/v1/models/no-such-model").await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["error"]["code"], "MODEL_NOT_FOUND");
}

#[tokio::test]
async fn test_compare_models() {
    let server = test_server();
    let response = server
        .post("/v1/models/compare")
        .json(&json!({ "models": ["gpt-4o", "llama3-8b"] }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["id"], "gpt-4o");
    assert_eq!(rows[1]["id"], "llama3-8b");

    server
        .post("/v1/models/compare")
        .json(&json!({ "models": ["gpt-4o", "nope"] }))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_recommend_respects_tier() {
    let server = test_server();
    let response = server
        .get("/v1/models/recommend")
        .add_query_param("task", "code")
        .add_query_param("tier", "free")
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["tier"], "free");
    let ids: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["model_id"].as_str().unwrap())
        .collect();
    assert!(!ids.is_empty());
    assert!(!ids.contains(&"gpt-4o"));
    assert!(!ids.contains(&"claude-3-5-sonnet"));
    assert!(!ids.contains(&"mistral-7b"));
}

#[tokio::test]
async fn test_enum_names_are_exact_in_query_and_body() {
    let server = test_server();
    server
        .get("/v1/models/recommend")
        .add_query_param("task", "code")
        .add_query_param("tier", "FREE")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    server
        .post("/v1/route")
        .json(&json!({
            "request": { "task": "chat", "estimated_tokens": 100, "tier": "FREE" }
        }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    routewise::routes::metrics::init_metrics();
    let server = test_server();
    server.get("/metrics").await.assert_status_ok();
}

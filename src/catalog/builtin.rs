//! Built-in catalog
//!
//! Default models and providers used when no catalog file is configured.

use crate::types::{Capability, SubscriberTier};

use super::profiles::{CatalogDocument, ModelProfile, ProviderProfile};

#[allow(clippy::too_many_arguments)]
fn model(
    id: &str,
    family: &str,
    quality: f64,
    speed: f64,
    cost: f64,
    unit_cost: f64,
    context_window: u64,
    min_tier: SubscriberTier,
    capabilities: &[Capability],
) -> ModelProfile {
    ModelProfile {
        id: id.to_string(),
        family: family.to_string(),
        quality,
        speed,
        cost,
        capabilities: capabilities.iter().copied().collect(),
        unit_cost,
        context_window,
        min_tier,
    }
}

struct ProviderSpec<'a> {
    id: &'a str,
    model_id: &'a str,
    unit_cost: f64,
    max_tokens: u64,
    latency_ms: u64,
    min_tier: SubscriberTier,
    local: bool,
    health_url: Option<&'a str>,
}

fn provider(spec: ProviderSpec<'_>, capabilities: &[Capability]) -> ProviderProfile {
    ProviderProfile {
        id: spec.id.to_string(),
        model_id: spec.model_id.to_string(),
        unit_cost: spec.unit_cost,
        max_tokens: spec.max_tokens,
        baseline_latency_ms: spec.latency_ms,
        capabilities: capabilities.iter().copied().collect(),
        min_tier: spec.min_tier,
        enabled: true,
        local: spec.local,
        health_url: spec.health_url.map(str::to_string),
    }
}

/// The catalog shipped with the binary
pub fn default_document() -> CatalogDocument {
    use Capability::*;
    use SubscriberTier::*;

    let general = [Chat, Code, Creative, Retrieval, Analysis];
    let frontier = [
        Chat,
        Code,
        Creative,
        Retrieval,
        Analysis,
        Vision,
        FunctionCalling,
        LongContext,
    ];

    let models = vec![
        model("llama3-8b", "llama", 0.55, 0.70, 0.0, 0.0, 8_192, Free, &general),
        model("mistral-7b", "mistral", 0.50, 0.80, 0.0, 0.0, 8_192, Free, &[Chat, Creative, Retrieval]),
        model("qwen2.5-coder-7b", "qwen", 0.62, 0.70, 0.0, 0.0, 32_768, Free, &[Chat, Code]),
        model("llama-3.1-70b", "llama", 0.78, 0.95, 0.0, 0.0, 131_072, Free, &[Chat, Code, Retrieval, Analysis]),
        model("gpt-4o-mini", "gpt", 0.75, 0.85, 0.15, 0.0003, 128_000, Trial, &frontier),
        model("gpt-4o", "gpt", 0.92, 0.60, 0.80, 0.005, 128_000, Pro, &frontier),
        model("claude-3-haiku", "claude", 0.70, 0.90, 0.10, 0.0008, 200_000, Trial, &general),
        model("claude-3-5-sonnet", "claude", 0.95, 0.55, 0.85, 0.009, 200_000, Pro, &frontier),
    ];

    let providers = vec![
        provider(
            ProviderSpec {
                id: "ollama-llama3",
                model_id: "llama3-8b",
                unit_cost: 0.0,
                max_tokens: 8_192,
                latency_ms: 900,
                min_tier: Free,
                local: true,
                health_url: Some("http://localhost:11434/api/tags"),
            },
            &general,
        ),
        provider(
            ProviderSpec {
                id: "ollama-qwen-coder",
                model_id: "qwen2.5-coder-7b",
                unit_cost: 0.0,
                max_tokens: 32_768,
                latency_ms: 800,
                min_tier: Free,
                local: true,
                health_url: Some("http://localhost:11434/api/tags"),
            },
            &[Chat, Code],
        ),
        provider(
            ProviderSpec {
                id: "vllm-mistral",
                model_id: "mistral-7b",
                unit_cost: 0.0,
                max_tokens: 8_192,
                latency_ms: 400,
                min_tier: Free,
                local: true,
                health_url: Some("http://localhost:8000/health"),
            },
            &[Chat, Creative, Retrieval],
        ),
        provider(
            ProviderSpec {
                id: "groq-llama70b",
                model_id: "llama-3.1-70b",
                unit_cost: 0.0,
                max_tokens: 131_072,
                latency_ms: 300,
                min_tier: Free,
                local: false,
                health_url: Some("https://groqstatus.com/api/v2/status.json"),
            },
            &[Chat, Code, Retrieval, Analysis],
        ),
        provider(
            ProviderSpec {
                id: "openai-gpt4o-mini",
                model_id: "gpt-4o-mini",
                unit_cost: 0.0003,
                max_tokens: 128_000,
                latency_ms: 600,
                min_tier: Trial,
                local: false,
                health_url: Some("https://status.openai.com/api/v2/status.json"),
            },
            &frontier,
        ),
        provider(
            ProviderSpec {
                id: "openai-gpt4o",
                model_id: "gpt-4o",
                unit_cost: 0.005,
                max_tokens: 128_000,
                latency_ms: 1_200,
                min_tier: Pro,
                local: false,
                health_url: Some("https://status.openai.com/api/v2/status.json"),
            },
            &frontier,
        ),
        provider(
            ProviderSpec {
                id: "anthropic-haiku",
                model_id: "claude-3-haiku",
                unit_cost: 0.0008,
                max_tokens: 200_000,
                latency_ms: 450,
                min_tier: Trial,
                local: false,
                health_url: Some("https://status.anthropic.com/api/v2/status.json"),
            },
            &general,
        ),
        provider(
            ProviderSpec {
                id: "anthropic-sonnet",
                model_id: "claude-3-5-sonnet",
                unit_cost: 0.009,
                max_tokens: 200_000,
                latency_ms: 1_500,
                min_tier: Pro,
                local: false,
                health_url: Some("https://status.anthropic.com/api/v2/status.json"),
            },
            &frontier,
        ),
    ];

    CatalogDocument { models, providers }
}

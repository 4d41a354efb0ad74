//! Routing integration tests
//!
//! Selection properties checked over a grid of requests against the built-in
//! catalog, plus the concrete routing scenarios.

use std::collections::HashSet;
use std::time::Duration;

use pretty_assertions::assert_eq;

use routewise::{
    catalog::{builtin::default_document, CatalogDocument},
    error::AppError,
    health::HealthStatus,
    types::{
        Credentials, LatencyTarget, RoutingRequest, SubscriberTier, TaskCategory, Tradeoff,
    },
};

use crate::common::{provider, TestHarness};

const BUDGETS: [f64; 2] = [0.0, 50.0];
const TOKENS: [u64; 2] = [1_000, 12_000];

fn request_grid() -> Vec<RoutingRequest> {
    let mut grid = Vec::new();
    for &task in TaskCategory::ALL {
        for &tier in SubscriberTier::ALL {
            for &tradeoff in Tradeoff::ALL {
                for budget in BUDGETS {
                    for tokens in TOKENS {
                        grid.push(
                            RoutingRequest::new(task, tokens, tier)
                                .with_budget(budget)
                                .with_tradeoff(tradeoff),
                        );
                    }
                }
            }
        }
    }
    grid
}

#[tokio::test]
async fn test_private_requests_stay_local() {
    let harness = TestHarness::new();
    let catalog = harness.catalog.snapshot();

    for request in request_grid() {
        let request = request.with_privacy(true).with_tradeoff(Tradeoff::Precision);
        let tokens = request.estimated_tokens;
        match harness.service.select_provider(&request, &Credentials::new()).await {
            Ok(choice) => {
                let provider = catalog.provider(&choice.provider_id).unwrap();
                assert!(provider.local, "{} is not local", choice.provider_id);
                for id in &choice.fallback_chain {
                    assert!(catalog.provider(id).unwrap().local, "fallback {} is not local", id);
                }
            }
            // Only when no local provider fits the token estimate
            Err(AppError::NoEligibleProvider(_)) => assert!(tokens > 8_192),
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
}

#[tokio::test]
async fn test_byok_primary_costs_nothing() {
    let harness = TestHarness::new();

    for request in request_grid() {
        let Ok(plain) = harness.service.select_provider(&request, &Credentials::new()).await else {
            continue;
        };

        let credentials: Credentials = [plain.provider_id.clone()].into_iter().collect();
        let byok = harness
            .service
            .select_provider(&request, &credentials)
            .await
            .unwrap();

        assert_eq!(byok.provider_id, plain.provider_id);
        assert_eq!(byok.estimated_cost, 0.0);
        assert!(byok.is_byok);
    }
}

#[tokio::test]
async fn test_fallback_chain_is_clean() {
    let harness = TestHarness::new();
    harness.force_down("anthropic-haiku");
    harness.force_down("groq-llama70b");

    for request in request_grid() {
        let Ok(choice) = harness.service.select_provider(&request, &Credentials::new()).await else {
            continue;
        };

        assert!(harness.monitor.is_available(&choice.provider_id));
        assert!(!choice.fallback_chain.contains(&choice.provider_id));
        let unique: HashSet<_> = choice.fallback_chain.iter().collect();
        assert_eq!(unique.len(), choice.fallback_chain.len());
        for id in &choice.fallback_chain {
            assert_ne!(harness.monitor.get_status(id), HealthStatus::Down, "{} is down", id);
        }
    }
}

#[tokio::test]
async fn test_eco_never_picks_a_pricier_provider() {
    let harness = TestHarness::new();
    let catalog = harness.catalog.snapshot();

    for request in request_grid() {
        let request = request.with_tradeoff(Tradeoff::Eco);
        let Ok(choice) = harness.service.select_provider(&request, &Credentials::new()).await else {
            continue;
        };
        let chosen = catalog.provider(&choice.provider_id).unwrap();

        let capability = request.task.required_capability();
        for alternative in catalog.enabled_providers() {
            let model_tier_ok = catalog
                .model(&alternative.model_id)
                .map_or(true, |m| request.tier.satisfies(m.min_tier));
            let eligible = alternative.has_capability(capability)
                && request.tier.satisfies(alternative.min_tier)
                && model_tier_ok
                && request.estimated_tokens <= alternative.max_tokens;
            if eligible {
                assert!(
                    chosen.unit_cost <= alternative.unit_cost,
                    "{} chosen over cheaper {}",
                    chosen.id,
                    alternative.id
                );
            }
        }
    }
}

#[tokio::test]
async fn test_consecutive_failures_mark_down_until_availability_recovers() {
    let harness = TestHarness::new();
    let id = "openai-gpt4o";

    harness.force_down(id);
    assert_eq!(harness.monitor.get_status(id), HealthStatus::Down);
    assert_eq!(harness.monitor.snapshot().get(id).unwrap().consecutive_failures, 3);

    harness.service.report_outcome(id, true, Duration::from_millis(40)).unwrap();
    let health = harness.monitor.snapshot().get(id).cloned().unwrap();
    assert_eq!(health.consecutive_failures, 0);
    assert_eq!(health.status, HealthStatus::Down);

    // 11 successes out of 14 is still below 80%
    for _ in 0..10 {
        harness.service.report_outcome(id, true, Duration::from_millis(40)).unwrap();
    }
    assert_eq!(harness.monitor.get_status(id), HealthStatus::Down);

    // 13 out of 16
    for _ in 0..2 {
        harness.service.report_outcome(id, true, Duration::from_millis(40)).unwrap();
    }
    assert_eq!(harness.monitor.get_status(id), HealthStatus::Degraded);
}

#[tokio::test]
async fn test_scenario_trial_code_eco_picks_free_provider() {
    let harness = TestHarness::new();
    let request = RoutingRequest::new(TaskCategory::Code, 2_000, SubscriberTier::Trial)
        .with_tradeoff(Tradeoff::Eco);

    let choice = harness
        .service
        .select_provider(&request, &Credentials::new())
        .await
        .unwrap();

    let provider = harness.catalog.snapshot().provider(&choice.provider_id).cloned().unwrap();
    assert_eq!(choice.estimated_cost, 0.0);
    assert!(provider.is_free());
    assert!(SubscriberTier::Trial.satisfies(provider.min_tier));
    assert!(!choice.is_byok);
}

#[tokio::test]
async fn test_scenario_private_enterprise_precision_is_local() {
    let harness = TestHarness::new();
    let request = RoutingRequest::new(TaskCategory::Chat, 1_500, SubscriberTier::Enterprise)
        .with_privacy(true)
        .with_budget(1_000.0)
        .with_tradeoff(Tradeoff::Precision);

    let choice = harness
        .service
        .select_provider(&request, &Credentials::new())
        .await
        .unwrap();

    assert!(harness.catalog.snapshot().provider(&choice.provider_id).unwrap().local);
}

#[tokio::test]
async fn test_scenario_instant_latency() {
    let harness = TestHarness::new();
    let request = RoutingRequest::new(TaskCategory::Chat, 4_000, SubscriberTier::Pro)
        .with_budget(100.0)
        .with_latency(LatencyTarget::Instant);

    let choice = harness
        .service
        .select_provider(&request, &Credentials::new())
        .await
        .unwrap();
    let provider = harness.catalog.snapshot().provider(&choice.provider_id).cloned().unwrap();
    assert!(provider.baseline_latency_ms < 500);

    // Without any fast provider the request cannot be served
    let mut document = default_document();
    document.providers.retain(|p| p.baseline_latency_ms >= 500);
    let slow = TestHarness::with_document(document);
    let err = slow
        .service
        .select_provider(&request, &Credentials::new())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NoEligibleProvider(_)));
}

#[tokio::test]
async fn test_scenario_byok_top_candidate() {
    let harness = TestHarness::new();
    let request = RoutingRequest::new(TaskCategory::Analysis, 3_000, SubscriberTier::Pro)
        .with_budget(100.0)
        .with_tradeoff(Tradeoff::Precision);

    let top = harness
        .service
        .select_provider(&request, &Credentials::new())
        .await
        .unwrap();
    assert!(top.estimated_cost > 0.0);

    let credentials: Credentials = [top.provider_id.as_str()].into_iter().collect();
    let choice = harness
        .service
        .select_provider(&request, &credentials)
        .await
        .unwrap();

    assert_eq!(choice.provider_id, top.provider_id);
    assert_eq!(choice.estimated_cost, 0.0);
    assert!(choice.is_byok);
}

#[tokio::test]
async fn test_scenario_all_providers_down() {
    let harness = TestHarness::new();
    let ids: Vec<String> = harness
        .catalog
        .snapshot()
        .providers()
        .map(|p| p.id.clone())
        .collect();
    for id in &ids {
        harness.force_down(id);
    }
    assert!(harness.service.list_healthy().is_empty());

    let request = RoutingRequest::new(TaskCategory::Chat, 500, SubscriberTier::Enterprise)
        .with_budget(100.0);
    let err = harness
        .service
        .select_provider(&request, &Credentials::new())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NoEligibleProvider(_)));
}

#[tokio::test]
async fn test_removed_provider_is_never_selected() {
    let harness = TestHarness::new();
    let request = RoutingRequest::new(TaskCategory::Chat, 500, SubscriberTier::Pro)
        .with_budget(100.0)
        .with_tradeoff(Tradeoff::Precision);
    let first = harness
        .service
        .select_provider(&request, &Credentials::new())
        .await
        .unwrap();

    let remaining: Vec<_> = harness
        .catalog
        .snapshot()
        .providers()
        .filter(|p| p.id != first.provider_id)
        .cloned()
        .collect();
    harness.service.update_providers(remaining).unwrap();

    let second = harness
        .service
        .select_provider(&request, &Credentials::new())
        .await
        .unwrap();
    assert_ne!(second.provider_id, first.provider_id);
    assert!(!second.fallback_chain.contains(&first.provider_id));
}

#[tokio::test]
async fn test_cached_decision_respects_context_limits_within_a_bucket() {
    let mut small = provider("cheap-small", "small-model", 0.0001, 300, false);
    small.max_tokens = 6_000;
    let mut big = provider("pricey-big", "big-model", 0.01, 300, false);
    big.max_tokens = 8_000;
    let harness = TestHarness::with_document(CatalogDocument {
        models: vec![],
        providers: vec![small, big],
    });
    let eco = |tokens| {
        RoutingRequest::new(TaskCategory::Chat, tokens, SubscriberTier::Pro)
            .with_budget(100.0)
            .with_tradeoff(Tradeoff::Eco)
    };

    // 7000 and 5000 tokens share a bucket, but only the larger needs pricey-big
    let large = harness
        .service
        .select_provider(&eco(7_000), &Credentials::new())
        .await
        .unwrap();
    assert_eq!(large.provider_id, "pricey-big");
    assert!(large.fallback_chain.is_empty());

    let smaller = harness
        .service
        .select_provider(&eco(5_000), &Credentials::new())
        .await
        .unwrap();
    assert_eq!(smaller.provider_id, "cheap-small");
    assert_eq!(smaller.fingerprint, large.fingerprint);
    assert_eq!(smaller.fallback_chain, vec!["pricey-big".to_string()]);

    // Served from cache, the larger request still never falls back to cheap-small
    let again = harness
        .service
        .select_provider(&eco(7_500), &Credentials::new())
        .await
        .unwrap();
    assert_eq!(again.provider_id, "pricey-big");
    assert!(again.fallback_chain.is_empty());
}

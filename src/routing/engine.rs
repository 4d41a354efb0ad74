//! Routing engine
//!
//! Selects a provider for a request by narrowing the candidate set in a
//! fixed order:
//! 1. Privacy (local providers only)
//! 2. Own credentials (preferred, charged nothing)
//! 3. Latency (`instant` excludes slow providers)
//! 4. Budget (free tier or low budget: zero-cost providers only)
//! 5. Trade-off scoring
//! 6. Task/tier eligibility of the winner, re-scoring without it on failure
//! 7. Health gate, re-scoring without DOWN winners
//! 8. Fallback chain from the remaining eligible, available candidates
//!
//! Evaluation is pure: it reads a catalog snapshot and a health snapshot and
//! never performs I/O.

use tracing::{debug, info};

use crate::{
    catalog::{CatalogSnapshot, ProviderProfile},
    error::{AppError, AppResult},
    health::HealthSnapshot,
    types::{Credentials, LatencyTarget, ProviderChoice, RoutingRequest, SubscriberTier},
};

use super::{
    scoring::{rank, Candidate, Scored},
    RoutingConfig,
};

/// Budget units charged for serving `request` on `provider`
///
/// Nothing is charged when the caller brings their own credentials.
pub fn estimate_cost(request: &RoutingRequest, provider: &ProviderProfile, byok: bool) -> f64 {
    if byok {
        0.0
    } else {
        provider.unit_cost * request.estimated_tokens as f64 / 1000.0
    }
}

/// Why candidates were dropped while looking for a winner
#[derive(Debug, Default)]
struct Rejections {
    ineligible: usize,
    down: usize,
}

impl Rejections {
    fn describe(&self) -> String {
        match (self.ineligible, self.down) {
            (0, 0) => "no candidates left after filtering".to_string(),
            (0, down) => format!("all {} eligible providers are down", down),
            (ineligible, 0) => format!(
                "{} candidates lack the capability, tier, context or quality required",
                ineligible
            ),
            (ineligible, down) => format!(
                "{} candidates ineligible for task or tier, {} down",
                ineligible, down
            ),
        }
    }
}

/// Stateless provider selection
#[derive(Debug, Clone, Default)]
pub struct RoutingEngine {
    config: RoutingConfig,
}

impl RoutingEngine {
    pub fn new(config: RoutingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    /// Whether only zero-cost providers may serve the request
    pub fn budget_constrained(&self, request: &RoutingRequest) -> bool {
        request.tier == SubscriberTier::Free || request.remaining_budget < self.config.budget_floor
    }

    /// Choose a provider and fallback chain for `request`
    pub fn select(
        &self,
        request: &RoutingRequest,
        credentials: &Credentials,
        catalog: &CatalogSnapshot,
        health: &HealthSnapshot,
    ) -> AppResult<ProviderChoice> {
        request.validate()?;

        let mut candidates: Vec<Candidate<'_>> = catalog
            .enabled_providers()
            .map(|p| Candidate::new(p, catalog.model(&p.model_id), credentials.contains(&p.id)))
            .collect();
        if candidates.is_empty() {
            return Err(AppError::NoEligibleProvider(
                "no providers are enabled".to_string(),
            ));
        }

        if request.privacy {
            candidates.retain(|c| c.provider.local);
            debug!(remaining = candidates.len(), "Applied privacy filter");
            if candidates.is_empty() {
                return Err(AppError::NoEligibleProvider(
                    "private request but no local provider is enabled".to_string(),
                ));
            }
        }

        if let Some(model) = &request.model_override {
            candidates.retain(|c| &c.provider.model_id == model);
            if candidates.is_empty() {
                return Err(AppError::NoEligibleProvider(format!(
                    "no eligible provider serves model '{}'",
                    model
                )));
            }
        }

        if request.latency == LatencyTarget::Instant {
            let threshold = self.config.instant_latency_ms;
            candidates.retain(|c| c.provider.baseline_latency_ms < threshold);
            debug!(remaining = candidates.len(), threshold, "Applied latency filter");
            if candidates.is_empty() {
                return Err(AppError::NoEligibleProvider(format!(
                    "no provider answers below {} ms",
                    threshold
                )));
            }
        }

        if self.budget_constrained(request) {
            candidates.retain(|c| c.effective_cost == 0.0);
            debug!(remaining = candidates.len(), "Applied budget filter");
            if candidates.is_empty() {
                return Err(AppError::NoEligibleProvider(
                    "budget allows only zero-cost providers and none is eligible".to_string(),
                ));
            }
        }

        // BYOK candidates get first pick; the full set is the fallback
        let byok: Vec<Candidate<'_>> = candidates.iter().copied().filter(|c| c.byok).collect();
        let mut rejections = Rejections::default();
        let winner = self
            .pick_winner(byok, request, health, &mut Rejections::default())
            .or_else(|| self.pick_winner(candidates.clone(), request, health, &mut rejections))
            .ok_or_else(|| AppError::NoEligibleProvider(rejections.describe()))?;

        let fallback_chain = self.fallback_chain(&candidates, &winner, request, health);
        let provider = winner.candidate.provider;

        info!(
            provider = %provider.id,
            model = %provider.model_id,
            task = %request.task,
            tier = %request.tier,
            tradeoff = %request.tradeoff,
            byok = winner.candidate.byok,
            score = winner.score,
            fallbacks = fallback_chain.len(),
            "Selected provider"
        );

        Ok(ProviderChoice {
            provider_id: provider.id.clone(),
            model_id: provider.model_id.clone(),
            estimated_cost: estimate_cost(request, provider, winner.candidate.byok),
            is_byok: winner.candidate.byok,
            unit_cost: provider.unit_cost,
            max_tokens: provider.max_tokens,
            temperature: request.task.default_temperature(),
            score: winner.score,
            fallback_chain,
            fingerprint: None,
        })
    }

    /// Steps 5-7: score, then drop ineligible or DOWN winners until one holds
    fn pick_winner<'a>(
        &self,
        mut pool: Vec<Candidate<'a>>,
        request: &RoutingRequest,
        health: &HealthSnapshot,
        rejections: &mut Rejections,
    ) -> Option<Scored<'a>> {
        let weights = self.config.weights.for_tradeoff(request.tradeoff);

        while !pool.is_empty() {
            let best = rank(&pool, weights, request.tradeoff, self.config.default_quality)[0];
            let id = best.candidate.id();

            if !self.is_eligible(&best.candidate, request) {
                debug!(provider = %id, "Winner ineligible for task or tier, re-scoring");
                rejections.ineligible += 1;
            } else if !health.is_available(id) {
                debug!(provider = %id, "Winner is down, re-scoring");
                rejections.down += 1;
            } else {
                return Some(best);
            }

            pool.retain(|c| c.id() != id);
        }

        None
    }

    /// Step 8: remaining eligible, available candidates in score order
    fn fallback_chain(
        &self,
        candidates: &[Candidate<'_>],
        winner: &Scored<'_>,
        request: &RoutingRequest,
        health: &HealthSnapshot,
    ) -> Vec<String> {
        let usable: Vec<Candidate<'_>> = candidates
            .iter()
            .copied()
            .filter(|c| self.is_eligible(c, request) && health.is_available(c.id()))
            .collect();
        let weights = self.config.weights.for_tradeoff(request.tradeoff);

        let mut chain: Vec<String> = Vec::with_capacity(self.config.max_fallbacks);
        for scored in rank(&usable, weights, request.tradeoff, self.config.default_quality) {
            if chain.len() == self.config.max_fallbacks {
                break;
            }
            let id = scored.candidate.id();
            if id != winner.candidate.id() && !chain.iter().any(|c| c == id) {
                chain.push(id.to_string());
            }
        }
        chain
    }

    /// Step 6: capability, tier, context and quality requirements
    fn is_eligible(&self, candidate: &Candidate<'_>, request: &RoutingRequest) -> bool {
        let provider = candidate.provider;
        let model_tier_ok = candidate
            .model
            .map_or(true, |m| request.tier.satisfies(m.min_tier));

        provider.has_capability(request.task.required_capability())
            && request.tier.satisfies(provider.min_tier)
            && model_tier_ok
            && request.estimated_tokens <= provider.max_tokens
            && candidate.quality(self.config.default_quality)
                >= self.config.quality_floor(request.quality)
    }
}

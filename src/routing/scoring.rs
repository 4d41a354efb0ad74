//! Candidate scoring
//!
//! `score = w_cost * (1 - cost) + w_latency * (1 - latency) + w_quality * quality`
//! with cost and latency min-max normalised over the candidates being ranked.

use std::cmp::Ordering;

use crate::{
    catalog::{ModelProfile, ProviderProfile},
    error::{AppError, AppResult},
    types::Tradeoff,
};

/// Relative weight of cost, latency and quality in a candidate's score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradeoffWeights {
    pub cost: f64,
    pub latency: f64,
    pub quality: f64,
}

impl TradeoffWeights {
    pub const fn new(cost: f64, latency: f64, quality: f64) -> Self {
        Self {
            cost,
            latency,
            quality,
        }
    }

    /// Parse `"cost,latency,quality"`, e.g. `"0.3,0.3,0.4"`
    pub fn parse(raw: &str) -> AppResult<Self> {
        let parts: Vec<f64> = raw
            .split(',')
            .map(|part| part.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .map_err(|e| AppError::InvalidRequest(format!("invalid weights '{}': {}", raw, e)))?;

        let [cost, latency, quality] = parts[..] else {
            return Err(AppError::InvalidRequest(format!(
                "expected three weights (cost,latency,quality), got '{}'",
                raw
            )));
        };

        if [cost, latency, quality]
            .iter()
            .any(|w| !w.is_finite() || *w < 0.0)
        {
            return Err(AppError::InvalidRequest(format!(
                "weights must be non-negative numbers, got '{}'",
                raw
            )));
        }

        Ok(Self::new(cost, latency, quality))
    }
}

/// A provider under consideration for one request
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub provider: &'a ProviderProfile,
    pub model: Option<&'a ModelProfile>,
    /// Caller holds their own credentials for this provider
    pub byok: bool,
    /// Cost per 1K tokens to the platform; 0 when `byok`
    pub effective_cost: f64,
}

impl<'a> Candidate<'a> {
    pub fn new(
        provider: &'a ProviderProfile,
        model: Option<&'a ModelProfile>,
        byok: bool,
    ) -> Self {
        Self {
            provider,
            model,
            byok,
            effective_cost: if byok { 0.0 } else { provider.unit_cost },
        }
    }

    pub fn id(&self) -> &'a str {
        &self.provider.id
    }

    pub fn quality(&self, default_quality: f64) -> f64 {
        self.model.map_or(default_quality, |m| m.quality)
    }
}

/// A candidate with its score
#[derive(Debug, Clone, Copy)]
pub struct Scored<'a> {
    pub candidate: Candidate<'a>,
    pub score: f64,
}

fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}

fn normalize(value: f64, (lo, hi): (f64, f64)) -> f64 {
    let span = hi - lo;
    if span <= f64::EPSILON {
        0.0
    } else {
        (value - lo) / span
    }
}

/// Order two scored candidates, best first
///
/// Eco ranks by cost before score so a cheaper eligible candidate always
/// wins; the other preferences rank by score, then cost. Provider id breaks
/// any remaining tie.
pub fn compare(tradeoff: Tradeoff, a: &Scored<'_>, b: &Scored<'_>) -> Ordering {
    let by_cost = a
        .candidate
        .effective_cost
        .total_cmp(&b.candidate.effective_cost);
    let by_score = b.score.total_cmp(&a.score);

    let primary = match tradeoff {
        Tradeoff::Eco => by_cost.then(by_score),
        Tradeoff::Balanced | Tradeoff::Precision => by_score.then(by_cost),
    };
    primary.then_with(|| a.candidate.id().cmp(b.candidate.id()))
}

/// Score and sort candidates, best first
pub fn rank<'a>(
    candidates: &[Candidate<'a>],
    weights: TradeoffWeights,
    tradeoff: Tradeoff,
    default_quality: f64,
) -> Vec<Scored<'a>> {
    let cost_bounds = bounds(candidates.iter().map(|c| c.effective_cost));
    let latency_bounds = bounds(
        candidates
            .iter()
            .map(|c| c.provider.baseline_latency_ms as f64),
    );

    let mut scored: Vec<Scored<'a>> = candidates
        .iter()
        .map(|candidate| {
            let cost = normalize(candidate.effective_cost, cost_bounds);
            let latency = normalize(candidate.provider.baseline_latency_ms as f64, latency_bounds);
            let score = weights.cost * (1.0 - cost)
                + weights.latency * (1.0 - latency)
                + weights.quality * candidate.quality(default_quality);
            Scored {
                candidate: *candidate,
                score,
            }
        })
        .collect();

    scored.sort_by(|a, b| compare(tradeoff, a, b));
    scored
}

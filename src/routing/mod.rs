//! Provider routing
//!
//! Pure decision layer mapping a routing request and the caller's own
//! credentials to a provider choice with a fallback chain.

pub mod engine;
pub mod scoring;

use crate::types::{QualityBar, Tradeoff};

pub use engine::{estimate_cost, RoutingEngine};
pub use scoring::TradeoffWeights;

/// Weights per trade-off preference
///
/// All three splits are externally configurable. The balanced split has no
/// agreed value, so it defaults to an equal split.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringWeights {
    pub eco: TradeoffWeights,
    pub balanced: TradeoffWeights,
    pub precision: TradeoffWeights,
}

impl ScoringWeights {
    pub fn for_tradeoff(&self, tradeoff: Tradeoff) -> TradeoffWeights {
        match tradeoff {
            Tradeoff::Eco => self.eco,
            Tradeoff::Balanced => self.balanced,
            Tradeoff::Precision => self.precision,
        }
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            eco: TradeoffWeights::new(0.6, 0.2, 0.2),
            balanced: TradeoffWeights::new(1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0),
            precision: TradeoffWeights::new(0.05, 0.05, 0.9),
        }
    }
}

/// Configuration for the routing engine
#[derive(Debug, Clone)]
pub struct RoutingConfig {
    pub weights: ScoringWeights,
    /// Providers at or above this baseline latency are excluded for `instant` (default: 500 ms)
    pub instant_latency_ms: u64,
    /// Below this remaining budget only zero-cost providers are eligible (default: 1.0)
    pub budget_floor: f64,
    /// Maximum length of the fallback chain (default: 3)
    pub max_fallbacks: usize,
    /// Minimum model quality for `good`
    pub good_quality: f64,
    /// Minimum model quality for `best`
    pub best_quality: f64,
    /// Quality assumed for providers whose model is not cataloged
    pub default_quality: f64,
}

impl RoutingConfig {
    pub fn quality_floor(&self, bar: QualityBar) -> f64 {
        match bar {
            QualityBar::Basic => 0.0,
            QualityBar::Good => self.good_quality,
            QualityBar::Best => self.best_quality,
        }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            instant_latency_ms: 500,
            budget_floor: 1.0,
            max_fallbacks: 3,
            good_quality: 0.6,
            best_quality: 0.8,
            default_quality: 0.5,
        }
    }
}

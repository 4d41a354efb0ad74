//! Request and decision types
//!
//! Closed enumerations used across the catalog, the routing engine and the
//! HTTP surface, plus the routing request and the decision it produces.
//! Every enumeration parses strictly: unknown values are rejected with
//! `AppError::InvalidRequest` instead of falling back to a default. Query
//! strings and JSON bodies accept the same exact, lowercase names.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Implements `as_str`, `Display` and strict `FromStr` for a closed enum.
///
/// The string names must match the serde names of the variants.
macro_rules! closed_enum {
    ($ty:ident, $label:literal, { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            /// Every variant, in declaration order
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            /// Wire name of the variant
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $name),+
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $ty {
            type Err = AppError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok($ty::$variant),)+
                    other => Err(AppError::InvalidRequest(format!(
                        "unknown {} '{}'",
                        $label, other
                    ))),
                }
            }
        }
    };
}

/// Kind of work a request asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskCategory {
    Chat,
    Code,
    Creative,
    /// Retrieval-augmented generation
    Rag,
    Analysis,
}

closed_enum!(TaskCategory, "task category", {
    Chat => "chat",
    Code => "code",
    Creative => "creative",
    Rag => "rag",
    Analysis => "analysis",
});

impl TaskCategory {
    /// Capability tag a provider must carry to serve this task
    pub fn required_capability(&self) -> Capability {
        match self {
            TaskCategory::Chat => Capability::Chat,
            TaskCategory::Code => Capability::Code,
            TaskCategory::Creative => Capability::Creative,
            TaskCategory::Rag => Capability::Retrieval,
            TaskCategory::Analysis => Capability::Analysis,
        }
    }

    /// Sampling temperature handed to the execution layer
    pub fn default_temperature(&self) -> f32 {
        match self {
            TaskCategory::Code => 0.2,
            TaskCategory::Analysis | TaskCategory::Rag => 0.3,
            TaskCategory::Chat => 0.7,
            TaskCategory::Creative => 0.9,
        }
    }
}

/// Capability tag carried by models and providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Chat,
    Code,
    Creative,
    Retrieval,
    Analysis,
    Vision,
    FunctionCalling,
    LongContext,
}

closed_enum!(Capability, "capability", {
    Chat => "chat",
    Code => "code",
    Creative => "creative",
    Retrieval => "retrieval",
    Analysis => "analysis",
    Vision => "vision",
    FunctionCalling => "function_calling",
    LongContext => "long_context",
});

/// Subscription level gating which providers are eligible
///
/// Ordered from lowest to highest so tiers can be compared:
/// Free < Trial < Pro < Enterprise.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SubscriberTier {
    #[default]
    Free,
    Trial,
    Pro,
    Enterprise,
}

closed_enum!(SubscriberTier, "tier", {
    Free => "free",
    Trial => "trial",
    Pro => "pro",
    Enterprise => "enterprise",
});

impl SubscriberTier {
    /// Whether a caller on this tier may use something gated at `required`
    pub fn satisfies(&self, required: SubscriberTier) -> bool {
        *self >= required
    }
}

/// Desired response latency
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LatencyTarget {
    Instant,
    Fast,
    #[default]
    Normal,
    Relaxed,
}

closed_enum!(LatencyTarget, "latency target", {
    Instant => "instant",
    Fast => "fast",
    Normal => "normal",
    Relaxed => "relaxed",
});

/// Minimum acceptable model quality
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum QualityBar {
    #[default]
    Basic,
    Good,
    Best,
}

closed_enum!(QualityBar, "quality bar", {
    Basic => "basic",
    Good => "good",
    Best => "best",
});

/// Cost/quality trade-off preference
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tradeoff {
    /// Cost first
    Eco,
    #[default]
    Balanced,
    /// Quality first
    Precision,
}

closed_enum!(Tradeoff, "trade-off preference", {
    Eco => "eco",
    Balanced => "balanced",
    Precision => "precision",
});

/// A request for a routing decision
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoutingRequest {
    pub task: TaskCategory,
    /// Estimated input + output tokens
    pub estimated_tokens: u64,
    #[serde(default)]
    pub privacy: bool,
    #[serde(default)]
    pub latency: LatencyTarget,
    pub tier: SubscriberTier,
    /// Remaining budget units reported by the credit ledger
    #[serde(default)]
    pub remaining_budget: f64,
    #[serde(default)]
    pub quality: QualityBar,
    #[serde(default)]
    pub tradeoff: Tradeoff,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_override: Option<String>,
}

impl RoutingRequest {
    /// Create a request with default latency, quality and trade-off
    pub fn new(task: TaskCategory, estimated_tokens: u64, tier: SubscriberTier) -> Self {
        Self {
            task,
            estimated_tokens,
            privacy: false,
            latency: LatencyTarget::default(),
            tier,
            remaining_budget: 0.0,
            quality: QualityBar::default(),
            tradeoff: Tradeoff::default(),
            model_override: None,
        }
    }

    pub fn with_privacy(mut self, privacy: bool) -> Self {
        self.privacy = privacy;
        self
    }

    pub fn with_latency(mut self, latency: LatencyTarget) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_budget(mut self, remaining_budget: f64) -> Self {
        self.remaining_budget = remaining_budget;
        self
    }

    pub fn with_quality(mut self, quality: QualityBar) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_tradeoff(mut self, tradeoff: Tradeoff) -> Self {
        self.tradeoff = tradeoff;
        self
    }

    pub fn with_model_override(mut self, model: impl Into<String>) -> Self {
        self.model_override = Some(model.into());
        self
    }

    /// Reject malformed requests before any decision logic runs
    pub fn validate(&self) -> AppResult<()> {
        if self.estimated_tokens == 0 {
            return Err(AppError::InvalidRequest(
                "estimated_tokens must be greater than zero".to_string(),
            ));
        }
        if !self.remaining_budget.is_finite() || self.remaining_budget < 0.0 {
            return Err(AppError::InvalidRequest(format!(
                "remaining_budget must be a non-negative number, got {}",
                self.remaining_budget
            )));
        }
        if let Some(model) = &self.model_override {
            if model.trim().is_empty() {
                return Err(AppError::InvalidRequest(
                    "model_override must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Providers the caller holds their own credentials for (BYOK)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credentials(BTreeSet<String>);

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, provider_id: &str) -> bool {
        self.0.contains(provider_id)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Provider ids in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for Credentials {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// The routing decision handed to the execution layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderChoice {
    pub provider_id: String,
    pub model_id: String,
    /// Budget units the platform expects to charge; 0 when `is_byok`
    pub estimated_cost: f64,
    pub is_byok: bool,
    /// Provider price per 1K tokens, used to reprice cached decisions
    pub unit_cost: f64,
    pub max_tokens: u64,
    pub temperature: f32,
    pub score: f64,
    /// Alternates to try in order if the primary fails at call time
    pub fallback_chain: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

//! Request fingerprints
//!
//! Canonical key for routing decisions. Requests that would produce the same
//! decision share a fingerprint; token estimates are bucketed so bursts of
//! near-identical requests hit the same entry.

use sha2::{Digest, Sha256};

use crate::types::{Credentials, RoutingRequest};

/// Upper bound of the power-of-two bucket holding `tokens`
pub fn token_bucket(tokens: u64) -> u64 {
    tokens.max(1).checked_next_power_of_two().unwrap_or(u64::MAX)
}

/// SHA-256 of the canonical request description, hex encoded
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint a request
    ///
    /// `budget_constrained` stands in for the remaining budget, which only
    /// matters through whether it is below the floor.
    pub fn of(request: &RoutingRequest, credentials: &Credentials, budget_constrained: bool) -> Self {
        let byok: Vec<&str> = credentials.iter().collect();
        let canonical = format!(
            "task={};tokens<={};privacy={};tier={};latency={};tradeoff={};quality={};budget_constrained={};model={};byok={}",
            request.task,
            token_bucket(request.estimated_tokens),
            request.privacy,
            request.tier,
            request.latency,
            request.tradeoff,
            request.quality,
            budget_constrained,
            request.model_override.as_deref().unwrap_or("-"),
            byok.join(","),
        );
        Self(hex::encode(Sha256::digest(canonical.as_bytes())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

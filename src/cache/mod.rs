//! Cache module
//!
//! Short-lived memoization of routing decisions keyed by request fingerprint.

pub mod decision;
pub mod fingerprint;

pub use self::decision::{CacheStatus, DecisionCache, TokenRange};
pub use self::fingerprint::{token_bucket, Fingerprint};

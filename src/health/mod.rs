//! Provider health tracking
//!
//! Independently scheduled probing of every enabled provider, a rolling
//! availability window per provider, and a point-in-time snapshot that the
//! routing engine reads without ever waiting on a live probe.

pub mod monitor;
pub mod probe;
pub mod window;

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use monitor::{HealthMonitor, HealthSnapshot, MonitorHandle, ProviderHealth, StatusChange};
pub use probe::{HealthProbe, HttpHealthProbe, ProbeOutcome};
pub use window::{HealthRecord, HealthWindow};

/// Derived provider status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Down,
}

impl HealthStatus {
    /// Usable for routing (healthy or degraded)
    pub fn is_available(&self) -> bool {
        !matches!(self, HealthStatus::Down)
    }

    /// Gauge value exported to metrics
    pub fn as_gauge(&self) -> f64 {
        match self {
            HealthStatus::Healthy => 2.0,
            HealthStatus::Degraded => 1.0,
            HealthStatus::Down => 0.0,
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Degraded => write!(f, "degraded"),
            HealthStatus::Down => write!(f, "down"),
        }
    }
}

/// Configuration for health tracking
#[derive(Debug, Clone)]
pub struct HealthConfig {
    /// Time between probe cycles (default: 60 seconds)
    pub probe_interval: Duration,
    /// Bound on a single probe; a timed-out probe counts as a failure (default: 5 seconds)
    pub probe_timeout: Duration,
    /// Span of the rolling availability window (default: 24 hours)
    pub window_span: chrono::Duration,
    /// Hard cap on records kept per provider (default: 10 000)
    ///
    /// Once reached, the oldest records are evicted before they age out, so
    /// under heavy `report_outcome` traffic the effective window is shorter
    /// than `window_span`. The monitor logs a warning when a provider first
    /// hits the cap.
    pub max_records: usize,
    /// Consecutive failures that force DOWN (default: 3)
    pub down_after_failures: u32,
    /// Outcomes needed before low availability alone can mark a provider
    /// DOWN (default: 10)
    ///
    /// Fresh windows are still covered by `down_after_failures`.
    pub min_samples: usize,
    /// Availability at or above which a provider is HEALTHY (default: 0.98)
    pub healthy_threshold: f64,
    /// Availability below which a provider is DOWN (default: 0.80)
    pub down_threshold: f64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            probe_interval: Duration::from_secs(60),
            probe_timeout: Duration::from_secs(5),
            window_span: chrono::Duration::hours(24),
            max_records: 10_000,
            down_after_failures: 3,
            min_samples: 10,
            healthy_threshold: 0.98,
            down_threshold: 0.80,
        }
    }
}

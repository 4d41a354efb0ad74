//! Rolling availability window
//!
//! Keeps one provider's probe outcomes for the configured span and derives
//! its status from them.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{HealthConfig, HealthStatus};

/// A single probe or call outcome
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HealthRecord {
    pub success: bool,
    pub response_time_ms: u64,
    pub timestamp: DateTime<Utc>,
}

/// Health state for one provider
///
/// Status rules:
/// - availability >= healthy threshold: HEALTHY
/// - availability >= down threshold: DEGRADED
/// - availability below the down threshold over at least `min_samples`
///   outcomes, or too many consecutive failures: DOWN
/// - availability below the down threshold over fewer outcomes: DEGRADED
///
/// A success resets the consecutive-failure counter at once, but a DOWN
/// provider only comes back when availability itself has recovered.
#[derive(Debug, Clone)]
pub struct HealthWindow {
    records: VecDeque<HealthRecord>,
    successes: usize,
    consecutive_failures: u32,
    status: HealthStatus,
    last_checked: Option<DateTime<Utc>>,
}

impl Default for HealthWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthWindow {
    pub fn new() -> Self {
        Self {
            records: VecDeque::new(),
            successes: 0,
            consecutive_failures: 0,
            status: HealthStatus::Healthy,
            last_checked: None,
        }
    }

    /// Append an outcome and re-derive status
    ///
    /// Returns the `(from, to)` pair when the status changed.
    pub fn record(
        &mut self,
        record: HealthRecord,
        config: &HealthConfig,
    ) -> Option<(HealthStatus, HealthStatus)> {
        if record.success {
            self.successes += 1;
            self.consecutive_failures = 0;
        } else {
            self.consecutive_failures += 1;
        }
        let now = record.timestamp;
        self.last_checked = Some(self.last_checked.map_or(now, |last| last.max(now)));
        self.records.push_back(record);

        while self.records.len() > config.max_records {
            self.pop_oldest();
        }

        self.prune(now, config)
    }

    /// Drop records older than the window span and re-derive status
    pub fn prune(
        &mut self,
        now: DateTime<Utc>,
        config: &HealthConfig,
    ) -> Option<(HealthStatus, HealthStatus)> {
        let cutoff = now - config.window_span;
        while self
            .records
            .front()
            .is_some_and(|oldest| oldest.timestamp < cutoff)
        {
            self.pop_oldest();
        }

        // Nothing left to judge by: back to unknown, which routes as healthy
        if self.records.is_empty() {
            self.consecutive_failures = 0;
        }

        let next = self.derive_status(config);
        if next == self.status {
            return None;
        }
        let previous = self.status;
        self.status = next;
        Some((previous, next))
    }

    fn pop_oldest(&mut self) {
        if let Some(oldest) = self.records.pop_front() {
            if oldest.success {
                self.successes -= 1;
            }
        }
    }

    fn derive_status(&self, config: &HealthConfig) -> HealthStatus {
        let Some(availability) = self.availability() else {
            return HealthStatus::Healthy;
        };

        let too_few = self.records.len() < config.min_samples;
        let low = availability < config.down_threshold;

        if self.consecutive_failures >= config.down_after_failures
            || (low && (!too_few || self.status == HealthStatus::Down))
        {
            HealthStatus::Down
        } else if availability >= config.healthy_threshold {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        }
    }

    /// Share of successful outcomes in the window, `None` when empty
    pub fn availability(&self) -> Option<f64> {
        if self.records.is_empty() {
            None
        } else {
            Some(self.successes as f64 / self.records.len() as f64)
        }
    }

    pub fn status(&self) -> HealthStatus {
        self.status
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the record cap, rather than age, now bounds the window
    pub fn is_capped(&self, config: &HealthConfig) -> bool {
        self.records.len() >= config.max_records
    }

    /// Timestamp of the oldest record still in the window
    pub fn oldest(&self) -> Option<DateTime<Utc>> {
        self.records.front().map(|r| r.timestamp)
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last_checked(&self) -> Option<DateTime<Utc>> {
        self.last_checked
    }

    /// Mean response time over the window
    pub fn average_response_ms(&self) -> Option<u64> {
        if self.records.is_empty() {
            return None;
        }
        let total: u64 = self.records.iter().map(|r| r.response_time_ms).sum();
        Some(total / self.records.len() as u64)
    }
}

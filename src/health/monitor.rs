//! Health monitor
//!
//! Owns the per-provider windows, runs the probe schedule, and publishes an
//! immutable snapshot after every write. Readers clone the current snapshot
//! and never observe a half-applied update.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::{
    catalog::CapabilityCatalog,
    clock::Clock,
    error::{AppError, AppResult},
    routes::metrics,
};

use super::{HealthConfig, HealthProbe, HealthRecord, HealthStatus, HealthWindow, ProbeOutcome};

const STATUS_CHANNEL_CAPACITY: usize = 256;

/// A provider moved from one status to another
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusChange {
    pub provider_id: String,
    pub from: HealthStatus,
    pub to: HealthStatus,
    pub at: DateTime<Utc>,
}

/// Published health of one provider
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderHealth {
    pub provider_id: String,
    pub status: HealthStatus,
    pub availability: Option<f64>,
    pub consecutive_failures: u32,
    pub samples: usize,
    pub avg_response_ms: Option<u64>,
    pub last_checked: Option<DateTime<Utc>>,
}

impl ProviderHealth {
    /// Health of a provider with no recorded outcomes
    pub fn unprobed(provider_id: &str) -> Self {
        Self {
            provider_id: provider_id.to_string(),
            status: HealthStatus::Healthy,
            availability: None,
            consecutive_failures: 0,
            samples: 0,
            avg_response_ms: None,
            last_checked: None,
        }
    }

    fn from_window(provider_id: &str, window: &HealthWindow) -> Self {
        Self {
            provider_id: provider_id.to_string(),
            status: window.status(),
            availability: window.availability(),
            consecutive_failures: window.consecutive_failures(),
            samples: window.len(),
            avg_response_ms: window.average_response_ms(),
            last_checked: window.last_checked(),
        }
    }
}

/// Point-in-time view of every tracked provider
///
/// Providers without any record are unknown and treated as healthy.
#[derive(Debug, Clone, Default)]
pub struct HealthSnapshot {
    providers: HashMap<String, ProviderHealth>,
    taken_at: Option<DateTime<Utc>>,
}

impl HealthSnapshot {
    pub fn status(&self, provider_id: &str) -> HealthStatus {
        self.providers
            .get(provider_id)
            .map(|p| p.status)
            .unwrap_or(HealthStatus::Healthy)
    }

    pub fn is_available(&self, provider_id: &str) -> bool {
        self.status(provider_id).is_available()
    }

    pub fn get(&self, provider_id: &str) -> Option<&ProviderHealth> {
        self.providers.get(provider_id)
    }

    pub fn providers(&self) -> impl Iterator<Item = &ProviderHealth> {
        self.providers.values()
    }

    pub fn taken_at(&self) -> Option<DateTime<Utc>> {
        self.taken_at
    }

    /// Build a snapshot with fixed statuses
    #[cfg(any(test, feature = "test-utils"))]
    pub fn with_statuses<'a>(statuses: impl IntoIterator<Item = (&'a str, HealthStatus)>) -> Self {
        let providers = statuses
            .into_iter()
            .map(|(id, status)| {
                (
                    id.to_string(),
                    ProviderHealth {
                        status,
                        ..ProviderHealth::unprobed(id)
                    },
                )
            })
            .collect();
        Self {
            providers,
            taken_at: None,
        }
    }
}

/// Background health monitor
///
/// Constructed with its catalog, probe and clock so tests can inject fakes.
/// The scheduled probes and `report_outcome` are the only writers.
pub struct HealthMonitor {
    catalog: Arc<CapabilityCatalog>,
    probe: Arc<dyn HealthProbe>,
    clock: Arc<dyn Clock>,
    config: HealthConfig,
    windows: Mutex<HashMap<String, HealthWindow>>,
    snapshot: RwLock<Arc<HealthSnapshot>>,
    changes: broadcast::Sender<StatusChange>,
}

impl HealthMonitor {
    pub fn new(
        catalog: Arc<CapabilityCatalog>,
        probe: Arc<dyn HealthProbe>,
        clock: Arc<dyn Clock>,
        config: HealthConfig,
    ) -> Self {
        let (changes, _) = broadcast::channel(STATUS_CHANNEL_CAPACITY);
        Self {
            catalog,
            probe,
            clock,
            config,
            windows: Mutex::new(HashMap::new()),
            snapshot: RwLock::new(Arc::new(HealthSnapshot::default())),
            changes,
        }
    }

    pub fn config(&self) -> &HealthConfig {
        &self.config
    }

    /// Latest published snapshot; never triggers a probe
    pub fn snapshot(&self) -> Arc<HealthSnapshot> {
        self.snapshot.read().unwrap().clone()
    }

    pub fn get_status(&self, provider_id: &str) -> HealthStatus {
        self.snapshot().status(provider_id)
    }

    pub fn is_available(&self, provider_id: &str) -> bool {
        self.snapshot().is_available(provider_id)
    }

    /// Enabled providers currently HEALTHY or DEGRADED
    pub fn list_healthy(&self) -> BTreeSet<String> {
        let snapshot = self.snapshot();
        self.catalog
            .snapshot()
            .enabled_providers()
            .filter(|p| snapshot.is_available(&p.id))
            .map(|p| p.id.clone())
            .collect()
    }

    /// Stream of status transitions
    pub fn subscribe(&self) -> broadcast::Receiver<StatusChange> {
        self.changes.subscribe()
    }

    /// Feed back the outcome of a real provider call
    pub fn report_outcome(
        &self,
        provider_id: &str,
        success: bool,
        latency: Duration,
    ) -> AppResult<()> {
        if self.catalog.snapshot().provider(provider_id).is_none() {
            warn!(provider = %provider_id, "Outcome reported for unknown provider");
            return Err(AppError::ProviderNotFound(provider_id.to_string()));
        }

        debug!(
            provider = %provider_id,
            success,
            latency_ms = latency.as_millis() as u64,
            "Call outcome reported"
        );
        let outcome = ProbeOutcome {
            success,
            response_time: latency,
        };
        self.apply(vec![(provider_id.to_string(), outcome)]);
        Ok(())
    }

    /// Probe every enabled provider that exposes a health surface, once
    ///
    /// Probes run concurrently; their outcomes are applied together and
    /// published as a single snapshot. Returns the number of probes issued.
    pub async fn run_cycle(&self) -> usize {
        let targets: Vec<_> = self
            .catalog
            .snapshot()
            .enabled_providers()
            .filter(|p| p.health_url.is_some())
            .cloned()
            .collect();

        let timeout = self.config.probe_timeout;
        let probes = targets.iter().map(|provider| async move {
            let outcome = match tokio::time::timeout(timeout, self.probe.probe(provider)).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(
                        provider = %provider.id,
                        timeout_ms = timeout.as_millis() as u64,
                        "Health probe timed out"
                    );
                    ProbeOutcome::failure(timeout)
                }
            };
            metrics::record_probe(&provider.id, outcome.success);
            (provider.id.clone(), outcome)
        });

        let outcomes = join_all(probes).await;
        let probed = outcomes.len();
        self.apply(outcomes);
        debug!(probed, "Health probe cycle complete");
        probed
    }

    /// Forget providers that are no longer configured
    pub fn retain_providers<'a>(&self, provider_ids: impl IntoIterator<Item = &'a str>) {
        let keep: HashSet<&str> = provider_ids.into_iter().collect();
        let mut windows = self.windows.lock().unwrap();
        windows.retain(|id, _| {
            let retained = keep.contains(id.as_str());
            if !retained {
                info!(provider = %id, "Dropping health window of removed provider");
            }
            retained
        });
        self.publish(&windows, self.clock.now());
    }

    fn apply(&self, outcomes: Vec<(String, ProbeOutcome)>) {
        let now = self.clock.now();
        let mut changes = Vec::new();
        {
            let mut windows = self.windows.lock().unwrap();
            for (provider_id, outcome) in outcomes {
                let record = HealthRecord {
                    success: outcome.success,
                    response_time_ms: outcome.response_time.as_millis() as u64,
                    timestamp: now,
                };
                let window = windows.entry(provider_id.clone()).or_default();
                let was_capped = window.is_capped(&self.config);
                let change = window.record(record, &self.config);
                if !was_capped && window.is_capped(&self.config) {
                    warn!(
                        provider = %provider_id,
                        max_records = self.config.max_records,
                        oldest = ?window.oldest(),
                        "Health window reached its record cap, evicting before records age out"
                    );
                }
                if let Some((from, to)) = change {
                    changes.push(StatusChange {
                        provider_id,
                        from,
                        to,
                        at: now,
                    });
                }
            }

            for (provider_id, window) in windows.iter_mut() {
                if let Some((from, to)) = window.prune(now, &self.config) {
                    changes.push(StatusChange {
                        provider_id: provider_id.clone(),
                        from,
                        to,
                        at: now,
                    });
                }
            }

            self.publish(&windows, now);
        }

        for change in changes {
            self.announce(change);
        }
    }

    fn publish(&self, windows: &HashMap<String, HealthWindow>, now: DateTime<Utc>) {
        let providers = windows
            .iter()
            .map(|(id, window)| (id.clone(), ProviderHealth::from_window(id, window)))
            .collect();
        let next = Arc::new(HealthSnapshot {
            providers,
            taken_at: Some(now),
        });
        *self.snapshot.write().unwrap() = next;
    }

    fn announce(&self, change: StatusChange) {
        match change.to {
            HealthStatus::Down => warn!(
                provider = %change.provider_id,
                from = %change.from,
                "Provider marked down"
            ),
            _ => info!(
                provider = %change.provider_id,
                from = %change.from,
                to = %change.to,
                "Provider status changed"
            ),
        }
        metrics::set_provider_status(&change.provider_id, change.to);
        // No subscribers is fine
        let _ = self.changes.send(change);
    }

    /// Start the probe schedule
    ///
    /// The first cycle runs immediately, then once per probe interval until
    /// the returned handle is stopped or dropped.
    pub fn start(self: &Arc<Self>) -> MonitorHandle {
        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let monitor = Arc::clone(self);

        let task = tokio::spawn(async move {
            info!(
                interval_secs = monitor.config.probe_interval.as_secs(),
                timeout_ms = monitor.config.probe_timeout.as_millis() as u64,
                "Starting health monitor"
            );

            let mut ticker = tokio::time::interval(monitor.config.probe_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        tokio::select! {
                            _ = monitor.run_cycle() => {}
                            _ = shutdown_rx.changed() => break,
                        }
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }

            info!("Health monitor stopped");
        });

        MonitorHandle { shutdown, task }
    }
}

/// Handle to a running probe schedule
///
/// Dropping the handle also stops the schedule.
pub struct MonitorHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Stop the schedule and wait for the task to exit
    ///
    /// A cycle in flight is abandoned; its outcomes are not recorded.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "Health monitor task ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

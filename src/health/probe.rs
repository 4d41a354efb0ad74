//! Health probes
//!
//! A probe checks one provider's health surface. Probes never return errors:
//! anything that goes wrong is a failed outcome.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::catalog::ProviderProfile;

/// Result of probing one provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeOutcome {
    pub success: bool,
    pub response_time: Duration,
}

impl ProbeOutcome {
    pub fn success(response_time: Duration) -> Self {
        Self {
            success: true,
            response_time,
        }
    }

    pub fn failure(response_time: Duration) -> Self {
        Self {
            success: false,
            response_time,
        }
    }
}

/// Reachability check against a provider
///
/// The monitor bounds every call with its probe timeout, so implementations
/// don't need a timeout of their own.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn probe(&self, provider: &ProviderProfile) -> ProbeOutcome;
}

/// Probe that issues `GET health_url` and treats any 2xx as reachable
pub struct HttpHealthProbe {
    client: reqwest::Client,
}

impl HttpHealthProbe {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HealthProbe for HttpHealthProbe {
    async fn probe(&self, provider: &ProviderProfile) -> ProbeOutcome {
        let Some(url) = provider.health_url.as_deref() else {
            debug!(provider = %provider.id, "Provider has no health surface");
            return ProbeOutcome::failure(Duration::ZERO);
        };

        let start = Instant::now();
        match self.client.get(url).send().await {
            Ok(response) if response.status().is_success() => {
                let elapsed = start.elapsed();
                debug!(
                    provider = %provider.id,
                    latency_ms = elapsed.as_millis() as u64,
                    "Health probe succeeded"
                );
                ProbeOutcome::success(elapsed)
            }
            Ok(response) => {
                warn!(
                    provider = %provider.id,
                    status = %response.status(),
                    "Health probe returned non-success status"
                );
                ProbeOutcome::failure(start.elapsed())
            }
            Err(e) => {
                warn!(provider = %provider.id, error = %e, "Health probe failed");
                ProbeOutcome::failure(start.elapsed())
            }
        }
    }
}

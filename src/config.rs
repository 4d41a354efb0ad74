//! Configuration management for Routewise
//!
//! Configuration is loaded from environment variables.

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::health::HealthConfig;
use crate::routing::{RoutingConfig, ScoringWeights, TradeoffWeights};

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,

    /// Optional JSON catalog document; the built-in catalog is used otherwise
    pub catalog_path: Option<PathBuf>,

    /// Probe schedule and status thresholds
    pub health: HealthConfig,
    /// Filters, scoring weights and fallback bounds
    pub routing: RoutingConfig,

    /// Lifetime of cached routing decisions
    pub cache_ttl: Duration,
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {}", name)),
        Err(_) => Ok(default),
    }
}

fn parse_weights(name: &str, default: TradeoffWeights) -> Result<TradeoffWeights> {
    match env::var(name) {
        Ok(raw) => TradeoffWeights::parse(&raw).with_context(|| format!("Invalid {}", name)),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let health_defaults = HealthConfig::default();
        let health = HealthConfig {
            probe_interval: Duration::from_secs(parse_var(
                "ROUTEWISE_PROBE_INTERVAL_SECONDS",
                health_defaults.probe_interval.as_secs(),
            )?),
            probe_timeout: Duration::from_millis(parse_var(
                "ROUTEWISE_PROBE_TIMEOUT_MS",
                health_defaults.probe_timeout.as_millis() as u64,
            )?),
            down_after_failures: parse_var(
                "ROUTEWISE_DOWN_AFTER_FAILURES",
                health_defaults.down_after_failures,
            )?,
            healthy_threshold: parse_var(
                "ROUTEWISE_HEALTHY_THRESHOLD",
                health_defaults.healthy_threshold,
            )?,
            down_threshold: parse_var("ROUTEWISE_DOWN_THRESHOLD", health_defaults.down_threshold)?,
            ..health_defaults
        };
        anyhow::ensure!(
            health.down_threshold <= health.healthy_threshold,
            "ROUTEWISE_DOWN_THRESHOLD must not exceed ROUTEWISE_HEALTHY_THRESHOLD"
        );
        anyhow::ensure!(
            !health.probe_interval.is_zero(),
            "ROUTEWISE_PROBE_INTERVAL_SECONDS must be at least 1"
        );

        let routing_defaults = RoutingConfig::default();
        let weights = routing_defaults.weights;
        let routing = RoutingConfig {
            weights: ScoringWeights {
                eco: parse_weights("ROUTEWISE_ECO_WEIGHTS", weights.eco)?,
                balanced: parse_weights("ROUTEWISE_BALANCED_WEIGHTS", weights.balanced)?,
                precision: parse_weights("ROUTEWISE_PRECISION_WEIGHTS", weights.precision)?,
            },
            instant_latency_ms: parse_var(
                "ROUTEWISE_INSTANT_LATENCY_MS",
                routing_defaults.instant_latency_ms,
            )?,
            budget_floor: parse_var("ROUTEWISE_BUDGET_FLOOR", routing_defaults.budget_floor)?,
            max_fallbacks: parse_var("ROUTEWISE_MAX_FALLBACKS", routing_defaults.max_fallbacks)?,
            ..routing_defaults
        };

        let cache_ttl = Duration::from_secs(parse_var("ROUTEWISE_CACHE_TTL_SECONDS", 300)?);
        // Also the purge interval of the invalidation listener
        anyhow::ensure!(!cache_ttl.is_zero(), "ROUTEWISE_CACHE_TTL_SECONDS must be at least 1");

        Ok(Self {
            host: env::var("ROUTEWISE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_var("ROUTEWISE_PORT", 8080)?,

            catalog_path: env::var("ROUTEWISE_CATALOG_PATH").ok().map(PathBuf::from),

            health,
            routing,

            cache_ttl,
        })
    }
}

//! Probe configuration loaded from environment variables.

use std::env;

use tally_core::domain::WindowConfig;
use tally_infra::RedisStoreConfig;

/// Probe run configuration.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub store: RedisStoreConfig,
    pub key: String,
    pub weight: u32,
    pub window: WindowConfig,
    pub hits: u32,
    /// Take back the last hit's weight after the run.
    pub refund_last: bool,
}

impl ProbeConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            store: RedisStoreConfig::from_env(),
            key: env::var("PROBE_KEY").unwrap_or_else(|_| "probe".to_string()),
            weight: env::var("PROBE_WEIGHT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1),
            window: WindowConfig::new(
                env::var("PROBE_INTERVAL_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60000),
            ),
            hits: env::var("PROBE_HITS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            refund_last: env::var("PROBE_REFUND_LAST")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        }
    }
}

//! Store connection configuration.

use std::time::Duration;

/// Redis deployment the counter store connects to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreTopology {
    /// A single redis node.
    Single { url: String },
    /// A master discovered through redis sentinels.
    Sentinel {
        sentinels: Vec<String>,
        service_name: String,
    },
    /// A redis cluster reached through its seed nodes.
    Cluster { nodes: Vec<String> },
}

impl Default for StoreTopology {
    fn default() -> Self {
        Self::Single {
            url: "redis://localhost:6379".to_string(),
        }
    }
}

impl StoreTopology {
    /// Load the topology from environment variables.
    ///
    /// `REDIS_MODE` selects `single` (default), `sentinel` or `cluster`.
    pub fn from_env() -> Self {
        let mode = std::env::var("REDIS_MODE").unwrap_or_else(|_| "single".to_string());

        match mode.to_lowercase().as_str() {
            "sentinel" => Self::Sentinel {
                sentinels: split_list(
                    &std::env::var("REDIS_SENTINELS")
                        .unwrap_or_else(|_| "redis://localhost:26379".to_string()),
                ),
                service_name: std::env::var("REDIS_SENTINEL_SERVICE")
                    .unwrap_or_else(|_| "mymaster".to_string()),
            },
            "cluster" => Self::Cluster {
                nodes: split_list(
                    &std::env::var("REDIS_CLUSTER_NODES")
                        .unwrap_or_else(|_| "redis://localhost:7000".to_string()),
                ),
            },
            other => {
                if other != "single" {
                    tracing::warn!(mode = %other, "Unknown REDIS_MODE, using single node");
                }
                Self::Single {
                    url: std::env::var("REDIS_URL")
                        .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
                }
            }
        }
    }

    /// Short name for logging.
    pub fn mode(&self) -> &'static str {
        match self {
            Self::Single { .. } => "single",
            Self::Sentinel { .. } => "sentinel",
            Self::Cluster { .. } => "cluster",
        }
    }
}

/// Redis counter store configuration.
#[derive(Debug, Clone)]
pub struct RedisStoreConfig {
    /// Deployment to connect to
    pub topology: StoreTopology,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Timeout for a single round trip
    pub command_timeout: Duration,
    /// Key prefix for counter keys
    pub key_prefix: String,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            topology: StoreTopology::default(),
            connect_timeout: Duration::from_secs(5),
            command_timeout: Duration::from_millis(1000),
            key_prefix: "ratelimit".to_string(),
        }
    }
}

impl RedisStoreConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            topology: StoreTopology::from_env(),
            connect_timeout: Duration::from_secs(
                std::env::var("REDIS_CONNECT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
            command_timeout: Duration::from_millis(
                std::env::var("REDIS_COMMAND_TIMEOUT_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1000),
            ),
            key_prefix: std::env::var("COUNTER_KEY_PREFIX")
                .unwrap_or_else(|_| "ratelimit".to_string()),
        }
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

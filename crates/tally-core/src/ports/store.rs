//! Counter store port.

use async_trait::async_trait;

/// Shared key-value store holding one counter per key.
///
/// Implementations must be safe for concurrent use by many callers and must
/// provide atomic increment-by and decrement-by. Topology (single node,
/// sentinel, cluster) is invisible behind this trait.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Get the raw value stored at `key`.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Get the remaining time-to-live of `key`.
    async fn ttl(&self, key: &str) -> Result<KeyTtl, StoreError>;

    /// Read value and TTL together in a single round trip.
    async fn snapshot(&self, key: &str) -> Result<WindowSnapshot, StoreError>;

    /// Overwrite `key` with `value`, expiring after `ttl_secs` seconds.
    async fn set_with_expiry(
        &self,
        key: &str,
        value: i64,
        ttl_secs: u64,
    ) -> Result<(), StoreError>;

    /// Atomically add `delta`, returning the new value.
    async fn increment_by(&self, key: &str, delta: i64) -> Result<i64, StoreError>;

    /// Atomically subtract `delta`, returning the new value.
    async fn decrement_by(&self, key: &str, delta: i64) -> Result<i64, StoreError>;
}

/// Remaining lifetime of a key as reported by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    /// Key expires in this many seconds.
    Expires(u64),
    /// Key exists without an expiry.
    Persistent,
    /// Key does not exist.
    Missing,
}

impl KeyTtl {
    /// Decode a redis-style TTL reply: `-1` no expiry, `-2` missing.
    pub fn from_reply(reply: i64) -> Self {
        match reply {
            -1 => Self::Persistent,
            n if n >= 0 => Self::Expires(n as u64),
            _ => Self::Missing,
        }
    }
}

/// Value and TTL of a key, read in one round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSnapshot {
    pub value: Option<String>,
    pub ttl: KeyTtl,
}

/// Store operation errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Command failed: {0}")]
    Command(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_reply_sentinels() {
        assert_eq!(KeyTtl::from_reply(30), KeyTtl::Expires(30));
        assert_eq!(KeyTtl::from_reply(0), KeyTtl::Expires(0));
        assert_eq!(KeyTtl::from_reply(-1), KeyTtl::Persistent);
        assert_eq!(KeyTtl::from_reply(-2), KeyTtl::Missing);
    }
}

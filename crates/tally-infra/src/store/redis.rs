//! Redis counter store implementation.

use std::future::Future;

use async_trait::async_trait;
use redis::{AsyncCommands, RedisError, RedisResult};

use tally_core::ports::{CounterStore, KeyTtl, StoreError, WindowSnapshot};

use super::config::RedisStoreConfig;
use super::connection::{StoreConnection, is_connection_error};

/// Redis-backed counter store.
///
/// Works against a single node, a sentinel-managed master or a cluster; the
/// topology is fixed at construction and invisible to callers.
pub struct RedisCounterStore {
    conn: StoreConnection,
    config: RedisStoreConfig,
}

impl RedisCounterStore {
    pub async fn new(config: RedisStoreConfig) -> Result<Self, StoreError> {
        let conn = StoreConnection::connect(&config).await?;

        tracing::info!(
            mode = config.topology.mode(),
            prefix = %config.key_prefix,
            "Connected to Redis counter store"
        );

        Ok(Self { conn, config })
    }

    /// Create from environment configuration.
    pub async fn from_env() -> Result<Self, StoreError> {
        Self::new(RedisStoreConfig::from_env()).await
    }

    fn make_key(&self, key: &str) -> String {
        if self.config.key_prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}:{}", self.config.key_prefix, key)
        }
    }

    /// Await one round trip, bounded by the command timeout.
    async fn run<T>(
        &self,
        request: impl Future<Output = RedisResult<T>>,
    ) -> Result<T, StoreError> {
        tokio::time::timeout(self.config.command_timeout, request)
            .await
            .map_err(|_| StoreError::Timeout)?
            .map_err(store_error)
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let key = self.make_key(key);
        let mut conn = self.conn.clone();
        let raw: Option<Vec<u8>> = self.run(conn.get(&key)).await?;
        Ok(raw.map(decode))
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl, StoreError> {
        let key = self.make_key(key);
        let mut conn = self.conn.clone();
        let reply: i64 = self.run(conn.ttl(&key)).await?;
        Ok(KeyTtl::from_reply(reply))
    }

    async fn snapshot(&self, key: &str) -> Result<WindowSnapshot, StoreError> {
        let key = self.make_key(key);
        let mut conn = self.conn.clone();

        let mut pipe = redis::pipe();
        pipe.get(&key).ttl(&key);
        let (raw, ttl): (Option<Vec<u8>>, i64) = self.run(pipe.query_async(&mut conn)).await?;

        Ok(WindowSnapshot {
            value: raw.map(decode),
            ttl: KeyTtl::from_reply(ttl),
        })
    }

    async fn set_with_expiry(
        &self,
        key: &str,
        value: i64,
        ttl_secs: u64,
    ) -> Result<(), StoreError> {
        let key = self.make_key(key);
        let mut conn = self.conn.clone();
        self.run(conn.set_ex::<_, _, ()>(&key, value, ttl_secs)).await
    }

    async fn increment_by(&self, key: &str, delta: i64) -> Result<i64, StoreError> {
        let key = self.make_key(key);
        let mut conn = self.conn.clone();
        self.run(conn.incr(&key, delta)).await
    }

    async fn decrement_by(&self, key: &str, delta: i64) -> Result<i64, StoreError> {
        let key = self.make_key(key);
        let mut conn = self.conn.clone();
        self.run(conn.decr(&key, delta)).await
    }
}

// Non-UTF-8 bytes survive as replacement characters and fail integer parsing.
fn decode(bytes: Vec<u8>) -> String {
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Server-side rejections (WRONGTYPE, overflow, invalid expire) become
/// `Command`; callers see them as `StoreUnavailable` like transport failures.
fn store_error(e: RedisError) -> StoreError {
    if is_connection_error(&e) {
        StoreError::Connection(e.to_string())
    } else if e.is_timeout() {
        StoreError::Timeout
    } else {
        StoreError::Command(e.to_string())
    }
}

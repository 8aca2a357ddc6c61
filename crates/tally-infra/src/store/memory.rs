//! In-memory counter store - reproduces the redis commands the window
//! protocol relies on, for tests and single-process development.
//!
//! Note: Counters are per-process and lost on restart.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use tally_core::ports::{CounterStore, KeyTtl, StoreError, WindowSnapshot};

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|exp| now >= exp)
    }

    fn ttl(&self, now: Instant) -> KeyTtl {
        match self.expires_at {
            // Redis rounds the remaining milliseconds to the nearest second
            Some(exp) => KeyTtl::Expires(((exp - now).as_millis() as u64 + 500) / 1000),
            None => KeyTtl::Persistent,
        }
    }
}

/// In-memory counter store using a HashMap behind an async RwLock.
///
/// Expiry follows the tokio clock, so paused-time tests can advance it.
#[derive(Default)]
pub struct InMemoryCounterStore {
    store: RwLock<HashMap<String, Entry>>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an arbitrary raw value, bypassing integer checks.
    pub async fn insert_raw(&self, key: &str, value: &str, ttl: Option<Duration>) {
        // A TTL past the clock's range never expires
        let expires_at = ttl.and_then(|d| Instant::now().checked_add(d));
        self.store.write().await.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
    }

    /// Remove a key, as if its expiry had elapsed.
    pub async fn delete(&self, key: &str) {
        self.store.write().await.remove(key);
    }

    async fn apply(&self, key: &str, delta: i64) -> Result<i64, StoreError> {
        let mut store = self.store.write().await;
        let now = Instant::now();

        if store.get(key).is_some_and(|e| e.is_expired(now)) {
            store.remove(key);
        }

        // A missing key starts from zero without an expiry, like INCRBY/DECRBY
        let entry = store.entry(key.to_string()).or_insert_with(|| Entry {
            value: "0".to_string(),
            expires_at: None,
        });

        let current: i64 = entry.value.parse().map_err(|_| {
            StoreError::Command("value is not an integer or out of range".to_string())
        })?;
        let next = current.checked_add(delta).ok_or_else(|| {
            StoreError::Command("increment or decrement would overflow".to_string())
        })?;

        entry.value = next.to_string();
        Ok(next)
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let store = self.store.read().await;
        let now = Instant::now();
        Ok(store
            .get(key)
            .filter(|e| !e.is_expired(now))
            .map(|e| e.value.clone()))
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl, StoreError> {
        let store = self.store.read().await;
        let now = Instant::now();
        Ok(store
            .get(key)
            .filter(|e| !e.is_expired(now))
            .map_or(KeyTtl::Missing, |e| e.ttl(now)))
    }

    async fn snapshot(&self, key: &str) -> Result<WindowSnapshot, StoreError> {
        let store = self.store.read().await;
        let now = Instant::now();
        let entry = store.get(key).filter(|e| !e.is_expired(now));

        Ok(WindowSnapshot {
            value: entry.map(|e| e.value.clone()),
            ttl: entry.map_or(KeyTtl::Missing, |e| e.ttl(now)),
        })
    }

    async fn set_with_expiry(
        &self,
        key: &str,
        value: i64,
        ttl_secs: u64,
    ) -> Result<(), StoreError> {
        self.insert_raw(key, &value.to_string(), Some(Duration::from_secs(ttl_secs)))
            .await;
        Ok(())
    }

    async fn increment_by(&self, key: &str, delta: i64) -> Result<i64, StoreError> {
        self.apply(key, delta).await
    }

    async fn decrement_by(&self, key: &str, delta: i64) -> Result<i64, StoreError> {
        let delta = delta
            .checked_neg()
            .ok_or_else(|| StoreError::Command("decrement would overflow".to_string()))?;
        self.apply(key, delta).await
    }
}

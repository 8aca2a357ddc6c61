//! Fixed-window hit counter over a shared counter store.
//!
//! Each key's window lives entirely in the store: the value is the counter and
//! the key's TTL is the time left in the window. Nothing is cached in-process.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use tally_core::domain::{WindowConfig, WindowHit, WindowValue};
use tally_core::error::{validate_key, validate_weight};
use tally_core::ports::{AbuseAudit, CounterStore, HitCounter, KeyTtl, NoopAbuseAudit, StoreError};
use tally_core::CounterError;

/// Distributed fixed-window counter.
///
/// Opening a window is a read followed by a separate write. Two callers that
/// both observe no open window will both write the initial value, and the
/// store keeps only the last one, so the first hits on a key can undercount.
/// Once a window is open, increments go through the store's atomic INCRBY
/// and are never lost.
pub struct WindowCounter {
    store: Arc<dyn CounterStore>,
    audit: Arc<dyn AbuseAudit>,
}

impl WindowCounter {
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self {
            store,
            audit: Arc::new(NoopAbuseAudit),
        }
    }

    /// Attach a hook that receives abuse reports.
    pub fn with_audit(mut self, audit: Arc<dyn AbuseAudit>) -> Self {
        self.audit = audit;
        self
    }

    async fn open_window(
        &self,
        key: &str,
        config: &WindowConfig,
        weight: u32,
    ) -> Result<WindowHit, CounterError> {
        let now = Utc::now();
        let expiry = config.expiry_seconds();

        self.store
            .set_with_expiry(key, i64::from(weight), expiry)
            .await
            .map_err(|e| unavailable(key, e))?;

        tracing::debug!(key = %key, weight, expiry_secs = expiry, "Window opened");
        Ok(WindowHit::opened(weight, config, now))
    }
}

#[async_trait]
impl HitCounter for WindowCounter {
    async fn increment(
        &self,
        key: &str,
        config: &WindowConfig,
        weight: u32,
    ) -> Result<WindowHit, CounterError> {
        validate_key(key)?;
        validate_weight(weight)?;
        config.validate()?;

        let now = Utc::now();
        let snapshot = self
            .store
            .snapshot(key)
            .await
            .map_err(|e| unavailable(key, e))?;

        match (WindowValue::parse(snapshot.value.as_deref()), snapshot.ttl) {
            (WindowValue::Present(_), KeyTtl::Expires(ttl_secs)) => {
                let counter = self
                    .store
                    .increment_by(key, i64::from(weight))
                    .await
                    .map_err(|e| unavailable(key, e))?;

                tracing::debug!(key = %key, weight, counter, ttl_secs, "Window incremented");
                Ok(WindowHit::counted(counter, ttl_secs, now))
            }
            (WindowValue::Present(counter), KeyTtl::Persistent) => {
                // An increment landed after the window expired and left a counter with no expiry
                tracing::warn!(key = %key, counter, "Counter has no expiry, reopening window");
                self.open_window(key, config, weight).await
            }
            (WindowValue::Absent, _) if snapshot.value.is_some() => {
                tracing::warn!(
                    key = %key,
                    value = ?snapshot.value,
                    "Corrupt counter value, reopening window"
                );
                self.open_window(key, config, weight).await
            }
            (WindowValue::Present(_), KeyTtl::Missing) => {
                tracing::debug!(key = %key, "Window expired while being read, reopening");
                self.open_window(key, config, weight).await
            }
            _ => self.open_window(key, config, weight).await,
        }
    }

    async fn decrement(&self, key: &str, weight: u32) -> Result<(), CounterError> {
        validate_key(key)?;
        validate_weight(weight)?;

        let counter = self
            .store
            .decrement_by(key, i64::from(weight))
            .await
            .map_err(|e| unavailable(key, e))?;

        tracing::debug!(key = %key, weight, counter, "Window decremented");
        Ok(())
    }

    fn audit_abuse(&self, key: &str, hit: &WindowHit) {
        self.audit.record(key, hit);
    }
}

fn unavailable(key: &str, e: StoreError) -> CounterError {
    tracing::warn!(key = %key, error = %e, "Counter store request failed");
    CounterError::StoreUnavailable(e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use tally_core::domain::MAX_INTERVAL_MILLIS;
    use tally_core::ports::WindowSnapshot;

    use crate::store::InMemoryCounterStore;

    /// Store whose every request fails, as if the connection were down.
    struct DownStore;

    #[async_trait]
    impl CounterStore for DownStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Connection("refused".to_string()))
        }

        async fn ttl(&self, _key: &str) -> Result<KeyTtl, StoreError> {
            Err(StoreError::Connection("refused".to_string()))
        }

        async fn snapshot(&self, _key: &str) -> Result<WindowSnapshot, StoreError> {
            Err(StoreError::Timeout)
        }

        async fn set_with_expiry(
            &self,
            _key: &str,
            _value: i64,
            _ttl_secs: u64,
        ) -> Result<(), StoreError> {
            Err(StoreError::Connection("refused".to_string()))
        }

        async fn increment_by(&self, _key: &str, _delta: i64) -> Result<i64, StoreError> {
            Err(StoreError::Connection("refused".to_string()))
        }

        async fn decrement_by(&self, _key: &str, _delta: i64) -> Result<i64, StoreError> {
            Err(StoreError::Connection("refused".to_string()))
        }
    }

    #[derive(Default)]
    struct RecordingAudit {
        reports: Mutex<Vec<(String, i64)>>,
    }

    impl AbuseAudit for RecordingAudit {
        fn record(&self, key: &str, hit: &WindowHit) {
            self.reports
                .lock()
                .unwrap()
                .push((key.to_string(), hit.counter));
        }
    }

    #[tokio::test]
    async fn test_store_failure_is_unavailable() {
        let counter = WindowCounter::new(Arc::new(DownStore));

        let err = counter
            .increment("k", &WindowConfig::new(1000), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, CounterError::StoreUnavailable(StoreError::Timeout)));

        let err = counter.decrement("k", 1).await.unwrap_err();
        assert!(matches!(
            err,
            CounterError::StoreUnavailable(StoreError::Connection(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_input_never_reaches_store() {
        let counter = WindowCounter::new(Arc::new(DownStore));
        let config = WindowConfig::new(1000);

        assert!(matches!(
            counter.increment("", &config, 1).await,
            Err(CounterError::InvalidInput(_))
        ));
        assert!(matches!(
            counter.increment("k", &config, 0).await,
            Err(CounterError::InvalidInput(_))
        ));
        assert!(matches!(
            counter.increment("k", &WindowConfig::new(0), 1).await,
            Err(CounterError::InvalidInput(_))
        ));
        assert!(matches!(
            counter
                .increment("k", &WindowConfig::new(MAX_INTERVAL_MILLIS + 1), 1)
                .await,
            Err(CounterError::InvalidInput(_))
        ));
        assert!(matches!(
            counter.decrement("k", 0).await,
            Err(CounterError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_audit_abuse_is_noop_by_default() {
        let counter = WindowCounter::new(Arc::new(InMemoryCounterStore::new()));
        let hit = counter
            .increment("k", &WindowConfig::new(1000), 1)
            .await
            .unwrap();
        counter.audit_abuse("k", &hit);
    }

    #[tokio::test]
    async fn test_audit_abuse_reaches_attached_hook() {
        let audit = Arc::new(RecordingAudit::default());
        let counter = WindowCounter::new(Arc::new(InMemoryCounterStore::new()))
            .with_audit(audit.clone());

        let hit = counter
            .increment("client:9", &WindowConfig::new(1000), 4)
            .await
            .unwrap();
        counter.audit_abuse("client:9", &hit);

        assert_eq!(
            *audit.reports.lock().unwrap(),
            vec![("client:9".to_string(), 4)]
        );
    }
}

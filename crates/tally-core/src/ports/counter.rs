//! Hit counter port.

use async_trait::async_trait;

use crate::domain::{WindowConfig, WindowHit};
use crate::error::CounterError;

/// Fixed-window hit counter - the surface a rate-limit policy layer calls.
///
/// The counter reports; it never decides. Whether a count exceeds a quota,
/// and whether a `StoreUnavailable` failure admits or rejects the request,
/// belong to the caller.
#[async_trait]
pub trait HitCounter: Send + Sync {
    /// Count a hit of `weight` against `key`, opening a window if none is open.
    async fn increment(
        &self,
        key: &str,
        config: &WindowConfig,
        weight: u32,
    ) -> Result<WindowHit, CounterError>;

    /// Take back `weight` from `key`, e.g. for a request that turned out not billable.
    async fn decrement(&self, key: &str, weight: u32) -> Result<(), CounterError>;

    /// Report abusive usage of `key`.
    fn audit_abuse(&self, key: &str, hit: &WindowHit);
}

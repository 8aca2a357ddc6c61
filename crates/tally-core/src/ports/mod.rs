//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that infrastructure must implement.

mod audit;
mod counter;
mod store;

pub use audit::{AbuseAudit, NoopAbuseAudit};
pub use counter::HitCounter;
pub use store::{CounterStore, KeyTtl, StoreError, WindowSnapshot};

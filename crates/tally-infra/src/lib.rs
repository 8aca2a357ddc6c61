//! # Tally Infrastructure
//!
//! Concrete implementations of the ports defined in `tally-core`: the
//! fixed-window counter protocol and the stores it runs against.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - No external dependencies, in-memory store only
//! - `redis` - Redis counter store (single node, sentinel or cluster)

pub mod counter;
pub mod store;

// Re-exports - In-Memory
pub use counter::WindowCounter;
pub use store::InMemoryCounterStore;

// Re-exports - Redis
#[cfg(feature = "redis")]
pub use store::{RedisCounterStore, RedisStoreConfig, StoreConnection, StoreTopology};

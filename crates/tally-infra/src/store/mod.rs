//! Counter store implementations - Redis and an in-memory stand-in.

mod memory;

pub use memory::InMemoryCounterStore;

#[cfg(feature = "redis")]
mod config;
#[cfg(feature = "redis")]
mod connection;
#[cfg(feature = "redis")]
mod redis;
#[cfg(feature = "redis")]
pub use self::config::{RedisStoreConfig, StoreTopology};
#[cfg(feature = "redis")]
pub use self::connection::{SentinelConnection, StoreConnection};
#[cfg(feature = "redis")]
pub use self::redis::RedisCounterStore;

//! # Tally Core
//!
//! The domain layer of the fixed-window counter.
//! This crate contains the window protocol's value types and the ports that
//! infrastructure must implement. It has no network dependencies.

pub mod domain;
pub mod error;
pub mod ports;

pub use error::CounterError;

//! Counter-level error types.

use thiserror::Error;

use crate::ports::StoreError;

/// Errors surfaced to the caller of a [`HitCounter`](crate::ports::HitCounter).
#[derive(Debug, Error)]
pub enum CounterError {
    /// The store connection failed, timed out or rejected the command.
    ///
    /// Server-side rejections (a non-integer value under INCRBY, overflow,
    /// WRONGTYPE) are reported here too: either way the rate-limit decision
    /// is unknown. A failed increment may or may not have landed on the store.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Reject an empty key before it reaches the store.
pub fn validate_key(key: &str) -> Result<(), CounterError> {
    if key.is_empty() {
        return Err(CounterError::InvalidInput("key must not be empty".to_string()));
    }
    Ok(())
}

/// Reject a zero weight before it reaches the store.
pub fn validate_weight(weight: u32) -> Result<(), CounterError> {
    if weight == 0 {
        return Err(CounterError::InvalidInput(
            "weight must be a positive integer".to_string(),
        ));
    }
    Ok(())
}

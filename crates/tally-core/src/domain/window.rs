//! Fixed-window value objects.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CounterError;

/// Longest accepted window: one year. Keeps the expiry well inside the range
/// the store accepts for SETEX.
pub const MAX_INTERVAL_MILLIS: u64 = 365 * 24 * 60 * 60 * 1000;

/// Window configuration supplied by the caller on every hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Fixed-window length in milliseconds.
    pub interval_millis: u64,
}

impl WindowConfig {
    pub fn new(interval_millis: u64) -> Self {
        Self { interval_millis }
    }

    pub fn from_duration(interval: Duration) -> Self {
        Self::new(u64::try_from(interval.as_millis()).unwrap_or(u64::MAX))
    }

    /// Expiry to set on a freshly opened window, in whole seconds.
    ///
    /// The store tracks expiry at second granularity, so the interval is
    /// rounded up. A window may outlive its configured interval by up to 999ms.
    pub fn expiry_seconds(&self) -> u64 {
        self.interval_millis.div_ceil(1000)
    }

    pub fn validate(&self) -> Result<(), CounterError> {
        if self.interval_millis == 0 {
            return Err(CounterError::InvalidInput(
                "window interval must be positive".to_string(),
            ));
        }
        if self.interval_millis > MAX_INTERVAL_MILLIS {
            return Err(CounterError::InvalidInput(format!(
                "window interval must not exceed {MAX_INTERVAL_MILLIS}ms"
            )));
        }
        Ok(())
    }
}

/// Counter value and window end reported for one hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowHit {
    /// Accumulated weight in the current window.
    pub counter: i64,
    /// Approximate absolute end of the window.
    pub window_end: DateTime<Utc>,
}

impl WindowHit {
    /// Hit that opened a new window at `now`.
    pub fn opened(weight: u32, config: &WindowConfig, now: DateTime<Utc>) -> Self {
        let interval = i64::try_from(config.interval_millis).unwrap_or(i64::MAX);
        Self {
            counter: i64::from(weight),
            window_end: offset(now, TimeDelta::milliseconds(interval)),
        }
    }

    /// Hit counted in an already open window whose remaining TTL was observed at `now`.
    pub fn counted(counter: i64, ttl_secs: u64, now: DateTime<Utc>) -> Self {
        let ttl = i64::try_from(ttl_secs).unwrap_or(i64::MAX / 1000);
        Self {
            counter,
            window_end: offset(now, TimeDelta::try_seconds(ttl).unwrap_or(TimeDelta::MAX)),
        }
    }
}

fn offset(now: DateTime<Utc>, delta: TimeDelta) -> DateTime<Utc> {
    now.checked_add_signed(delta).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// A stored counter value, collapsed to the two cases the window protocol
/// branches on. A missing key and an unparseable value are both `Absent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowValue {
    Present(i64),
    Absent,
}

impl WindowValue {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.and_then(parse_counter) {
            Some(n) => Self::Present(n),
            None => Self::Absent,
        }
    }
}

/// Accept only the canonical integer form the store's INCRBY accepts:
/// optional minus sign, no leading zeros, no padding or plus sign.
fn parse_counter(raw: &str) -> Option<i64> {
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    let canonical = match digits.as_bytes() {
        [b'0'] => raw == "0",
        [b'1'..=b'9', rest @ ..] => rest.iter().all(u8::is_ascii_digit),
        _ => false,
    };
    if canonical { raw.parse().ok() } else { None }
}

//! Domain value objects.

mod window;

pub use window::{MAX_INTERVAL_MILLIS, WindowConfig, WindowHit, WindowValue};

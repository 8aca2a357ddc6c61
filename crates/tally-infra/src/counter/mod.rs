//! Hit counter implementations.

mod window;

pub use window::WindowCounter;

//! Hashing and logging helpers.

pub mod hash;
pub mod logging;

pub use hash::Fingerprint;
pub use logging::{init_logging, LogConfig};

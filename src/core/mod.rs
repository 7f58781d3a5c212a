//! Configuration, the crate error type, and the verdict and summary types
//! shared by the detection and scanning layers.

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use types::{ReputationVerdict, ScanSummary, SuspicionReason, Verdict};

//! hashward: a hash-based malware scanner with quarantine.
//!
//! Files under a directory are fingerprinted and classified in three tiers:
//! known-bad signatures, an external reputation service, and a metadata
//! heuristic. Suspicious files are moved into a quarantine directory. Scans
//! run once over a directory or keep watching it for changes.

pub mod core;
pub mod detection;
pub mod quarantine;
pub mod scanner;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use crate::core::config::Config;
pub use crate::core::error::{Error, Result};
pub use crate::core::types::*;

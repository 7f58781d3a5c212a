//! Directory scanning.
//!
//! Batch mode walks a directory once; monitor mode does the same walk as a
//! baseline and then consumes change events from a [`watcher`].

pub mod counters;
pub mod engine;
pub mod watcher;

pub use counters::ScanCounters;
pub use engine::{EngineOptions, ScanEngine};
pub use watcher::{spawn_watcher, FileEvent, FileEventKind, WatcherGuard};

//! Running scan counters.

use crate::core::types::{ScanStatus, ScanSummary};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

/// Aggregate counters shared by batch and monitor mode.
///
/// Counters only ever go up. Readers take a [`ScanSummary`] snapshot.
#[derive(Debug, Default)]
pub struct ScanCounters {
    files_scanned: AtomicU64,
    malware_found: AtomicU64,
    files_quarantined: AtomicU64,
    errors: AtomicU64,
}

impl ScanCounters {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a file being considered.
    pub fn record_file(&self) {
        self.files_scanned.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a suspicious verdict.
    pub fn record_malware(&self) {
        self.malware_found.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful quarantine move.
    pub fn record_quarantine(&self) {
        self.files_quarantined.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a per-file failure.
    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn files_scanned(&self) -> u64 {
        self.files_scanned.load(Ordering::Relaxed)
    }

    pub fn malware_found(&self) -> u64 {
        self.malware_found.load(Ordering::Relaxed)
    }

    pub fn files_quarantined(&self) -> u64 {
        self.files_quarantined.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    /// Snapshot the counters into a summary.
    pub fn snapshot(
        &self,
        target: PathBuf,
        start_time: DateTime<Utc>,
        end_time: Option<DateTime<Utc>>,
        status: ScanStatus,
    ) -> ScanSummary {
        ScanSummary {
            target,
            start_time,
            end_time,
            status,
            files_scanned: self.files_scanned(),
            malware_found: self.malware_found(),
            files_quarantined: self.files_quarantined(),
            errors: self.errors(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_counters_increment() {
        let counters = ScanCounters::new();
        counters.record_file();
        counters.record_file();
        counters.record_malware();
        counters.record_quarantine();
        counters.record_error();

        let summary = counters.snapshot(
            PathBuf::from("/scan"),
            Utc::now(),
            None,
            ScanStatus::Running,
        );
        assert_eq!(summary.files_scanned, 2);
        assert_eq!(summary.malware_found, 1);
        assert_eq!(summary.files_quarantined, 1);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.duration_secs(), None);
    }

    #[test]
    fn test_concurrent_increments() {
        let counters = Arc::new(ScanCounters::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let counters = Arc::clone(&counters);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        counters.record_file();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(counters.files_scanned(), 8000);
    }
}

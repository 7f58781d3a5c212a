//! Core type definitions used throughout hashward.

use crate::detection::heuristic::FileTraits;
use crate::utils::hash::Fingerprint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Why a file was judged suspicious. Exactly one reason is recorded, chosen by
/// tier order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuspicionReason {
    /// Exact match against a known-bad fingerprint
    SignatureMatch,
    /// The reputation service reported malicious verdicts
    ReputationFlag,
    /// Local metadata heuristic fired
    HeuristicFlag,
}

impl std::fmt::Display for SuspicionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SuspicionReason::SignatureMatch => write!(f, "signature match"),
            SuspicionReason::ReputationFlag => write!(f, "reputation flag"),
            SuspicionReason::HeuristicFlag => write!(f, "heuristic flag"),
        }
    }
}

/// Classification outcome for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "verdict", content = "reason", rename_all = "snake_case")]
pub enum Verdict {
    Clean,
    Suspicious(SuspicionReason),
}

impl Verdict {
    /// Whether the verdict requires quarantine.
    pub fn is_suspicious(&self) -> bool {
        matches!(self, Verdict::Suspicious(_))
    }

    /// The reason, if suspicious.
    pub fn reason(&self) -> Option<SuspicionReason> {
        match self {
            Verdict::Clean => None,
            Verdict::Suspicious(reason) => Some(*reason),
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Clean => write!(f, "clean"),
            Verdict::Suspicious(reason) => write!(f, "suspicious ({})", reason),
        }
    }
}

/// Three-way answer from the reputation service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReputationVerdict {
    Malicious,
    Clean,
    /// Service disabled, unreachable, slow, or answered with something unusable
    Unknown,
}

/// Everything gathered about one file during a single scan attempt.
/// Never persisted.
#[derive(Debug, Clone)]
pub struct FileObservation {
    pub path: PathBuf,
    pub fingerprint: Fingerprint,
    pub traits: FileTraits,
}

/// Current status of a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    /// Scan is currently running
    Running,
    /// Batch scan visited every enumerated file
    Completed,
    /// Batch scan was interrupted
    Cancelled,
    /// Monitor mode shut down on request
    Stopped,
}

impl std::fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanStatus::Running => write!(f, "Running"),
            ScanStatus::Completed => write!(f, "Completed"),
            ScanStatus::Cancelled => write!(f, "Cancelled"),
            ScanStatus::Stopped => write!(f, "Stopped"),
        }
    }
}

/// Point-in-time copy of the engine counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSummary {
    /// Directory being scanned
    pub target: PathBuf,
    /// When the engine started
    pub start_time: DateTime<Utc>,
    /// When the engine stopped, if it has
    pub end_time: Option<DateTime<Utc>>,
    /// Status at the time of the snapshot
    pub status: ScanStatus,
    /// Files considered
    pub files_scanned: u64,
    /// Files with a suspicious verdict
    pub malware_found: u64,
    /// Suspicious files successfully moved to quarantine
    pub files_quarantined: u64,
    /// Per-file failures (read or quarantine)
    pub errors: u64,
}

impl ScanSummary {
    /// Calculate scan duration in seconds.
    pub fn duration_secs(&self) -> Option<i64> {
        self.end_time
            .map(|end| (end - self.start_time).num_seconds())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_helpers() {
        assert!(!Verdict::Clean.is_suspicious());
        assert_eq!(Verdict::Clean.reason(), None);

        let verdict = Verdict::Suspicious(SuspicionReason::ReputationFlag);
        assert!(verdict.is_suspicious());
        assert_eq!(verdict.reason(), Some(SuspicionReason::ReputationFlag));
        assert_eq!(verdict.to_string(), "suspicious (reputation flag)");
    }

    #[test]
    fn test_verdict_serialization() {
        let json =
            serde_json::to_string(&Verdict::Suspicious(SuspicionReason::SignatureMatch)).unwrap();
        assert_eq!(json, r#"{"verdict":"suspicious","reason":"signature_match"}"#);
    }
}

//! Lowest-confidence tier: a cheap metadata test.
//!
//! A file is flagged only when all three signals agree: a risky extension, a
//! recent creation time, and execute permission. Each metadata read is kept as
//! an explicit `Option`; a missing value means "not suspicious".

use crate::core::config::DetectionConfig;
use std::collections::HashSet;
use std::fs::Metadata;
use std::path::Path;
use std::time::{Duration, SystemTime};

/// Metadata the heuristic looks at, each read independently.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileTraits {
    /// Lowercased extension without the dot
    pub extension: Option<String>,
    /// Creation (birth) time, where the platform and filesystem report it
    pub created: Option<SystemTime>,
    /// Whether the current process could execute the file
    pub executable: Option<bool>,
    /// Size in bytes
    pub size: Option<u64>,
}

impl FileTraits {
    /// Gather traits for a path. Never fails; unreadable fields stay `None`.
    pub fn read(path: &Path) -> Self {
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase());

        match std::fs::metadata(path) {
            Ok(metadata) => Self {
                extension,
                created: metadata.created().ok(),
                executable: executable_by_us(path, &metadata),
                size: Some(metadata.len()),
            },
            Err(e) => {
                log::debug!("Could not stat {:?} for heuristics: {}", path, e);
                Self {
                    extension,
                    ..Self::default()
                }
            }
        }
    }
}

/// Ask the kernel whether this process may execute the file. A mode bit set
/// for some other user does not count.
#[cfg(unix)]
fn executable_by_us(path: &Path, metadata: &Metadata) -> Option<bool> {
    use rustix::fs::{access, Access};

    if !metadata.is_file() {
        return Some(false);
    }
    Some(access(path, Access::EXEC_OK).is_ok())
}

#[cfg(not(unix))]
fn executable_by_us(_path: &Path, _metadata: &Metadata) -> Option<bool> {
    None
}

/// Extension + recency + executability test.
#[derive(Debug, Clone)]
pub struct HeuristicEvaluator {
    extensions: HashSet<String>,
    window: Duration,
}

impl HeuristicEvaluator {
    /// Default recency window (one hour).
    pub const DEFAULT_WINDOW: Duration = Duration::from_secs(3600);

    /// Create an evaluator from an extension list and a recency window.
    pub fn new<I, S>(extensions: I, window: Duration) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|ext| ext.as_ref().trim_start_matches('.').to_lowercase())
                .collect(),
            window,
        }
    }

    /// Create an evaluator from the detection configuration.
    pub fn from_config(config: &DetectionConfig) -> Self {
        Self::new(
            &config.suspicious_extensions,
            Duration::from_secs(config.heuristic_window_secs),
        )
    }

    /// Evaluate against the current clock.
    pub fn suspicious(&self, traits: &FileTraits) -> bool {
        self.suspicious_at(traits, SystemTime::now())
    }

    /// Evaluate against a fixed "now".
    pub fn suspicious_at(&self, traits: &FileTraits, now: SystemTime) -> bool {
        let risky_extension = traits
            .extension
            .as_ref()
            .is_some_and(|ext| self.extensions.contains(ext));
        if !risky_extension {
            return false;
        }

        let recent = match traits.created {
            // A creation time in the future (clock skew) counts as recent.
            Some(created) => now
                .duration_since(created)
                .map_or(true, |age| age <= self.window),
            None => false,
        };

        recent && traits.executable == Some(true)
    }
}

impl Default for HeuristicEvaluator {
    fn default() -> Self {
        Self::from_config(&DetectionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn traits(ext: &str, age_secs: u64, exec: bool, now: SystemTime) -> FileTraits {
        FileTraits {
            extension: Some(ext.to_string()),
            created: Some(now - Duration::from_secs(age_secs)),
            executable: Some(exec),
            size: Some(10),
        }
    }

    #[test]
    fn test_all_signals_required() {
        let eval = HeuristicEvaluator::default();
        let now = SystemTime::now();

        assert!(eval.suspicious_at(&traits("exe", 60, true, now), now));
        assert!(!eval.suspicious_at(&traits("txt", 60, true, now), now));
        assert!(!eval.suspicious_at(&traits("exe", 7200, true, now), now));
        assert!(!eval.suspicious_at(&traits("exe", 60, false, now), now));
    }

    #[test]
    fn test_missing_metadata_is_not_suspicious() {
        let eval = HeuristicEvaluator::default();
        let now = SystemTime::now();

        let mut no_created = traits("exe", 60, true, now);
        no_created.created = None;
        assert!(!eval.suspicious_at(&no_created, now));

        let mut no_exec = traits("exe", 60, true, now);
        no_exec.executable = None;
        assert!(!eval.suspicious_at(&no_exec, now));

        assert!(!eval.suspicious_at(&FileTraits::default(), now));
    }

    #[test]
    fn test_future_creation_counts_as_recent() {
        let eval = HeuristicEvaluator::default();
        let now = SystemTime::now();
        let mut t = traits("bat", 0, true, now);
        t.created = Some(now + Duration::from_secs(30));
        assert!(eval.suspicious_at(&t, now));
    }

    #[test]
    fn test_extension_normalization() {
        let eval = HeuristicEvaluator::new([".EXE"], HeuristicEvaluator::DEFAULT_WINDOW);
        let now = SystemTime::now();
        assert!(eval.suspicious_at(&traits("exe", 1, true, now), now));
    }

    #[test]
    fn test_read_missing_file() {
        let traits = FileTraits::read(Path::new("/definitely/not/here.exe"));
        assert_eq!(traits.extension.as_deref(), Some("exe"));
        assert_eq!(traits.created, None);
        assert_eq!(traits.executable, None);
        assert!(!HeuristicEvaluator::default().suspicious(&traits));
    }

    #[cfg(unix)]
    #[test]
    fn test_read_executable_bit() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.sh");
        std::fs::write(&path, b"#!/bin/sh\n").unwrap();

        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();
        assert_eq!(FileTraits::read(&path).executable, Some(false));

        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        assert_eq!(FileTraits::read(&path).executable, Some(true));
    }

    #[cfg(unix)]
    #[test]
    fn test_execute_bit_for_others_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let locked = dir.path().join("locked");
        std::fs::write(&locked, b"x").unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();
        // Root may execute anything with some execute bit set.
        if std::fs::read(&locked).is_ok() {
            return;
        }

        // Group and other may execute; the owning user may not.
        let path = dir.path().join("dropper.exe");
        std::fs::write(&path, b"MZ").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o611)).unwrap();

        let traits = FileTraits::read(&path);
        assert_eq!(traits.executable, Some(false));
        assert!(!HeuristicEvaluator::default().suspicious(&traits));
    }
}

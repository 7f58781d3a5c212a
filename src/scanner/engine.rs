//! Scan orchestration: batch walks and event-driven monitoring.

use crate::core::config::ScanConfig;
use crate::core::error::{Error, Result};
use crate::core::types::{ScanStatus, ScanSummary, Verdict};
use crate::detection::Classifier;
use crate::quarantine::QuarantineVault;
use crate::scanner::counters::ScanCounters;
use crate::scanner::watcher::FileEvent;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use tokio::sync::mpsc;
use walkdir::WalkDir;

/// Options for directory traversal.
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// Follow symbolic links while walking
    pub follow_symlinks: bool,
    /// Paths containing any of these substrings are skipped
    pub exclude_paths: Vec<String>,
}

impl EngineOptions {
    pub fn from_config(config: &ScanConfig) -> Self {
        Self {
            follow_symlinks: config.follow_symlinks,
            exclude_paths: config.exclude_paths.clone(),
        }
    }

    fn is_excluded(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();
        self.exclude_paths
            .iter()
            .any(|excluded| !excluded.is_empty() && path_str.contains(excluded.as_str()))
    }
}

#[derive(Debug)]
struct RunState {
    target: PathBuf,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    status: ScanStatus,
}

/// Drives classification and quarantine over a directory.
///
/// Files are processed one at a time; every per-file failure is logged and
/// counted, never propagated.
pub struct ScanEngine {
    classifier: Classifier,
    vault: QuarantineVault,
    options: EngineOptions,
    counters: ScanCounters,
    cancelled: AtomicBool,
    run: RwLock<RunState>,
}

impl ScanEngine {
    pub fn new(classifier: Classifier, vault: QuarantineVault, options: EngineOptions) -> Self {
        Self {
            classifier,
            vault,
            options,
            counters: ScanCounters::new(),
            cancelled: AtomicBool::new(false),
            run: RwLock::new(RunState {
                target: PathBuf::new(),
                start_time: Utc::now(),
                end_time: None,
                status: ScanStatus::Running,
            }),
        }
    }

    /// Request that a batch walk stop before the next file.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Live counters.
    pub fn counters(&self) -> &ScanCounters {
        &self.counters
    }

    /// The quarantine vault in use.
    pub fn vault(&self) -> &QuarantineVault {
        &self.vault
    }

    /// Snapshot of the counters and run state.
    pub fn summary(&self) -> ScanSummary {
        match self.run.read() {
            Ok(run) => self.counters.snapshot(
                run.target.clone(),
                run.start_time,
                run.end_time,
                run.status,
            ),
            Err(poisoned) => {
                let run = poisoned.into_inner();
                self.counters.snapshot(
                    run.target.clone(),
                    run.start_time,
                    run.end_time,
                    run.status,
                )
            }
        }
    }

    /// Check the target before any counter exists.
    fn validate_target(dir: &Path) -> Result<()> {
        if dir.is_dir() {
            Ok(())
        } else {
            Err(Error::InvalidTarget(dir.to_path_buf()))
        }
    }

    fn begin(&self, dir: &Path) {
        if let Ok(mut run) = self.run.write() {
            run.target = dir.to_path_buf();
            run.start_time = Utc::now();
            run.end_time = None;
            run.status = ScanStatus::Running;
        }
    }

    fn finish(&self, status: ScanStatus) -> ScanSummary {
        if let Ok(mut run) = self.run.write() {
            run.end_time = Some(Utc::now());
            run.status = status;
        }
        let summary = self.summary();
        log::info!(
            "Scan {}: {} files, {} malware, {} quarantined, {} errors",
            summary.status,
            summary.files_scanned,
            summary.malware_found,
            summary.files_quarantined,
            summary.errors
        );
        summary
    }

    /// Scan every regular file under `dir` once.
    pub async fn scan_directory(&self, dir: &Path) -> Result<ScanSummary> {
        Self::validate_target(dir)?;
        self.begin(dir);
        log::info!("Starting scan of {:?}", dir);

        self.walk(dir).await;

        let status = if self.is_cancelled() {
            ScanStatus::Cancelled
        } else {
            ScanStatus::Completed
        };
        Ok(self.finish(status))
    }

    /// Baseline scan of `dir`, then process events until `shutdown`
    /// resolves or the event source closes.
    ///
    /// An event already being processed when `shutdown` fires runs to
    /// completion.
    pub async fn monitor<F>(
        &self,
        dir: &Path,
        mut events: mpsc::Receiver<FileEvent>,
        shutdown: F,
    ) -> Result<ScanSummary>
    where
        F: Future<Output = ()>,
    {
        Self::validate_target(dir)?;
        self.begin(dir);
        log::info!("Starting baseline scan of {:?} before monitoring", dir);

        tokio::pin!(shutdown);

        let baseline = self.walk(dir);
        tokio::pin!(baseline);

        let interrupted = tokio::select! {
            biased;
            _ = &mut shutdown => true,
            _ = &mut baseline => false,
        };

        if interrupted {
            log::info!("Stop requested during baseline scan");
            self.cancel();
            // Lets the file in progress finish; the walk stops at the flag
            // before the next one.
            baseline.await;
            events.close();
            return Ok(self.finish(ScanStatus::Stopped));
        }

        log::info!("Baseline complete, monitoring {:?}", dir);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    log::info!("Stop requested, shutting down monitor");
                    break;
                }
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => {
                        log::info!("Event source closed");
                        break;
                    }
                },
            }
        }

        events.close();
        Ok(self.finish(ScanStatus::Stopped))
    }

    /// Walk `dir` in file-name order, processing each regular file.
    async fn walk(&self, dir: &Path) {
        let walker = WalkDir::new(dir)
            .follow_links(self.options.follow_symlinks)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !self.skip_path(e.path()));

        for entry in walker {
            if self.is_cancelled() {
                log::info!("Scan cancelled");
                break;
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    // An entry that cannot be walked is a file we failed to read.
                    self.counters.record_file();
                    self.counters.record_error();
                    let err = Error::Walk {
                        root: dir.to_path_buf(),
                        reason: e.to_string(),
                    };
                    log::error!("{}", err);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            self.process_file(entry.path(), false).await;

            // Give a pending shutdown a chance to be seen between files.
            tokio::task::yield_now().await;
        }
    }

    /// Whether a path is kept out of scanning entirely.
    fn skip_path(&self, path: &Path) -> bool {
        self.vault.contains(path) || self.options.is_excluded(path)
    }

    /// Filter a change event and classify the file it names.
    async fn handle_event(&self, event: FileEvent) {
        if !event.wants_scan() {
            log::trace!("Ignoring {:?} event for {:?}", event.kind, event.path);
            return;
        }

        if self.skip_path(&event.path) {
            log::trace!("Ignoring event for excluded path {:?}", event.path);
            return;
        }

        let metadata = if self.options.follow_symlinks {
            std::fs::metadata(&event.path)
        } else {
            std::fs::symlink_metadata(&event.path)
        };

        match metadata {
            Ok(metadata) if !metadata.is_file() => {
                log::trace!("Ignoring event for non-regular file {:?}", event.path);
                return;
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                // Usually a trailing event for a file we just quarantined.
                log::debug!("Event path {:?} no longer exists", event.path);
                return;
            }
            _ => {}
        }

        self.process_file(&event.path, true).await;
    }

    /// Per-file boundary: classify, quarantine if needed, and count.
    ///
    /// With `missing_ok`, a file that vanished before it could be read is
    /// dropped without touching the counters.
    async fn process_file(&self, path: &Path, missing_ok: bool) {
        let observation = match self.classifier.observe(path) {
            Ok(observation) => observation,
            Err(e) if missing_ok && e.is_not_found() => {
                log::debug!("{:?} vanished before it could be read", path);
                return;
            }
            Err(e) => {
                self.counters.record_file();
                self.counters.record_error();
                log::error!("{}: {}", e, error_cause(&e));
                return;
            }
        };

        self.counters.record_file();
        log::trace!("Scanning {:?} ({})", path, observation.fingerprint);

        let reason = match self.classifier.classify_observation(&observation).await {
            Verdict::Clean => return,
            Verdict::Suspicious(reason) => reason,
        };

        self.counters.record_malware();
        log::warn!("Malware detected ({}): {:?}", reason, path);

        match self.vault.isolate(path) {
            Ok(destination) => {
                self.counters.record_quarantine();
                log::info!("Moved {:?} to quarantine as {:?}", path, destination);
            }
            Err(e) => {
                self.counters.record_error();
                log::error!("{}: {}", e, error_cause(&e));
            }
        }
    }
}

fn error_cause(err: &Error) -> String {
    match std::error::Error::source(err) {
        Some(source) => source.to_string(),
        None => err.category().to_string(),
    }
}

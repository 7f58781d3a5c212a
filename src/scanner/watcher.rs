//! Filesystem change notifications for monitor mode.
//!
//! The platform watcher runs on its own thread and pushes [`FileEvent`]s into
//! a bounded channel; the engine owns the receiving end.

use crate::core::error::{Error, Result};
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

/// Kind of change reported for a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEventKind {
    Created,
    Modified,
    Removed,
    Other,
}

/// One change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    pub kind: FileEventKind,
    pub path: PathBuf,
    /// Whether the path was a directory when the event was translated
    pub is_dir: bool,
}

impl FileEvent {
    /// Create an event, probing the path for directory-ness.
    pub fn new(kind: FileEventKind, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let is_dir = path.is_dir();
        Self { kind, path, is_dir }
    }

    /// Whether the engine should classify the path this event names.
    pub fn wants_scan(&self) -> bool {
        !self.is_dir && matches!(self.kind, FileEventKind::Created | FileEventKind::Modified)
    }
}

/// Keeps the platform watcher alive. Dropping it stops the event source and
/// closes the channel.
pub struct WatcherGuard {
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl std::fmt::Debug for WatcherGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherGuard")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl WatcherGuard {
    /// Directory being watched.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Map a notify event kind onto ours.
fn translate_kind(kind: &EventKind) -> FileEventKind {
    match kind {
        EventKind::Create(_) => FileEventKind::Created,
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => FileEventKind::Removed,
        // A file renamed into the tree shows up here, not as a create.
        EventKind::Modify(ModifyKind::Name(_)) => FileEventKind::Created,
        EventKind::Modify(_) => FileEventKind::Modified,
        EventKind::Remove(_) => FileEventKind::Removed,
        _ => FileEventKind::Other,
    }
}

/// Translate one notify event into zero or more file events.
fn translate(event: Event) -> Vec<FileEvent> {
    let kind = translate_kind(&event.kind);
    event
        .paths
        .into_iter()
        .map(|path| FileEvent::new(kind, path))
        .collect()
}

/// Start watching `dir` recursively.
///
/// Events are delivered through a channel holding at most `capacity`
/// pending events; when it is full the watcher thread waits.
pub fn spawn_watcher(
    dir: &Path,
    capacity: usize,
) -> Result<(WatcherGuard, mpsc::Receiver<FileEvent>)> {
    let (tx, rx) = mpsc::channel(capacity.max(1));

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            for file_event in translate(event) {
                if tx.blocking_send(file_event).is_err() {
                    // Receiver gone; the engine has stopped.
                    return;
                }
            }
        }
        Err(e) => log::warn!("File watcher error: {}", e),
    })
    .map_err(|e| Error::Watch {
        path: dir.to_path_buf(),
        reason: e.to_string(),
    })?;

    watcher
        .watch(dir, RecursiveMode::Recursive)
        .map_err(|e| Error::Watch {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        })?;

    log::info!("Watching {:?} for changes", dir);

    Ok((
        WatcherGuard {
            _watcher: watcher,
            root: dir.to_path_buf(),
        },
        rx,
    ))
}

//! Quarantine vault manager.
//!
//! Suspicious files are moved, not copied, into the vault root and renamed to
//! `<YYYYMMDD_HHMMSS>_<basename>`. The file name is the whole record: there
//! is no separate index.

use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::core::error::{Error, Result};

/// Timestamp prefix format of quarantined file names.
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Length of a formatted timestamp prefix.
const TIMESTAMP_LEN: usize = 15;

/// Upper bound on tie-break suffixes tried for one destination.
const MAX_SUFFIX: u32 = 10_000;

/// A quarantined file, decoded from its stored name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuarantineRecord {
    /// Where the file lives inside the vault
    pub stored_path: PathBuf,
    /// Basename the file had before quarantine
    pub original_name: String,
    /// Second-resolution local time of the quarantine action
    pub timestamp: NaiveDateTime,
}

/// Quarantine vault.
pub struct QuarantineVault {
    /// Base path for the quarantine vault
    base_path: PathBuf,
    /// Serialises destination selection and the move itself
    reserve: Mutex<()>,
}

impl QuarantineVault {
    /// Create or open a quarantine vault at the specified path.
    pub fn open(base_path: &Path) -> Result<Self> {
        fs::create_dir_all(base_path).map_err(|e| Error::DirectoryAccess {
            path: base_path.to_path_buf(),
            source: e,
        })?;

        // Canonical form lets `contains` compare against canonical scan paths.
        let base_path = base_path.canonicalize().map_err(|e| Error::DirectoryAccess {
            path: base_path.to_path_buf(),
            source: e,
        })?;

        Ok(Self {
            base_path,
            reserve: Mutex::new(()),
        })
    }

    /// Get the base path of the vault.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Whether `path` lies inside the vault.
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.base_path)
            || path
                .canonicalize()
                .is_ok_and(|canonical| canonical.starts_with(&self.base_path))
    }

    /// Move a file into the vault and return its new location.
    ///
    /// On failure the original file is left where it was.
    pub fn isolate(&self, path: &Path) -> Result<PathBuf> {
        let basename = path.file_name().ok_or_else(|| {
            Error::quarantine_failed(
                path,
                io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"),
            )
        })?;

        let metadata = fs::symlink_metadata(path).map_err(|e| Error::quarantine_failed(path, e))?;
        if !metadata.is_file() {
            return Err(Error::quarantine_failed(
                path,
                io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"),
            ));
        }

        let _guard = self
            .reserve
            .lock()
            .map_err(|_| Error::Internal("quarantine reservation lock poisoned".to_string()))?;

        let stamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
        let destination = self
            .free_destination(&stamp, basename)
            .map_err(|e| Error::quarantine_failed(path, e))?;

        move_file(path, &destination).map_err(|e| Error::quarantine_failed(path, e))?;

        log::debug!("Renamed {:?} -> {:?}", path, destination);
        Ok(destination)
    }

    /// Pick `<stamp>_<basename>`, or `<stamp>_<basename>_<n>` if taken.
    /// The basename is kept byte for byte, even when it is not UTF-8.
    fn free_destination(&self, stamp: &str, basename: &OsStr) -> io::Result<PathBuf> {
        let mut base = OsString::from(format!("{}_", stamp));
        base.push(basename);
        let candidate = self.base_path.join(&base);
        if !exists(&candidate)? {
            return Ok(candidate);
        }

        for n in 1..=MAX_SUFFIX {
            let mut name = base.clone();
            name.push(format!("_{}", n));
            let candidate = self.base_path.join(name);
            if !exists(&candidate)? {
                return Ok(candidate);
            }
        }

        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("no free quarantine name for {:?}", base),
        ))
    }

    /// List quarantined files, oldest first.
    pub fn list(&self) -> Result<Vec<QuarantineRecord>> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| Error::DirectoryAccess {
            path: self.base_path.clone(),
            source: e,
        })?;

        let mut records: Vec<QuarantineRecord> = entries
            .flatten()
            .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
            .filter_map(|entry| parse_record(&entry.path()))
            .collect();

        records.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.stored_path.cmp(&b.stored_path))
        });
        Ok(records)
    }

    /// Number of quarantined files.
    pub fn count(&self) -> Result<usize> {
        Ok(self.list()?.len())
    }
}

fn exists(path: &Path) -> io::Result<bool> {
    match fs::symlink_metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Rename, or copy-then-remove when the vault is on another filesystem.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device(&e) => copy_then_remove(from, to),
        Err(e) => Err(e),
    }
}

#[cfg(unix)]
fn is_cross_device(err: &io::Error) -> bool {
    // EXDEV
    err.raw_os_error() == Some(18)
}

#[cfg(windows)]
fn is_cross_device(err: &io::Error) -> bool {
    // ERROR_NOT_SAME_DEVICE
    err.raw_os_error() == Some(17)
}

#[cfg(not(any(unix, windows)))]
fn is_cross_device(_err: &io::Error) -> bool {
    false
}

fn copy_then_remove(from: &Path, to: &Path) -> io::Result<()> {
    let mut source = fs::File::open(from)?;
    let mut target = fs::OpenOptions::new().write(true).create_new(true).open(to)?;

    let copied = io::copy(&mut source, &mut target).and_then(|_| target.sync_all());
    drop(target);

    if let Err(e) = copied.and_then(|_| fs::remove_file(from)) {
        if let Err(cleanup_err) = fs::remove_file(to) {
            log::warn!(
                "Failed to clean up partial quarantine copy {:?}: {}",
                to,
                cleanup_err
            );
        }
        return Err(e);
    }

    Ok(())
}

/// Decode `<YYYYMMDD_HHMMSS>_<basename>[_n]` back into a record.
fn parse_record(path: &Path) -> Option<QuarantineRecord> {
    // Non-UTF-8 names are listed with replacement characters.
    let name = path.file_name()?.to_string_lossy();
    if name.len() <= TIMESTAMP_LEN + 1 || !name.is_char_boundary(TIMESTAMP_LEN) {
        return None;
    }

    let (stamp, rest) = name.split_at(TIMESTAMP_LEN);
    let timestamp = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok()?;
    let original_name = rest.strip_prefix('_')?.to_string();

    Some(QuarantineRecord {
        stored_path: path.to_path_buf(),
        original_name,
        timestamp,
    })
}

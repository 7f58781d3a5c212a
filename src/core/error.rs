//! Error types and result handling for hashward.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our custom Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for hashward operations.
#[derive(Error, Debug)]
pub enum Error {
    // ===== Per-file Errors =====
    #[error("Failed to read file: {path}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Not a regular file: {0}")]
    NotARegularFile(PathBuf),

    #[error("Failed to quarantine file: {path}")]
    QuarantineFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to walk directory entry under {root}: {reason}")]
    Walk { root: PathBuf, reason: String },

    // ===== Configuration Errors =====
    #[error("Scan target is not an existing directory: {0}")]
    InvalidTarget(PathBuf),

    #[error("Failed to load configuration: {0}")]
    ConfigLoad(String),

    #[error("Invalid configuration value: {field} - {message}")]
    ConfigInvalid { field: String, message: String },

    #[error("Failed to access directory: {path}")]
    DirectoryAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load signatures: {0}")]
    SignatureLoad(String),

    // ===== Monitoring Errors =====
    #[error("Failed to start file watcher on {path}: {reason}")]
    Watch { path: PathBuf, reason: String },

    // ===== Serialization Errors =====
    #[error("JSON serialization error")]
    JsonSerialize(#[from] serde_json::Error),

    // ===== Generic Errors =====
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl Error {
    /// Create a file read error.
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Create a quarantine error.
    pub fn quarantine_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::QuarantineFailed {
            path: path.into(),
            source,
        }
    }

    /// Create an invalid configuration error.
    pub fn config_invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Check if this error is local to one file (the scan can continue).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::FileRead { .. }
                | Error::NotARegularFile(_)
                | Error::QuarantineFailed { .. }
                | Error::Walk { .. }
        )
    }

    /// Check if the underlying cause is a missing file.
    ///
    /// Monitor mode uses this to tolerate events for files that were moved
    /// away between notification and processing.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::FileRead { source, .. } | Error::QuarantineFailed { source, .. } => {
                source.kind() == std::io::ErrorKind::NotFound
            }
            _ => false,
        }
    }

    /// Get a user-friendly suggestion for how to resolve this error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Error::FileRead { source, .. }
                if source.kind() == std::io::ErrorKind::PermissionDenied =>
            {
                Some("Try running with elevated privileges")
            }
            Error::InvalidTarget(_) => Some("Check that the path exists and is a directory"),
            Error::ConfigLoad(_) | Error::ConfigInvalid { .. } => {
                Some("Check your configuration file for syntax errors or invalid values")
            }
            Error::SignatureLoad(_) => Some("Check the signature file is valid JSON"),
            Error::Watch { .. } => {
                Some("The platform file watcher may be out of watch handles; raise the limit")
            }
            _ => None,
        }
    }

    /// Get the error category for logging.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::FileRead { .. } | Error::NotARegularFile(_) | Error::Walk { .. } => {
                ErrorCategory::Read
            }

            Error::QuarantineFailed { .. } => ErrorCategory::Quarantine,

            Error::InvalidTarget(_)
            | Error::ConfigLoad(_)
            | Error::ConfigInvalid { .. }
            | Error::DirectoryAccess { .. }
            | Error::SignatureLoad(_) => ErrorCategory::Configuration,

            Error::Watch { .. } => ErrorCategory::Monitor,

            Error::JsonSerialize(_) | Error::Io(_) | Error::Internal(_) => ErrorCategory::Other,
        }
    }
}

/// Error category for classification in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Read,
    Quarantine,
    Configuration,
    Monitor,
    Other,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read => write!(f, "Read"),
            Self::Quarantine => write!(f, "Quarantine"),
            Self::Configuration => write!(f, "Configuration"),
            Self::Monitor => write!(f, "Monitor"),
            Self::Other => write!(f, "Other"),
        }
    }
}

//! Error types for batch runs.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fatal errors that stop a batch before any file is moved.
///
/// Per-file problems are never reported through this type: unreadable files
/// are skipped during extraction and failed moves are accumulated by the
/// relocation executor.
#[derive(Debug, Error)]
pub enum TidyError {
    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Path not found.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Source root is not a directory.
    #[error("Root path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// Destination root cannot be written to.
    #[error("Destination is not writable: {path}")]
    DestinationNotWritable { path: PathBuf },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// The extraction worker pool could not be started.
    #[error("Failed to start worker pool: {message}")]
    WorkerPool { message: String },
}

impl TidyError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

/// Kind of scan warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// Permission was denied.
    PermissionDenied,
    /// Error reading a directory during enumeration.
    ReadError,
    /// Attribute extraction yielded nothing for a file.
    Unreadable,
}

/// Non-fatal warning encountered during a scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanWarning {
    /// Path where the warning occurred.
    #[serde(serialize_with = "crate::lossy::path")]
    pub path: PathBuf,
    /// Human-readable message.
    pub message: String,
    /// Kind of warning.
    pub kind: WarningKind,
}

impl ScanWarning {
    /// Create a new scan warning.
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>, kind: WarningKind) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            kind,
        }
    }

    /// Create a permission denied warning.
    pub fn permission_denied(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            message: format!("Permission denied: {}", path.display()),
            path,
            kind: WarningKind::PermissionDenied,
        }
    }

    /// Create a read error warning.
    pub fn read_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::new(path, message, WarningKind::ReadError)
    }

    /// Create a warning for a file whose attribute could not be extracted.
    pub fn unreadable(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            message: format!("Skipped unreadable file: {}", path.display()),
            path,
            kind: WarningKind::Unreadable,
        }
    }
}

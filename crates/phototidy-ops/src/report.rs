//! Per-file outcomes of a relocation pass.

use std::fmt;
use std::path::PathBuf;

use phototidy_core::lossy;
use serde::{Deserialize, Serialize};

/// An error that occurred while relocating one file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationError {
    /// The file that could not be moved.
    #[serde(serialize_with = "lossy::path")]
    pub path: PathBuf,
    /// A human-readable error message.
    pub message: String,
}

impl OperationError {
    /// Create a new operation error.
    pub fn new(path: PathBuf, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
        }
    }
}

impl fmt::Display for OperationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}

/// A file that reached its destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovedFile {
    #[serde(serialize_with = "lossy::path")]
    pub source: PathBuf,
    #[serde(serialize_with = "lossy::path")]
    pub destination: PathBuf,
}

/// Result of a relocation pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelocationReport {
    /// Files moved (or, in a dry run, that would be moved).
    pub moved: Vec<MovedFile>,
    /// Files that stayed where they were because their move failed.
    pub errors: Vec<OperationError>,
    /// Total size of moved files.
    pub bytes_moved: u64,
    /// Repeated duplicate entries ignored because the file had already moved.
    pub already_moved: usize,
    /// Nothing was actually moved.
    pub dry_run: bool,
}

impl RelocationReport {
    /// Create an empty report.
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Self::default()
        }
    }

    /// Number of files moved.
    pub fn succeeded(&self) -> usize {
        self.moved.len()
    }

    /// Number of files whose move failed.
    pub fn failed(&self) -> usize {
        self.errors.len()
    }

    /// Check if every attempted move succeeded.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Record a completed move.
    pub fn record_move(&mut self, source: PathBuf, destination: PathBuf, bytes: u64) {
        self.moved.push(MovedFile {
            source,
            destination,
        });
        self.bytes_moved += bytes;
    }

    /// Record a failed move.
    pub fn add_error(&mut self, error: OperationError) {
        self.errors.push(error);
    }

    /// Get a human-readable summary of the pass.
    pub fn summary(&self) -> String {
        let action = if self.dry_run { "Would move" } else { "Moved" };

        if self.errors.is_empty() {
            format!("{} {} files", action, self.succeeded())
        } else {
            format!("{} {} files, {} failed", action, self.succeeded(), self.failed())
        }
    }
}

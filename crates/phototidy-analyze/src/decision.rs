//! Destination decisions handed to the relocation executor.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Name of a dated folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FolderLabel {
    /// A dense shooting day, rendered `DD.MM.YYYY`.
    Day(NaiveDate),
    /// Sparse dates collapsed into their year, rendered `YYYY`.
    Year(i32),
}

impl FolderLabel {
    /// Label for a date whose bucket holds `count` files.
    pub fn for_bucket(date: NaiveDate, count: usize, threshold: usize) -> Self {
        if count >= threshold {
            Self::Day(date)
        } else {
            Self::Year(date.year())
        }
    }
}

impl fmt::Display for FolderLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Day(date) => write!(f, "{}", date.format("%d.%m.%Y")),
            Self::Year(year) => write!(f, "{year:04}"),
        }
    }
}

/// Where a classified file should go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Destination {
    /// The single quarantine directory for duplicates.
    Quarantine,
    /// A dated folder under the destination root.
    DatedFolder(FolderLabel),
}

impl Destination {
    /// Directory the file should land in.
    pub fn directory(&self, destination_root: &Path) -> PathBuf {
        match self {
            Self::Quarantine => destination_root.to_path_buf(),
            Self::DatedFolder(label) => destination_root.join(label.to_string()),
        }
    }

    /// Check whether this is a duplicate's destination.
    pub fn is_quarantine(&self) -> bool {
        matches!(self, Self::Quarantine)
    }
}

/// A file paired with its destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Current location of the file.
    pub source: PathBuf,
    /// Where it should move.
    pub destination: Destination,
}

impl Decision {
    /// Create a new decision.
    pub fn new(source: impl Into<PathBuf>, destination: Destination) -> Self {
        Self {
            source: source.into(),
            destination,
        }
    }

    /// Send a duplicate to quarantine.
    pub fn quarantine(source: impl Into<PathBuf>) -> Self {
        Self::new(source, Destination::Quarantine)
    }
}

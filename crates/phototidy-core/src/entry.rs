//! File entries and the attributes extracted from them.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A file discovered during enumeration.
///
/// Identity is the path as it was seen at scan time. Entries only live for
/// the duration of one run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileEntry {
    /// Path of the file at scan time.
    pub path: PathBuf,
}

impl FileEntry {
    /// Create a new entry for a path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Borrow the entry's path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Consume the entry, returning its path.
    pub fn into_path(self) -> PathBuf {
        self.path
    }
}

/// 32-byte content digest used for duplicate detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    /// Create a new ContentHash from raw bytes.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the hash as a hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Per-file attribute computed by an extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Attribute {
    /// Content digest, used by duplicate detection.
    Digest(ContentHash),
    /// Last-modified time in local time, used by date bucketing.
    Timestamp(NaiveDateTime),
}

impl Attribute {
    /// The digest, if this is a digest attribute.
    pub fn digest(&self) -> Option<ContentHash> {
        match self {
            Self::Digest(hash) => Some(*hash),
            Self::Timestamp(_) => None,
        }
    }

    /// The calendar date, if this is a timestamp attribute.
    ///
    /// Time of day is discarded.
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            Self::Timestamp(ts) => Some(ts.date()),
            Self::Digest(_) => None,
        }
    }
}

/// A `(path, attribute)` pair produced by the scan engine.
///
/// `attribute` is `None` when extraction failed: the file was unreadable,
/// vanished, or was not a regular file by the time a worker reached it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extracted {
    pub entry: FileEntry,
    pub attribute: Option<Attribute>,
}

impl Extracted {
    /// Create a new extracted pair.
    pub fn new(entry: FileEntry, attribute: Option<Attribute>) -> Self {
        Self { entry, attribute }
    }

    /// Check whether extraction failed for this file.
    pub fn is_skipped(&self) -> bool {
        self.attribute.is_none()
    }
}

//! Per-file attribute extraction.

use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Local};
use tracing::debug;

use phototidy_core::{Attribute, ContentHash};

use crate::digest::{Blake3Digest, ContentDigest};

/// Computes one attribute for a file.
///
/// Implementations never fail: anything that prevents extraction (the path
/// is not a regular file, permission denied, the file vanished, a read
/// error) yields `None`, and the file drops out of classification.
pub trait AttributeExtractor: Send + Sync {
    /// Extract the attribute for `path`.
    fn extract(&self, path: &Path) -> Option<Attribute>;
}

impl<T: AttributeExtractor + ?Sized> AttributeExtractor for Arc<T> {
    fn extract(&self, path: &Path) -> Option<Attribute> {
        (**self).extract(path)
    }
}

impl<T: AttributeExtractor + ?Sized> AttributeExtractor for Box<T> {
    fn extract(&self, path: &Path) -> Option<Attribute> {
        (**self).extract(path)
    }
}

/// Extracts a content digest by streaming the file.
#[derive(Debug, Clone, Default)]
pub struct DigestExtractor<D = Blake3Digest> {
    digest: D,
}

impl DigestExtractor {
    /// Create an extractor using BLAKE3.
    pub fn new() -> Self {
        Self {
            digest: Blake3Digest,
        }
    }
}

impl<D: ContentDigest> DigestExtractor<D> {
    /// Create an extractor using a custom digest function.
    pub fn with_digest(digest: D) -> Self {
        Self { digest }
    }

    fn try_digest(&self, path: &Path) -> io::Result<Option<ContentHash>> {
        if !fs::metadata(path)?.is_file() {
            return Ok(None);
        }
        let mut file = File::open(path)?;
        self.digest.digest(&mut file).map(Some)
    }
}

impl<D: ContentDigest> AttributeExtractor for DigestExtractor<D> {
    fn extract(&self, path: &Path) -> Option<Attribute> {
        match self.try_digest(path) {
            Ok(hash) => hash.map(Attribute::Digest),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "digest failed");
                None
            }
        }
    }
}

/// Extracts the last-modified time as a local date-time.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModifiedTimeExtractor;

impl ModifiedTimeExtractor {
    /// Create a new extractor.
    pub fn new() -> Self {
        Self
    }
}

impl AttributeExtractor for ModifiedTimeExtractor {
    fn extract(&self, path: &Path) -> Option<Attribute> {
        let modified = fs::metadata(path)
            .and_then(|m| {
                if m.is_file() {
                    m.modified().map(Some)
                } else {
                    Ok(None)
                }
            })
            .map_err(|e| debug!(path = %path.display(), error = %e, "mtime unavailable"))
            .ok()??;

        let local: DateTime<Local> = modified.into();
        Some(Attribute::Timestamp(local.naive_local()))
    }
}

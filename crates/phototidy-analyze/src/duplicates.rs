//! Duplicate detection over extracted content digests.
//!
//! The first file seen with a digest owns it and stays in place; every later
//! file with the same digest is a duplicate of that owner. Which file counts
//! as "first" depends on [`OriginalSelection`]: arrival order from the worker
//! pool is not reproducible, so by default results are sorted by path before
//! classification.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use phototidy_core::{lossy, ContentHash, Extracted, OriginalSelection};

use crate::decision::Decision;

/// First-seen owner of each digest.
#[derive(Debug, Default)]
pub struct DigestIndex {
    owners: HashMap<ContentHash, PathBuf>,
}

impl DigestIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a file's digest.
    ///
    /// Returns `None` when the file becomes the owner of `digest`, or the
    /// owner's path when the file is a duplicate. Owners are never replaced.
    pub fn observe(&mut self, path: &Path, digest: ContentHash) -> Option<&Path> {
        match self.owners.entry(digest) {
            Entry::Occupied(owner) => Some(owner.into_mut().as_path()),
            Entry::Vacant(slot) => {
                slot.insert(path.to_path_buf());
                None
            }
        }
    }

    /// Owner of a digest, if any file has claimed it.
    pub fn owner(&self, digest: &ContentHash) -> Option<&Path> {
        self.owners.get(digest).map(PathBuf::as_path)
    }

    /// Number of distinct digests seen.
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    /// Check if no digest has been recorded.
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

/// Files sharing one digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// Content hash shared by all files in this group.
    pub hash: ContentHash,

    /// File kept in place.
    #[serde(serialize_with = "lossy::path")]
    pub original: PathBuf,

    /// Files to quarantine, in classification order.
    #[serde(serialize_with = "lossy::paths")]
    pub duplicates: Vec<PathBuf>,
}

impl DuplicateGroup {
    /// Total files in the group, original included.
    pub fn count(&self) -> usize {
        self.duplicates.len() + 1
    }
}

/// Results from duplicate classification.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DuplicateReport {
    /// Groups with at least one duplicate, sorted by original path.
    pub groups: Vec<DuplicateGroup>,

    /// Files that produced a digest.
    pub files_analyzed: u64,

    /// Distinct digests among analyzed files.
    pub unique_files: u64,

    /// Files with no digest (unreadable, vanished, not a regular file).
    #[serde(serialize_with = "lossy::paths")]
    pub skipped: Vec<PathBuf>,
}

impl DuplicateReport {
    /// Check if any duplicates were found.
    pub fn has_duplicates(&self) -> bool {
        !self.groups.is_empty()
    }

    /// Number of files classified as duplicates.
    pub fn duplicate_count(&self) -> usize {
        self.groups.iter().map(|g| g.duplicates.len()).sum()
    }

    /// Every duplicate path across all groups.
    pub fn duplicate_paths(&self) -> impl Iterator<Item = &Path> {
        self.groups
            .iter()
            .flat_map(|g| g.duplicates.iter().map(PathBuf::as_path))
    }

    /// Quarantine decisions for every duplicate.
    pub fn decisions(&self) -> Vec<Decision> {
        self.duplicate_paths().map(Decision::quarantine).collect()
    }
}

/// Classifies extraction results into originals and duplicates.
#[derive(Debug, Clone, Default)]
pub struct DuplicateClassifier {
    selection: OriginalSelection,
}

impl DuplicateClassifier {
    /// Create a classifier with the default (path-ordered) selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a classifier with an explicit original selection.
    pub fn with_selection(selection: OriginalSelection) -> Self {
        Self { selection }
    }

    /// Classify a stream of extraction results.
    pub fn classify<I>(&self, results: I) -> DuplicateReport
    where
        I: IntoIterator<Item = Extracted>,
    {
        match self.selection {
            OriginalSelection::ArrivalOrder => classify_in_order(results),
            OriginalSelection::LexicographicPath => {
                let mut all: Vec<Extracted> = results.into_iter().collect();
                all.sort_by(|a, b| a.entry.cmp(&b.entry));
                classify_in_order(all)
            }
        }
    }
}

fn classify_in_order<I>(results: I) -> DuplicateReport
where
    I: IntoIterator<Item = Extracted>,
{
    let mut index = DigestIndex::new();
    let mut duplicates: HashMap<ContentHash, Vec<PathBuf>> = HashMap::new();
    let mut skipped = Vec::new();
    let mut files_analyzed = 0u64;

    for result in results {
        let path = result.entry.into_path();
        let Some(digest) = result.attribute.and_then(|a| a.digest()) else {
            debug!(path = %path.display(), "no digest, skipping");
            skipped.push(path);
            continue;
        };
        files_analyzed += 1;

        if let Some(original) = index.observe(&path, digest) {
            debug!(path = %path.display(), original = %original.display(), "duplicate");
            duplicates.entry(digest).or_default().push(path);
        }
    }

    let mut groups: Vec<DuplicateGroup> = duplicates
        .into_iter()
        .filter_map(|(hash, duplicates)| {
            let original = index.owner(&hash)?.to_path_buf();
            Some(DuplicateGroup {
                hash,
                original,
                duplicates,
            })
        })
        .collect();
    groups.sort_by(|a, b| a.original.cmp(&b.original));

    DuplicateReport {
        groups,
        files_analyzed,
        unique_files: index.len() as u64,
        skipped,
    }
}

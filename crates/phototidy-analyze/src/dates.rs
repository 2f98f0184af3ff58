//! Date bucketing over extracted modification times.
//!
//! Files are grouped by the calendar date of their timestamp. Once every
//! file is in, each bucket gets a folder label: buckets holding at least
//! `threshold` files get their own `DD.MM.YYYY` folder, smaller ones are
//! collapsed into a `YYYY` folder. Bucket sizes are only final after the
//! last result, so this cannot be streamed straight into destinations.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use phototidy_core::{lossy, DEFAULT_DATE_GROUP_THRESHOLD, Extracted};

use crate::decision::{Decision, Destination, FolderLabel};

/// Groups files by modification date.
#[derive(Debug, Clone)]
pub struct DateBucketer {
    threshold: usize,
}

impl DateBucketer {
    /// Create a bucketer with the default threshold.
    pub fn new() -> Self {
        Self::with_threshold(DEFAULT_DATE_GROUP_THRESHOLD)
    }

    /// Create a bucketer with a custom threshold (minimum 1).
    pub fn with_threshold(threshold: usize) -> Self {
        Self {
            threshold: threshold.max(1),
        }
    }

    /// The threshold in effect.
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Collect every result into date buckets.
    pub fn bucket<I>(&self, results: I) -> DateReport
    where
        I: IntoIterator<Item = Extracted>,
    {
        let mut buckets: BTreeMap<NaiveDate, Vec<PathBuf>> = BTreeMap::new();
        let mut skipped = Vec::new();

        for result in results {
            let path = result.entry.into_path();
            match result.attribute.and_then(|a| a.date()) {
                Some(date) => buckets.entry(date).or_default().push(path),
                None => {
                    debug!(path = %path.display(), "no timestamp, skipping");
                    skipped.push(path);
                }
            }
        }

        for paths in buckets.values_mut() {
            paths.sort();
        }

        DateReport {
            buckets,
            threshold: self.threshold,
            skipped,
        }
    }
}

impl Default for DateBucketer {
    fn default() -> Self {
        Self::new()
    }
}

/// Files grouped by date, with labels decided.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateReport {
    /// Files per calendar date, paths sorted.
    #[serde(serialize_with = "lossy::path_map")]
    pub buckets: BTreeMap<NaiveDate, Vec<PathBuf>>,

    /// Threshold the labels were decided with.
    pub threshold: usize,

    /// Files with no timestamp.
    #[serde(serialize_with = "lossy::paths")]
    pub skipped: Vec<PathBuf>,
}

impl DateReport {
    /// Label for a date's bucket, if the date has any files.
    pub fn label(&self, date: NaiveDate) -> Option<FolderLabel> {
        self.buckets
            .get(&date)
            .map(|paths| FolderLabel::for_bucket(date, paths.len(), self.threshold))
    }

    /// Label for every bucket.
    pub fn labels(&self) -> BTreeMap<NaiveDate, FolderLabel> {
        self.buckets
            .iter()
            .map(|(date, paths)| {
                (
                    *date,
                    FolderLabel::for_bucket(*date, paths.len(), self.threshold),
                )
            })
            .collect()
    }

    /// Number of files that received a timestamp.
    pub fn file_count(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// Files per destination folder.
    ///
    /// Several sparse dates can share one year folder.
    pub fn folders(&self) -> BTreeMap<FolderLabel, usize> {
        let mut folders = BTreeMap::new();
        for (date, paths) in &self.buckets {
            let label = FolderLabel::for_bucket(*date, paths.len(), self.threshold);
            *folders.entry(label).or_insert(0) += paths.len();
        }
        folders
    }

    /// Dated-folder decisions for every bucketed file.
    pub fn decisions(&self) -> Vec<Decision> {
        self.buckets
            .iter()
            .flat_map(|(date, paths)| {
                let label = FolderLabel::for_bucket(*date, paths.len(), self.threshold);
                paths
                    .iter()
                    .map(move |p| Decision::new(p, Destination::DatedFolder(label)))
            })
            .collect()
    }
}

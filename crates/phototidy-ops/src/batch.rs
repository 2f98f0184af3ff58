//! End-to-end dedupe and organize batches.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{info, warn};

use phototidy_analyze::{DateBucketer, DateReport, Decision, DuplicateClassifier, DuplicateReport};
use phototidy_core::{lossy, Progress, ScanWarning, TidyConfig, TidyError};
use phototidy_scan::{
    AttributeExtractor, DigestExtractor, ModifiedTimeExtractor, ParallelScanner, ScanStream,
};

use crate::relocate::{RelocateOptions, Relocator};
use crate::report::RelocationReport;
use crate::PROGRESS_CHANNEL_SIZE;

/// Which classification a batch runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchMode {
    /// Quarantine files whose content duplicates another file.
    Dedupe,
    /// Sort files into dated folders.
    Organize,
}

impl fmt::Display for BatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dedupe => write!(f, "dedupe"),
            Self::Organize => write!(f, "organize"),
        }
    }
}

/// Classification output, kept for reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Duplicates(DuplicateReport),
    Dates(DateReport),
}

/// Overall result of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchOutcome {
    /// No file needed to move.
    NothingToDo,
    /// Every planned move succeeded.
    Clean,
    /// Some moves failed; those files are still at their source.
    PartialFailure { failed: usize },
}

/// Everything a finished batch has to report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub mode: BatchMode,
    #[serde(serialize_with = "lossy::path")]
    pub source_root: PathBuf,
    #[serde(serialize_with = "lossy::path")]
    pub destination_root: PathBuf,
    /// Files enumerated under the source root.
    pub files_scanned: usize,
    /// Files that were given a destination.
    pub classified: usize,
    /// Files left untouched because no attribute could be extracted.
    #[serde(serialize_with = "lossy::paths")]
    pub skipped: Vec<PathBuf>,
    /// Enumeration and extraction warnings.
    pub warnings: Vec<ScanWarning>,
    pub classification: Classification,
    pub relocation: RelocationReport,
    pub elapsed: Duration,
}

impl BatchSummary {
    /// Collapse the relocation report into an outcome.
    pub fn outcome(&self) -> BatchOutcome {
        if !self.relocation.is_success() {
            BatchOutcome::PartialFailure {
                failed: self.relocation.failed(),
            }
        } else if self.relocation.succeeded() == 0 {
            BatchOutcome::NothingToDo
        } else {
            BatchOutcome::Clean
        }
    }
}

/// Runs scan, classification and relocation for one configuration.
pub struct Pipeline {
    config: TidyConfig,
    progress_tx: broadcast::Sender<Progress>,
}

impl Pipeline {
    /// Create a pipeline, rejecting invalid configuration.
    pub fn new(config: TidyConfig) -> Result<Self, TidyError> {
        config.validate().map_err(TidyError::invalid_config)?;
        let (progress_tx, _) = broadcast::channel(PROGRESS_CHANNEL_SIZE);
        Ok(Self {
            config,
            progress_tx,
        })
    }

    /// Subscribe to progress for both phases.
    pub fn subscribe(&self) -> broadcast::Receiver<Progress> {
        self.progress_tx.subscribe()
    }

    /// Get the configuration.
    pub fn config(&self) -> &TidyConfig {
        &self.config
    }

    /// Move every duplicate into the quarantine directory.
    pub fn dedupe(&self) -> Result<BatchSummary, TidyError> {
        self.dedupe_with(Arc::new(DigestExtractor::new()))
    }

    /// Dedupe with a custom digest extractor.
    pub fn dedupe_with<E>(&self, extractor: Arc<E>) -> Result<BatchSummary, TidyError>
    where
        E: AttributeExtractor + ?Sized + 'static,
    {
        let classifier = DuplicateClassifier::with_selection(self.config.original_selection);
        self.run(BatchMode::Dedupe, extractor, |stream| {
            let report = classifier.classify(stream);
            let decisions = report.decisions();
            let skipped = report.skipped.clone();
            (Classification::Duplicates(report), decisions, skipped)
        })
    }

    /// Sort every file into a dated folder under the destination root.
    pub fn organize(&self) -> Result<BatchSummary, TidyError> {
        self.organize_with(Arc::new(ModifiedTimeExtractor))
    }

    /// Organize with a custom timestamp extractor.
    pub fn organize_with<E>(&self, extractor: Arc<E>) -> Result<BatchSummary, TidyError>
    where
        E: AttributeExtractor + ?Sized + 'static,
    {
        let bucketer = DateBucketer::with_threshold(self.config.date_group_threshold);
        self.run(BatchMode::Organize, extractor, |stream| {
            let report = bucketer.bucket(stream);
            let decisions = report.decisions();
            let skipped = report.skipped.clone();
            (Classification::Dates(report), decisions, skipped)
        })
    }

    fn run<E, F>(
        &self,
        mode: BatchMode,
        extractor: Arc<E>,
        classify: F,
    ) -> Result<BatchSummary, TidyError>
    where
        E: AttributeExtractor + ?Sized + 'static,
        F: FnOnce(ScanStream) -> (Classification, Vec<Decision>, Vec<PathBuf>),
    {
        let start = Instant::now();
        check_source(&self.config.source_root)?;
        check_destination(&self.config.destination_root)?;
        if same_path(&self.config.source_root, &self.config.destination_root) {
            return Err(TidyError::invalid_config(
                "Destination cannot be the source root itself",
            ));
        }

        info!(
            %mode,
            source = %self.config.source_root.display(),
            destination = %self.config.destination_root.display(),
            dry_run = self.config.dry_run,
            "starting batch"
        );

        let scanner =
            ParallelScanner::with_progress(self.config.scan_config(), self.progress_tx.clone());
        let mut stream = scanner.scan(extractor)?;
        let files_scanned = stream.total();
        let mut warnings = stream.take_warnings();

        let (classification, decisions, skipped) = classify(stream);
        for path in &skipped {
            warn!(path = %path.display(), "skipped unreadable file");
            warnings.push(ScanWarning::unreadable(path));
        }

        let relocator = Relocator::with_progress(
            &self.config.destination_root,
            RelocateOptions {
                collision: self.config.collision,
                dry_run: self.config.dry_run,
            },
            self.progress_tx.clone(),
        );
        let relocation = relocator.relocate(&decisions);

        info!(
            %mode,
            scanned = files_scanned,
            moved = relocation.succeeded(),
            failed = relocation.failed(),
            skipped = skipped.len(),
            "batch finished"
        );

        Ok(BatchSummary {
            mode,
            source_root: self.config.source_root.clone(),
            destination_root: self.config.destination_root.clone(),
            files_scanned,
            classified: decisions.len(),
            skipped,
            warnings,
            classification,
            relocation,
            elapsed: start.elapsed(),
        })
    }
}

fn check_source(root: &Path) -> Result<(), TidyError> {
    let metadata = fs::metadata(root).map_err(|e| TidyError::io(root, e))?;
    if !metadata.is_dir() {
        return Err(TidyError::NotADirectory {
            path: root.to_path_buf(),
        });
    }
    Ok(())
}

fn same_path(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// The destination, or its nearest existing ancestor, must be a writable
/// directory.
fn check_destination(dest: &Path) -> Result<(), TidyError> {
    let not_writable = || TidyError::DestinationNotWritable {
        path: dest.to_path_buf(),
    };

    for ancestor in dest.ancestors() {
        let ancestor = if ancestor.as_os_str().is_empty() {
            Path::new(".")
        } else {
            ancestor
        };

        match fs::metadata(ancestor) {
            Ok(metadata) if metadata.is_dir() => {
                // Permission bits alone do not decide this; attempt a write.
                return tempfile::Builder::new()
                    .prefix(".phototidy-")
                    .tempfile_in(ancestor)
                    .map(drop)
                    .map_err(|_| not_writable());
            }
            Ok(_) => return Err(not_writable()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(_) => return Err(not_writable()),
        }
    }

    Err(not_writable())
}

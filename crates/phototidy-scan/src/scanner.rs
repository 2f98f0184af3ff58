//! Parallel scan engine: enumerate, fan out extraction, fan results back in.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use globset::{Glob, GlobSet, GlobSetBuilder};
use jwalk::{Parallelism, WalkDir};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use phototidy_core::{
    Extracted, FileEntry, Phase, Progress, ScanConfig, ScanWarning, TidyError, normalize_path,
};

use crate::extract::AttributeExtractor;

/// Capacity of the bounded channel carrying results back from workers.
pub const RESULT_CHANNEL_SIZE: usize = 256;

/// Capacity of the progress broadcast channel.
pub const PROGRESS_CHANNEL_SIZE: usize = 1024;

/// Files found under a root, before any extraction.
#[derive(Debug)]
pub struct Enumeration {
    /// Canonical root that was walked.
    pub root: PathBuf,
    /// Every non-directory entry under the root.
    pub files: Vec<FileEntry>,
    /// Directories that could not be read.
    pub warnings: Vec<ScanWarning>,
}

/// Scan engine backed by jwalk for enumeration and a rayon pool for extraction.
pub struct ParallelScanner {
    config: ScanConfig,
    progress_tx: broadcast::Sender<Progress>,
}

impl ParallelScanner {
    /// Create a new scanner.
    pub fn new(config: ScanConfig) -> Self {
        let (progress_tx, _) = broadcast::channel(PROGRESS_CHANNEL_SIZE);
        Self {
            config,
            progress_tx,
        }
    }

    /// Create a scanner that publishes to an existing progress channel.
    pub fn with_progress(config: ScanConfig, progress_tx: broadcast::Sender<Progress>) -> Self {
        Self {
            config,
            progress_tx,
        }
    }

    /// Subscribe to extraction progress, one event per completed file.
    pub fn subscribe(&self) -> broadcast::Receiver<Progress> {
        self.progress_tx.subscribe()
    }

    /// The scanner's configuration.
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Enumerate every file under the configured root.
    ///
    /// Fails only when the root itself is missing, unreadable, or not a
    /// directory. Unreadable subdirectories become warnings.
    pub fn enumerate(&self) -> Result<Enumeration, TidyError> {
        let root = self
            .config
            .root
            .canonicalize()
            .map_err(|e| TidyError::io(&self.config.root, e))?;

        if !root.is_dir() {
            return Err(TidyError::NotADirectory { path: root });
        }

        let ignore = build_ignore_set(&self.config.ignore_patterns)?;
        let mut config = self.config.clone();
        config.exclude = config.exclude.iter().map(|p| normalize_path(p)).collect();

        let parallelism = match config.workers {
            0 => Parallelism::RayonDefaultPool {
                busy_timeout: Duration::from_millis(100),
            },
            n => Parallelism::RayonNewPool(n),
        };

        let walker = WalkDir::new(&root)
            .parallelism(parallelism)
            .skip_hidden(!config.include_hidden)
            .follow_links(config.follow_symlinks)
            .sort(true);

        let mut files = Vec::new();
        let mut warnings = Vec::new();

        for entry_result in walker {
            let entry = match entry_result {
                Ok(e) => e,
                Err(err) => {
                    let path = err.path().map(Path::to_path_buf).unwrap_or_default();
                    warn!(path = %path.display(), error = %err, "cannot read directory");
                    let kind = err.io_error().map(io::Error::kind);
                    warnings.push(enumeration_warning(path, err.to_string(), kind));
                    continue;
                }
            };

            if entry.file_type().is_dir() {
                continue;
            }

            let path = entry.path();
            if config.is_excluded(&path) || ignore.is_match(entry.file_name()) {
                continue;
            }

            files.push(FileEntry::new(path));
        }

        debug!(root = %root.display(), files = files.len(), "enumeration complete");

        Ok(Enumeration {
            root,
            files,
            warnings,
        })
    }

    /// Enumerate the root and extract an attribute for every file.
    ///
    /// Results arrive in completion order, not enumeration order. Every
    /// enumerated file appears in the stream exactly once.
    pub fn scan<E>(&self, extractor: Arc<E>) -> Result<ScanStream, TidyError>
    where
        E: AttributeExtractor + ?Sized + 'static,
    {
        let enumeration = self.enumerate()?;
        self.dispatch(enumeration, extractor)
    }

    /// Fan extraction of an enumerated file list out over the worker pool.
    pub fn dispatch<E>(
        &self,
        enumeration: Enumeration,
        extractor: Arc<E>,
    ) -> Result<ScanStream, TidyError>
    where
        E: AttributeExtractor + ?Sized + 'static,
    {
        let Enumeration {
            root,
            files,
            warnings,
        } = enumeration;
        let total = files.len();
        let (tx, rx) = mpsc::channel(RESULT_CHANNEL_SIZE);

        if files.is_empty() {
            return Ok(ScanStream {
                rx,
                total,
                warnings,
                pool: None,
            });
        }

        let workers = self.config.resolved_workers().min(total);
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("phototidy-extract-{i}"))
            .build()
            .map_err(|e| TidyError::WorkerPool {
                message: e.to_string(),
            })?;

        info!(root = %root.display(), files = total, workers, "extracting attributes");

        let progress_tx = self.progress_tx.clone();
        // Held while sending so subscribers see `completed` in order.
        let completed = Mutex::new(0u64);
        let _ = progress_tx.send(Progress::started(Phase::Extracting, total as u64));

        pool.spawn(move || {
            files.into_par_iter().for_each_with(tx, |tx, entry| {
                // The consumer dropped the stream; nothing left to report to.
                if tx.is_closed() {
                    return;
                }

                let attribute = extractor.extract(entry.path());
                {
                    let mut done = completed.lock().unwrap_or_else(|e| e.into_inner());
                    *done += 1;
                    let _ = progress_tx.send(Progress::new(
                        Phase::Extracting,
                        *done,
                        total as u64,
                        Some(entry.path.clone()),
                    ));
                }
                let _ = tx.blocking_send(Extracted::new(entry, attribute));
            });
        });

        Ok(ScanStream {
            rx,
            total,
            warnings,
            pool: Some(pool),
        })
    }
}

/// Lazy stream of extraction results in arrival order.
///
/// Iterating blocks the calling thread while workers are busy, so it must not
/// be driven from inside an async runtime.
pub struct ScanStream {
    rx: mpsc::Receiver<Extracted>,
    total: usize,
    warnings: Vec<ScanWarning>,
    // Declared after `rx` so the channel closes before the pool is released.
    #[allow(dead_code)]
    pool: Option<ThreadPool>,
}

impl ScanStream {
    /// Number of files submitted for extraction.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Warnings collected during enumeration.
    pub fn warnings(&self) -> &[ScanWarning] {
        &self.warnings
    }

    /// Take the enumeration warnings out of the stream.
    pub fn take_warnings(&mut self) -> Vec<ScanWarning> {
        std::mem::take(&mut self.warnings)
    }
}

impl Iterator for ScanStream {
    type Item = Extracted;

    fn next(&mut self) -> Option<Extracted> {
        self.rx.blocking_recv()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.total))
    }
}

fn build_ignore_set(patterns: &[String]) -> Result<GlobSet, TidyError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| {
            TidyError::invalid_config(format!("invalid ignore pattern '{pattern}': {e}"))
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| TidyError::invalid_config(e.to_string()))
}

fn enumeration_warning(
    path: PathBuf,
    message: String,
    kind: Option<io::ErrorKind>,
) -> ScanWarning {
    match kind {
        Some(io::ErrorKind::PermissionDenied) => ScanWarning::permission_denied(path),
        _ => ScanWarning::read_error(path, message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{DigestExtractor, ModifiedTimeExtractor};
    use phototidy_core::WarningKind;
    use std::collections::HashSet;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();

        fs::create_dir(root.join("2023")).unwrap();
        fs::create_dir(root.join("2023/holiday")).unwrap();
        fs::create_dir(root.join("dupes")).unwrap();

        fs::write(root.join("a.jpg"), "alpha").unwrap();
        fs::write(root.join("2023/b.jpg"), "beta").unwrap();
        fs::write(root.join("2023/holiday/c.jpg"), "gamma").unwrap();
        fs::write(root.join("2023/holiday/notes.txt"), "delta").unwrap();
        fs::write(root.join("dupes/old.jpg"), "alpha").unwrap();

        temp
    }

    #[test]
    fn test_enumerates_files_not_directories() {
        let temp = create_test_tree();
        let scanner = ParallelScanner::new(ScanConfig::new(temp.path()));
        let enumeration = scanner.enumerate().unwrap();

        assert_eq!(enumeration.files.len(), 5);
        assert!(enumeration.files.iter().all(|f| f.path().is_file()));
    }

    #[test]
    fn test_every_file_arrives_exactly_once() {
        let temp = create_test_tree();
        let config = ScanConfig::builder()
            .root(temp.path())
            .workers(3usize)
            .build()
            .unwrap();
        let scanner = ParallelScanner::new(config);
        let stream = scanner.scan(Arc::new(DigestExtractor::new())).unwrap();
        assert_eq!(stream.total(), 5);

        let results: Vec<Extracted> = stream.collect();
        assert_eq!(results.len(), 5);

        let unique: HashSet<_> = results.iter().map(|r| r.entry.path.clone()).collect();
        assert_eq!(unique.len(), 5);
        assert!(results.iter().all(|r| r.attribute.is_some()));
    }

    #[test]
    fn test_exclude_and_ignore() {
        let temp = create_test_tree();
        let config = ScanConfig::builder()
            .root(temp.path())
            .exclude(vec![temp.path().join("dupes")])
            .ignore_patterns(vec!["*.txt".to_string()])
            .build()
            .unwrap();
        let scanner = ParallelScanner::new(config);
        let enumeration = scanner.enumerate().unwrap();

        let names: HashSet<String> = enumeration
            .files
            .iter()
            .map(|f| f.path().file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names.len(), 3);
        assert!(!names.contains("old.jpg"));
        assert!(!names.contains("notes.txt"));
    }

    #[test]
    fn test_empty_root_yields_empty_stream() {
        let temp = TempDir::new().unwrap();
        let scanner = ParallelScanner::new(ScanConfig::new(temp.path()));
        let mut stream = scanner.scan(Arc::new(ModifiedTimeExtractor)).unwrap();

        assert_eq!(stream.total(), 0);
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let temp = TempDir::new().unwrap();
        let scanner = ParallelScanner::new(ScanConfig::new(temp.path().join("absent")));
        let err = scanner.scan(Arc::new(DigestExtractor::new())).err().unwrap();
        assert!(matches!(err, TidyError::NotFound { .. }));
    }

    #[test]
    fn test_root_must_be_directory() {
        let temp = create_test_tree();
        let scanner = ParallelScanner::new(ScanConfig::new(temp.path().join("a.jpg")));
        let err = scanner.enumerate().unwrap_err();
        assert!(matches!(err, TidyError::NotADirectory { .. }));
    }

    #[test]
    fn test_invalid_ignore_pattern() {
        let temp = create_test_tree();
        let config = ScanConfig::builder()
            .root(temp.path())
            .ignore_patterns(vec!["[".to_string()])
            .build()
            .unwrap();
        let err = ParallelScanner::new(config).enumerate().unwrap_err();
        assert!(matches!(err, TidyError::InvalidConfig { .. }));
    }

    #[test]
    fn test_progress_ticks_once_per_file() {
        let temp = create_test_tree();
        let scanner = ParallelScanner::new(ScanConfig::new(temp.path()));
        let mut progress_rx = scanner.subscribe();

        let results: Vec<_> = scanner
            .scan(Arc::new(DigestExtractor::new()))
            .unwrap()
            .collect();
        assert_eq!(results.len(), 5);

        let mut ticks = Vec::new();
        while let Ok(p) = progress_rx.try_recv() {
            ticks.push(p);
        }
        // One start event and one tick per file.
        assert_eq!(ticks.len(), 6);
        let completed: Vec<u64> = ticks.iter().map(|p| p.completed).collect();
        assert_eq!(completed, vec![0, 1, 2, 3, 4, 5]);
        assert!(ticks.iter().all(|p| p.total == 5 && p.phase == Phase::Extracting));
    }

    #[test]
    fn test_progress_in_order_with_many_workers() {
        let temp = TempDir::new().unwrap();
        for i in 0..64 {
            fs::write(temp.path().join(format!("{i}.jpg")), format!("{i}")).unwrap();
        }
        let config = ScanConfig::builder()
            .root(temp.path())
            .workers(8usize)
            .build()
            .unwrap();
        let scanner = ParallelScanner::new(config);
        let mut progress_rx = scanner.subscribe();

        let results: Vec<_> = scanner
            .scan(Arc::new(DigestExtractor::new()))
            .unwrap()
            .collect();
        assert_eq!(results.len(), 64);

        let completed: Vec<u64> = std::iter::from_fn(|| progress_rx.try_recv().ok())
            .map(|p| p.completed)
            .collect();
        assert_eq!(completed, (0..=64).collect::<Vec<u64>>());
    }

    #[test]
    fn test_enumeration_warning_kinds() {
        let denied = enumeration_warning(
            PathBuf::from("/photos/private"),
            "denied".to_string(),
            Some(io::ErrorKind::PermissionDenied),
        );
        assert_eq!(denied.kind, WarningKind::PermissionDenied);

        let other = enumeration_warning(PathBuf::from("/photos/bad"), "loop".to_string(), None);
        assert_eq!(other.kind, WarningKind::ReadError);
        assert_eq!(other.message, "loop");
    }
}

//! Scan and batch configuration types.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Minimum bucket size that earns a full-date folder.
pub const DEFAULT_DATE_GROUP_THRESHOLD: usize = 5;

/// Configuration for the parallel scan engine.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ScanConfig {
    /// Root path to scan.
    pub root: PathBuf,

    /// Follow symbolic links to directories while walking.
    #[builder(default = "false")]
    #[serde(default)]
    pub follow_symlinks: bool,

    /// File-name glob patterns to ignore.
    #[builder(default)]
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Directories whose contents are never enumerated.
    #[builder(default)]
    #[serde(default)]
    pub exclude: Vec<PathBuf>,

    /// Number of extraction workers (0 = auto-detect).
    #[builder(default = "0")]
    #[serde(default)]
    pub workers: usize,

    /// Include hidden files (starting with .).
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub include_hidden: bool,
}

fn default_true() -> bool {
    true
}

fn default_threshold() -> usize {
    DEFAULT_DATE_GROUP_THRESHOLD
}

impl ScanConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.root {
            Some(ref root) if root.as_os_str().is_empty() => {
                Err("Root path cannot be empty".to_string())
            }
            Some(_) => Ok(()),
            None => Err("Root path is required".to_string()),
        }
    }
}

impl ScanConfig {
    /// Create a new scan config builder.
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::default()
    }

    /// Create a simple config for scanning a path.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            follow_symlinks: false,
            ignore_patterns: Vec::new(),
            exclude: Vec::new(),
            workers: 0,
            include_hidden: true,
        }
    }

    /// Worker count with auto-detection resolved.
    pub fn resolved_workers(&self) -> usize {
        resolve_workers(self.workers)
    }

    /// Check if a path lies inside an excluded directory.
    pub fn is_excluded(&self, path: &Path) -> bool {
        self.exclude.iter().any(|dir| path.starts_with(dir))
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::new(".")
    }
}

/// How to pick the file kept in place when several share a digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OriginalSelection {
    /// The lexicographically smallest path is the original.
    #[default]
    LexicographicPath,
    /// The first result to arrive from the worker pool is the original.
    /// Not reproducible across runs.
    ArrivalOrder,
}

/// What to do when a file with the same name already sits at the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionPolicy {
    /// Move under a free name such as `IMG_0001 (1).jpg`.
    #[default]
    AutoRename,
    /// Leave the source in place and report the move as failed.
    Skip,
    /// Replace the existing destination file.
    Overwrite,
}

/// Configuration for a whole dedupe or organize batch.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct TidyConfig {
    /// Directory tree to scan.
    pub source_root: PathBuf,

    /// Quarantine directory (dedupe) or root of dated folders (organize).
    pub destination_root: PathBuf,

    /// Minimum files on one date for a `DD.MM.YYYY` folder.
    #[builder(default = "DEFAULT_DATE_GROUP_THRESHOLD")]
    #[serde(default = "default_threshold")]
    pub date_group_threshold: usize,

    /// Number of extraction workers (0 = auto-detect).
    #[builder(default = "0")]
    #[serde(default)]
    pub workers: usize,

    /// File-name glob patterns to ignore.
    #[builder(default)]
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Follow symbolic links to directories while walking.
    #[builder(default = "false")]
    #[serde(default)]
    pub follow_symlinks: bool,

    /// Include hidden files (starting with .).
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub include_hidden: bool,

    /// Which duplicate stays in place.
    #[builder(default)]
    #[serde(default)]
    pub original_selection: OriginalSelection,

    /// Destination name collision handling.
    #[builder(default)]
    #[serde(default)]
    pub collision: CollisionPolicy,

    /// Classify and report without moving anything.
    #[builder(default = "false")]
    #[serde(default)]
    pub dry_run: bool,
}

impl TidyConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.source_root {
            Some(ref p) if p.as_os_str().is_empty() => {
                return Err("Source root cannot be empty".to_string());
            }
            None => return Err("Source root is required".to_string()),
            _ => {}
        }
        match self.destination_root {
            Some(ref p) if p.as_os_str().is_empty() => {
                return Err("Destination root cannot be empty".to_string());
            }
            None => return Err("Destination root is required".to_string()),
            _ => {}
        }
        if self.date_group_threshold == Some(0) {
            return Err("Date group threshold must be at least 1".to_string());
        }
        Ok(())
    }
}

impl TidyConfig {
    /// Create a new config builder.
    pub fn builder() -> TidyConfigBuilder {
        TidyConfigBuilder::default()
    }

    /// Create a config with defaults for everything but the two roots.
    pub fn new(source_root: impl Into<PathBuf>, destination_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            destination_root: destination_root.into(),
            date_group_threshold: DEFAULT_DATE_GROUP_THRESHOLD,
            workers: 0,
            ignore_patterns: Vec::new(),
            follow_symlinks: false,
            include_hidden: true,
            original_selection: OriginalSelection::default(),
            collision: CollisionPolicy::default(),
            dry_run: false,
        }
    }

    /// Check values a deserialized config could carry past the builder.
    pub fn validate(&self) -> Result<(), String> {
        if self.source_root.as_os_str().is_empty() {
            return Err("Source root cannot be empty".to_string());
        }
        if self.destination_root.as_os_str().is_empty() {
            return Err("Destination root cannot be empty".to_string());
        }
        if self.date_group_threshold == 0 {
            return Err("Date group threshold must be at least 1".to_string());
        }
        Ok(())
    }

    /// Worker count with auto-detection resolved.
    pub fn resolved_workers(&self) -> usize {
        resolve_workers(self.workers)
    }

    /// Derive the scan engine configuration.
    ///
    /// A `destination_root` nested inside `source_root` is excluded so that
    /// files already moved are never scanned again. A source nested inside
    /// the destination is scanned as usual.
    pub fn scan_config(&self) -> ScanConfig {
        let source = normalize_path(&self.source_root);
        let destination = normalize_path(&self.destination_root);
        let exclude = if destination.starts_with(&source) {
            vec![destination]
        } else {
            Vec::new()
        };

        ScanConfig {
            root: self.source_root.clone(),
            follow_symlinks: self.follow_symlinks,
            ignore_patterns: self.ignore_patterns.clone(),
            exclude,
            workers: self.workers,
            include_hidden: self.include_hidden,
        }
    }
}

/// Resolve a path for prefix comparison against canonical walk paths.
///
/// The deepest existing ancestor is canonicalized and the missing tail is
/// appended, so paths that do not exist yet still compare correctly.
pub fn normalize_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    for ancestor in absolute.ancestors() {
        if let Ok(canonical) = ancestor.canonicalize() {
            return match absolute.strip_prefix(ancestor) {
                Ok(rest) if !rest.as_os_str().is_empty() => canonical.join(rest),
                _ => canonical,
            };
        }
    }
    absolute
}

fn resolve_workers(workers: usize) -> usize {
    if workers > 0 {
        workers
    } else {
        std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1)
    }
}

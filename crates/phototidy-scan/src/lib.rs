//! Parallel attribute extraction for phototidy.
//!
//! This crate walks a directory tree and computes one attribute per file on
//! a fixed-size worker pool:
//!
//! - **Enumeration** via jwalk, materialized up front so the total is known
//! - **Extraction** on a rayon pool sized to the host (or configured)
//! - **Fan-in** through a bounded channel, in completion order
//! - **Progress** via broadcast channels, one event per finished file
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use phototidy_scan::{DigestExtractor, ParallelScanner, ScanConfig};
//!
//! let scanner = ParallelScanner::new(ScanConfig::new("/path/to/photos"));
//! let stream = scanner.scan(Arc::new(DigestExtractor::new())).unwrap();
//!
//! for result in stream {
//!     match result.attribute {
//!         Some(attr) => println!("{}: {:?}", result.entry.path.display(), attr),
//!         None => println!("{}: skipped", result.entry.path.display()),
//!     }
//! }
//! ```
//!
//! # Progress Monitoring
//!
//! ```rust,no_run
//! use phototidy_scan::{ParallelScanner, ScanConfig};
//!
//! let scanner = ParallelScanner::new(ScanConfig::new("/path/to/photos"));
//! let mut progress_rx = scanner.subscribe();
//!
//! std::thread::spawn(move || {
//!     while let Ok(progress) = progress_rx.blocking_recv() {
//!         println!("{}/{} files", progress.completed, progress.total);
//!     }
//! });
//! ```

mod digest;
mod extract;
mod scanner;

pub use digest::{Blake3Digest, CHUNK_SIZE, ContentDigest};
pub use extract::{AttributeExtractor, DigestExtractor, ModifiedTimeExtractor};
pub use scanner::{
    Enumeration, PROGRESS_CHANNEL_SIZE, ParallelScanner, RESULT_CHANNEL_SIZE, ScanStream,
};

// Re-export core types for convenience
pub use phototidy_core::{
    Attribute, ContentHash, Extracted, FileEntry, Phase, Progress, ScanConfig, ScanWarning,
    TidyError, WarningKind,
};

//! Classification policies for phototidy.
//!
//! This crate turns a stream of extraction results into destination
//! decisions:
//!
//! - **Duplicate detection** - first-seen owner per content digest; every
//!   later file with the same digest goes to quarantine
//! - **Date bucketing** - files grouped by modification date; dense dates get
//!   a `DD.MM.YYYY` folder, sparse ones collapse into `YYYY`
//!
//! Both policies consume results single-threaded, after the worker pool has
//! produced them.
//!
//! # Duplicate Detection
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use phototidy_analyze::DuplicateClassifier;
//! use phototidy_scan::{DigestExtractor, ParallelScanner, ScanConfig};
//!
//! let scanner = ParallelScanner::new(ScanConfig::new("/path/to/photos"));
//! let stream = scanner.scan(Arc::new(DigestExtractor::new())).unwrap();
//!
//! let report = DuplicateClassifier::new().classify(stream);
//! println!("Found {} duplicates", report.duplicate_count());
//! ```
//!
//! # Date Bucketing
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use phototidy_analyze::DateBucketer;
//! use phototidy_scan::{ModifiedTimeExtractor, ParallelScanner, ScanConfig};
//!
//! let scanner = ParallelScanner::new(ScanConfig::new("/path/to/photos"));
//! let stream = scanner.scan(Arc::new(ModifiedTimeExtractor)).unwrap();
//!
//! let report = DateBucketer::with_threshold(5).bucket(stream);
//! for (label, count) in report.folders() {
//!     println!("{label}: {count} files");
//! }
//! ```

mod dates;
mod decision;
mod duplicates;

pub use dates::{DateBucketer, DateReport};
pub use decision::{Decision, Destination, FolderLabel};
pub use duplicates::{DigestIndex, DuplicateClassifier, DuplicateGroup, DuplicateReport};

// Re-export core types
pub use phototidy_core::{ContentHash, Extracted, OriginalSelection};

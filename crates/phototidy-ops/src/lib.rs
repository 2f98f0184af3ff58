//! Relocation executor and batch pipeline for phototidy.
//!
//! This crate takes destination decisions and applies them to the
//! filesystem:
//!
//! - **Relocation** - sequential moves with rename, falling back to
//!   copy + delete across filesystems
//! - **Collisions** - auto-rename, skip or overwrite an existing name
//! - **Batches** - scan, classify and relocate in one call, behind the
//!   fatal precondition checks
//!
//! Per-file failures are accumulated in a [`RelocationReport`]; only a bad
//! configuration or unusable roots abort a batch, and they do so before any
//! file is touched.
//!
//! # Example
//!
//! ```rust,no_run
//! use phototidy_core::TidyConfig;
//! use phototidy_ops::Pipeline;
//!
//! let pipeline = Pipeline::new(TidyConfig::new("/photos", "/photos-dupes")).unwrap();
//! let summary = pipeline.dedupe().unwrap();
//! println!("{}", summary.relocation.summary());
//! ```

mod batch;
mod conflict;
mod relocate;
mod report;

pub use batch::{BatchMode, BatchOutcome, BatchSummary, Classification, Pipeline};
pub use conflict::{ConflictKind, auto_rename_path, resolve_destination};
pub use relocate::{RelocateOptions, Relocator};
pub use report::{MovedFile, OperationError, RelocationReport};

/// Default channel buffer size for relocation progress updates.
pub const PROGRESS_CHANNEL_SIZE: usize = 1024;

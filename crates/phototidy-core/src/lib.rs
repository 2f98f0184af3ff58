//! Core types for phototidy.
//!
//! This crate provides the data structures shared by the scan engine, the
//! classification policies and the relocation executor: file entries and
//! their extracted attributes, batch configuration, progress events and
//! error types.

mod config;
mod entry;
mod error;
pub mod lossy;
mod progress;

pub use config::{
    CollisionPolicy, OriginalSelection, ScanConfig, ScanConfigBuilder, TidyConfig,
    TidyConfigBuilder, DEFAULT_DATE_GROUP_THRESHOLD, normalize_path,
};
pub use entry::{Attribute, ContentHash, Extracted, FileEntry};
pub use error::{ScanWarning, TidyError, WarningKind};
pub use progress::{Phase, Progress};

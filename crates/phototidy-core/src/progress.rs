//! Progress events published while a batch runs.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// The batch phase a progress event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Computing digests or timestamps on the worker pool.
    Extracting,
    /// Moving files to their destinations.
    Relocating,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Extracting => write!(f, "extracting attributes"),
            Self::Relocating => write!(f, "relocating files"),
        }
    }
}

/// One completed unit of work.
///
/// Progress is observational only: dropping every receiver has no effect on
/// the batch.
#[derive(Debug, Clone)]
pub struct Progress {
    /// Phase the unit belongs to.
    pub phase: Phase,
    /// Units completed so far in this phase, including this one.
    pub completed: u64,
    /// Total units in this phase.
    pub total: u64,
    /// File the unit was about.
    pub current: Option<PathBuf>,
}

impl Progress {
    /// Create a progress event.
    pub fn new(phase: Phase, completed: u64, total: u64, current: Option<PathBuf>) -> Self {
        Self {
            phase,
            completed,
            total,
            current,
        }
    }

    /// Event marking the start of a phase.
    pub fn started(phase: Phase, total: u64) -> Self {
        Self::new(phase, 0, total, None)
    }

    /// Check whether this event completes its phase.
    pub fn is_finished(&self) -> bool {
        self.completed >= self.total
    }
}

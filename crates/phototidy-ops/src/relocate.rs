//! Sequential relocation of classified files.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use phototidy_analyze::Decision;
use phototidy_core::{CollisionPolicy, Phase, Progress};

use crate::conflict::resolve_destination;
use crate::report::{OperationError, RelocationReport};
use crate::PROGRESS_CHANNEL_SIZE;

/// Options for a relocation pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelocateOptions {
    /// How to handle a name already taken at the destination.
    pub collision: CollisionPolicy,
    /// Plan every move without touching the filesystem.
    pub dry_run: bool,
}

/// Moves files to the directories their decisions name.
///
/// Moves run one at a time. A failure is recorded against its file and the
/// pass continues with the next one.
pub struct Relocator {
    destination_root: PathBuf,
    options: RelocateOptions,
    progress_tx: broadcast::Sender<Progress>,
}

impl Relocator {
    /// Create a relocator rooted at `destination_root`.
    pub fn new(destination_root: impl Into<PathBuf>, options: RelocateOptions) -> Self {
        let (progress_tx, _) = broadcast::channel(PROGRESS_CHANNEL_SIZE);
        Self {
            destination_root: destination_root.into(),
            options,
            progress_tx,
        }
    }

    /// Create a relocator that publishes to an existing progress channel.
    pub fn with_progress(
        destination_root: impl Into<PathBuf>,
        options: RelocateOptions,
        progress_tx: broadcast::Sender<Progress>,
    ) -> Self {
        Self {
            destination_root: destination_root.into(),
            options,
            progress_tx,
        }
    }

    /// Subscribe to relocation progress, one event per decision.
    pub fn subscribe(&self) -> broadcast::Receiver<Progress> {
        self.progress_tx.subscribe()
    }

    /// Execute every decision.
    pub fn relocate(&self, decisions: &[Decision]) -> RelocationReport {
        let total = decisions.len() as u64;
        let mut report = RelocationReport::new(self.options.dry_run);
        let mut moved: HashSet<PathBuf> = HashSet::new();
        let mut claimed: HashSet<PathBuf> = HashSet::new();
        let mut dirs: HashMap<PathBuf, Result<(), String>> = HashMap::new();

        info!(
            files = total,
            destination = %self.destination_root.display(),
            dry_run = self.options.dry_run,
            "relocating files"
        );
        let _ = self.progress_tx.send(Progress::started(Phase::Relocating, total));

        for (i, decision) in decisions.iter().enumerate() {
            let source = &decision.source;

            if decision.destination.is_quarantine() && moved.contains(source) {
                debug!(path = %source.display(), "already moved, ignoring repeat");
                report.already_moved += 1;
            } else {
                let dir = decision.destination.directory(&self.destination_root);
                match self.relocate_one(source, &dir, &mut dirs, &claimed) {
                    Ok((target, bytes)) => {
                        debug!(from = %source.display(), to = %target.display(), "moved");
                        moved.insert(source.clone());
                        claimed.insert(target.clone());
                        report.record_move(source.clone(), target, bytes);
                    }
                    Err(message) => {
                        warn!(path = %source.display(), error = %message, "move failed");
                        report.add_error(OperationError::new(source.clone(), message));
                    }
                }
            }

            let _ = self.progress_tx.send(Progress::new(
                Phase::Relocating,
                i as u64 + 1,
                total,
                Some(source.clone()),
            ));
        }

        report
    }

    fn relocate_one(
        &self,
        source: &Path,
        dir: &Path,
        dirs: &mut HashMap<PathBuf, Result<(), String>>,
        claimed: &HashSet<PathBuf>,
    ) -> Result<(PathBuf, u64), String> {
        let dry_run = self.options.dry_run;
        dirs.entry(dir.to_path_buf())
            .or_insert_with(|| {
                if dry_run {
                    Ok(())
                } else {
                    fs::create_dir_all(dir)
                        .map_err(|e| format!("Failed to create {}: {}", dir.display(), e))
                }
            })
            .clone()?;

        let file_name = source
            .file_name()
            .ok_or_else(|| "Source has no file name".to_string())?;

        let target = resolve_destination(
            source,
            dir.join(file_name),
            self.options.collision,
            |p| claimed.contains(p) || p.symlink_metadata().is_ok(),
        )
        .map_err(|kind| kind.to_string())?;

        if dry_run {
            let size = fs::metadata(source).map(|m| m.len()).unwrap_or(0);
            return Ok((target, size));
        }

        let bytes = move_file(source, &target)?;
        Ok((target, bytes))
    }
}

/// Move a single file, falling back to copy + delete across filesystems.
///
/// On failure the source is left in place and whatever was at the
/// destination before is untouched.
fn move_file(source: &Path, dest: &Path) -> Result<u64, String> {
    let size = fs::symlink_metadata(source)
        .map(|m| m.len())
        .map_err(|e| format!("Cannot read source: {}", e))?;

    // Try rename first (fast path for same filesystem)
    if fs::rename(source, dest).is_ok() {
        return Ok(size);
    }

    copy_then_remove(source, dest, |p| fs::remove_file(p))?;
    Ok(size)
}

/// Copy into a temporary sibling of `dest`, remove the source, then rename
/// the copy into place.
fn copy_then_remove(
    source: &Path,
    dest: &Path,
    remove_source: impl FnOnce(&Path) -> io::Result<()>,
) -> Result<(), String> {
    let dir = dest
        .parent()
        .ok_or_else(|| "Destination has no parent directory".to_string())?;
    let staged = tempfile::Builder::new()
        .prefix(".phototidy-")
        .tempfile_in(dir)
        .map_err(|e| format!("Failed to stage copy: {}", e))?;

    // The staged file is deleted on drop until it is persisted.
    fs::copy(source, staged.path()).map_err(|e| format!("Failed to copy: {}", e))?;
    remove_source(source).map_err(|e| format!("Failed to remove source: {}", e))?;

    staged.persist(dest).map_err(|e| {
        let kept = e.file.keep().map(|(_, path)| path);
        match kept {
            Ok(path) => format!(
                "Failed to rename copy into place, contents kept at {}: {}",
                path.display(),
                e.error
            ),
            Err(keep_err) => format!("Failed to rename copy into place: {}", keep_err),
        }
    })?;
    Ok(())
}

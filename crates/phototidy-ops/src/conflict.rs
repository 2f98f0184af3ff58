//! Destination name collisions.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use phototidy_core::CollisionPolicy;

/// Why a destination could not be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictKind {
    /// A file already exists at the destination.
    FileExists,
    /// A directory already exists at the destination.
    DirectoryExists,
    /// Source and destination are the same file.
    SameFile,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FileExists => write!(f, "File already exists"),
            Self::DirectoryExists => write!(f, "Directory already exists"),
            Self::SameFile => write!(f, "Source and destination are the same file"),
        }
    }
}

/// Pick the final destination for `source`, applying `policy` on collision.
///
/// `occupied` reports whether a candidate path is taken. It lets a dry run
/// account for names it has already handed out without touching the disk.
pub fn resolve_destination(
    source: &Path,
    dest: PathBuf,
    policy: CollisionPolicy,
    occupied: impl Fn(&Path) -> bool,
) -> Result<PathBuf, ConflictKind> {
    if !occupied(&dest) {
        return Ok(dest);
    }

    if is_same_file(source, &dest) {
        return Err(ConflictKind::SameFile);
    }

    let kind = if dest.is_dir() {
        ConflictKind::DirectoryExists
    } else {
        ConflictKind::FileExists
    };

    match (policy, kind) {
        (CollisionPolicy::AutoRename, _) => Ok(auto_rename_path(&dest, occupied)),
        (CollisionPolicy::Overwrite, ConflictKind::FileExists) => Ok(dest),
        _ => Err(kind),
    }
}

/// Generate a free path next to `path`.
///
/// For "IMG_0001.jpg", tries "IMG_0001 (1).jpg", "IMG_0001 (2).jpg", etc.
/// The stem and extension are kept byte for byte, even when not UTF-8.
pub fn auto_rename_path(path: &Path, occupied: impl Fn(&Path) -> bool) -> PathBuf {
    let parent = path.parent().unwrap_or(Path::new(""));

    for i in 1..1000 {
        let new_path = parent.join(suffixed_name(path, &format!(" ({i})")));
        if !occupied(&new_path) {
            return new_path;
        }
    }

    // Fallback: use timestamp
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);

    parent.join(suffixed_name(path, &format!("_{timestamp}")))
}

/// `stem` + `suffix` + `.extension`, built without lossy conversion.
fn suffixed_name(path: &Path, suffix: &str) -> OsString {
    let mut name = path.file_stem().unwrap_or_default().to_os_string();
    name.push(suffix);
    if let Some(ext) = path.extension() {
        name.push(".");
        name.push(ext);
    }
    name
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

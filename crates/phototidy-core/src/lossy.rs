//! Serializers that write paths as strings even when they are not UTF-8.
//!
//! serde's own `Path` impl fails on non-UTF-8 names. These replace invalid
//! sequences with U+FFFD instead. Use them with `#[serde(serialize_with)]`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Serialize one path.
pub fn path<S: Serializer>(path: &Path, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&path.to_string_lossy())
}

/// Serialize a list of paths.
pub fn paths<S: Serializer>(paths: &[PathBuf], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(paths.iter().map(|p| p.to_string_lossy()))
}

/// Serialize a map whose values are lists of paths.
pub fn path_map<K, S>(map: &BTreeMap<K, Vec<PathBuf>>, serializer: S) -> Result<S::Ok, S::Error>
where
    K: Serialize,
    S: Serializer,
{
    let mut out = serializer.serialize_map(Some(map.len()))?;
    for (key, value) in map {
        out.serialize_entry(key, &Lossy(value))?;
    }
    out.end()
}

struct Lossy<'a>(&'a [PathBuf]);

impl Serialize for Lossy<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        paths(self.0, serializer)
    }
}

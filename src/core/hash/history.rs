//! Bounded history of hash-qualified artifacts
//!
//! Artifact versions are modelled as [`HashedArtifact`] values rather than
//! parsed ad hoc out of file names. [`retain_newest`] is the pure "keep N
//! newest" policy; the store applies it whenever it lists a kind.

use super::writer::ContentHash;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// One on-disk version of a logical artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashedArtifact {
    /// Full path of the file
    pub path: PathBuf,
    /// Logical file name without the digest prefix (e.g. `mapping_edm.xml`)
    pub name: String,
    /// Digest from the file name, `None` for plain (unhashed) files
    pub hash: Option<ContentHash>,
    /// Last modification time
    pub modified: SystemTime,
}

impl HashedArtifact {
    /// Builds the value for `path` from its file name and metadata
    ///
    /// Returns `Ok(None)` when `path` has no UTF-8 file name.
    pub fn from_path(path: &Path) -> std::io::Result<Option<Self>> {
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            return Ok(None);
        };
        let modified = std::fs::metadata(path)?.modified()?;
        let (hash, name) = match ContentHash::split(file_name) {
            Some((hash, name)) => (Some(hash), name.to_string()),
            None => (None, file_name.to_string()),
        };
        Ok(Some(Self {
            path: path.to_path_buf(),
            name,
            hash,
            modified,
        }))
    }
}

/// Split of a version list into kept and discarded entries
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Retention {
    /// Newest first
    pub keep: Vec<HashedArtifact>,
    pub discard: Vec<HashedArtifact>,
}

/// Sorts by modification time, newest first, and keeps `depth` entries
///
/// Equal timestamps are ordered by path (descending) so the result never
/// depends on directory iteration order.
pub fn retain_newest(mut artifacts: Vec<HashedArtifact>, depth: usize) -> Retention {
    artifacts.sort_by(|a, b| {
        b.modified
            .cmp(&a.modified)
            .then_with(|| b.path.cmp(&a.path))
    });
    let discard = if artifacts.len() > depth {
        artifacts.split_off(depth)
    } else {
        Vec::new()
    };
    Retention {
        keep: artifacts,
        discard,
    }
}

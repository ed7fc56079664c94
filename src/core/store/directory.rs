//! One dataset directory on disk
//!
//! All file naming, listing, rotation and atomic replacement for a single
//! dataset goes through [`DatasetDirectory`]. Listing a kind always applies
//! its history depth, so stale versions disappear as a side effect of reads.

use super::artifact::{
    ArtifactKind, NamePattern, PrefixedFamily, ERROR_SUFFIX, IMPORTED_FILE, IMPORTED_PLAIN_FILE,
    SOURCE_FILE, SOURCE_PLAIN_FILE,
};
use super::codec::{read_key_values, write_key_values};
use super::hints::{Facts, Hints};
use crate::config::StorageConfig;
use crate::core::hash::writer::{is_temp_file_name, temp_file_in};
use crate::core::hash::{retain_newest, ArtifactWriter, Committed, HashedArtifact, PendingArtifact};
use crate::core::state::DatasetSnapshot;
use crate::core::stats::StatisticsFormat;
use crate::domain::{MetadataPrefix, Result, SpecName, StrataError};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Temporary files untouched for this long belong to an interrupted write
const STALE_TEMP_AGE: Duration = Duration::from_secs(60 * 60);

/// Handle on the directory of one dataset
#[derive(Debug, Clone)]
pub struct DatasetDirectory {
    spec: SpecName,
    dir: PathBuf,
    storage: StorageConfig,
}

impl DatasetDirectory {
    /// Opens the directory, creating it if needed
    ///
    /// Temporary files left behind by a crashed write are removed once they
    /// are older than an hour.
    pub fn open(spec: SpecName, dir: PathBuf, storage: StorageConfig) -> Result<Self> {
        fs::create_dir_all(&dir).map_err(|e| {
            StrataError::Storage(format!(
                "Failed to create dataset directory {}: {}",
                dir.display(),
                e
            ))
        })?;
        let directory = Self { spec, dir, storage };
        directory.sweep_temp_files(STALE_TEMP_AGE)?;
        Ok(directory)
    }

    fn sweep_temp_files(&self, older_than: Duration) -> Result<()> {
        let listing = fs::read_dir(&self.dir).map_err(|e| {
            StrataError::Storage(format!("Failed to list {}: {}", self.dir.display(), e))
        })?;
        let now = SystemTime::now();
        for entry in listing {
            let entry = entry?;
            let is_temp = entry.file_name().to_str().is_some_and(is_temp_file_name);
            if !is_temp {
                continue;
            }
            // Skip anything that vanished or was touched recently
            let stale = entry
                .metadata()
                .and_then(|m| m.modified())
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .is_some_and(|age| age >= older_than);
            if !stale {
                continue;
            }
            let path = entry.path();
            tracing::warn!(
                spec = %self.spec,
                file = %path.display(),
                "Removing temporary file left by an interrupted write"
            );
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(StrataError::Storage(format!(
                        "Failed to remove {}: {}",
                        path.display(),
                        e
                    )))
                }
            }
        }
        Ok(())
    }

    pub fn spec(&self) -> &SpecName {
        &self.spec
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn storage(&self) -> &StorageConfig {
        &self.storage
    }

    /// Regular, non-hidden files of the directory
    fn entries(&self) -> Result<Vec<HashedArtifact>> {
        let listing = fs::read_dir(&self.dir).map_err(|e| {
            StrataError::Storage(format!("Failed to list {}: {}", self.dir.display(), e))
        })?;
        let mut entries = Vec::new();
        for entry in listing {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let path = entry.path();
            let hidden = path
                .file_name()
                .and_then(|n| n.to_str())
                .map_or(true, |n| n.starts_with('.'));
            if hidden {
                continue;
            }
            // Files may vanish between listing and stat
            match HashedArtifact::from_path(&path) {
                Ok(Some(artifact)) => entries.push(artifact),
                Ok(None) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(entries)
    }

    fn is_version_of(artifact: &HashedArtifact, kind: &ArtifactKind) -> bool {
        kind.matches_name(&artifact.name) && artifact.hash.is_some() == kind.is_hashed()
    }

    fn discard(&self, stale: Vec<HashedArtifact>) -> Result<()> {
        for artifact in stale {
            tracing::debug!(
                spec = %self.spec,
                artifact = %artifact.path.display(),
                "Removing artifact beyond history depth"
            );
            match fs::remove_file(&artifact.path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(StrataError::Storage(format!(
                        "Failed to remove {}: {}",
                        artifact.path.display(),
                        e
                    )))
                }
            }
        }
        Ok(())
    }

    /// Versions of `kind`, newest first, after applying its history depth
    pub fn versions(&self, kind: &ArtifactKind) -> Result<Vec<HashedArtifact>> {
        let matching: Vec<_> = self
            .entries()?
            .into_iter()
            .filter(|a| Self::is_version_of(a, kind))
            .collect();
        let retention = retain_newest(matching, kind.history_depth(&self.storage));
        self.discard(retention.discard)?;
        Ok(retention.keep)
    }

    /// Current version of `kind`
    pub fn latest(&self, kind: &ArtifactKind) -> Result<Option<HashedArtifact>> {
        Ok(self.versions(kind)?.into_iter().next())
    }

    /// Most recent file whose logical name matches `pattern`
    pub fn find_latest_by_glob(&self, pattern: &NamePattern) -> Result<Option<HashedArtifact>> {
        let matching: Vec<_> = self
            .entries()?
            .into_iter()
            .filter(|a| pattern.matches(&a.name))
            .collect();
        Ok(retain_newest(matching, 1).keep.into_iter().next())
    }

    /// Most recent file per metadata prefix in `family`
    pub fn latest_per_prefix(
        &self,
        family: PrefixedFamily,
    ) -> Result<BTreeMap<MetadataPrefix, HashedArtifact>> {
        let mut grouped: BTreeMap<MetadataPrefix, Vec<HashedArtifact>> = BTreeMap::new();
        for artifact in self.entries()? {
            let Some(prefix) = family.prefix_of(&artifact.name) else {
                continue;
            };
            if !Self::is_version_of(&artifact, &family.kind(prefix.clone())) {
                continue;
            }
            grouped.entry(prefix).or_default().push(artifact);
        }

        let depth = family.history_depth(&self.storage);
        let mut latest = BTreeMap::new();
        for (prefix, versions) in grouped {
            let retention = retain_newest(versions, depth);
            self.discard(retention.discard)?;
            if let Some(newest) = retention.keep.into_iter().next() {
                latest.insert(prefix, newest);
            }
        }
        Ok(latest)
    }

    pub fn read_facts(&self) -> Result<Facts> {
        Ok(Facts::from_map(read_key_values(
            &self.dir.join(ArtifactKind::Facts.file_name()),
        )?))
    }

    pub fn write_facts(&self, facts: &Facts) -> Result<()> {
        write_key_values(
            &self.dir.join(ArtifactKind::Facts.file_name()),
            &format!("Facts for {}", self.spec),
            facts.as_map(),
        )
    }

    pub fn read_hints(&self) -> Result<Hints> {
        Ok(Hints::from_map(read_key_values(
            &self.dir.join(ArtifactKind::Hints.file_name()),
        )?))
    }

    pub fn write_hints(&self, hints: &Hints) -> Result<()> {
        write_key_values(
            &self.dir.join(ArtifactKind::Hints.file_name()),
            &format!("Hints for {}", self.spec),
            hints.as_map(),
        )
    }

    /// Streaming writer for a hash-qualified artifact of `kind`
    pub fn create_writer(&self, kind: &ArtifactKind) -> Result<ArtifactWriter> {
        if !kind.is_hashed() {
            return Err(StrataError::Storage(format!(
                "{kind} is not a hash-qualified artifact"
            )));
        }
        let compress = kind.is_compressible() && self.storage.compress;
        ArtifactWriter::create(&self.dir, &kind.stored_name(compress), compress)
    }

    /// Commits a finished writer and rotates the history of `kind`
    ///
    /// The new version is never a rotation candidate itself, even when its
    /// modification time ties with older versions.
    pub fn commit(&self, kind: &ArtifactKind, pending: PendingArtifact) -> Result<Committed> {
        let existing = self.versions(kind)?;
        let committed = pending.commit(&existing)?;
        if let Committed::Written(path) = &committed {
            let older: Vec<_> = existing.into_iter().filter(|a| &a.path != path).collect();
            let depth = kind.history_depth(&self.storage).saturating_sub(1);
            self.discard(retain_newest(older, depth).discard)?;
            tracing::info!(spec = %self.spec, artifact = %path.display(), "Artifact stored");
        }
        Ok(committed)
    }

    /// Atomically replaces a plain (unhashed) artifact
    pub fn write_plain(&self, kind: &ArtifactKind, bytes: &[u8]) -> Result<PathBuf> {
        if kind.is_hashed() {
            return Err(StrataError::Storage(format!(
                "{kind} must be written through a hashing writer"
            )));
        }
        let target = self.dir.join(kind.file_name());
        let mut temp = temp_file_in(&self.dir)?;
        temp.write_all(bytes)?;
        temp.flush()?;
        temp.persist(&target)?;
        Ok(target)
    }

    /// Sets the modification time of `path` to now
    pub fn touch(&self, path: &Path) -> Result<()> {
        let file = File::options().write(true).open(path)?;
        file.set_modified(SystemTime::now()).map_err(|e| {
            StrataError::Storage(format!("Failed to touch {}: {}", path.display(), e))
        })
    }

    /// Renames an unparseable input so it no longer counts as an artifact
    pub fn rename_with_error_suffix(&self, path: &Path) -> Result<PathBuf> {
        let mut renamed = path.as_os_str().to_os_string();
        renamed.push(ERROR_SUFFIX);
        let renamed = PathBuf::from(renamed);
        fs::rename(path, &renamed).map_err(|e| {
            StrataError::Storage(format!("Failed to rename {}: {}", path.display(), e))
        })?;
        tracing::warn!(spec = %self.spec, artifact = %renamed.display(), "Input marked as erroneous");
        Ok(renamed)
    }

    /// Removes a file or, recursively, a directory inside the dataset
    pub fn delete_artifact(&self, path: &Path) -> Result<()> {
        if !path.starts_with(&self.dir) {
            return Err(StrataError::Storage(format!(
                "{} is outside dataset {}",
                path.display(),
                self.spec
            )));
        }
        let result = if path.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        };
        result.map_err(|e| StrataError::Storage(format!("Failed to delete {}: {}", path.display(), e)))
    }

    /// Removes the whole dataset directory
    pub fn delete(self) -> Result<()> {
        fs::remove_dir_all(&self.dir).map_err(|e| {
            StrataError::Storage(format!(
                "Failed to delete dataset {} at {}: {}",
                self.spec,
                self.dir.display(),
                e
            ))
        })?;
        tracing::info!(spec = %self.spec, "Dataset deleted");
        Ok(())
    }

    /// Captures the facts state inference needs from a single listing
    ///
    /// Nothing is rotated or deleted.
    pub fn snapshot(&self) -> Result<DatasetSnapshot> {
        let raw_name = ArtifactKind::Statistics(StatisticsFormat::Raw).file_name();
        let canonical_name = ArtifactKind::Statistics(StatisticsFormat::Canonical).file_name();
        let newest = |slot: &mut Option<SystemTime>, modified: SystemTime| {
            *slot = Some(slot.map_or(modified, |current| current.max(modified)));
        };

        let mut snapshot = DatasetSnapshot::default();
        for artifact in self.entries()? {
            let name = artifact.name.as_str();
            match (&artifact.hash, name) {
                (Some(_), IMPORTED_FILE | IMPORTED_PLAIN_FILE) => {
                    newest(&mut snapshot.imported, artifact.modified)
                }
                (Some(_), SOURCE_FILE | SOURCE_PLAIN_FILE) => {
                    newest(&mut snapshot.source, artifact.modified)
                }
                (None, n) if n == raw_name => {
                    newest(&mut snapshot.raw_statistics, artifact.modified)
                }
                (None, n) if n == canonical_name => {
                    newest(&mut snapshot.canonical_statistics, artifact.modified)
                }
                (Some(_), n) => {
                    if let Some(prefix) = PrefixedFamily::Mapping.prefix_of(n) {
                        snapshot.mapped_prefixes.insert(prefix);
                    } else if let Some(prefix) = PrefixedFamily::Validation.prefix_of(n) {
                        snapshot.validated_prefixes.insert(prefix);
                    }
                }
                _ => {}
            }
        }
        snapshot.hints_delimited = self.read_hints()?.is_delimited();
        Ok(snapshot)
    }
}

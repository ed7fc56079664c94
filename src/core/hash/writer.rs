//! Digesting writers and hash-qualified artifact commits
//!
//! [`HashingWriter`] digests every byte that passes through it.
//! [`ArtifactWriter`] stacks it over an optional gzip encoder and a temporary
//! file in the dataset directory; [`PendingArtifact::commit`] renames the
//! temporary file to `<hash>__<name>` or discards it when an artifact with the
//! same digest is already present. A temporary file that is never committed is
//! deleted when it is dropped, so failed or cancelled passes leave nothing
//! behind.

use super::history::HashedArtifact;
use crate::domain::{Result, StrataError};
use flate2::write::GzEncoder;
use flate2::Compression;
use sha2::{Digest, Sha256};
use std::fmt;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Separator between the digest and the logical name in a file name
pub const HASH_SEPARATOR: &str = "__";

const HASH_HEX_LEN: usize = 64;

/// Hex-encoded SHA-256 digest of an artifact's logical content
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentHash(String);

impl ContentHash {
    /// Digest of an in-memory buffer
    pub fn of_bytes(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self(format!("{:x}", hasher.finalize()))
    }

    fn from_hasher(hasher: Sha256) -> Self {
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name embedding this digest: `<hash>__<name>`
    pub fn qualify(&self, name: &str) -> String {
        format!("{}{}{}", self.0, HASH_SEPARATOR, name)
    }

    /// Splits a hash-qualified file name into digest and logical name
    ///
    /// Returns `None` for file names without a well-formed digest prefix.
    pub fn split(file_name: &str) -> Option<(ContentHash, &str)> {
        let (hash, name) = file_name.split_once(HASH_SEPARATOR)?;
        let well_formed = hash.len() == HASH_HEX_LEN
            && hash.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
        if !well_formed || name.is_empty() {
            return None;
        }
        Some((ContentHash(hash.to_string()), name))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Writer adapter that digests everything written through it
pub struct HashingWriter<W: Write> {
    inner: W,
    hasher: Sha256,
    bytes: u64,
}

impl<W: Write> HashingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
            bytes: 0,
        }
    }

    /// Bytes written so far
    pub fn bytes_written(&self) -> u64 {
        self.bytes
    }

    /// Returns the inner writer, the digest and the byte count
    pub fn finish(self) -> (W, ContentHash, u64) {
        (self.inner, ContentHash::from_hasher(self.hasher), self.bytes)
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.hasher.update(&buf[..written]);
        self.bytes += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

enum Sink {
    Plain(BufWriter<NamedTempFile>),
    Gzip(GzEncoder<BufWriter<NamedTempFile>>),
}

impl Sink {
    fn into_temp_file(self) -> io::Result<NamedTempFile> {
        let buffered = match self {
            Sink::Plain(buffered) => buffered,
            Sink::Gzip(encoder) => encoder.finish()?,
        };
        buffered.into_inner().map_err(|e| e.into_error())
    }
}

impl Write for Sink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Sink::Plain(w) => w.write(buf),
            Sink::Gzip(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Sink::Plain(w) => w.flush(),
            Sink::Gzip(w) => w.flush(),
        }
    }
}

/// Streaming writer for a hash-qualified artifact
///
/// The digest covers the logical (uncompressed) bytes, so the same content
/// always yields the same file name regardless of compression.
pub struct ArtifactWriter {
    dir: PathBuf,
    name: String,
    sink: HashingWriter<Sink>,
}

impl ArtifactWriter {
    /// Opens a temporary file in `dir` for the artifact called `name`
    pub fn create(dir: &Path, name: &str, compress: bool) -> Result<Self> {
        let temp = temp_file_in(dir)?;
        let buffered = BufWriter::new(temp);
        let sink = if compress {
            Sink::Gzip(GzEncoder::new(buffered, Compression::default()))
        } else {
            Sink::Plain(buffered)
        };
        Ok(Self {
            dir: dir.to_path_buf(),
            name: name.to_string(),
            sink: HashingWriter::new(sink),
        })
    }

    /// Flushes all layers and computes the digest
    pub fn finish(self) -> Result<PendingArtifact> {
        let (sink, hash, bytes) = self.sink.finish();
        let temp = sink.into_temp_file()?;
        Ok(PendingArtifact {
            dir: self.dir,
            name: self.name,
            temp,
            hash,
            bytes,
        })
    }
}

impl Write for ArtifactWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.sink.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()
    }
}

/// Outcome of committing an artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Committed {
    /// A new file was written at this path
    Written(PathBuf),
    /// Identical content was already present at this path; nothing changed
    Unchanged(PathBuf),
}

impl Committed {
    pub fn path(&self) -> &Path {
        match self {
            Committed::Written(path) | Committed::Unchanged(path) => path,
        }
    }

    pub fn is_unchanged(&self) -> bool {
        matches!(self, Committed::Unchanged(_))
    }
}

/// A fully written artifact waiting in its temporary file
pub struct PendingArtifact {
    dir: PathBuf,
    name: String,
    temp: NamedTempFile,
    hash: ContentHash,
    bytes: u64,
}

impl PendingArtifact {
    pub fn hash(&self) -> &ContentHash {
        &self.hash
    }

    /// Logical (uncompressed) size in bytes
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Renames the temporary file to its hash-qualified name
    ///
    /// If one of `existing` already carries the same digest the new copy is
    /// discarded and `Committed::Unchanged` names the existing file.
    pub fn commit(self, existing: &[HashedArtifact]) -> Result<Committed> {
        if let Some(same) = existing
            .iter()
            .find(|a| a.name == self.name && a.hash.as_ref() == Some(&self.hash))
        {
            tracing::info!(
                artifact = %self.name,
                hash = %self.hash,
                "Content identical to existing artifact, discarding new copy"
            );
            return Ok(Committed::Unchanged(same.path.clone()));
        }

        let target = self.dir.join(self.hash.qualify(&self.name));
        self.temp.persist(&target)?;
        tracing::debug!(artifact = %target.display(), bytes = self.bytes, "Artifact committed");
        Ok(Committed::Written(target))
    }
}

const TEMP_PREFIX: &str = ".strata-";
const TEMP_SUFFIX: &str = ".tmp";

/// Temporary file in `dir` whose name never matches an artifact pattern
pub(crate) fn temp_file_in(dir: &Path) -> Result<NamedTempFile> {
    tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(TEMP_SUFFIX)
        .tempfile_in(dir)
        .map_err(|e| {
            StrataError::Storage(format!(
                "Failed to create temporary file in {}: {}",
                dir.display(),
                e
            ))
        })
}

/// Whether `name` was produced by [`temp_file_in`]
pub(crate) fn is_temp_file_name(name: &str) -> bool {
    name.starts_with(TEMP_PREFIX) && name.ends_with(TEMP_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;
    use std::time::SystemTime;
    use tempfile::TempDir;

    #[test]
    fn test_hash_deterministic() {
        let a = ContentHash::of_bytes(b"<a/>");
        let b = ContentHash::of_bytes(b"<a/>");
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
        assert_ne!(a, ContentHash::of_bytes(b"<b/>"));
    }

    #[test]
    fn test_qualify_and_split() {
        let hash = ContentHash::of_bytes(b"data");
        let name = hash.qualify("mapping_edm.xml");
        let (back, logical) = ContentHash::split(&name).unwrap();
        assert_eq!(back, hash);
        assert_eq!(logical, "mapping_edm.xml");
    }

    #[test]
    fn test_split_rejects_plain_names() {
        assert!(ContentHash::split("facts.txt").is_none());
        assert!(ContentHash::split("abc__source.xml.gz").is_none());
        assert!(ContentHash::split("report_edm.txt").is_none());
    }

    #[test]
    fn test_hashing_writer_matches_of_bytes() {
        let mut writer = HashingWriter::new(Vec::new());
        writer.write_all(b"hello ").unwrap();
        writer.write_all(b"world").unwrap();
        assert_eq!(writer.bytes_written(), 11);
        let (inner, hash, bytes) = writer.finish();
        assert_eq!(inner, b"hello world");
        assert_eq!(bytes, 11);
        assert_eq!(hash, ContentHash::of_bytes(b"hello world"));
    }

    #[test]
    fn test_artifact_writer_commit_compressed() {
        let dir = TempDir::new().unwrap();
        let mut writer = ArtifactWriter::create(dir.path(), "source.xml.gz", true).unwrap();
        writer.write_all(b"<envelope/>").unwrap();
        let pending = writer.finish().unwrap();
        assert_eq!(pending.hash(), &ContentHash::of_bytes(b"<envelope/>"));

        let committed = pending.commit(&[]).unwrap();
        let path = committed.path().to_path_buf();
        assert!(matches!(committed, Committed::Written(_)));
        assert!(path.file_name().unwrap().to_string_lossy().ends_with("__source.xml.gz"));

        let mut text = String::new();
        GzDecoder::new(std::fs::File::open(&path).unwrap())
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text, "<envelope/>");
    }

    #[test]
    fn test_commit_identical_is_unchanged() {
        let dir = TempDir::new().unwrap();
        let existing_path = dir
            .path()
            .join(ContentHash::of_bytes(b"same").qualify("imported.xml.gz"));
        std::fs::write(&existing_path, b"whatever").unwrap();
        let existing = vec![HashedArtifact {
            path: existing_path.clone(),
            name: "imported.xml.gz".to_string(),
            hash: Some(ContentHash::of_bytes(b"same")),
            modified: SystemTime::now(),
        }];

        let mut writer = ArtifactWriter::create(dir.path(), "imported.xml.gz", false).unwrap();
        writer.write_all(b"same").unwrap();
        let committed = writer.finish().unwrap().commit(&existing).unwrap();

        assert_eq!(committed, Committed::Unchanged(existing_path));
        // Only the pre-existing file remains, the temporary copy is gone
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_dropped_writer_leaves_nothing() {
        let dir = TempDir::new().unwrap();
        {
            let mut writer = ArtifactWriter::create(dir.path(), "source.xml.gz", true).unwrap();
            writer.write_all(b"<partial>").unwrap();
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}

//! Content hashing for artifacts
//!
//! Incremental SHA-256 digests of artifact streams, hash-qualified file
//! names, identical-content detection and bounded version history.

pub mod history;
pub mod writer;

pub use history::{retain_newest, HashedArtifact, Retention};
pub use writer::{ArtifactWriter, Committed, ContentHash, HashingWriter, PendingArtifact};

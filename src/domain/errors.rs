//! Domain error types
//!
//! This module defines the error hierarchy for Strata. Every operation on a
//! dataset returns either a value or exactly one member of this taxonomy.
//! Errors are domain-specific and don't expose third-party types.

use std::path::PathBuf;
use thiserror::Error;

/// Main Strata error type
///
/// Nothing in the crate retries automatically; callers decide whether to
/// retry, alert the user, or ignore the failure.
#[derive(Debug, Error)]
pub enum StrataError {
    /// Missing or inconsistent hints or configuration values
    ///
    /// Not retryable. Fixing it requires new hints or a new configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Malformed input document
    ///
    /// The offending artifact has already been renamed with an error suffix
    /// when this is returned, `path` points at the renamed file.
    #[error("Structural parse error in {}: {message}", path.display())]
    StructuralParse { path: PathBuf, message: String },

    /// Missing or duplicate record identifier
    #[error("Uniqueness violation: {0}")]
    Uniqueness(#[from] UniquenessViolation),

    /// Filesystem failure while creating, renaming or deleting artifacts
    #[error("Storage error: {0}")]
    Storage(String),

    /// The pass was stopped by its progress listener or cancellation token
    #[error("Operation cancelled")]
    Cancelled,

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A background pass panicked or was aborted before returning
    #[error("Worker error: {0}")]
    Worker(String),
}

/// Per-record identifier failures raised by the source normalizer
///
/// Both are fatal to the pass: all partial output is discarded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UniquenessViolation {
    /// The record has no node at the unique-element path
    #[error("record {record} has no identifier at {path}")]
    MissingIdentifier { record: u64, path: String },

    /// The identifier was already used by an earlier record of the same pass
    #[error("record {record} repeats identifier '{identifier}'")]
    DuplicateIdentifier { record: u64, identifier: String },
}

impl StrataError {
    /// Returns true for errors that were caused by the input or the hints
    /// rather than by the environment
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            StrataError::Configuration(_)
                | StrataError::StructuralParse { .. }
                | StrataError::Uniqueness(_)
        )
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for StrataError {
    fn from(err: std::io::Error) -> Self {
        StrataError::Storage(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for StrataError {
    fn from(err: serde_json::Error) -> Self {
        StrataError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for StrataError {
    fn from(err: toml::de::Error) -> Self {
        StrataError::Configuration(format!("TOML parse error: {err}"))
    }
}

// Conversion from a failed temp-file rename
impl From<tempfile::PersistError> for StrataError {
    fn from(err: tempfile::PersistError) -> Self {
        StrataError::Storage(format!("Failed to commit artifact: {}", err.error))
    }
}

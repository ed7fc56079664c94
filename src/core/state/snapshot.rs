//! Point-in-time view of a dataset directory
//!
//! A [`DatasetSnapshot`] holds just what state inference needs: artifact
//! modification times, whether hints delimit records, and which prefixes are
//! mapped or validated. It is a plain value, so it can be built in tests
//! without touching the filesystem.

use crate::domain::MetadataPrefix;
use std::collections::BTreeSet;
use std::time::SystemTime;

/// Artifact facts of one dataset at one moment
///
/// # Examples
///
/// ```
/// use strata::core::state::{infer_state, DatasetSnapshot};
/// use strata::domain::LifecycleState;
/// use std::time::SystemTime;
///
/// let now = SystemTime::now();
/// let snapshot = DatasetSnapshot::default()
///     .with_imported(now)
///     .with_source(now);
/// assert_eq!(infer_state(&snapshot), LifecycleState::Sourced);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetSnapshot {
    /// Modification time of the current imported artifact
    pub imported: Option<SystemTime>,
    /// Modification time of the current source artifact
    pub source: Option<SystemTime>,
    pub raw_statistics: Option<SystemTime>,
    pub canonical_statistics: Option<SystemTime>,
    /// Record root, count and unique element are present and consistent
    pub hints_delimited: bool,
    /// Prefixes with at least one mapping
    pub mapped_prefixes: BTreeSet<MetadataPrefix>,
    /// Prefixes with a validation artifact
    pub validated_prefixes: BTreeSet<MetadataPrefix>,
}

impl DatasetSnapshot {
    pub fn with_imported(mut self, modified: SystemTime) -> Self {
        self.imported = Some(modified);
        self
    }

    pub fn with_source(mut self, modified: SystemTime) -> Self {
        self.source = Some(modified);
        self
    }

    pub fn with_raw_statistics(mut self, modified: SystemTime) -> Self {
        self.raw_statistics = Some(modified);
        self
    }

    pub fn with_canonical_statistics(mut self, modified: SystemTime) -> Self {
        self.canonical_statistics = Some(modified);
        self
    }

    pub fn with_hints_delimited(mut self, delimited: bool) -> Self {
        self.hints_delimited = delimited;
        self
    }

    pub fn with_mapping(mut self, prefix: MetadataPrefix) -> Self {
        self.mapped_prefixes.insert(prefix);
        self
    }

    pub fn with_validation(mut self, prefix: MetadataPrefix) -> Self {
        self.validated_prefixes.insert(prefix);
        self
    }

    /// True when the import is newer than the source, or there is no source
    pub fn import_is_current(&self) -> bool {
        match (self.imported, self.source) {
            (Some(_), None) => true,
            (Some(imported), Some(source)) => imported > source,
            (None, _) => false,
        }
    }

    /// True when some mapped prefix also has a validation
    pub fn has_validated_mapping(&self) -> bool {
        self.mapped_prefixes
            .intersection(&self.validated_prefixes)
            .next()
            .is_some()
    }
}

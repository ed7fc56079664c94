//! Dataset lifecycle states
//!
//! The state of a dataset is never stored. It is recomputed from the
//! artifacts on disk by [`crate::core::state::infer_state`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Processing stage of a dataset, totally ordered from `Empty` to `Validated`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Nothing imported yet
    Empty,
    /// Raw input present but not analyzed
    Imported,
    /// Raw statistics are newer than the import
    AnalyzedImport,
    /// Record root, record count and unique element are set and consistent
    Delimited,
    /// Canonical source is at least as new as the import
    Sourced,
    /// Canonical statistics are newer than the source
    AnalyzedSource,
    /// At least one mapping exists
    Mapping,
    /// A mapped prefix has a validation artifact
    Validated,
}

impl LifecycleState {
    /// All states in lifecycle order
    pub const ALL: [LifecycleState; 8] = [
        LifecycleState::Empty,
        LifecycleState::Imported,
        LifecycleState::AnalyzedImport,
        LifecycleState::Delimited,
        LifecycleState::Sourced,
        LifecycleState::AnalyzedSource,
        LifecycleState::Mapping,
        LifecycleState::Validated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Empty => "empty",
            LifecycleState::Imported => "imported",
            LifecycleState::AnalyzedImport => "analyzed_import",
            LifecycleState::Delimited => "delimited",
            LifecycleState::Sourced => "sourced",
            LifecycleState::AnalyzedSource => "analyzed_source",
            LifecycleState::Mapping => "mapping",
            LifecycleState::Validated => "validated",
        }
    }

    /// True once a canonical source copy is current
    pub fn has_source(&self) -> bool {
        *self >= LifecycleState::Sourced
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

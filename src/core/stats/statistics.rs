//! Statistics model
//!
//! Per-path counters produced by one statistics pass and persisted as
//! `stats-raw.json` or `stats-canonical.json`.

use crate::config::StatisticsConfig;
use crate::domain::Path;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Which form of the dataset was analyzed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatisticsFormat {
    /// The imported input as received
    Raw,
    /// The normalized source envelope
    Canonical,
}

impl StatisticsFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatisticsFormat::Raw => "raw",
            StatisticsFormat::Canonical => "canonical",
        }
    }
}

impl fmt::Display for StatisticsFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Counters for one element or attribute path
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldStatistics {
    /// Times the node was seen
    pub occurrences: u64,
    /// Times it carried non-blank text
    pub non_empty: u64,
    /// Distinct values with their counts, bounded in size
    pub values: BTreeMap<String, u64>,
    /// Length in characters of the longest value seen
    pub longest_value: usize,
    /// Values counted but not kept because they exceeded the length cut-off
    pub long_values: u64,
    /// True once a new distinct value had to be dropped
    pub overflowed: bool,
}

impl FieldStatistics {
    /// Counts one occurrence with its (untrimmed) direct text
    pub fn record(&mut self, value: &str, limits: &StatisticsConfig) {
        self.occurrences += 1;
        let value = value.trim();
        if value.is_empty() {
            return;
        }
        self.non_empty += 1;
        let length = value.chars().count();
        self.longest_value = self.longest_value.max(length);
        if length > limits.max_value_length {
            self.long_values += 1;
        } else if let Some(count) = self.values.get_mut(value) {
            *count += 1;
        } else if self.values.len() < limits.max_distinct_values {
            self.values.insert(value.to_string(), 1);
        } else {
            self.overflowed = true;
        }
    }

    /// True when every non-empty value seen so far was distinct
    ///
    /// Only decidable while all values were kept; helps pick a unique element.
    pub fn appears_unique(&self) -> bool {
        self.non_empty > 0
            && !self.overflowed
            && self.long_values == 0
            && self.non_empty == self.occurrences
            && self.values.values().all(|count| *count == 1)
    }
}

/// Result of one statistics pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub format: StatisticsFormat,
    pub created_at: DateTime<Utc>,
    /// Total elements in the document
    pub element_count: u64,
    /// Length cut-off that was in effect
    pub max_value_length: usize,
    pub fields: BTreeMap<Path, FieldStatistics>,
}

impl Statistics {
    pub fn new(format: StatisticsFormat, max_value_length: usize) -> Self {
        Self {
            format,
            created_at: Utc::now(),
            element_count: 0,
            max_value_length,
            fields: BTreeMap::new(),
        }
    }

    pub fn field(&self, path: &Path) -> Option<&FieldStatistics> {
        self.fields.get(path)
    }

    /// Occurrences of `path`, 0 when never seen
    pub fn occurrences(&self, path: &Path) -> u64 {
        self.field(path).map_or(0, |field| field.occurrences)
    }

    /// Paths whose values were all distinct, candidates for the unique element
    pub fn unique_candidates(&self) -> Vec<&Path> {
        self.fields
            .iter()
            .filter(|(_, field)| field.appears_unique())
            .map(|(path, _)| path)
            .collect()
    }

    pub fn to_json(&self) -> crate::domain::Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub fn from_json(bytes: &[u8]) -> crate::domain::Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

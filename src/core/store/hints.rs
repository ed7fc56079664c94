//! Facts and hints of a dataset
//!
//! Facts are free-form metadata. Hints carry the three delimiters needed to
//! cut raw input into records (record root, record count, unique element)
//! next to unrelated keys such as harvest settings, which are kept as-is.

use crate::domain::{Path, Result, StrataError};
use std::collections::BTreeMap;

pub const RECORD_ROOT_PATH: &str = "recordRootPath";
pub const RECORD_COUNT: &str = "recordCount";
pub const UNIQUE_ELEMENT_PATH: &str = "uniqueElementPath";

/// Free-form dataset metadata
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Facts {
    values: BTreeMap<String, String>,
}

impl Facts {
    pub fn from_map(values: BTreeMap<String, String>) -> Self {
        Self { values }
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Validated record delimiters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delimiters {
    pub record_root: Path,
    pub record_count: u64,
    pub unique_element: Path,
}

impl Delimiters {
    /// # Errors
    ///
    /// `StrataError::Configuration` when the count is zero or the unique
    /// element does not lie strictly below the record root.
    pub fn new(record_root: Path, record_count: u64, unique_element: Path) -> Result<Self> {
        if record_root.is_empty() {
            return Err(StrataError::Configuration(
                "Record root path cannot be the document root".to_string(),
            ));
        }
        if record_root.last().is_some_and(|tag| tag.is_attribute()) {
            return Err(StrataError::Configuration(format!(
                "Record root must be an element, got {record_root}"
            )));
        }
        if record_count == 0 {
            return Err(StrataError::Configuration(
                "Record count must be a positive integer".to_string(),
            ));
        }
        if !record_root.is_ancestor_of(&unique_element) {
            return Err(StrataError::Configuration(format!(
                "Unique element {unique_element} is not below record root {record_root}"
            )));
        }
        Ok(Self {
            record_root,
            record_count,
            unique_element,
        })
    }
}

/// Dataset hints
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hints {
    values: BTreeMap<String, String>,
}

impl Hints {
    pub fn from_map(values: BTreeMap<String, String>) -> Self {
        Self { values }
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }

    /// Stores the delimiters, leaving other keys untouched
    pub fn set_delimiters(&mut self, delimiters: &Delimiters) {
        self.set(RECORD_ROOT_PATH, delimiters.record_root.to_string());
        self.set(RECORD_COUNT, delimiters.record_count.to_string());
        self.set(UNIQUE_ELEMENT_PATH, delimiters.unique_element.to_string());
    }

    /// Parses and validates the three delimiter hints
    ///
    /// # Errors
    ///
    /// `StrataError::Configuration` when a hint is absent, unparseable or the
    /// hints are mutually inconsistent.
    pub fn delimiters(&self) -> Result<Delimiters> {
        let record_root = self.required_path(RECORD_ROOT_PATH)?;
        let unique_element = self.required_path(UNIQUE_ELEMENT_PATH)?;
        let count_text = self.required(RECORD_COUNT)?;
        let record_count: u64 = count_text.parse().map_err(|_| {
            StrataError::Configuration(format!(
                "{RECORD_COUNT} must be a positive integer, got '{count_text}'"
            ))
        })?;
        Delimiters::new(record_root, record_count, unique_element)
    }

    /// True when all three delimiter hints are present and consistent
    pub fn is_delimited(&self) -> bool {
        self.delimiters().is_ok()
    }

    fn required(&self, key: &str) -> Result<&str> {
        match self.get(key) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(StrataError::Configuration(format!("Hint {key} is not set"))),
        }
    }

    fn required_path(&self, key: &str) -> Result<Path> {
        self.required(key)?
            .parse()
            .map_err(|e| StrataError::Configuration(format!("Hint {key} is invalid: {e}")))
    }
}

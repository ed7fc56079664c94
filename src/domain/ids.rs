//! Domain identifier types with validation
//!
//! Newtype wrappers for the names that end up in directory and file names.
//! Validation keeps them free of path separators so they can never escape the
//! storage root.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

fn validate_name(kind: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{kind} cannot be empty"));
    }
    if value.starts_with('.') {
        return Err(format!("{kind} cannot start with '.': {value}"));
    }
    if let Some(c) = value
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(format!("{kind} contains invalid character '{c}': {value}"));
    }
    Ok(())
}

/// Dataset spec name newtype wrapper
///
/// Identifies one dataset and names its directory under the storage root.
///
/// # Examples
///
/// ```
/// use strata::domain::ids::SpecName;
/// use std::str::FromStr;
///
/// let spec = SpecName::from_str("museum-collection").unwrap();
/// assert_eq!(spec.as_str(), "museum-collection");
/// assert!(SpecName::from_str("../etc").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpecName(String);

impl SpecName {
    /// Creates a new SpecName, rejecting empty names and path characters
    pub fn new(name: impl Into<String>) -> Result<Self, String> {
        let name = name.into();
        validate_name("Spec name", &name)?;
        Ok(Self(name))
    }

    /// Returns the spec name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for SpecName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SpecName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for SpecName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Metadata prefix newtype wrapper
///
/// Keys the per-schema artifacts (mapping, validation, report, record
/// definition). Prefixes never contain `_` or `-` because those separate the
/// prefix from the artifact name on disk.
///
/// # Examples
///
/// ```
/// use strata::domain::ids::MetadataPrefix;
/// use std::str::FromStr;
///
/// let prefix = MetadataPrefix::from_str("edm").unwrap();
/// assert_eq!(prefix.as_str(), "edm");
/// assert!(MetadataPrefix::from_str("ese_v2").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MetadataPrefix(String);

impl MetadataPrefix {
    /// Creates a new MetadataPrefix (ASCII letters and digits only)
    pub fn new(prefix: impl Into<String>) -> Result<Self, String> {
        let prefix = prefix.into();
        if prefix.is_empty() {
            return Err("Metadata prefix cannot be empty".to_string());
        }
        if !prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(format!(
                "Metadata prefix must be ASCII letters and digits only: {prefix}"
            ));
        }
        Ok(Self(prefix))
    }

    /// Returns the prefix as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MetadataPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MetadataPrefix {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for MetadataPrefix {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

//! Flat `key=value` text codec used by facts and hints
//!
//! One entry per line, split at the first `=`, keys and values trimmed.
//! Lines starting with `#` and blank lines are ignored.

use crate::core::hash::writer::temp_file_in;
use crate::domain::{Result, StrataError};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

pub fn parse_key_values(text: &str) -> BTreeMap<String, String> {
    let mut values = BTreeMap::new();
    for (number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match line.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                values.insert(key.trim().to_string(), value.trim().to_string());
            }
            _ => {
                tracing::warn!(line = number + 1, content = %line, "Ignoring malformed key=value line");
            }
        }
    }
    values
}

/// Renders entries sorted by key under a `#` header
///
/// Line breaks inside values are replaced by spaces; the format has no
/// escaping.
pub fn render_key_values(header: &str, values: &BTreeMap<String, String>) -> String {
    let mut text = String::new();
    for line in header.lines() {
        text.push_str("# ");
        text.push_str(line);
        text.push('\n');
    }
    for (key, value) in values {
        let value = value.replace(['\r', '\n'], " ");
        text.push_str(key);
        text.push('=');
        text.push_str(&value);
        text.push('\n');
    }
    text
}

/// Reads a key/value file; a missing file yields an empty map
pub fn read_key_values(path: &Path) -> Result<BTreeMap<String, String>> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(parse_key_values(&text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
        Err(e) => Err(StrataError::Storage(format!(
            "Failed to read {}: {}",
            path.display(),
            e
        ))),
    }
}

/// Replaces a key/value file through a temporary file and rename
pub fn write_key_values(path: &Path, header: &str, values: &BTreeMap<String, String>) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| StrataError::Storage(format!("No parent directory for {}", path.display())))?;
    let mut temp = temp_file_in(dir)?;
    temp.write_all(render_key_values(header, values).as_bytes())?;
    temp.flush()?;
    temp.persist(path)?;
    Ok(())
}

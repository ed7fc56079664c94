//! Structural paths into XML documents
//!
//! A [`Path`] is the ordered list of tags from the document root down to an
//! element or attribute. Paths address records (record root, unique element)
//! and key the statistics. Equality is structural, and the text form is
//! `/prefix:element/child/@attribute`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One path segment: an element or attribute name with an optional
/// namespace prefix
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag {
    attribute: bool,
    prefix: Option<String>,
    local: String,
}

impl Tag {
    /// Element tag from a qualified name such as `dc:title` or `title`
    pub fn element(qname: &str) -> Self {
        Self::from_qname(qname, false)
    }

    /// Attribute tag from a qualified name such as `xml:lang` or `id`
    pub fn attribute(qname: &str) -> Self {
        Self::from_qname(qname, true)
    }

    fn from_qname(qname: &str, attribute: bool) -> Self {
        match qname.split_once(':') {
            Some((prefix, local)) if !prefix.is_empty() => Self {
                attribute,
                prefix: Some(prefix.to_string()),
                local: local.to_string(),
            },
            _ => Self {
                attribute,
                prefix: None,
                local: qname.to_string(),
            },
        }
    }

    pub fn is_attribute(&self) -> bool {
        self.attribute
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn local_name(&self) -> &str {
        &self.local
    }

    /// The qualified name without the attribute marker, as it appears in XML
    pub fn qname(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}:{}", self.local),
            None => self.local.clone(),
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.attribute {
            write!(f, "@")?;
        }
        write!(f, "{}", self.qname())
    }
}

/// Ordered sequence of tags from the document root
///
/// # Examples
///
/// ```
/// use strata::domain::path::Path;
/// use std::str::FromStr;
///
/// let root = Path::from_str("/adlibXML/recordList/record").unwrap();
/// let unique = Path::from_str("/adlibXML/recordList/record/priref").unwrap();
/// assert!(root.is_ancestor_of(&unique));
/// assert_eq!(unique.to_string(), "/adlibXML/recordList/record/priref");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Path {
    tags: Vec<Tag>,
}

impl Path {
    /// The empty path (document level, above the root element)
    pub fn root() -> Self {
        Self::default()
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn last(&self) -> Option<&Tag> {
        self.tags.last()
    }

    pub fn push(&mut self, tag: Tag) {
        self.tags.push(tag);
    }

    pub fn pop(&mut self) -> Option<Tag> {
        self.tags.pop()
    }

    /// A new path one level deeper
    pub fn child(&self, tag: Tag) -> Path {
        let mut child = self.clone();
        child.push(tag);
        child
    }

    /// The enclosing path, `None` for the empty path
    pub fn parent(&self) -> Option<Path> {
        if self.tags.is_empty() {
            return None;
        }
        Some(Path {
            tags: self.tags[..self.tags.len() - 1].to_vec(),
        })
    }

    /// True when `self` is a proper prefix of `other`
    pub fn is_ancestor_of(&self, other: &Path) -> bool {
        self.tags.len() < other.tags.len() && other.tags.starts_with(&self.tags)
    }

    /// True when `self` equals `prefix` or lies below it
    pub fn starts_with(&self, prefix: &Path) -> bool {
        self.tags.starts_with(&prefix.tags)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.tags.is_empty() {
            return write!(f, "/");
        }
        for tag in &self.tags {
            write!(f, "/{tag}")?;
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let Some(rest) = s.strip_prefix('/') else {
            return Err(format!("Path must start with '/': {s}"));
        };
        let mut path = Path::root();
        if rest.is_empty() {
            return Ok(path);
        }
        let segments: Vec<&str> = rest.split('/').collect();
        for (index, segment) in segments.iter().enumerate() {
            let tag = match segment.strip_prefix('@') {
                Some(name) => {
                    if index + 1 != segments.len() {
                        return Err(format!("Attribute must be the last path segment: {s}"));
                    }
                    Tag::attribute(name)
                }
                None => Tag::element(segment),
            };
            if tag.local_name().is_empty() {
                return Err(format!("Path contains an empty segment: {s}"));
            }
            path.push(tag);
        }
        Ok(path)
    }
}

impl TryFrom<String> for Path {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Path> for String {
    fn from(path: Path) -> Self {
        path.to_string()
    }
}

//! Artifact kinds and their on-disk names
//!
//! Each logical artifact type maps to one file name (prefixed with a content
//! hash for the hashed kinds) and a history depth.

use crate::config::StorageConfig;
use crate::core::stats::StatisticsFormat;
use crate::domain::{MetadataPrefix, Result, StrataError};
use flate2::read::GzDecoder;
use regex::Regex;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

pub const FACTS_FILE: &str = "facts.txt";
pub const HINTS_FILE: &str = "hints.txt";
pub const IMPORTED_FILE: &str = "imported.xml.gz";
pub const SOURCE_FILE: &str = "source.xml.gz";
pub const IMPORTED_PLAIN_FILE: &str = "imported.xml";
pub const SOURCE_PLAIN_FILE: &str = "source.xml";

/// Suffix appended to an input artifact that failed to parse
pub const ERROR_SUFFIX: &str = ".error";

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Artifact families keyed by metadata prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrefixedFamily {
    RecordDefinition,
    Mapping,
    Validation,
    Report,
}

impl PrefixedFamily {
    pub const ALL: [PrefixedFamily; 4] = [
        PrefixedFamily::RecordDefinition,
        PrefixedFamily::Mapping,
        PrefixedFamily::Validation,
        PrefixedFamily::Report,
    ];

    fn affixes(&self) -> (&'static str, &'static str) {
        match self {
            PrefixedFamily::RecordDefinition => ("", "-record-definition.xml"),
            PrefixedFamily::Mapping => ("mapping_", ".xml"),
            PrefixedFamily::Validation => ("validation_", ".txt"),
            PrefixedFamily::Report => ("report_", ".txt"),
        }
    }

    /// Logical file name for `prefix` in this family
    pub fn file_name(&self, prefix: &MetadataPrefix) -> String {
        let (head, tail) = self.affixes();
        format!("{head}{prefix}{tail}")
    }

    /// Recovers the prefix from a logical file name of this family
    pub fn prefix_of(&self, name: &str) -> Option<MetadataPrefix> {
        let (head, tail) = self.affixes();
        let middle = name.strip_prefix(head)?.strip_suffix(tail)?;
        MetadataPrefix::new(middle).ok()
    }

    pub fn kind(&self, prefix: MetadataPrefix) -> ArtifactKind {
        match self {
            PrefixedFamily::RecordDefinition => ArtifactKind::RecordDefinition(prefix),
            PrefixedFamily::Mapping => ArtifactKind::Mapping(prefix),
            PrefixedFamily::Validation => ArtifactKind::Validation(prefix),
            PrefixedFamily::Report => ArtifactKind::Report(prefix),
        }
    }

    /// Versions kept per prefix
    pub fn history_depth(&self, config: &StorageConfig) -> usize {
        match self {
            PrefixedFamily::Mapping => config.mapping_history,
            PrefixedFamily::Validation => config.validation_history,
            PrefixedFamily::RecordDefinition | PrefixedFamily::Report => 1,
        }
    }
}

/// Logical artifact type of a dataset
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Facts,
    Hints,
    Imported,
    Source,
    Statistics(StatisticsFormat),
    RecordDefinition(MetadataPrefix),
    Mapping(MetadataPrefix),
    Validation(MetadataPrefix),
    Report(MetadataPrefix),
}

impl ArtifactKind {
    /// Logical file name, without any hash prefix
    pub fn file_name(&self) -> String {
        match self {
            ArtifactKind::Facts => FACTS_FILE.to_string(),
            ArtifactKind::Hints => HINTS_FILE.to_string(),
            ArtifactKind::Imported => IMPORTED_FILE.to_string(),
            ArtifactKind::Source => SOURCE_FILE.to_string(),
            ArtifactKind::Statistics(format) => format!("stats-{}.json", format.as_str()),
            ArtifactKind::RecordDefinition(prefix) => {
                PrefixedFamily::RecordDefinition.file_name(prefix)
            }
            ArtifactKind::Mapping(prefix) => PrefixedFamily::Mapping.file_name(prefix),
            ArtifactKind::Validation(prefix) => PrefixedFamily::Validation.file_name(prefix),
            ArtifactKind::Report(prefix) => PrefixedFamily::Report.file_name(prefix),
        }
    }

    /// File name a new version is stored under
    ///
    /// Compressible kinds drop the `.gz` extension when compression is off.
    pub fn stored_name(&self, compress: bool) -> String {
        match self {
            ArtifactKind::Imported if !compress => IMPORTED_PLAIN_FILE.to_string(),
            ArtifactKind::Source if !compress => SOURCE_PLAIN_FILE.to_string(),
            _ => self.file_name(),
        }
    }

    /// Whether a stored file called `name` is a version of this kind
    ///
    /// Both the compressed and the plain name are accepted, since the
    /// compression setting may change between runs.
    pub fn matches_name(&self, name: &str) -> bool {
        name == self.file_name() || (self.is_compressible() && name == self.stored_name(false))
    }

    /// Whether stored versions carry a content hash in their name
    pub fn is_hashed(&self) -> bool {
        matches!(
            self,
            ArtifactKind::Imported
                | ArtifactKind::Source
                | ArtifactKind::Mapping(_)
                | ArtifactKind::Validation(_)
        )
    }

    /// Whether the content may be stored gzip-compressed
    pub fn is_compressible(&self) -> bool {
        matches!(self, ArtifactKind::Imported | ArtifactKind::Source)
    }

    pub fn family(&self) -> Option<PrefixedFamily> {
        match self {
            ArtifactKind::RecordDefinition(_) => Some(PrefixedFamily::RecordDefinition),
            ArtifactKind::Mapping(_) => Some(PrefixedFamily::Mapping),
            ArtifactKind::Validation(_) => Some(PrefixedFamily::Validation),
            ArtifactKind::Report(_) => Some(PrefixedFamily::Report),
            _ => None,
        }
    }

    /// Versions kept on disk
    pub fn history_depth(&self, config: &StorageConfig) -> usize {
        self.family()
            .map(|family| family.history_depth(config))
            .unwrap_or(1)
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file_name())
    }
}

/// Glob over logical artifact names (`*` and `?` wildcards)
#[derive(Debug, Clone)]
pub struct NamePattern {
    glob: String,
    regex: Regex,
}

impl NamePattern {
    pub fn new(glob: &str) -> Result<Self> {
        let mut expr = String::from("^");
        for c in glob.chars() {
            match c {
                '*' => expr.push_str(".*"),
                '?' => expr.push('.'),
                other => expr.push_str(&regex::escape(&other.to_string())),
            }
        }
        expr.push('$');
        let regex = Regex::new(&expr)
            .map_err(|e| StrataError::Configuration(format!("Invalid pattern '{glob}': {e}")))?;
        Ok(Self {
            glob: glob.to_string(),
            regex,
        })
    }

    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }

    pub fn as_str(&self) -> &str {
        &self.glob
    }
}

/// Opens an artifact for streaming, transparently decompressing gzip content
pub fn open_artifact(path: &Path) -> Result<Box<dyn BufRead + Send>> {
    let file = File::open(path).map_err(|e| {
        StrataError::Storage(format!("Failed to open {}: {}", path.display(), e))
    })?;
    let mut reader = BufReader::new(file);
    let is_gzip = reader.fill_buf()?.starts_with(&GZIP_MAGIC);
    if is_gzip {
        Ok(Box::new(BufReader::new(GzDecoder::new(reader))))
    } else {
        Ok(Box::new(reader))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::{Read, Write};

    fn prefix(p: &str) -> MetadataPrefix {
        MetadataPrefix::new(p).unwrap()
    }

    #[test]
    fn test_file_names() {
        assert_eq!(ArtifactKind::Imported.file_name(), "imported.xml.gz");
        assert_eq!(ArtifactKind::Imported.stored_name(false), "imported.xml");
        assert_eq!(ArtifactKind::Source.stored_name(true), "source.xml.gz");
        assert_eq!(ArtifactKind::Mapping(prefix("edm")).stored_name(false), "mapping_edm.xml");
        assert_eq!(
            ArtifactKind::Statistics(StatisticsFormat::Raw).file_name(),
            "stats-raw.json"
        );
        assert_eq!(ArtifactKind::Mapping(prefix("edm")).file_name(), "mapping_edm.xml");
        assert_eq!(
            ArtifactKind::Validation(prefix("edm")).file_name(),
            "validation_edm.txt"
        );
        assert_eq!(ArtifactKind::Report(prefix("ese")).file_name(), "report_ese.txt");
        assert_eq!(
            ArtifactKind::RecordDefinition(prefix("ese")).file_name(),
            "ese-record-definition.xml"
        );
    }

    #[test]
    fn test_prefix_round_trip() {
        for family in PrefixedFamily::ALL {
            let name = family.file_name(&prefix("edm"));
            assert_eq!(family.prefix_of(&name), Some(prefix("edm")));
        }
        assert_eq!(PrefixedFamily::Mapping.prefix_of("report_edm.txt"), None);
        assert_eq!(PrefixedFamily::Mapping.prefix_of("mapping_.xml"), None);
    }

    #[test]
    fn test_history_depth() {
        let config = StorageConfig::default();
        assert_eq!(ArtifactKind::Mapping(prefix("edm")).history_depth(&config), 30);
        assert_eq!(ArtifactKind::Validation(prefix("edm")).history_depth(&config), 1);
        assert_eq!(ArtifactKind::Source.history_depth(&config), 1);
    }

    #[test]
    fn test_hashed_kinds() {
        assert!(ArtifactKind::Imported.is_hashed());
        assert!(ArtifactKind::Mapping(prefix("a")).is_hashed());
        assert!(!ArtifactKind::Facts.is_hashed());
        assert!(!ArtifactKind::Statistics(StatisticsFormat::Canonical).is_hashed());
        assert!(!ArtifactKind::Report(prefix("a")).is_hashed());
    }

    #[test]
    fn test_name_pattern() {
        let pattern = NamePattern::new("*-record-definition.xml").unwrap();
        assert!(pattern.matches("ese-record-definition.xml"));
        assert!(!pattern.matches("ese-record-definition.xml.bak"));
        assert!(!pattern.matches("mapping_ese.xml"));

        let pattern = NamePattern::new("mapping_???.xml").unwrap();
        assert!(pattern.matches("mapping_edm.xml"));
        assert!(!pattern.matches("mapping_edm2.xml"));
    }

    #[test]
    fn test_open_artifact_plain_and_gzip() {
        let dir = tempfile::TempDir::new().unwrap();

        let plain = dir.path().join("plain.xml");
        std::fs::write(&plain, b"<a/>").unwrap();
        let mut text = String::new();
        open_artifact(&plain).unwrap().read_to_string(&mut text).unwrap();
        assert_eq!(text, "<a/>");

        let zipped = dir.path().join("zipped.xml.gz");
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"<b/>").unwrap();
        std::fs::write(&zipped, encoder.finish().unwrap()).unwrap();
        let mut text = String::new();
        open_artifact(&zipped).unwrap().read_to_string(&mut text).unwrap();
        assert_eq!(text, "<b/>");
    }
}

//! Versioned artifact storage
//!
//! A storage root holds one directory per dataset. Inside it every artifact
//! type has a fixed logical name; hashed kinds are stored as
//! `<sha256>__<name>` with a bounded history, the rest are replaced in place
//! through a temporary file and rename.
//!
//! ```text
//! strata-data/
//!   museum/
//!     facts.txt
//!     hints.txt
//!     3f9a...__imported.xml.gz
//!     81c0...__source.xml.gz
//!     stats-raw.json
//!     stats-canonical.json
//!     d2e4...__mapping_edm.xml
//!     77ab...__validation_edm.txt
//!     report_edm.txt
//!     edm-record-definition.xml
//! ```

pub mod artifact;
pub mod codec;
pub mod directory;
pub mod hints;
pub mod storage;

pub use artifact::{open_artifact, ArtifactKind, NamePattern, PrefixedFamily};
pub use directory::DatasetDirectory;
pub use hints::{Delimiters, Facts, Hints};
pub use storage::Storage;

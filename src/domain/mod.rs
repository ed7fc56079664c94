//! Domain models and types for Strata.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed names** ([`SpecName`], [`MetadataPrefix`])
//! - **Structural paths** ([`Path`], [`Tag`]) addressing records and statistics
//! - **Lifecycle states** ([`LifecycleState`])
//! - **Error types** ([`StrataError`], [`UniquenessViolation`])
//! - **Result type alias** ([`Result`])
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, StrataError>`]:
//!
//! ```rust
//! use strata::domain::{Path, Result, StrataError};
//!
//! fn record_root(text: &str) -> Result<Path> {
//!     text.parse().map_err(StrataError::Configuration)
//! }
//! # assert!(record_root("/a/b").is_ok());
//! ```

pub mod errors;
pub mod ids;
pub mod path;
pub mod result;
pub mod state;

// Re-export commonly used types for convenience
pub use errors::{StrataError, UniquenessViolation};
pub use ids::{MetadataPrefix, SpecName};
pub use path::{Path, Tag};
pub use result::Result;
pub use state::LifecycleState;

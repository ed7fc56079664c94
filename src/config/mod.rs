//! Configuration management for Strata.
//!
//! Strata reads a TOML file with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `STRATA_<SECTION>_<KEY>` environment overrides
//! - Default values for every setting
//! - Validation on load
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Log level
//! - [`StorageConfig`] - Storage root, history depths, compression
//! - [`StatisticsConfig`] - Value-set bounds and progress step
//! - [`LoggingConfig`] - Local file logging
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "info"
//!
//! [storage]
//! root = "${STRATA_HOME}/datasets"
//! mapping_history = 30
//! validation_history = 1
//!
//! [statistics]
//! max_value_length = 1000
//! max_distinct_values = 1000
//! progress_step = 10000
//!
//! [logging]
//! local_enabled = true
//! local_path = "./logs"
//! local_rotation = "daily"
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use strata::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("strata.toml")?;
//! println!("Datasets live in {}", config.storage.root.display());
//! # Ok(())
//! # }
//! ```

pub mod loader;
pub mod schema;

// Re-export commonly used types
pub use loader::load_config;
pub use schema::{ApplicationConfig, LoggingConfig, StatisticsConfig, StorageConfig, StrataConfig};

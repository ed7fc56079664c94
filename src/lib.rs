// Strata - Dataset Artifact Store and Source Normalizer
// Copyright (c) 2025 Strata Contributors
// Licensed under the MIT License

//! # Strata - Dataset Artifact Store and Source Normalizer
//!
//! Strata keeps the on-disk artifacts of metadata datasets (raw imports,
//! canonical source copies, statistics, mappings, validations, reports),
//! infers each dataset's processing stage from those artifacts alone, and
//! rewrites arbitrary nested XML record streams into one canonical envelope
//! form in a single streaming pass.
//!
//! ## Architecture
//!
//! - [`core`] - Storage, state inference, normalization, statistics
//! - [`domain`] - Core domain types (paths, names, states, errors)
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging and observability
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use strata::config::StrataConfig;
//! use strata::core::progress::{CancellationToken, LoggingProgress};
//! use strata::core::store::Storage;
//! use strata::domain::SpecName;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let storage = Storage::open(&StrataConfig::default())?;
//!     let dataset = storage.dataset(&SpecName::new("museum")?)?;
//!
//!     let mut progress = LoggingProgress::new("import");
//!     dataset.import_external("export.xml.gz".as_ref(), &mut progress, CancellationToken::new())?;
//!
//!     println!("{} is {}", dataset.spec(), dataset.state()?);
//!     Ok(())
//! }
//! ```
//!
//! ## Lifecycle
//!
//! The state of a dataset is never stored. It is recomputed from which
//! artifacts exist and how their modification times compare:
//!
//! ```rust
//! use strata::core::state::{infer_state, DatasetSnapshot};
//! use strata::domain::LifecycleState;
//! use std::time::{Duration, SystemTime};
//!
//! let imported = SystemTime::now();
//! let snapshot = DatasetSnapshot::default()
//!     .with_imported(imported)
//!     .with_raw_statistics(imported + Duration::from_secs(1));
//! assert_eq!(infer_state(&snapshot), LifecycleState::AnalyzedImport);
//! ```
//!
//! ## Error Handling
//!
//! Strata uses the [`domain::StrataError`] type for all errors:
//!
//! ```rust,no_run
//! use strata::domain::StrataError;
//!
//! fn example() -> Result<(), StrataError> {
//!     // Errors are automatically converted using the ? operator
//!     let config = strata::config::load_config("strata.toml")?;
//!     Ok(())
//! }
//! ```
//!
//! ## Logging
//!
//! Strata uses structured logging with the `tracing` crate:
//!
//! ```rust,no_run
//! use tracing::{info, warn};
//!
//! info!(spec = "museum", "Starting conversion");
//! warn!(spec = "museum", "Record count differs from hints");
//! ```

pub mod config;
pub mod core;
pub mod domain;
pub mod logging;

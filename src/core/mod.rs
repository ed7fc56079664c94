//! Core business logic for Strata.
//!
//! # Modules
//!
//! - [`store`] - Dataset directories, artifact naming, history rotation
//! - [`hash`] - Content hashing and identical-content detection
//! - [`state`] - Lifecycle state inference from artifact timestamps
//! - [`xml`] - Typed streaming XML events
//! - [`normalize`] - Rewriting delimited input into the canonical envelope
//! - [`stats`] - Per-path value statistics
//! - [`progress`] - Progress listeners, cancellation and alerts
//! - [`worker`] - Running passes from async code
//!
//! # Dataset Workflow
//!
//! 1. **Import**: copy raw XML into `<hash>__imported.xml.gz`
//! 2. **Analyze**: collect raw statistics
//! 3. **Delimit**: choose record root and unique element, stored as hints
//! 4. **Convert**: normalize into `<hash>__source.xml.gz`
//! 5. **Analyze**: collect canonical statistics
//! 6. **Map and validate**: store mapping and validation artifacts per prefix
//!
//! # Example
//!
//! ```rust,no_run
//! use strata::config::load_config;
//! use strata::core::progress::{CancellationToken, NoProgress};
//! use strata::core::stats::StatisticsFormat;
//! use strata::core::store::Storage;
//! use strata::domain::{SpecName, StrataError};
//!
//! # fn example() -> strata::domain::Result<()> {
//! let config = load_config("strata.toml")?;
//! let storage = Storage::open(&config)?;
//! let dataset = storage.dataset(&SpecName::new("museum").map_err(StrataError::Configuration)?)?;
//!
//! dataset.import_external("export.xml".as_ref(), &mut NoProgress, CancellationToken::new())?;
//! dataset.analyze(StatisticsFormat::Raw, &mut NoProgress, CancellationToken::new())?;
//! dataset.delimit(
//!     "/adlibXML/recordList/record".parse().map_err(StrataError::Configuration)?,
//!     "/adlibXML/recordList/record/priref".parse().map_err(StrataError::Configuration)?,
//! )?;
//! let summary = dataset.convert(&mut NoProgress, CancellationToken::new())?;
//!
//! println!("{} records, state {}", summary.record_count, dataset.state()?);
//! # Ok(())
//! # }
//! ```

pub mod dataset;
pub mod hash;
pub mod normalize;
pub mod progress;
pub mod state;
pub mod stats;
pub mod store;
pub mod worker;
pub mod xml;

pub use dataset::{ConversionSummary, Dataset};

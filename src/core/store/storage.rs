//! Storage root holding all datasets

use super::directory::DatasetDirectory;
use crate::config::StrataConfig;
use crate::core::dataset::Dataset;
use crate::core::progress::{AlertSink, LogAlertSink};
use crate::domain::{Result, SpecName, StrataError};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Directory of datasets, one subdirectory per spec name
///
/// # Examples
///
/// ```no_run
/// use strata::config::StrataConfig;
/// use strata::core::store::Storage;
/// use strata::domain::SpecName;
///
/// # fn example() -> strata::domain::Result<()> {
/// let storage = Storage::open(&StrataConfig::default())?;
/// let dataset = storage.dataset(&SpecName::new("museum").map_err(strata::domain::StrataError::Configuration)?)?;
/// println!("{} is {}", dataset.spec(), dataset.state()?);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Storage {
    root: PathBuf,
    config: StrataConfig,
    alerts: Arc<dyn AlertSink>,
}

impl Storage {
    /// Opens the storage root from the configuration, creating it if needed
    ///
    /// The configuration is validated first, so hand-built values get the
    /// same checks as a loaded file.
    pub fn open(config: &StrataConfig) -> Result<Self> {
        config.validate().map_err(|e| {
            StrataError::Configuration(format!("Configuration validation failed: {}", e))
        })?;
        let root = config.storage.root.clone();
        fs::create_dir_all(&root).map_err(|e| {
            StrataError::Storage(format!(
                "Failed to create storage root {}: {}",
                root.display(),
                e
            ))
        })?;
        tracing::debug!(root = %root.display(), "Storage opened");
        Ok(Self {
            root,
            config: config.clone(),
            alerts: Arc::new(LogAlertSink),
        })
    }

    /// Replaces the sink that receives pass failures
    pub fn with_alert_sink(mut self, alerts: Arc<dyn AlertSink>) -> Self {
        self.alerts = alerts;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &StrataConfig {
        &self.config
    }

    /// Gets or creates the dataset called `spec`
    pub fn dataset(&self, spec: &SpecName) -> Result<Dataset> {
        let directory = DatasetDirectory::open(
            spec.clone(),
            self.root.join(spec.as_str()),
            self.config.storage.clone(),
        )?;
        Ok(Dataset::new(
            directory,
            self.config.statistics.clone(),
            Arc::clone(&self.alerts),
        ))
    }

    /// The dataset called `spec`, if its directory exists
    pub fn existing_dataset(&self, spec: &SpecName) -> Result<Option<Dataset>> {
        if !self.root.join(spec.as_str()).is_dir() {
            return Ok(None);
        }
        self.dataset(spec).map(Some)
    }

    /// Spec names of all datasets, sorted
    pub fn spec_names(&self) -> Result<Vec<SpecName>> {
        let listing = fs::read_dir(&self.root).map_err(|e| {
            StrataError::Storage(format!("Failed to list {}: {}", self.root.display(), e))
        })?;
        let mut names = Vec::new();
        for entry in listing {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            match SpecName::new(name) {
                Ok(spec) => names.push(spec),
                Err(reason) => tracing::debug!(%reason, "Skipping directory in storage root"),
            }
        }
        names.sort();
        Ok(names)
    }

    /// Deletes a dataset and everything in it
    pub fn delete_dataset(&self, spec: &SpecName) -> Result<()> {
        match self.existing_dataset(spec)? {
            Some(dataset) => dataset.delete(),
            None => Err(StrataError::Storage(format!("Dataset {spec} does not exist"))),
        }
    }
}

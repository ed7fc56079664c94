//! Configuration schema types
//!
//! This module defines the configuration structure for Strata.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main Strata configuration
///
/// This is the root configuration structure that maps to the TOML file.
/// Every section is optional in the file and falls back to its defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrataConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Dataset storage settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Statistics collection limits
    #[serde(default)]
    pub statistics: StatisticsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl StrataConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.storage.validate()?;
        self.statistics.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Dataset storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding one subdirectory per dataset
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,

    /// Hash-qualified mapping versions kept per metadata prefix
    #[serde(default = "default_mapping_history")]
    pub mapping_history: usize,

    /// Hash-qualified validation versions kept per metadata prefix
    #[serde(default = "default_validation_history")]
    pub validation_history: usize,

    /// Store imported and source artifacts gzip-compressed
    #[serde(default = "default_true")]
    pub compress: bool,
}

impl StorageConfig {
    fn validate(&self) -> Result<(), String> {
        if self.root.as_os_str().is_empty() {
            return Err("storage.root cannot be empty".to_string());
        }
        if self.mapping_history == 0 {
            return Err("storage.mapping_history must be > 0".to_string());
        }
        if self.validation_history == 0 {
            return Err("storage.validation_history must be > 0".to_string());
        }
        Ok(())
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
            mapping_history: default_mapping_history(),
            validation_history: default_validation_history(),
            compress: true,
        }
    }
}

/// Statistics collection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticsConfig {
    /// Values longer than this are counted but not kept in the value set
    #[serde(default = "default_max_value_length")]
    pub max_value_length: usize,

    /// Distinct values kept per path
    #[serde(default = "default_max_distinct_values")]
    pub max_distinct_values: usize,

    /// Elements between progress reports and cancellation checks
    #[serde(default = "default_progress_step")]
    pub progress_step: u64,
}

impl StatisticsConfig {
    fn validate(&self) -> Result<(), String> {
        if self.max_value_length == 0 {
            return Err("statistics.max_value_length must be > 0".to_string());
        }
        if self.max_distinct_values == 0 {
            return Err("statistics.max_distinct_values must be > 0".to_string());
        }
        if self.progress_step == 0 {
            return Err("statistics.progress_step must be > 0".to_string());
        }
        Ok(())
    }
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            max_value_length: default_max_value_length(),
            max_distinct_values: default_max_distinct_values(),
            progress_step: default_progress_step(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local file logging
    #[serde(default = "default_true")]
    pub local_enabled: bool,

    /// Local log file directory
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }
        if self.local_enabled && self.local_path.trim().is_empty() {
            return Err("logging.local_path cannot be empty when local logging is enabled".to_string());
        }
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: true,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("./strata-data")
}

fn default_mapping_history() -> usize {
    30
}

fn default_validation_history() -> usize {
    1
}

fn default_max_value_length() -> usize {
    1000
}

fn default_max_distinct_values() -> usize {
    1000
}

fn default_progress_step() -> u64 {
    10_000
}

fn default_local_path() -> String {
    "./logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = StrataConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.storage.mapping_history, 30);
        assert_eq!(config.storage.validation_history, 1);
        assert_eq!(config.statistics.progress_step, 10_000);
    }

    #[test]
    fn test_application_config_validation() {
        let mut config = ApplicationConfig::default();
        assert!(config.validate().is_ok());

        config.log_level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_storage_config_validation() {
        let mut config = StorageConfig::default();
        config.mapping_history = 0;
        assert!(config.validate().is_err());

        config.mapping_history = 5;
        config.validation_history = 0;
        assert!(config.validate().is_err());

        config.validation_history = 1;
        config.root = PathBuf::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_statistics_config_validation() {
        let mut config = StatisticsConfig::default();
        config.progress_step = 0;
        assert!(config.validate().is_err());

        config.progress_step = 10;
        config.max_distinct_values = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_logging_config_validation() {
        let mut config = LoggingConfig::default();
        config.local_rotation = "size".to_string();
        assert!(config.validate().is_err());

        config.local_rotation = "hourly".to_string();
        config.local_path = " ".to_string();
        assert!(config.validate().is_err());

        config.local_enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config: StrataConfig = toml::from_str("").unwrap();
        assert_eq!(config.application.log_level, "info");
        assert!(config.storage.compress);
        assert_eq!(config.statistics.max_value_length, 1000);
    }
}

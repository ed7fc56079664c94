//! Integration tests for logging functionality

use strata::config::LoggingConfig;
use strata::domain::StrataError;
use strata::logging::init_logging;
use strata::{log_error_with_context, log_pass_complete, log_pass_start};
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_logging_config_default() {
    let config = LoggingConfig::default();
    assert!(config.local_enabled);
    assert_eq!(config.local_rotation, "daily");
    assert_eq!(config.local_path, "./logs");
}

// The global subscriber can only be installed once per process, so
// everything that depends on it lives in this one test.
#[test]
fn test_init_logging_creates_directory_once() {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("logs");

    let config = LoggingConfig {
        local_enabled: true,
        local_path: log_path.to_string_lossy().to_string(),
        local_rotation: "hourly".to_string(),
    };
    assert!(!log_path.exists());

    let guard = init_logging("debug", &config).expect("first initialization succeeds");
    assert!(log_path.is_dir());

    log_pass_start!("convert", "museum");
    log_pass_complete!("convert", "museum", 2u64, Duration::from_millis(12));
    log_error_with_context!(
        &StrataError::Storage("disk full".to_string()),
        "convert failed for dataset museum"
    );

    let again = init_logging("info", &config);
    assert!(matches!(again, Err(StrataError::Configuration(_))));

    drop(guard);
}

#[test]
fn test_init_logging_rejects_unknown_level() {
    let config = LoggingConfig {
        local_enabled: false,
        ..LoggingConfig::default()
    };
    let result = init_logging("verbose", &config);
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("Invalid log level"));
}

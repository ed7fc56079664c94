//! Logging and observability
//!
//! This module provides structured logging with support for:
//! - Configurable log levels
//! - JSON-formatted local file logs with rotation
//! - Helper macros for the start and end of streaming passes
//!
//! # Example
//!
//! ```no_run
//! use strata::logging::init_logging;
//! use strata::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```

pub mod structured;

// Re-export commonly used items
pub use structured::{init_logging, LoggingGuard};

/// Log the start of a streaming pass over a dataset
///
/// # Example
///
/// ```no_run
/// use strata::log_pass_start;
///
/// log_pass_start!("convert", "museum");
/// ```
#[macro_export]
macro_rules! log_pass_start {
    ($pass:expr, $spec:expr) => {
        tracing::info!(pass = $pass, spec = %$spec, "Starting pass");
    };
}

/// Log the completion of a streaming pass
///
/// # Example
///
/// ```no_run
/// use strata::log_pass_complete;
/// use std::time::Duration;
///
/// log_pass_complete!("convert", "museum", 42, Duration::from_secs(3));
/// ```
#[macro_export]
macro_rules! log_pass_complete {
    ($pass:expr, $spec:expr, $count:expr, $duration:expr) => {
        tracing::info!(
            pass = $pass,
            spec = %$spec,
            count = $count,
            duration_ms = $duration.as_millis() as u64,
            "Pass completed"
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use strata::log_error_with_context;
/// use strata::domain::StrataError;
///
/// let error = StrataError::Configuration("recordCount missing".to_string());
/// log_error_with_context!(&error, "Failed to convert dataset");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}

#[cfg(test)]
mod tests {
    use crate::domain::StrataError;
    use std::time::Duration;

    #[test]
    fn test_macros_expand() {
        let error = StrataError::Cancelled;
        log_pass_start!("analyze", "spec");
        log_pass_complete!("analyze", "spec", 10u64, Duration::from_millis(5));
        log_error_with_context!(&error, "test context");
    }
}

//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::StrataConfig;
use crate::domain::errors::StrataError;
use crate::domain::result::Result;
use regex::Regex;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Loads a `.env` file from the working directory if one exists
/// 2. Reads the TOML file
/// 3. Performs environment variable substitution (${VAR} syntax)
/// 4. Parses the TOML into StrataConfig
/// 5. Applies environment variable overrides (STRATA_* prefix)
/// 6. Validates the configuration
///
/// # Errors
///
/// Returns `StrataError::Configuration` if the file cannot be read or parsed,
/// a referenced variable is unset, or validation fails.
///
/// # Examples
///
/// ```no_run
/// use strata::config::loader::load_config;
///
/// let config = load_config("strata.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<StrataConfig> {
    let path = path.as_ref();

    // A missing .env file is not an error
    let _ = dotenvy::dotenv();

    if !path.exists() {
        return Err(StrataError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        StrataError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    let mut config: StrataConfig = toml::from_str(&contents)
        .map_err(|e| StrataError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        StrataError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    tracing::debug!(path = %path.display(), root = %config.storage.root.display(), "Configuration loaded");
    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are copied untouched.
///
/// # Errors
///
/// Returns an error listing every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| StrataError::Configuration(e.to_string()))?;
    let mut result = String::new();
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{}}}", var_name);
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(StrataError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Applies environment variable overrides using STRATA_* prefix
///
/// Environment variables follow the pattern: STRATA_<SECTION>_<KEY>,
/// for example STRATA_STORAGE_ROOT.
///
/// # Errors
///
/// Returns `StrataError::Configuration` naming the variable when a numeric
/// or boolean value cannot be parsed
fn apply_env_overrides(config: &mut StrataConfig) -> Result<()> {
    if let Ok(val) = std::env::var("STRATA_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    if let Ok(val) = std::env::var("STRATA_STORAGE_ROOT") {
        config.storage.root = PathBuf::from(val);
    }
    if let Some(depth) = parse_env("STRATA_STORAGE_MAPPING_HISTORY")? {
        config.storage.mapping_history = depth;
    }
    if let Some(depth) = parse_env("STRATA_STORAGE_VALIDATION_HISTORY")? {
        config.storage.validation_history = depth;
    }
    if let Some(compress) = parse_env("STRATA_STORAGE_COMPRESS")? {
        config.storage.compress = compress;
    }

    if let Some(length) = parse_env("STRATA_STATISTICS_MAX_VALUE_LENGTH")? {
        config.statistics.max_value_length = length;
    }
    if let Some(count) = parse_env("STRATA_STATISTICS_MAX_DISTINCT_VALUES")? {
        config.statistics.max_distinct_values = count;
    }
    if let Some(step) = parse_env("STRATA_STATISTICS_PROGRESS_STEP")? {
        config.statistics.progress_step = step;
    }

    if let Some(enabled) = parse_env("STRATA_LOGGING_LOCAL_ENABLED")? {
        config.logging.local_enabled = enabled;
    }
    if let Ok(val) = std::env::var("STRATA_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
    if let Ok(val) = std::env::var("STRATA_LOGGING_LOCAL_ROTATION") {
        config.logging.local_rotation = val;
    }
    Ok(())
}

/// Parses the variable `name` if it is set
fn parse_env<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    let Ok(val) = std::env::var(name) else {
        return Ok(None);
    };
    val.trim().parse().map(Some).map_err(|e| {
        StrataError::Configuration(format!("Invalid value '{}' for {}: {}", val, name, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitute_env_vars() {
        std::env::set_var("STRATA_LOADER_TEST_VAR", "/srv/strata");
        let input = "root = \"${STRATA_LOADER_TEST_VAR}\"";
        let result = substitute_env_vars(input).unwrap();
        assert_eq!(result, "root = \"/srv/strata\"\n");
        std::env::remove_var("STRATA_LOADER_TEST_VAR");
    }

    #[test]
    fn test_substitute_env_vars_missing() {
        std::env::remove_var("STRATA_LOADER_MISSING_VAR");
        let input = "root = \"${STRATA_LOADER_MISSING_VAR}\"";
        let result = substitute_env_vars(input);
        assert!(result.is_err());
    }

    #[test]
    fn test_substitute_env_vars_skips_comments() {
        std::env::remove_var("STRATA_LOADER_COMMENTED_VAR");
        let input = "# root = \"${STRATA_LOADER_COMMENTED_VAR}\"";
        assert!(substitute_env_vars(input).is_ok());
    }

    #[test]
    fn test_parse_env() {
        std::env::set_var("STRATA_LOADER_PARSE_OK", " 42 ");
        assert_eq!(parse_env::<u64>("STRATA_LOADER_PARSE_OK").unwrap(), Some(42));
        std::env::remove_var("STRATA_LOADER_PARSE_OK");

        std::env::remove_var("STRATA_LOADER_PARSE_UNSET");
        assert_eq!(parse_env::<bool>("STRATA_LOADER_PARSE_UNSET").unwrap(), None);

        std::env::set_var("STRATA_LOADER_PARSE_BAD", "lots");
        let err = parse_env::<usize>("STRATA_LOADER_PARSE_BAD").unwrap_err();
        assert!(matches!(err, StrataError::Configuration(_)));
        assert!(err.to_string().contains("STRATA_LOADER_PARSE_BAD"));
        std::env::remove_var("STRATA_LOADER_PARSE_BAD");

        std::env::set_var("STRATA_LOADER_PARSE_FLAG", "yes");
        assert!(parse_env::<bool>("STRATA_LOADER_PARSE_FLAG").is_err());
        std::env::remove_var("STRATA_LOADER_PARSE_FLAG");
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("nonexistent-strata.toml");
        assert!(matches!(result, Err(StrataError::Configuration(_))));
    }
}

//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::SynchrologConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load a TOML file, overlay `SYNCHROLOG_*` environment variables and validate.
pub fn load_config(path: &Path) -> Result<SynchrologConfig, ConfigError> {
    load_config_with(path, |key| std::env::var(key).ok())
}

fn load_config_with<F>(path: &Path, lookup: F) -> Result<SynchrologConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let content = fs::read_to_string(path)?;
    let mut config: SynchrologConfig = toml::from_str(&content)?;
    config.apply_overrides(lookup);

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load configuration from the environment only and validate it.
pub fn load_from_env() -> Result<SynchrologConfig, ConfigError> {
    let config = SynchrologConfig::from_env();
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

//! Configuration validation.
//!
//! # Responsibilities
//! - Require an access token (absence is a fatal startup error)
//! - Check that the minimum level names a real `tracing` level
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: SynchrologConfig → Result<(), Vec<ValidationError>>

use thiserror::Error;
use tracing_subscriber::filter::LevelFilter;

use crate::config::schema::SynchrologConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// No access token, or only whitespace.
    #[error("access token is required (set `access_token` or SYNCHROLOG_API_KEY)")]
    MissingAccessToken,

    /// The level is not one of trace, debug, info, warn, error, off.
    #[error("unknown log level '{0}'")]
    InvalidLevel(String),
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &SynchrologConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.token().is_none() {
        errors.push(ValidationError::MissingAccessToken);
    }

    if let Some(level) = config.level.as_deref() {
        if level.trim().parse::<LevelFilter>().is_err() {
            errors.push(ValidationError::InvalidLevel(level.to_string()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

//! Configuration schema definitions.
//!
//! The host application supplies these settings either through a TOML file
//! or through `SYNCHROLOG_*` environment variables.

use serde::{Deserialize, Serialize};
use tracing_subscriber::filter::LevelFilter;

/// Environment variable holding the Synchrolog access token.
pub const ENV_ACCESS_TOKEN: &str = "SYNCHROLOG_API_KEY";

/// Environment variable toggling the background delivery queue.
pub const ENV_USE_QUEUE: &str = "SYNCHROLOG_USE_QUEUE";

/// Environment variable holding the minimum captured level.
pub const ENV_LEVEL: &str = "SYNCHROLOG_LOG_LEVEL";

/// Root configuration for the synchrolog hook.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct SynchrologConfig {
    /// Access token sent as `Authorization: Basic <token>`. Required.
    pub access_token: Option<String>,

    /// Deliver through the background queue instead of on the logging thread.
    pub use_queue: bool,

    /// Minimum level captured (trace, debug, info, warn, error).
    /// `None` captures everything the host subscriber lets through.
    pub level: Option<String>,
}

impl Default for SynchrologConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            use_queue: true,
            level: None,
        }
    }
}

impl SynchrologConfig {
    /// Configuration with the given token and every other field defaulted.
    pub fn with_access_token(token: impl Into<String>) -> Self {
        Self {
            access_token: Some(token.into()),
            ..Self::default()
        }
    }

    /// Build a configuration from `SYNCHROLOG_*` environment variables only.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Overlay values returned by `lookup` for the `SYNCHROLOG_*` keys.
    /// An unparseable queue flag is logged and leaves `use_queue` untouched.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup(ENV_ACCESS_TOKEN) {
            self.access_token = Some(token);
        }
        if let Some(flag) = lookup(ENV_USE_QUEUE) {
            match parse_flag(&flag) {
                Some(value) => self.use_queue = value,
                None => tracing::warn!(
                    variable = ENV_USE_QUEUE,
                    value = %flag,
                    "Ignoring unrecognised boolean"
                ),
            }
        }
        if let Some(level) = lookup(ENV_LEVEL) {
            self.level = Some(level);
        }
    }

    /// The token, if one is set and not blank.
    pub fn token(&self) -> Option<&str> {
        self.access_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }

    /// The configured minimum level; `TRACE` (everything) when unset or unparseable.
    pub fn max_level(&self) -> LevelFilter {
        self.level
            .as_deref()
            .and_then(|level| level.trim().parse().ok())
            .unwrap_or(LevelFilter::TRACE)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

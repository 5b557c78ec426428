//! Top-level error type.

use thiserror::Error;

use crate::config::ConfigError;
use crate::delivery::TransportError;

/// Errors raised while constructing a [`crate::Synchrolog`] instance.
/// Nothing on the request or delivery path returns this.
#[derive(Debug, Error)]
pub enum SynchrologError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to build HTTP transport: {0}")]
    Transport(#[from] TransportError),

    #[error("failed to start delivery worker: {0}")]
    Worker(#[source] std::io::Error),
}

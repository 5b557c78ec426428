//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the host's `tracing` subscriber with the synchrolog capture layer
//! - Honour `RUST_LOG`, falling back to caller-provided directives
//!
//! # Design Decisions
//! - The `EnvFilter` sits in front of every layer: synchrolog sees exactly what
//!   the host lets through, narrowed further by the configured level

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::http::Synchrolog;

/// Install a global subscriber: env filter, human-readable stdout and synchrolog capture.
pub fn init_tracing(synchrolog: &Synchrolog, default_directives: &str) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_directives)),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(synchrolog.capture_layer())
        .try_init()
}

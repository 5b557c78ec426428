//! Synchrolog request telemetry for axum services.
//!
//! Log records emitted while an HTTP request is in flight are enriched with
//! the visitor's identity and forwarded to Synchrolog.

pub mod config;
pub mod context;
pub mod delivery;
pub mod error;
pub mod events;
pub mod http;
pub mod observability;
pub mod record;

pub use config::schema::SynchrologConfig;
pub use error::SynchrologError;
pub use http::{Synchrolog, SynchrologBuilder};
pub use observability::{init_tracing, CaptureLayer};

//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! synchrolog.toml (optional)
//!     → loader.rs (parse & deserialize)
//!     → environment overrides (SYNCHROLOG_*)
//!     → validation.rs (semantic checks)
//!     → SynchrologConfig (validated, immutable)
//!     → owned by the Synchrolog hook
//! ```
//!
//! # Design Decisions
//! - Config is immutable once the hook is built
//! - All fields have defaults so an env-only setup needs nothing but the token
//! - Validation separates syntactic (serde) from semantic checks
//! - A missing access token is fatal: the hook refuses to build

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::SynchrologConfig;
pub use validation::{validate_config, ValidationError};

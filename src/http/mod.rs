//! HTTP integration subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request
//!     → middleware.rs (diagnostic short-circuit or bind context)
//!     → host router and handlers (log through `tracing`)
//!     → middleware.rs (response summary, cookie write-back, clear context)
//!     → Send to client
//! ```

pub mod diagnostic;
pub mod hook;
pub mod middleware;

pub use hook::{Synchrolog, SynchrologBuilder};
pub use middleware::{synchrolog_middleware, ResponseLogged};

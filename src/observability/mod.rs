//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! tracing macros in host code
//!     → capture.rs (CaptureLayer: LogRecord + pipeline + submit)
//!     → logging.rs (subscriber wiring)
//!
//! Delivery and capture report through:
//!     → metrics.rs (counters, gauges)
//! ```

pub mod capture;
pub mod logging;
pub mod metrics;

pub use capture::CaptureLayer;
pub use logging::init_tracing;

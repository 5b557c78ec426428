//! Outbound Synchrolog events.
//!
//! # Data Flow
//! ```text
//! LogRecord + RequestContext
//!     → enricher.rs (identity, branch on level / exception)
//!     → traceback.rs (frame selection, source snippet) for error events
//!     → envelope.rs (endpoint + JSON body)
//! ```
//!
//! # Design Decisions
//! - Endpoints are fixed; only the token is configurable
//! - Wire field names follow the Synchrolog ingestion API
//! - Missing error details degrade to empty strings instead of aborting

pub mod enricher;
pub mod envelope;
pub mod traceback;

pub use enricher::Enricher;
pub use envelope::{Endpoint, Envelope, ErrorEvent, Event, EventBody, LogEvent};

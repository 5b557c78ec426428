//! Envelope and payload types.

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

/// Value of the `source` field for every event sent from this crate.
pub const EVENT_SOURCE: &str = "backend";

/// Remote ingestion endpoint an envelope is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// `track-backend`, for log events.
    TrackBackend,
    /// `track-backend-error`, for error events.
    TrackBackendError,
}

impl Endpoint {
    pub const fn url(self) -> &'static str {
        match self {
            Endpoint::TrackBackend => "https://input.synchrolog.com/v1/track-backend",
            Endpoint::TrackBackendError => "https://input.synchrolog.com/v1/track-backend-error",
        }
    }
}

/// Fully assembled outbound payload: where to send it and what to send.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub endpoint: Endpoint,
    pub body: EventBody,
}

impl Envelope {
    pub fn url(&self) -> &'static str {
        self.endpoint.url()
    }

    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(&self.body)
    }
}

/// JSON body posted to the endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventBody {
    pub timestamp: String,
    pub anonymous_id: String,
    pub user_id: Option<String>,
    pub source: String,
    #[serde(flatten)]
    pub event: Event,
}

/// Event payload; serialized with its `event_type` tag alongside the identity fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event_type", rename_all = "lowercase")]
pub enum Event {
    Log { log: LogEvent },
    Error { error: ErrorEvent },
}

impl Event {
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::Log { .. } => "log",
            Event::Error { .. } => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEvent {
    pub timestamp: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorEvent {
    pub status: String,
    pub description: String,
    pub backtrace: String,
    pub ip_address: String,
    pub user_agent: Option<String>,
    pub file_name: String,
    pub line_number: String,
    #[serde(rename = "file")]
    pub source_snippet: String,
}

/// Current UTC time as `YYYY-MM-DDTHH:MM:SS.sssZ`.
pub fn utc_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

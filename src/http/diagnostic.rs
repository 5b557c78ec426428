//! Diagnostic time endpoint.
//!
//! Any path containing `synchrolog-time` answers with the server's local time so
//! the Synchrolog dashboard can check clock skew. Nothing else runs for it.

use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Local;
use serde::Serialize;

pub const DIAGNOSTIC_PATH_MARKER: &str = "synchrolog-time";

#[derive(Debug, Serialize)]
pub struct ServerTime {
    pub time: String,
}

impl ServerTime {
    pub fn now() -> Self {
        Self {
            time: Local::now()
                .naive_local()
                .format("%Y-%m-%dT%H:%M:%S%.6f")
                .to_string(),
        }
    }
}

pub fn is_diagnostic_path(path: &str) -> bool {
    path.contains(DIAGNOSTIC_PATH_MARKER)
}

pub fn server_time() -> Response {
    Json(ServerTime::now()).into_response()
}

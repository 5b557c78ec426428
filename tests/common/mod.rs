//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request};
use axum::Router;
use reqwest::header::{HeaderMap, AUTHORIZATION};
use synchrolog::delivery::{Transport, TransportError};
use synchrolog::{Synchrolog, SynchrologConfig};
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub const TRACK_BACKEND: &str = "https://input.synchrolog.com/v1/track-backend";
pub const TRACK_BACKEND_ERROR: &str = "https://input.synchrolog.com/v1/track-backend-error";

/// One POST seen by [`RecordingTransport`].
#[derive(Debug, Clone)]
pub struct Post {
    pub url: String,
    pub authorization: Option<String>,
    pub body: serde_json::Value,
}

impl Post {
    pub fn message(&self) -> Option<&str> {
        self.body["log"]["message"].as_str()
    }
}

/// Transport that records every POST and answers with a fixed status.
pub struct RecordingTransport {
    status: u16,
    posts: Mutex<Vec<Post>>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Self::with_status(200)
    }

    pub fn with_status(status: u16) -> Arc<Self> {
        Arc::new(Self {
            status,
            posts: Mutex::new(Vec::new()),
        })
    }

    pub fn posts(&self) -> Vec<Post> {
        self.posts.lock().unwrap().clone()
    }

    /// Posts carrying a log event with exactly this message.
    pub fn logs_with_message(&self, message: &str) -> Vec<Post> {
        self.posts()
            .into_iter()
            .filter(|post| post.message() == Some(message))
            .collect()
    }

    pub fn errors(&self) -> Vec<Post> {
        self.posts()
            .into_iter()
            .filter(|post| post.url == TRACK_BACKEND_ERROR)
            .collect()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn post_json(
        &self,
        url: &str,
        headers: HeaderMap,
        body: &serde_json::Value,
    ) -> Result<u16, TransportError> {
        self.posts.lock().unwrap().push(Post {
            url: url.to_string(),
            authorization: headers
                .get(AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string),
            body: body.clone(),
        });
        Ok(self.status)
    }
}

/// Transport whose every POST fails before reaching the network.
pub struct FailingTransport;

#[async_trait]
impl Transport for FailingTransport {
    async fn post_json(
        &self,
        _url: &str,
        _headers: HeaderMap,
        _body: &serde_json::Value,
    ) -> Result<u16, TransportError> {
        Err(TransportError::Unavailable("connection refused".into()))
    }
}

pub fn synchrolog(transport: Arc<dyn Transport>) -> Synchrolog {
    Synchrolog::builder(SynchrologConfig::with_access_token("123"))
        .transport(transport)
        .build()
        .unwrap()
}

/// Install the capture layer as this thread's default subscriber.
pub fn capture(synchrolog: &Synchrolog) -> DefaultGuard {
    tracing_subscriber::registry()
        .with(synchrolog.capture_layer())
        .set_default()
}

pub fn app(synchrolog: &Synchrolog, routes: Router) -> Router {
    synchrolog.attach(routes)
}

pub fn get(path: &str) -> Request<Body> {
    Request::get(path).body(Body::empty()).unwrap()
}

pub fn get_with_cookies(path: &str, cookies: &str) -> Request<Body> {
    Request::get(path)
        .header(header::COOKIE, cookies)
        .body(Body::empty())
        .unwrap()
}

/// Value of the `synchrolog_anonymous_id` cookie set by a response, if any.
pub fn set_anonymous_id(response: &axum::response::Response) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|cookie| cookie.strip_prefix("synchrolog_anonymous_id="))
        .and_then(|rest| rest.split(';').next())
        .map(str::to_string)
}

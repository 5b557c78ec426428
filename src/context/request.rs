//! Snapshot of the in-flight HTTP request.
//!
//! # Responsibilities
//! - Capture cookies, headers and the peer address once at request entry
//! - Resolve visitor identity (anonymous id, user id)
//! - Remember an anonymous id generated mid-request for cookie write-back

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Mutex, PoisonError};

use axum::extract::ConnectInfo;
use axum::http::{header, HeaderMap, Request};
use uuid::Uuid;

/// Cookie carrying the anonymous visitor id.
pub const ANONYMOUS_ID_COOKIE: &str = "synchrolog_anonymous_id";

/// Cookie carrying the application-supplied user id.
pub const USER_ID_COOKIE: &str = "synchrolog_user_id";

/// Cookie-map key under which a freshly generated anonymous id is kept.
pub const ANONYMOUS_ID_RAW_KEY: &str = "synchrolog_anonymous_id_raw";

/// Headers consulted for the client address, in order.
const FORWARDED_FOR_HEADERS: [&str; 2] = ["x-forwarded-for", "http_x-forwarded-for"];

/// Request data visible to log enrichment.
#[derive(Debug, Default)]
pub struct RequestContext {
    method: String,
    path: String,
    cookies: Mutex<HashMap<String, String>>,
    headers: HashMap<String, String>,
    remote_addr: Option<String>,
}

impl RequestContext {
    /// Start building a context by hand (tests, non-axum hosts).
    pub fn builder() -> RequestContextBuilder {
        RequestContextBuilder::default()
    }

    /// Snapshot an axum request.
    ///
    /// The peer address comes from `ConnectInfo<SocketAddr>`, which is only
    /// present when the router is served with `into_make_service_with_connect_info`.
    pub fn from_request<B>(request: &Request<B>) -> Self {
        let remote_addr = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        Self {
            method: request.method().to_string(),
            path: request.uri().path().to_string(),
            cookies: Mutex::new(parse_cookies(request.headers())),
            headers: collect_headers(request.headers()),
            remote_addr,
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Value of a cookie (or of the raw generated-id key).
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.cookies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Value of a request header; names are case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// The anonymous visitor id for this request.
    ///
    /// Returns the client's cookie when present. Otherwise a UUID-v4 is
    /// generated on first use and stored under [`ANONYMOUS_ID_RAW_KEY`], so every
    /// record of the request shares it and the hook can write it back.
    pub fn anonymous_id(&self) -> String {
        let mut cookies = self.cookies.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(sent) = cookies.get(ANONYMOUS_ID_COOKIE) {
            return sent.clone();
        }
        cookies
            .entry(ANONYMOUS_ID_RAW_KEY.to_string())
            .or_insert_with(|| Uuid::new_v4().to_string())
            .clone()
    }

    /// The id generated during this request, if one was needed.
    pub fn generated_anonymous_id(&self) -> Option<String> {
        self.cookie(ANONYMOUS_ID_RAW_KEY)
    }

    /// Application user id from the `synchrolog_user_id` cookie.
    pub fn user_id(&self) -> Option<String> {
        self.cookie(USER_ID_COOKIE)
    }

    /// Best-effort client address: forwarded headers first, then the peer address.
    pub fn client_ip(&self) -> String {
        FORWARDED_FOR_HEADERS
            .iter()
            .filter_map(|name| self.header(name))
            .map(str::trim)
            .find(|value| !value.is_empty())
            .map(str::to_string)
            .or_else(|| self.remote_addr.clone())
            .unwrap_or_default()
    }

    pub fn user_agent(&self) -> Option<String> {
        self.header(header::USER_AGENT.as_str()).map(str::to_string)
    }
}

/// Manual construction of a [`RequestContext`].
#[derive(Debug, Default)]
pub struct RequestContextBuilder {
    method: String,
    path: String,
    cookies: HashMap<String, String>,
    headers: HashMap<String, String>,
    remote_addr: Option<String>,
}

impl RequestContextBuilder {
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn remote_addr(mut self, addr: impl Into<String>) -> Self {
        self.remote_addr = Some(addr.into());
        self
    }

    pub fn build(self) -> RequestContext {
        RequestContext {
            method: self.method,
            path: self.path,
            cookies: Mutex::new(self.cookies),
            headers: self.headers,
            remote_addr: self.remote_addr,
        }
    }
}

/// Parse every `Cookie` header into a name → value map. Later duplicates win.
pub(crate) fn parse_cookies(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            let value = value.trim().trim_matches('"');
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}

fn collect_headers(headers: &HeaderMap) -> HashMap<String, String> {
    let mut collected: HashMap<String, String> = HashMap::new();
    for (name, value) in headers {
        let Ok(value) = value.to_str() else {
            continue;
        };
        collected
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
    collected
}

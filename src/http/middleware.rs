//! Request lifecycle middleware.
//!
//! # Responsibilities
//! - Answer the diagnostic time path before anything else runs
//! - Bind the request context for the duration of the inner service
//! - Log a summary of each response once
//! - Write a freshly generated anonymous id back as a cookie
//! - Clear the context on every exit path (guard drop covers panics and cancellation)

use std::sync::Arc;

use axum::extract::Request;
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::Response;

use crate::context::{self, RequestContext, ANONYMOUS_ID_COOKIE};
use crate::http::diagnostic;

/// Target of the response summary events.
pub const RESPONSE_TARGET: &str = "synchrolog::response";

/// Lifetime of the anonymous id cookie: two years.
pub const ANONYMOUS_ID_MAX_AGE_SECS: u64 = 2 * 365 * 24 * 60 * 60;

/// Response extension marking a response whose summary was already logged.
#[derive(Debug, Clone, Copy)]
pub struct ResponseLogged;

pub async fn synchrolog_middleware(request: Request, next: Next) -> Response {
    if diagnostic::is_diagnostic_path(request.uri().path()) {
        return diagnostic::server_time();
    }

    let context = Arc::new(RequestContext::from_request(&request));
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    context::scope(async move {
        let _bound = context::bind(Arc::clone(&context));

        let mut response = next.run(request).await;
        log_response(&method, &path, &mut response);
        write_back_anonymous_id(&context, &mut response);
        response
    })
    .await
}

/// Emit the severity-tiered summary unless this response was already logged.
fn log_response(method: &Method, path: &str, response: &mut Response) {
    if response.extensions().get::<ResponseLogged>().is_some() {
        return;
    }
    let status = response.status();
    log_status(method, path, status);
    response.extensions_mut().insert(ResponseLogged);
}

fn log_status(method: &Method, path: &str, status: StatusCode) {
    let code = status.as_u16();
    if status.is_server_error() {
        tracing::error!(target: RESPONSE_TARGET, code, "{method} {path} {code}");
    } else if status.is_client_error() {
        tracing::warn!(target: RESPONSE_TARGET, code, "{method} {path} {code}");
    } else {
        tracing::info!(target: RESPONSE_TARGET, code, "{method} {path} {code}");
    }
}

/// Append `Set-Cookie` for an id generated during this request, unless the
/// client already sent that same value.
fn write_back_anonymous_id(context: &RequestContext, response: &mut Response) {
    let Some(generated) = context.generated_anonymous_id() else {
        return;
    };
    if context.cookie(ANONYMOUS_ID_COOKIE).as_deref() == Some(generated.as_str()) {
        return;
    }
    let cookie = format!(
        "{ANONYMOUS_ID_COOKIE}={generated}; Path=/; Max-Age={ANONYMOUS_ID_MAX_AGE_SECS}"
    );
    match HeaderValue::from_str(&cookie) {
        Ok(cookie) => {
            response.headers_mut().append(SET_COOKIE, cookie);
        }
        Err(e) => {
            tracing::warn!(error = %e, "Generated anonymous id is not a valid cookie value")
        }
    }
}

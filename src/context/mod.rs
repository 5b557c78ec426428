//! Request-scoped context subsystem.
//!
//! # Data Flow
//! ```text
//! Request enters the hook
//!     → request.rs (snapshot cookies, headers, peer address)
//!     → store.rs (bind to the current task)
//!     → handler code logs through `tracing`
//!     → enricher reads store.rs (identity, client ip, user agent)
//! Request leaves the hook
//!     → guard drop clears store.rs
//! ```
//!
//! # Design Decisions
//! - Task-local storage first, thread-local fallback for code outside a scope
//! - Context is an immutable snapshot except for the generated anonymous id
//! - Clearing is unconditional (guard drop), so pooled workers never leak a binding

pub mod request;
pub mod store;

pub use request::{
    RequestContext, ANONYMOUS_ID_COOKIE, ANONYMOUS_ID_RAW_KEY, USER_ID_COOKIE,
};
pub use store::{bind, clear, get, scope, set, ContextGuard};

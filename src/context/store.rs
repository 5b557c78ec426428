//! Per-execution-unit storage for the in-flight request.
//!
//! Inside [`scope`] the slot belongs to the tokio task driving the future; a
//! request handled on another task never sees it. Outside any scope the slot
//! falls back to the calling thread.

use std::cell::RefCell;
use std::future::Future;
use std::sync::Arc;

use crate::context::request::RequestContext;

type Slot = RefCell<Option<Arc<RequestContext>>>;

tokio::task_local! {
    static TASK_REQUEST: Slot;
}

thread_local! {
    static THREAD_REQUEST: Slot = const { RefCell::new(None) };
}

fn with_slot<R>(f: impl Fn(&Slot) -> R) -> R {
    match TASK_REQUEST.try_with(|slot| f(slot)) {
        Ok(result) => result,
        Err(_) => THREAD_REQUEST.with(|slot| f(slot)),
    }
}

/// Run `fut` with a fresh, empty request slot owned by the current task.
pub async fn scope<F>(fut: F) -> F::Output
where
    F: Future,
{
    TASK_REQUEST.scope(RefCell::new(None), fut).await
}

/// Bind `context` to the current execution unit, replacing any prior binding.
pub fn set(context: Arc<RequestContext>) {
    with_slot(|slot| {
        slot.replace(Some(Arc::clone(&context)));
    });
}

/// The context bound to the current execution unit, if any.
pub fn get() -> Option<Arc<RequestContext>> {
    with_slot(|slot| slot.borrow().clone())
}

/// Remove the current binding. Safe to call when nothing is bound.
pub fn clear() {
    with_slot(|slot| {
        slot.replace(None);
    });
}

/// Bind `context` and return a guard that clears the binding when dropped.
#[must_use = "the context is cleared as soon as the guard is dropped"]
pub fn bind(context: Arc<RequestContext>) -> ContextGuard {
    set(context);
    ContextGuard { _private: () }
}

/// Clears the current request binding on drop, including during unwinding.
#[derive(Debug)]
pub struct ContextGuard {
    _private: (),
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        clear();
    }
}

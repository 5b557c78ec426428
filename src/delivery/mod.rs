//! Envelope delivery.
//!
//! # Data Flow
//! ```text
//! capture layer
//!     → Delivery::submit(envelope)
//!         → queued: queue.rs (unbounded FIFO) → worker thread → sink.rs
//!         → direct: sink.rs on the calling thread
//!     → transport.rs (one POST, Authorization: Basic <token>)
//! ```
//!
//! # Design Decisions
//! - At most one attempt per envelope, no retries
//! - Diagnostics use the `synchrolog::delivery` target so they are never captured
//! - A thread-local flag marks threads that are delivering, so log calls made
//!   underneath a send cannot enqueue further events

pub mod queue;
pub mod sink;
pub mod transport;

use std::cell::Cell;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::Notify;

use crate::events::Envelope;
use crate::observability::metrics;

pub use queue::DeliveryQueue;
pub use sink::{DeliveryOutcome, RemoteSink};
pub use transport::{ReqwestTransport, Transport, TransportError};

thread_local! {
    static DELIVERING: Cell<bool> = const { Cell::new(false) };
}

/// True while the current thread is performing a delivery.
pub fn is_delivering() -> bool {
    DELIVERING.with(Cell::get)
}

fn mark_delivery_thread() {
    DELIVERING.with(|flag| flag.set(true));
}

struct DeliveringGuard {
    previous: bool,
}

impl DeliveringGuard {
    fn enter() -> Self {
        Self {
            previous: DELIVERING.with(|flag| flag.replace(true)),
        }
    }
}

impl Drop for DeliveringGuard {
    fn drop(&mut self) {
        DELIVERING.with(|flag| flag.set(self.previous));
    }
}

/// How envelopes reach the sink.
#[derive(Debug)]
pub enum Delivery {
    Direct(DirectDelivery),
    Queued(DeliveryQueue),
}

impl Delivery {
    pub fn start(sink: RemoteSink, use_queue: bool) -> io::Result<Self> {
        let sink = Arc::new(sink);
        if use_queue {
            Ok(Delivery::Queued(DeliveryQueue::start(sink)?))
        } else {
            Ok(Delivery::Direct(DirectDelivery::new(sink)))
        }
    }

    pub fn is_queued(&self) -> bool {
        matches!(self, Delivery::Queued(_))
    }

    /// Hand an envelope over for delivery. Never blocks on the network in queued mode.
    pub fn submit(&self, envelope: Envelope) {
        match self {
            Delivery::Queued(queue) => {
                if queue.push(envelope) {
                    metrics::record_enqueued("queued");
                } else {
                    tracing::debug!("Delivery queue closed, dropping event");
                }
            }
            Delivery::Direct(direct) => {
                metrics::record_enqueued("direct");
                direct.deliver(envelope);
            }
        }
    }

    /// Wait for everything submitted so far to be attempted.
    pub async fn flush(&self) {
        match self {
            Delivery::Queued(queue) => queue.flush().await,
            Delivery::Direct(direct) => direct.flush().await,
        }
    }

    /// Flush and stop the worker, if any.
    pub async fn shutdown(&self) {
        match self {
            Delivery::Queued(queue) => queue.close().await,
            Delivery::Direct(direct) => direct.flush().await,
        }
    }
}

/// Delivery on the thread that produced the record.
pub struct DirectDelivery {
    sink: Arc<RemoteSink>,
    in_flight: Arc<InFlight>,
}

#[derive(Default)]
struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

impl InFlight {
    fn finish(&self) {
        if self.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }
}

impl DirectDelivery {
    pub fn new(sink: Arc<RemoteSink>) -> Self {
        Self {
            sink,
            in_flight: Arc::new(InFlight::default()),
        }
    }

    /// Deliver without an intermediate queue.
    ///
    /// A multi-thread runtime worker blocks in place; a current-thread runtime
    /// cannot block, so the send is spawned onto it; outside any runtime a
    /// throwaway runtime drives the send.
    pub fn deliver(&self, envelope: Envelope) {
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                let _delivering = DeliveringGuard::enter();
                tokio::task::block_in_place(|| handle.block_on(self.sink.deliver(&envelope)));
            }
            Ok(handle) => {
                let sink = Arc::clone(&self.sink);
                let in_flight = Arc::clone(&self.in_flight);
                in_flight.count.fetch_add(1, Ordering::AcqRel);
                handle.spawn(async move {
                    sink.deliver(&envelope).await;
                    in_flight.finish();
                });
            }
            Err(_) => {
                let _delivering = DeliveringGuard::enter();
                match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => {
                        runtime.block_on(self.sink.deliver(&envelope));
                    }
                    Err(e) => tracing::warn!(error = %e, "Could not start a runtime for delivery"),
                }
            }
        }
    }

    /// Wait for sends spawned onto a current-thread runtime.
    pub async fn flush(&self) {
        loop {
            let idle = self.in_flight.idle.notified();
            if self.in_flight.count.load(Ordering::Acquire) == 0 {
                return;
            }
            idle.await;
        }
    }
}

impl std::fmt::Debug for DirectDelivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectDelivery")
            .field("in_flight", &self.in_flight.count.load(Ordering::Relaxed))
            .finish()
    }
}

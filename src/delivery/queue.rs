//! Background delivery queue.
//!
//! # Responsibilities
//! - Accept envelopes from any thread without blocking
//! - Forward them to the sink one at a time, in submission order
//! - Drain on close
//!
//! # Design Decisions
//! - Unbounded channel: capture never waits on the network
//! - A dedicated OS thread owns a current-thread runtime, so a hung POST
//!   only stalls the worker
//! - Flush markers travel through the same channel as envelopes
//! - Only the worker publishes the depth gauge, so the last value written
//!   is the depth after the last envelope it picked up

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{mpsc, oneshot};

use crate::delivery::sink::RemoteSink;
use crate::events::Envelope;
use crate::observability::metrics;

const WORKER_THREAD_NAME: &str = "synchrolog-delivery";

enum Job {
    Deliver(Envelope),
    Flush(oneshot::Sender<()>),
}

pub struct DeliveryQueue {
    jobs: Mutex<Option<mpsc::UnboundedSender<Job>>>,
    stopped: Mutex<Option<oneshot::Receiver<()>>>,
    depth: Arc<AtomicUsize>,
}

impl DeliveryQueue {
    /// Spawn the worker thread.
    pub fn start(sink: Arc<RemoteSink>) -> io::Result<Self> {
        let (jobs_tx, jobs_rx) = mpsc::unbounded_channel();
        let (stopped_tx, stopped_rx) = oneshot::channel();
        let depth = Arc::new(AtomicUsize::new(0));

        let worker_depth = Arc::clone(&depth);
        std::thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || {
                super::mark_delivery_thread();
                match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime.block_on(drain(jobs_rx, sink, worker_depth)),
                    Err(e) => {
                        tracing::error!(error = %e, "Delivery worker could not start a runtime")
                    }
                }
                let _ = stopped_tx.send(());
            })?;

        tracing::debug!(thread = WORKER_THREAD_NAME, "Delivery worker started");

        Ok(Self {
            jobs: Mutex::new(Some(jobs_tx)),
            stopped: Mutex::new(Some(stopped_rx)),
            depth,
        })
    }

    /// Enqueue an envelope. Returns `false` once the queue is closed.
    pub fn push(&self, envelope: Envelope) -> bool {
        let jobs = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(jobs) = jobs.as_ref() else {
            return false;
        };
        self.depth.fetch_add(1, Ordering::AcqRel);
        if jobs.send(Job::Deliver(envelope)).is_err() {
            self.depth.fetch_sub(1, Ordering::AcqRel);
            return false;
        }
        true
    }

    /// Number of envelopes not yet picked up by the worker.
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::Acquire)
    }

    pub fn is_closed(&self) -> bool {
        self.jobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Wait until everything pushed before this call has been attempted.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        let sent = {
            let jobs = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);
            match jobs.as_ref() {
                Some(jobs) => jobs.send(Job::Flush(done_tx)).is_ok(),
                None => false,
            }
        };
        if sent {
            let _ = done_rx.await;
        }
    }

    /// Stop accepting envelopes, drain what is queued and wait for the worker to exit.
    /// Safe to call more than once.
    pub async fn close(&self) {
        drop(self.jobs.lock().unwrap_or_else(PoisonError::into_inner).take());
        let stopped = self
            .stopped
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(stopped) = stopped {
            let _ = stopped.await;
            tracing::debug!(thread = WORKER_THREAD_NAME, "Delivery worker stopped");
        }
    }
}

impl std::fmt::Debug for DeliveryQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryQueue")
            .field("depth", &self.depth())
            .field("closed", &self.is_closed())
            .finish()
    }
}

async fn drain(
    mut jobs: mpsc::UnboundedReceiver<Job>,
    sink: Arc<RemoteSink>,
    depth: Arc<AtomicUsize>,
) {
    while let Some(job) = jobs.recv().await {
        match job {
            Job::Deliver(envelope) => {
                let remaining = depth.fetch_sub(1, Ordering::AcqRel).saturating_sub(1);
                metrics::record_queue_depth(remaining);
                sink.deliver(&envelope).await;
            }
            Job::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}

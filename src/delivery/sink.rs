//! Remote sink: one best-effort POST per envelope.
//!
//! # Design Decisions
//! - Never fails; outcomes are returned and reported, not raised
//! - Failures are reported on the `synchrolog::delivery` target, which the
//!   capture layer ignores, so a broken endpoint cannot feed itself

use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};

use crate::delivery::transport::Transport;
use crate::events::Envelope;
use crate::observability::metrics;
use crate::record::LogRecord;

/// Result of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Nothing to send (record was not enriched).
    Skipped,
    /// Endpoint answered 2xx.
    Delivered(u16),
    /// Endpoint answered with a non-2xx status.
    Rejected(u16),
    /// Transport or encoding failure.
    Failed(String),
}

impl DeliveryOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            DeliveryOutcome::Skipped => "skipped",
            DeliveryOutcome::Delivered(_) => "delivered",
            DeliveryOutcome::Rejected(_) => "rejected",
            DeliveryOutcome::Failed(_) => "failed",
        }
    }
}

pub struct RemoteSink {
    transport: Arc<dyn Transport>,
    authorization: String,
}

impl RemoteSink {
    pub fn new(transport: Arc<dyn Transport>, access_token: &str) -> Self {
        Self {
            transport,
            authorization: format!("Basic {access_token}"),
        }
    }

    /// Deliver the envelope attached to `record`, if any.
    pub async fn deliver_record(&self, record: &LogRecord) -> DeliveryOutcome {
        match record.envelope.as_ref() {
            Some(envelope) => self.deliver(envelope).await,
            None => DeliveryOutcome::Skipped,
        }
    }

    pub async fn deliver(&self, envelope: &Envelope) -> DeliveryOutcome {
        let outcome = self.attempt(envelope).await;
        match &outcome {
            DeliveryOutcome::Rejected(status) => tracing::warn!(
                url = envelope.url(),
                status = *status,
                "Synchrolog endpoint rejected event"
            ),
            DeliveryOutcome::Failed(error) => tracing::warn!(
                url = envelope.url(),
                error = %error,
                "Synchrolog delivery failed"
            ),
            DeliveryOutcome::Delivered(status) => tracing::trace!(
                url = envelope.url(),
                status = *status,
                "Synchrolog event delivered"
            ),
            DeliveryOutcome::Skipped => {}
        }
        metrics::record_delivery(&outcome);
        outcome
    }

    async fn attempt(&self, envelope: &Envelope) -> DeliveryOutcome {
        let body = match envelope.to_json() {
            Ok(body) => body,
            Err(e) => return DeliveryOutcome::Failed(format!("encoding: {e}")),
        };
        let mut headers = HeaderMap::new();
        match HeaderValue::from_str(&self.authorization) {
            Ok(value) => {
                headers.insert(AUTHORIZATION, value);
            }
            Err(e) => return DeliveryOutcome::Failed(format!("authorization header: {e}")),
        }

        match self.transport.post_json(envelope.url(), headers, &body).await {
            Ok(status) if (200..300).contains(&status) => DeliveryOutcome::Delivered(status),
            Ok(status) => DeliveryOutcome::Rejected(status),
            Err(e) => DeliveryOutcome::Failed(e.to_string()),
        }
    }
}

impl std::fmt::Debug for RemoteSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteSink").finish_non_exhaustive()
    }
}

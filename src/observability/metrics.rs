//! Metrics collection and exposition.
//!
//! # Metrics
//! - `synchrolog_records_captured_total` (counter): records seen by the capture layer, by level
//! - `synchrolog_events_enqueued_total` (counter): envelopes handed to delivery, by mode
//! - `synchrolog_deliveries_total` (counter): delivery attempts, by outcome
//! - `synchrolog_queue_depth` (gauge): envelopes waiting for the worker
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; nothing is exported unless the host installs a recorder
//! - Prometheus exposition is opt-in via [`init_metrics`]

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::Level;

use crate::delivery::DeliveryOutcome;

/// Install the Prometheus recorder with an HTTP scrape listener.
/// Must be called from within a tokio runtime.
pub fn init_metrics(address: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(address).install() {
        Ok(()) => tracing::info!(address = %address, "Metrics exporter listening"),
        Err(e) => {
            tracing::error!(address = %address, error = %e, "Failed to install metrics exporter")
        }
    }
}

pub fn record_captured(level: &Level) {
    metrics::counter!("synchrolog_records_captured_total", "level" => level.as_str()).increment(1);
}

pub fn record_enqueued(mode: &'static str) {
    metrics::counter!("synchrolog_events_enqueued_total", "mode" => mode).increment(1);
}

pub fn record_delivery(outcome: &DeliveryOutcome) {
    metrics::counter!("synchrolog_deliveries_total", "outcome" => outcome.label()).increment(1);
}

pub fn record_queue_depth(depth: usize) {
    metrics::gauge!("synchrolog_queue_depth").set(depth as f64);
}

//! `tracing` layer that turns events into synchrolog records.
//!
//! # Recognised fields
//! - `message`: the rendered log message
//! - `exc_info = true`: attach a backtrace captured at the log call
//! - `error = &err as &dyn Error`: attach the error chain and a backtrace
//! - `code`: conventional HTTP status reported instead of 500
//!
//! The stack is only captured while a request is bound; records logged
//! outside a request are never delivered.

use std::fmt;
use std::sync::Arc;

use tracing::field::{Field, Visit};
use tracing::{Event, Metadata, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::{Context, Layer};

use crate::context;
use crate::delivery::{self, Delivery};
use crate::events::Envelope;
use crate::observability::metrics;
use crate::record::{render_error_chain, ExceptionInfo, LogRecord, RecordPipeline};

/// Targets owned by the delivery path. Never captured.
pub const INTERNAL_TARGET_PREFIX: &str = "synchrolog::delivery";

pub struct CaptureLayer {
    pipeline: Arc<RecordPipeline>,
    delivery: Arc<Delivery>,
    max_level: LevelFilter,
}

impl CaptureLayer {
    pub fn new(
        pipeline: Arc<RecordPipeline>,
        delivery: Arc<Delivery>,
        max_level: LevelFilter,
    ) -> Self {
        Self {
            pipeline,
            delivery,
            max_level,
        }
    }

    fn accepts(&self, metadata: &Metadata<'_>) -> bool {
        *metadata.level() <= self.max_level
            && !metadata.target().starts_with(INTERNAL_TARGET_PREFIX)
            && !delivery::is_delivering()
    }

    /// Run the decorator pipeline and detach the resulting envelope, if any.
    pub fn process(&self, mut record: LogRecord) -> Option<Envelope> {
        self.pipeline.run(&mut record);
        record.envelope.take()
    }
}

impl<S> Layer<S> for CaptureLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if !self.accepts(metadata) {
            return;
        }

        let mut visitor = RecordVisitor::default();
        event.record(&mut visitor);
        metrics::record_captured(metadata.level());

        let request_bound = context::get().is_some();
        if let Some(envelope) = self.process(visitor.into_record(metadata, request_bound)) {
            self.delivery.submit(envelope);
        }
    }
}

impl fmt::Debug for CaptureLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureLayer")
            .field("pipeline", &self.pipeline)
            .field("max_level", &self.max_level)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct RecordVisitor {
    message: Option<String>,
    exc_info: bool,
    error: Option<String>,
    code: Option<u16>,
}

impl RecordVisitor {
    fn into_record(self, metadata: &Metadata<'_>, capture_stack: bool) -> LogRecord {
        let record = LogRecord::new(
            *metadata.level(),
            metadata.target(),
            self.message.unwrap_or_default(),
        );
        if !self.exc_info && self.error.is_none() {
            return record;
        }
        let exception = if capture_stack {
            ExceptionInfo::capture(self.error, self.code)
        } else {
            ExceptionInfo {
                error: self.error,
                code: self.code,
                ..ExceptionInfo::default()
            }
        };
        record.with_exception(exception)
    }
}

impl Visit for RecordVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "message" => self.message = Some(value.to_string()),
            "code" => self.code = value.trim().parse().ok(),
            _ => {}
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        if field.name() == "exc_info" {
            self.exc_info = value;
        }
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        if field.name() == "code" {
            self.code = u16::try_from(value).ok();
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        if field.name() == "code" {
            self.code = u16::try_from(value).ok();
        }
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        if field.name() == "error" {
            self.error = Some(render_error_chain(value));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{value:?}"));
        }
    }
}

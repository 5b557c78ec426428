//! Record enrichment with request identity.
//!
//! # Responsibilities
//! - Attach an [`Envelope`] to records logged while a request is bound
//! - Route plain records to `track-backend`, ERROR records with exception
//!   info to `track-backend-error`
//! - Clear a record's exception info once a status `code` has been consumed

use crate::context::{self, RequestContext};
use crate::events::envelope::{
    utc_timestamp, Endpoint, Envelope, ErrorEvent, Event, EventBody, LogEvent, EVENT_SOURCE,
};
use crate::events::traceback::{read_source, resolve_path, select_frame};
use crate::record::{ExceptionInfo, LogRecord, RecordDecorator};

/// Status reported for error events without an explicit `code`.
pub const DEFAULT_ERROR_STATUS: u16 = 500;

/// Decorator that turns request-scoped records into Synchrolog envelopes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Enricher;

impl Enricher {
    pub fn new() -> Self {
        Self
    }

    /// Build the envelope for `record` as seen from `context`.
    pub fn envelope_for(&self, record: &LogRecord, context: &RequestContext) -> Envelope {
        let timestamp = utc_timestamp();
        let (endpoint, event) = match record.exception.as_ref() {
            Some(exception) if record.is_error_with_exception() => (
                Endpoint::TrackBackendError,
                Event::Error {
                    error: error_event(record, exception, context),
                },
            ),
            _ => (
                Endpoint::TrackBackend,
                Event::Log {
                    log: LogEvent {
                        timestamp: timestamp.clone(),
                        message: record.message.clone(),
                    },
                },
            ),
        };

        Envelope {
            endpoint,
            body: EventBody {
                timestamp,
                anonymous_id: context.anonymous_id(),
                user_id: context.user_id(),
                source: EVENT_SOURCE.to_string(),
                event,
            },
        }
    }
}

impl RecordDecorator for Enricher {
    fn decorate(&self, record: &mut LogRecord) {
        let Some(context) = context::get() else {
            return;
        };

        let envelope = self.envelope_for(record, &context);
        let status_consumed = matches!(envelope.body.event, Event::Error { .. })
            && record.exception.as_ref().is_some_and(|e| e.code.is_some());
        if status_consumed {
            record.exception = None;
        }
        record.envelope = Some(envelope);
    }

    fn name(&self) -> &str {
        "synchrolog-enricher"
    }
}

fn error_event(
    record: &LogRecord,
    exception: &ExceptionInfo,
    context: &RequestContext,
) -> ErrorEvent {
    let frame = select_frame(&exception.frames);
    let file = frame.and_then(|frame| frame.file.as_deref());

    ErrorEvent {
        status: exception.code.unwrap_or(DEFAULT_ERROR_STATUS).to_string(),
        description: record.message.clone(),
        backtrace: exception.backtrace.clone(),
        ip_address: context.client_ip(),
        user_agent: context.user_agent(),
        file_name: file
            .map(|file| resolve_path(file).display().to_string())
            .unwrap_or_default(),
        line_number: frame
            .and_then(|frame| frame.line)
            .map(|line| line.to_string())
            .unwrap_or_default(),
        source_snippet: file.map(read_source).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tracing::Level;

    const BACKTRACE: &str = "   0: tracing_core::event::Event::dispatch
             at /home/dev/.cargo/registry/src/index/tracing-core-0.1.32/src/event.rs:34:9
   1: shop::views::checkout
             at /nonexistent/shop/src/views.rs:42:9
";

    fn bound_context() -> Arc<RequestContext> {
        Arc::new(
            RequestContext::builder()
                .cookie("synchrolog_user_id", "1")
                .cookie("synchrolog_anonymous_id", "2")
                .header("user-agent", "pytest")
                .remote_addr("127.0.0.1")
                .build(),
        )
    }

    #[test]
    fn test_no_context_passes_through() {
        context::clear();
        let mut record = LogRecord::new(Level::INFO, "app", "startup");
        Enricher.decorate(&mut record);
        assert!(record.envelope.is_none());
    }

    #[test]
    fn test_info_record_becomes_log_event() {
        let _guard = context::bind(bound_context());
        let mut record = LogRecord::new(Level::INFO, "app", "SOME MSG");
        Enricher.decorate(&mut record);

        let envelope = record.envelope.unwrap();
        assert_eq!(envelope.endpoint, Endpoint::TrackBackend);
        assert_eq!(envelope.body.anonymous_id, "2");
        assert_eq!(envelope.body.user_id.as_deref(), Some("1"));
        assert_eq!(envelope.body.source, "backend");
        match envelope.body.event {
            Event::Log { log } => {
                assert_eq!(log.message, "SOME MSG");
                assert_eq!(log.timestamp, envelope.body.timestamp);
            }
            other => panic!("expected log event, got {other:?}"),
        }
    }

    #[test]
    fn test_error_without_exception_is_log_event() {
        let _guard = context::bind(bound_context());
        let mut record = LogRecord::new(Level::ERROR, "app", "SOME MSG");
        Enricher.decorate(&mut record);
        assert_eq!(record.envelope.unwrap().endpoint, Endpoint::TrackBackend);
    }

    #[test]
    fn test_warn_with_exception_is_log_event() {
        let _guard = context::bind(bound_context());
        let mut record = LogRecord::new(Level::WARN, "app", "retrying")
            .with_exception(ExceptionInfo::from_backtrace_text(None, None, BACKTRACE.into()));
        Enricher.decorate(&mut record);
        assert_eq!(record.envelope.unwrap().endpoint, Endpoint::TrackBackend);
        assert!(record.exception.is_some());
    }

    #[test]
    fn test_error_with_exception_is_error_event() {
        let _guard = context::bind(bound_context());
        let mut record = LogRecord::new(Level::ERROR, "app", "SOME MSG")
            .with_exception(ExceptionInfo::from_backtrace_text(None, None, BACKTRACE.into()));
        Enricher.decorate(&mut record);

        let envelope = record.envelope.clone().unwrap();
        assert_eq!(envelope.endpoint, Endpoint::TrackBackendError);
        let Event::Error { error } = envelope.body.event else {
            panic!("expected error event");
        };
        assert_eq!(error.status, "500");
        assert_eq!(error.description, "SOME MSG");
        assert_eq!(error.backtrace, BACKTRACE);
        assert_eq!(error.ip_address, "127.0.0.1");
        assert_eq!(error.user_agent.as_deref(), Some("pytest"));
        assert_eq!(error.file_name, "/nonexistent/shop/src/views.rs");
        assert_eq!(error.line_number, "42");
        assert_eq!(error.source_snippet, "");
        // no code: exception info stays on the record
        assert!(record.exception.is_some());
    }

    #[test]
    fn test_code_sets_status_and_clears_exception() {
        let _guard = context::bind(bound_context());
        let mut record = LogRecord::new(Level::ERROR, "app", "not found")
            .with_exception(ExceptionInfo::from_backtrace_text(None, Some(404), BACKTRACE.into()));
        Enricher.decorate(&mut record);

        let Event::Error { error } = record.envelope.unwrap().body.event else {
            panic!("expected error event");
        };
        assert_eq!(error.status, "404");
        assert!(record.exception.is_none());
    }

    #[test]
    fn test_missing_frames_degrade_to_empty_strings() {
        let _guard = context::bind(Arc::new(RequestContext::builder().build()));
        let exception = ExceptionInfo::from_backtrace_text(None, None, "   0: <unknown>\n".into());
        let mut record = LogRecord::new(Level::ERROR, "app", "boom").with_exception(exception);
        Enricher.decorate(&mut record);

        let Event::Error { error } = record.envelope.unwrap().body.event else {
            panic!("expected error event");
        };
        assert_eq!(error.file_name, "");
        assert_eq!(error.line_number, "");
        assert_eq!(error.ip_address, "");
        assert!(error.user_agent.is_none());
    }

    #[test]
    fn test_generated_id_shared_across_records() {
        let context = Arc::new(RequestContext::builder().build());
        let _guard = context::bind(Arc::clone(&context));

        let mut first = LogRecord::new(Level::INFO, "app", "one");
        let mut second = LogRecord::new(Level::INFO, "app", "two");
        Enricher.decorate(&mut first);
        Enricher.decorate(&mut second);

        let first_id = first.envelope.unwrap().body.anonymous_id;
        assert_eq!(first_id, second.envelope.unwrap().body.anonymous_id);
        assert_eq!(context.generated_anonymous_id(), Some(first_id));
    }
}

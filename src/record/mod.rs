//! Log records flowing through the synchrolog pipeline.
//!
//! # Data Flow
//! ```text
//! tracing event
//!     → observability::capture (build LogRecord)
//!     → decorator.rs pipeline (Enricher first, then host decorators)
//!     → record.envelope handed to delivery
//! ```

pub mod decorator;

use std::backtrace::Backtrace;
use std::fmt;

use tracing::Level;

use crate::events::traceback::{parse_backtrace, Frame};
use crate::events::Envelope;

pub use decorator::{RecordDecorator, RecordPipeline};

/// A single captured log call.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub level: Level,
    pub target: String,
    pub message: String,
    pub exception: Option<ExceptionInfo>,
    pub envelope: Option<Envelope>,
}

impl LogRecord {
    pub fn new(level: Level, target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            target: target.into(),
            message: message.into(),
            exception: None,
            envelope: None,
        }
    }

    pub fn with_exception(mut self, exception: ExceptionInfo) -> Self {
        self.exception = Some(exception);
        self
    }

    /// True for ERROR records that carry exception info.
    pub fn is_error_with_exception(&self) -> bool {
        self.level == Level::ERROR && self.exception.is_some()
    }
}

/// Error details attached to a record with `exc_info = true` or a recorded error.
#[derive(Debug, Clone, Default)]
pub struct ExceptionInfo {
    /// Rendered error with its `source()` chain, when an error value was recorded.
    pub error: Option<String>,
    /// Conventional HTTP status carried by the `code` field.
    pub code: Option<u16>,
    /// Stack frames, innermost first.
    pub frames: Vec<Frame>,
    /// Human-readable backtrace.
    pub backtrace: String,
}

impl ExceptionInfo {
    /// Capture the current stack.
    pub fn capture(error: Option<String>, code: Option<u16>) -> Self {
        let backtrace = Backtrace::force_capture().to_string();
        Self::from_backtrace_text(error, code, backtrace)
    }

    /// Build from an already formatted backtrace (std `Backtrace` display format).
    pub fn from_backtrace_text(
        error: Option<String>,
        code: Option<u16>,
        backtrace: String,
    ) -> Self {
        let frames = parse_backtrace(&backtrace);
        let backtrace = match &error {
            Some(error) => format!("{error}\n\nStack backtrace:\n{backtrace}"),
            None => backtrace,
        };
        Self {
            error,
            code,
            frames,
            backtrace,
        }
    }
}

/// Render an error followed by its `source()` chain.
pub fn render_error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        rendered.push_str(&format!("\n\nCaused by:\n    {cause}"));
        source = cause.source();
    }
    rendered
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.level, self.target, self.message)
    }
}

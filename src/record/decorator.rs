//! Composable record decorators.
//!
//! A [`RecordPipeline`] runs its decorators in registration order, so the
//! position of every stage relative to the enricher is explicit.

use std::sync::Arc;

use crate::record::LogRecord;

/// A stage that inspects or rewrites a record before delivery.
pub trait RecordDecorator: Send + Sync {
    fn decorate(&self, record: &mut LogRecord);

    /// Name used in diagnostics.
    fn name(&self) -> &str {
        "anonymous"
    }
}

impl<F> RecordDecorator for F
where
    F: Fn(&mut LogRecord) + Send + Sync,
{
    fn decorate(&self, record: &mut LogRecord) {
        self(record)
    }
}

/// Ordered list of decorators.
#[derive(Clone, Default)]
pub struct RecordPipeline {
    stages: Vec<Arc<dyn RecordDecorator>>,
}

impl RecordPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage; it runs after every stage added before it.
    pub fn with<D>(mut self, decorator: D) -> Self
    where
        D: RecordDecorator + 'static,
    {
        self.stages.push(Arc::new(decorator));
        self
    }

    pub fn push(&mut self, decorator: Arc<dyn RecordDecorator>) {
        self.stages.push(decorator);
    }

    pub fn run(&self, record: &mut LogRecord) {
        for stage in &self.stages {
            stage.decorate(record);
        }
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl std::fmt::Debug for RecordPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordPipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}

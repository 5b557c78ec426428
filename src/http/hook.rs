//! The synchrolog instance a host application wires in.
//!
//! # Responsibilities
//! - Validate configuration and fail fast without an access token
//! - Own the delivery path (queue or direct) and the record pipeline
//! - Hand out the capture layer and attach the lifecycle middleware
//!
//! # Design Decisions
//! - No global state: each instance owns its delivery; capture layers created
//!   from it share that delivery through an `Arc`
//! - The enricher is always the first pipeline stage; host decorators follow
//!   in registration order

use std::sync::Arc;

use axum::Router;
use tracing_subscriber::filter::LevelFilter;

use crate::config::{validate_config, ConfigError, SynchrologConfig};
use crate::delivery::{Delivery, ReqwestTransport, RemoteSink, Transport};
use crate::error::SynchrologError;
use crate::events::Enricher;
use crate::http::middleware::synchrolog_middleware;
use crate::observability::CaptureLayer;
use crate::record::{RecordDecorator, RecordPipeline};

/// Handle to a configured synchrolog instance. Cheap to clone.
#[derive(Clone)]
pub struct Synchrolog {
    inner: Arc<Inner>,
}

struct Inner {
    config: SynchrologConfig,
    delivery: Arc<Delivery>,
    pipeline: Arc<RecordPipeline>,
    max_level: LevelFilter,
}

impl Synchrolog {
    pub fn builder(config: SynchrologConfig) -> SynchrologBuilder {
        SynchrologBuilder {
            config,
            transport: None,
            decorators: Vec::new(),
        }
    }

    /// Instance with the default `reqwest` transport and no extra decorators.
    pub fn new(config: SynchrologConfig) -> Result<Self, SynchrologError> {
        Self::builder(config).build()
    }

    /// Layer to register on the host's `tracing` subscriber.
    pub fn capture_layer(&self) -> CaptureLayer {
        CaptureLayer::new(
            Arc::clone(&self.inner.pipeline),
            Arc::clone(&self.inner.delivery),
            self.inner.max_level,
        )
    }

    /// Wrap `router` with the lifecycle middleware. Apply it after every other
    /// layer so the context is bound before any other code can log.
    pub fn attach<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router.layer(axum::middleware::from_fn(synchrolog_middleware))
    }

    /// Wait until every event submitted so far has been attempted.
    pub async fn flush(&self) {
        self.inner.delivery.flush().await;
    }

    /// Drain pending events and stop the delivery worker. Later events are dropped.
    pub async fn shutdown(&self) {
        self.inner.delivery.shutdown().await;
        tracing::info!("Synchrolog delivery stopped");
    }

    pub fn config(&self) -> &SynchrologConfig {
        &self.inner.config
    }

    pub fn pipeline(&self) -> &RecordPipeline {
        &self.inner.pipeline
    }

    pub fn is_queued(&self) -> bool {
        self.inner.delivery.is_queued()
    }
}

impl std::fmt::Debug for Synchrolog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Synchrolog")
            .field("delivery", &self.inner.delivery)
            .field("pipeline", &self.inner.pipeline)
            .field("max_level", &self.inner.max_level)
            .finish()
    }
}

/// Builder for [`Synchrolog`].
pub struct SynchrologBuilder {
    config: SynchrologConfig,
    transport: Option<Arc<dyn Transport>>,
    decorators: Vec<Arc<dyn RecordDecorator>>,
}

impl SynchrologBuilder {
    /// Replace the default `reqwest` transport.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Add a decorator that runs after the enricher and every decorator added before it.
    pub fn decorator<D>(mut self, decorator: D) -> Self
    where
        D: RecordDecorator + 'static,
    {
        self.decorators.push(Arc::new(decorator));
        self
    }

    pub fn build(self) -> Result<Synchrolog, SynchrologError> {
        let config = self.config;
        validate_config(&config).map_err(ConfigError::Validation)?;
        let token = config.token().unwrap_or_default().to_string();

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new()?),
        };
        let sink = RemoteSink::new(transport, &token);
        let delivery = Delivery::start(sink, config.use_queue).map_err(SynchrologError::Worker)?;

        let mut pipeline = RecordPipeline::new().with(Enricher::new());
        for decorator in self.decorators {
            pipeline.push(decorator);
        }

        let max_level = config.max_level();
        tracing::info!(
            queued = delivery.is_queued(),
            max_level = %max_level,
            stages = ?pipeline.stage_names(),
            "Synchrolog initialised"
        );

        Ok(Synchrolog {
            inner: Arc::new(Inner {
                config,
                delivery: Arc::new(delivery),
                pipeline: Arc::new(pipeline),
                max_level,
            }),
        })
    }
}

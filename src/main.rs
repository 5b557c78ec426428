//! Demo service wired with synchrolog.
//!
//! ```text
//!     Client Request
//!     ─────────────▶ synchrolog middleware ─▶ TraceLayer ─▶ handlers
//!                         │                                  │ tracing::info!/error!
//!                         │ bind / clear context             ▼
//!                         │                         CaptureLayer ─▶ enricher
//!                         ▼                                  │
//!     ◀───────────── Set-Cookie (new visitor)                ▼
//!                                                   delivery queue ─▶ input.synchrolog.com
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use clap::Parser;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use synchrolog::config::loader::{load_config, load_from_env};
use synchrolog::observability::metrics;
use synchrolog::{init_tracing, Synchrolog};

#[derive(Parser)]
#[command(name = "synchrolog")]
#[command(about = "Demo service reporting logs to Synchrolog", long_about = None)]
struct Args {
    /// TOML configuration file; the environment alone is used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(short, long, default_value = "127.0.0.1:8080")]
    bind: SocketAddr,

    /// Expose Prometheus metrics on this address
    #[arg(long)]
    metrics_address: Option<SocketAddr>,
}

#[derive(Debug, thiserror::Error)]
#[error("order {0} could not be loaded")]
struct OrderError(u32);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => load_from_env()?,
    };
    let synchrolog = Synchrolog::new(config)?;
    init_tracing(&synchrolog, "synchrolog=debug,tower_http=debug")?;

    tracing::info!(
        bind_address = %args.bind,
        queued = synchrolog.is_queued(),
        "Configuration loaded"
    );

    if let Some(address) = args.metrics_address {
        metrics::init_metrics(address);
    }

    let app = synchrolog.attach(routes().layer(TraceLayer::new_for_http()));

    let listener = TcpListener::bind(args.bind).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    synchrolog.shutdown().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

fn routes() -> Router {
    Router::new()
        .route("/", get(index))
        .route("/fail", get(fail))
        .route("/missing", get(missing))
}

async fn index() -> &'static str {
    tracing::info!("Index served");
    "ok"
}

async fn fail() -> StatusCode {
    let error = OrderError(42);
    tracing::error!(error = &error as &dyn std::error::Error, "Order lookup failed");
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn missing() -> StatusCode {
    tracing::error!(exc_info = true, code = 404, "Requested page does not exist");
    StatusCode::NOT_FOUND
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

//! Newsdesk daemon: configuration, collaborator wiring, scheduling and the
//! optional status server
//!
//! ```text
//! newsdesk.yaml ─▶ DaemonConfig ─▶ Collaborators ─▶ PipelineRunner ─▶ PipelineJob
//!                                                                       │
//!                        Scheduler<SystemClock> ◀───────────────────────┘
//!                                                                       │ RunResult
//!                        /v1/health  /v1/runs/latest  /metrics ◀─ AppState
//! ```

pub mod config;
pub mod handlers;
pub mod job;
pub mod metrics;
pub mod signal;
pub mod state;
pub mod vars;
pub mod wiring;

use axum::{routing::get, Router};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use config::{DaemonConfig, DaemonConfigError};
pub use job::PipelineJob;
pub use state::AppState;

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/v1/health", get(handlers::health))
        .route("/v1/runs/latest", get(handlers::latest_run))
        .route("/metrics", get(handlers::metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the status endpoints until `shutdown` is cancelled.
pub async fn serve(
    addr: &str,
    state: AppState,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "Status server listening");

    axum::serve(listener, create_app(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

/// Initialise the fmt subscriber; `RUST_LOG` overrides `default_level`.
pub fn init_tracing(default_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

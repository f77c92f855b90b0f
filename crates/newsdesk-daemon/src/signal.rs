//! Shutdown on SIGINT / SIGTERM (Ctrl-C elsewhere).
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[cfg(unix)]
pub async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match (
        signal(SignalKind::interrupt()),
        signal(SignalKind::terminate()),
    ) {
        (Ok(mut sigint), Ok(mut sigterm)) => {
            tokio::select! {
                _ = sigint.recv() => info!(signal = "SIGINT", "Signal received"),
                _ = sigterm.recv() => info!(signal = "SIGTERM", "Signal received"),
            }
        }
        (Err(e), _) | (_, Err(e)) => {
            warn!(error = %e, "Unix signal handlers unavailable, falling back to Ctrl-C");
            ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
pub async fn shutdown_signal() {
    ctrl_c().await;
}

async fn ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!(signal = "ctrl-c", "Signal received"),
        Err(e) => warn!(error = %e, "Ctrl-C handler failed"),
    }
}

/// Cancel `token` on the first shutdown signal.
pub fn cancel_on_signal(token: CancellationToken) {
    tokio::spawn(async move {
        shutdown_signal().await;
        token.cancel();
    });
}

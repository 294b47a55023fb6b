//! OS signal handling.
//!
//! # Responsibilities
//! - Translate SIGINT/ctrl-c into the internal shutdown signal

use crate::lifecycle::shutdown::Shutdown;

/// Wait for ctrl-c and trigger shutdown.
///
/// Runs as a background task for the lifetime of the process.
pub async fn shutdown_on_ctrl_c(shutdown: &Shutdown) {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "Failed to install ctrl-c handler");
        return;
    }
    tracing::info!("Shutdown signal received");
    shutdown.trigger();
}

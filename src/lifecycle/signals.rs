//! OS signal handling.
//!
//! # Responsibilities
//! - Register handlers for SIGTERM and SIGINT
//! - Translate the first signal into a shutdown trigger
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - A signal starts a graceful drain; the process exits when the
//!   server finishes draining, not when the signal lands

use crate::lifecycle::shutdown::Shutdown;

/// Spawn a task that triggers `shutdown` on SIGTERM or SIGINT.
pub fn trigger_on_signal(shutdown: Shutdown) {
    tokio::spawn(async move {
        wait_for_signal().await;
        tracing::info!("Termination signal received");
        shutdown.trigger();
    });
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate()).expect("Failed to install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = terminate.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

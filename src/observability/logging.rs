//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once per process
//! - Map the resolved log level onto a subscriber filter
//!
//! # Design Decisions
//! - RUST_LOG, when set, overrides the resolved level entirely
//! - Re-initialization is a no-op, so embedding in tests is harmless
//! - `none` maps to `off`: the subscriber stays installed but silent

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogLevel;

/// Install the global tracing subscriber at `level`.
pub fn init(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.filter_directive()));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
    tracing::debug!(level = %level, "Logging initialized");
}

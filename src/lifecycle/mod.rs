//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Bootstrap (phase.rs):
//!     Idle → Configuring → Starting → Running → ShuttingDown → Stopped
//!     validation and bind errors land in Failed
//!
//! Shutdown (shutdown.rs):
//!     trigger → broadcast to subscribed tasks → drain → exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered shutdown: stop accepting, drain in-flight, flush stats, exit
//! - Phase transitions are observable, so callers wait on the cell
//!   instead of polling the socket
//! - Shutdown trigger is idempotent and never blocks

pub mod phase;
pub mod shutdown;
pub mod signals;

pub use phase::{Phase, PhaseCell};
pub use shutdown::Shutdown;

//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! resolved logLevel
//!     → logging.rs (tracing subscriber filter)
//!
//! request handling
//!     → structured log events carrying the request ID
//!     → counters and timings to the stats sink (crate::stats)
//! ```
//!
//! # Design Decisions
//! - Structured logging via tracing; fields over message text
//! - Request ID flows through all subsystems
//! - Counters and timings go to the stats sink, not the log stream

pub mod logging;

//! Best-effort stats sink.
//!
//! # Data Flow
//! ```text
//! handlers / middleware
//!     → StatsClient (try_send, never blocks)
//!     → bounded queue
//!     → StatsWorker (buffers statsd-style lines)
//!     → UDP datagrams or TCP lines to the collector
//! ```
//!
//! # Design Decisions
//! - Emission is fire-and-forget: a slow or absent collector costs a
//!   dropped event, never request latency
//! - The worker owns buffering and the wire; clients only queue events
//! - Flush happens on a period, when the buffer fills, and at shutdown

pub mod client;
pub mod worker;

pub use client::{channel, StatsClient};
pub use worker::{Event, StatsWorker};

//! Configuration-driven HTTP service.
//!
//! A small service skeleton built with Tokio and Axum: layered
//! configuration resolution, a JSON-only HTTP surface and a best-effort
//! stats sink, wired for graceful shutdown.
//!
//! # Architecture Overview
//!
//! ```text
//!     argv ───▶ ┌─────────┐     ┌──────────────────────────────────┐
//!               │   cli   │────▶│              config              │
//!               └─────────┘     │ flags → file → remote → env →    │
//!                    │          │ defaults, fail-fast validation   │
//!                    │          └──────────────────────────────────┘
//!                    ▼
//!               ┌───────────────────────────────┐
//!               │          http server          │
//!               │  axum router, JSON fallbacks  │
//!               └──────┬────────────────┬───────┘
//!                      │                │
//!                      ▼                ▼
//!               ┌─────────────┐  ┌─────────────┐
//!               │observability│  │ stats sink  │
//!               │  (tracing)  │  │  (udp/tcp)  │
//!               └─────────────┘  └─────────────┘
//!
//!     lifecycle: Idle → Configuring → Starting → Running
//!                → ShuttingDown → Stopped (or Failed)
//! ```

use std::env;
use std::process::ExitCode;

use svcboot::cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::new();
    match cli.execute(env::args_os()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}: {}", svcboot::PROGRAM, err);
            ExitCode::FAILURE
        }
    }
}

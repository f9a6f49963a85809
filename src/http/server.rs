//! HTTP server bootstrap.
//!
//! # Responsibilities
//! - Build the Axum router with handlers and JSON fallbacks
//! - Wire up middleware (request ID, tracing, stats)
//! - Bind the listener and serve until shutdown
//! - Drive the bootstrap phase cell
//!
//! # Design Decisions
//! - Assembly and execution stay separable: new() does no IO, run() does
//! - An empty listen host binds every interface
//! - The stats worker rides the same shutdown signal as the server and
//!   is joined once the listener stops, so the final flush lands before
//!   the bootstrap reports done

use std::io;
use std::time::{Duration, Instant};

use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::schema::split_host_port;
use crate::config::Snapshot;
use crate::http::handlers;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::lifecycle::{Phase, PhaseCell, Shutdown};
use crate::stats::{self, StatsClient};

/// Longest wait for the stats worker's drain and final flush at shutdown.
const STATS_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Errors from binding and serving.
#[derive(Debug, Error)]
pub enum BindError {
    /// The listen address failed to split into host and port.
    #[error("Unusable server address {addr:?}: {reason}")]
    Address { addr: String, reason: String },

    /// The OS refused the bind.
    #[error("Failed to bind {addr}: {source}")]
    Bind { addr: String, source: io::Error },

    /// The accept loop died.
    #[error("Server error: {source}")]
    Serve { source: io::Error },
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub stats: StatsClient,
    pub phase: PhaseCell,
    pub started_at: Instant,
}

/// HTTP server for the bootstrapped service.
pub struct HttpServer {
    snapshot: Snapshot,
    shutdown: Shutdown,
    phase: PhaseCell,
}

impl HttpServer {
    /// Assemble a server around a resolved snapshot. No IO happens here.
    pub fn new(snapshot: Snapshot, shutdown: Shutdown, phase: PhaseCell) -> Self {
        Self {
            snapshot,
            shutdown,
            phase,
        }
    }

    /// Bind, serve and drain. The terminal phase is Stopped on a clean
    /// exit and Failed otherwise.
    pub async fn run(self) -> Result<(), BindError> {
        self.phase.advance(Phase::Starting);
        match self.serve().await {
            Ok(()) => {
                self.phase.advance(Phase::Stopped);
                Ok(())
            }
            Err(err) => {
                self.phase.advance(Phase::Failed);
                Err(err)
            }
        }
    }

    async fn serve(&self) -> Result<(), BindError> {
        let bind_target = listen_target(&self.snapshot.server_address)?;
        let listener = TcpListener::bind(bind_target.as_str())
            .await
            .map_err(|source| BindError::Bind {
                addr: self.snapshot.server_address.clone(),
                source,
            })?;
        let local_addr = listener.local_addr().map_err(|source| BindError::Bind {
            addr: self.snapshot.server_address.clone(),
            source,
        })?;
        tracing::info!(address = %local_addr, "Listener bound");

        let (stats, worker) = stats::channel(self.snapshot.stats.clone());
        let stats_task = tokio::spawn(worker.run(self.shutdown.clone()));

        let state = AppState {
            stats,
            phase: self.phase.clone(),
            started_at: Instant::now(),
        };
        let app = build_router(state);

        self.phase.advance(Phase::Running);
        tracing::info!(address = %local_addr, "HTTP server running");

        let shutdown = self.shutdown.clone();
        let phase = self.phase.clone();
        let served = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.triggered().await;
                phase.advance(Phase::ShuttingDown);
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await
            .map_err(|source| BindError::Serve { source });

        if served.is_err() {
            // A serve error never fires the signal; wake the worker for
            // its final drain.
            self.shutdown.trigger();
        }
        // The worker's drain and final flush complete before the
        // bootstrap reports done.
        match tokio::time::timeout(STATS_DRAIN_TIMEOUT, stats_task).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::warn!(error = %err, "Stats worker task failed"),
            Err(_) => tracing::warn!("Stats worker did not drain in time"),
        }
        served?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/",
            get(handlers::index).fallback(handlers::method_not_allowed),
        )
        .route(
            "/status",
            get(handlers::status).fallback(handlers::method_not_allowed),
        )
        .fallback(handlers::not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            record_request_stats,
        ))
        .layer(propagate_request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(set_request_id_layer())
        .with_state(state)
}

/// Count and time every request, fallback responses included.
async fn record_request_stats(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let method = request.method().as_str().to_ascii_lowercase();
    let response = next.run(request).await;
    state
        .stats
        .incr(&format!("request.{}.{}", method, response.status().as_u16()));
    state.stats.timing("request.elapsed", started.elapsed());
    response
}

/// Bind target for the listener; an empty host means every interface.
fn listen_target(address: &str) -> Result<String, BindError> {
    let (host, port) = split_host_port(address).map_err(|reason| BindError::Address {
        addr: address.to_string(),
        reason,
    })?;
    if host.is_empty() {
        Ok(format!("0.0.0.0:{}", port))
    } else {
        Ok(address.to_string())
    }
}

//! Route handlers for the service surface.
//!
//! Everything answers JSON, the fallbacks included, so clients can parse
//! any response body without sniffing content types.

use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::State;
use axum::http::{Method, StatusCode, Uri};
use axum::response::Response;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

use crate::http::response::{error_response, HandlerError};
use crate::http::server::AppState;

/// A served route, as listed by the index.
pub struct RouteEntry {
    pub method: &'static str,
    pub path: &'static str,
    pub description: &'static str,
}

/// The routes this service binds.
pub const ROUTES: &[RouteEntry] = &[
    RouteEntry {
        method: "GET",
        path: "/",
        description: "Service identity and route listing",
    },
    RouteEntry {
        method: "GET",
        path: "/status",
        description: "Liveness, uptime and build information",
    },
];

/// GET / handler. Service identity plus the routes it serves.
pub async fn index() -> Json<Value> {
    let routes: Vec<Value> = ROUTES
        .iter()
        .map(|route| {
            json!({
                "method": route.method,
                "path": route.path,
                "description": route.description,
            })
        })
        .collect();
    Json(json!({
        "program": crate::PROGRAM,
        "version": crate::VERSION,
        "release": crate::RELEASE,
        "routes": routes,
    }))
}

/// Body of a status response.
#[derive(Debug, Serialize)]
pub struct StatusBody {
    pub status: &'static str,
    pub program: &'static str,
    pub version: &'static str,
    pub release: &'static str,
    pub phase: &'static str,
    pub uptime_secs: u64,
    pub timestamp: u64,
}

/// GET /status handler. Liveness with uptime and build identity.
pub async fn status(State(state): State<AppState>) -> Result<Json<StatusBody>, HandlerError> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| HandlerError::Internal("system clock is before the Unix epoch".to_string()))?
        .as_secs();
    state.stats.incr("status.check");
    Ok(Json(StatusBody {
        status: "OK",
        program: crate::PROGRAM,
        version: crate::VERSION,
        release: crate::RELEASE,
        phase: state.phase.current().as_str(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        timestamp,
    }))
}

/// Fallback for paths with no route.
pub async fn not_found(uri: Uri) -> Response {
    error_response(
        StatusCode::NOT_FOUND,
        format!("No route for {}", uri.path()),
    )
}

/// Fallback for known paths hit with an unsupported method.
pub async fn method_not_allowed(method: Method, uri: Uri) -> Response {
    error_response(
        StatusCode::METHOD_NOT_ALLOWED,
        format!("Method {} not allowed for {}", method, uri.path()),
    )
}

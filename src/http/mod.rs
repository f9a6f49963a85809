//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, bind and serve)
//!     → request.rs (request ID generation and propagation)
//!     → handlers.rs (index, status, JSON fallbacks)
//!     → response.rs (JSON error envelope)
//!     → Send to client
//! ```

pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use response::HandlerError;
pub use server::{AppState, BindError, HttpServer};

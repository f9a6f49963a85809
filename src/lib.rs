//! Configuration-driven HTTP service bootstrap library.

pub mod cli;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod stats;

/// Program name. Names the binary, the config search directories, the
/// env prefix and the default stats bucket prefix.
pub const PROGRAM: &str = "svcboot";

/// Version baked in at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Release designator, overridable at build time via `SVCBOOT_RELEASE`.
pub const RELEASE: &str = match option_env!("SVCBOOT_RELEASE") {
    Some(release) => release,
    None => "0",
};

pub use cli::Cli;
pub use config::{Schema, Snapshot};
pub use http::HttpServer;
pub use lifecycle::Shutdown;

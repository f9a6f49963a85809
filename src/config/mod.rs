//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! schema.rs (key declarations + validators)
//!     → sources.rs (flags → file → remote → env → defaults)
//!     → resolver.rs (first answer per key, fail-fast validation)
//!     → Snapshot (typed, immutable)
//!     → cloned into the server and the stats worker
//! ```
//!
//! # Design Decisions
//! - The snapshot is resolved once per process; changes require restart
//! - Every key has a declared default, so an empty chain still resolves
//! - Validation does not distinguish sources: a bad default fails the
//!   same way a bad flag does

pub mod resolver;
pub mod schema;
pub mod sources;

pub use resolver::{resolve, ValidationError};
pub use schema::{keys, KeySpec, LogLevel, Schema, Snapshot, StatsNetwork, StatsSettings, ValueKind};
pub use sources::{
    default_search_paths, standard_chain, DefaultSource, EnvSource, FileSource, FlagSource,
    RemoteFetch, RemoteOptions, RemoteSource, Resolved, Source, SourceChain, SourceNotice,
    CONFIG_FILE, ENV_PREFIX,
};

//! Command-line entry point.
//!
//! # Responsibilities
//! - Derive one --flag per schema key, help and usage included
//! - Parse argv and capture only explicitly supplied flags
//! - Drive the bootstrap: resolve, init logging, serve until shutdown
//!
//! # Design Decisions
//! - Flags carry no clap-level defaults; a parse-time default would
//!   shadow the file, remote and env tiers for every key
//! - Values parse as plain strings so the resolver owns all validation,
//!   including a negative flush period
//! - build() is pure assembly; execute() does the IO

use std::collections::HashSet;
use std::ffi::OsString;
use std::sync::Arc;

use clap::error::ErrorKind;
use clap::parser::ValueSource;
use clap::{Arg, ArgMatches, Command};
use thiserror::Error;
use tokio::sync::watch;

use crate::config::{
    resolve, standard_chain, FlagSource, KeySpec, RemoteFetch, Schema, ValidationError, ValueKind,
};
use crate::http::{BindError, HttpServer};
use crate::lifecycle::{signals, Phase, PhaseCell, Shutdown};
use crate::observability::logging;

/// Schema problems discovered while assembling the command.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// A key declaration has an empty name.
    #[error("Schema declares a key with an empty name")]
    UnnamedKey,

    /// Two key declarations share a name.
    #[error("Schema declares duplicate key {key:?}")]
    DuplicateKey { key: &'static str },

    /// A declared default fails its own kind's validation.
    #[error("Default {value:?} for key {key} rejected: {reason}")]
    InvalidDefault {
        key: &'static str,
        value: &'static str,
        reason: String,
    },
}

/// Failure modes of one bootstrap run.
#[derive(Debug, Error)]
pub enum ExecuteError {
    /// The command could not be assembled.
    #[error(transparent)]
    Build(#[from] BuildError),

    /// Argv did not parse against the derived flags.
    #[error("{0}")]
    Usage(#[from] clap::Error),

    /// A source supplied an invalid value, or a key went unresolved.
    #[error(transparent)]
    Config(#[from] ValidationError),

    /// Binding or serving failed.
    #[error(transparent)]
    Server(#[from] BindError),
}

/// Builder and runner for the service command.
///
/// One value drives one bootstrap; the phase cell is terminal after
/// `execute` returns, so create a fresh `Cli` per invocation.
pub struct Cli {
    schema: Schema,
    shutdown: Shutdown,
    phase: PhaseCell,
    remote: Option<Arc<dyn RemoteFetch>>,
}

impl Cli {
    /// A CLI over the standard schema.
    pub fn new() -> Self {
        Self::with_schema(Schema::standard())
    }

    /// A CLI over a custom schema.
    pub fn with_schema(schema: Schema) -> Self {
        Self {
            schema,
            shutdown: Shutdown::new(),
            phase: PhaseCell::new(),
            remote: None,
        }
    }

    /// Attach a transport for the remote configuration tier.
    pub fn with_remote(mut self, fetcher: Arc<dyn RemoteFetch>) -> Self {
        self.remote = Some(fetcher);
        self
    }

    /// Handle for triggering graceful shutdown from outside.
    pub fn shutdown(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Watch the bootstrap phase.
    pub fn phases(&self) -> watch::Receiver<Phase> {
        self.phase.watch()
    }

    /// Assemble the clap command, one value flag per schema key.
    /// Performs no IO and parses nothing.
    pub fn build(&self) -> Result<Command, BuildError> {
        verify_schema(&self.schema)?;
        let mut command = Command::new(crate::PROGRAM)
            .version(crate::VERSION)
            .about("Configuration-driven HTTP service");
        for key in self.schema.keys() {
            command = command.arg(flag_for(key));
        }
        Ok(command)
    }

    /// Parse argv, resolve configuration and serve until shutdown.
    ///
    /// `--help` and `--version` print and return Ok without
    /// bootstrapping anything.
    pub async fn execute<I, T>(&self, argv: I) -> Result<(), ExecuteError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let command = self.build()?;
        let matches = match command.try_get_matches_from(argv) {
            Ok(matches) => matches,
            Err(err)
                if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) =>
            {
                let _ = err.print();
                return Ok(());
            }
            Err(err) => return Err(ExecuteError::Usage(err)),
        };

        self.phase.advance(Phase::Configuring);
        let flags = explicit_flags(&self.schema, &matches);
        let chain = standard_chain(self.schema.clone(), flags, self.remote.clone());
        let snapshot = match resolve(&self.schema, &chain) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                self.phase.advance(Phase::Failed);
                return Err(err.into());
            }
        };

        logging::init(snapshot.log_level);
        // Sources load before the subscriber exists; their skip notices
        // become visible here.
        for notice in chain.notices() {
            tracing::warn!(
                origin = notice.origin,
                subject = %notice.subject,
                reason = %notice.reason,
                "Skipped configuration input"
            );
        }
        tracing::info!(
            server_address = %snapshot.server_address,
            stats_network = %snapshot.stats.network,
            stats_address = %snapshot.stats.address,
            stats_prefix = %snapshot.stats.prefix,
            stats_flush_period_ms = snapshot.stats.flush_period_ms,
            "Configuration resolved"
        );
        signals::trigger_on_signal(self.shutdown.clone());

        let server = HttpServer::new(snapshot, self.shutdown.clone(), self.phase.clone());
        server.run().await?;
        Ok(())
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self::new()
    }
}

/// One `--key VALUE` flag. No clap default, no clap typing.
fn flag_for(key: &KeySpec) -> Arg {
    let mut arg = Arg::new(key.name)
        .long(key.name)
        .value_name(key.kind.value_name())
        .help(key.help)
        .num_args(1);
    if key.kind == ValueKind::NonNegativeInt {
        // Otherwise clap reads "-1" as an unknown flag, not a value.
        arg = arg.allow_negative_numbers(true);
    }
    arg
}

/// Flags the user actually supplied, judged by provenance.
fn explicit_flags(schema: &Schema, matches: &ArgMatches) -> FlagSource {
    let mut values = Vec::new();
    for key in schema.keys() {
        if matches.value_source(key.name) != Some(ValueSource::CommandLine) {
            continue;
        }
        if let Some(value) = matches.get_one::<String>(key.name) {
            values.push((key.name.to_string(), value.clone()));
        }
    }
    FlagSource::new(values)
}

/// Reject schemas that cannot become a well-formed command.
fn verify_schema(schema: &Schema) -> Result<(), BuildError> {
    let mut seen = HashSet::new();
    for key in schema.keys() {
        if key.name.is_empty() {
            return Err(BuildError::UnnamedKey);
        }
        if !seen.insert(key.name) {
            return Err(BuildError::DuplicateKey { key: key.name });
        }
        if let Err(reason) = key.kind.validate(key.default) {
            return Err(BuildError::InvalidDefault {
                key: key.name,
                value: key.default,
                reason,
            });
        }
    }
    Ok(())
}

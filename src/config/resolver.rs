//! Fail-fast configuration resolution.
//!
//! # Responsibilities
//! - Walk the schema and pull each key through the source chain
//! - Validate every raw value, wherever it came from
//! - Build the typed [`Snapshot`] handed to the bootstrap
//!
//! # Design Decisions
//! - Resolution is a pure function of schema and chain
//! - The first invalid value aborts, naming the key and the value
//! - Resolving the same sources twice yields the same snapshot

use std::collections::HashMap;
use std::str::FromStr;

use thiserror::Error;

use crate::config::schema::{keys, Schema, Snapshot, StatsSettings};
use crate::config::sources::SourceChain;

/// Resolution failure. Carries enough to point the operator at the
/// offending key without consulting logs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A source supplied a value the key's kind rejects.
    #[error("Invalid value {value:?} for key {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    /// No tier, not even the defaults, answered for the key.
    #[error("No value resolved for key {key}")]
    Missing { key: &'static str },
}

/// Resolve every schema key through the chain and type the result.
///
/// Keys outside the standard set are validated and then dropped; the
/// snapshot only carries the fields the service acts on.
pub fn resolve(schema: &Schema, chain: &SourceChain) -> Result<Snapshot, ValidationError> {
    let mut raw = HashMap::with_capacity(schema.keys().len());
    for key in schema.keys() {
        let resolved = chain
            .lookup(key.name)
            .ok_or(ValidationError::Missing { key: key.name })?;
        if let Err(reason) = key.kind.validate(&resolved.value) {
            return Err(ValidationError::Invalid {
                key: key.name,
                value: resolved.value,
                reason,
            });
        }
        tracing::trace!(
            key = key.name,
            origin = resolved.origin,
            "Resolved configuration key"
        );
        raw.insert(key.name, resolved.value);
    }
    snapshot_from_raw(&raw)
}

fn snapshot_from_raw(raw: &HashMap<&'static str, String>) -> Result<Snapshot, ValidationError> {
    Ok(Snapshot {
        log_level: parse_raw(raw, keys::LOG_LEVEL)?,
        server_address: raw_value(raw, keys::SERVER_ADDRESS)?.to_string(),
        stats: StatsSettings {
            prefix: raw_value(raw, keys::STATS_PREFIX)?.to_string(),
            network: parse_raw(raw, keys::STATS_NETWORK)?,
            address: raw_value(raw, keys::STATS_ADDRESS)?.to_string(),
            flush_period_ms: parse_millis(raw, keys::STATS_FLUSH_PERIOD)?,
        },
    })
}

fn raw_value<'a>(
    raw: &'a HashMap<&'static str, String>,
    key: &'static str,
) -> Result<&'a str, ValidationError> {
    raw.get(key)
        .map(String::as_str)
        .ok_or(ValidationError::Missing { key })
}

fn parse_raw<T>(raw: &HashMap<&'static str, String>, key: &'static str) -> Result<T, ValidationError>
where
    T: FromStr<Err = String>,
{
    let value = raw_value(raw, key)?;
    value.parse::<T>().map_err(|reason| ValidationError::Invalid {
        key,
        value: value.to_string(),
        reason,
    })
}

fn parse_millis(
    raw: &HashMap<&'static str, String>,
    key: &'static str,
) -> Result<u64, ValidationError> {
    let value = raw_value(raw, key)?;
    value.parse::<u64>().map_err(|_| ValidationError::Invalid {
        key,
        value: value.to_string(),
        reason: "must be a non-negative integer".to_string(),
    })
}

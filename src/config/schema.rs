//! Configuration schema definitions.
//!
//! # Responsibilities
//! - Declare every key the service understands (name, kind, default, help)
//! - Validate raw string values before they become typed settings
//! - Define the typed snapshot handed to the rest of the system
//!
//! # Design Decisions
//! - Keys are declared data, not struct fields: the CLI and the source
//!   chain iterate the same declarations
//! - Defaults are stored as raw strings and validated like any other value
//! - An explicitly supplied empty string is a value, not an absence

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Canonical key names, shared by flag, file, remote and env lookups.
pub mod keys {
    pub const LOG_LEVEL: &str = "logLevel";
    pub const SERVER_ADDRESS: &str = "serverAddress";
    pub const STATS_PREFIX: &str = "statsPrefix";
    pub const STATS_NETWORK: &str = "statsNetwork";
    pub const STATS_ADDRESS: &str = "statsAddress";
    pub const STATS_FLUSH_PERIOD: &str = "statsFlushPeriod";
}

/// Value class of a configuration key.
///
/// Each kind carries its own validation rule, applied to raw strings from
/// any source, including declared defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Syslog-style severity name, case-insensitive.
    LogLevel,
    /// `[host]:port` address; an empty host means "any interface".
    HostPort,
    /// Any non-blank string.
    NonEmpty,
    /// Stats transport, `udp` or `tcp`.
    StatsNetwork,
    /// Integer greater than or equal to zero.
    NonNegativeInt,
}

impl ValueKind {
    /// Check a raw string against this kind's rule.
    pub fn validate(self, raw: &str) -> Result<(), String> {
        match self {
            ValueKind::LogLevel => raw.parse::<LogLevel>().map(|_| ()),
            ValueKind::HostPort => split_host_port(raw).map(|_| ()),
            ValueKind::NonEmpty => {
                if raw.trim().is_empty() {
                    Err("must not be empty".to_string())
                } else {
                    Ok(())
                }
            }
            ValueKind::StatsNetwork => raw.parse::<StatsNetwork>().map(|_| ()),
            ValueKind::NonNegativeInt => match raw.parse::<i64>() {
                Ok(n) if n >= 0 => Ok(()),
                Ok(n) => Err(format!("must be >= 0, got {}", n)),
                Err(_) => Err(format!("not a valid integer: {:?}", raw)),
            },
        }
    }

    /// Placeholder shown in CLI usage text.
    pub fn value_name(self) -> &'static str {
        match self {
            ValueKind::LogLevel => "LEVEL",
            ValueKind::HostPort => "ADDRESS",
            ValueKind::NonEmpty => "STRING",
            ValueKind::StatsNetwork => "NETWORK",
            ValueKind::NonNegativeInt => "MILLIS",
        }
    }
}

/// Declaration of a single configuration key.
#[derive(Debug, Clone, Copy)]
pub struct KeySpec {
    /// Key name as it appears on flags, in files and in env lookups.
    pub name: &'static str,

    /// Value class, used for validation.
    pub kind: ValueKind,

    /// Raw default, used when no source supplies the key.
    pub default: &'static str,

    /// One-line description for CLI help output.
    pub help: &'static str,
}

/// Ordered set of key declarations.
#[derive(Debug, Clone)]
pub struct Schema {
    keys: Vec<KeySpec>,
}

impl Schema {
    /// Build a schema from explicit declarations.
    pub fn new(keys: Vec<KeySpec>) -> Self {
        Self { keys }
    }

    /// The standard service schema.
    pub fn standard() -> Self {
        Self::new(vec![
            KeySpec {
                name: keys::LOG_LEVEL,
                kind: ValueKind::LogLevel,
                default: "info",
                help: "Log verbosity: none, emergency, alert, critical, error, warning, notice, info or debug",
            },
            KeySpec {
                name: keys::SERVER_ADDRESS,
                kind: ValueKind::HostPort,
                default: ":8081",
                help: "HTTP listen address as [host]:port",
            },
            KeySpec {
                name: keys::STATS_PREFIX,
                kind: ValueKind::NonEmpty,
                default: crate::PROGRAM,
                help: "Prefix prepended to every stats bucket",
            },
            KeySpec {
                name: keys::STATS_NETWORK,
                kind: ValueKind::StatsNetwork,
                default: "udp",
                help: "Stats transport: udp or tcp",
            },
            KeySpec {
                name: keys::STATS_ADDRESS,
                kind: ValueKind::HostPort,
                default: ":8125",
                help: "Stats collector address as [host]:port",
            },
            KeySpec {
                name: keys::STATS_FLUSH_PERIOD,
                kind: ValueKind::NonNegativeInt,
                default: "100",
                help: "Stats flush period in milliseconds; 0 flushes only when the buffer fills",
            },
        ])
    }

    /// All declared keys, in declaration order.
    pub fn keys(&self) -> &[KeySpec] {
        &self.keys
    }

    /// Look up a declaration by name.
    pub fn key(&self, name: &str) -> Option<&KeySpec> {
        self.keys.iter().find(|k| k.name == name)
    }
}

/// Log severity, mirroring the syslog ladder plus `none`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    None,
    Emergency,
    Alert,
    Critical,
    Error,
    Warning,
    Notice,
    Info,
    Debug,
}

impl LogLevel {
    /// Canonical lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::None => "none",
            LogLevel::Emergency => "emergency",
            LogLevel::Alert => "alert",
            LogLevel::Critical => "critical",
            LogLevel::Error => "error",
            LogLevel::Warning => "warning",
            LogLevel::Notice => "notice",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }

    /// Directive for the tracing subscriber filter.
    ///
    /// The syslog ladder is wider than the tracing one, so the four
    /// highest severities all collapse onto `error`.
    pub fn filter_directive(self) -> &'static str {
        match self {
            LogLevel::None => "off",
            LogLevel::Emergency | LogLevel::Alert | LogLevel::Critical | LogLevel::Error => {
                "error"
            }
            LogLevel::Warning => "warn",
            LogLevel::Notice | LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(LogLevel::None),
            "emergency" => Ok(LogLevel::Emergency),
            "alert" => Ok(LogLevel::Alert),
            "critical" => Ok(LogLevel::Critical),
            "error" => Ok(LogLevel::Error),
            "warning" => Ok(LogLevel::Warning),
            "notice" => Ok(LogLevel::Notice),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            _ => Err(format!(
                "unknown log level {:?} (expected none, emergency, alert, critical, error, warning, notice, info or debug)",
                s
            )),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transport used to reach the stats collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsNetwork {
    Udp,
    Tcp,
}

impl StatsNetwork {
    pub fn as_str(self) -> &'static str {
        match self {
            StatsNetwork::Udp => "udp",
            StatsNetwork::Tcp => "tcp",
        }
    }
}

impl FromStr for StatsNetwork {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "udp" => Ok(StatsNetwork::Udp),
            "tcp" => Ok(StatsNetwork::Tcp),
            _ => Err(format!(
                "unknown stats network {:?} (expected \"udp\" or \"tcp\")",
                s
            )),
        }
    }
}

impl fmt::Display for StatsNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Split a `[host]:port` string on its last colon.
///
/// The host part may be empty. The port must parse as u16.
pub fn split_host_port(addr: &str) -> Result<(&str, u16), String> {
    if addr.is_empty() {
        return Err("address must not be empty".to_string());
    }
    let (host, port) = addr
        .rsplit_once(':')
        .ok_or_else(|| format!("expected [host]:port, got {:?}", addr))?;
    let port = port
        .parse::<u16>()
        .map_err(|_| format!("invalid port {:?}", port))?;
    Ok((host, port))
}

/// Fully resolved, validated configuration.
///
/// Immutable once built; the bootstrap and all workers read from shared
/// copies of this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Log verbosity for the tracing subscriber.
    pub log_level: LogLevel,

    /// HTTP listen address as `[host]:port`.
    pub server_address: String,

    /// Stats sink settings.
    pub stats: StatsSettings,
}

/// Settings for the stats sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsSettings {
    /// Prefix prepended to every bucket name.
    pub prefix: String,

    /// Transport to the collector.
    pub network: StatsNetwork,

    /// Collector address as `[host]:port`.
    pub address: String,

    /// Flush period in milliseconds; 0 disables periodic flushing.
    pub flush_period_ms: u64,
}

impl StatsSettings {
    /// Periodic flush interval, or `None` when flushing is buffer-driven only.
    pub fn flush_interval(&self) -> Option<Duration> {
        if self.flush_period_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.flush_period_ms))
        }
    }
}

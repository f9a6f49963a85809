//! Configuration sources and their precedence chain.
//!
//! # Data Flow
//! ```text
//! command-line flags
//!     → config file (first parseable config.toml on the search path)
//!     → remote store (only when a provider endpoint is configured)
//!     → process environment (SVCBOOT_<KEY>)
//!     → declared defaults
//! ```
//!
//! # Design Decisions
//! - Sources answer in raw strings; typing happens in the resolver
//! - First source with an answer wins, later tiers are not consulted
//! - A source that fails to load degrades to "no answer" instead of
//!   aborting resolution; only validation aborts
//! - An empty string from any source is an answer, not an absence
//! - Load problems are collected as notices rather than logged in
//!   place; sources load before the subscriber is installed

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::schema::Schema;

/// File name looked for in each search directory.
pub const CONFIG_FILE: &str = "config.toml";

/// Prefix for environment lookups, e.g. `SVCBOOT_LOGLEVEL`.
pub const ENV_PREFIX: &str = "SVCBOOT";

/// A single tier of the configuration chain.
pub trait Source: Send + Sync {
    /// Short tier name used in provenance logging.
    fn origin(&self) -> &'static str;

    /// Raw value for `key`, if this source has one.
    fn lookup(&self, key: &str) -> Option<String>;

    /// Problems hit while loading this source, kept for replay once the
    /// logging subscriber is installed.
    fn notices(&self) -> &[SourceNotice] {
        &[]
    }
}

/// A value together with the tier that supplied it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub value: String,
    pub origin: &'static str,
}

/// An input a source had to skip while loading.
#[derive(Debug, Clone)]
pub struct SourceNotice {
    /// Tier that hit the problem.
    pub origin: &'static str,
    /// The skipped input, e.g. a file path or a store document.
    pub subject: String,
    /// Why the input was skipped.
    pub reason: String,
}

/// Ordered chain of sources, consulted first to last.
pub struct SourceChain {
    sources: Vec<Box<dyn Source>>,
}

impl SourceChain {
    pub fn new(sources: Vec<Box<dyn Source>>) -> Self {
        Self { sources }
    }

    /// First answer for `key` in tier order.
    pub fn lookup(&self, key: &str) -> Option<Resolved> {
        self.sources.iter().find_map(|source| {
            source.lookup(key).map(|value| Resolved {
                value,
                origin: source.origin(),
            })
        })
    }

    /// Load problems across every tier, in tier order.
    pub fn notices(&self) -> Vec<&SourceNotice> {
        self.sources
            .iter()
            .flat_map(|source| source.notices())
            .collect()
    }
}

/// Values captured from explicitly supplied command-line flags.
///
/// Only flags the user actually passed belong here; clap-level defaults
/// would otherwise shadow every lower tier.
#[derive(Debug, Clone, Default)]
pub struct FlagSource {
    values: HashMap<String, String>,
}

impl FlagSource {
    pub fn new(values: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Source for FlagSource {
    fn origin(&self) -> &'static str {
        "flag"
    }

    fn lookup(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Key/value table loaded from the first parseable config file.
pub struct FileSource {
    values: HashMap<String, String>,
    path: Option<PathBuf>,
    notices: Vec<SourceNotice>,
}

impl FileSource {
    /// Scan `search_paths` in order for a [`CONFIG_FILE`] and load the
    /// first one that parses. Unreadable or unparseable files are skipped
    /// with a notice; absent files are skipped silently.
    pub fn discover(search_paths: &[PathBuf]) -> Self {
        let mut notices = Vec::new();
        let skip = |path: &Path, reason: String| SourceNotice {
            origin: "file",
            subject: path.display().to_string(),
            reason,
        };
        for dir in search_paths {
            let path = dir.join(CONFIG_FILE);
            if !path.is_file() {
                continue;
            }
            let content = match fs::read_to_string(&path) {
                Ok(content) => content,
                Err(err) => {
                    notices.push(skip(&path, format!("unreadable: {}", err)));
                    continue;
                }
            };
            match toml::from_str::<toml::Table>(&content) {
                Ok(table) => {
                    tracing::debug!(path = %path.display(), "Loaded config file");
                    return Self {
                        values: flatten_toml(table),
                        path: Some(path),
                        notices,
                    };
                }
                Err(err) => {
                    notices.push(skip(&path, format!("does not parse: {}", err)));
                }
            }
        }
        Self {
            values: HashMap::new(),
            path: None,
            notices,
        }
    }

    /// Path of the file that won the search, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl Source for FileSource {
    fn origin(&self) -> &'static str {
        "file"
    }

    fn lookup(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn notices(&self) -> &[SourceNotice] {
        &self.notices
    }
}

/// Transport for fetching a document from a remote configuration store.
///
/// Implementations should return `None` when the store is unreachable or
/// the path is absent; the chain then falls through to lower tiers.
pub trait RemoteFetch: Send + Sync {
    fn fetch(&self, provider: &str, endpoint: &str, path: &str) -> Option<Vec<u8>>;
}

/// Connection settings for the remote tier, taken from the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteOptions {
    /// Store flavour, e.g. `consul` or `etcd`.
    pub provider: String,
    /// Store address.
    pub endpoint: String,
    /// Document path inside the store.
    pub path: String,
}

impl RemoteOptions {
    /// Read `SVCBOOT_REMOTE_PROVIDER`, `SVCBOOT_REMOTE_ENDPOINT` and
    /// `SVCBOOT_REMOTE_PATH`. Unset variables read as empty.
    pub fn from_env() -> Self {
        let var = |name: &str| env::var(format!("{}_REMOTE_{}", ENV_PREFIX, name)).unwrap_or_default();
        Self {
            provider: var("PROVIDER"),
            endpoint: var("ENDPOINT"),
            path: var("PATH"),
        }
    }

    /// The remote tier only participates when both a provider and an
    /// endpoint are named.
    pub fn enabled(&self) -> bool {
        !self.provider.is_empty() && !self.endpoint.is_empty()
    }
}

/// Key/value table fetched once from a remote store.
#[derive(Debug, Clone, Default)]
pub struct RemoteSource {
    values: HashMap<String, String>,
    notices: Vec<SourceNotice>,
}

impl RemoteSource {
    /// Fetch and parse the remote document. When the tier is disabled the
    /// fetcher is never called and the source stays empty; a fetched but
    /// unusable document is skipped with a notice.
    pub fn load(fetcher: &dyn RemoteFetch, options: &RemoteOptions) -> Self {
        if !options.enabled() {
            return Self::default();
        }
        let skip = |reason: String| Self {
            values: HashMap::new(),
            notices: vec![SourceNotice {
                origin: "remote",
                subject: format!("{} at {}", options.path, options.endpoint),
                reason,
            }],
        };
        let Some(bytes) = fetcher.fetch(&options.provider, &options.endpoint, &options.path)
        else {
            return skip("no answer from the store".to_string());
        };
        let content = match std::str::from_utf8(&bytes) {
            Ok(content) => content,
            Err(err) => return skip(format!("not UTF-8: {}", err)),
        };
        match toml::from_str::<toml::Table>(content) {
            Ok(table) => {
                tracing::debug!(
                    provider = %options.provider,
                    endpoint = %options.endpoint,
                    "Loaded remote config"
                );
                Self {
                    values: flatten_toml(table),
                    notices: Vec::new(),
                }
            }
            Err(err) => skip(format!("does not parse: {}", err)),
        }
    }
}

impl Source for RemoteSource {
    fn origin(&self) -> &'static str {
        "remote"
    }

    fn lookup(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn notices(&self) -> &[SourceNotice] {
        &self.notices
    }
}

/// Live environment lookups under a fixed prefix.
///
/// `logLevel` reads `SVCBOOT_LOGLEVEL`. Lookups hit the process
/// environment at resolve time, not at construction.
#[derive(Debug, Clone)]
pub struct EnvSource {
    prefix: &'static str,
}

impl EnvSource {
    pub fn new(prefix: &'static str) -> Self {
        Self { prefix }
    }

    fn var_name(&self, key: &str) -> String {
        format!("{}_{}", self.prefix, key.to_ascii_uppercase())
    }
}

impl Source for EnvSource {
    fn origin(&self) -> &'static str {
        "env"
    }

    fn lookup(&self, key: &str) -> Option<String> {
        env::var(self.var_name(key)).ok()
    }
}

/// Declared defaults, the floor of the chain.
#[derive(Debug, Clone)]
pub struct DefaultSource {
    schema: Schema,
}

impl DefaultSource {
    pub fn new(schema: Schema) -> Self {
        Self { schema }
    }
}

impl Source for DefaultSource {
    fn origin(&self) -> &'static str {
        "default"
    }

    fn lookup(&self, key: &str) -> Option<String> {
        self.schema.key(key).map(|spec| spec.default.to_string())
    }
}

/// Directories probed for a config file, most specific first.
///
/// The test-rig directory leads so that checked-out trees pick up their
/// fixture config ahead of system-wide paths.
pub fn default_search_paths() -> Vec<PathBuf> {
    let mut paths = vec![
        PathBuf::from(format!("resources/test/etc/{}", crate::PROGRAM)),
        PathBuf::from("."),
        PathBuf::from("config"),
    ];
    if let Some(home) = env::var_os("HOME") {
        paths.push(PathBuf::from(home).join(format!(".{}", crate::PROGRAM)));
    }
    paths.push(PathBuf::from(format!("/etc/{}", crate::PROGRAM)));
    paths
}

/// Assemble the standard five-tier chain.
///
/// The remote tier is present only when a fetcher is supplied and the
/// environment names a provider endpoint.
pub fn standard_chain(
    schema: Schema,
    flags: FlagSource,
    fetcher: Option<Arc<dyn RemoteFetch>>,
) -> SourceChain {
    let mut sources: Vec<Box<dyn Source>> = vec![
        Box::new(flags),
        Box::new(FileSource::discover(&default_search_paths())),
    ];
    if let Some(fetcher) = fetcher {
        let options = RemoteOptions::from_env();
        sources.push(Box::new(RemoteSource::load(fetcher.as_ref(), &options)));
    }
    sources.push(Box::new(EnvSource::new(ENV_PREFIX)));
    sources.push(Box::new(DefaultSource::new(schema)));
    SourceChain::new(sources)
}

/// Flatten a TOML table into raw strings, the common currency of the
/// chain. Scalars are stringified; nested tables and arrays are skipped.
fn flatten_toml(table: toml::Table) -> HashMap<String, String> {
    let mut values = HashMap::with_capacity(table.len());
    for (key, value) in table {
        let raw = match value {
            toml::Value::String(s) => s,
            toml::Value::Integer(n) => n.to_string(),
            toml::Value::Float(n) => n.to_string(),
            toml::Value::Boolean(b) => b.to_string(),
            toml::Value::Datetime(d) => d.to_string(),
            toml::Value::Array(_) | toml::Value::Table(_) => {
                tracing::debug!(key = %key, "Ignoring non-scalar config entry");
                continue;
            }
        };
        values.insert(key, raw);
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::keys;

    #[test]
    fn chain_returns_first_answer() {
        let flags = FlagSource::new([("k".to_string(), "from-flag".to_string())]);
        let schema = Schema::standard();
        let chain = SourceChain::new(vec![
            Box::new(flags),
            Box::new(DefaultSource::new(schema)),
        ]);

        let hit = chain.lookup("k").unwrap();
        assert_eq!(hit.value, "from-flag");
        assert_eq!(hit.origin, "flag");

        let fallback = chain.lookup(keys::LOG_LEVEL).unwrap();
        assert_eq!(fallback.value, "info");
        assert_eq!(fallback.origin, "default");

        assert_eq!(chain.lookup("unknown"), None);
    }

    #[test]
    fn empty_flag_value_is_still_an_answer() {
        let flags = FlagSource::new([(keys::LOG_LEVEL.to_string(), String::new())]);
        let chain = SourceChain::new(vec![
            Box::new(flags),
            Box::new(DefaultSource::new(Schema::standard())),
        ]);

        let hit = chain.lookup(keys::LOG_LEVEL).unwrap();
        assert_eq!(hit.value, "");
        assert_eq!(hit.origin, "flag");
    }

    #[test]
    fn toml_scalars_flatten_to_strings() {
        let table: toml::Table = toml::from_str(
            r#"
            logLevel = "debug"
            statsFlushPeriod = 250
            flag = true
            nested = { inner = 1 }
            "#,
        )
        .unwrap();
        let values = flatten_toml(table);
        assert_eq!(values.get("logLevel").map(String::as_str), Some("debug"));
        assert_eq!(
            values.get("statsFlushPeriod").map(String::as_str),
            Some("250")
        );
        assert_eq!(values.get("flag").map(String::as_str), Some("true"));
        assert!(!values.contains_key("nested"));
    }

    #[test]
    fn remote_source_skips_disabled_and_bad_documents() {
        struct Fixed(&'static str);
        impl RemoteFetch for Fixed {
            fn fetch(&self, _: &str, _: &str, _: &str) -> Option<Vec<u8>> {
                Some(self.0.as_bytes().to_vec())
            }
        }

        let disabled = RemoteOptions::default();
        let source = RemoteSource::load(&Fixed("statsPrefix = \"remote\""), &disabled);
        assert_eq!(source.lookup(keys::STATS_PREFIX), None);
        assert!(source.notices().is_empty());

        let enabled = RemoteOptions {
            provider: "consul".to_string(),
            endpoint: "127.0.0.1:8500".to_string(),
            path: "/config/svcboot".to_string(),
        };
        let source = RemoteSource::load(&Fixed("statsPrefix = \"remote\""), &enabled);
        assert_eq!(
            source.lookup(keys::STATS_PREFIX),
            Some("remote".to_string())
        );
        assert!(source.notices().is_empty());

        let source = RemoteSource::load(&Fixed("not valid toml ["), &enabled);
        assert_eq!(source.lookup(keys::STATS_PREFIX), None);
        assert_eq!(source.notices().len(), 1);
        assert_eq!(source.notices()[0].origin, "remote");
        assert!(
            source.notices()[0].reason.contains("parse"),
            "reason: {}",
            source.notices()[0].reason
        );
    }

    #[test]
    fn silent_remote_store_leaves_a_notice() {
        struct Silent;
        impl RemoteFetch for Silent {
            fn fetch(&self, _: &str, _: &str, _: &str) -> Option<Vec<u8>> {
                None
            }
        }

        let enabled = RemoteOptions {
            provider: "consul".to_string(),
            endpoint: "127.0.0.1:8500".to_string(),
            path: "/config/svcboot".to_string(),
        };
        let source = RemoteSource::load(&Silent, &enabled);
        assert_eq!(source.lookup(keys::STATS_PREFIX), None);
        assert_eq!(source.notices().len(), 1);
        assert!(
            source.notices()[0].subject.contains("127.0.0.1:8500"),
            "subject: {}",
            source.notices()[0].subject
        );
        assert!(source.notices()[0].reason.contains("no answer"));
    }

    #[test]
    fn env_var_names_are_prefixed_and_uppercased() {
        let source = EnvSource::new(ENV_PREFIX);
        assert_eq!(source.var_name("logLevel"), "SVCBOOT_LOGLEVEL");
        assert_eq!(source.var_name("statsFlushPeriod"), "SVCBOOT_STATSFLUSHPERIOD");
    }
}

//! Service configuration loading from file and environment variables.
//!
//! One [`Config`] describes the whole pipeline; each binary reads the
//! sections it needs. The structure is built once at startup and passed
//! down explicitly.

use logpipe_store::FallbackId;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use thiserror::Error;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Collector (store) HTTP service.
    #[serde(default)]
    pub collector: CollectorConfig,

    /// Forwarder HTTP service and its delivery settings.
    #[serde(default)]
    pub forwarder: ForwarderConfig,

    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Ingest behaviour.
    #[serde(default)]
    pub store: StoreConfig,

    /// Synthetic event generator.
    #[serde(default)]
    pub generator: GeneratorConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Network configuration for the collector.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_collector_port")]
    pub port: u16,
}

/// Forwarder network and delivery configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ForwarderConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_forwarder_port")]
    pub port: u16,

    /// Full URL of the collector's ingest endpoint, e.g.
    /// `http://collector:5002/collect`. Unset means every forward fails.
    #[serde(default)]
    pub collector_url: Option<String>,

    /// Delivery attempts per event.
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Delay after the first failed attempt, in seconds; doubles each time.
    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: f64,

    /// Per-attempt network timeout, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: f64,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,

    /// SQLite busy timeout, in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Maximum pooled connections.
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,

    /// Schema initialization attempts before startup is aborted.
    #[serde(default = "default_init_attempts")]
    pub init_attempts: u32,

    /// Fixed delay between initialization attempts, in seconds.
    #[serde(default = "default_init_delay_secs")]
    pub init_delay_secs: f64,
}

/// Ingest configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreConfig {
    /// How ids are synthesized for events that arrive without one.
    #[serde(default)]
    pub fallback_id: FallbackId,
}

/// Synthetic event generator configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorConfig {
    /// Forwarder endpoint the generator posts to.
    #[serde(default = "default_listener_url")]
    pub listener_url: String,

    /// Client name stamped on generated events. Defaults to the host name.
    #[serde(default)]
    pub client_name: Option<String>,

    /// Seconds between generated events.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: f64,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "logpipe_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_collector_port() -> u16 {
    5002
}

fn default_forwarder_port() -> u16 {
    5001
}

fn default_retries() -> u32 {
    3
}

fn default_backoff_secs() -> f64 {
    1.0
}

fn default_timeout_secs() -> f64 {
    5.0
}

fn default_db_path() -> String {
    "logpipe.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_pool_max_size() -> u32 {
    8
}

fn default_init_attempts() -> u32 {
    10
}

fn default_init_delay_secs() -> f64 {
    2.0
}

fn default_listener_url() -> String {
    "http://127.0.0.1:5001/logs".to_string()
}

fn default_interval_secs() -> f64 {
    1.0
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_collector_port(),
        }
    }
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_forwarder_port(),
            collector_url: None,
            retries: default_retries(),
            backoff_secs: default_backoff_secs(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
            init_attempts: default_init_attempts(),
            init_delay_secs: default_init_delay_secs(),
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            listener_url: default_listener_url(),
            client_name: None,
            interval_secs: default_interval_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl ForwarderConfig {
    /// Retry policy derived from `retries` and `backoff_secs`.
    pub fn retry_policy(&self) -> logpipe_forwarder::RetryPolicy {
        logpipe_forwarder::RetryPolicy::new(
            self.retries,
            seconds(self.backoff_secs, default_backoff_secs()),
        )
    }

    /// Per-attempt timeout.
    pub fn timeout(&self) -> Duration {
        seconds(self.timeout_secs, default_timeout_secs())
    }
}

impl DatabaseConfig {
    /// Pool tunables.
    pub fn runtime_settings(&self) -> logpipe_db::DbRuntimeSettings {
        logpipe_db::DbRuntimeSettings {
            busy_timeout_ms: self.busy_timeout_ms,
            pool_max_size: self.pool_max_size,
            ..logpipe_db::DbRuntimeSettings::default()
        }
    }

    /// Startup retry policy.
    pub fn init_policy(&self) -> logpipe_db::InitPolicy {
        logpipe_db::InitPolicy {
            attempts: self.init_attempts,
            delay: seconds(self.init_delay_secs, default_init_delay_secs()),
        }
    }
}

impl GeneratorConfig {
    /// Interval between generated events.
    pub fn interval(&self) -> Duration {
        seconds(self.interval_secs, default_interval_secs())
    }
}

/// Converts validated seconds to a `Duration`.
fn seconds(value: f64, fallback: f64) -> Duration {
    Duration::try_from_secs_f64(value)
        .or_else(|_| Duration::try_from_secs_f64(fallback))
        .unwrap_or_default()
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Loads configuration from a TOML file, falling back to defaults, then
/// applies environment overrides from the process environment.
///
/// Environment variable overrides:
/// - `LOGPIPE_COLLECTOR_HOST` / `LOGPIPE_COLLECTOR_PORT`
/// - `LOGPIPE_FORWARDER_HOST` / `LOGPIPE_FORWARDER_PORT`
/// - `LOGPIPE_COLLECTOR_URL` overrides `forwarder.collector_url`
/// - `LOGPIPE_RETRIES`, `LOGPIPE_BACKOFF_SECS`, `LOGPIPE_FORWARD_TIMEOUT_SECS`
/// - `LOGPIPE_DB_PATH`, `LOGPIPE_DB_INIT_ATTEMPTS`, `LOGPIPE_DB_INIT_DELAY_SECS`
/// - `LOGPIPE_FALLBACK_ID` (`epoch_millis` or `uuid`)
/// - `LOGPIPE_LISTENER_URL`, `LOGPIPE_CLIENT_NAME`, `LOGPIPE_GEN_INTERVAL_SECS`
/// - `LOGPIPE_LOG_LEVEL`, `LOGPIPE_LOG_JSON` (set to "true" to enable)
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed, if
/// an environment override does not parse, or if a duration is negative or
/// not finite.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    load_config_with(path, |key| std::env::var(key).ok())
}

/// [`load_config`] with an explicit environment lookup.
pub fn load_config_with<F>(path: Option<&str>, env: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Config::default(),
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_env_overrides(&mut config, &env)?;
    validate(&config)?;
    Ok(config)
}

fn apply_env_overrides<F>(config: &mut Config, env: &F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    override_parsed(env, "LOGPIPE_COLLECTOR_HOST", &mut config.collector.host)?;
    override_parsed(env, "LOGPIPE_COLLECTOR_PORT", &mut config.collector.port)?;
    override_parsed(env, "LOGPIPE_FORWARDER_HOST", &mut config.forwarder.host)?;
    override_parsed(env, "LOGPIPE_FORWARDER_PORT", &mut config.forwarder.port)?;
    if let Some(url) = env("LOGPIPE_COLLECTOR_URL") {
        config.forwarder.collector_url = Some(url).filter(|u| !u.trim().is_empty());
    }
    override_parsed(env, "LOGPIPE_RETRIES", &mut config.forwarder.retries)?;
    override_parsed(env, "LOGPIPE_BACKOFF_SECS", &mut config.forwarder.backoff_secs)?;
    override_parsed(env, "LOGPIPE_FORWARD_TIMEOUT_SECS", &mut config.forwarder.timeout_secs)?;
    if let Some(path) = env("LOGPIPE_DB_PATH") {
        config.database.path = path;
    }
    override_parsed(env, "LOGPIPE_DB_INIT_ATTEMPTS", &mut config.database.init_attempts)?;
    override_parsed(env, "LOGPIPE_DB_INIT_DELAY_SECS", &mut config.database.init_delay_secs)?;
    override_parsed(env, "LOGPIPE_FALLBACK_ID", &mut config.store.fallback_id)?;
    if let Some(url) = env("LOGPIPE_LISTENER_URL") {
        config.generator.listener_url = url;
    }
    if let Some(name) = env("LOGPIPE_CLIENT_NAME") {
        config.generator.client_name = Some(name).filter(|n| !n.trim().is_empty());
    }
    override_parsed(env, "LOGPIPE_GEN_INTERVAL_SECS", &mut config.generator.interval_secs)?;
    if let Some(level) = env("LOGPIPE_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = env("LOGPIPE_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    Ok(())
}

/// Replaces `slot` with the parsed value of `key` if it is set. A value
/// that does not parse is an error rather than a silent fallback.
fn override_parsed<F, T>(env: &F, key: &str, slot: &mut T) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    if let Some(raw) = env(key) {
        *slot = raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("{key} has an unparsable value {raw:?}")))?;
    }
    Ok(())
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    let durations = [
        ("forwarder.backoff_secs", config.forwarder.backoff_secs),
        ("forwarder.timeout_secs", config.forwarder.timeout_secs),
        ("database.init_delay_secs", config.database.init_delay_secs),
        ("generator.interval_secs", config.generator.interval_secs),
    ];
    for (name, value) in durations {
        if Duration::try_from_secs_f64(value).is_err() {
            return Err(ConfigError::Invalid(format!(
                "{name} must be a finite, non-negative number of seconds, got {value}"
            )));
        }
    }
    if config.forwarder.timeout_secs == 0.0 {
        return Err(ConfigError::Invalid(
            "forwarder.timeout_secs must be greater than zero".to_string(),
        ));
    }
    if config.generator.interval_secs == 0.0 {
        return Err(ConfigError::Invalid(
            "generator.interval_secs must be greater than zero".to_string(),
        ));
    }
    if config.database.init_attempts == 0 {
        return Err(ConfigError::Invalid(
            "database.init_attempts must be at least 1".to_string(),
        ));
    }
    Ok(())
}

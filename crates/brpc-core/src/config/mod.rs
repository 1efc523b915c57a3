//! Exporter configuration with layered loading.
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded in this order (later overrides earlier):
//!
//! 1. **Compiled defaults**: `serde` default functions and `set_default` calls below
//! 2. **Config file**: YAML (or TOML) file named by `BRPC_CONFIG` or `CONFIG_FILE_PATH`
//! 3. **Environment variables**: `BRPC__*` env vars override specific fields
//!
//! A second, optional document lists the providers an operator allows. It is named by
//! `BRPC_VALIDATION_FILE` or `VALIDATION_FILE_PATH` and only consulted when the main
//! document does not carry `allowed_providers` itself.
//!
//! # Validation
//!
//! [`ExporterConfig::validate`] reports every violation it finds in one error. Any
//! violation is fatal at startup; the exporter never silently skips an endpoint.
//!
//! # Example
//!
//! ```yaml
//! blockchain: ethereum
//! chain_id: 1
//! network_name: mainnet
//! network_type: Mainnet
//! collector: evm
//! connection_parameters:
//!   open_timeout: 7
//!   close_timeout: 3
//!   ping_interval: 10
//!   ping_timeout: 7
//! endpoints:
//!   - url: wss://eth-mainnet.example.com/ws/KEY
//!     provider: example
//! ```

use crate::registry::{ChainFamily, TransportKind};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, path::Path, time::Duration};
use thiserror::Error;

const DEFAULT_CONFIG_PATH: &str = "/config/config.yml";
const DEFAULT_VALIDATION_PATH: &str = "/config/validation.yml";

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("failed to load validation file {path}: {source}")]
    ValidationFile { path: String, source: config::ConfigError },

    #[error("invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

/// Mainnet or testnet, exported verbatim as the `network_type` label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkType {
    Mainnet,
    Testnet,
}

impl NetworkType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mainnet => "Mainnet",
            Self::Testnet => "Testnet",
        }
    }
}

/// Connection tuning shared by every endpoint. All values are whole seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionParameters {
    /// Time allowed to establish a TCP/TLS/WebSocket connection. Defaults to `7`.
    #[serde(default = "default_open_timeout")]
    pub open_timeout: u64,

    /// Time allowed for a clean WebSocket close handshake. Defaults to `3`.
    #[serde(default = "default_close_timeout")]
    pub close_timeout: u64,

    /// Time allowed for a response once a request was sent. Defaults to `7`.
    #[serde(default = "default_response_timeout")]
    pub response_timeout: u64,

    /// Cadence of protocol-level pings on subscriptions. Defaults to `10`.
    #[serde(default = "default_ping_interval")]
    pub ping_interval: u64,

    /// Time a ping may stay unanswered before the subscription is dropped. Defaults to `7`.
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout: u64,

    /// Silence after which a subscription is considered stale. Defaults to `60`.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout: u64,

    /// First reconnect delay after a subscription drops. Defaults to `1`.
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay: u64,

    /// Upper bound for the doubling reconnect delay. Defaults to `60`.
    #[serde(default = "default_reconnect_delay_max")]
    pub reconnect_delay_max: u64,
}

fn default_open_timeout() -> u64 {
    7
}

fn default_close_timeout() -> u64 {
    3
}

fn default_response_timeout() -> u64 {
    7
}

fn default_ping_interval() -> u64 {
    10
}

fn default_ping_timeout() -> u64 {
    7
}

fn default_idle_timeout() -> u64 {
    60
}

fn default_reconnect_delay() -> u64 {
    1
}

fn default_reconnect_delay_max() -> u64 {
    60
}

impl Default for ConnectionParameters {
    fn default() -> Self {
        Self {
            open_timeout: default_open_timeout(),
            close_timeout: default_close_timeout(),
            response_timeout: default_response_timeout(),
            ping_interval: default_ping_interval(),
            ping_timeout: default_ping_timeout(),
            idle_timeout: default_idle_timeout(),
            reconnect_delay: default_reconnect_delay(),
            reconnect_delay_max: default_reconnect_delay_max(),
        }
    }
}

impl ConnectionParameters {
    /// Converts the configured seconds into the durations transports consume.
    #[must_use]
    pub fn timeouts(&self) -> ConnectionTimeouts {
        ConnectionTimeouts {
            open: Duration::from_secs(self.open_timeout),
            close: Duration::from_secs(self.close_timeout),
            response: Duration::from_secs(self.response_timeout),
            ping_interval: Duration::from_secs(self.ping_interval),
            ping_timeout: Duration::from_secs(self.ping_timeout),
            idle: Duration::from_secs(self.idle_timeout),
            reconnect_initial: Duration::from_secs(self.reconnect_delay),
            reconnect_max: Duration::from_secs(self.reconnect_delay_max),
        }
    }
}

/// Resolved connection timings.
///
/// Kept separate from [`ConnectionParameters`] so tests can use sub-second values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionTimeouts {
    pub open: Duration,
    pub close: Duration,
    pub response: Duration,
    pub ping_interval: Duration,
    pub ping_timeout: Duration,
    pub idle: Duration,
    pub reconnect_initial: Duration,
    pub reconnect_max: Duration,
}

impl Default for ConnectionTimeouts {
    fn default() -> Self {
        ConnectionParameters::default().timeouts()
    }
}

/// One probed RPC server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// `https://`, `wss://`, or `ws://` URL. May embed credentials.
    pub url: String,

    /// Provider label attached to every series of this endpoint.
    pub provider: String,
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind. Defaults to `0.0.0.0`.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Port to bind. Must be greater than 0. Defaults to `8000`.
    #[serde(default = "default_bind_port")]
    pub bind_port: u16,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_bind_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_address: default_bind_address(), bind_port: default_bind_port() }
    }
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is unset. Defaults to `info`.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `json` (default) or `pretty`.
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), format: default_log_format() }
    }
}

/// Scrape behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// Skip every other metric for endpoints whose `alive` check failed. Defaults to `false`.
    #[serde(default)]
    pub gate_on_alive: bool,

    /// Cap on concurrently running probe tasks. Unset means one slot per task.
    #[serde(default)]
    pub max_workers: Option<usize>,

    /// Prefix of every exported metric name. Defaults to `brpc`.
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

fn default_namespace() -> String {
    "brpc".to_string()
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self { gate_on_alive: false, max_workers: None, namespace: default_namespace() }
    }
}

/// Top-level exporter configuration.
///
/// One document describes one network of one blockchain and every endpoint
/// serving it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExporterConfig {
    pub blockchain: String,

    /// EVM-style chain id. Required by `evm`, `evmhttp`, `conflux` and `tron`.
    #[serde(default)]
    pub chain_id: Option<u64>,

    pub network_name: String,

    pub network_type: NetworkType,

    /// Chain family name, resolved together with `blockchain`.
    pub collector: String,

    #[serde(default)]
    pub integration_maturity: Option<String>,

    #[serde(default)]
    pub canonical_name: Option<String>,

    #[serde(default)]
    pub chain_selector: Option<u64>,

    #[serde(default)]
    pub connection_parameters: ConnectionParameters,

    pub endpoints: Vec<EndpointConfig>,

    /// Providers permitted in `endpoints`. `None` means unrestricted.
    #[serde(default)]
    pub allowed_providers: Option<Vec<String>>,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub scrape: ScrapeConfig,
}

#[derive(Debug, Deserialize)]
struct ValidationDocument {
    allowed_providers: Vec<String>,
}

impl ExporterConfig {
    /// Loads configuration from a file with environment variable overrides.
    ///
    /// Environment variables with the `BRPC__` prefix override any value. Use `__` as
    /// the separator for nested fields (e.g. `BRPC__SERVER__BIND_PORT=9000`).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] if the file cannot be read, parsed, or deserialized.
    pub fn from_file<P: AsRef<Path>>(config_path: P) -> Result<Self, ConfigError> {
        let source = File::with_name(&config_path.as_ref().to_string_lossy()).required(true);
        Self::build(Self::builder_with_defaults()?.add_source(source))
    }

    /// Parses configuration from an in-memory YAML document, still honouring
    /// `BRPC__` overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] if the document is malformed.
    pub fn from_yaml_str(document: &str) -> Result<Self, ConfigError> {
        Self::build(
            Self::builder_with_defaults()?.add_source(File::from_str(document, FileFormat::Yaml)),
        )
    }

    /// Loads the main document and, when it carries no `allowed_providers`, the
    /// validation document. Paths come from `BRPC_CONFIG` / `CONFIG_FILE_PATH` and
    /// `BRPC_VALIDATION_FILE` / `VALIDATION_FILE_PATH`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if either document cannot be loaded.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = env_path(&["BRPC_CONFIG", "CONFIG_FILE_PATH"], DEFAULT_CONFIG_PATH);
        let validation_path =
            env_path(&["BRPC_VALIDATION_FILE", "VALIDATION_FILE_PATH"], DEFAULT_VALIDATION_PATH);

        Self::from_file(&config_path)?.with_validation_file(validation_path)
    }

    /// Fills `allowed_providers` from a validation document if it is still unset.
    ///
    /// A missing file leaves providers unrestricted; a present but malformed file
    /// is an error.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationFile`] if the file exists but is malformed.
    pub fn with_validation_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        if self.allowed_providers.is_some() || !path.as_ref().exists() {
            return Ok(self);
        }

        let path = path.as_ref().to_string_lossy().into_owned();
        let document: ValidationDocument = Config::builder()
            .add_source(File::with_name(&path).required(true))
            .build()
            .and_then(Config::try_deserialize)
            .map_err(|source| ConfigError::ValidationFile { path: path.clone(), source })?;

        self.allowed_providers = Some(document.allowed_providers);
        Ok(self)
    }

    fn builder_with_defaults(
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Ok(Config::builder()
            .set_default("server.bind_address", default_bind_address())?
            .set_default("server.bind_port", i64::from(default_bind_port()))?
            .set_default("logging.level", default_log_level())?
            .set_default("logging.format", default_log_format())?
            .set_default("scrape.namespace", default_namespace())?)
    }

    fn build(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        Ok(builder
            .add_source(Environment::with_prefix("BRPC").separator("__"))
            .build()?
            .try_deserialize()?)
    }

    /// Resolves the chain family from `collector` and `blockchain`.
    ///
    /// # Errors
    ///
    /// Returns a message naming the unsupported pair.
    pub fn chain_family(&self) -> Result<ChainFamily, String> {
        ChainFamily::resolve(&self.collector, &self.blockchain).map_err(|e| e.to_string())
    }

    /// Validates the configuration, reporting every violation at once.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] listing each problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();

        if self.blockchain.trim().is_empty() {
            problems.push("blockchain must not be empty".to_string());
        }
        if self.network_name.trim().is_empty() {
            problems.push("network_name must not be empty".to_string());
        }
        if self.endpoints.is_empty() {
            problems.push("at least one endpoint must be configured".to_string());
        }
        if self.server.bind_port == 0 {
            problems.push("server.bind_port must be greater than 0".to_string());
        }
        if !matches!(self.logging.format.as_str(), "json" | "pretty") {
            problems.push(format!("logging.format must be json or pretty, got {}", self.logging.format));
        }
        if self.scrape.max_workers == Some(0) {
            problems.push("scrape.max_workers must be greater than 0".to_string());
        }
        if self.scrape.namespace.is_empty() ||
            !self.scrape.namespace.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            problems.push(format!("scrape.namespace is not a valid metric prefix: {}", self.scrape.namespace));
        }

        let params = &self.connection_parameters;
        for (name, value) in [
            ("open_timeout", params.open_timeout),
            ("response_timeout", params.response_timeout),
            ("ping_interval", params.ping_interval),
            ("ping_timeout", params.ping_timeout),
            ("idle_timeout", params.idle_timeout),
            ("reconnect_delay", params.reconnect_delay),
        ] {
            if value == 0 {
                problems.push(format!("connection_parameters.{name} must be greater than 0"));
            }
        }
        if params.reconnect_delay_max < params.reconnect_delay {
            problems.push(
                "connection_parameters.reconnect_delay_max must not be below reconnect_delay"
                    .to_string(),
            );
        }

        let family = match self.chain_family() {
            Ok(family) => Some(family),
            Err(e) => {
                problems.push(e);
                None
            }
        };

        if let Some(family) = family {
            if family.requires_chain_id() && self.chain_id.is_none() {
                problems.push(format!("collector {} requires chain_id", self.collector));
            }
        }

        let mut seen = HashSet::new();
        for endpoint in &self.endpoints {
            let url = endpoint.url.as_str();
            let host = crate::utils::redacted_host(url);

            if !["https://", "wss://", "ws://", "http://"].iter().any(|s| url.starts_with(s)) {
                problems.push(format!("endpoint {host}: url must start with https://, wss:// or ws://"));
            } else if url::Url::parse(url).is_err() {
                problems.push(format!("endpoint {host}: url is not parseable"));
            } else if let Some(family) = family {
                let websocket = url.starts_with("ws://") || url.starts_with("wss://");
                match family.transport() {
                    TransportKind::Subscription | TransportKind::WebSocketQuery if !websocket => {
                        problems.push(format!(
                            "endpoint {host}: collector {} needs a ws:// or wss:// url",
                            self.collector
                        ));
                    }
                    TransportKind::Https if websocket => {
                        problems.push(format!(
                            "endpoint {host}: collector {} needs an https:// url",
                            self.collector
                        ));
                    }
                    _ => {}
                }
            }

            if endpoint.provider.trim().is_empty() {
                problems.push(format!("endpoint {host}: provider must not be empty"));
            }
            if let Some(allowed) = &self.allowed_providers {
                if !allowed.iter().any(|p| p == &endpoint.provider) {
                    problems.push(format!(
                        "endpoint {host}: provider {} is not in allowed_providers",
                        endpoint.provider
                    ));
                }
            }
            if !seen.insert(url) {
                problems.push(format!("endpoint {host}: url is configured more than once"));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(problems))
        }
    }
}

fn env_path(vars: &[&str], fallback: &str) -> String {
    vars.iter()
        .find_map(|name| std::env::var(name).ok().filter(|v| !v.is_empty()))
        .unwrap_or_else(|| fallback.to_string())
}

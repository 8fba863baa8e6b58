use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Plugin discovery and execution
    #[serde(default)]
    pub enrichers: EnrichersConfig,

    /// Result cache backend
    #[serde(default)]
    pub cache: CacheConfig,

    /// Outbound result delivery
    #[serde(default)]
    pub webhook: WebhookConfig,

    /// API key table
    #[serde(default)]
    pub api: ApiConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from embedded defaults, an optional file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ));

        // Override with config file (format picked from its extension)
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path.to_path_buf()).required(true));
        }

        builder
            // Override with environment variables (e.g. ENRICHER_SERVER__PORT)
            .add_source(
                config::Environment::with_prefix("ENRICHER")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Socket address the HTTP listener binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichersConfig {
    /// Root directory holding one subdirectory per plugin
    #[serde(default = "default_enrichers_path")]
    pub path: PathBuf,

    /// Manifest file name inside each plugin directory
    #[serde(default = "default_manifest_file")]
    pub manifest_file: String,

    /// Maximum plugins executed at once per request (0 = unbounded)
    #[serde(default = "default_max_concurrent_plugins")]
    pub max_concurrent: usize,

    /// Execution deadline for plugins that declare none (seconds, 0 = unbounded)
    #[serde(default = "default_execution_timeout")]
    pub default_execution_timeout_secs: u64,
}

impl EnrichersConfig {
    pub fn default_execution_timeout(&self) -> Duration {
        Duration::from_secs(self.default_execution_timeout_secs)
    }
}

impl Default for EnrichersConfig {
    fn default() -> Self {
        Self {
            path: default_enrichers_path(),
            manifest_file: default_manifest_file(),
            max_concurrent: default_max_concurrent_plugins(),
            default_execution_timeout_secs: default_execution_timeout(),
        }
    }
}

/// An empty `address` selects the in-process cache
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Redis `host:port` (or full `redis://` URL)
    #[serde(default)]
    pub address: String,

    /// Redis password
    #[serde(default)]
    pub password: String,

    /// Redis database index
    #[serde(default)]
    pub db: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Per-delivery HTTP timeout (seconds, 0 = unbounded)
    #[serde(default = "default_webhook_timeout")]
    pub timeout_secs: u64,

    /// Maximum deliveries in flight per request (0 = unbounded)
    #[serde(default = "default_max_concurrent_deliveries")]
    pub max_concurrent: usize,

    /// User-Agent header sent with every delivery
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_webhook_timeout(),
            max_concurrent: default_max_concurrent_deliveries(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Accepted API keys
    #[serde(default)]
    pub keys: Vec<ApiKey>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKey {
    /// Value expected in the `Authorization` header
    pub key: String,

    /// Owner of the key, used in logs
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,

    /// Enable Prometheus metrics
    #[serde(default = "default_true")]
    pub prometheus_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
            prometheus_enabled: true,
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_enrichers_path() -> PathBuf {
    PathBuf::from("enrichers")
}

fn default_manifest_file() -> String {
    "settings.json".to_string()
}

fn default_max_concurrent_plugins() -> usize {
    16
}

fn default_execution_timeout() -> u64 {
    30
}

fn default_webhook_timeout() -> u64 {
    10
}

fn default_max_concurrent_deliveries() -> usize {
    8
}

fn default_user_agent() -> String {
    format!("enricher/{}", env!("CARGO_PKG_VERSION"))
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

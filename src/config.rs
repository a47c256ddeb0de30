//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::ApiConfig;
use crate::livetrack::LiveTrackConfig;
use crate::share::ShareIdPolicy;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub livetrack: LiveTrackSection,

    #[serde(default)]
    pub share: ShareConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Public origin used to build share links
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8082
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_batch_size() -> usize {
    50
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
            max_batch_size: default_max_batch_size(),
        }
    }
}

impl ServerConfig {
    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            host: self.host.clone(),
            port: self.port,
            request_timeout_ms: self.request_timeout_secs * 1000,
            max_batch_size: self.max_batch_size,
            cors_origins: self.cors_origins.clone(),
            ..Default::default()
        }
    }
}

/// LiveTrack upstream configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LiveTrackSection {
    #[serde(default = "default_graphql_url")]
    pub graphql_url: String,

    #[serde(default)]
    pub user_agent: Option<String>,

    #[serde(default = "default_upstream_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_track_point_limit")]
    pub track_point_limit: u32,

    /// Live polling interval
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Redirect hops followed when expanding short links
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

fn default_graphql_url() -> String {
    LiveTrackConfig::default().graphql_url
}

fn default_upstream_timeout() -> u64 {
    15
}

fn default_track_point_limit() -> u32 {
    3000
}

fn default_poll_interval() -> u64 {
    15
}

fn default_max_redirects() -> usize {
    10
}

impl Default for LiveTrackSection {
    fn default() -> Self {
        Self {
            graphql_url: default_graphql_url(),
            user_agent: None,
            request_timeout_secs: default_upstream_timeout(),
            track_point_limit: default_track_point_limit(),
            poll_interval_secs: default_poll_interval(),
            max_redirects: default_max_redirects(),
        }
    }
}

impl LiveTrackSection {
    pub fn client_config(&self) -> LiveTrackConfig {
        let defaults = LiveTrackConfig::default();
        LiveTrackConfig {
            graphql_url: self.graphql_url.clone(),
            user_agent: self.user_agent.clone().unwrap_or(defaults.user_agent),
            request_timeout_ms: self.request_timeout_secs * 1000,
            track_point_limit: self.track_point_limit,
            origin: defaults.origin,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

/// Share store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ShareConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    #[serde(default = "default_share_id_length")]
    pub share_id_length: usize,

    #[serde(default = "default_max_id_attempts")]
    pub max_id_attempts: usize,
}

fn default_data_dir() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("trackgrid").to_string_lossy().to_string())
        .unwrap_or_else(|| "./trackgrid_data".to_string())
}

fn default_share_id_length() -> usize {
    4
}

fn default_max_id_attempts() -> usize {
    10
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            share_id_length: default_share_id_length(),
            max_id_attempts: default_max_id_attempts(),
        }
    }
}

impl ShareConfig {
    /// Data directory with a leading `~/` expanded
    pub fn data_path(&self) -> PathBuf {
        match self.data_dir.strip_prefix("~/") {
            Some(rest) => dirs::home_dir()
                .map(|home| home.join(rest))
                .unwrap_or_else(|| PathBuf::from(&self.data_dir)),
            None => PathBuf::from(&self.data_dir),
        }
    }

    pub fn id_policy(&self) -> ShareIdPolicy {
        ShareIdPolicy {
            length: self.share_id_length.max(1),
            max_attempts: self.max_id_attempts.max(1),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,

    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        // Try default config locations
        let config_paths = [
            dirs::config_dir().map(|p| p.join("trackgrid").join("config.toml")),
            Some(PathBuf::from("/etc/trackgrid/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        // Fall back to environment-only config
        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // Server overrides
        if let Some(host) = lookup("TRACKGRID_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("TRACKGRID_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(base_url) = lookup("TRACKGRID_BASE_URL") {
            self.server.base_url = base_url;
        }

        // Share overrides
        if let Some(data_dir) = lookup("TRACKGRID_DATA_DIR") {
            self.share.data_dir = data_dir;
        }

        // LiveTrack overrides
        if let Some(url) = lookup("TRACKGRID_GRAPHQL_URL") {
            self.livetrack.graphql_url = url;
        }
        if let Some(secs) = lookup("TRACKGRID_POLL_INTERVAL_SECS").and_then(|s| s.parse().ok()) {
            self.livetrack.poll_interval_secs = secs;
        }

        // Logging overrides
        if let Some(level) = lookup("TRACKGRID_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("TRACKGRID_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Trackgrid Configuration
#
# Environment variables override these settings:
# - TRACKGRID_HOST
# - TRACKGRID_PORT
# - TRACKGRID_BASE_URL
# - TRACKGRID_DATA_DIR
# - TRACKGRID_GRAPHQL_URL
# - TRACKGRID_POLL_INTERVAL_SECS
# - TRACKGRID_LOG_LEVEL
# - TRACKGRID_LOG_FORMAT

[server]
# API server host
host = "0.0.0.0"

# API server port
port = 8082

# Allowed CORS origins (empty allows any origin)
cors_origins = []

# Public origin of the dashboard, used in share links
base_url = "http://localhost:3000"

# Request timeout in seconds
request_timeout_secs = 30

# Maximum URLs or athletes per batch request
max_batch_size = 50

[livetrack]
# LiveTrack GraphQL endpoint
graphql_url = "https://livetrack.garmin.com/apollo/graphql"

# Upstream request timeout in seconds
request_timeout_secs = 15

# Maximum track points per request
track_point_limit = 3000

# Live polling interval in seconds
poll_interval_secs = 15

# Redirect hops followed when expanding short links
max_redirects = 10

[share]
# Directory holding shares.db
data_dir = "~/.local/share/trackgrid"

# Length of generated share ids
share_id_length = 4

# Attempts before giving up on a unique id
max_id_attempts = 10

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"

# Optional log file path
# file = "/var/log/trackgrid/trackgrid.log"
"#
    .to_string()
}

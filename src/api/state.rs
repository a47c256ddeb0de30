//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use std::sync::Arc;
use std::time::Instant;

use crate::athlete::RosterLoader;
use crate::livetrack::{LinkExpander, TrackingFetcher};
use crate::share::ShareService;

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Tracking data fetcher over the LiveTrack source
    pub fetcher: TrackingFetcher,
    /// Short link expander
    pub expander: Arc<dyn LinkExpander>,
    /// Builds athlete lists from input links
    pub roster: RosterLoader,
    /// Share store
    pub shares: Arc<ShareService>,
    /// API configuration
    pub config: Arc<ApiConfig>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        fetcher: TrackingFetcher,
        expander: Arc<dyn LinkExpander>,
        shares: Arc<ShareService>,
        config: ApiConfig,
    ) -> Self {
        Self {
            roster: RosterLoader::new(fetcher.clone(), expander.clone()),
            fetcher,
            expander,
            shares,
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
    /// Maximum request body size in bytes
    pub max_body_size: usize,
    /// Maximum URLs or athletes in one batch request
    pub max_batch_size: usize,
    /// Allowed CORS origins; empty allows any
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8082,
            request_timeout_ms: 30_000,
            max_body_size: 1024 * 1024, // 1MB
            max_batch_size: 50,
            cors_origins: Vec::new(),
        }
    }
}

impl ApiConfig {
    /// Create config with custom host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

//! # Trackgrid
//!
//! Backend for a live-tracking dashboard that follows several athletes at
//! once through Garmin LiveTrack.
//!
//! ## Features
//!
//! - **Link handling**: classify, parse and expand LiveTrack links
//! - **Tracking**: session, track points and course over GraphQL, fetched
//!   concurrently with per-athlete failure isolation
//! - **Statistics**: distance, duration, speed, elevation and heart rate
//! - **Live updates**: incremental polling that only appends newer samples
//! - **Shares**: grid and multi-track layouts stored under short ids,
//!   deduplicated by content hash
//!
//! ## Modules
//!
//! - [`livetrack`]: LiveTrack URLs, GraphQL client and batch fetching
//! - [`athlete`]: athlete model, roster loading and statistics
//! - [`live`]: the polling tracker
//! - [`share`]: share hashing, ids and persistence
//! - [`api`]: REST API server with Axum
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use trackgrid::athlete::{calculate_stats, format_distance};
//! use trackgrid::livetrack::{parse_session_url, LiveTrackClient, LiveTrackConfig, TrackingFetcher};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = LiveTrackClient::new(LiveTrackConfig::default())?;
//!     let fetcher = TrackingFetcher::new(Arc::new(client));
//!
//!     let url = "https://livetrack.garmin.com/session/abc/token/XYZ";
//!     let session = parse_session_url(url).ok_or("not a session link")?;
//!     let data = fetcher.fetch(&session, None).await?;
//!
//!     if let Some(stats) = calculate_stats(&data.coordinates) {
//!         println!("{}: {}", data.profile.name, format_distance(stats.total_distance));
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod athlete;
pub mod config;
pub mod live;
pub mod livetrack;
pub mod share;

// Re-export top-level types for convenience
pub use api::{build_router, serve, ApiConfig, ApiError, AppState};

pub use athlete::{calculate_stats, Athlete, AthleteStats, Coordinate, Roster, RosterLoader};

pub use config::{Config, ConfigError, LoggingConfig};

pub use live::{LiveTracker, TickReport, TrackerState};

pub use livetrack::{
    HttpLinkExpander, LinkExpander, LiveTrackClient, LiveTrackConfig, LiveTrackError, SessionRef,
    TrackingData, TrackingFetcher, TrackingSource,
};

pub use share::{GridState, MultiTrackState, ShareError, ShareKind, ShareService};

//! Trackgrid API Server
//!
//! Run with: cargo run --bin trackgrid -- --config ./config.toml
//!
//! # Configuration
//!
//! Settings come from the TOML file given with `--config`, or from the
//! default search path, with `TRACKGRID_*` environment overrides on top.
//! `RUST_LOG` takes precedence over `logging.level`.

use anyhow::Context;
use clap::Parser;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use trackgrid::api::{serve, AppState};
use trackgrid::config::{Config, LoggingConfig};
use trackgrid::livetrack::{HttpLinkExpander, LiveTrackClient, TrackingFetcher};
use trackgrid::share::{ShareService, SqliteShareRepository};

#[derive(Parser)]
#[command(name = "trackgrid")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Live-tracking dashboard backend")]
struct Args {
    /// Config file (default: search the standard locations)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listen port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };

    init_logging(&config.logging)?;

    tracing::info!("Starting Trackgrid API server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("LiveTrack endpoint: {}", config.livetrack.graphql_url);

    // Upstream clients
    let client = Arc::new(
        LiveTrackClient::new(config.livetrack.client_config())
            .context("Failed to build LiveTrack client")?,
    );
    let expander = Arc::new(
        HttpLinkExpander::new(config.livetrack.request_timeout(), config.livetrack.max_redirects)
            .context("Failed to build link expander")?,
    );

    // Share store
    let data_dir = config.share.data_path();
    tracing::info!("Data directory: {:?}", data_dir);
    let repo = Arc::new(
        SqliteShareRepository::open(&data_dir).context("Failed to open share database")?,
    );
    let shares = Arc::new(
        ShareService::new(repo, config.server.base_url.clone())
            .with_id_policy(config.share.id_policy()),
    );

    let mut api_config = config.server.api_config();
    if let Some(port) = args.port {
        api_config.port = port;
    }

    let state = AppState::new(
        TrackingFetcher::new(client),
        expander,
        shares,
        api_config.clone(),
    );

    // Run server
    tracing::info!("Starting server on {}:{}", api_config.host, api_config.port);
    serve(state, &api_config).await?;

    tracing::info!("Trackgrid API server stopped");
    Ok(())
}

/// Pretty or JSON output, to stdout or an append-only log file
fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("trackgrid={},tower_http=info", config.level))
    });
    let registry = tracing_subscriber::registry().with(filter);

    let file = match &config.file {
        Some(path) => Some(
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path))?,
        ),
        None => None,
    };

    match (config.format.as_str(), file) {
        ("json", Some(file)) => registry
            .with(fmt::layer().json().with_writer(Mutex::new(file)))
            .init(),
        ("json", None) => registry.with(fmt::layer().json()).init(),
        (_, Some(file)) => registry
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .init(),
        (_, None) => registry.with(fmt::layer()).init(),
    }

    Ok(())
}

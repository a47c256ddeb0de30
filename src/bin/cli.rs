//! Trackgrid CLI
//!
//! Command-line interface for Trackgrid operations:
//! - Inspect and expand LiveTrack links
//! - Fetch a session and print its statistics
//! - Follow several athletes live from the terminal
//! - Create and resolve shares against a running API server

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use trackgrid::athlete::{
    calculate_stats, format_distance, format_duration, format_elevation, format_speed,
    parse_url_list, Athlete, RosterLoader,
};
use trackgrid::config::{generate_default_config, Config};
use trackgrid::live::LiveTracker;
use trackgrid::livetrack::{
    classify_url, expand_batch, parse_session_url, resolve_session_url, HttpLinkExpander,
    LiveTrackClient, TrackingFetcher, UrlKind,
};

#[derive(Parser)]
#[command(name = "trackgrid-cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Garmin LiveTrack links, athlete stats and shares from the terminal")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: search the standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// API server URL
    #[arg(long, default_value = "http://localhost:8082", global = true)]
    pub api_url: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Classify links and show their session id and token, offline
    Parse {
        /// LiveTrack links
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Expand short links by following redirects
    Expand {
        /// LiveTrack links
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Fetch one session and print its statistics
    Fetch {
        /// LiveTrack link, short or long form
        url: String,
        /// Print the raw tracking data as JSON
        #[arg(long)]
        json: bool,
    },

    /// Load athletes and poll them for new track points until Ctrl+C
    Watch {
        /// LiveTrack links
        urls: Vec<String>,
        /// Read more links from a file, one per line
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Poll interval in seconds (default: from config)
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// Create a multi-track share on the API server
    Share {
        /// LiveTrack links, in display order
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Resolve a share id on the API server
    Resolve {
        /// Share id
        share_id: String,
        /// Resolve a multi-track share instead of a grid
        #[arg(short, long)]
        multi_track: bool,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::from_env(),
    };

    match cli.command {
        Commands::Parse { urls } => {
            for url in urls {
                match classify_url(&url) {
                    UrlKind::LongForm => match parse_session_url(&url) {
                        Some(session) => println!(
                            "{}\n  session: {}\n  token:   {}",
                            url, session.session_id, session.token
                        ),
                        None => println!("{}\n  long form, but no session id and token", url),
                    },
                    UrlKind::ShortLink => println!("{}\n  short link, expand to resolve", url),
                    UrlKind::Unsupported => println!("{}\n  not a LiveTrack link", url),
                }
            }
        }

        Commands::Expand { urls } => {
            let expander = link_expander(&config)?;
            for outcome in expand_batch(&expander, &urls).await {
                match (outcome.expanded_url, outcome.error) {
                    (Some(expanded), _) => println!("{} -> {}", outcome.original_url, expanded),
                    (None, error) => eprintln!(
                        "{} failed: {}",
                        outcome.original_url,
                        error.unwrap_or_else(|| "unknown error".to_string())
                    ),
                }
            }
        }

        Commands::Fetch { url, json } => {
            let expander = link_expander(&config)?;
            let Some(session) = resolve_session_url(&expander, &url).await else {
                bail!("Could not extract a session id and token from {}", url);
            };

            let fetcher = tracking_fetcher(&config)?;
            let data = fetcher
                .fetch(&session, None)
                .await
                .with_context(|| format!("Failed to fetch session {}", session.session_id))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&data)?);
                return Ok(());
            }

            println!("{} ({})", data.profile.name, data.profile.location);
            if let Some(name) = &data.profile.session_name {
                println!("Session: {}", name);
            }
            println!(
                "Track points: {}   Course points: {}",
                data.coordinates.len(),
                data.course_points.len()
            );

            match calculate_stats(&data.coordinates) {
                Some(stats) => {
                    println!();
                    println!("{:<16} {}", "Activity", stats.activity_type);
                    println!("{:<16} {}", "Distance", format_distance(stats.total_distance));
                    println!("{:<16} {}", "Duration", format_duration(stats.total_time));
                    println!("{:<16} {}", "Avg speed", format_speed(stats.avg_speed));
                    println!("{:<16} {}", "Max speed", format_speed(stats.max_speed));
                    println!(
                        "{:<16} +{} / -{}",
                        "Elevation",
                        format_elevation(stats.elevation_gain),
                        format_elevation(stats.elevation_loss)
                    );
                    if stats.avg_heart_rate > 0.0 {
                        println!(
                            "{:<16} {:.0} avg / {:.0} max bpm",
                            "Heart rate", stats.avg_heart_rate, stats.max_heart_rate
                        );
                    }
                }
                None => println!("Not enough track points for statistics yet."),
            }
        }

        Commands::Watch {
            urls,
            file,
            interval,
        } => {
            let mut links: Vec<String> = urls.iter().flat_map(|u| parse_url_list(u)).collect();
            if let Some(path) = file {
                let text = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {:?}", path))?;
                links.extend(parse_url_list(&text));
            }
            if links.is_empty() {
                bail!("No LiveTrack links given");
            }

            let fetcher = tracking_fetcher(&config)?;
            let expander = Arc::new(link_expander(&config)?);
            let roster = RosterLoader::new(fetcher.clone(), expander).load(&links).await;
            println!("Loaded {}/{} athletes", roster.loaded_count(), links.len());

            let interval = interval
                .map(std::time::Duration::from_secs)
                .unwrap_or_else(|| config.livetrack.poll_interval());
            let tracker = LiveTracker::new(fetcher, interval);
            tracker.replace_athletes(roster.athletes).await;
            tracker.go_live().await;

            print_athletes(&tracker.snapshot().await);

            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => print_athletes(&tracker.snapshot().await),
                    _ = tokio::signal::ctrl_c() => break,
                }
            }
            tracker.pause();
        }

        Commands::Share { urls } => {
            let client = reqwest::Client::new();
            let response = client
                .post(format!("{}/api/v1/share/multi-track", cli.api_url))
                .json(&serde_json::json!({ "urls": urls }))
                .send()
                .await
                .with_context(|| format!("Cannot connect to Trackgrid API at {}", cli.api_url))?;

            let status = response.status();
            let body: serde_json::Value = response.json().await?;
            if !status.is_success() {
                bail!(
                    "Share failed ({}): {}",
                    status,
                    body["error"].as_str().unwrap_or("unknown error")
                );
            }

            let existing = body["isExisting"].as_bool().unwrap_or(false);
            println!(
                "{} share {}",
                if existing { "Existing" } else { "Created" },
                body["shareId"].as_str().unwrap_or("-")
            );
            println!("{}", body["shareUrl"].as_str().unwrap_or("-"));
        }

        Commands::Resolve {
            share_id,
            multi_track,
        } => {
            let kind = if multi_track { "multi-track" } else { "grid" };
            let client = reqwest::Client::new();
            let response = client
                .get(format!("{}/api/v1/share/{}/{}", cli.api_url, kind, share_id))
                .send()
                .await
                .with_context(|| format!("Cannot connect to Trackgrid API at {}", cli.api_url))?;

            let status = response.status();
            let body: serde_json::Value = response.json().await?;
            if !status.is_success() {
                bail!(
                    "Resolve failed ({}): {}",
                    status,
                    body["error"].as_str().unwrap_or("unknown error")
                );
            }

            let data = &body["data"];
            if multi_track {
                for (i, url) in data["urls"].as_array().into_iter().flatten().enumerate() {
                    println!("{:>3}. {}", i + 1, url.as_str().unwrap_or("-"));
                }
            } else {
                println!(
                    "Grid {}x{}",
                    data["rows"].as_u64().unwrap_or(0),
                    data["cols"].as_u64().unwrap_or(0)
                );
                if let Some(cells) = data["cellData"].as_object() {
                    for (key, cell) in cells {
                        println!("  {:<6} {}", key, cell["url"].as_str().unwrap_or(""));
                    }
                }
            }
        }

        Commands::Config { output } => {
            let config = generate_default_config();

            match output {
                Some(path) => {
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, &config)?;
                    println!("Config written to {:?}", path);
                }
                None => {
                    print!("{}", config);
                }
            }
        }
    }

    Ok(())
}

fn link_expander(config: &Config) -> anyhow::Result<HttpLinkExpander> {
    Ok(HttpLinkExpander::new(
        config.livetrack.request_timeout(),
        config.livetrack.max_redirects,
    )?)
}

fn tracking_fetcher(config: &Config) -> anyhow::Result<TrackingFetcher> {
    let client = LiveTrackClient::new(config.livetrack.client_config())?;
    Ok(TrackingFetcher::new(Arc::new(client)))
}

fn print_athletes(athletes: &[Athlete]) {
    println!();
    println!(
        "{:<24} {:>7} {:>10} {:>10} {:>12}",
        "Athlete", "Points", "Distance", "Duration", "Last sample"
    );
    println!("{}", "-".repeat(67));

    for athlete in athletes {
        if let Some(error) = &athlete.error {
            println!("{:<24} {}", truncate(&athlete.profile.name, 24), error);
            continue;
        }

        let (distance, duration) = match calculate_stats(&athlete.coordinates) {
            Some(stats) => (
                format_distance(stats.total_distance),
                format_duration(stats.total_time),
            ),
            None => ("-".to_string(), "-".to_string()),
        };
        let last = athlete
            .latest_timestamp()
            .map(|t| t.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());

        println!(
            "{:<24} {:>7} {:>10} {:>10} {:>12}",
            truncate(&athlete.profile.name, 24),
            athlete.coordinates.len(),
            distance,
            duration,
            last
        );
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max - 1).collect();
        format!("{}…", cut)
    }
}

//! Trackgrid REST API
//!
//! HTTP API layer for Trackgrid, built with Axum.
//!
//! # Endpoints
//!
//! ## Links
//! - `POST /api/v1/expand-url` - Expand a short link
//! - `POST /api/v1/expand-url/batch` - Expand many links
//!
//! ## Tracking
//! - `POST /api/v1/tracking` - Fetch one session
//! - `POST /api/v1/tracking/batch` - Fetch many sessions
//! - `POST /api/v1/tracking/updates/batch` - New track points since a cursor
//! - `POST /api/v1/athletes` - Load athletes from links, with stats
//!
//! ## Shares
//! - `POST /api/v1/share/grid` - Find or create a grid share
//! - `POST /api/v1/share/grid/check` - Check for an existing grid share
//! - `GET /api/v1/share/grid/:shareId` - Resolve a grid share
//! - `POST /api/v1/share/multi-track` - Find or create a multi-track share
//! - `GET /api/v1/share/multi-track/:shareId` - Resolve a multi-track share
//!
//! ## Health
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe
//! - `GET /health` - Full health status
//!
//! # Example
//!
//! ```rust,ignore
//! use trackgrid::api::{serve, ApiConfig, AppState};
//! use trackgrid::livetrack::{HttpLinkExpander, LiveTrackClient, LiveTrackConfig, TrackingFetcher};
//! use trackgrid::share::{ShareService, SqliteShareRepository};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Arc::new(LiveTrackClient::new(LiveTrackConfig::default())?);
//!     let expander = Arc::new(HttpLinkExpander::new(std::time::Duration::from_secs(10), 10)?);
//!     let repo = Arc::new(SqliteShareRepository::open("./data".as_ref())?);
//!     let shares = Arc::new(ShareService::new(repo, "http://localhost:3000"));
//!     let config = ApiConfig::default();
//!
//!     let state = AppState::new(TrackingFetcher::new(client), expander, shares, config.clone());
//!     serve(state, &config).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::{ApiConfig, AppState};

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Link routes
        .route("/expand-url", post(routes::expand::expand_url))
        .route("/expand-url/batch", post(routes::expand::expand_url_batch))
        // Tracking routes
        .route("/tracking", post(routes::tracking::fetch_tracking))
        .route("/tracking/batch", post(routes::tracking::fetch_tracking_batch))
        .route("/tracking/updates/batch", post(routes::tracking::fetch_updates_batch))
        .route("/athletes", post(routes::athletes::load_athletes))
        // Share routes
        .route("/share/grid", post(routes::share::create_grid_share))
        .route("/share/grid/check", post(routes::share::check_grid_share))
        .route("/share/grid/:share_id", get(routes::share::get_grid_share))
        .route("/share/multi-track", post(routes::share::create_multi_track_share))
        .route("/share/multi-track/:share_id", get(routes::share::get_multi_track_share))
        .layer(DefaultBodyLimit::max(state.config.max_body_size));

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/ready", get(routes::health::readiness))
        .route("/", get(routes::health::full_health));

    let cors = cors_layer(&state.config.cors_origins);
    let timeout = Duration::from_millis(state.config.request_timeout_ms);

    // Create shared state
    let shared_state = Arc::new(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .nest("/health", health_routes)
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(shared_state)
}

/// Permissive when no origins are configured
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}

/// Start the API server
pub async fn serve(state: AppState, config: &ApiConfig) -> Result<(), ApiError> {
    let router = build_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Trackgrid API listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("Trackgrid API shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::livetrack::testing::*;
    use crate::livetrack::{LinkExpander, LiveTrackResult, TrackingFetcher};
    use crate::share::{MemoryShareRepository, ShareService};
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    /// Expands every short link to the session named by its last path segment
    struct StaticExpander;

    #[async_trait]
    impl LinkExpander for StaticExpander {
        async fn expand(&self, url: &str) -> LiveTrackResult<String> {
            let id = url.rsplit('/').next().unwrap_or_default();
            Ok(format!("https://livetrack.garmin.com/session/{}/token/tok", id))
        }
    }

    fn create_test_app() -> Router {
        let source = FakeSource::default()
            .with("a", FakeSession { name: Some("Ann".into()), points: vec![point(0), point(10)], ..Default::default() })
            .with("b", FakeSession { session_fails: true, ..Default::default() })
            .with("c", FakeSession { points: vec![point(0), point(10), point(20)], ..Default::default() });

        let shares = ShareService::new(Arc::new(MemoryShareRepository::new()), "https://grid.example");
        let state = AppState::new(
            TrackingFetcher::new(Arc::new(source)),
            Arc::new(StaticExpander),
            Arc::new(shares),
            ApiConfig::default(),
        );
        build_router(state)
    }

    async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        read(response).await
    }

    async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("Content-Type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        read(response).await
    }

    async fn read(response: axum::response::Response) -> (StatusCode, Value) {
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        let app = create_test_app();

        let (status, _) = get(&app, "/health/live").await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = get(&app, "/health/ready").await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = get(&app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["shareCount"], 0);
    }

    #[tokio::test]
    async fn test_expand_url() {
        let app = create_test_app();

        let (status, body) = post_json(&app, "/api/v1/expand-url", json!({"url": "https://gar.mn/a"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["expandedUrl"], "https://livetrack.garmin.com/session/a/token/tok");

        let (status, body) = post_json(&app, "/api/v1/expand-url", json!({"url": "https://example.com/foo"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "UNSUPPORTED_URL");
        assert!(body["requestId"].is_string());
    }

    #[tokio::test]
    async fn test_expand_batch_keeps_order() {
        let app = create_test_app();

        let (status, body) = post_json(
            &app,
            "/api/v1/expand-url/batch",
            json!({"urls": ["https://gar.mn/a", "ftp://gar.mn/x", "https://gar.mn/c"]}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let results = body["results"].as_array().unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0]["success"], true);
        assert_eq!(results[1]["success"], false);
        assert_eq!(results[2]["expandedUrl"], "https://livetrack.garmin.com/session/c/token/tok");
    }

    #[tokio::test]
    async fn test_tracking_single() {
        let app = create_test_app();

        let (status, body) = post_json(&app, "/api/v1/tracking", json!({"sessionId": "a", "token": "tok"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["profile"]["name"], "Ann");
        assert_eq!(body["metadata"]["pointCount"], 2);
        assert_eq!(body["metadata"]["stats"]["totalTime"], 10.0);

        let (status, body) = post_json(&app, "/api/v1/tracking", json!({"sessionId": "b", "token": "tok"})).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "UPSTREAM_REJECTED");

        let (status, _) = post_json(&app, "/api/v1/tracking", json!({"sessionId": "a", "token": ""})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_tracking_batch_one_result_per_item() {
        let app = create_test_app();

        let (status, body) = post_json(
            &app,
            "/api/v1/tracking/batch",
            json!({"athletes": [
                {"sessionId": "a", "token": "tok"},
                {"sessionId": "b", "token": "tok"},
                {"sessionId": "a", "token": "tok"},
            ]}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let results = body["results"].as_array().unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0]["success"], true);
        assert_eq!(results[1]["success"], false);
        assert!(results[1]["error"].as_str().unwrap().contains("Session expired"));
        assert_eq!(results[2]["sessionId"], "a");
        assert_eq!(results[2]["success"], true);
    }

    #[tokio::test]
    async fn test_updates_batch() {
        let app = create_test_app();
        let begin = at(10).to_rfc3339();

        let (status, body) = post_json(
            &app,
            "/api/v1/tracking/updates/batch",
            json!({"athletes": [{"sessionId": "c", "token": "tok", "begin": begin}]}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["results"][0]["coordinates"].as_array().unwrap().len(), 2);

        let (status, _) = post_json(
            &app,
            "/api/v1/tracking/updates/batch",
            json!({"athletes": [{"sessionId": "c", "token": "tok"}]}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_load_athletes() {
        let app = create_test_app();

        let (status, body) = post_json(
            &app,
            "/api/v1/athletes",
            json!({"text": "https://livetrack.garmin.com/session/a/token/tok\nhttps://example.com/x\n"}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["loaded"], 1);
        let athletes = body["athletes"].as_array().unwrap();
        assert_eq!(athletes.len(), 2);
        assert_eq!(athletes[0]["profile"]["name"], "Ann");
        assert!(athletes[0]["stats"].is_object());
        assert_eq!(athletes[1]["error"], "Failed to parse URL");
        assert!(body["mapCenter"].is_object());

        let (status, _) = post_json(&app, "/api/v1/athletes", json!({"urls": []})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_grid_share_flow() {
        let app = create_test_app();
        let grid = json!({"gridState": {
            "rows": 1,
            "cols": 2,
            "cellData": {"0-0": {"url": "https://a.example", "isEditing": true}, "0-1": {"url": "https://b.example"}}
        }});

        let (status, body) = post_json(&app, "/api/v1/share/grid/check", grid.clone()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["hasExisting"], false);

        let (status, created) = post_json(&app, "/api/v1/share/grid", grid.clone()).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["isExisting"], false);
        let share_id = created["shareId"].as_str().unwrap().to_string();
        assert_eq!(created["shareUrl"], format!("https://grid.example/share/{}", share_id));

        let (status, again) = post_json(&app, "/api/v1/share/grid", grid.clone()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(again["shareId"], share_id.as_str());

        let (_, body) = post_json(&app, "/api/v1/share/grid/check", grid).await;
        assert_eq!(body["hasExisting"], true);
        assert_eq!(body["shareId"], share_id.as_str());

        let (status, body) = get(&app, &format!("/api/v1/share/grid/{}", share_id)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["cols"], 2);
        assert_eq!(body["data"]["cellData"]["0-1"]["url"], "https://b.example");

        let (status, body) = get(&app, "/api/v1/share/grid/none").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "SHARE_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_multi_track_share_flow() {
        let app = create_test_app();
        let urls = json!({"urls": ["https://gar.mn/a", "https://gar.mn/b"]});

        let (status, created) = post_json(&app, "/api/v1/share/multi-track", urls).await;
        assert_eq!(status, StatusCode::CREATED);
        let share_id = created["shareId"].as_str().unwrap().to_string();
        assert!(created["shareUrl"].as_str().unwrap().ends_with(&format!("/multi-track/share/{}", share_id)));

        let (status, body) = get(&app, &format!("/api/v1/share/multi-track/{}", share_id)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["urls"], json!(["https://gar.mn/a", "https://gar.mn/b"]));

        let (status, _) = get(&app, &format!("/api/v1/share/grid/{}", share_id)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_grid_state() {
        let app = create_test_app();
        let (status, body) = post_json(
            &app,
            "/api/v1/share/grid",
            json!({"gridState": {"rows": 0, "cols": 2, "cellData": {}}}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_SHARE_STATE");
    }

    #[tokio::test]
    async fn test_invalid_json() {
        let app = create_test_app();
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/tracking")
                    .header("Content-Type", "application/json")
                    .body(Body::from("not json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

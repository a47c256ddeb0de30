//! Expand Routes
//!
//! Short link expansion for LiveTrack links.
//!
//! - POST /api/v1/expand-url - Single URL
//! - POST /api/v1/expand-url/batch - Many URLs, one result each

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::dto::{ExpandBatchRequest, ExpandBatchResponse, ExpandUrlRequest, ExpandUrlResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::livetrack::{expand_batch, is_supported_url, ExpandOutcome, LinkExpander, LiveTrackError};

/// POST /api/v1/expand-url
pub async fn expand_url(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ExpandUrlRequest>,
) -> ApiResult<Json<ExpandUrlResponse>> {
    let url = req.url.trim();
    if url.is_empty() {
        return Err(ApiError::Validation("URL is required".to_string()));
    }
    if !is_supported_url(url) {
        return Err(LiveTrackError::UnsupportedUrl(url.to_string()).into());
    }

    let expanded_url = state.expander.expand(url).await?;

    Ok(Json(ExpandUrlResponse {
        success: true,
        expanded_url,
    }))
}

/// POST /api/v1/expand-url/batch
///
/// Unsupported URLs fail individually without a network call.
pub async fn expand_url_batch(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ExpandBatchRequest>,
) -> ApiResult<Json<ExpandBatchResponse>> {
    if req.urls.is_empty() {
        return Err(ApiError::Validation("URLs array is required".to_string()));
    }
    if req.urls.len() > state.config.max_batch_size {
        return Err(ApiError::Validation(format!(
            "Batch size exceeds maximum of {} URLs",
            state.config.max_batch_size
        )));
    }

    let supported: Vec<String> = req
        .urls
        .iter()
        .map(|u| u.trim().to_string())
        .filter(|u| is_supported_url(u))
        .collect();
    let mut expanded = expand_batch(state.expander.as_ref(), &supported).await.into_iter();

    let results = req
        .urls
        .iter()
        .map(|url| {
            let trimmed = url.trim();
            if is_supported_url(trimmed) {
                // Same order as `supported`
                expanded.next().unwrap_or_else(|| unsupported(url))
            } else {
                unsupported(url)
            }
        })
        .collect();

    Ok(Json(ExpandBatchResponse {
        success: true,
        results,
    }))
}

fn unsupported(url: &str) -> ExpandOutcome {
    ExpandOutcome {
        original_url: url.to_string(),
        success: false,
        expanded_url: None,
        error: Some(LiveTrackError::UnsupportedUrl(url.to_string()).to_string()),
    }
}

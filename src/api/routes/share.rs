//! Share Routes
//!
//! Shareable links for grid layouts and multi-track athlete lists.
//!
//! - POST /api/v1/share/grid - Find or create a grid share
//! - POST /api/v1/share/grid/check - Look up an existing grid share
//! - GET /api/v1/share/grid/:shareId - Resolve a grid share
//! - POST /api/v1/share/multi-track - Find or create a multi-track share
//! - GET /api/v1/share/multi-track/:shareId - Resolve a multi-track share

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::api::dto::{
    DataResponse, GridShareRequest, MultiTrackShareRequest, ShareCheckResponse, ShareResponse,
};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::share::{GridState, MultiTrackState};

/// POST /api/v1/share/grid
///
/// 201 for a new share, 200 when an identical one already exists.
pub async fn create_grid_share(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GridShareRequest>,
) -> ApiResult<(StatusCode, Json<ShareResponse>)> {
    let outcome = state.shares.find_or_create_grid_share(&req.grid_state).await?;
    Ok(share_response(outcome))
}

/// POST /api/v1/share/grid/check
pub async fn check_grid_share(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GridShareRequest>,
) -> ApiResult<Json<ShareCheckResponse>> {
    let outcome = state.shares.check_grid_share(&req.grid_state).await?;
    Ok(Json(ShareCheckResponse {
        success: true,
        has_existing: outcome.is_some(),
        outcome,
    }))
}

/// GET /api/v1/share/grid/:shareId
pub async fn get_grid_share(
    State(state): State<Arc<AppState>>,
    Path(share_id): Path<String>,
) -> ApiResult<Json<DataResponse<GridState>>> {
    let grid = state.shares.resolve_grid(&share_id).await?;
    Ok(Json(DataResponse::ok(grid)))
}

/// POST /api/v1/share/multi-track
pub async fn create_multi_track_share(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MultiTrackShareRequest>,
) -> ApiResult<(StatusCode, Json<ShareResponse>)> {
    let urls: Vec<String> = req
        .urls
        .iter()
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .collect();
    if urls.is_empty() {
        return Err(ApiError::Validation("URLs array is required".to_string()));
    }

    let outcome = state
        .shares
        .find_or_create_multi_track_share(&MultiTrackState::new(urls))
        .await?;
    Ok(share_response(outcome))
}

/// GET /api/v1/share/multi-track/:shareId
pub async fn get_multi_track_share(
    State(state): State<Arc<AppState>>,
    Path(share_id): Path<String>,
) -> ApiResult<Json<DataResponse<MultiTrackState>>> {
    let multi = state.shares.resolve_multi_track(&share_id).await?;
    Ok(Json(DataResponse::ok(multi)))
}

fn share_response(outcome: crate::share::ShareOutcome) -> (StatusCode, Json<ShareResponse>) {
    let status = if outcome.is_existing {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    (
        status,
        Json(ShareResponse {
            success: true,
            outcome,
        }),
    )
}

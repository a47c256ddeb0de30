//! Tracking Routes
//!
//! Fetch LiveTrack data for known sessions.
//!
//! - POST /api/v1/tracking - One session
//! - POST /api/v1/tracking/batch - Many sessions, one result each
//! - POST /api/v1/tracking/updates/batch - New track points since `begin`

use axum::{extract::State, Json};
use chrono::Utc;
use std::sync::Arc;

use crate::api::dto::{
    BatchResponse, TrackingBatchRequest, TrackingBatchResult, TrackingMetadata, TrackingRequest,
    TrackingResponse, UpdatesBatchResult,
};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::athlete::calculate_stats;
use crate::livetrack::BatchItem;

/// POST /api/v1/tracking
pub async fn fetch_tracking(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TrackingRequest>,
) -> ApiResult<Json<TrackingResponse>> {
    validate_item(&req)?;

    let data = state.fetcher.fetch(&req.session(), req.begin).await?;

    let metadata = TrackingMetadata {
        point_count: data.coordinates.len(),
        course_point_count: data.course_points.len(),
        fetched_at: Utc::now(),
        stats: calculate_stats(&data.coordinates),
    };

    Ok(Json(TrackingResponse {
        success: true,
        data,
        metadata,
    }))
}

/// POST /api/v1/tracking/batch
///
/// Duplicate sessions are fetched once; every request item still gets
/// its own result.
pub async fn fetch_tracking_batch(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TrackingBatchRequest>,
) -> ApiResult<Json<BatchResponse<TrackingBatchResult>>> {
    validate_batch(&state, &req.athletes, false)?;

    let outcomes = state.fetcher.fetch_batch(&req.athletes).await;

    let results = req
        .athletes
        .iter()
        .zip(outcomes)
        .map(|(item, outcome)| match outcome {
            Ok(data) => TrackingBatchResult {
                session_id: item.session_id.clone(),
                success: true,
                data: Some(data),
                error: None,
            },
            Err(error) => TrackingBatchResult {
                session_id: item.session_id.clone(),
                success: false,
                data: None,
                error: Some(error),
            },
        })
        .collect();

    Ok(Json(BatchResponse {
        success: true,
        results,
    }))
}

/// POST /api/v1/tracking/updates/batch
pub async fn fetch_updates_batch(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TrackingBatchRequest>,
) -> ApiResult<Json<BatchResponse<UpdatesBatchResult>>> {
    validate_batch(&state, &req.athletes, true)?;

    let outcomes = state.fetcher.fetch_updates_batch(&req.athletes).await;

    let results = req
        .athletes
        .iter()
        .zip(outcomes)
        .map(|(item, outcome)| match outcome {
            Ok(coordinates) => UpdatesBatchResult {
                session_id: item.session_id.clone(),
                success: true,
                coordinates: Some(coordinates),
                error: None,
            },
            Err(error) => UpdatesBatchResult {
                session_id: item.session_id.clone(),
                success: false,
                coordinates: None,
                error: Some(error),
            },
        })
        .collect();

    Ok(Json(BatchResponse {
        success: true,
        results,
    }))
}

fn validate_item(item: &BatchItem) -> Result<(), ApiError> {
    if item.session_id.trim().is_empty() || item.token.trim().is_empty() {
        return Err(ApiError::Validation(
            "sessionId and token are required".to_string(),
        ));
    }
    Ok(())
}

fn validate_batch(state: &AppState, items: &[BatchItem], require_begin: bool) -> Result<(), ApiError> {
    if items.is_empty() {
        return Err(ApiError::Validation("Athletes array is required".to_string()));
    }
    if items.len() > state.config.max_batch_size {
        return Err(ApiError::Validation(format!(
            "Batch size exceeds maximum of {} athletes",
            state.config.max_batch_size
        )));
    }

    for (index, item) in items.iter().enumerate() {
        validate_item(item).map_err(|_| {
            ApiError::Validation(format!("Athlete {} is missing sessionId or token", index))
        })?;
        if require_begin && item.begin.is_none() {
            return Err(ApiError::Validation(format!(
                "Athlete {} is missing begin timestamp",
                index
            )));
        }
    }
    Ok(())
}

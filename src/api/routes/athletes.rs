//! Athlete Routes
//!
//! - POST /api/v1/athletes - Load athletes from a list of LiveTrack links

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::dto::{AthleteView, AthletesRequest, AthletesResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::athlete::{calculate_stats, parse_url_list};

/// POST /api/v1/athletes
///
/// Resolves every link, fetches each session once and returns one athlete
/// per input, with statistics for those that loaded.
pub async fn load_athletes(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AthletesRequest>,
) -> ApiResult<Json<AthletesResponse>> {
    let mut urls: Vec<String> = req
        .urls
        .iter()
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .collect();
    if let Some(text) = &req.text {
        urls.extend(parse_url_list(text));
    }

    if urls.is_empty() {
        return Err(ApiError::Validation("At least one URL is required".to_string()));
    }
    if urls.len() > state.config.max_batch_size {
        return Err(ApiError::Validation(format!(
            "At most {} athletes can be loaded at once",
            state.config.max_batch_size
        )));
    }

    let roster = state.roster.load(&urls).await;
    let loaded = roster.loaded_count();

    let athletes = roster
        .athletes
        .into_iter()
        .map(|athlete| AthleteView {
            stats: calculate_stats(&athlete.coordinates),
            athlete,
        })
        .collect();

    Ok(Json(AthletesResponse {
        success: true,
        athletes,
        map_center: roster.map_center,
        loaded,
    }))
}

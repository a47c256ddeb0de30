//! Data Transfer Objects
//!
//! Request and response types for the API endpoints.
//! Field names are camelCase on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::athlete::{Athlete, AthleteStats, Coordinate, Position};
use crate::livetrack::{BatchItem, ExpandOutcome, TrackingData};
use crate::share::{GridState, ShareOutcome};

/// `{ success: true, data }`
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

// ============================================
// EXPAND DTOs
// ============================================

#[derive(Debug, Deserialize)]
pub struct ExpandUrlRequest {
    pub url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandUrlResponse {
    pub success: bool,
    pub expanded_url: String,
}

#[derive(Debug, Deserialize)]
pub struct ExpandBatchRequest {
    pub urls: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ExpandBatchResponse {
    pub success: bool,
    pub results: Vec<ExpandOutcome>,
}

// ============================================
// TRACKING DTOs
// ============================================

/// Single session fetch; same shape as a batch item
pub type TrackingRequest = BatchItem;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingMetadata {
    pub point_count: usize,
    pub course_point_count: usize,
    pub fetched_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<AthleteStats>,
}

#[derive(Debug, Serialize)]
pub struct TrackingResponse {
    pub success: bool,
    pub data: TrackingData,
    pub metadata: TrackingMetadata,
}

#[derive(Debug, Deserialize)]
pub struct TrackingBatchRequest {
    pub athletes: Vec<BatchItem>,
}

/// One result per requested athlete, in request order
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingBatchResult {
    pub session_id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<TrackingData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatesBatchResult {
    pub session_id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Vec<Coordinate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BatchResponse<T> {
    pub success: bool,
    pub results: Vec<T>,
}

// ============================================
// ATHLETE DTOs
// ============================================

/// Either a URL list or pasted text with one URL per line
#[derive(Debug, Default, Deserialize)]
pub struct AthletesRequest {
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AthleteView {
    #[serde(flatten)]
    pub athlete: Athlete,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<AthleteStats>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AthletesResponse {
    pub success: bool,
    pub athletes: Vec<AthleteView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_center: Option<Position>,
    pub loaded: usize,
}

// ============================================
// SHARE DTOs
// ============================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridShareRequest {
    pub grid_state: GridState,
}

#[derive(Debug, Deserialize)]
pub struct MultiTrackShareRequest {
    pub urls: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ShareResponse {
    pub success: bool,
    #[serde(flatten)]
    pub outcome: ShareOutcome,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareCheckResponse {
    pub success: bool,
    pub has_existing: bool,
    #[serde(flatten)]
    pub outcome: Option<ShareOutcome>,
}

// ============================================
// HEALTH DTOs
// ============================================

/// Health check response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Overall status: healthy, degraded
    pub status: String,
    /// Share store status
    pub shares: String,
    /// Number of stored shares, when the store is reachable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_count: Option<u64>,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// Application version
    pub version: String,
}

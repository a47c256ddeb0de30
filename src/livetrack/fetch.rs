//! Tracking data fetcher
//!
//! Combines the three LiveTrack lookups into one normalized payload.
//! Session and track-point failures are fatal for the athlete; a missing
//! course only costs the planned route.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::client::{SessionInfo, TrackingSource};
use super::error::LiveTrackResult;
use super::url::SessionRef;
use crate::athlete::{Coordinate, CoursePoint, Profile};

/// Normalized tracking data for one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingData {
    pub session_id: String,
    pub token: String,
    pub profile: Profile,
    pub coordinates: Vec<Coordinate>,
    pub course_points: Vec<CoursePoint>,
    pub last_update: DateTime<Utc>,
}

/// Fetches and normalizes tracking data from a [`TrackingSource`]
#[derive(Clone)]
pub struct TrackingFetcher {
    source: Arc<dyn TrackingSource>,
}

impl TrackingFetcher {
    pub fn new(source: Arc<dyn TrackingSource>) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &Arc<dyn TrackingSource> {
        &self.source
    }

    /// Fetch profile, track points and course for one session
    pub async fn fetch(
        &self,
        session: &SessionRef,
        begin: Option<DateTime<Utc>>,
    ) -> LiveTrackResult<TrackingData> {
        let info = self.source.session(session).await?;

        let (points, course) = tokio::join!(
            self.source.track_points(session, begin),
            self.source.course(session),
        );

        let coordinates = points?;

        let course_points = course.unwrap_or_else(|e| {
            tracing::warn!(
                session_id = %session.session_id,
                error = %e,
                "Course lookup failed, continuing without planned route"
            );
            Vec::new()
        });

        tracing::debug!(
            session_id = %session.session_id,
            points = coordinates.len(),
            course_points = course_points.len(),
            "Fetched tracking data"
        );

        Ok(TrackingData {
            session_id: session.session_id.clone(),
            token: session.token.clone(),
            profile: build_profile(info, &coordinates),
            coordinates,
            course_points,
            last_update: Utc::now(),
        })
    }

    /// Fetch only the track points from `begin` onwards
    pub async fn fetch_updates(
        &self,
        session: &SessionRef,
        begin: DateTime<Utc>,
    ) -> LiveTrackResult<Vec<Coordinate>> {
        self.source.track_points(session, Some(begin)).await
    }
}

/// Build the display profile from session metadata and the first sample
pub fn build_profile(info: SessionInfo, coordinates: &[Coordinate]) -> Profile {
    let name = info
        .display_name
        .or(info.publisher_nickname)
        .unwrap_or_else(|| "Unknown".to_string());

    Profile {
        name,
        location: info.session_name.clone().unwrap_or_default(),
        session_name: info.session_name,
        activity_type: coordinates
            .first()
            .and_then(|c| c.activity_type())
            .map(str::to_string),
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::athlete::{FitnessData, Position};
    use crate::livetrack::error::LiveTrackError;

    fn fetcher(source: FakeSource) -> TrackingFetcher {
        TrackingFetcher::new(Arc::new(source))
    }

    #[tokio::test]
    async fn test_fetch_normalizes() {
        let first = point(0).fitness(FitnessData {
            activity_type: Some("RUNNING".to_string()),
            ..Default::default()
        });
        let source = FakeSource::default().with(
            "abc",
            FakeSession {
                name: Some("Jane".to_string()),
                points: vec![first, point(10)],
                course: vec![CoursePoint {
                    position: Position::new(45.0, 7.0),
                }],
                ..Default::default()
            },
        );

        let data = fetcher(source)
            .fetch(&SessionRef::new("abc", "xyz"), None)
            .await
            .unwrap();

        assert_eq!(data.session_id, "abc");
        assert_eq!(data.token, "xyz");
        assert_eq!(data.profile.name, "Jane");
        assert_eq!(data.profile.location, "Test Session");
        assert_eq!(data.profile.activity_type.as_deref(), Some("RUNNING"));
        assert_eq!(data.coordinates.len(), 2);
        assert_eq!(data.course_points.len(), 1);
    }

    #[tokio::test]
    async fn test_course_failure_degrades() {
        let source = FakeSource::default().with(
            "abc",
            FakeSession {
                points: vec![point(0)],
                course_fails: true,
                ..Default::default()
            },
        );

        let data = fetcher(source)
            .fetch(&SessionRef::new("abc", "xyz"), None)
            .await
            .unwrap();

        assert!(data.course_points.is_empty());
        assert_eq!(data.coordinates.len(), 1);
        assert_eq!(data.profile.name, "Unknown");
    }

    #[tokio::test]
    async fn test_session_failure_is_fatal() {
        let source = FakeSource::default().with(
            "abc",
            FakeSession {
                session_fails: true,
                ..Default::default()
            },
        );

        let err = fetcher(source)
            .fetch(&SessionRef::new("abc", "xyz"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, LiveTrackError::GraphQl { .. }));
    }

    #[tokio::test]
    async fn test_track_point_failure_is_fatal() {
        let source = FakeSource::default().with(
            "abc",
            FakeSession {
                points_fail: true,
                ..Default::default()
            },
        );

        let err = fetcher(source)
            .fetch(&SessionRef::new("abc", "xyz"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, LiveTrackError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_fetch_updates_respects_cursor() {
        let source = FakeSource::default().with(
            "abc",
            FakeSession {
                points: vec![point(0), point(10), point(20)],
                ..Default::default()
            },
        );

        let updates = fetcher(source)
            .fetch_updates(&SessionRef::new("abc", "xyz"), at(10))
            .await
            .unwrap();
        assert_eq!(updates.len(), 2);
    }

    #[test]
    fn test_profile_fallbacks() {
        let info = SessionInfo {
            publisher_nickname: Some("jdoe".to_string()),
            ..Default::default()
        };
        let profile = build_profile(info, &[]);
        assert_eq!(profile.name, "jdoe");
        assert_eq!(profile.location, "");
        assert_eq!(profile.activity_type, None);
    }
}

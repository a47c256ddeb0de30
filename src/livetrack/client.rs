//! LiveTrack GraphQL Client
//!
//! HTTP client for the LiveTrack Apollo endpoint. Requests carry the same
//! origin/referer/user-agent headers as the LiveTrack web viewer; the
//! endpoint rejects bare API calls.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

use super::error::{LiveTrackError, LiveTrackResult};
use super::graphql::{
    CourseData, CourseVariables, GraphQlRequest, GraphQlResponse, SessionData, SessionNode,
    SessionVariables, TrackPointVariables, TrackPointsData, GET_COURSE_DATA, GET_SESSION,
    GET_TRACK_POINTS,
};
use super::url::SessionRef;
use crate::athlete::{Coordinate, CoursePoint};

/// Session metadata returned by the session lookup
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionInfo {
    pub display_name: Option<String>,
    pub session_name: Option<String>,
    pub activity_name: Option<String>,
    pub publisher_nickname: Option<String>,
}

impl From<SessionNode> for SessionInfo {
    fn from(node: SessionNode) -> Self {
        Self {
            display_name: non_empty(node.user_display_name),
            session_name: non_empty(node.session_name),
            activity_name: node.activity.and_then(|a| non_empty(a.name)),
            publisher_nickname: node.publisher.and_then(|p| non_empty(p.nickname)),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Source of live tracking data
///
/// Implemented by [`LiveTrackClient`]; tests substitute in-memory fakes.
#[async_trait]
pub trait TrackingSource: Send + Sync {
    /// Look up session metadata
    async fn session(&self, session: &SessionRef) -> LiveTrackResult<SessionInfo>;

    /// Fetch track points, optionally only those from `begin` onwards
    async fn track_points(
        &self,
        session: &SessionRef,
        begin: Option<DateTime<Utc>>,
    ) -> LiveTrackResult<Vec<Coordinate>>;

    /// Fetch the planned course
    async fn course(&self, session: &SessionRef) -> LiveTrackResult<Vec<CoursePoint>>;
}

/// Configuration for the LiveTrack client
#[derive(Debug, Clone)]
pub struct LiveTrackConfig {
    /// GraphQL endpoint
    pub graphql_url: String,
    /// Origin the requests claim to come from
    pub origin: String,
    /// User agent sent with every request
    pub user_agent: String,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
    /// Maximum track points per request
    pub track_point_limit: u32,
}

impl Default for LiveTrackConfig {
    fn default() -> Self {
        Self {
            graphql_url: "https://livetrack.garmin.com/apollo/graphql".to_string(),
            origin: "https://livetrack.garmin.com".to_string(),
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36".to_string(),
            request_timeout_ms: 15_000,
            track_point_limit: 3000,
        }
    }
}

/// LiveTrack GraphQL client
pub struct LiveTrackClient {
    client: Client,
    config: LiveTrackConfig,
}

impl LiveTrackClient {
    pub fn new(config: LiveTrackConfig) -> LiveTrackResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &LiveTrackConfig {
        &self.config
    }

    /// Run one GraphQL operation and unwrap its data payload
    async fn execute<V, T>(
        &self,
        operation: &'static str,
        query: &'static str,
        session: &SessionRef,
        variables: V,
    ) -> LiveTrackResult<Option<T>>
    where
        V: Serialize + Send,
        T: DeserializeOwned,
    {
        let body = GraphQlRequest {
            query,
            variables,
            operation_name: operation,
        };

        let response = self
            .client
            .post(&self.config.graphql_url)
            .header("accept", "*/*")
            .header("origin", &self.config.origin)
            .header("referer", session.url())
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(LiveTrackError::Status {
                operation,
                status: response.status().as_u16(),
            });
        }

        let payload: GraphQlResponse<T> = response.json().await?;

        if let Some(errors) = payload.errors.filter(|e| !e.is_empty()) {
            return Err(LiveTrackError::GraphQl {
                operation,
                messages: errors.into_iter().map(|e| e.message).collect(),
            });
        }

        Ok(payload.data)
    }
}

#[async_trait]
impl TrackingSource for LiveTrackClient {
    async fn session(&self, session: &SessionRef) -> LiveTrackResult<SessionInfo> {
        let data: Option<SessionData> = self
            .execute(
                "getSession",
                GET_SESSION,
                session,
                SessionVariables {
                    session_id: &session.session_id,
                    token: &session.token,
                },
            )
            .await?;

        data.and_then(|d| d.session_by_id)
            .map(SessionInfo::from)
            .ok_or(LiveTrackError::SessionNotFound)
    }

    async fn track_points(
        &self,
        session: &SessionRef,
        begin: Option<DateTime<Utc>>,
    ) -> LiveTrackResult<Vec<Coordinate>> {
        let data: Option<TrackPointsData> = self
            .execute(
                "getTrackPoints",
                GET_TRACK_POINTS,
                session,
                TrackPointVariables {
                    session_id: &session.session_id,
                    token: &session.token,
                    begin: begin.map(|b| b.to_rfc3339_opts(SecondsFormat::Millis, true)),
                    limit: self.config.track_point_limit,
                    disable_polling: true,
                },
            )
            .await?;

        let points = data
            .and_then(|d| d.track_points_by_session_id)
            .map(|node| node.track_points)
            .unwrap_or_default();

        Ok(points.into_iter().map(Coordinate::from).collect())
    }

    async fn course(&self, session: &SessionRef) -> LiveTrackResult<Vec<CoursePoint>> {
        let data: Option<CourseData> = self
            .execute(
                "getCourseData",
                GET_COURSE_DATA,
                session,
                CourseVariables {
                    session_id: &session.session_id,
                    token: &session.token,
                    disable_polling: true,
                },
            )
            .await?;

        let points = data
            .and_then(|d| d.course_by_session_id)
            .and_then(|c| c.courses.into_iter().next())
            .map(|course| course.course_points)
            .unwrap_or_default();

        Ok(points.into_iter().map(CoursePoint::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::livetrack::graphql::{NamedNode, PublisherNode};

    #[test]
    fn test_default_config() {
        let config = LiveTrackConfig::default();
        assert_eq!(config.graphql_url, "https://livetrack.garmin.com/apollo/graphql");
        assert_eq!(config.track_point_limit, 3000);
    }

    #[test]
    fn test_client_builds() {
        let client = LiveTrackClient::new(LiveTrackConfig::default()).unwrap();
        assert_eq!(client.config().origin, "https://livetrack.garmin.com");
    }

    #[test]
    fn test_session_info_drops_blank_fields() {
        let node = SessionNode {
            session_id: Some("abc".to_string()),
            user_display_name: Some("  ".to_string()),
            session_name: Some("Morning Ride".to_string()),
            activity: Some(NamedNode { name: None }),
            publisher: Some(PublisherNode {
                nickname: Some("jdoe".to_string()),
            }),
        };

        let info = SessionInfo::from(node);
        assert_eq!(info.display_name, None);
        assert_eq!(info.session_name.as_deref(), Some("Morning Ride"));
        assert_eq!(info.activity_name, None);
        assert_eq!(info.publisher_nickname.as_deref(), Some("jdoe"));
    }
}

//! LiveTrack GraphQL documents and response shapes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::athlete::{Coordinate, CoursePoint, FitnessData, Position};

pub const GET_SESSION: &str = r#"
query getSession($sessionId: String!, $token: String!) {
  sessionById(sessionId: $sessionId, token: $token) {
    sessionId
    sessionToken
    userDisplayName
    sessionName
    activity {
      name
    }
    publisher {
      nickname
    }
  }
}
"#;

/// Track point query; `$limit` caps the window size
pub const GET_TRACK_POINTS: &str = r#"
query getTrackPoints(
  $sessionId: String!
  $token: String!
  $begin: String
  $limit: Int
  $disablePolling: Boolean
) {
  trackPointsBySessionId(
    sessionId: $sessionId
    token: $token
    begin: $begin
    limit: $limit
    disablePolling: $disablePolling
  ) {
    trackPoints {
      fitnessPointData {
        totalDistanceMeters
        activityType
        heartRateBeatsPerMin
        powerWatts
        cadenceCyclesPerMin
      }
      position {
        lat
        lon
      }
      dateTime
      speed
      altitude
    }
    sessionId
  }
}
"#;

pub const GET_COURSE_DATA: &str = r#"
query getCourseData($sessionId: String!, $token: String!, $disablePolling: Boolean) {
  courseBySessionId(sessionId: $sessionId, token: $token, disablePolling: $disablePolling) {
    courses {
      coursePoints {
        position {
          lat
          lon
        }
      }
    }
  }
}
"#;

/// GraphQL request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQlRequest<V: Serialize> {
    pub query: &'static str,
    pub variables: V,
    pub operation_name: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionVariables<'a> {
    pub session_id: &'a str,
    pub token: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackPointVariables<'a> {
    pub session_id: &'a str,
    pub token: &'a str,
    pub begin: Option<String>,
    pub limit: u32,
    pub disable_polling: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseVariables<'a> {
    pub session_id: &'a str,
    pub token: &'a str,
    pub disable_polling: bool,
}

/// GraphQL response envelope
#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlError {
    #[serde(default)]
    pub message: String,
}

// ============================================
// getSession
// ============================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    pub session_by_id: Option<SessionNode>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionNode {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub user_display_name: Option<String>,
    #[serde(default)]
    pub session_name: Option<String>,
    #[serde(default)]
    pub activity: Option<NamedNode>,
    #[serde(default)]
    pub publisher: Option<PublisherNode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedNode {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublisherNode {
    #[serde(default)]
    pub nickname: Option<String>,
}

// ============================================
// getTrackPoints
// ============================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackPointsData {
    pub track_points_by_session_id: Option<TrackPointsNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackPointsNode {
    #[serde(default)]
    pub track_points: Vec<TrackPointNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackPointNode {
    #[serde(default)]
    pub fitness_point_data: Option<FitnessPointNode>,
    pub position: PositionNode,
    pub date_time: DateTime<Utc>,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub altitude: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FitnessPointNode {
    #[serde(default)]
    pub total_distance_meters: Option<f64>,
    #[serde(default)]
    pub activity_type: Option<String>,
    #[serde(default)]
    pub heart_rate_beats_per_min: Option<f64>,
    #[serde(default)]
    pub power_watts: Option<f64>,
    #[serde(default)]
    pub cadence_cycles_per_min: Option<f64>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PositionNode {
    pub lat: f64,
    pub lon: f64,
}

impl From<PositionNode> for Position {
    fn from(node: PositionNode) -> Self {
        Position::new(node.lat, node.lon)
    }
}

impl From<TrackPointNode> for Coordinate {
    fn from(node: TrackPointNode) -> Self {
        Coordinate {
            position: node.position.into(),
            timestamp: node.date_time,
            altitude: node.altitude,
            speed: node.speed,
            fitness_data: node.fitness_point_data.map(|f| FitnessData {
                heart_rate: f.heart_rate_beats_per_min,
                power: f.power_watts,
                cadence: f.cadence_cycles_per_min,
                distance_meters: f.total_distance_meters,
                activity_type: f.activity_type,
            }),
        }
    }
}

// ============================================
// getCourseData
// ============================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseData {
    pub course_by_session_id: Option<CoursesNode>,
}

#[derive(Debug, Deserialize)]
pub struct CoursesNode {
    #[serde(default)]
    pub courses: Vec<CourseNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseNode {
    #[serde(default)]
    pub course_points: Vec<CoursePointNode>,
}

#[derive(Debug, Deserialize)]
pub struct CoursePointNode {
    pub position: PositionNode,
}

impl From<CoursePointNode> for CoursePoint {
    fn from(node: CoursePointNode) -> Self {
        CoursePoint {
            position: node.position.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_point_conversion() {
        let body = r#"{
            "data": {
                "trackPointsBySessionId": {
                    "sessionId": "abc",
                    "trackPoints": [{
                        "fitnessPointData": {
                            "totalDistanceMeters": 1234.5,
                            "activityType": "CYCLING",
                            "heartRateBeatsPerMin": 142,
                            "powerWatts": null,
                            "cadenceCyclesPerMin": 88
                        },
                        "position": {"lat": 46.5, "lon": 8.1},
                        "dateTime": "2024-06-01T08:15:30.000Z",
                        "speed": 8.4,
                        "altitude": 1021.0
                    }]
                }
            }
        }"#;

        let response: GraphQlResponse<TrackPointsData> = serde_json::from_str(body).unwrap();
        let node = response
            .data
            .unwrap()
            .track_points_by_session_id
            .unwrap()
            .track_points
            .remove(0);

        let coord = Coordinate::from(node);
        assert_eq!(coord.position, Position::new(46.5, 8.1));
        assert_eq!(coord.speed, Some(8.4));
        assert_eq!(coord.heart_rate(), Some(142.0));
        assert_eq!(coord.distance_meters(), Some(1234.5));
        assert_eq!(coord.activity_type(), Some("CYCLING"));
        assert_eq!(coord.fitness_data.unwrap().power, None);
    }

    #[test]
    fn test_error_envelope() {
        let body = r#"{"data": null, "errors": [{"message": "Session expired"}]}"#;
        let response: GraphQlResponse<SessionData> = serde_json::from_str(body).unwrap();
        assert!(response.data.is_none());
        assert_eq!(response.errors.unwrap()[0].message, "Session expired");
    }

    #[test]
    fn test_request_body_shape() {
        let request = GraphQlRequest {
            query: GET_TRACK_POINTS,
            variables: TrackPointVariables {
                session_id: "abc",
                token: "xyz",
                begin: None,
                limit: 3000,
                disable_polling: true,
            },
            operation_name: "getTrackPoints",
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["operationName"], "getTrackPoints");
        assert_eq!(json["variables"]["sessionId"], "abc");
        assert_eq!(json["variables"]["limit"], 3000);
        assert!(json["variables"]["begin"].is_null());
    }
}

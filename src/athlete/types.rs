//! Athlete data types
//!
//! Wire format matches what the dashboard consumes: camelCase field names
//! and the LiveTrack fitness field names (`heartRateBeatsPerMin`, ...).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Geographic position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
}

impl Position {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Sensor data attached to a track point
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FitnessData {
    #[serde(rename = "heartRateBeatsPerMin", skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<f64>,
    #[serde(rename = "powerWatts", skip_serializing_if = "Option::is_none")]
    pub power: Option<f64>,
    #[serde(rename = "cadenceCyclesPerMin", skip_serializing_if = "Option::is_none")]
    pub cadence: Option<f64>,
    #[serde(rename = "totalDistanceMeters", skip_serializing_if = "Option::is_none")]
    pub distance_meters: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_type: Option<String>,
}

/// A single timestamped sample of an athlete's track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinate {
    pub position: Position,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
    /// Speed in meters per second
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fitness_data: Option<FitnessData>,
}

impl Coordinate {
    pub fn new(position: Position, timestamp: DateTime<Utc>) -> Self {
        Self {
            position,
            timestamp,
            altitude: None,
            speed: None,
            fitness_data: None,
        }
    }

    pub fn altitude(mut self, altitude: f64) -> Self {
        self.altitude = Some(altitude);
        self
    }

    pub fn speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }

    pub fn fitness(mut self, fitness: FitnessData) -> Self {
        self.fitness_data = Some(fitness);
        self
    }

    pub fn heart_rate(&self) -> Option<f64> {
        self.fitness_data.as_ref().and_then(|f| f.heart_rate)
    }

    pub fn distance_meters(&self) -> Option<f64> {
        self.fitness_data.as_ref().and_then(|f| f.distance_meters)
    }

    pub fn activity_type(&self) -> Option<&str> {
        self.fitness_data
            .as_ref()
            .and_then(|f| f.activity_type.as_deref())
    }
}

/// A point on the athlete's planned course
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoursePoint {
    pub position: Position,
}

/// Display profile of a tracked athlete
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub name: String,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_type: Option<String>,
}

impl Profile {
    /// Profile shown for an athlete whose data could not be loaded
    pub fn placeholder(index: usize) -> Self {
        Self {
            name: format!("Athlete {}", index + 1),
            ..Default::default()
        }
    }
}

/// An athlete on the multi-track map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Athlete {
    pub id: String,
    pub session_id: String,
    pub token: String,
    pub profile: Profile,
    pub coordinates: Vec<Coordinate>,
    #[serde(default)]
    pub course_points: Vec<CoursePoint>,
    pub color: String,
    pub original_url: String,
    pub last_update: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Athlete {
    /// Timestamp of the most recent known sample
    pub fn latest_timestamp(&self) -> Option<DateTime<Utc>> {
        self.coordinates.last().map(|c| c.timestamp)
    }

    /// Whether the live loop should poll this athlete
    pub fn is_pollable(&self) -> bool {
        self.error.is_none() && !self.session_id.is_empty() && !self.token.is_empty()
    }

    /// Append samples strictly newer than the latest known one.
    ///
    /// Returns the number of samples appended.
    pub fn append_coordinates(&mut self, incoming: Vec<Coordinate>) -> usize {
        let mut cursor = self.latest_timestamp();
        let mut appended = 0;

        for coord in incoming {
            if cursor.map_or(true, |latest| coord.timestamp > latest) {
                cursor = Some(coord.timestamp);
                self.coordinates.push(coord);
                appended += 1;
            }
        }

        appended
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn athlete() -> Athlete {
        Athlete {
            id: "athlete-0".to_string(),
            session_id: "abc".to_string(),
            token: "xyz".to_string(),
            profile: Profile::placeholder(0),
            coordinates: vec![Coordinate::new(Position::new(45.0, 7.0), at(0))],
            course_points: Vec::new(),
            color: "#e6194b".to_string(),
            original_url: "https://livetrack.garmin.com/session/abc/token/xyz".to_string(),
            last_update: at(0),
            error: None,
        }
    }

    #[test]
    fn test_append_skips_known_samples() {
        let mut a = athlete();
        let incoming = vec![
            Coordinate::new(Position::new(45.0, 7.0), at(0)),
            Coordinate::new(Position::new(45.1, 7.0), at(10)),
            Coordinate::new(Position::new(45.2, 7.0), at(20)),
        ];

        assert_eq!(a.append_coordinates(incoming), 2);
        assert_eq!(a.coordinates.len(), 3);
        assert_eq!(a.latest_timestamp(), Some(at(20)));
    }

    #[test]
    fn test_pollable() {
        let mut a = athlete();
        assert!(a.is_pollable());

        a.error = Some("Failed to fetch tracking data".to_string());
        assert!(!a.is_pollable());

        let mut b = athlete();
        b.token.clear();
        assert!(!b.is_pollable());
    }

    #[test]
    fn test_coordinate_wire_format() {
        let coord = Coordinate::new(Position::new(1.0, 2.0), at(0))
            .speed(3.5)
            .fitness(FitnessData {
                heart_rate: Some(150.0),
                ..Default::default()
            });

        let json = serde_json::to_value(&coord).unwrap();
        assert_eq!(json["fitnessData"]["heartRateBeatsPerMin"], 150.0);
        assert_eq!(json["speed"], 3.5);
        assert!(json.get("altitude").is_none());
    }
}

//! Athlete Statistics
//!
//! Summary statistics derived from an ordered coordinate sequence, plus the
//! display formatters used by the CLI.
//!
//! Aggregates skip missing samples instead of treating them as zero. Zero
//! speeds and heart rates are excluded; elevation deltas are taken between
//! consecutive samples that carry an altitude.

use serde::Serialize;

use super::types::Coordinate;

/// Summary statistics for one athlete
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AthleteStats {
    /// Meters, as reported by the device
    pub total_distance: f64,
    /// Seconds between first and last sample
    pub total_time: f64,
    /// Meters per second
    pub avg_speed: f64,
    pub max_speed: f64,
    pub elevation_gain: f64,
    pub elevation_loss: f64,
    pub min_altitude: f64,
    pub max_altitude: f64,
    pub avg_heart_rate: f64,
    pub max_heart_rate: f64,
    pub activity_type: String,
}

/// Calculate statistics over an ordered coordinate list.
///
/// Returns `None` when there are no samples yet.
pub fn calculate_stats(coords: &[Coordinate]) -> Option<AthleteStats> {
    let first = coords.first()?;
    let latest = coords.last()?;

    let total_distance = latest.distance_meters().unwrap_or(0.0);
    let activity_type = latest.activity_type().unwrap_or("Unknown").to_string();

    let total_time =
        (latest.timestamp - first.timestamp).num_milliseconds() as f64 / 1000.0;

    let speeds: Vec<f64> = coords
        .iter()
        .filter_map(|c| c.speed)
        .filter(|s| *s > 0.0)
        .collect();
    let (avg_speed, max_speed) = mean_and_max(&speeds);

    let altitudes: Vec<f64> = coords.iter().filter_map(|c| c.altitude).collect();
    let (elevation_gain, elevation_loss) = elevation_deltas(&altitudes);
    let min_altitude = altitudes.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max_altitude = altitudes.iter().copied().reduce(f64::max).unwrap_or(0.0);

    let heart_rates: Vec<f64> = coords
        .iter()
        .filter_map(|c| c.heart_rate())
        .filter(|hr| *hr > 0.0)
        .collect();
    let (avg_heart_rate, max_heart_rate) = mean_and_max(&heart_rates);

    Some(AthleteStats {
        total_distance,
        total_time,
        avg_speed,
        max_speed,
        elevation_gain,
        elevation_loss,
        min_altitude,
        max_altitude,
        avg_heart_rate,
        max_heart_rate,
        activity_type,
    })
}

fn mean_and_max(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }

    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    (mean, max)
}

/// Sum positive and negative deltas between consecutive altitudes
fn elevation_deltas(altitudes: &[f64]) -> (f64, f64) {
    altitudes
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .fold((0.0, 0.0), |(gain, loss), diff| {
            if diff > 0.0 {
                (gain + diff, loss)
            } else {
                (gain, loss - diff)
            }
        })
}

/// Format meters as "850 m" or "12.3 km"
pub fn format_distance(meters: f64) -> String {
    if meters >= 1000.0 {
        format!("{:.1} km", meters / 1000.0)
    } else {
        format!("{} m", meters.round() as i64)
    }
}

/// Format seconds as "m:ss" or "h:mm:ss"
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0).floor() as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

/// Format meters per second as km/h
pub fn format_speed(mps: f64) -> String {
    format!("{:.1} km/h", mps * 3.6)
}

pub fn format_elevation(meters: f64) -> String {
    format!("{} m", meters.round() as i64)
}

//! Athletes
//!
//! Data model for tracked athletes, the statistics derived from their
//! tracks, and the loader that builds the athlete list from input links.

mod roster;
mod stats;
mod types;

pub use roster::{
    athlete_color, map_center, parse_url_list, Roster, RosterLoader, ATHLETE_COLORS,
    FETCH_FAILED, PARSE_FAILED,
};
pub use stats::{
    calculate_stats, format_distance, format_duration, format_elevation, format_speed,
    AthleteStats,
};
pub use types::{Athlete, Coordinate, CoursePoint, FitnessData, Position, Profile};

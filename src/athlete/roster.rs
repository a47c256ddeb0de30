//! Roster loading
//!
//! Turns the user's list of LiveTrack links into the athlete list shown on
//! the map. Every input produces exactly one athlete at its own index;
//! inputs that never reach the network, or whose fetch fails, become
//! placeholder athletes carrying an error.

use chrono::Utc;
use futures_util::future::join_all;
use serde::Serialize;
use std::sync::Arc;

use super::types::{Athlete, Position, Profile};
use crate::livetrack::{
    resolve_session_url, BatchItem, LinkExpander, SessionRef, TrackingData, TrackingFetcher,
};

/// Track colors, assigned by input index
pub const ATHLETE_COLORS: [&str; 10] = [
    "#e6194b", "#3cb44b", "#4363d8", "#f58231", "#911eb4",
    "#42d4f4", "#f032e6", "#bfef45", "#469990", "#9a6324",
];

pub const PARSE_FAILED: &str = "Failed to parse URL";
pub const FETCH_FAILED: &str = "Failed to fetch tracking data";

/// Color for the athlete at `index`
pub fn athlete_color(index: usize) -> &'static str {
    ATHLETE_COLORS[index % ATHLETE_COLORS.len()]
}

/// Split pasted text into one trimmed URL per non-empty line
pub fn parse_url_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Loaded athletes plus the point the map should center on
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Roster {
    pub athletes: Vec<Athlete>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_center: Option<Position>,
}

impl Roster {
    pub fn new(athletes: Vec<Athlete>) -> Self {
        let map_center = map_center(&athletes);
        Self {
            athletes,
            map_center,
        }
    }

    /// Number of athletes that loaded without error
    pub fn loaded_count(&self) -> usize {
        self.athletes.iter().filter(|a| a.error.is_none()).count()
    }
}

/// Center of the bounding box around every known sample
pub fn map_center(athletes: &[Athlete]) -> Option<Position> {
    let mut coords = athletes.iter().flat_map(|a| a.coordinates.iter());
    let first = coords.next()?.position;

    let (min, max) = coords.fold((first, first), |(min, max), c| {
        (
            Position::new(min.lat.min(c.position.lat), min.lon.min(c.position.lon)),
            Position::new(max.lat.max(c.position.lat), max.lon.max(c.position.lon)),
        )
    });

    Some(Position::new((min.lat + max.lat) / 2.0, (min.lon + max.lon) / 2.0))
}

/// Resolves links and fetches every athlete in one batch
#[derive(Clone)]
pub struct RosterLoader {
    fetcher: TrackingFetcher,
    expander: Arc<dyn LinkExpander>,
}

impl RosterLoader {
    pub fn new(fetcher: TrackingFetcher, expander: Arc<dyn LinkExpander>) -> Self {
        Self { fetcher, expander }
    }

    pub async fn load(&self, urls: &[String]) -> Roster {
        let expander = self.expander.as_ref();
        let sessions: Vec<Option<SessionRef>> =
            join_all(urls.iter().map(|url| resolve_session_url(expander, url))).await;

        let items: Vec<BatchItem> = sessions
            .iter()
            .flatten()
            .map(|s| BatchItem::new(s.clone(), None))
            .collect();

        let outcomes = if items.is_empty() {
            Vec::new()
        } else {
            self.fetcher.fetch_batch(&items).await
        };
        let mut results = outcomes.into_iter();

        let athletes: Vec<Athlete> = urls
            .iter()
            .zip(sessions)
            .enumerate()
            .map(|(index, (url, session))| match session {
                None => placeholder(index, url, None, PARSE_FAILED.to_string()),
                Some(session) => {
                    // One outcome per resolved link, in link order
                    match results.next() {
                        Some(Ok(data)) => from_tracking(index, url, data),
                        Some(Err(e)) => {
                            placeholder(index, url, Some(session), format!("{}: {}", FETCH_FAILED, e))
                        }
                        None => placeholder(index, url, Some(session), FETCH_FAILED.to_string()),
                    }
                }
            })
            .collect();

        let roster = Roster::new(athletes);
        tracing::info!(
            requested = urls.len(),
            loaded = roster.loaded_count(),
            "Roster loaded"
        );
        roster
    }
}

fn from_tracking(index: usize, url: &str, data: TrackingData) -> Athlete {
    Athlete {
        id: format!("athlete-{}", index),
        session_id: data.session_id,
        token: data.token,
        profile: data.profile,
        coordinates: data.coordinates,
        course_points: data.course_points,
        color: athlete_color(index).to_string(),
        original_url: url.to_string(),
        last_update: data.last_update,
        error: None,
    }
}

fn placeholder(index: usize, url: &str, session: Option<SessionRef>, error: String) -> Athlete {
    let session = session.unwrap_or_else(|| SessionRef::new("", ""));
    Athlete {
        id: format!("athlete-{}", index),
        session_id: session.session_id,
        token: session.token,
        profile: Profile::placeholder(index),
        coordinates: Vec::new(),
        course_points: Vec::new(),
        color: athlete_color(index).to_string(),
        original_url: url.to_string(),
        last_update: Utc::now(),
        error: Some(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::livetrack::testing::*;
    use crate::livetrack::{LiveTrackError, LiveTrackResult};
    use async_trait::async_trait;

    struct NoExpander;

    #[async_trait]
    impl LinkExpander for NoExpander {
        async fn expand(&self, url: &str) -> LiveTrackResult<String> {
            Err(LiveTrackError::Expansion {
                url: url.to_string(),
                reason: "offline".to_string(),
            })
        }
    }

    fn loader(source: FakeSource) -> RosterLoader {
        RosterLoader::new(TrackingFetcher::new(Arc::new(source)), Arc::new(NoExpander))
    }

    fn url(session_id: &str) -> String {
        format!("https://livetrack.garmin.com/session/{}/token/tok", session_id)
    }

    #[tokio::test]
    async fn test_load_preserves_input_order() {
        let source = FakeSource::default()
            .with("a", FakeSession { name: Some("Ann".into()), points: vec![point(0)], ..Default::default() })
            .with("b", FakeSession { session_fails: true, ..Default::default() });

        let urls = vec![
            url("a"),
            "https://example.com/foo".to_string(),
            url("b"),
            "https://gar.mn/short".to_string(),
        ];

        let roster = loader(source).load(&urls).await;

        assert_eq!(roster.athletes.len(), 4);
        assert_eq!(roster.loaded_count(), 1);

        let a = &roster.athletes[0];
        assert_eq!(a.id, "athlete-0");
        assert_eq!(a.profile.name, "Ann");
        assert_eq!(a.color, ATHLETE_COLORS[0]);
        assert!(a.error.is_none());

        let bad = &roster.athletes[1];
        assert_eq!(bad.error.as_deref(), Some(PARSE_FAILED));
        assert_eq!(bad.profile.name, "Athlete 2");
        assert!(bad.session_id.is_empty());

        let failed = &roster.athletes[2];
        assert!(failed.error.as_ref().unwrap().starts_with(FETCH_FAILED));
        assert_eq!(failed.session_id, "b");
        assert!(!failed.is_pollable());

        assert_eq!(roster.athletes[3].error.as_deref(), Some(PARSE_FAILED));
    }

    #[tokio::test]
    async fn test_repeated_url_yields_two_athletes() {
        let source = FakeSource::default()
            .with("a", FakeSession { points: vec![point(0)], ..Default::default() });

        let roster = loader(source).load(&[url("a"), url("a")]).await;

        assert_eq!(roster.athletes.len(), 2);
        assert_eq!(roster.loaded_count(), 2);
        assert_ne!(roster.athletes[0].color, roster.athletes[1].color);
    }

    #[test]
    fn test_parse_url_list() {
        let urls = parse_url_list("  https://gar.mn/a \n\n https://gar.mn/b\n   \n");
        assert_eq!(urls, vec!["https://gar.mn/a", "https://gar.mn/b"]);
    }

    #[test]
    fn test_map_center() {
        let mut a = placeholder(0, "u", None, "x".into());
        a.coordinates = vec![point(0)];
        a.coordinates[0].position = Position::new(40.0, 10.0);
        let mut b = placeholder(1, "u", None, "x".into());
        b.coordinates = vec![point(0)];
        b.coordinates[0].position = Position::new(42.0, 14.0);

        assert_eq!(map_center(&[a, b]), Some(Position::new(41.0, 12.0)));
        assert_eq!(map_center(&[]), None);
    }
}

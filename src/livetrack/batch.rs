//! Batch fetch orchestration
//!
//! Fans out one fetch per distinct session and lets every fetch settle on
//! its own. A session requested by several items is fetched once from the
//! earliest cursor among them; each item then keeps only the samples at or
//! after its own cursor. Results come back in input order.

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde::Deserialize;
use std::collections::HashMap;

use super::fetch::{TrackingData, TrackingFetcher};
use super::url::SessionRef;
use crate::athlete::Coordinate;

/// One athlete in a batch request
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItem {
    pub session_id: String,
    pub token: String,
    #[serde(default)]
    pub begin: Option<DateTime<Utc>>,
}

impl BatchItem {
    pub fn new(session: SessionRef, begin: Option<DateTime<Utc>>) -> Self {
        Self {
            session_id: session.session_id,
            token: session.token,
            begin,
        }
    }

    pub fn session(&self) -> SessionRef {
        SessionRef::new(self.session_id.clone(), self.token.clone())
    }

    /// Samples at or after this item's cursor
    fn window(&self, coordinates: &[Coordinate]) -> Vec<Coordinate> {
        match self.begin {
            Some(begin) => coordinates
                .iter()
                .filter(|c| c.timestamp >= begin)
                .cloned()
                .collect(),
            None => coordinates.to_vec(),
        }
    }
}

/// Settled outcome of one fetch; the error is already rendered for display
pub type BatchOutcome<T> = Result<T, String>;

/// One item per session id, carrying the earliest cursor requested for it.
///
/// An item without a cursor wins over any cursor. Order of first appearance
/// is kept.
fn merge_by_session(items: &[BatchItem]) -> Vec<BatchItem> {
    let mut merged: Vec<BatchItem> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for item in items {
        match index.get(item.session_id.as_str()) {
            Some(&i) => {
                let current = &mut merged[i];
                current.begin = match (current.begin, item.begin) {
                    (Some(a), Some(b)) => Some(a.min(b)),
                    _ => None,
                };
            }
            None => {
                index.insert(item.session_id.as_str(), merged.len());
                merged.push(item.clone());
            }
        }
    }

    merged
}

impl TrackingFetcher {
    /// Fetch full tracking data for every item, one upstream fetch per session.
    ///
    /// One outcome per input item, in input order.
    pub async fn fetch_batch(&self, items: &[BatchItem]) -> Vec<BatchOutcome<TrackingData>> {
        let unique = merge_by_session(items);

        let futures = unique.iter().map(|item| async move {
            let outcome = self
                .fetch(&item.session(), item.begin)
                .await
                .map_err(|e| {
                    tracing::warn!(session_id = %item.session_id, error = %e, "Athlete fetch failed");
                    e.to_string()
                });
            (item.session_id.as_str(), outcome)
        });
        let by_session: HashMap<&str, BatchOutcome<TrackingData>> =
            join_all(futures).await.into_iter().collect();

        tracing::info!(
            requested = items.len(),
            sessions = by_session.len(),
            failed = by_session.values().filter(|r| r.is_err()).count(),
            "Batch fetch complete"
        );

        items
            .iter()
            .map(|item| match by_session.get(item.session_id.as_str()) {
                Some(Ok(data)) => Ok(TrackingData {
                    coordinates: item.window(&data.coordinates),
                    ..data.clone()
                }),
                Some(Err(e)) => Err(e.clone()),
                None => Err("No result".to_string()),
            })
            .collect()
    }

    /// Fetch new track points for every item, one upstream fetch per session.
    ///
    /// Items without a `begin` cursor get the whole window. One outcome per
    /// input item, in input order.
    pub async fn fetch_updates_batch(
        &self,
        items: &[BatchItem],
    ) -> Vec<BatchOutcome<Vec<Coordinate>>> {
        let unique = merge_by_session(items);

        let futures = unique.iter().map(|item| async move {
            let session = item.session();
            let result = match item.begin {
                Some(begin) => self.fetch_updates(&session, begin).await,
                None => self.source().track_points(&session, None).await,
            };
            let outcome = result.map_err(|e| {
                tracing::debug!(session_id = %item.session_id, error = %e, "Update fetch failed");
                e.to_string()
            });
            (item.session_id.as_str(), outcome)
        });
        let by_session: HashMap<&str, BatchOutcome<Vec<Coordinate>>> =
            join_all(futures).await.into_iter().collect();

        items
            .iter()
            .map(|item| match by_session.get(item.session_id.as_str()) {
                Some(Ok(coordinates)) => Ok(item.window(coordinates)),
                Some(Err(e)) => Err(e.clone()),
                None => Err("No result".to_string()),
            })
            .collect()
    }
}

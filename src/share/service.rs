//! Share service
//!
//! Find-or-create over the share repository. Identical configurations map
//! to the same share id; a hash match whose stored content differs is
//! treated as a different configuration.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::error::{ShareError, ShareResult};
use super::hash::{parse_cell_key, CellData, GridState, MultiTrackState, ShareContent, ShareKind};
use super::id::{generate_share_id, is_valid_share_id};
use super::repository::{ShareRecord, ShareRepository};

/// Id generation settings
#[derive(Debug, Clone, Copy)]
pub struct ShareIdPolicy {
    pub length: usize,
    pub max_attempts: usize,
}

impl Default for ShareIdPolicy {
    fn default() -> Self {
        Self {
            length: 4,
            max_attempts: 10,
        }
    }
}

/// Result of a share request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareOutcome {
    pub share_id: String,
    pub share_url: String,
    pub is_existing: bool,
}

pub struct ShareService {
    repo: Arc<dyn ShareRepository>,
    base_url: String,
    ids: ShareIdPolicy,
    /// Held from the hash lookup through the insert
    create_lock: Mutex<()>,
}

impl ShareService {
    pub fn new(repo: Arc<dyn ShareRepository>, base_url: impl Into<String>) -> Self {
        Self {
            repo,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ids: ShareIdPolicy::default(),
            create_lock: Mutex::new(()),
        }
    }

    pub fn with_id_policy(mut self, ids: ShareIdPolicy) -> Self {
        self.ids = ids;
        self
    }

    pub fn repository(&self) -> &Arc<dyn ShareRepository> {
        &self.repo
    }

    /// `{base}/share/{id}` or `{base}/multi-track/share/{id}`
    pub fn share_url(&self, kind: ShareKind, share_id: &str) -> String {
        format!("{}{}/share/{}", self.base_url, kind.url_prefix(), share_id)
    }

    pub async fn find_or_create_grid_share(&self, grid: &GridState) -> ShareResult<ShareOutcome> {
        self.find_or_create(ShareKind::Grid, grid.content()?).await
    }

    /// Lookup only; never inserts
    pub async fn check_grid_share(&self, grid: &GridState) -> ShareResult<Option<ShareOutcome>> {
        let content = grid.content()?;
        let hash = content.state_hash()?;
        Ok(self
            .find_existing(ShareKind::Grid, &content, &hash)
            .await?
            .map(|record| self.outcome(ShareKind::Grid, record.share_id, true)))
    }

    pub async fn find_or_create_multi_track_share(
        &self,
        state: &MultiTrackState,
    ) -> ShareResult<ShareOutcome> {
        self.find_or_create(ShareKind::MultiTrack, state.content()?).await
    }

    /// Grid layout stored under `share_id`
    pub async fn resolve_grid(&self, share_id: &str) -> ShareResult<GridState> {
        let record = self.resolve(ShareKind::Grid, share_id).await?;
        Ok(GridState {
            rows: record.rows,
            cols: record.cols,
            cell_data: record
                .cell_data
                .into_iter()
                .map(|(key, url)| (key, CellData::new(url)))
                .collect(),
        })
    }

    /// URLs stored under `share_id`, in row order, empty entries skipped
    pub async fn resolve_multi_track(&self, share_id: &str) -> ShareResult<MultiTrackState> {
        let record = self.resolve(ShareKind::MultiTrack, share_id).await?;

        let mut cells: Vec<(u32, String)> = record
            .cell_data
            .into_iter()
            .filter(|(_, url)| !url.is_empty())
            .map(|(key, url)| {
                let row = parse_cell_key(&key).map_or(u32::MAX, |(row, _)| row);
                (row, url)
            })
            .collect();
        cells.sort_by_key(|(row, _)| *row);

        Ok(MultiTrackState::new(cells.into_iter().map(|(_, url)| url).collect()))
    }

    async fn resolve(&self, kind: ShareKind, share_id: &str) -> ShareResult<ShareRecord> {
        if !is_valid_share_id(share_id) {
            return Err(ShareError::NotFound(share_id.to_string()));
        }

        match self.repo.find_by_share_id(share_id).await? {
            Some(record) if record.kind == kind => Ok(record),
            _ => Err(ShareError::NotFound(share_id.to_string())),
        }
    }

    async fn find_or_create(
        &self,
        kind: ShareKind,
        content: ShareContent,
    ) -> ShareResult<ShareOutcome> {
        let hash = content.state_hash()?;

        // Concurrent requests for one configuration must end on one share
        let _guard = self.create_lock.lock().await;

        if let Some(existing) = self.find_existing(kind, &content, &hash).await? {
            tracing::debug!(share_id = %existing.share_id, kind = kind.as_str(), "Reusing existing share");
            return Ok(self.outcome(kind, existing.share_id, true));
        }

        for attempt in 1..=self.ids.max_attempts {
            let share_id = generate_share_id(self.ids.length);
            if self.repo.share_id_exists(&share_id).await? {
                tracing::debug!(attempt, "Share id collision, retrying");
                continue;
            }

            let record = ShareRecord::new(share_id, kind, content.clone(), hash.clone());
            if self.repo.insert(&record).await? {
                tracing::info!(
                    share_id = %record.share_id,
                    kind = kind.as_str(),
                    rows = record.rows,
                    cols = record.cols,
                    "Created share"
                );
                return Ok(self.outcome(kind, record.share_id, false));
            }
            // Lost a race for the id between the check and the insert
            tracing::debug!(attempt, "Share id taken on insert, retrying");
        }

        tracing::error!(attempts = self.ids.max_attempts, "Share id space exhausted");
        Err(ShareError::IdExhausted(self.ids.max_attempts))
    }

    async fn find_existing(
        &self,
        kind: ShareKind,
        content: &ShareContent,
        hash: &str,
    ) -> ShareResult<Option<ShareRecord>> {
        let candidates = self.repo.find_by_state_hash(hash, kind).await?;
        let total = candidates.len();
        let found = candidates.into_iter().find(|record| record.matches(content));

        if found.is_none() && total > 0 {
            tracing::warn!(hash, candidates = total, "State hash collision with different content");
        }
        Ok(found)
    }

    fn outcome(&self, kind: ShareKind, share_id: String, is_existing: bool) -> ShareOutcome {
        ShareOutcome {
            share_url: self.share_url(kind, &share_id),
            share_id,
            is_existing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::share::repository::{MemoryShareRepository, SqliteShareRepository};

    fn service(repo: Arc<MemoryShareRepository>) -> ShareService {
        ShareService::new(repo, "https://grid.example/")
    }

    fn grid(cells: &[(&str, &str)]) -> GridState {
        GridState {
            rows: 2,
            cols: 2,
            cell_data: cells
                .iter()
                .map(|(k, url)| (k.to_string(), CellData::new(*url)))
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_grid_share_is_idempotent() {
        let repo = Arc::new(MemoryShareRepository::new());
        let shares = service(repo.clone());
        let state = grid(&[("0-0", "https://a.example"), ("1-1", "https://b.example")]);

        let first = shares.find_or_create_grid_share(&state).await.unwrap();
        let second = shares.find_or_create_grid_share(&state).await.unwrap();

        assert!(!first.is_existing);
        assert!(second.is_existing);
        assert_eq!(first.share_id, second.share_id);
        assert_eq!(first.share_id.len(), 4);
        assert_eq!(
            first.share_url,
            format!("https://grid.example/share/{}", first.share_id)
        );
        assert_eq!(repo.insert_count(), 1);
    }

    #[tokio::test]
    async fn test_check_does_not_insert() {
        let repo = Arc::new(MemoryShareRepository::new());
        let shares = service(repo.clone());
        let state = grid(&[("0-0", "https://a.example")]);

        assert!(shares.check_grid_share(&state).await.unwrap().is_none());
        assert_eq!(repo.insert_count(), 0);

        let created = shares.find_or_create_grid_share(&state).await.unwrap();
        let checked = shares.check_grid_share(&state).await.unwrap().unwrap();
        assert_eq!(checked.share_id, created.share_id);
        assert!(checked.is_existing);
    }

    #[tokio::test]
    async fn test_hash_collision_creates_new_share() {
        let repo = Arc::new(MemoryShareRepository::new());
        let shares = service(repo.clone());
        let state = grid(&[("0-0", "https://a.example")]);
        let content = state.content().unwrap();

        // Plant a record under the same hash with different cells
        let mut impostor = ShareRecord::new(
            "Zzzz".to_string(),
            ShareKind::Grid,
            content.clone(),
            content.state_hash().unwrap(),
        );
        impostor.cell_data.insert("1-1".to_string(), "https://evil.example".to_string());
        repo.insert(&impostor).await.unwrap();

        let outcome = shares.find_or_create_grid_share(&state).await.unwrap();
        assert!(!outcome.is_existing);
        assert_ne!(outcome.share_id, "Zzzz");
        assert_eq!(repo.insert_count(), 2);
    }

    #[tokio::test]
    async fn test_kinds_do_not_share_records() {
        let repo = Arc::new(MemoryShareRepository::new());
        let shares = service(repo.clone());

        let multi = MultiTrackState::new(vec!["https://gar.mn/a".to_string()]);
        let as_grid = GridState {
            rows: 1,
            cols: 1,
            cell_data: [("0-0".to_string(), CellData::new("https://gar.mn/a"))]
                .into_iter()
                .collect(),
        };

        let m = shares.find_or_create_multi_track_share(&multi).await.unwrap();
        let g = shares.find_or_create_grid_share(&as_grid).await.unwrap();

        assert!(!g.is_existing);
        assert_ne!(m.share_id, g.share_id);
        assert!(m.share_url.contains("/multi-track/share/"));

        let err = shares.resolve_grid(&m.share_id).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_resolve_multi_track_orders_by_row() {
        let repo = Arc::new(MemoryShareRepository::new());
        let shares = service(repo.clone());

        let urls: Vec<String> = (0..12).map(|i| format!("https://gar.mn/{}", i)).collect();
        let created = shares
            .find_or_create_multi_track_share(&MultiTrackState::new(urls.clone()))
            .await
            .unwrap();

        let resolved = shares.resolve_multi_track(&created.share_id).await.unwrap();
        assert_eq!(resolved.urls, urls);
    }

    #[tokio::test]
    async fn test_resolve_skips_empty_urls() {
        let repo = Arc::new(MemoryShareRepository::new());
        let shares = service(repo.clone());

        let state = MultiTrackState::new(vec!["a".into(), String::new(), "c".into()]);
        let created = shares.find_or_create_multi_track_share(&state).await.unwrap();

        let resolved = shares.resolve_multi_track(&created.share_id).await.unwrap();
        assert_eq!(resolved.urls, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_resolve_grid_round_trip() {
        let repo = Arc::new(MemoryShareRepository::new());
        let shares = service(repo);
        let state = grid(&[("0-1", "https://a.example")]);

        let created = shares.find_or_create_grid_share(&state).await.unwrap();
        assert_eq!(shares.resolve_grid(&created.share_id).await.unwrap(), state);

        assert!(shares.resolve_grid("nope").await.unwrap_err().is_not_found());
        assert!(shares.resolve_grid("../x").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_id_exhaustion() {
        let repo = Arc::new(MemoryShareRepository::new());
        let shares = service(repo.clone()).with_id_policy(ShareIdPolicy {
            length: 1,
            max_attempts: 3,
        });

        // Occupy the whole one-character id space
        let content = grid(&[("0-0", "https://taken.example")]).content().unwrap();
        for c in b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789" {
            let record = ShareRecord::new(
                (*c as char).to_string(),
                ShareKind::Grid,
                content.clone(),
                "unrelated".to_string(),
            );
            repo.insert(&record).await.unwrap();
        }

        let err = shares
            .find_or_create_grid_share(&grid(&[("0-0", "https://fresh.example")]))
            .await
            .unwrap_err();
        assert!(matches!(err, ShareError::IdExhausted(3)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_identical_shares_store_one_row() {
        let repo = Arc::new(SqliteShareRepository::in_memory().unwrap());
        let shares = Arc::new(ShareService::new(repo.clone(), "https://grid.example"));
        let state = MultiTrackState::new(vec![
            "https://livetrack.garmin.com/session/a/token/A".to_string(),
            "https://livetrack.garmin.com/session/b/token/B".to_string(),
        ]);

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let shares = shares.clone();
                let state = state.clone();
                tokio::spawn(async move { shares.find_or_create_multi_track_share(&state).await })
            })
            .collect();
        let outcomes: Vec<ShareOutcome> = futures_util::future::join_all(tasks)
            .await
            .into_iter()
            .map(|joined| joined.unwrap().unwrap())
            .collect();

        assert!(outcomes.iter().all(|o| o.share_id == outcomes[0].share_id));
        assert_eq!(outcomes.iter().filter(|o| !o.is_existing).count(), 1);
        assert_eq!(repo.count().await.unwrap(), 1);
    }
}

//! Share record persistence
//!
//! [`ShareRepository`] is the seam between the share service and its
//! storage. [`SqliteShareRepository`] keeps records in an embedded SQLite
//! table; [`MemoryShareRepository`] keeps them in a vector.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, ErrorCode, OpenFlags, OptionalExtension};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::error::{ShareError, ShareResult};
use super::hash::{ShareContent, ShareKind};

/// A persisted share; immutable once written
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareRecord {
    pub share_id: String,
    pub kind: ShareKind,
    pub rows: u32,
    pub cols: u32,
    /// Cell key to URL
    pub cell_data: BTreeMap<String, String>,
    pub state_hash: String,
    pub created_at: DateTime<Utc>,
}

impl ShareRecord {
    pub fn new(share_id: String, kind: ShareKind, content: ShareContent, state_hash: String) -> Self {
        Self {
            share_id,
            kind,
            rows: content.rows,
            cols: content.cols,
            cell_data: content.cells,
            state_hash,
            created_at: Utc::now(),
        }
    }

    /// Whether this record stores exactly `content`
    pub fn matches(&self, content: &ShareContent) -> bool {
        self.rows == content.rows && self.cols == content.cols && self.cell_data == content.cells
    }
}

/// Storage for share records
#[async_trait]
pub trait ShareRepository: Send + Sync {
    /// Records with this hash and kind, newest first
    async fn find_by_state_hash(
        &self,
        state_hash: &str,
        kind: ShareKind,
    ) -> ShareResult<Vec<ShareRecord>>;

    async fn find_by_share_id(&self, share_id: &str) -> ShareResult<Option<ShareRecord>>;

    async fn share_id_exists(&self, share_id: &str) -> ShareResult<bool>;

    /// Insert a record. Returns `false` when the share id is already taken.
    async fn insert(&self, record: &ShareRecord) -> ShareResult<bool>;

    async fn count(&self) -> ShareResult<u64>;
}

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS shared_grids (
        share_id TEXT PRIMARY KEY,
        kind TEXT NOT NULL,
        rows INTEGER NOT NULL,
        cols INTEGER NOT NULL,
        cell_data TEXT NOT NULL,
        state_hash TEXT NOT NULL,
        created_at INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_shared_grids_hash ON shared_grids(state_hash, kind);
";

const SELECT_COLUMNS: &str =
    "SELECT share_id, kind, rows, cols, cell_data, state_hash, created_at FROM shared_grids";

/// Row as stored, before JSON and kind decoding
type RawRecord = (String, String, u32, u32, String, String, i64);

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRecord> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn decode(raw: RawRecord) -> ShareResult<ShareRecord> {
    let (share_id, kind, rows, cols, cell_data, state_hash, created_at) = raw;

    let kind = ShareKind::parse(&kind)
        .ok_or_else(|| ShareError::InvalidState(format!("unknown share kind {:?}", kind)))?;

    Ok(ShareRecord {
        share_id,
        kind,
        rows,
        cols,
        cell_data: serde_json::from_str(&cell_data)?,
        state_hash,
        created_at: Utc
            .timestamp_millis_opt(created_at)
            .single()
            .unwrap_or_else(Utc::now),
    })
}

/// SQLite-backed share repository (`shares.db`)
pub struct SqliteShareRepository {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl SqliteShareRepository {
    /// Create or open `shares.db` in `data_dir`
    pub fn open(data_dir: &Path) -> ShareResult<Self> {
        std::fs::create_dir_all(data_dir)?;
        let path = data_dir.join("shares.db");

        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")?;

        tracing::info!(path = %path.display(), "Opened share database");
        Self::init(conn, Some(path))
    }

    /// Private in-memory database
    pub fn in_memory() -> ShareResult<Self> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> ShareResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    async fn with_conn<T, F>(&self, f: F) -> ShareResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> ShareResult<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|_| ShareError::Task("share database lock poisoned".to_string()))?;
            f(&conn)
        })
        .await
        .map_err(|e| ShareError::Task(e.to_string()))?
    }
}

#[async_trait]
impl ShareRepository for SqliteShareRepository {
    async fn find_by_state_hash(
        &self,
        state_hash: &str,
        kind: ShareKind,
    ) -> ShareResult<Vec<ShareRecord>> {
        let state_hash = state_hash.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "{} WHERE state_hash = ?1 AND kind = ?2 ORDER BY created_at DESC, rowid DESC",
                SELECT_COLUMNS
            ))?;
            let rows = stmt
                .query_map(params![state_hash, kind.as_str()], read_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows.into_iter().map(decode).collect()
        })
        .await
    }

    async fn find_by_share_id(&self, share_id: &str) -> ShareResult<Option<ShareRecord>> {
        let share_id = share_id.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                &format!("{} WHERE share_id = ?1", SELECT_COLUMNS),
                params![share_id],
                read_row,
            )
            .optional()?
            .map(decode)
            .transpose()
        })
        .await
    }

    async fn share_id_exists(&self, share_id: &str) -> ShareResult<bool> {
        let share_id = share_id.to_string();
        self.with_conn(move |conn| {
            let found = conn
                .query_row(
                    "SELECT 1 FROM shared_grids WHERE share_id = ?1",
                    params![share_id],
                    |_| Ok(()),
                )
                .optional()?;
            Ok(found.is_some())
        })
        .await
    }

    async fn insert(&self, record: &ShareRecord) -> ShareResult<bool> {
        let record = record.clone();
        self.with_conn(move |conn| {
            let cell_data = serde_json::to_string(&record.cell_data)?;
            let result = conn.execute(
                "INSERT INTO shared_grids (share_id, kind, rows, cols, cell_data, state_hash, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.share_id,
                    record.kind.as_str(),
                    record.rows,
                    record.cols,
                    cell_data,
                    record.state_hash,
                    record.created_at.timestamp_millis(),
                ],
            );

            match result {
                Ok(_) => Ok(true),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == ErrorCode::ConstraintViolation =>
                {
                    Ok(false)
                }
                Err(e) => Err(e.into()),
            }
        })
        .await
    }

    async fn count(&self) -> ShareResult<u64> {
        self.with_conn(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM shared_grids", [], |row| row.get(0))?;
            Ok(count as u64)
        })
        .await
    }
}

/// Vector-backed repository that counts successful inserts
#[derive(Default)]
pub struct MemoryShareRepository {
    records: Mutex<Vec<ShareRecord>>,
    inserts: AtomicUsize,
}

impl MemoryShareRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_count(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    fn records(&self) -> ShareResult<std::sync::MutexGuard<'_, Vec<ShareRecord>>> {
        self.records
            .lock()
            .map_err(|_| ShareError::Task("share records lock poisoned".to_string()))
    }
}

#[async_trait]
impl ShareRepository for MemoryShareRepository {
    async fn find_by_state_hash(
        &self,
        state_hash: &str,
        kind: ShareKind,
    ) -> ShareResult<Vec<ShareRecord>> {
        Ok(self
            .records()?
            .iter()
            .rev()
            .filter(|r| r.state_hash == state_hash && r.kind == kind)
            .cloned()
            .collect())
    }

    async fn find_by_share_id(&self, share_id: &str) -> ShareResult<Option<ShareRecord>> {
        Ok(self
            .records()?
            .iter()
            .find(|r| r.share_id == share_id)
            .cloned())
    }

    async fn share_id_exists(&self, share_id: &str) -> ShareResult<bool> {
        Ok(self.records()?.iter().any(|r| r.share_id == share_id))
    }

    async fn insert(&self, record: &ShareRecord) -> ShareResult<bool> {
        let mut records = self.records()?;
        if records.iter().any(|r| r.share_id == record.share_id) {
            return Ok(false);
        }
        records.push(record.clone());
        self.inserts.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }

    async fn count(&self) -> ShareResult<u64> {
        Ok(self.records()?.len() as u64)
    }
}

//! Memory stores
//!
//! Persistence backends for memory records. `SqliteStore` is the durable
//! store used by the binaries; `InMemoryStore` backs tests and demos.
//! Both sit behind the `MemoryStore` trait so the accessor and the
//! analytics engine never care which one they are talking to.

use crate::memory::types::{MemoryRecord, Mood};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use rusqlite::Connection;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors from the persistence layer
#[derive(Error, Debug)]
pub enum StoreError {
    /// Underlying sqlite failure
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Serialization of topics/people/embedding columns failed
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O failure opening or creating the store
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored row failed validation (bad timestamp, malformed column)
    #[error("corrupt record {id}: {reason}")]
    Corrupt { id: String, reason: String },

    /// Lock acquisition failed
    #[error("lock error: {0}")]
    Lock(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence contract for memory records
///
/// `fetch_memories` returns records newest-first; `limit` bounds the
/// working set. Implementations must tolerate rows with absent
/// sentiment/mood/topics/people/embedding.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Fetch a user's records, newest-first, bounded by `limit`
    async fn fetch_memories(
        &self,
        user_id: &str,
        limit: Option<usize>,
    ) -> StoreResult<Vec<MemoryRecord>>;

    /// Persist a record for a user
    async fn insert(&self, user_id: &str, record: MemoryRecord) -> StoreResult<()>;

    /// Number of records stored for a user
    async fn count(&self, user_id: &str) -> StoreResult<usize>;
}

/// Sqlite-backed store
///
/// Topics, people and embeddings are stored as JSON columns; timestamps as
/// Unix milliseconds. Queries are short single-row or indexed scans, so the
/// connection sits behind a plain mutex.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-process, non-persistent store (used by tests)
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> StoreResult<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS memories (
                id         TEXT PRIMARY KEY,
                user_id    TEXT NOT NULL,
                text       TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                sentiment  REAL,
                mood       TEXT,
                topics     TEXT,
                people     TEXT,
                embedding  TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_memories_user_time
                ON memories (user_id, created_at DESC);",
        )?;
        Ok(())
    }

    fn row_to_record(row: &rusqlite::Row<'_>) -> Result<MemoryRecord, rusqlite::Error> {
        let id: String = row.get(0)?;
        let text: String = row.get(1)?;
        let created_ms: i64 = row.get(2)?;
        let sentiment: Option<f64> = row.get(3)?;
        let mood: Option<String> = row.get(4)?;
        let topics: Option<String> = row.get(5)?;
        let people: Option<String> = row.get(6)?;
        let embedding: Option<String> = row.get(7)?;

        let created_at = Utc
            .timestamp_millis_opt(created_ms)
            .single()
            .unwrap_or_else(Utc::now);

        Ok(MemoryRecord {
            id,
            text,
            created_at,
            sentiment: sentiment.map(|s| s.clamp(-1.0, 1.0)),
            mood: mood.as_deref().and_then(Mood::parse),
            topics: parse_set(topics.as_deref()),
            people: parse_set(people.as_deref()),
            embedding: embedding
                .as_deref()
                .and_then(|e| serde_json::from_str(e).ok()),
        })
    }
}

/// Parse a JSON string-array column, defaulting to empty on absence or
/// malformed content
fn parse_set(raw: Option<&str>) -> BTreeSet<String> {
    raw.and_then(|r| serde_json::from_str::<Vec<String>>(r).ok())
        .map(|v| v.into_iter().map(|s| s.to_lowercase()).collect())
        .unwrap_or_default()
}

#[async_trait]
impl MemoryStore for SqliteStore {
    async fn fetch_memories(
        &self,
        user_id: &str,
        limit: Option<usize>,
    ) -> StoreResult<Vec<MemoryRecord>> {
        let conn = self.conn.lock().map_err(|_| {
            StoreError::Lock("store connection poisoned".to_string())
        })?;

        let mut stmt = conn.prepare(
            "SELECT id, text, created_at, sentiment, mood, topics, people, embedding
             FROM memories WHERE user_id = ?1
             ORDER BY created_at DESC
             LIMIT ?2",
        )?;

        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let rows = stmt.query_map(rusqlite::params![user_id, limit], Self::row_to_record)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    async fn insert(&self, user_id: &str, record: MemoryRecord) -> StoreResult<()> {
        let topics = serde_json::to_string(&record.topics.iter().collect::<Vec<_>>())?;
        let people = serde_json::to_string(&record.people.iter().collect::<Vec<_>>())?;
        let embedding = record
            .embedding
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let conn = self.conn.lock().map_err(|_| {
            StoreError::Lock("store connection poisoned".to_string())
        })?;

        conn.execute(
            "INSERT OR REPLACE INTO memories
             (id, user_id, text, created_at, sentiment, mood, topics, people, embedding)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            rusqlite::params![
                record.id,
                user_id,
                record.text,
                record.created_at.timestamp_millis(),
                record.sentiment,
                record.mood.map(|m| m.to_string()),
                topics,
                people,
                embedding,
            ],
        )?;
        Ok(())
    }

    async fn count(&self, user_id: &str) -> StoreResult<usize> {
        let conn = self.conn.lock().map_err(|_| {
            StoreError::Lock("store connection poisoned".to_string())
        })?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM memories WHERE user_id = ?1",
            rusqlite::params![user_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

/// In-memory store for tests and demos
#[derive(Default)]
pub struct InMemoryStore {
    records: RwLock<HashMap<String, Vec<MemoryRecord>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bulk-seed records for a user
    pub async fn seed(&self, user_id: &str, records: Vec<MemoryRecord>) {
        let mut guard = self.records.write().await;
        guard.entry(user_id.to_string()).or_default().extend(records);
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn fetch_memories(
        &self,
        user_id: &str,
        limit: Option<usize>,
    ) -> StoreResult<Vec<MemoryRecord>> {
        let guard = self.records.read().await;
        let mut records = guard.get(user_id).cloned().unwrap_or_default();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = limit {
            records.truncate(limit);
        }
        Ok(records)
    }

    async fn insert(&self, user_id: &str, record: MemoryRecord) -> StoreResult<()> {
        let mut guard = self.records.write().await;
        guard.entry(user_id.to_string()).or_default().push(record);
        Ok(())
    }

    async fn count(&self, user_id: &str) -> StoreResult<usize> {
        let guard = self.records.read().await;
        Ok(guard.get(user_id).map(|r| r.len()).unwrap_or(0))
    }
}

// Session history
// Externally-owned chat history collaborator, keyed by session id. The
// workflow core never consults it; the host surface appends the user
// turn and the accepted answer around each run.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use crate::errors::HistoryError;

const MAX_FETCH_LIMIT: usize = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: String,
    pub content: String,
    pub created_at: String,
}

/// Ordered per-session chat history.
#[async_trait]
pub trait SessionHistory: Send + Sync {
    /// Oldest-first turns for a session, capped at `limit`.
    async fn fetch(&self, session_id: &str, limit: usize) -> Result<Vec<HistoryTurn>, HistoryError>;

    /// Append one turn to a session, creating the session on first use.
    async fn append(&self, session_id: &str, role: &str, content: &str)
        -> Result<(), HistoryError>;
}

/// SQLite-backed history store.
#[derive(Debug, Clone)]
pub struct SqliteHistoryStore {
    pool: SqlitePool,
}

impl SqliteHistoryStore {
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self, HistoryError> {
        let connect_options = SqliteConnectOptions::new()
            .filename(db_path.as_ref())
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(connect_options)
            .await?;

        let store = Self { pool };
        store.init_db().await?;
        Ok(store)
    }

    async fn init_db(&self) -> Result<(), HistoryError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                created_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS turns (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_turns_session ON turns(session_id, id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl SessionHistory for SqliteHistoryStore {
    async fn fetch(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<HistoryTurn>, HistoryError> {
        let limit = limit.min(MAX_FETCH_LIMIT) as i64;
        let rows = sqlx::query(
            "SELECT role, content, created_at FROM turns
             WHERE session_id = ? ORDER BY id ASC LIMIT ?",
        )
        .bind(session_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| HistoryTurn {
                role: row.get("role"),
                content: row.get("content"),
                created_at: row.get("created_at"),
            })
            .collect())
    }

    async fn append(
        &self,
        session_id: &str,
        role: &str,
        content: &str,
    ) -> Result<(), HistoryError> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT OR IGNORE INTO sessions (id, created_at) VALUES (?, ?)")
            .bind(session_id)
            .bind(&now)
            .execute(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO turns (session_id, role, content, created_at) VALUES (?, ?, ?, ?)")
            .bind(session_id)
            .bind(role)
            .bind(content)
            .bind(&now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

//! SQLite state backend
//!
//! Durable storage for conversation state using sqlx with WAL mode for
//! better concurrency. One row per conversation id; state and session data
//! are stored as JSON text, timestamps as unix epoch seconds. All queries
//! are parameterized.

use super::{ConversationRecord, Result, StateBackend, StateError};
use async_trait::async_trait;
use sdk::context::StateMap;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{ConnectOptions, Row};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

/// SQLite-backed implementation of [`StateBackend`]
pub struct SqliteStateBackend {
    pool: SqlitePool,
}

impl SqliteStateBackend {
    /// Open (or create) the state database at the given path
    ///
    /// Enables WAL mode, creates the file and parent directory if missing,
    /// and applies the schema migration.
    pub async fn new(db_path: &Path) -> Result<Self> {
        info!("Opening state database at: {}", db_path.display());

        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StateError::Database(format!("Failed to create db directory: {}", e)))?;
        }

        let connection_string = format!("sqlite:{}", db_path.display());
        let options = SqliteConnectOptions::from_str(&connection_string)
            .map_err(|e| StateError::Database(e.to_string()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true)
            .disable_statement_logging();

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StateError::Database(format!("Failed to connect: {}", e)))?;

        debug!("State database connection established");

        sqlx::raw_sql(include_str!("../../migrations/001_conversation_state.sql"))
            .execute(&pool)
            .await
            .map_err(|e| StateError::Database(format!("Migration failed: {}", e)))?;

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Flush the WAL and close all connections; call during shutdown
    pub async fn close(self) -> Result<()> {
        sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
            .execute(&self.pool)
            .await
            .map_err(|e| StateError::Database(format!("Failed to flush WAL: {}", e)))?;

        self.pool.close().await;
        Ok(())
    }
}

#[async_trait]
impl StateBackend for SqliteStateBackend {
    async fn get(&self, conversation_id: &str) -> Result<Option<ConversationRecord>> {
        let row = sqlx::query(
            "SELECT conversation_id, user_id, state, session_data, last_updated \
             FROM conversation_state WHERE conversation_id = ?",
        )
        .bind(conversation_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StateError::Database(format!("Failed to fetch state: {}", e)))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let state: StateMap = serde_json::from_str(row.get::<String, _>("state").as_str())?;
        let session_data: StateMap =
            serde_json::from_str(row.get::<String, _>("session_data").as_str())?;

        Ok(Some(ConversationRecord {
            conversation_id: row.get("conversation_id"),
            user_id: row.get("user_id"),
            state,
            session_data,
            last_updated: row.get("last_updated"),
        }))
    }

    async fn set(&self, record: &ConversationRecord) -> Result<()> {
        let state = serde_json::to_string(&record.state)?;
        let session_data = serde_json::to_string(&record.session_data)?;

        sqlx::query(
            "INSERT INTO conversation_state \
             (conversation_id, user_id, state, session_data, last_updated) \
             VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT(conversation_id) DO UPDATE SET \
             user_id = excluded.user_id, state = excluded.state, \
             session_data = excluded.session_data, last_updated = excluded.last_updated",
        )
        .bind(&record.conversation_id)
        .bind(&record.user_id)
        .bind(state)
        .bind(session_data)
        .bind(record.last_updated)
        .execute(&self.pool)
        .await
        .map_err(|e| StateError::Database(format!("Failed to store state: {}", e)))?;

        Ok(())
    }

    async fn delete(&self, conversation_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM conversation_state WHERE conversation_id = ?")
            .bind(conversation_id)
            .execute(&self.pool)
            .await
            .map_err(|e| StateError::Database(format!("Failed to delete state: {}", e)))?;

        Ok(())
    }

    async fn list_older_than(&self, cutoff: i64) -> Result<Vec<String>> {
        let ids: Vec<String> = sqlx::query_scalar(
            "SELECT conversation_id FROM conversation_state WHERE last_updated < ?",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StateError::Database(format!("Failed to list stale state: {}", e)))?;

        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::unix_now;
    use serde_json::json;
    use tempfile::TempDir;

    async fn open_backend(dir: &TempDir) -> SqliteStateBackend {
        SqliteStateBackend::new(&dir.path().join("state.db"))
            .await
            .unwrap()
    }

    fn record(conversation_id: &str, last_updated: i64) -> ConversationRecord {
        ConversationRecord {
            conversation_id: conversation_id.to_string(),
            user_id: "user-1".to_string(),
            state: StateMap::from([("topic".to_string(), json!("weather"))]),
            session_data: StateMap::new(),
            last_updated,
        }
    }

    #[tokio::test]
    async fn test_set_then_get_round_trip() {
        let dir = TempDir::new().unwrap();
        let backend = open_backend(&dir).await;

        backend.set(&record("conv-1", unix_now())).await.unwrap();

        let fetched = backend.get("conv-1").await.unwrap().unwrap();
        assert_eq!(fetched.conversation_id, "conv-1");
        assert_eq!(fetched.user_id, "user-1");
        assert_eq!(fetched.state.get("topic"), Some(&json!("weather")));
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let dir = TempDir::new().unwrap();
        let backend = open_backend(&dir).await;

        assert!(backend.get("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_replaces_existing() {
        let dir = TempDir::new().unwrap();
        let backend = open_backend(&dir).await;

        backend.set(&record("conv-1", unix_now())).await.unwrap();

        let mut updated = record("conv-1", unix_now());
        updated.state.insert("topic".to_string(), json!("traffic"));
        backend.set(&updated).await.unwrap();

        let fetched = backend.get("conv-1").await.unwrap().unwrap();
        assert_eq!(fetched.state.get("topic"), Some(&json!("traffic")));
    }

    #[tokio::test]
    async fn test_delete() {
        let dir = TempDir::new().unwrap();
        let backend = open_backend(&dir).await;

        backend.set(&record("conv-1", unix_now())).await.unwrap();
        backend.delete("conv-1").await.unwrap();

        assert!(backend.get("conv-1").await.unwrap().is_none());
        // Deleting again is a no-op
        backend.delete("conv-1").await.unwrap();
    }

    #[tokio::test]
    async fn test_list_older_than() {
        let dir = TempDir::new().unwrap();
        let backend = open_backend(&dir).await;

        let now = unix_now();
        backend.set(&record("old", now - 7200)).await.unwrap();
        backend.set(&record("fresh", now)).await.unwrap();

        let stale = backend.list_older_than(now - 3600).await.unwrap();
        assert_eq!(stale, vec!["old".to_string()]);
    }
}

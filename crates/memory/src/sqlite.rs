//! SQLite conversation store.
//!
//! Uses a single SQLite database file with one table:
//! - `conversation_turns` — one row per turn, ordered by `position`
//!
//! A `put` deletes the conversation's rows and re-inserts the new list
//! inside one transaction, so readers see either the old or the new history.

use async_trait::async_trait;
use chrono::Utc;
use ragraph_core::error::MemoryError;
use ragraph_core::memory::ConversationStore;
use ragraph_core::message::{ConversationId, Message, Role};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

/// A SQLite-backed conversation store.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) a SQLite database at `path`.
    ///
    /// The database and table are created automatically.
    /// Pass `"sqlite::memory:"` for an in-process ephemeral database.
    pub async fn new(path: &str) -> Result<Self, MemoryError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| MemoryError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        // Every connection to ":memory:" is a separate database
        let max_connections = if path.contains(":memory:") { 1 } else { 4 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| MemoryError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite conversation store initialized at {path}");
        Ok(store)
    }

    /// Create from an existing pool.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, MemoryError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), MemoryError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS conversation_turns (
                conversation_id TEXT    NOT NULL,
                position        INTEGER NOT NULL,
                role            TEXT    NOT NULL,
                content         TEXT    NOT NULL,
                id              TEXT    NOT NULL,
                timestamp       TEXT    NOT NULL,
                PRIMARY KEY (conversation_id, position)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::MigrationFailed(format!("conversation_turns table: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    /// Parse a `Message` from a SQLite row.
    fn row_to_message(row: &sqlx::sqlite::SqliteRow) -> Result<Message, MemoryError> {
        let role_tag: String = row
            .try_get("role")
            .map_err(|e| MemoryError::QueryFailed(format!("role column: {e}")))?;
        let content: String = row
            .try_get("content")
            .map_err(|e| MemoryError::QueryFailed(format!("content column: {e}")))?;
        let id: String = row
            .try_get("id")
            .map_err(|e| MemoryError::QueryFailed(format!("id column: {e}")))?;
        let timestamp: String = row
            .try_get("timestamp")
            .map_err(|e| MemoryError::QueryFailed(format!("timestamp column: {e}")))?;

        let role = Role::parse(&role_tag)
            .ok_or_else(|| MemoryError::QueryFailed(format!("unknown role '{role_tag}'")))?;

        let timestamp = chrono::DateTime::parse_from_rfc3339(&timestamp)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| MemoryError::QueryFailed(format!("timestamp '{timestamp}': {e}")))?;

        Ok(Message {
            id,
            role,
            content,
            timestamp,
        })
    }
}

#[async_trait]
impl ConversationStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn get(&self, id: &ConversationId) -> Result<Vec<Message>, MemoryError> {
        let rows = sqlx::query(
            "SELECT role, content, id, timestamp FROM conversation_turns \
             WHERE conversation_id = ?1 ORDER BY position",
        )
        .bind(id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| MemoryError::QueryFailed(format!("SELECT turns: {e}")))?;

        rows.iter().map(Self::row_to_message).collect()
    }

    async fn put(&self, id: &ConversationId, turns: &[Message]) -> Result<(), MemoryError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| MemoryError::Storage(format!("BEGIN failed: {e}")))?;

        sqlx::query("DELETE FROM conversation_turns WHERE conversation_id = ?1")
            .bind(id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| MemoryError::Storage(format!("DELETE failed: {e}")))?;

        for (position, turn) in turns.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO conversation_turns (conversation_id, position, role, content, id, timestamp)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(id.as_str())
            .bind(position as i64)
            .bind(turn.role.as_str())
            .bind(&turn.content)
            .bind(&turn.id)
            .bind(turn.timestamp.to_rfc3339())
            .execute(&mut *tx)
            .await
            .map_err(|e| MemoryError::Storage(format!("INSERT failed: {e}")))?;
        }

        tx.commit()
            .await
            .map_err(|e| MemoryError::Storage(format!("COMMIT failed: {e}")))?;

        debug!(conversation_id = %id, turns = turns.len(), "Conversation written");
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ConversationId>, MemoryError> {
        let rows = sqlx::query(
            "SELECT DISTINCT conversation_id FROM conversation_turns ORDER BY conversation_id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| MemoryError::QueryFailed(format!("SELECT ids: {e}")))?;

        rows.iter()
            .map(|row| {
                row.try_get::<String, _>("conversation_id")
                    .map(ConversationId::from)
                    .map_err(|e| MemoryError::QueryFailed(format!("conversation_id column: {e}")))
            })
            .collect()
    }

    async fn delete(&self, id: &ConversationId) -> Result<bool, MemoryError> {
        let result = sqlx::query("DELETE FROM conversation_turns WHERE conversation_id = ?1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| MemoryError::Storage(format!("DELETE failed: {e}")))?;
        Ok(result.rows_affected() > 0)
    }
}

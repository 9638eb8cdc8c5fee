//! PostgreSQL implementation of the event store.

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use super::EventStore;
use crate::config::DatabaseConfig;
use crate::domain::GameEvent;
use crate::error::StoreError;

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS moves (\
     id BIGSERIAL PRIMARY KEY, \
     game_id TEXT NOT NULL, \
     timestamp BIGINT NOT NULL, \
     event_type TEXT NOT NULL, \
     fen TEXT, \
     move_from TEXT, \
     move_to TEXT)";

const CREATE_GAME_INDEX: &str = "CREATE INDEX IF NOT EXISTS moves_game_id_idx ON moves (game_id)";

type MoveRow = (
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    i64,
);

/// PostgreSQL-backed event store using `sqlx::PgPool`.
///
/// The pool is bounded by [`DatabaseConfig::max_connections`]; callers
/// beyond that limit wait for a free connection up to the configured
/// connect timeout. Cloning shares the same pool.
#[derive(Debug, Clone)]
pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    /// Opens the pool, checks connectivity and creates the `moves` table
    /// if it is missing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ConnectionFailed`] if the database is
    /// unreachable, rejects the credentials, or does not answer the
    /// ping within the connect timeout, and
    /// [`StoreError::SchemaInitFailed`] if table creation fails.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .max_lifetime(config.max_lifetime)
            .connect(&config.url)
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

        let store = Self::new(pool);
        store.ping(config.connect_timeout).await?;
        store.ensure_schema().await?;

        tracing::info!(
            max_connections = config.max_connections,
            "event store initialized"
        );
        Ok(store)
    }

    /// Wraps an existing pool without touching the schema.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn ping(&self, timeout: std::time::Duration) -> Result<(), StoreError> {
        let ping = sqlx::query("SELECT 1").execute(&self.pool);
        match tokio::time::timeout(timeout, ping).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(StoreError::ConnectionFailed(e.to_string())),
            Err(_) => Err(StoreError::ConnectionFailed(format!(
                "ping timed out after {timeout:?}"
            ))),
        }
    }

    /// Creates the `moves` table and its game index if absent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::SchemaInitFailed`] on database failure.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in [CREATE_TABLE, CREATE_GAME_INDEX] {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::SchemaInitFailed(e.to_string()))?;
        }
        Ok(())
    }
}

#[async_trait]
impl EventStore for PostgresEventStore {
    async fn append(&self, event: GameEvent) -> Result<(), StoreError> {
        let write_failed = |e: sqlx::Error| StoreError::WriteFailed(e.to_string());

        // Dropping an uncommitted transaction rolls it back.
        let mut tx = self.pool.begin().await.map_err(write_failed)?;
        sqlx::query(
            "INSERT INTO moves (game_id, timestamp, event_type, fen, move_from, move_to) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(event.game_id())
        .bind(event.timestamp())
        .bind(event.event_type())
        .bind(event.fen())
        .bind(event.move_from())
        .bind(event.move_to())
        .execute(&mut *tx)
        .await
        .map_err(write_failed)?;
        tx.commit().await.map_err(write_failed)?;

        Ok(())
    }

    async fn delete_by_game(&self, game_id: &str) -> Result<u64, StoreError> {
        let write_failed = |e: sqlx::Error| StoreError::WriteFailed(e.to_string());

        let mut tx = self.pool.begin().await.map_err(write_failed)?;
        let result = sqlx::query("DELETE FROM moves WHERE game_id = $1")
            .bind(game_id)
            .execute(&mut *tx)
            .await
            .map_err(write_failed)?;
        tx.commit().await.map_err(write_failed)?;

        Ok(result.rows_affected())
    }

    async fn list_all(&self) -> Result<Vec<GameEvent>, StoreError> {
        let rows = sqlx::query_as::<_, MoveRow>(
            "SELECT game_id, event_type, fen, move_from, move_to, timestamp \
             FROM moves ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::ReadFailed(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|(game_id, event_type, fen, move_from, move_to, timestamp)| {
                GameEvent::from_parts(game_id, event_type, fen, move_from, move_to, timestamp)
            })
            .collect())
    }

    async fn shutdown(&self) {
        if !self.pool.is_closed() {
            self.pool.close().await;
            tracing::info!("event store closed");
        }
    }
}

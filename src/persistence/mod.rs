//! Persistence layer: the durable tail of the event stream.
//!
//! [`EventStore`] is the only way any component touches storage. The
//! production implementation is [`PostgresEventStore`], backed by a
//! `sqlx::PgPool`; [`InMemoryEventStore`] implements the same contract
//! for local runs and tests. Stores are shared as `Arc<dyn EventStore>`.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::domain::GameEvent;
use crate::error::StoreError;

pub use memory::InMemoryEventStore;
pub use postgres::PostgresEventStore;

/// Append-only store of move events keyed by game.
///
/// Every write runs in its own transaction: a failed write leaves no
/// partial row behind. There is no update operation.
#[async_trait]
pub trait EventStore: Send + Sync + std::fmt::Debug {
    /// Inserts one row for `event`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::WriteFailed`] if the insert or its commit
    /// fails; the transaction is rolled back.
    async fn append(&self, event: GameEvent) -> Result<(), StoreError>;

    /// Deletes every row of `game_id` and returns how many were removed.
    ///
    /// Deleting a game with no rows succeeds and returns `0`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::WriteFailed`] if the delete or its commit
    /// fails; the transaction is rolled back.
    async fn delete_by_game(&self, game_id: &str) -> Result<u64, StoreError>;

    /// Returns every stored row in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ReadFailed`] on query or row decode failure.
    async fn list_all(&self) -> Result<Vec<GameEvent>, StoreError>;

    /// Releases the underlying resources. Idempotent.
    async fn shutdown(&self);
}

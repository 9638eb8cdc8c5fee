//! In-process implementation of the event store.
//!
//! Mirrors the PostgreSQL contract (surrogate row ids, insertion order,
//! per-call atomicity, failure after shutdown) without a database. Used
//! for local runs and for tests of the consumer and HTTP layers.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::EventStore;
use crate::domain::GameEvent;
use crate::error::StoreError;

#[derive(Debug, Default)]
struct Rows {
    next_id: i64,
    rows: Vec<(i64, GameEvent)>,
    closed: bool,
}

/// Event store held in memory behind a [`tokio::sync::RwLock`].
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    inner: RwLock<Rows>,
}

impl InMemoryEventStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` once [`EventStore::shutdown`] has run.
    pub async fn is_closed(&self) -> bool {
        self.inner.read().await.closed
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, event: GameEvent) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.closed {
            return Err(StoreError::WriteFailed("store is shut down".to_string()));
        }
        inner.next_id += 1;
        let id = inner.next_id;
        inner.rows.push((id, event));
        Ok(())
    }

    async fn delete_by_game(&self, game_id: &str) -> Result<u64, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.closed {
            return Err(StoreError::WriteFailed("store is shut down".to_string()));
        }
        let before = inner.rows.len();
        inner.rows.retain(|(_, event)| event.game_id() != game_id);
        Ok((before - inner.rows.len()) as u64)
    }

    async fn list_all(&self) -> Result<Vec<GameEvent>, StoreError> {
        let inner = self.inner.read().await;
        if inner.closed {
            return Err(StoreError::ReadFailed("store is shut down".to_string()));
        }
        Ok(inner.rows.iter().map(|(_, event)| event.clone()).collect())
    }

    async fn shutdown(&self) {
        self.inner.write().await.closed = true;
    }
}

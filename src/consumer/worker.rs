//! A single consumer worker: read, decode, route, persist.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::source::{MessageSource, QueueMessage};
use crate::domain::{EventKind, GameEvent};
use crate::error::{ConsumerError, DecodeError};
use crate::persistence::EventStore;

/// What happened to one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handled {
    /// A move row was appended.
    Appended,
    /// The game's rows were deleted.
    Deleted {
        /// Rows removed (zero is fine).
        rows: u64,
    },
    /// The event type is not routed anywhere.
    Ignored,
    /// The payload could not be decoded; the message was dropped.
    Undecodable,
    /// The store rejected the operation; the message was dropped.
    StoreFailed,
}

/// One sequential reader of a queue subscription.
///
/// Messages are handled strictly in receipt order and the next one is not
/// read until the current store call has finished. Cancellation is only
/// observed while waiting for a message, so a message already received is
/// always handled to completion.
#[derive(Debug)]
pub struct ConsumerWorker<S> {
    id: usize,
    source: S,
    store: Arc<dyn EventStore>,
}

impl<S: MessageSource> ConsumerWorker<S> {
    /// Creates a worker over its own subscription.
    #[must_use]
    pub fn new(id: usize, source: S, store: Arc<dyn EventStore>) -> Self {
        Self { id, source, store }
    }

    /// Worker index within its pool.
    #[must_use]
    pub const fn id(&self) -> usize {
        self.id
    }

    /// Runs until `cancel` fires or the subscription fails.
    ///
    /// Decode and store failures are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns the [`ConsumerError::Transport`] that ended the worker.
    /// Cancellation returns `Ok(())`.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<(), ConsumerError> {
        tracing::info!(worker = self.id, "consumer worker started");

        loop {
            let received = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    tracing::info!(worker = self.id, "consumer worker cancelled");
                    return Ok(());
                }
                received = self.source.recv() => received,
            };

            let message = match received {
                Ok(message) => message,
                Err(e) => {
                    tracing::error!(worker = self.id, error = %e, "consumer worker stopped");
                    return Err(e);
                }
            };

            route(self.id, self.store.as_ref(), &message).await;
            self.source.mark_processed(&message);
        }
    }

    /// Decodes and routes one message.
    pub async fn handle(&self, message: &QueueMessage) -> Handled {
        route(self.id, self.store.as_ref(), message).await
    }
}

async fn route(worker: usize, store: &dyn EventStore, message: &QueueMessage) -> Handled {
    let event = match decode(message) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(
                worker,
                partition = message.partition,
                offset = message.offset,
                error = %e,
                "dropping undecodable message"
            );
            return Handled::Undecodable;
        }
    };

    tracing::debug!(
        worker,
        game_id = event.game_id(),
        event_type = event.event_type(),
        offset = message.offset,
        "event received"
    );

    match event.kind() {
        EventKind::Move => {
            let game_id = event.game_id().to_string();
            match store.append(event).await {
                Ok(()) => Handled::Appended,
                Err(e) => {
                    tracing::warn!(worker, game_id = %game_id, error = %e, "failed to save move");
                    Handled::StoreFailed
                }
            }
        }
        EventKind::Delete => match store.delete_by_game(event.game_id()).await {
            Ok(rows) => {
                tracing::debug!(worker, game_id = event.game_id(), rows, "game deleted");
                Handled::Deleted { rows }
            }
            Err(e) => {
                tracing::warn!(
                    worker,
                    game_id = event.game_id(),
                    error = %e,
                    "failed to delete game events"
                );
                Handled::StoreFailed
            }
        },
        EventKind::Unrecognized => Handled::Ignored,
    }
}

fn decode(message: &QueueMessage) -> Result<GameEvent, DecodeError> {
    let payload = message.payload.as_deref().ok_or(DecodeError::MissingPayload)?;
    GameEvent::decode(payload)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::consumer::memory::MemoryQueue;
    use crate::error::StoreError;
    use crate::persistence::InMemoryEventStore;

    /// Store whose writes always fail.
    #[derive(Debug)]
    struct BrokenStore;

    #[async_trait]
    impl EventStore for BrokenStore {
        async fn append(&self, _event: GameEvent) -> Result<(), StoreError> {
            Err(StoreError::WriteFailed("disk full".to_string()))
        }

        async fn delete_by_game(&self, _game_id: &str) -> Result<u64, StoreError> {
            Err(StoreError::WriteFailed("disk full".to_string()))
        }

        async fn list_all(&self) -> Result<Vec<GameEvent>, StoreError> {
            Ok(Vec::new())
        }

        async fn shutdown(&self) {}
    }

    fn message(payload: &str) -> QueueMessage {
        QueueMessage {
            topic: "chess-events".to_string(),
            partition: 0,
            offset: 0,
            key: None,
            payload: Some(payload.as_bytes().to_vec()),
        }
    }

    const MOVE: &str = r#"{"game_id":"g1","event_type":"move","fen":"startpos","move_from":"e2","move_to":"e4","timestamp":1}"#;
    const DELETE: &str = r#"{"game_id":"g1","event_type":"delete","timestamp":2}"#;

    fn worker_with(
        store: Arc<dyn EventStore>,
    ) -> (MemoryQueue, ConsumerWorker<crate::consumer::MemorySubscription>) {
        let queue = MemoryQueue::new("chess-events");
        let worker = ConsumerWorker::new(0, queue.subscribe(), store);
        (queue, worker)
    }

    async fn listed(store: &InMemoryEventStore) -> Vec<GameEvent> {
        let Ok(events) = store.list_all().await else {
            panic!("list failed");
        };
        events
    }

    #[tokio::test]
    async fn move_is_appended() {
        let store = Arc::new(InMemoryEventStore::new());
        let (_queue, worker) = worker_with(Arc::clone(&store) as Arc<dyn EventStore>);

        assert_eq!(worker.handle(&message(MOVE)).await, Handled::Appended);
        assert_eq!(
            listed(&store).await,
            vec![GameEvent::new_move("g1", "startpos", "e2", "e4", 1)]
        );
    }

    #[tokio::test]
    async fn delete_clears_the_game() {
        let store = Arc::new(InMemoryEventStore::new());
        let (_queue, worker) = worker_with(Arc::clone(&store) as Arc<dyn EventStore>);

        worker.handle(&message(MOVE)).await;
        worker.handle(&message(MOVE)).await;
        assert_eq!(
            worker.handle(&message(DELETE)).await,
            Handled::Deleted { rows: 2 }
        );
        assert!(listed(&store).await.is_empty());
    }

    #[tokio::test]
    async fn unknown_event_type_touches_nothing() {
        let store = Arc::new(InMemoryEventStore::new());
        let (_queue, worker) = worker_with(Arc::clone(&store) as Arc<dyn EventStore>);

        let undo = r#"{"game_id":"g1","event_type":"undo","fen":"x","timestamp":3}"#;
        assert_eq!(worker.handle(&message(undo)).await, Handled::Ignored);
        assert!(listed(&store).await.is_empty());
    }

    #[tokio::test]
    async fn malformed_and_empty_payloads_are_dropped() {
        let store = Arc::new(InMemoryEventStore::new());
        let (_queue, worker) = worker_with(Arc::clone(&store) as Arc<dyn EventStore>);

        assert_eq!(worker.handle(&message("{oops")).await, Handled::Undecodable);
        let tombstone = QueueMessage {
            payload: None,
            ..message("")
        };
        assert_eq!(worker.handle(&tombstone).await, Handled::Undecodable);
    }

    #[tokio::test]
    async fn store_failures_are_reported_not_raised() {
        let (_queue, worker) = worker_with(Arc::new(BrokenStore));
        assert_eq!(worker.handle(&message(MOVE)).await, Handled::StoreFailed);
        assert_eq!(worker.handle(&message(DELETE)).await, Handled::StoreFailed);
    }

    #[tokio::test]
    async fn malformed_message_does_not_stop_the_loop() {
        let store = Arc::new(InMemoryEventStore::new());
        let (queue, worker) = worker_with(Arc::clone(&store) as Arc<dyn EventStore>);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(worker.run(cancel.clone()));

        queue.publish("garbage");
        queue.publish(MOVE);

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while listed(&store).await.is_empty() {
            assert!(tokio::time::Instant::now() < deadline, "move never stored");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        cancel.cancel();
        let Ok(joined) = task.await else {
            panic!("worker panicked");
        };
        assert!(joined.is_ok());
    }

    #[tokio::test]
    async fn store_failure_does_not_stop_the_loop() {
        let (queue, worker) = worker_with(Arc::new(BrokenStore));
        let cancel = CancellationToken::new();
        let task = tokio::spawn(worker.run(cancel.clone()));

        queue.publish(MOVE);
        queue.publish(DELETE);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!task.is_finished());

        cancel.cancel();
        let Ok(joined) = task.await else {
            panic!("worker panicked");
        };
        assert!(joined.is_ok());
    }

    #[tokio::test]
    async fn cancellation_while_idle_returns_cleanly() {
        let (_queue, worker) = worker_with(Arc::new(InMemoryEventStore::new()));
        let cancel = CancellationToken::new();
        let task = tokio::spawn(worker.run(cancel.clone()));

        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();

        let Ok(Ok(joined)) = tokio::time::timeout(Duration::from_secs(1), task).await else {
            panic!("worker did not stop in time");
        };
        assert!(joined.is_ok());
    }

    #[tokio::test]
    async fn transport_error_ends_the_worker() {
        let (queue, worker) = worker_with(Arc::new(InMemoryEventStore::new()));
        queue.fail_next("connection reset");

        let result = worker.run(CancellationToken::new()).await;
        assert!(matches!(result, Err(ConsumerError::Transport(_))));
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Step {
        Recv(i64),
        Stored(&'static str),
        Mark(i64),
    }

    type Journal = Arc<Mutex<Vec<Step>>>;

    fn record(journal: &Journal, step: Step) {
        let Ok(mut steps) = journal.lock() else {
            panic!("journal poisoned");
        };
        steps.push(step);
    }

    fn steps(journal: &Journal) -> Vec<Step> {
        let Ok(steps) = journal.lock() else {
            panic!("journal poisoned");
        };
        steps.clone()
    }

    /// Serves a fixed script, then waits forever. Records every delivery
    /// and every offset marked as processed.
    #[derive(Debug)]
    struct RecordingSource {
        script: VecDeque<Result<QueueMessage, ConsumerError>>,
        journal: Journal,
    }

    #[async_trait]
    impl MessageSource for RecordingSource {
        async fn recv(&mut self) -> Result<QueueMessage, ConsumerError> {
            match self.script.pop_front() {
                Some(Ok(message)) => {
                    record(&self.journal, Step::Recv(message.offset));
                    Ok(message)
                }
                Some(Err(e)) => Err(e),
                None => std::future::pending().await,
            }
        }

        fn mark_processed(&self, message: &QueueMessage) {
            record(&self.journal, Step::Mark(message.offset));
        }
    }

    /// Forwards to `inner` and records each write once it has returned.
    #[derive(Debug)]
    struct RecordingStore {
        inner: Arc<dyn EventStore>,
        journal: Journal,
    }

    #[async_trait]
    impl EventStore for RecordingStore {
        async fn append(&self, event: GameEvent) -> Result<(), StoreError> {
            let result = self.inner.append(event).await;
            record(&self.journal, Step::Stored("append"));
            result
        }

        async fn delete_by_game(&self, game_id: &str) -> Result<u64, StoreError> {
            let result = self.inner.delete_by_game(game_id).await;
            record(&self.journal, Step::Stored("delete"));
            result
        }

        async fn list_all(&self) -> Result<Vec<GameEvent>, StoreError> {
            self.inner.list_all().await
        }

        async fn shutdown(&self) {
            self.inner.shutdown().await;
        }
    }

    fn at(offset: i64, payload: Option<&str>) -> QueueMessage {
        QueueMessage {
            offset,
            payload: payload.map(|p| p.as_bytes().to_vec()),
            ..message("")
        }
    }

    fn recording_worker(
        inner: Arc<dyn EventStore>,
        script: Vec<Result<QueueMessage, ConsumerError>>,
    ) -> (Journal, ConsumerWorker<RecordingSource>) {
        let journal: Journal = Arc::new(Mutex::new(Vec::new()));
        let source = RecordingSource {
            script: script.into(),
            journal: Arc::clone(&journal),
        };
        let store = RecordingStore {
            inner,
            journal: Arc::clone(&journal),
        };
        (journal, ConsumerWorker::new(0, source, Arc::new(store)))
    }

    async fn marks_every_offset_once_after_handling(inner: Arc<dyn EventStore>) {
        let undo = r#"{"game_id":"g1","event_type":"undo","fen":"x","timestamp":3}"#;
        let script = vec![
            Ok(at(0, Some("garbage"))),
            Ok(at(1, None)),
            Ok(at(2, Some(MOVE))),
            Ok(at(3, Some(undo))),
            Ok(at(4, Some(DELETE))),
        ];
        let (journal, worker) = recording_worker(inner, script);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(worker.run(cancel.clone()));

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while !steps(&journal).contains(&Step::Mark(4)) {
            assert!(tokio::time::Instant::now() < deadline, "last offset never marked");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        cancel.cancel();
        let Ok(Ok(())) = task.await else {
            panic!("worker did not stop cleanly");
        };

        assert_eq!(
            steps(&journal),
            vec![
                Step::Recv(0),
                Step::Mark(0),
                Step::Recv(1),
                Step::Mark(1),
                Step::Recv(2),
                Step::Stored("append"),
                Step::Mark(2),
                Step::Recv(3),
                Step::Mark(3),
                Step::Recv(4),
                Step::Stored("delete"),
                Step::Mark(4),
            ]
        );
    }

    #[tokio::test]
    async fn offsets_are_marked_once_after_successful_writes() {
        marks_every_offset_once_after_handling(Arc::new(InMemoryEventStore::new())).await;
    }

    #[tokio::test]
    async fn offsets_are_marked_once_after_failed_writes() {
        marks_every_offset_once_after_handling(Arc::new(BrokenStore)).await;
    }

    #[tokio::test]
    async fn cancelled_worker_marks_nothing() {
        let script = vec![Ok(at(0, Some(MOVE))), Ok(at(1, Some(DELETE)))];
        let (journal, worker) = recording_worker(Arc::new(InMemoryEventStore::new()), script);
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert!(worker.run(cancel).await.is_ok());
        assert!(steps(&journal).is_empty());
    }

    #[tokio::test]
    async fn transport_error_marks_nothing_further() {
        let script = vec![
            Ok(at(0, Some(MOVE))),
            Err(ConsumerError::Transport("connection reset".to_string())),
            Ok(at(1, Some(MOVE))),
        ];
        let (journal, worker) = recording_worker(Arc::new(InMemoryEventStore::new()), script);

        let result = worker.run(CancellationToken::new()).await;
        assert!(matches!(result, Err(ConsumerError::Transport(_))));
        assert_eq!(
            steps(&journal),
            vec![Step::Recv(0), Step::Stored("append"), Step::Mark(0)]
        );
    }
}

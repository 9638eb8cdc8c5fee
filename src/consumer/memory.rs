//! In-process stand-in for a consumer-group subscription.
//!
//! [`MemoryQueue`] owns one unbounded channel; every
//! [`MemorySubscription`] shares its receiver, so each published message
//! reaches exactly one subscriber, like partitions spread across a group.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};

use super::source::{MessageSource, QueueMessage};
use crate::error::ConsumerError;

type Delivery = Result<QueueMessage, String>;

/// Producer side of an in-memory topic.
#[derive(Debug)]
pub struct MemoryQueue {
    topic: String,
    sender: mpsc::UnboundedSender<Delivery>,
    receiver: Arc<Mutex<mpsc::UnboundedReceiver<Delivery>>>,
    next_offset: AtomicI64,
}

impl MemoryQueue {
    /// Creates an empty queue for `topic`.
    #[must_use]
    pub fn new(topic: impl Into<String>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            topic: topic.into(),
            sender,
            receiver: Arc::new(Mutex::new(receiver)),
            next_offset: AtomicI64::new(0),
        }
    }

    /// Enqueues a raw payload and returns its offset.
    pub fn publish(&self, payload: impl Into<Vec<u8>>) -> i64 {
        self.deliver(Some(payload.into()))
    }

    /// Enqueues a message without payload.
    pub fn publish_tombstone(&self) -> i64 {
        self.deliver(None)
    }

    /// Makes the subscriber that reads this slot fail with a transport
    /// error.
    pub fn fail_next(&self, reason: impl Into<String>) {
        let _ = self.sender.send(Err(reason.into()));
    }

    /// Opens a subscription sharing this queue's message stream.
    #[must_use]
    pub fn subscribe(&self) -> MemorySubscription {
        MemorySubscription {
            receiver: Arc::clone(&self.receiver),
        }
    }

    /// Number of messages published so far.
    #[must_use]
    pub fn published(&self) -> i64 {
        self.next_offset.load(Ordering::SeqCst)
    }

    fn deliver(&self, payload: Option<Vec<u8>>) -> i64 {
        let offset = self.next_offset.fetch_add(1, Ordering::SeqCst);
        let message = QueueMessage {
            topic: self.topic.clone(),
            partition: 0,
            offset,
            key: None,
            payload,
        };
        let _ = self.sender.send(Ok(message));
        offset
    }
}

/// Consumer side of a [`MemoryQueue`]. Once the queue is dropped and
/// drained, [`MessageSource::recv`] reports a transport error.
#[derive(Debug, Clone)]
pub struct MemorySubscription {
    receiver: Arc<Mutex<mpsc::UnboundedReceiver<Delivery>>>,
}

#[async_trait]
impl MessageSource for MemorySubscription {
    async fn recv(&mut self) -> Result<QueueMessage, ConsumerError> {
        let mut receiver = self.receiver.lock().await;
        match receiver.recv().await {
            Some(Ok(message)) => Ok(message),
            Some(Err(reason)) => Err(ConsumerError::Transport(reason)),
            None => Err(ConsumerError::Transport("queue closed".to_string())),
        }
    }
}

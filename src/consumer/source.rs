//! The "read next message" seam between workers and the broker.

use async_trait::async_trait;

use crate::error::ConsumerError;

/// One message pulled from the queue, detached from the client's buffers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    /// Topic the message was read from.
    pub topic: String,
    /// Partition within the topic.
    pub partition: i32,
    /// Offset within the partition.
    pub offset: i64,
    /// Message key, if the producer set one.
    pub key: Option<Vec<u8>>,
    /// Raw payload; `None` for tombstones.
    pub payload: Option<Vec<u8>>,
}

/// A single subscription handle owned by one worker.
#[async_trait]
pub trait MessageSource: Send {
    /// Waits for the next message.
    ///
    /// Must be cancellation-safe: dropping the future before it completes
    /// loses no message.
    ///
    /// # Errors
    ///
    /// Returns [`ConsumerError::Transport`] when the subscription can no
    /// longer deliver messages.
    async fn recv(&mut self) -> Result<QueueMessage, ConsumerError>;

    /// Records that `message` has been fully handled, so its offset may be
    /// committed.
    fn mark_processed(&self, _message: &QueueMessage) {}
}

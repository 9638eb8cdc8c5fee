//! Kafka subscription backed by `rdkafka`.

use std::fmt;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::Message;
use rdkafka::{Offset, TopicPartitionList};

use super::source::{MessageSource, QueueMessage};
use crate::config::KafkaConfig;
use crate::error::ConsumerError;

/// One consumer-group member subscribed to the events topic.
///
/// Offsets are auto-committed, but only offsets stored through
/// [`MessageSource::mark_processed`] are eligible, so a crash between
/// receiving and handling a message causes redelivery.
pub struct KafkaSource {
    consumer: StreamConsumer,
    worker_id: usize,
}

impl KafkaSource {
    /// Creates a consumer for `worker_id` and subscribes it to the topic.
    ///
    /// # Errors
    ///
    /// Returns [`ConsumerError::Connect`] if the client cannot be created
    /// or the subscription is refused.
    pub fn subscribe(config: &KafkaConfig, worker_id: usize) -> Result<Self, ConsumerError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", config.brokers.join(","))
            .set("group.id", &config.group_id)
            .set("client.id", format!("{}-{worker_id}", config.client_id))
            .set("enable.auto.commit", "true")
            .set("enable.auto.offset.store", "false")
            .set("auto.offset.reset", &config.auto_offset_reset)
            .set("session.timeout.ms", config.session_timeout_ms.to_string())
            .create()
            .map_err(|e| ConsumerError::Connect(e.to_string()))?;

        consumer
            .subscribe(&[config.topic.as_str()])
            .map_err(|e| ConsumerError::Connect(e.to_string()))?;

        tracing::debug!(
            worker = worker_id,
            topic = %config.topic,
            group = %config.group_id,
            "kafka subscription created"
        );
        Ok(Self {
            consumer,
            worker_id,
        })
    }
}

impl fmt::Debug for KafkaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KafkaSource")
            .field("worker_id", &self.worker_id)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl MessageSource for KafkaSource {
    async fn recv(&mut self) -> Result<QueueMessage, ConsumerError> {
        let message = self
            .consumer
            .recv()
            .await
            .map_err(|e| ConsumerError::Transport(e.to_string()))?;

        Ok(QueueMessage {
            topic: message.topic().to_string(),
            partition: message.partition(),
            offset: message.offset(),
            key: message.key().map(<[u8]>::to_vec),
            payload: message.payload().map(<[u8]>::to_vec),
        })
    }

    fn mark_processed(&self, message: &QueueMessage) {
        let mut tpl = TopicPartitionList::new();
        let stored = tpl
            .add_partition_offset(
                &message.topic,
                message.partition,
                Offset::Offset(message.offset + 1),
            )
            .and_then(|()| self.consumer.store_offsets(&tpl));

        if let Err(e) = stored {
            tracing::warn!(
                worker = self.worker_id,
                partition = message.partition,
                offset = message.offset,
                error = %e,
                "failed to store consumed offset"
            );
        }
    }
}

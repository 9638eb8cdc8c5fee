//! Queue consumption: sources, workers and the worker pool.
//!
//! ```text
//! Kafka topic (consumer group)
//!     │
//!     ├── KafkaSource ── ConsumerWorker ─┐
//!     ├── KafkaSource ── ConsumerWorker ─┼── EventStore
//!     └── KafkaSource ── ConsumerWorker ─┘
//!              ▲
//!        ConsumerPool (one CancellationToken)
//! ```
//!
//! Each worker owns its own subscription; the broker spreads partitions
//! across group members, so no partitioning happens here.

pub mod kafka;
pub mod memory;
pub mod pool;
pub mod source;
pub mod worker;

pub use kafka::KafkaSource;
pub use memory::{MemoryQueue, MemorySubscription};
pub use pool::{ConsumerPool, PoolReport};
pub use source::{MessageSource, QueueMessage};
pub use worker::{ConsumerWorker, Handled};

//! # chess-event-sink
//!
//! Durable tail of the chess application's event stream: consumes move and
//! delete events from Kafka, persists them in PostgreSQL and serves them
//! back over a minimal HTTP read endpoint.
//!
//! ## Architecture
//!
//! ```text
//! Kafka topic (consumer group)
//!     │
//!     ├── ConsumerPool (consumer/)
//!     │     └── ConsumerWorker × N ── decode ── route
//!     │
//!     ├── EventStore (persistence/) ── PostgreSQL
//!     │
//!     ├── QueryService (server/, api/) ── GET /moves, GET /health
//!     │
//!     └── Supervisor (supervisor/) ── signals, ordered shutdown
//! ```
//!
//! Delivery is at-least-once: a redelivered move becomes a duplicate row,
//! and a move arriving after its game's delete is stored again.

pub mod api;
pub mod app_state;
pub mod config;
pub mod consumer;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod server;
pub mod supervisor;

//! chess-event-sink entry point.
//!
//! Loads configuration, then hands control to the supervisor until a
//! termination signal arrives.

use tracing_subscriber::EnvFilter;

use chess_event_sink::config::ServiceConfig;
use chess_event_sink::supervisor;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    // Load configuration
    let config = ServiceConfig::from_env()?;
    tracing::info!(
        addr = %config.listen_addr(),
        topic = %config.kafka.topic,
        group = %config.kafka.group_id,
        workers = config.consumer_workers,
        "starting chess-event-sink"
    );

    let summary = supervisor::run(config, supervisor::shutdown_signal()).await?;
    tracing::info!(
        stopped = summary.workers.stopped,
        failed = summary.workers.failed,
        "chess-event-sink exited"
    );

    Ok(())
}

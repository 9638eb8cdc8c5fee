//! Process lifecycle: start everything, wait for a stop trigger, shut
//! down in order.
//!
//! Shutdown order is fixed: cancel the consumers, wait for all of them,
//! stop the HTTP server within its grace period, then close the store.
//! The single [`CancellationToken`] is created here and handed to every
//! worker explicitly.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::app_state::AppState;
use crate::config::ServiceConfig;
use crate::consumer::{ConsumerPool, KafkaSource, MessageSource, PoolReport};
use crate::error::{ConsumerError, ServiceError};
use crate::persistence::{EventStore, PostgresEventStore};
use crate::server::QueryService;

/// Why the pipeline began shutting down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A termination request arrived.
    Requested,
    /// The HTTP server ended on its own.
    ServerFailed,
}

/// Summary of a completed pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// What triggered shutdown.
    pub reason: StopReason,
    /// How the consumer workers ended.
    pub workers: PoolReport,
}

/// Pipeline wiring shared by production and tests.
#[derive(Debug)]
pub struct Pipeline {
    /// Store shared by workers and the HTTP server.
    pub store: Arc<dyn EventStore>,
    /// Bound HTTP listener.
    pub listener: TcpListener,
    /// Number of consumer workers to start.
    pub worker_count: usize,
    /// HTTP drain period on shutdown.
    pub shutdown_grace: Duration,
}

/// Runs the whole service with real collaborators until `shutdown`
/// resolves.
///
/// # Errors
///
/// Returns [`ServiceError::Store`] if the store cannot be initialized,
/// [`ServiceError::Bind`] if the HTTP port cannot be bound (both before
/// any consumer starts), [`ServiceError::Consumer`] if no worker can
/// subscribe to the broker, and [`ServiceError::Server`] if the HTTP server
/// failed while running (after orderly shutdown).
pub async fn run<F>(config: ServiceConfig, shutdown: F) -> Result<RunSummary, ServiceError>
where
    F: Future<Output = ()> + Send,
{
    let store: Arc<dyn EventStore> = Arc::new(PostgresEventStore::connect(&config.database).await?);

    let addr = config.listen_addr();
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(source) => {
            store.shutdown().await;
            return Err(ServiceError::Bind { addr, source });
        }
    };

    let kafka = config.kafka;
    let pipeline = Pipeline {
        store,
        listener,
        worker_count: config.consumer_workers,
        shutdown_grace: config.shutdown_grace,
    };
    run_pipeline(pipeline, |id| KafkaSource::subscribe(&kafka, id), shutdown).await
}

/// Starts the consumer pool and HTTP server over `pipeline`, waits for
/// `shutdown` or a server failure, then shuts everything down in order,
/// ending with [`EventStore::shutdown`].
///
/// # Errors
///
/// Returns [`ServiceError::Consumer`] if not a single worker could
/// subscribe; the store is closed and the HTTP server never starts.
/// Returns [`ServiceError::Server`] if the listener is unusable or the
/// HTTP server ended without being asked to. In the latter case the
/// full shutdown sequence has already run.
pub async fn run_pipeline<S, M, F>(
    pipeline: Pipeline,
    subscribe: M,
    shutdown: F,
) -> Result<RunSummary, ServiceError>
where
    S: MessageSource + 'static,
    M: FnMut(usize) -> Result<S, ConsumerError>,
    F: Future<Output = ()> + Send,
{
    let Pipeline {
        store,
        listener,
        worker_count,
        shutdown_grace,
    } = pipeline;

    let cancel = CancellationToken::new();
    let pool = ConsumerPool::start(worker_count, &store, &cancel, subscribe);
    if pool.active() == 0 {
        let cause = pool.start_error().cloned().unwrap_or_else(|| {
            ConsumerError::Connect(format!("{worker_count} workers requested"))
        });
        tracing::error!(error = %cause, "no consumer worker could subscribe, aborting");
        cancel.cancel();
        pool.join().await;
        store.shutdown().await;
        return Err(ServiceError::Consumer(cause));
    }

    let mut query = match QueryService::serve(listener, AppState::new(Arc::clone(&store))) {
        Ok(query) => query,
        Err(e) => {
            cancel.cancel();
            pool.join().await;
            store.shutdown().await;
            return Err(e);
        }
    };

    let (reason, server_error) = tokio::select! {
        () = shutdown => {
            tracing::info!("termination requested, shutting down");
            (StopReason::Requested, None)
        }
        exited = query.exited() => {
            let error = exited.err();
            tracing::error!(error = ?error, "http server failed, shutting down");
            (StopReason::ServerFailed, error)
        }
    };

    cancel.cancel();
    let workers = pool.join().await;
    query.stop(shutdown_grace).await;
    store.shutdown().await;
    tracing::info!("shutdown completed");

    match server_error {
        Some(e) => Err(e),
        None => Ok(RunSummary { reason, workers }),
    }
}

/// Resolves on SIGINT (ctrl-c) or, on unix, SIGTERM.
///
/// If a handler cannot be installed the corresponding signal is never
/// observed; the other one still works.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

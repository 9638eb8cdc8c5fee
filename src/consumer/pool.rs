//! Fixed-size pool of consumer workers sharing one cancellation token.

use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::source::MessageSource;
use super::worker::ConsumerWorker;
use crate::error::ConsumerError;
use crate::persistence::EventStore;

/// How the workers of a pool ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolReport {
    /// Workers that returned because they were cancelled.
    pub stopped: usize,
    /// Workers that never subscribed, hit a transport error, or panicked.
    pub failed: usize,
}

/// Supervises `N` independent [`ConsumerWorker`]s.
///
/// Failed workers are not restarted; a dead worker only lowers the pool's
/// concurrency until shutdown.
#[derive(Debug)]
pub struct ConsumerPool {
    workers: JoinSet<(usize, Result<(), ConsumerError>)>,
    failed_to_start: usize,
    start_error: Option<ConsumerError>,
}

impl ConsumerPool {
    /// Spawns `worker_count` workers, each over the subscription returned
    /// by `subscribe(worker_id)`.
    ///
    /// A worker whose subscription cannot be created is logged and counted
    /// as failed; the others still start.
    pub fn start<S, F>(
        worker_count: usize,
        store: &Arc<dyn EventStore>,
        cancel: &CancellationToken,
        mut subscribe: F,
    ) -> Self
    where
        S: MessageSource + 'static,
        F: FnMut(usize) -> Result<S, ConsumerError>,
    {
        let mut workers = JoinSet::new();
        let mut failed_to_start = 0;
        let mut start_error = None;

        for id in 0..worker_count {
            match subscribe(id) {
                Ok(source) => {
                    let worker = ConsumerWorker::new(id, source, Arc::clone(store));
                    let token = cancel.clone();
                    workers.spawn(async move { (id, worker.run(token).await) });
                }
                Err(e) => {
                    tracing::error!(worker = id, error = %e, "consumer worker failed to start");
                    failed_to_start += 1;
                    start_error.get_or_insert(e);
                }
            }
        }

        tracing::info!(
            started = workers.len(),
            failed = failed_to_start,
            "consumer pool started"
        );
        Self {
            workers,
            failed_to_start,
            start_error,
        }
    }

    /// Number of workers still running.
    #[must_use]
    pub fn active(&self) -> usize {
        self.workers.len()
    }

    /// First subscription error seen by [`ConsumerPool::start`], if any.
    #[must_use]
    pub fn start_error(&self) -> Option<&ConsumerError> {
        self.start_error.as_ref()
    }

    /// Waits until every worker has returned, whatever the reason.
    pub async fn join(mut self) -> PoolReport {
        let mut report = PoolReport {
            stopped: 0,
            failed: self.failed_to_start,
        };

        while let Some(joined) = self.workers.join_next().await {
            match joined {
                Ok((_, Ok(()))) => report.stopped += 1,
                Ok((id, Err(e))) => {
                    tracing::warn!(worker = id, error = %e, "consumer worker exited with error");
                    report.failed += 1;
                }
                Err(e) => {
                    tracing::error!(error = %e, "consumer worker task aborted");
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            stopped = report.stopped,
            failed = report.failed,
            "consumer pool drained"
        );
        report
    }
}

//! The HTTP query service: a thin, stoppable wrapper around `axum::serve`.

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::app_state::AppState;
use crate::error::ServiceError;

/// Upper bound on serving a single request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Requests running longer than `limit` are answered with `408`.
fn request_timeout(limit: Duration) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, limit)
}

/// Builds the application router with its middleware stack.
pub fn build_app(state: AppState) -> Router {
    api::build_router()
        .layer(request_timeout(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// A running HTTP server.
///
/// Stopping is cooperative: [`QueryService::stop`] asks axum to stop
/// accepting connections and drain in-flight requests, then aborts the
/// task if the grace period runs out.
#[derive(Debug)]
pub struct QueryService {
    local_addr: SocketAddr,
    stop: CancellationToken,
    task: Option<JoinHandle<std::io::Result<()>>>,
}

impl QueryService {
    /// Binds `addr` and starts serving.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Bind`] if the address cannot be bound.
    pub async fn bind(addr: SocketAddr, state: AppState) -> Result<Self, ServiceError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServiceError::Bind { addr, source })?;
        Self::serve(listener, state)
    }

    /// Starts serving on an already bound listener.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Server`] if the listener's local address
    /// cannot be read.
    pub fn serve(listener: TcpListener, state: AppState) -> Result<Self, ServiceError> {
        let local_addr = listener
            .local_addr()
            .map_err(|e| ServiceError::Server(e.to_string()))?;
        let stop = CancellationToken::new();
        let app = build_app(state);

        let shutdown = stop.clone().cancelled_owned();
        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
        });

        tracing::info!(addr = %local_addr, "http server listening");
        Ok(Self {
            local_addr,
            stop,
            task: Some(task),
        })
    }

    /// Address the server is bound to.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Resolves when the server task ends on its own, which only happens
    /// on failure. Pending forever once the task has been observed.
    ///
    /// Cancel-safe, for use inside `tokio::select!`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Server`] describing why the server ended.
    pub async fn exited(&mut self) -> Result<(), ServiceError> {
        let Some(task) = self.task.as_mut() else {
            return std::future::pending().await;
        };
        let outcome = task.await;
        self.task = None;
        match outcome {
            Ok(Ok(())) => Err(ServiceError::Server("server stopped unexpectedly".to_string())),
            Ok(Err(e)) => Err(ServiceError::Server(e.to_string())),
            Err(e) => Err(ServiceError::Server(format!("server task failed: {e}"))),
        }
    }

    /// Stops accepting connections and waits up to `grace` for in-flight
    /// requests; the server task is aborted after that.
    pub async fn stop(mut self, grace: Duration) {
        self.stop.cancel();
        let Some(mut task) = self.task.take() else {
            return;
        };

        match tokio::time::timeout(grace, &mut task).await {
            Ok(Ok(Ok(()))) => tracing::info!("http server stopped"),
            Ok(Ok(Err(e))) => tracing::warn!(error = %e, "http server stopped with error"),
            Ok(Err(e)) => tracing::warn!(error = %e, "http server task failed"),
            Err(_) => {
                tracing::warn!(grace = ?grace, "http server did not drain in time; aborting");
                task.abort();
            }
        }
    }
}

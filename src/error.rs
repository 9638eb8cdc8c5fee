//! Error types for every layer of the sink.
//!
//! Storage, decoding, queue transport and configuration each get their own
//! enum so callers can decide what is fatal. [`ApiError`] is the only one
//! that crosses the HTTP boundary and maps to a structured JSON body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 3001,
///     "message": "internal server error"
///   }
/// }
/// ```
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
}

/// Failures of the relational event store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The database was unreachable or rejected the credentials.
    #[error("database connection failed: {0}")]
    ConnectionFailed(String),

    /// The `moves` table could not be created.
    #[error("schema initialization failed: {0}")]
    SchemaInitFailed(String),

    /// An insert or delete failed and its transaction was rolled back.
    #[error("event write failed: {0}")]
    WriteFailed(String),

    /// Listing stored events failed.
    #[error("event read failed: {0}")]
    ReadFailed(String),
}

/// A queue message whose payload is not a usable [`crate::domain::GameEvent`].
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The message carried no payload at all (tombstone).
    #[error("message has no payload")]
    MissingPayload,

    /// The payload is not a JSON game event.
    #[error("malformed event payload: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The payload decoded but names no game.
    #[error("event has an empty game_id")]
    EmptyGameId,
}

/// Failures of the message-queue side of a consumer worker.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConsumerError {
    /// The subscription could not be created (bad config, unreachable broker).
    #[error("queue subscription failed: {0}")]
    Connect(String),

    /// Reading the next message failed. Ends the worker that hit it.
    #[error("queue transport error: {0}")]
    Transport(String),
}

/// Invalid service configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A setting is present but unusable.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Errors returned from HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The store could not serve the request.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

impl ApiError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::Store(StoreError::ReadFailed(_)) => 3001,
            Self::Store(StoreError::WriteFailed(_)) => 3002,
            Self::Store(StoreError::ConnectionFailed(_) | StoreError::SchemaInitFailed(_)) => 3000,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "request failed");

        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: "internal server error".to_string(),
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

/// Process-level failures surfaced by the supervisor.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The event store failed to initialize.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The HTTP listener could not be bound.
    #[error("failed to bind http listener on {addr}: {source}")]
    Bind {
        /// Address that was requested.
        addr: std::net::SocketAddr,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// No consumer worker could subscribe to the queue at startup.
    #[error("no consumer worker started: {0}")]
    Consumer(ConsumerError),

    /// The HTTP server stopped without being asked to.
    #[error("http server failed: {0}")]
    Server(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_failure_maps_to_500() {
        let err = ApiError::from(StoreError::ReadFailed("boom".to_string()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error_code(), 3001);
    }

    #[test]
    fn connection_loss_maps_to_generic_code() {
        let err = ApiError::from(StoreError::ConnectionFailed("reset".to_string()));
        assert_eq!(err.error_code(), 3000);
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn consumer_startup_failure_names_the_cause() {
        let err = ServiceError::Consumer(ConsumerError::Connect("no brokers".to_string()));
        assert_eq!(
            err.to_string(),
            "no consumer worker started: queue subscription failed: no brokers"
        );
    }

    #[test]
    fn decode_error_wraps_serde() {
        let Err(source) = serde_json::from_str::<serde_json::Value>("{") else {
            return;
        };
        let err = DecodeError::from(source);
        assert!(err.to_string().starts_with("malformed event payload"));
    }
}

//! System endpoints: liveness.

use axum::Router;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;

use crate::app_state::AppState;

/// Fixed liveness body.
pub const HEALTH_BODY: &str = "OK, we fine";

/// `GET /health`: liveness check.
///
/// Checks no dependencies; answering at all means the process is up.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    responses(
        (status = 200, description = "Service is alive", body = String, content_type = "text/plain"),
    )
)]
pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, HEALTH_BODY)
}

/// System routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_handler))
}

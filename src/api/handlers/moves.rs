//! Persisted move listing.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::app_state::AppState;
use crate::domain::GameEvent;
use crate::error::{ApiError, ErrorResponse};

/// `GET /moves` — List every persisted event.
///
/// Returns an empty array, not `null`, when nothing is stored. A move
/// that arrived without `fen`, `move_from` or `move_to` lists those fields
/// as `null` rather than `""`.
///
/// # Errors
///
/// Returns [`ApiError::Store`] (HTTP 500) if the store cannot be read.
#[utoipa::path(
    get,
    path = "/moves",
    tag = "Moves",
    summary = "List persisted events",
    description = "Returns every stored game event in insertion order.",
    responses(
        (status = 200, description = "All persisted events", body = Vec<GameEvent>),
        (status = 405, description = "Method other than GET"),
        (status = 500, description = "Storage read failure", body = ErrorResponse),
    )
)]
pub async fn list_moves(State(state): State<AppState>) -> Result<Json<Vec<GameEvent>>, ApiError> {
    let events = state.store.list_all().await?;
    Ok(Json(events))
}

/// Move routes. Non-GET methods get axum's `405 Method Not Allowed`.
pub fn routes() -> Router<AppState> {
    Router::new().route("/moves", get(list_moves))
}

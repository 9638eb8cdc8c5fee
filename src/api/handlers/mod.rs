//! HTTP endpoint handlers organized by resource.

pub mod moves;
pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes at the root level.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(system::routes())
        .merge(moves::routes())
}

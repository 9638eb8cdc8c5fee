//! HTTP read surface: route handlers, OpenAPI document and router
//! composition.

pub mod handlers;

use axum::Router;
#[cfg(not(feature = "swagger-ui"))]
use axum::routing::get;
use utoipa::OpenApi;

use crate::app_state::AppState;
use crate::domain::GameEvent;
use crate::error::{ErrorBody, ErrorResponse};

/// OpenAPI description of the read endpoints.
#[derive(Debug, OpenApi)]
#[openapi(
    info(title = "chess-event-sink", description = "Read access to persisted chess game events"),
    paths(handlers::system::health_handler, handlers::moves::list_moves),
    components(schemas(GameEvent, ErrorResponse, ErrorBody)),
    tags(
        (name = "System", description = "Liveness"),
        (name = "Moves", description = "Persisted game events"),
    )
)]
pub struct ApiDoc;

/// Builds the complete router with all HTTP endpoints.
///
/// The OpenAPI document is served at `/api-docs/openapi.json`; with the
/// `swagger-ui` feature, Swagger UI serves it and is mounted at
/// `/swagger-ui`.
pub fn build_router() -> Router<AppState> {
    let router = Router::new().merge(handlers::routes());

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    #[cfg(not(feature = "swagger-ui"))]
    let router = router.route("/api-docs/openapi.json", get(openapi_json));

    router
}

#[cfg(not(feature = "swagger-ui"))]
async fn openapi_json() -> axum::Json<utoipa::openapi::OpenApi> {
    axum::Json(ApiDoc::openapi())
}

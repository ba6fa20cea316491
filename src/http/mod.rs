//! The external HTTP surface (§6, C8): feed serving plus a key-gated admin
//! API. Listed in spec.md as "out of scope... specified only at its
//! interface"; implemented here as a thin `axum` layer over [`AppState`],
//! grounded on the teacher's `api/mod.rs` router/OpenAPI wiring.

mod handlers;
mod state;

pub use state::AppState;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(),
    components(schemas(
        handlers::HealthResponse,
        handlers::ServiceDescriptor,
        handlers::FeedSummary,
        handlers::FeedDetails,
        crate::error::ApiError
    )),
    tags((name = "rss-comb", description = "RSS/Atom feed proxy"))
)]
struct ApiDoc;

/// Builds the full router: public feed/health/root routes, the key-gated
/// `/api` admin surface, and the Swagger UI.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::service_descriptor))
        .route("/health", get(handlers::health))
        .route("/feeds/:id", get(handlers::get_feed))
        .route("/api/feeds", get(handlers::list_feeds))
        .route("/api/feeds/:id/details", get(handlers::feed_details))
        .route("/api/feeds/:id/reload", post(handlers::reload_feed))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

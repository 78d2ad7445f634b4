pub mod api;
mod health;
mod middleware;

pub use api::rate_limit::ApiRateLimiter;
pub use api::{ApiState, build_api_router};
pub use middleware::REQUEST_ID_HEADER;

use axum::{Router, middleware as axum_middleware, routing::get};
use tower_http::{compression::CompressionLayer, cors::CorsLayer};

pub const API_PREFIX: &str = "/api/v1";

/// The full application router: `/health`, the versioned API, and shared layers.
pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .with_state(state.clone())
        .nest(API_PREFIX, build_api_router(state))
        .layer(axum_middleware::from_fn(middleware::log_responses))
        .layer(axum_middleware::from_fn(middleware::set_request_context))
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
}

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod rate_limit;
pub mod state;

pub use state::{ApiState, CurrentUser};

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, patch, post},
};

/// Routes under `/api/v1`. Reads and account routes are public; writes need a bearer token.
pub fn build_api_router(state: ApiState) -> Router {
    let auth = axum_middleware::from_fn_with_state(state.clone(), middleware::require_auth);

    Router::new()
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login))
        .route(
            "/articles",
            get(handlers::list_articles)
                .merge(post(handlers::create_article).route_layer(auth.clone())),
        )
        .route(
            "/articles/{id}",
            get(handlers::get_article).merge(
                patch(handlers::update_article)
                    .delete(handlers::delete_article)
                    .route_layer(auth),
            ),
        )
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::api_rate_limit,
        ))
        .with_state(state)
}

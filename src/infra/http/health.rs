use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::application::error::ErrorReport;

use super::api::ApiState;

/// 204 when the database answers. Without a database there is nothing to probe.
pub async fn health(State(state): State<ApiState>) -> Response {
    let Some(db) = state.db.as_ref() else {
        return StatusCode::NO_CONTENT.into_response();
    };

    match db.health_check().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

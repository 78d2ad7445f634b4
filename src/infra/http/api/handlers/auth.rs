//! Account handlers

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use super::{auth_to_api, json_to_api};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::{AuthResponse, LoginRequest, RegisterRequest};
use crate::infra::http::api::state::ApiState;

pub async fn register(
    State(state): State<ApiState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload.map_err(json_to_api)?;

    let session = state
        .auth
        .register(payload.into())
        .await
        .map_err(auth_to_api)?;

    Ok((StatusCode::CREATED, Json(AuthResponse::from(session))))
}

pub async fn login(
    State(state): State<ApiState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload.map_err(json_to_api)?;

    let session = state
        .auth
        .login(payload.into())
        .await
        .map_err(auth_to_api)?;

    Ok(Json(AuthResponse::from(session)))
}

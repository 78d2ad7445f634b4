//! Article handlers

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use super::{article_to_api, json_to_api, parse_article_id};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::{
    ArticleCreateRequest, ArticleListParams, ArticlePageResponse, ArticleResponse,
    ArticleUpdateRequest,
};
use crate::infra::http::api::state::{ApiState, CurrentUser};

pub async fn list_articles(
    State(state): State<ApiState>,
    Query(params): Query<ArticleListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let query = params.into_query()?;

    let page = state
        .articles
        .find_all(&query)
        .await
        .map_err(article_to_api)?;

    Ok(Json(ArticlePageResponse::from(page)))
}

pub async fn get_article(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_article_id(&id)?;

    let article = state.articles.find_one(id).await.map_err(article_to_api)?;

    Ok(Json(ArticleResponse::from(article)))
}

pub async fn create_article(
    State(state): State<ApiState>,
    Extension(user): Extension<CurrentUser>,
    payload: Result<Json<ArticleCreateRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload.map_err(json_to_api)?;
    let command = payload.into_command()?;

    let article = state
        .articles
        .create(user.id, command)
        .await
        .map_err(article_to_api)?;

    Ok((StatusCode::CREATED, Json(ArticleResponse::from(article))))
}

pub async fn update_article(
    State(state): State<ApiState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    payload: Result<Json<ArticleUpdateRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_article_id(&id)?;
    let Json(payload) = payload.map_err(json_to_api)?;
    let command = payload.into_command()?;

    let article = state
        .articles
        .update(id, user.id, command)
        .await
        .map_err(article_to_api)?;

    Ok(Json(ArticleResponse::from(article)))
}

pub async fn delete_article(
    State(state): State<ApiState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_article_id(&id)?;

    state
        .articles
        .remove(id, user.id)
        .await
        .map_err(article_to_api)?;

    Ok(StatusCode::NO_CONTENT)
}

//! API handlers organized by resource.
//!
//! Error conversions shared by the resource modules live here.

mod articles;
mod auth;

pub use articles::*;
pub use auth::*;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;

use crate::application::articles::ArticleServiceError;
use crate::application::auth::AuthError;
use crate::application::repos::RepoError;

use super::error::{ApiError, codes};
use super::models::invalid;

pub(crate) fn repo_to_api(err: RepoError) -> ApiError {
    match err {
        RepoError::Duplicate { constraint } => ApiError::new(
            StatusCode::CONFLICT,
            codes::DUPLICATE,
            "Duplicate record",
            Some(constraint),
        ),
        RepoError::NotFound => ApiError::not_found("Resource not found"),
        RepoError::InvalidInput { message } => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_INPUT,
            "Invalid input",
            Some(message),
        ),
        RepoError::Integrity { message } => ApiError::new(
            StatusCode::CONFLICT,
            codes::INTEGRITY,
            "Integrity constraint violated",
            Some(message),
        ),
        RepoError::Timeout => ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::DB_TIMEOUT,
            "Database timeout",
            None,
        ),
        RepoError::Persistence(msg) => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::REPO,
            "Persistence error",
            Some(msg),
        ),
    }
}

pub(crate) fn article_to_api(err: ArticleServiceError) -> ApiError {
    match err {
        ArticleServiceError::NotFound(_) => ApiError::not_found("Article not found"),
        ArticleServiceError::Forbidden { action: "update" } => {
            ApiError::forbidden("You can only update your own articles")
        }
        ArticleServiceError::Forbidden { .. } => {
            ApiError::forbidden("You can only delete your own articles")
        }
        ArticleServiceError::Validation(domain) => invalid(domain),
        ArticleServiceError::Repo(repo) => repo_to_api(repo),
    }
}

pub(crate) fn auth_to_api(err: AuthError) -> ApiError {
    match err {
        AuthError::EmailTaken => ApiError::new(
            StatusCode::CONFLICT,
            codes::EMAIL_TAKEN,
            "Email already exists",
            None,
        ),
        AuthError::InvalidCredentials => ApiError::new(
            StatusCode::UNAUTHORIZED,
            codes::INVALID_CREDENTIALS,
            "Invalid credentials",
            None,
        ),
        AuthError::UnknownSubject | AuthError::Token(_) => ApiError::unauthorized(),
        AuthError::Validation(domain) => invalid(domain),
        AuthError::Hashing(message) => ApiError::internal(message),
        AuthError::Repo(repo) => repo_to_api(repo),
    }
}

pub(crate) fn json_to_api(rejection: JsonRejection) -> ApiError {
    ApiError::bad_request("Malformed JSON body", Some(rejection.body_text()))
}

pub(crate) fn parse_article_id(raw: &str) -> Result<uuid::Uuid, ApiError> {
    uuid::Uuid::parse_str(raw).map_err(|_| {
        ApiError::bad_request("Invalid article id", Some(format!("`{raw}` is not a UUID")))
    })
}

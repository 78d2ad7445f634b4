use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::articles::{
    ArticlePage, ArticleQuery, CreateArticleCommand, UpdateArticleCommand,
};
use crate::application::auth::{AuthSession, LoginCommand, RegisterCommand};
use crate::application::pagination::{MAX_LIMIT, MIN_LIMIT};
use crate::domain::articles::parse_timestamp;
use crate::domain::entities::{ArticleRecord, AuthorSummary};
use crate::domain::error::DomainError;

use super::error::ApiError;

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<RegisterRequest> for RegisterCommand {
    fn from(request: RegisterRequest) -> Self {
        Self {
            email: request.email,
            password: request.password,
            first_name: request.first_name,
            last_name: request.last_name,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl From<LoginRequest> for LoginCommand {
    fn from(request: LoginRequest) -> Self {
        Self {
            email: request.email,
            password: request.password,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<AuthorSummary> for UserResponse {
    fn from(author: AuthorSummary) -> Self {
        Self {
            id: author.id,
            email: author.email,
            first_name: author.first_name,
            last_name: author.last_name,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    /// Snake case on the wire; existing clients read `access_token`.
    #[serde(rename = "access_token")]
    pub access_token: String,
    pub user: UserResponse,
}

impl From<AuthSession> for AuthResponse {
    fn from(session: AuthSession) -> Self {
        Self {
            access_token: session.access_token,
            user: session.user.into(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleCreateRequest {
    pub title: String,
    pub description: String,
    pub published_at: String,
}

impl ArticleCreateRequest {
    pub fn into_command(self) -> Result<CreateArticleCommand, ApiError> {
        let published_at = parse_timestamp("publishedAt", &self.published_at).map_err(invalid)?;
        Ok(CreateArticleCommand {
            title: self.title,
            description: self.description,
            published_at,
        })
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleUpdateRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub published_at: Option<String>,
}

impl ArticleUpdateRequest {
    pub fn into_command(self) -> Result<UpdateArticleCommand, ApiError> {
        let published_at = self
            .published_at
            .as_deref()
            .map(|raw| parse_timestamp("publishedAt", raw))
            .transpose()
            .map_err(invalid)?;
        Ok(UpdateArticleCommand {
            title: self.title,
            description: self.description,
            published_at,
        })
    }
}

/// Raw list parameters. Everything arrives as text so malformed values
/// produce the JSON error envelope instead of an extractor rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub author_id: Option<String>,
    pub published_from: Option<String>,
    pub published_to: Option<String>,
    pub search: Option<String>,
}

impl ArticleListParams {
    pub fn into_query(self) -> Result<ArticleQuery, ApiError> {
        let page = parse_number("page", self.page.as_deref())?;
        if page == Some(0) {
            return Err(ApiError::validation("page: must be at least 1"));
        }

        let limit = parse_number("limit", self.limit.as_deref())?;
        if let Some(limit) = limit
            && !(MIN_LIMIT..=MAX_LIMIT).contains(&limit)
        {
            return Err(ApiError::validation(format!(
                "limit: must be between {MIN_LIMIT} and {MAX_LIMIT}"
            )));
        }

        let author_id = non_blank(self.author_id.as_deref())
            .map(|raw| {
                Uuid::parse_str(raw)
                    .map_err(|_| ApiError::validation("authorId: must be a valid UUID"))
            })
            .transpose()?;

        let published_from = parse_date("publishedFrom", self.published_from.as_deref())?;
        let published_to = parse_date("publishedTo", self.published_to.as_deref())?;

        Ok(ArticleQuery {
            page,
            limit,
            author_id,
            published_from,
            published_to,
            search: self.search,
        })
    }
}

fn non_blank(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|value| !value.is_empty())
}

fn parse_number(field: &'static str, raw: Option<&str>) -> Result<Option<u32>, ApiError> {
    non_blank(raw)
        .map(|value| {
            value
                .parse::<u32>()
                .map_err(|_| ApiError::validation(format!("{field}: must be a positive integer")))
        })
        .transpose()
}

fn parse_date(
    field: &'static str,
    raw: Option<&str>,
) -> Result<Option<OffsetDateTime>, ApiError> {
    non_blank(raw)
        .map(|value| parse_timestamp(field, value).map_err(invalid))
        .transpose()
}

pub(crate) fn invalid(err: DomainError) -> ApiError {
    match err {
        DomainError::Validation { field, message } => {
            ApiError::validation(format!("{field}: {message}"))
        }
        other => ApiError::internal(other.to_string()),
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub published_at: OffsetDateTime,
    pub author_id: Uuid,
    pub author: UserResponse,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<ArticleRecord> for ArticleResponse {
    fn from(article: ArticleRecord) -> Self {
        Self {
            id: article.id,
            title: article.title,
            description: article.description,
            published_at: article.published_at,
            author_id: article.author_id,
            author: article.author.into(),
            created_at: article.created_at,
            updated_at: article.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticlePageResponse {
    pub articles: Vec<ArticleResponse>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl From<ArticlePage> for ArticlePageResponse {
    fn from(page: ArticlePage) -> Self {
        let page = page.map(ArticleResponse::from);
        Self {
            articles: page.items,
            total: page.total,
            page: page.page,
            limit: page.limit,
            pages: page.pages,
            has_next: page.has_next,
            has_prev: page.has_prev,
        }
    }
}

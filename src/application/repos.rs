//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::pagination::PageRequest;
use crate::domain::entities::{ArticleRecord, UserRecord};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Filters applied to article listings. Absent fields do not constrain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleQueryFilter {
    pub author_id: Option<Uuid>,
    /// Inclusive lower bound on `published_at`.
    pub published_from: Option<OffsetDateTime>,
    /// Inclusive upper bound on `published_at`.
    pub published_to: Option<OffsetDateTime>,
    /// Case-insensitive substring of title or description.
    pub search: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateArticleParams {
    pub title: String,
    pub description: String,
    pub published_at: OffsetDateTime,
    pub author_id: Uuid,
}

/// Partial update; `None` leaves the stored value untouched.
#[derive(Debug, Clone)]
pub struct UpdateArticleParams {
    pub id: Uuid,
    pub title: Option<String>,
    pub description: Option<String>,
    pub published_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone)]
pub struct CreateUserParams {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
}

#[async_trait]
pub trait ArticlesRepo: Send + Sync {
    /// Articles matching `filter`, newest `published_at` first, windowed by `page`.
    async fn list_articles(
        &self,
        filter: &ArticleQueryFilter,
        page: PageRequest,
    ) -> Result<Vec<ArticleRecord>, RepoError>;

    async fn count_articles(&self, filter: &ArticleQueryFilter) -> Result<u64, RepoError>;

    async fn find_article(&self, id: Uuid) -> Result<Option<ArticleRecord>, RepoError>;
}

#[async_trait]
pub trait ArticlesWriteRepo: Send + Sync {
    async fn create_article(&self, params: CreateArticleParams)
    -> Result<ArticleRecord, RepoError>;

    /// Returns `RepoError::NotFound` when the article vanished before the write.
    async fn update_article(&self, params: UpdateArticleParams)
    -> Result<ArticleRecord, RepoError>;

    /// Returns `RepoError::NotFound` when nothing was deleted.
    async fn delete_article(&self, id: Uuid) -> Result<(), RepoError>;
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    /// Returns `RepoError::Duplicate` when the email is already registered.
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError>;

    async fn find_user(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError>;
}

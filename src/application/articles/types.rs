use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::{
        pagination::{OffsetPage, PageRequest},
        repos::{ArticleQueryFilter, RepoError},
    },
    domain::{entities::ArticleRecord, error::DomainError},
};

pub type ArticlePage = OffsetPage<ArticleRecord>;

#[derive(Debug, Error)]
pub enum ArticleServiceError {
    #[error("article `{0}` not found")]
    NotFound(Uuid),
    #[error("You can only {action} your own articles")]
    Forbidden { action: &'static str },
    #[error(transparent)]
    Validation(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// A list request as received. Normalization happens in
/// [`ArticleQuery::page_request`] and [`ArticleQuery::filter`], so two
/// queries that normalize identically read and cache the same page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub author_id: Option<Uuid>,
    pub published_from: Option<OffsetDateTime>,
    pub published_to: Option<OffsetDateTime>,
    pub search: Option<String>,
}

impl ArticleQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }

    pub fn filter(&self) -> ArticleQueryFilter {
        // Whitespace is part of the substring; only an empty term means no filter.
        let search = self.search.clone().filter(|value| !value.is_empty());

        ArticleQueryFilter {
            author_id: self.author_id,
            published_from: self.published_from,
            published_to: self.published_to,
            search,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateArticleCommand {
    pub title: String,
    pub description: String,
    pub published_at: OffsetDateTime,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateArticleCommand {
    pub title: Option<String>,
    pub description: Option<String>,
    pub published_at: Option<OffsetDateTime>,
}

impl UpdateArticleCommand {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.published_at.is_none()
    }
}

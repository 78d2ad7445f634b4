//! Process-local repositories used by tests and by `serve` without a database URL.

use std::{
    cmp::Reverse,
    collections::HashMap,
    sync::RwLock,
};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::pagination::PageRequest;
use crate::application::repos::{
    ArticleQueryFilter, ArticlesRepo, ArticlesWriteRepo, CreateArticleParams, CreateUserParams,
    RepoError, UpdateArticleParams, UsersRepo,
};
use crate::domain::entities::{ArticleRecord, UserRecord};
use crate::util::lock::{rw_read, rw_write};

const LOCK_TARGET: &str = "articles::infra::memory";

#[derive(Debug, Clone)]
struct ArticleRow {
    id: Uuid,
    title: String,
    description: String,
    published_at: OffsetDateTime,
    author_id: Uuid,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl ArticleRow {
    fn matches(&self, filter: &ArticleQueryFilter) -> bool {
        if filter.author_id.is_some_and(|author| author != self.author_id) {
            return false;
        }
        if filter.published_from.is_some_and(|from| self.published_at < from) {
            return false;
        }
        if filter.published_to.is_some_and(|to| self.published_at > to) {
            return false;
        }
        match filter.search.as_deref() {
            Some(term) => {
                let term = term.to_lowercase();
                self.title.to_lowercase().contains(&term)
                    || self.description.to_lowercase().contains(&term)
            }
            None => true,
        }
    }
}

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, UserRecord>,
    articles: HashMap<Uuid, ArticleRow>,
}

impl Tables {
    fn hydrate(&self, row: &ArticleRow) -> Result<ArticleRecord, RepoError> {
        let author = self
            .users
            .get(&row.author_id)
            .ok_or_else(|| RepoError::Integrity {
                message: format!("article `{}` references a missing author", row.id),
            })?;

        Ok(ArticleRecord {
            id: row.id,
            title: row.title.clone(),
            description: row.description.clone(),
            published_at: row.published_at,
            author_id: row.author_id,
            author: author.summary(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    fn matching(&self, filter: &ArticleQueryFilter) -> Vec<&ArticleRow> {
        let mut rows: Vec<&ArticleRow> = self
            .articles
            .values()
            .filter(|row| row.matches(filter))
            .collect();
        rows.sort_by_key(|row| (Reverse(row.published_at), Reverse(row.created_at), Reverse(row.id)));
        rows
    }
}

/// Users and articles held behind one lock, mirroring the relational schema.
#[derive(Default)]
pub struct InMemoryRepositories {
    tables: RwLock<Tables>,
}

impl InMemoryRepositories {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn article_count(&self) -> usize {
        rw_read(&self.tables, LOCK_TARGET, "article_count")
            .articles
            .len()
    }

    /// Delete a row behind the service's back, as a concurrent writer would.
    pub fn remove_article_silently(&self, id: Uuid) -> bool {
        rw_write(&self.tables, LOCK_TARGET, "remove_article_silently")
            .articles
            .remove(&id)
            .is_some()
    }
}

#[async_trait]
impl ArticlesRepo for InMemoryRepositories {
    async fn list_articles(
        &self,
        filter: &ArticleQueryFilter,
        page: PageRequest,
    ) -> Result<Vec<ArticleRecord>, RepoError> {
        let tables = rw_read(&self.tables, LOCK_TARGET, "list_articles");
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        tables
            .matching(filter)
            .into_iter()
            .skip(offset)
            .take(page.limit() as usize)
            .map(|row| tables.hydrate(row))
            .collect()
    }

    async fn count_articles(&self, filter: &ArticleQueryFilter) -> Result<u64, RepoError> {
        let tables = rw_read(&self.tables, LOCK_TARGET, "count_articles");
        Ok(tables.matching(filter).len() as u64)
    }

    async fn find_article(&self, id: Uuid) -> Result<Option<ArticleRecord>, RepoError> {
        let tables = rw_read(&self.tables, LOCK_TARGET, "find_article");
        tables
            .articles
            .get(&id)
            .map(|row| tables.hydrate(row))
            .transpose()
    }
}

#[async_trait]
impl ArticlesWriteRepo for InMemoryRepositories {
    async fn create_article(
        &self,
        params: CreateArticleParams,
    ) -> Result<ArticleRecord, RepoError> {
        let mut tables = rw_write(&self.tables, LOCK_TARGET, "create_article");
        if !tables.users.contains_key(&params.author_id) {
            return Err(RepoError::Integrity {
                message: format!("author `{}` does not exist", params.author_id),
            });
        }

        let now = OffsetDateTime::now_utc();
        let row = ArticleRow {
            id: Uuid::new_v4(),
            title: params.title,
            description: params.description,
            published_at: params.published_at,
            author_id: params.author_id,
            created_at: now,
            updated_at: now,
        };
        let record = tables.hydrate(&row)?;
        tables.articles.insert(row.id, row);
        Ok(record)
    }

    async fn update_article(
        &self,
        params: UpdateArticleParams,
    ) -> Result<ArticleRecord, RepoError> {
        let mut tables = rw_write(&self.tables, LOCK_TARGET, "update_article");
        let row = tables
            .articles
            .get_mut(&params.id)
            .ok_or(RepoError::NotFound)?;

        if let Some(title) = params.title {
            row.title = title;
        }
        if let Some(description) = params.description {
            row.description = description;
        }
        if let Some(published_at) = params.published_at {
            row.published_at = published_at;
        }
        row.updated_at = OffsetDateTime::now_utc();

        let row = row.clone();
        tables.hydrate(&row)
    }

    async fn delete_article(&self, id: Uuid) -> Result<(), RepoError> {
        rw_write(&self.tables, LOCK_TARGET, "delete_article")
            .articles
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl UsersRepo for InMemoryRepositories {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let mut tables = rw_write(&self.tables, LOCK_TARGET, "create_user");
        if tables.users.values().any(|user| user.email == params.email) {
            return Err(RepoError::Duplicate {
                constraint: "users_email_key".to_string(),
            });
        }

        let now = OffsetDateTime::now_utc();
        let user = UserRecord {
            id: Uuid::new_v4(),
            email: params.email,
            password_hash: params.password_hash,
            first_name: params.first_name,
            last_name: params.last_name,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError> {
        Ok(rw_read(&self.tables, LOCK_TARGET, "find_user")
            .users
            .get(&id)
            .cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError> {
        Ok(rw_read(&self.tables, LOCK_TARGET, "find_user_by_email")
            .users
            .values()
            .find(|user| user.email == email)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    async fn author(repos: &InMemoryRepositories, email: &str) -> Uuid {
        repos
            .create_user(CreateUserParams {
                email: email.to_string(),
                password_hash: "hash".to_string(),
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
            })
            .await
            .expect("user")
            .id
    }

    async fn article(
        repos: &InMemoryRepositories,
        author_id: Uuid,
        title: &str,
        published_at: OffsetDateTime,
    ) -> ArticleRecord {
        repos
            .create_article(CreateArticleParams {
                title: title.to_string(),
                description: format!("{title} body text"),
                published_at,
                author_id,
            })
            .await
            .expect("article")
    }

    #[tokio::test]
    async fn lists_newest_first_with_offset_window() {
        let repos = InMemoryRepositories::new();
        let id = author(&repos, "a@example.com").await;
        article(&repos, id, "Old", datetime!(2025-01-10 00:00 UTC)).await;
        article(&repos, id, "Mid", datetime!(2025-01-12 00:00 UTC)).await;
        article(&repos, id, "New", datetime!(2025-01-14 00:00 UTC)).await;

        let filter = ArticleQueryFilter::default();
        let first = repos
            .list_articles(&filter, PageRequest::new(Some(1), Some(2)))
            .await
            .expect("page 1");
        let second = repos
            .list_articles(&filter, PageRequest::new(Some(2), Some(2)))
            .await
            .expect("page 2");

        let titles: Vec<_> = first.iter().chain(&second).map(|a| a.title.as_str()).collect();
        assert_eq!(titles, ["New", "Mid", "Old"]);
        assert_eq!(repos.count_articles(&filter).await.expect("count"), 3);
    }

    #[tokio::test]
    async fn date_bounds_are_inclusive_and_search_ignores_case() {
        let repos = InMemoryRepositories::new();
        let id = author(&repos, "b@example.com").await;
        article(&repos, id, "Rust Tips", datetime!(2025-01-10 00:00 UTC)).await;
        article(&repos, id, "Go Tips", datetime!(2025-01-12 00:00 UTC)).await;

        let bounded = ArticleQueryFilter {
            published_from: Some(datetime!(2025-01-10 00:00 UTC)),
            published_to: Some(datetime!(2025-01-10 00:00 UTC)),
            ..Default::default()
        };
        assert_eq!(repos.count_articles(&bounded).await.expect("count"), 1);

        let search = ArticleQueryFilter {
            search: Some("rUsT".to_string()),
            ..Default::default()
        };
        let found = repos
            .list_articles(&search, PageRequest::default())
            .await
            .expect("search");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Rust Tips");
    }

    #[tokio::test]
    async fn author_filter_and_hydrated_author() {
        let repos = InMemoryRepositories::new();
        let first = author(&repos, "c@example.com").await;
        let second = author(&repos, "d@example.com").await;
        article(&repos, first, "Mine", datetime!(2025-01-10 00:00 UTC)).await;
        article(&repos, second, "Theirs", datetime!(2025-01-10 00:00 UTC)).await;

        let filter = ArticleQueryFilter {
            author_id: Some(second),
            ..Default::default()
        };
        let items = repos
            .list_articles(&filter, PageRequest::default())
            .await
            .expect("list");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].author.email, "d@example.com");
    }

    #[tokio::test]
    async fn writes_on_missing_rows_are_not_found() {
        let repos = InMemoryRepositories::new();
        let missing = Uuid::new_v4();
        assert!(matches!(
            repos.delete_article(missing).await,
            Err(RepoError::NotFound)
        ));
        assert!(matches!(
            repos
                .update_article(UpdateArticleParams {
                    id: missing,
                    title: Some("x".to_string()),
                    description: None,
                    published_at: None,
                })
                .await,
            Err(RepoError::NotFound)
        ));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let repos = InMemoryRepositories::new();
        author(&repos, "dup@example.com").await;
        let err = repos
            .create_user(CreateUserParams {
                email: "dup@example.com".to_string(),
                password_hash: "hash".to_string(),
                first_name: "Again".to_string(),
                last_name: "User".to_string(),
            })
            .await
            .expect_err("duplicate");
        assert!(matches!(err, RepoError::Duplicate { .. }));
    }
}

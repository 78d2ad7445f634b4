use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::application::pagination::OffsetPage;
use crate::application::repos::{
    ArticlesRepo, ArticlesWriteRepo, CreateArticleParams, RepoError, UpdateArticleParams,
};
use crate::cache::ArticleCache;
use crate::domain::articles::{validate_description, validate_title};
use crate::domain::entities::ArticleRecord;

use super::types::{
    ArticlePage, ArticleQuery, ArticleServiceError, CreateArticleCommand, UpdateArticleCommand,
};

const SOURCE: &str = "articles::application::articles";

/// Article CRUD over the relational store, with optional read-through caching.
///
/// Every successful write invalidates the written article's detail entry and
/// all cached list pages before returning.
#[derive(Clone)]
pub struct ArticleService {
    reader: Arc<dyn ArticlesRepo>,
    writer: Arc<dyn ArticlesWriteRepo>,
    cache: Option<ArticleCache>,
}

impl ArticleService {
    pub fn new(reader: Arc<dyn ArticlesRepo>, writer: Arc<dyn ArticlesWriteRepo>) -> Self {
        Self {
            reader,
            writer,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: ArticleCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_cache_opt(mut self, cache: Option<ArticleCache>) -> Self {
        self.cache = cache;
        self
    }

    pub async fn create(
        &self,
        author_id: Uuid,
        command: CreateArticleCommand,
    ) -> Result<ArticleRecord, ArticleServiceError> {
        validate_title(&command.title)?;
        validate_description(&command.description)?;

        let article = self
            .writer
            .create_article(CreateArticleParams {
                title: command.title,
                description: command.description,
                published_at: command.published_at,
                author_id,
            })
            .await?;

        self.invalidate_written(article.id).await;
        info!(
            target: SOURCE,
            article_id = %article.id,
            author_id = %author_id,
            "Article created"
        );
        Ok(article)
    }

    pub async fn find_all(&self, query: &ArticleQuery) -> Result<ArticlePage, ArticleServiceError> {
        match &self.cache {
            Some(cache) => {
                let key = cache.keys().list_key(query);
                cache
                    .reads()
                    .get_or_load(&key, || self.load_page(query))
                    .await
            }
            None => self.load_page(query).await,
        }
    }

    pub async fn find_one(&self, id: Uuid) -> Result<ArticleRecord, ArticleServiceError> {
        match &self.cache {
            Some(cache) => {
                let key = cache.keys().article_key(id);
                cache
                    .reads()
                    .get_or_load(&key, || self.load_article(id))
                    .await
            }
            None => self.load_article(id).await,
        }
    }

    pub async fn update(
        &self,
        id: Uuid,
        actor: Uuid,
        command: UpdateArticleCommand,
    ) -> Result<ArticleRecord, ArticleServiceError> {
        if let Some(title) = command.title.as_deref() {
            validate_title(title)?;
        }
        if let Some(description) = command.description.as_deref() {
            validate_description(description)?;
        }

        let existing = self.find_one(id).await?;
        if !existing.is_authored_by(actor) {
            return Err(ArticleServiceError::Forbidden { action: "update" });
        }
        if command.is_empty() {
            return Ok(existing);
        }

        let params = UpdateArticleParams {
            id,
            title: command.title,
            description: command.description,
            published_at: command.published_at,
        };

        match self.writer.update_article(params).await {
            Ok(article) => {
                self.invalidate_written(id).await;
                info!(target: SOURCE, article_id = %id, "Article updated");
                Ok(article)
            }
            Err(RepoError::NotFound) => Err(self.vanished(id).await),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn remove(&self, id: Uuid, actor: Uuid) -> Result<(), ArticleServiceError> {
        let existing = self.find_one(id).await?;
        if !existing.is_authored_by(actor) {
            return Err(ArticleServiceError::Forbidden { action: "delete" });
        }

        match self.writer.delete_article(id).await {
            Ok(()) => {
                self.invalidate_written(id).await;
                info!(target: SOURCE, article_id = %id, "Article deleted");
                Ok(())
            }
            Err(RepoError::NotFound) => Err(self.vanished(id).await),
            Err(err) => Err(err.into()),
        }
    }

    async fn load_page(&self, query: &ArticleQuery) -> Result<ArticlePage, ArticleServiceError> {
        let page = query.page_request();
        let filter = query.filter();

        let (items, total) = tokio::try_join!(
            self.reader.list_articles(&filter, page),
            self.reader.count_articles(&filter),
        )?;

        Ok(OffsetPage::new(items, total, page))
    }

    async fn load_article(&self, id: Uuid) -> Result<ArticleRecord, ArticleServiceError> {
        self.reader
            .find_article(id)
            .await?
            .ok_or(ArticleServiceError::NotFound(id))
    }

    async fn invalidate_written(&self, id: Uuid) {
        if let Some(cache) = &self.cache {
            cache.invalidation().article_written(id).await;
        }
    }

    /// The row disappeared between the ownership check and the write, most
    /// likely a concurrent delete. The detail entry may still hold it.
    async fn vanished(&self, id: Uuid) -> ArticleServiceError {
        warn!(
            target: SOURCE,
            article_id = %id,
            "Article disappeared before the write was applied"
        );
        if let Some(cache) = &self.cache {
            cache.invalidation().article_missing(id).await;
        }
        ArticleServiceError::NotFound(id)
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::application::repos::{CreateUserParams, UsersRepo};
    use crate::cache::{CacheConfig, KeyValueCache, MemoryCache};
    use crate::domain::error::DomainError;
    use crate::infra::memory::InMemoryRepositories;

    struct Fixture {
        repos: Arc<InMemoryRepositories>,
        store: Arc<MemoryCache>,
        service: ArticleService,
        author: Uuid,
    }

    async fn fixture() -> Fixture {
        let repos = Arc::new(InMemoryRepositories::new());
        let store = Arc::new(MemoryCache::new());
        let cache = ArticleCache::new(store.clone(), &CacheConfig::default());
        let service = ArticleService::new(repos.clone(), repos.clone()).with_cache(cache);
        let author = repos
            .create_user(CreateUserParams {
                email: "author@example.com".to_string(),
                password_hash: "hash".to_string(),
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
            })
            .await
            .expect("user")
            .id;
        Fixture {
            repos,
            store,
            service,
            author,
        }
    }

    fn command(title: &str) -> CreateArticleCommand {
        CreateArticleCommand {
            title: title.to_string(),
            description: "A description long enough to pass.".to_string(),
            published_at: datetime!(2025-01-12 00:00 UTC),
        }
    }

    #[tokio::test]
    async fn create_validates_before_writing() {
        let f = fixture().await;
        let err = f
            .service
            .create(
                f.author,
                CreateArticleCommand {
                    description: "short".to_string(),
                    ..command("Title")
                },
            )
            .await
            .expect_err("description too short");

        assert!(matches!(
            err,
            ArticleServiceError::Validation(DomainError::Validation {
                field: "description",
                ..
            })
        ));
        assert_eq!(f.repos.article_count(), 0);
    }

    #[tokio::test]
    async fn find_one_is_cached_after_first_read() {
        let f = fixture().await;
        let article = f.service.create(f.author, command("Cached")).await.expect("create");
        let key = crate::cache::CacheKeyDeriver::new("articles").article_key(article.id);

        assert!(!f.store.contains_key(&key));
        let loaded = f.service.find_one(article.id).await.expect("find");
        assert_eq!(loaded, article);
        assert!(f.store.contains_key(&key));
    }

    #[tokio::test]
    async fn missing_article_is_not_cached() {
        let f = fixture().await;
        let id = Uuid::new_v4();

        for _ in 0..2 {
            let err = f.service.find_one(id).await.expect_err("missing");
            assert!(matches!(err, ArticleServiceError::NotFound(missing) if missing == id));
        }
        assert!(f.store.is_empty());
    }

    #[tokio::test]
    async fn update_by_non_author_is_forbidden() {
        let f = fixture().await;
        let article = f.service.create(f.author, command("Mine")).await.expect("create");

        let err = f
            .service
            .update(
                article.id,
                Uuid::new_v4(),
                UpdateArticleCommand {
                    title: Some("Theirs".to_string()),
                    ..Default::default()
                },
            )
            .await
            .expect_err("forbidden");

        assert!(matches!(err, ArticleServiceError::Forbidden { action: "update" }));
        assert_eq!(err.to_string(), "You can only update your own articles");
        let stored = f.service.find_one(article.id).await.expect("find");
        assert_eq!(stored.title, "Mine");
    }

    #[tokio::test]
    async fn update_of_missing_article_is_not_found_even_for_strangers() {
        let f = fixture().await;
        let err = f
            .service
            .update(Uuid::new_v4(), Uuid::new_v4(), UpdateArticleCommand::default())
            .await
            .expect_err("missing");
        assert!(matches!(err, ArticleServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn empty_update_returns_existing_without_writing() {
        let f = fixture().await;
        let article = f.service.create(f.author, command("Same")).await.expect("create");

        let unchanged = f
            .service
            .update(article.id, f.author, UpdateArticleCommand::default())
            .await
            .expect("noop update");
        assert_eq!(unchanged, article);
    }

    #[tokio::test]
    async fn remove_clears_detail_entry() {
        let f = fixture().await;
        let article = f.service.create(f.author, command("Gone")).await.expect("create");
        f.service.find_one(article.id).await.expect("warm");

        f.service.remove(article.id, f.author).await.expect("remove");

        let err = f.service.find_one(article.id).await.expect_err("deleted");
        assert!(matches!(err, ArticleServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn works_without_cache() {
        let repos = Arc::new(InMemoryRepositories::new());
        let author = repos
            .create_user(CreateUserParams {
                email: "nocache@example.com".to_string(),
                password_hash: "hash".to_string(),
                first_name: "No".to_string(),
                last_name: "Cache".to_string(),
            })
            .await
            .expect("user")
            .id;
        let service = ArticleService::new(repos.clone(), repos.clone()).with_cache_opt(None);

        let article = service.create(author, command("Plain")).await.expect("create");
        let page = service
            .find_all(&ArticleQuery::default())
            .await
            .expect("list");
        assert_eq!(page.items, vec![article]);
    }

    #[tokio::test]
    async fn stale_cache_entry_for_vanished_article_is_dropped_on_write() {
        let f = fixture().await;
        let article = f.service.create(f.author, command("Racy")).await.expect("create");
        f.service.find_one(article.id).await.expect("warm");
        f.repos.remove_article_silently(article.id);

        let err = f
            .service
            .update(
                article.id,
                f.author,
                UpdateArticleCommand {
                    title: Some("Late".to_string()),
                    ..Default::default()
                },
            )
            .await
            .expect_err("vanished");
        assert!(matches!(err, ArticleServiceError::NotFound(_)));

        let key = crate::cache::CacheKeyDeriver::new("articles").article_key(article.id);
        assert_eq!(f.store.get(&key).await.expect("get"), None);
    }
}

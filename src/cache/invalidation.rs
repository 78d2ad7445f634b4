//! Write-side cache maintenance for articles.

use std::sync::Arc;

use metrics::counter;
use tracing::{debug, error, warn};
use uuid::Uuid;

use super::keys::CacheKeyDeriver;
use super::store::{CacheError, KeyValueCache};

const SOURCE: &str = "articles::cache::invalidation";

/// What one invalidation pass managed to do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InvalidationReport {
    pub detail_removed: bool,
    pub list_keys_removed: usize,
    pub list_skipped: bool,
    pub failures: usize,
}

/// Drops the detail entry of a written article and every cached list page.
///
/// List keys are found by enumerating `{prefix}:list:*` on the store. Stores
/// that cannot enumerate keep their list entries until TTL expiry. Failures
/// are logged and counted, never returned.
#[derive(Clone)]
pub struct InvalidationCoordinator {
    store: Arc<dyn KeyValueCache>,
    keys: CacheKeyDeriver,
}

impl InvalidationCoordinator {
    pub fn new(store: Arc<dyn KeyValueCache>, keys: CacheKeyDeriver) -> Self {
        Self { store, keys }
    }

    /// Invalidate after a create, update or delete of article `id`.
    pub async fn article_written(&self, id: Uuid) -> InvalidationReport {
        let mut report = InvalidationReport::default();
        self.invalidate_detail(id, &mut report).await;
        self.invalidate_lists(&mut report).await;

        debug!(
            target: SOURCE,
            article_id = %id,
            detail_removed = report.detail_removed,
            list_keys_removed = report.list_keys_removed,
            list_skipped = report.list_skipped,
            failures = report.failures,
            "Article cache invalidated"
        );
        report
    }

    /// Drop only the detail entry, used when a write finds the row already gone.
    pub async fn article_missing(&self, id: Uuid) -> InvalidationReport {
        let mut report = InvalidationReport::default();
        self.invalidate_detail(id, &mut report).await;
        report
    }

    async fn invalidate_detail(&self, id: Uuid, report: &mut InvalidationReport) {
        let key = self.keys.article_key(id);
        match self.store.delete(&key).await {
            Ok(()) => {
                report.detail_removed = true;
                counter!("articles_cache_invalidated_keys_total", "kind" => "detail").increment(1);
            }
            Err(err) => {
                report.failures += 1;
                counter!("articles_cache_error_total", "op" => "delete").increment(1);
                error!(
                    target: SOURCE,
                    key = %key,
                    article_id = %id,
                    backend = self.store.backend(),
                    error = %err,
                    "Failed to invalidate article cache entry"
                );
            }
        }
    }

    async fn invalidate_lists(&self, report: &mut InvalidationReport) {
        let pattern = self.keys.list_pattern();
        let keys = match self.store.list_keys(&pattern).await {
            Ok(keys) => keys,
            Err(CacheError::Unsupported) => {
                report.list_skipped = true;
                counter!("articles_cache_list_invalidation_skipped_total").increment(1);
                warn!(
                    target: SOURCE,
                    pattern = %pattern,
                    backend = self.store.backend(),
                    "Cache store does not support key enumeration; list entries expire by TTL"
                );
                return;
            }
            Err(err) => {
                report.failures += 1;
                counter!("articles_cache_error_total", "op" => "list_keys").increment(1);
                error!(
                    target: SOURCE,
                    pattern = %pattern,
                    backend = self.store.backend(),
                    error = %err,
                    "Failed to enumerate list cache keys"
                );
                return;
            }
        };

        for key in keys {
            match self.store.delete(&key).await {
                Ok(()) => {
                    report.list_keys_removed += 1;
                    counter!("articles_cache_invalidated_keys_total", "kind" => "list")
                        .increment(1);
                }
                Err(err) => {
                    report.failures += 1;
                    counter!("articles_cache_error_total", "op" => "delete").increment(1);
                    error!(
                        target: SOURCE,
                        key = %key,
                        backend = self.store.backend(),
                        error = %err,
                        "Failed to invalidate list cache entry"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::application::articles::ArticleQuery;
    use crate::cache::MemoryCache;

    const TTL: Duration = Duration::from_secs(60);

    fn keys() -> CacheKeyDeriver {
        CacheKeyDeriver::new("articles")
    }

    async fn seed(store: &MemoryCache, key: &str) {
        store.set(key, "{}".to_string(), TTL).await.expect("seed");
    }

    #[tokio::test]
    async fn removes_detail_and_all_lists() {
        let store = Arc::new(MemoryCache::new());
        let id = Uuid::new_v4();
        let other = Uuid::new_v4();
        let detail = keys().article_key(id);
        let other_detail = keys().article_key(other);
        let list_a = keys().list_key(&ArticleQuery::default());
        let list_b = keys().list_key(&ArticleQuery {
            page: Some(2),
            ..Default::default()
        });
        for key in [&detail, &other_detail, &list_a, &list_b] {
            seed(&store, key).await;
        }

        let coordinator = InvalidationCoordinator::new(store.clone(), keys());
        let report = coordinator.article_written(id).await;

        assert!(report.detail_removed);
        assert_eq!(report.list_keys_removed, 2);
        assert_eq!(report.failures, 0);
        assert!(!store.contains_key(&detail));
        assert!(!store.contains_key(&list_a));
        assert!(!store.contains_key(&list_b));
        assert!(store.contains_key(&other_detail));
    }

    #[tokio::test]
    async fn skips_lists_without_enumeration() {
        let store = Arc::new(MemoryCache::without_key_listing());
        let id = Uuid::new_v4();
        let detail = keys().article_key(id);
        let list = keys().list_key(&ArticleQuery::default());
        seed(&store, &detail).await;
        seed(&store, &list).await;

        let report = InvalidationCoordinator::new(store.clone(), keys())
            .article_written(id)
            .await;

        assert!(report.detail_removed);
        assert!(report.list_skipped);
        assert_eq!(report.failures, 0);
        assert!(!store.contains_key(&detail));
        assert!(store.contains_key(&list));
    }

    #[tokio::test]
    async fn other_prefixes_are_left_alone() {
        let store = Arc::new(MemoryCache::new());
        let foreign = CacheKeyDeriver::new("drafts").list_key(&ArticleQuery::default());
        seed(&store, &foreign).await;

        InvalidationCoordinator::new(store.clone(), keys())
            .article_written(Uuid::new_v4())
            .await;

        assert!(store.contains_key(&foreign));
    }

    struct FailingDeletes;

    #[async_trait]
    impl KeyValueCache for FailingDeletes {
        fn backend(&self) -> &'static str {
            "failing"
        }

        async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            Ok(None)
        }

        async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), CacheError> {
            Ok(())
        }

        async fn delete(&self, _key: &str) -> Result<(), CacheError> {
            Err(CacheError::Timeout(Duration::from_millis(5)))
        }

        async fn list_keys(&self, _pattern: &str) -> Result<Vec<String>, CacheError> {
            Ok(vec!["articles:list:a".to_string(), "articles:list:b".to_string()])
        }
    }

    #[tokio::test]
    async fn failures_are_counted_not_raised() {
        let report = InvalidationCoordinator::new(Arc::new(FailingDeletes), keys())
            .article_written(Uuid::new_v4())
            .await;

        assert!(!report.detail_removed);
        assert_eq!(report.list_keys_removed, 0);
        assert_eq!(report.failures, 3);
    }
}

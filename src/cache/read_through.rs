//! Read-through wrapper: consult the cache, fall back to a loader, populate.

use std::{future::Future, sync::Arc, time::Duration};

use metrics::counter;
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use super::store::KeyValueCache;

const SOURCE: &str = "articles::cache::read_through";

/// Cache failures never surface to callers: a failed or undecodable read is a
/// miss and a failed write is dropped. Only loader errors propagate, and they
/// are never stored.
#[derive(Clone)]
pub struct ReadThroughCache {
    store: Arc<dyn KeyValueCache>,
    ttl: Duration,
}

impl ReadThroughCache {
    pub fn new(store: Arc<dyn KeyValueCache>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the cached value for `key`, or run `loader`, cache its `Ok`
    /// result for the configured TTL, and return it.
    ///
    /// Concurrent misses on the same key each run the loader.
    pub async fn get_or_load<T, E, F, Fut>(&self, key: &str, loader: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.lookup(key).await {
            return Ok(value);
        }

        let value = loader().await?;
        self.populate(key, &value).await;
        Ok(value)
    }

    async fn lookup<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.store.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => {
                    counter!("articles_cache_hit_total").increment(1);
                    debug!(target: SOURCE, key, "cache hit");
                    Some(value)
                }
                Err(err) => {
                    counter!("articles_cache_error_total", "op" => "decode").increment(1);
                    warn!(
                        target: SOURCE,
                        key,
                        error = %err,
                        "Discarding undecodable cache entry"
                    );
                    None
                }
            },
            Ok(None) => {
                counter!("articles_cache_miss_total").increment(1);
                debug!(target: SOURCE, key, "cache miss");
                None
            }
            Err(err) => {
                counter!("articles_cache_error_total", "op" => "get").increment(1);
                warn!(
                    target: SOURCE,
                    key,
                    backend = self.store.backend(),
                    error = %err,
                    "Cache read failed; falling back to the store"
                );
                None
            }
        }
    }

    async fn populate<T: Serialize>(&self, key: &str, value: &T) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(err) => {
                counter!("articles_cache_error_total", "op" => "encode").increment(1);
                warn!(target: SOURCE, key, error = %err, "Cache value could not be encoded");
                return;
            }
        };

        if let Err(err) = self.store.set(key, raw, self.ttl).await {
            counter!("articles_cache_error_total", "op" => "set").increment(1);
            warn!(
                target: SOURCE,
                key,
                backend = self.store.backend(),
                error = %err,
                "Cache write failed"
            );
        }
    }
}

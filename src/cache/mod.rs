//! Article cache layer.
//!
//! - `keys`: deterministic key derivation for detail and list lookups
//! - `read_through`: cache-aside reads with loader fallback
//! - `invalidation`: write-side removal of detail and list entries
//! - `store` / `memory`: the key-value abstraction and an in-process backend
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! backend = "redis"   # or "memory"
//! ttl_seconds = 3600
//! key_prefix = "articles"
//! ```

mod config;
mod invalidation;
mod keys;
mod memory;
mod read_through;
mod store;

use std::sync::Arc;

pub use config::CacheConfig;
pub use invalidation::{InvalidationCoordinator, InvalidationReport};
pub use keys::{CacheKeyDeriver, fingerprint};
pub use memory::MemoryCache;
pub use read_through::ReadThroughCache;
pub use store::{CacheError, KeyValueCache};

/// Everything the article service needs from the cache, sharing one store.
#[derive(Clone)]
pub struct ArticleCache {
    keys: CacheKeyDeriver,
    reads: ReadThroughCache,
    invalidation: InvalidationCoordinator,
}

impl ArticleCache {
    pub fn new(store: Arc<dyn KeyValueCache>, config: &CacheConfig) -> Self {
        let keys = CacheKeyDeriver::new(config.key_prefix.clone());
        Self {
            reads: ReadThroughCache::new(store.clone(), config.ttl),
            invalidation: InvalidationCoordinator::new(store, keys.clone()),
            keys,
        }
    }

    pub fn keys(&self) -> &CacheKeyDeriver {
        &self.keys
    }

    pub fn reads(&self) -> &ReadThroughCache {
        &self.reads
    }

    pub fn invalidation(&self) -> &InvalidationCoordinator {
        &self.invalidation
    }
}

//! Redis-backed key-value store for the article cache.

use std::{future::Future, time::Duration};

use async_trait::async_trait;
use deadpool_redis::{Config as RedisPoolConfig, Connection, Pool, PoolConfig, Runtime};
use redis::AsyncCommands;
use tracing::{debug, info};

use crate::cache::{CacheError, KeyValueCache};
use crate::config::CacheSettings;

use super::error::InfraError;

const SOURCE: &str = "articles::infra::redis";
const SCAN_BATCH: usize = 200;

#[derive(Clone)]
pub struct RedisCache {
    pool: Pool,
    timeout: Duration,
}

impl RedisCache {
    pub fn new(pool: Pool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    /// Build a pool from settings and check that one connection can be opened.
    pub async fn connect(settings: &CacheSettings) -> Result<Self, InfraError> {
        let mut pool_config = PoolConfig::new(settings.pool_size.get() as usize);
        pool_config.timeouts.wait = Some(settings.timeout);
        pool_config.timeouts.create = Some(settings.timeout);
        pool_config.timeouts.recycle = Some(settings.timeout);

        let mut redis_config = RedisPoolConfig::from_url(settings.redis_url.clone());
        redis_config.pool = Some(pool_config);

        let pool = redis_config
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|err| InfraError::cache(format!("failed to create redis pool: {err}")))?;

        let cache = Self::new(pool, settings.timeout);
        cache.ping().await.map_err(|err| InfraError::cache(err.to_string()))?;

        info!(
            target: SOURCE,
            pool_size = settings.pool_size.get(),
            timeout_ms = settings.timeout.as_millis() as u64,
            "Connected to Redis"
        );
        Ok(cache)
    }

    pub async fn ping(&self) -> Result<(), CacheError> {
        self.bounded(async {
            let mut conn = self.connection().await?;
            redis::cmd("PING")
                .query_async::<String>(&mut conn)
                .await
                .map(|_| ())
                .map_err(CacheError::backend)
        })
        .await
    }

    async fn connection(&self) -> Result<Connection, CacheError> {
        self.pool.get().await.map_err(CacheError::backend)
    }

    async fn bounded<T, Fut>(&self, op: Fut) -> Result<T, CacheError>
    where
        Fut: Future<Output = Result<T, CacheError>>,
    {
        tokio::time::timeout(self.timeout, op)
            .await
            .map_err(|_| CacheError::Timeout(self.timeout))?
    }
}

#[async_trait]
impl KeyValueCache for RedisCache {
    fn backend(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.bounded(async {
            let mut conn = self.connection().await?;
            conn.get::<_, Option<String>>(key)
                .await
                .map_err(CacheError::backend)
        })
        .await
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let seconds = ttl.as_secs().max(1);
        self.bounded(async {
            let mut conn = self.connection().await?;
            conn.set_ex::<_, _, ()>(key, value, seconds)
                .await
                .map_err(CacheError::backend)
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.bounded(async {
            let mut conn = self.connection().await?;
            conn.del::<_, ()>(key).await.map_err(CacheError::backend)
        })
        .await
    }

    /// Cursor-based `SCAN`, so enumeration never blocks the server like `KEYS`.
    async fn list_keys(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        self.bounded(async {
            let mut conn = self.connection().await?;
            let mut cursor: u64 = 0;
            let mut keys = Vec::new();
            loop {
                let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                    .arg(cursor)
                    .arg("MATCH")
                    .arg(pattern)
                    .arg("COUNT")
                    .arg(SCAN_BATCH)
                    .query_async(&mut conn)
                    .await
                    .map_err(CacheError::backend)?;
                keys.extend(batch);
                if next == 0 {
                    break;
                }
                cursor = next;
            }
            debug!(target: SOURCE, pattern, matched = keys.len(), "Scanned cache keys");
            Ok(keys)
        })
        .await
    }
}

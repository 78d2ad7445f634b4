//! The key-value store abstraction behind the read-through layer.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),
    #[error("cache operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("cache value could not be encoded or decoded: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("cache store does not support key enumeration")]
    Unsupported,
}

impl CacheError {
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }
}

/// String-valued store with per-entry expiry.
#[async_trait]
pub trait KeyValueCache: Send + Sync {
    /// Short backend label used in logs.
    fn backend(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    /// Deleting an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Keys matching a glob pattern (`*` and `?`). Stores without enumeration
    /// keep this default and report `CacheError::Unsupported`.
    async fn list_keys(&self, _pattern: &str) -> Result<Vec<String>, CacheError> {
        Err(CacheError::Unsupported)
    }
}

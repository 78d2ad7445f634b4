//! Cache configuration.

use std::time::Duration;

use crate::config::{CacheSettings, DEFAULT_CACHE_KEY_PREFIX, DEFAULT_CACHE_TTL_SECS};

/// Runtime view of the `[cache]` settings used by the read-through layer.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// When false the article service reads straight from the store.
    pub enabled: bool,
    /// Lifetime of every cache entry.
    pub ttl: Duration,
    /// Namespace prepended to every key.
    pub key_prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            key_prefix: DEFAULT_CACHE_KEY_PREFIX.to_string(),
        }
    }
}

impl From<&CacheSettings> for CacheConfig {
    fn from(settings: &CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            ttl: Duration::from_secs(settings.ttl.get()),
            key_prefix: settings.key_prefix.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = CacheConfig::default();
        assert!(config.enabled);
        assert_eq!(config.ttl, Duration::from_secs(3600));
        assert_eq!(config.key_prefix, "articles");
    }
}

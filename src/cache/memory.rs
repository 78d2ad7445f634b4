//! In-process key-value store with TTL expiry.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use super::store::{CacheError, KeyValueCache};

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: String,
    expires_at: Instant,
}

impl MemoryEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// DashMap-backed store. Expired entries are dropped on access, on every key
/// listing, and by [`MemoryCache::purge_expired`].
#[derive(Debug)]
pub struct MemoryCache {
    entries: DashMap<String, MemoryEntry>,
    key_listing: bool,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            key_listing: true,
        }
    }

    /// A store that refuses `list_keys`, like cache backends without SCAN.
    pub fn without_key_listing() -> Self {
        Self {
            entries: DashMap::new(),
            key_listing: false,
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        let now = Instant::now();
        self.entries
            .get(key)
            .is_some_and(|entry| entry.is_live(now))
    }

    /// Number of unexpired entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .iter()
            .filter(|entry| entry.value().is_live(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every expired entry and return how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live(now));
        before.saturating_sub(self.entries.len())
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueCache for MemoryCache {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        match self.entries.get(key) {
            Some(entry) if entry.is_live(now) => return Ok(Some(entry.value.clone())),
            Some(_) => {}
            None => return Ok(None),
        }

        self.entries
            .remove_if(key, |_, entry| !entry.is_live(now));
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let expires_at = Instant::now()
            .checked_add(ttl)
            .ok_or_else(|| CacheError::backend(format!("ttl {ttl:?} overflows the clock")))?;
        self.entries
            .insert(key.to_string(), MemoryEntry { value, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn list_keys(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        if !self.key_listing {
            return Err(CacheError::Unsupported);
        }

        self.purge_expired();
        Ok(self
            .entries
            .iter()
            .filter(|entry| glob_match(pattern, entry.key()))
            .map(|entry| entry.key().clone())
            .collect())
    }
}

/// Redis-style glob match supporting `*`, `?` and backslash escapes.
pub(crate) fn glob_match(pattern: &str, candidate: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let candidate: Vec<char> = candidate.chars().collect();

    let (mut p, mut c) = (0usize, 0usize);
    let mut backtrack: Option<(usize, usize)> = None;

    while c < candidate.len() {
        match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, c));
                p += 1;
                continue;
            }
            Some('?') => {
                p += 1;
                c += 1;
                continue;
            }
            Some('\\') if p + 1 < pattern.len() && pattern[p + 1] == candidate[c] => {
                p += 2;
                c += 1;
                continue;
            }
            Some(&literal) if literal != '\\' && literal == candidate[c] => {
                p += 1;
                c += 1;
                continue;
            }
            _ => {}
        }

        match backtrack {
            Some((star, matched)) => {
                p = star + 1;
                c = matched + 1;
                backtrack = Some((star, matched + 1));
            }
            None => return false,
        }
    }

    pattern[p..].iter().all(|ch| *ch == '*')
}

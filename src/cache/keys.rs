//! Cache key derivation.
//!
//! Every key has the shape `{prefix}:{namespace}:{digest}` where the digest is
//! the SHA-256 of the JSON form of the lookup parameters. Object members are
//! sorted by name, so the digest never depends on the order in which
//! parameters were assembled.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::application::articles::ArticleQuery;

const DETAIL_NAMESPACE: &str = "detail";
const LIST_NAMESPACE: &str = "list";

/// Maps logical lookups onto stable string keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKeyDeriver {
    prefix: String,
}

impl CacheKeyDeriver {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Key for a single article looked up by id.
    pub fn article_key(&self, id: Uuid) -> String {
        let mut params = Map::new();
        params.insert("id".to_string(), Value::String(id.to_string()));
        self.namespaced(DETAIL_NAMESPACE, &Value::Object(params))
    }

    /// Key for a list query. The query is normalized first so that requests
    /// differing only in defaults or an empty search share an entry.
    pub fn list_key(&self, query: &ArticleQuery) -> String {
        self.namespaced(LIST_NAMESPACE, &list_params(query))
    }

    /// Glob matching every list key under this prefix.
    pub fn list_pattern(&self) -> String {
        format!("{}:{LIST_NAMESPACE}:*", self.prefix)
    }

    fn namespaced(&self, namespace: &str, params: &Value) -> String {
        format!("{}:{namespace}:{}", self.prefix, fingerprint(params))
    }
}

/// SHA-256 hex digest of the compact JSON encoding of `value`.
///
/// `serde_json::Map` keeps members sorted by name, so the encoding is already
/// canonical.
pub fn fingerprint(value: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

fn list_params(query: &ArticleQuery) -> Value {
    let page = query.page_request();
    let filter = query.filter();

    let mut params = Map::new();
    params.insert("page".to_string(), Value::from(page.page()));
    params.insert("limit".to_string(), Value::from(page.limit()));
    if let Some(author_id) = filter.author_id {
        params.insert("authorId".to_string(), Value::String(author_id.to_string()));
    }
    // Instants are keyed by their UTC nanosecond timestamp so equal instants
    // written with different offsets collapse onto one key.
    if let Some(from) = filter.published_from {
        params.insert(
            "publishedFrom".to_string(),
            Value::String(from.unix_timestamp_nanos().to_string()),
        );
    }
    if let Some(to) = filter.published_to {
        params.insert(
            "publishedTo".to_string(),
            Value::String(to.unix_timestamp_nanos().to_string()),
        );
    }
    if let Some(search) = filter.search {
        params.insert("search".to_string(), Value::String(search));
    }
    Value::Object(params)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use time::macros::datetime;

    use super::*;

    fn deriver() -> CacheKeyDeriver {
        CacheKeyDeriver::new("articles")
    }

    #[test]
    fn canonical_form_ignores_member_order() {
        let mut forward = Map::new();
        forward.insert("page".to_string(), json!(1));
        forward.insert("search".to_string(), json!("rust"));
        let mut backward = Map::new();
        backward.insert("search".to_string(), json!("rust"));
        backward.insert("page".to_string(), json!(1));

        assert_eq!(
            fingerprint(&Value::Object(forward)),
            fingerprint(&Value::Object(backward))
        );
    }

    #[test]
    fn nested_objects_are_canonicalized() {
        let a = json!({"outer": {"b": 2, "a": 1}, "list": [{"y": 1, "x": 2}]});
        let b = json!({"list": [{"x": 2, "y": 1}], "outer": {"a": 1, "b": 2}});
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn identical_queries_share_a_key() {
        let author = Uuid::new_v4();
        let first = ArticleQuery {
            search: Some("rust".to_string()),
            author_id: Some(author),
            page: Some(2),
            ..Default::default()
        };
        let second = ArticleQuery {
            page: Some(2),
            author_id: Some(author),
            search: Some("rust".to_string()),
            ..Default::default()
        };
        assert_eq!(deriver().list_key(&first), deriver().list_key(&second));
    }

    #[test]
    fn defaults_and_empty_search_normalize() {
        let explicit = ArticleQuery {
            page: Some(1),
            limit: Some(10),
            search: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(
            deriver().list_key(&explicit),
            deriver().list_key(&ArticleQuery::default())
        );
    }

    #[test]
    fn whitespace_in_search_changes_the_key() {
        let keyed = |search: &str| {
            deriver().list_key(&ArticleQuery {
                search: Some(search.to_string()),
                ..Default::default()
            })
        };
        assert_ne!(keyed(" rust"), keyed("rust"));
        assert_ne!(keyed("   "), deriver().list_key(&ArticleQuery::default()));
    }

    #[test]
    fn every_filter_field_changes_the_key() {
        let base = ArticleQuery::default();
        let variants = [
            ArticleQuery {
                page: Some(2),
                ..Default::default()
            },
            ArticleQuery {
                limit: Some(20),
                ..Default::default()
            },
            ArticleQuery {
                author_id: Some(Uuid::new_v4()),
                ..Default::default()
            },
            ArticleQuery {
                published_from: Some(datetime!(2025-01-11 00:00 UTC)),
                ..Default::default()
            },
            ArticleQuery {
                published_to: Some(datetime!(2025-01-11 00:00 UTC)),
                ..Default::default()
            },
            ArticleQuery {
                search: Some("rust".to_string()),
                ..Default::default()
            },
        ];

        let base_key = deriver().list_key(&base);
        let mut seen = std::collections::HashSet::new();
        for variant in &variants {
            let key = deriver().list_key(variant);
            assert_ne!(key, base_key, "{variant:?} should not collide with defaults");
            assert!(seen.insert(key), "{variant:?} collided with another variant");
        }
    }

    #[test]
    fn range_bounds_are_not_interchangeable() {
        let instant = datetime!(2025-01-11 00:00 UTC);
        let from = ArticleQuery {
            published_from: Some(instant),
            ..Default::default()
        };
        let to = ArticleQuery {
            published_to: Some(instant),
            ..Default::default()
        };
        assert_ne!(deriver().list_key(&from), deriver().list_key(&to));
    }

    #[test]
    fn key_shapes_are_namespaced() {
        let id = Uuid::new_v4();
        let detail = deriver().article_key(id);
        let list = deriver().list_key(&ArticleQuery::default());

        assert!(detail.starts_with("articles:detail:"));
        assert!(list.starts_with("articles:list:"));
        assert_eq!(detail.len(), "articles:detail:".len() + 64);
        assert_eq!(deriver().list_pattern(), "articles:list:*");
        assert_eq!(deriver().article_key(id), detail);
        assert_ne!(deriver().article_key(Uuid::new_v4()), detail);
    }
}

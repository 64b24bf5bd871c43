//! Search result cache.
//!
//! Keyed by a SHA-256 of the normalized query and the canonical JSON of the
//! filter map, so filter maps with the same content share an entry no
//! matter how they were built. Backed by a `moka` cache with:
//!
//! - **TTL** — entries expire a fixed time after insertion (default 5 min);
//!   an expired entry is a miss even if capacity never forced it out.
//! - **Capacity** — bounded entry count (default 100), least-recently-used
//!   entry evicted on overflow.
//!
//! `moka::sync::Cache` is internally synchronized; concurrent `get`/`set`
//! from simultaneous requests need no extra locking.

use std::sync::Arc;
use std::time::Duration;

use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use serde_json::Value;
use sha2::{Digest, Sha256};

use context_scout_core::models::{FilterMap, SearchResult};

use crate::config::CacheConfig;

/// A cached retrieval outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// Reranked results, before context boosting.
    pub results: Vec<SearchResult>,
    pub total_count: i64,
    /// Wall-clock time of the retrieval that produced this entry.
    pub query_time_ms: u64,
}

pub struct SearchCache {
    inner: Cache<String, Arc<CacheEntry>>,
}

impl SearchCache {
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        let inner = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .eviction_policy(EvictionPolicy::lru())
            .build();
        Self { inner }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.capacity, config.ttl())
    }

    pub fn get(&self, query: &str, filters: &FilterMap) -> Option<Arc<CacheEntry>> {
        self.inner.get(&cache_key(query, filters))
    }

    pub fn set(&self, query: &str, filters: &FilterMap, entry: CacheEntry) {
        self.inner.insert(cache_key(query, filters), Arc::new(entry));
    }

    /// Entry count after flushing pending evictions.
    pub fn len(&self) -> u64 {
        self.inner.run_pending_tasks();
        self.inner.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Lowercase, trim, and collapse internal whitespace.
pub fn normalize_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Stable cache key for `(query, filters)`.
pub fn cache_key(query: &str, filters: &FilterMap) -> String {
    let canonical: serde_json::Map<String, Value> = filters
        .iter()
        .map(|(k, v)| (k.clone(), canonicalize(v)))
        .collect();
    let encoded_filters = Value::Object(canonical).to_string();

    let mut hasher = Sha256::new();
    hasher.update(normalize_query(query).as_bytes());
    hasher.update(b"\x1f");
    hasher.update(encoded_filters.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Rebuild nested objects with sorted keys.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            Value::Object(
                keys.into_iter()
                    .map(|k| (k.clone(), canonicalize(&map[k])))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use context_scout_core::models::{Document, DocumentMetadata};
    use serde_json::json;

    fn entry(id: &str, ms: u64) -> CacheEntry {
        CacheEntry {
            results: vec![SearchResult {
                document: Document {
                    id: id.to_string(),
                    content: String::new(),
                    embedding: Vec::new(),
                    metadata: DocumentMetadata::default(),
                    created_at: Utc::now(),
                    updated_at: Utc::now(),
                    story_ids: Vec::new(),
                    pr_numbers: Vec::new(),
                },
                score: 1.0,
            }],
            total_count: 1,
            query_time_ms: ms,
        }
    }

    #[test]
    fn key_ignores_filter_insertion_order() {
        let mut a = FilterMap::new();
        a.insert("git_branch".into(), json!("main"));
        a.insert("source_types".into(), json!(["code", "ticket"]));
        a.insert("date_range".into(), json!({ "to": "2024-02-01T00:00:00Z", "from": "2024-01-01T00:00:00Z" }));

        let mut b = FilterMap::new();
        b.insert("date_range".into(), json!({ "from": "2024-01-01T00:00:00Z", "to": "2024-02-01T00:00:00Z" }));
        b.insert("source_types".into(), json!(["code", "ticket"]));
        b.insert("git_branch".into(), json!("main"));

        assert_eq!(cache_key("auth", &a), cache_key("auth", &b));
    }

    #[test]
    fn key_normalizes_query() {
        let filters = FilterMap::new();
        assert_eq!(
            cache_key("  Auth   Flow ", &filters),
            cache_key("auth flow", &filters)
        );
        assert_ne!(cache_key("auth", &filters), cache_key("auth flow", &filters));
    }

    #[test]
    fn key_distinguishes_filter_values() {
        let mut a = FilterMap::new();
        a.insert("git_branch".into(), json!("main"));
        let mut b = FilterMap::new();
        b.insert("git_branch".into(), json!("dev"));
        assert_ne!(cache_key("q", &a), cache_key("q", &b));
    }

    #[test]
    fn get_after_set_hits() {
        let cache = SearchCache::new(10, Duration::from_secs(60));
        let filters = FilterMap::new();
        assert!(cache.get("auth", &filters).is_none());
        cache.set("auth", &filters, entry("d1", 42));
        let hit = cache.get("AUTH", &filters).expect("cache hit");
        assert_eq!(hit.query_time_ms, 42);
        assert_eq!(hit.results[0].document.id, "d1");
    }

    #[test]
    fn expired_entry_is_a_miss() {
        let cache = SearchCache::new(10, Duration::from_millis(50));
        let filters = FilterMap::new();
        cache.set("auth", &filters, entry("d1", 1));
        assert!(cache.get("auth", &filters).is_some());
        std::thread::sleep(Duration::from_millis(120));
        assert!(cache.get("auth", &filters).is_none());
    }

    #[test]
    fn capacity_is_bounded() {
        let cache = SearchCache::new(2, Duration::from_secs(60));
        let filters = FilterMap::new();
        for i in 0..5 {
            cache.set(&format!("query {i}"), &filters, entry("d", i));
        }
        assert!(cache.len() <= 2);
    }

    #[test]
    fn concurrent_access_is_safe() {
        let cache = Arc::new(SearchCache::new(50, Duration::from_secs(60)));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    let filters = FilterMap::new();
                    for i in 0..100u64 {
                        let q = format!("q{}", i % 10);
                        cache.set(&q, &filters, entry("d", t * 1000 + i));
                        assert!(cache.get(&q, &filters).is_some());
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert!(cache.len() <= 10);
    }
}

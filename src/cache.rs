//! The Cache Store (C1): a keyed, TTL'd memo for LLM, tool, and retrieval
//! results. Best-effort by design — every failure mode degrades to a miss
//! rather than propagating, and a write that would block the calling path
//! is dropped instead (§4.1).

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde_json::Value;
use tokio::time::timeout;

/// The TTL category a cached value belongs to, matching the table in §4.1.
/// Callers pick the category; the store does not infer it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheCategory {
    InvestigationResult,
    LlmCompletion,
    VectorSearch,
    WebIntelligence,
    AcademicResearch,
    ExchangeRates,
}

impl CacheCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheCategory::InvestigationResult => "investigation_result",
            CacheCategory::LlmCompletion => "llm_completion",
            CacheCategory::VectorSearch => "vector_search",
            CacheCategory::WebIntelligence => "web_intelligence",
            CacheCategory::AcademicResearch => "academic_research",
            CacheCategory::ExchangeRates => "exchange_rates",
        }
    }

    /// Parse a `DELETE /cache/clear/{category}` path segment (§6) back into
    /// a category. Unknown segments are the caller's problem (400), not
    /// this crate's.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "investigation_result" => Some(CacheCategory::InvestigationResult),
            "llm_completion" => Some(CacheCategory::LlmCompletion),
            "vector_search" => Some(CacheCategory::VectorSearch),
            "web_intelligence" => Some(CacheCategory::WebIntelligence),
            "academic_research" => Some(CacheCategory::AcademicResearch),
            "exchange_rates" => Some(CacheCategory::ExchangeRates),
            _ => None,
        }
    }
}

/// A single stored value. `expires_at` is checked on read; the store is
/// purely advisory, so a miss must always be recoverable by recomputation.
#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    expires_at: Instant,
}

/// Upper bound on how long a `put` may block before its write is dropped
/// (§4.1: "Writes must never block the calling path beyond a small bounded
/// timeout; on timeout, drop the write").
const WRITE_TIMEOUT: Duration = Duration::from_millis(50);

/// Shared, lock-free keyed store (§5: "The Cache Store is shared;
/// serialization is internal to the store").
#[derive(Clone)]
pub struct CacheStore {
    entries: Arc<DashMap<String, CacheEntry>>,
    hits: Arc<std::sync::atomic::AtomicU64>,
    misses: Arc<std::sync::atomic::AtomicU64>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            hits: Arc::new(std::sync::atomic::AtomicU64::new(0)),
            misses: Arc::new(std::sync::atomic::AtomicU64::new(0)),
        }
    }

    /// Canonicalize a call descriptor into an opaque cache key: tool name,
    /// sorted argument pairs, and a content-affecting config version
    /// (§4.1). Using a stable hash keeps keys short and order-independent.
    pub fn canonical_key(namespace: &str, mut pairs: Vec<(String, String)>, config_version: &str) -> String {
        pairs.sort();
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(namespace.as_bytes());
        hasher.update(config_version.as_bytes());
        for (k, v) in &pairs {
            hasher.update(k.as_bytes());
            hasher.update(b"=");
            hasher.update(v.as_bytes());
            hasher.update(b"&");
        }
        format!("{}:{:x}", namespace, hasher.finalize())
    }

    /// Returns `(value, hit)`. Any internal fault (none modeled here since
    /// `DashMap` access can't fail) or expiry is treated as a miss.
    pub fn get(&self, key: &str) -> (Option<Value>, bool) {
        match self.entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                self.hits.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                (Some(entry.value.clone()), true)
            }
            Some(_) => {
                self.entries.remove(key);
                self.misses.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                (None, false)
            }
            None => {
                self.misses.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                (None, false)
            }
        }
    }

    /// Bounded-timeout write; drops silently if it can't complete in time.
    pub async fn put(&self, key: String, value: Value, ttl: Duration) {
        let entries = Arc::clone(&self.entries);
        let expires_at = Instant::now() + ttl;
        let write = async move {
            entries.insert(key, CacheEntry { value, expires_at });
        };
        let _ = timeout(WRITE_TIMEOUT, write).await;
    }

    pub fn hit_count(&self) -> u64 {
        self.hits.load(std::sync::atomic::Ordering::Relaxed)
    }

    pub fn miss_count(&self) -> u64 {
        self.misses.load(std::sync::atomic::Ordering::Relaxed)
    }

    pub fn hit_ratio(&self) -> f64 {
        let hits = self.hit_count() as f64;
        let total = hits + self.miss_count() as f64;
        if total == 0.0 {
            0.0
        } else {
            hits / total
        }
    }

    /// Drop every entry, or every entry in one category (by key prefix),
    /// for `DELETE /cache/clear[/{category}]`.
    pub fn clear(&self, category: Option<CacheCategory>) {
        match category {
            None => self.entries.clear(),
            Some(cat) => {
                let prefix = format!("{}:", cat.as_str());
                self.entries.retain(|k, _| !k.starts_with(&prefix));
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_is_a_hit() {
        let store = CacheStore::new();
        store
            .put("k".to_string(), serde_json::json!({"v": 1}), Duration::from_secs(60))
            .await;
        let (value, hit) = store.get("k");
        assert!(hit);
        assert_eq!(value.unwrap(), serde_json::json!({"v": 1}));
    }

    #[tokio::test]
    async fn expired_entry_is_a_miss() {
        let store = CacheStore::new();
        store
            .put("k".to_string(), serde_json::json!(1), Duration::from_millis(0))
            .await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        let (_, hit) = store.get("k");
        assert!(!hit);
    }

    #[test]
    fn missing_key_is_a_miss() {
        let store = CacheStore::new();
        let (value, hit) = store.get("absent");
        assert!(!hit);
        assert!(value.is_none());
    }

    #[test]
    fn canonical_key_is_order_independent() {
        let a = CacheStore::canonical_key(
            "search_regulatory_documents",
            vec![("query".to_string(), "sar".to_string()), ("k".to_string(), "5".to_string())],
            "v1",
        );
        let b = CacheStore::canonical_key(
            "search_regulatory_documents",
            vec![("k".to_string(), "5".to_string()), ("query".to_string(), "sar".to_string())],
            "v1",
        );
        assert_eq!(a, b);
    }
}

//! Cache Store (C1) behavior: TTL expiry, category-scoped clearing, and
//! the hit/miss accounting exposed on `GET /cache/stats` (§4.1, §6).

use investigator::cache::{CacheCategory, CacheStore};
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn put_then_get_within_ttl_is_a_hit() {
    let cache = CacheStore::new();
    let key = CacheStore::canonical_key(
        CacheCategory::ExchangeRates.as_str(),
        vec![("from".to_string(), "USD".to_string()), ("to".to_string(), "EUR".to_string())],
        "v1",
    );
    cache.put(key.clone(), json!({"rate": 0.92}), Duration::from_secs(60)).await;

    let (value, hit) = cache.get(&key);
    assert!(hit);
    assert_eq!(value.unwrap()["rate"], 0.92);
    assert_eq!(cache.hit_count(), 1);
}

#[tokio::test]
async fn expired_entry_reads_back_as_a_miss() {
    let cache = CacheStore::new();
    let key = CacheStore::canonical_key(CacheCategory::WebIntelligence.as_str(), vec![], "v1");
    cache.put(key.clone(), json!("stale"), Duration::from_millis(10)).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let (value, hit) = cache.get(&key);
    assert!(!hit);
    assert!(value.is_none());
    assert_eq!(cache.miss_count(), 1);
}

#[tokio::test]
async fn canonical_key_is_stable_regardless_of_argument_order() {
    let key_a = CacheStore::canonical_key(
        "search_regulatory_documents",
        vec![("max_results".to_string(), "5".to_string()), ("query".to_string(), "SAR".to_string())],
        "v1",
    );
    let key_b = CacheStore::canonical_key(
        "search_regulatory_documents",
        vec![("query".to_string(), "SAR".to_string()), ("max_results".to_string(), "5".to_string())],
        "v1",
    );
    assert_eq!(key_a, key_b);
}

#[tokio::test]
async fn canonical_key_changes_with_config_version() {
    let key_v1 = CacheStore::canonical_key("tool", vec![("x".to_string(), "1".to_string())], "v1");
    let key_v2 = CacheStore::canonical_key("tool", vec![("x".to_string(), "1".to_string())], "v2");
    assert_ne!(key_v1, key_v2);
}

#[tokio::test]
async fn clearing_one_category_leaves_others_intact() {
    let cache = CacheStore::new();
    let rate_key = CacheStore::canonical_key(CacheCategory::ExchangeRates.as_str(), vec![], "v1");
    let web_key = CacheStore::canonical_key(CacheCategory::WebIntelligence.as_str(), vec![], "v1");
    cache.put(rate_key.clone(), json!(1), Duration::from_secs(60)).await;
    cache.put(web_key.clone(), json!(2), Duration::from_secs(60)).await;

    cache.clear(Some(CacheCategory::ExchangeRates));

    assert!(!cache.get(&rate_key).1);
    assert!(cache.get(&web_key).1);
}

#[tokio::test]
async fn clearing_everything_empties_the_store() {
    let cache = CacheStore::new();
    let key = CacheStore::canonical_key(CacheCategory::LlmCompletion.as_str(), vec![], "v1");
    cache.put(key, json!("x"), Duration::from_secs(60)).await;
    assert!(!cache.is_empty());

    cache.clear(None);
    assert!(cache.is_empty());
    assert_eq!(cache.len(), 0);
}

#[tokio::test]
async fn hit_ratio_reflects_observed_hits_and_misses() {
    let cache = CacheStore::new();
    let key = CacheStore::canonical_key("t", vec![], "v1");
    cache.put(key.clone(), json!(1), Duration::from_secs(60)).await;

    cache.get(&key); // hit
    cache.get("absent-key"); // miss
    assert!((cache.hit_ratio() - 0.5).abs() < 1e-9);
}

#[test]
fn unknown_category_path_segment_does_not_parse() {
    assert!(CacheCategory::parse("not_a_real_category").is_none());
    assert_eq!(CacheCategory::parse("exchange_rates"), Some(CacheCategory::ExchangeRates));
}

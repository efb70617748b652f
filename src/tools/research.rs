//! `search_fraud_research`: HTTP GET against an academic search provider
//! (§4.3 tool table), cached under the `AcademicResearch` category (6 h,
//! §4.1). Degrades to "unavailable: <reason>" when unconfigured or on
//! definitive failure (§4.3).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Semaphore;

use crate::cache::CacheStore;
use crate::clients::common::get_shared_http_client;
use crate::tool_protocol::{ToolMetadata, ToolParameter, ToolParameterType, ToolProtocol, ToolResult};

use super::{acquire_network_permit, get_with_retry};

pub struct FraudResearchTool {
    metadata: ToolMetadata,
    base_url: Option<String>,
    api_key: Option<String>,
    http_client: reqwest::Client,
    timeout: Duration,
    ttl: Duration,
    network_pool: Option<Arc<Semaphore>>,
}

impl FraudResearchTool {
    pub fn new(base_url: Option<String>, api_key: Option<String>, timeout: Duration, ttl: Duration) -> Self {
        Self {
            metadata: ToolMetadata {
                name: "search_fraud_research".to_string(),
                description: "Search academic fraud-detection research for papers relevant to a query; returns \
                    ordered titles and abstracts."
                    .to_string(),
                parameters: vec![
                    ToolParameter {
                        name: "query".to_string(),
                        param_type: ToolParameterType::String,
                        required: true,
                        description: "search query".to_string(),
                    },
                    ToolParameter {
                        name: "max_results".to_string(),
                        param_type: ToolParameterType::Number,
                        required: false,
                        description: "maximum number of results (default 5)".to_string(),
                    },
                ],
            },
            base_url,
            api_key,
            http_client: get_shared_http_client(),
            timeout,
            ttl,
            network_pool: None,
        }
    }

    pub fn with_worker_pool(mut self, pool: Arc<Semaphore>) -> Self {
        self.network_pool = Some(pool);
        self
    }
}

#[async_trait]
impl ToolProtocol for FraudResearchTool {
    fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    async fn execute(&self, arguments: Value, cache: &CacheStore) -> ToolResult {
        let query = match arguments.get("query").and_then(Value::as_str) {
            Some(q) => q,
            None => return ToolResult::unavailable("missing query argument"),
        };
        let max_results = arguments.get("max_results").and_then(Value::as_u64).unwrap_or(5);

        let Some(base_url) = &self.base_url else {
            return ToolResult::unavailable("no academic research provider configured");
        };

        let key = CacheStore::canonical_key(
            "search_fraud_research",
            vec![
                ("query".to_string(), query.to_string()),
                ("max_results".to_string(), max_results.to_string()),
            ],
            "v1",
        );
        if let (Some(cached), true) = cache.get(&key) {
            if let Ok(text) = serde_json::from_value::<String>(cached) {
                return ToolResult::ok(text, true);
            }
        }

        let mut url = format!(
            "{}?q={}&max_results={}",
            base_url,
            urlencoding::encode(query),
            max_results
        );
        if let Some(key) = &self.api_key {
            url.push_str(&format!("&api_key={}", urlencoding::encode(key)));
        }

        let _permit = acquire_network_permit(&self.network_pool).await;
        let resp = match get_with_retry(&self.http_client, &url, self.timeout).await {
            Ok(resp) => resp,
            Err(reason) => return ToolResult::unavailable(reason),
        };

        if !resp.status().is_success() {
            return ToolResult::unavailable(format!("provider returned http {}", resp.status()));
        }

        let body: Value = match resp.json().await {
            Ok(body) => body,
            Err(e) => return ToolResult::unavailable(format!("invalid JSON response: {}", e)),
        };

        let papers = body
            .get("results")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let text = if papers.is_empty() {
            "no fraud research papers matched this query".to_string()
        } else {
            papers
                .iter()
                .take(max_results as usize)
                .map(|p| {
                    let title = p.get("title").and_then(Value::as_str).unwrap_or("(untitled)");
                    let abstract_ = p.get("abstract").and_then(Value::as_str).unwrap_or("");
                    format!("{}\n{}", title, abstract_)
                })
                .collect::<Vec<_>>()
                .join("\n\n")
        };

        cache
            .put(key, serde_json::to_value(&text).unwrap_or(Value::Null), self.ttl)
            .await;

        ToolResult::ok(text, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_provider_is_unavailable() {
        let tool = FraudResearchTool::new(None, None, Duration::from_secs(15), Duration::from_secs(3600));
        let cache = CacheStore::new();
        let result = tool
            .execute(serde_json::json!({"query": "structuring detection"}), &cache)
            .await;
        assert!(result.text.starts_with("unavailable"));
        assert!(!result.cache_hit);
    }

    #[tokio::test]
    async fn missing_query_is_unavailable() {
        let tool = FraudResearchTool::new(
            Some("https://example.invalid/search".to_string()),
            None,
            Duration::from_secs(15),
            Duration::from_secs(3600),
        );
        let cache = CacheStore::new();
        let result = tool.execute(serde_json::json!({}), &cache).await;
        assert!(result.text.starts_with("unavailable"));
    }
}

//! `search_web_intelligence`: HTTP POST against a web-search provider
//! (§4.3 tool table), cached under the `WebIntelligence` category (30 min,
//! §4.1). This is the tool exercised by acceptance scenario S4 (provider
//! outage): a 503 from every call must still let the owning agent
//! complete.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Semaphore;

use crate::cache::CacheStore;
use crate::clients::common::get_shared_http_client;
use crate::tool_protocol::{ToolMetadata, ToolParameter, ToolParameterType, ToolProtocol, ToolResult};

use super::{acquire_network_permit, post_json_with_retry};

pub struct WebIntelligenceTool {
    metadata: ToolMetadata,
    base_url: Option<String>,
    api_key: Option<String>,
    http_client: reqwest::Client,
    timeout: Duration,
    ttl: Duration,
    network_pool: Option<Arc<Semaphore>>,
}

impl WebIntelligenceTool {
    pub fn new(base_url: Option<String>, api_key: Option<String>, timeout: Duration, ttl: Duration) -> Self {
        Self {
            metadata: ToolMetadata {
                name: "search_web_intelligence".to_string(),
                description: "Search the web for intelligence corroborating a transaction's risk profile; \
                    returns a textual summary of the top hits."
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
impl ToolProtocol for WebIntelligenceTool {
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
            return ToolResult::unavailable("no web intelligence provider configured");
        };

        let key = CacheStore::canonical_key(
            "search_web_intelligence",
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

        let mut body = serde_json::json!({"query": query, "max_results": max_results});
        if let Some(api_key) = &self.api_key {
            body["api_key"] = Value::String(api_key.clone());
        }

        let _permit = acquire_network_permit(&self.network_pool).await;
        let resp = match post_json_with_retry(&self.http_client, base_url, &body, self.timeout).await {
            Ok(resp) => resp,
            Err(reason) => return ToolResult::unavailable(reason),
        };

        if !resp.status().is_success() {
            return ToolResult::unavailable(format!("provider returned http {}", resp.status()));
        }

        let parsed: Value = match resp.json().await {
            Ok(parsed) => parsed,
            Err(e) => return ToolResult::unavailable(format!("invalid JSON response: {}", e)),
        };

        let hits = parsed.get("results").and_then(Value::as_array).cloned().unwrap_or_default();
        let text = if hits.is_empty() {
            "no web intelligence results matched this query".to_string()
        } else {
            hits.iter()
                .take(max_results as usize)
                .map(|h| {
                    let title = h.get("title").and_then(Value::as_str).unwrap_or("(untitled)");
                    let snippet = h.get("snippet").and_then(Value::as_str).unwrap_or("");
                    format!("{}: {}", title, snippet)
                })
                .collect::<Vec<_>>()
                .join("\n")
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
    async fn unconfigured_provider_is_unavailable_not_an_error() {
        let tool = WebIntelligenceTool::new(None, None, Duration::from_secs(15), Duration::from_secs(1800));
        let cache = CacheStore::new();
        let result = tool
            .execute(serde_json::json!({"query": "offshore shell company"}), &cache)
            .await;
        assert_eq!(result.text, "unavailable: no web intelligence provider configured");
    }
}

//! `get_exchange_rate_data`: HTTP GET against a currency exchange-rate
//! provider (§4.3 tool table), cached under the `ExchangeRates` category
//! (30 min, §4.1).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Semaphore;

use crate::cache::CacheStore;
use crate::clients::common::get_shared_http_client;
use crate::tool_protocol::{ToolMetadata, ToolParameter, ToolParameterType, ToolProtocol, ToolResult};

use super::{acquire_network_permit, get_with_retry};

pub struct ExchangeRateTool {
    metadata: ToolMetadata,
    base_url: Option<String>,
    api_key: Option<String>,
    http_client: reqwest::Client,
    timeout: Duration,
    ttl: Duration,
    network_pool: Option<Arc<Semaphore>>,
}

impl ExchangeRateTool {
    pub fn new(base_url: Option<String>, api_key: Option<String>, timeout: Duration, ttl: Duration) -> Self {
        Self {
            metadata: ToolMetadata {
                name: "get_exchange_rate_data".to_string(),
                description: "Look up the exchange rate between two currencies, including the 30-day \
                    volatility where the provider exposes it."
                    .to_string(),
                parameters: vec![
                    ToolParameter {
                        name: "from_currency".to_string(),
                        param_type: ToolParameterType::String,
                        required: true,
                        description: "ISO 4217 base currency code, e.g. USD".to_string(),
                    },
                    ToolParameter {
                        name: "to_currency".to_string(),
                        param_type: ToolParameterType::String,
                        required: true,
                        description: "ISO 4217 quote currency code, e.g. EUR".to_string(),
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
impl ToolProtocol for ExchangeRateTool {
    fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    async fn execute(&self, arguments: Value, cache: &CacheStore) -> ToolResult {
        let base = match arguments.get("from_currency").and_then(Value::as_str) {
            Some(b) => b.to_uppercase(),
            None => return ToolResult::unavailable("missing from_currency argument"),
        };
        let quote = match arguments.get("to_currency").and_then(Value::as_str) {
            Some(q) => q.to_uppercase(),
            None => return ToolResult::unavailable("missing to_currency argument"),
        };

        let Some(base_url) = &self.base_url else {
            return ToolResult::unavailable("no exchange rate provider configured");
        };
        let Some(api_key) = &self.api_key else {
            return ToolResult::unavailable("no credentials for exchange rate provider");
        };

        let key = CacheStore::canonical_key(
            "get_exchange_rate_data",
            vec![("base".to_string(), base.clone()), ("quote".to_string(), quote.clone())],
            "v1",
        );
        if let (Some(cached), true) = cache.get(&key) {
            if let Ok(text) = serde_json::from_value::<String>(cached) {
                return ToolResult::ok(text, true);
            }
        }

        let url = format!(
            "{}?base={}&quote={}&api_key={}",
            base_url,
            urlencoding::encode(&base),
            urlencoding::encode(&quote),
            urlencoding::encode(api_key),
        );

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

        let rate = match body.get("rate").and_then(Value::as_f64) {
            Some(r) => r,
            None => return ToolResult::unavailable("provider response missing rate field"),
        };
        let volatility = body.get("volatility_30d").and_then(Value::as_f64);

        let text = match volatility {
            Some(v) => format!("1 {} = {:.6} {} (30d volatility: {:.4})", base, rate, quote, v),
            None => format!("1 {} = {:.6} {}", base, rate, quote),
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
    async fn missing_credentials_is_unavailable() {
        let tool = ExchangeRateTool::new(
            Some("https://example.invalid/rate".to_string()),
            None,
            Duration::from_secs(15),
            Duration::from_secs(1800),
        );
        let cache = CacheStore::new();
        let result = tool
            .execute(serde_json::json!({"from_currency": "usd", "to_currency": "eur"}), &cache)
            .await;
        assert_eq!(result.text, "unavailable: no credentials for exchange rate provider");
    }

    #[tokio::test]
    async fn missing_provider_is_unavailable() {
        let tool = ExchangeRateTool::new(None, None, Duration::from_secs(15), Duration::from_secs(1800));
        let cache = CacheStore::new();
        let result = tool
            .execute(serde_json::json!({"from_currency": "USD", "to_currency": "EUR"}), &cache)
            .await;
        assert_eq!(result.text, "unavailable: no exchange rate provider configured");
    }

    #[tokio::test]
    async fn missing_currency_argument_is_unavailable() {
        let tool = ExchangeRateTool::new(None, None, Duration::from_secs(15), Duration::from_secs(1800));
        let cache = CacheStore::new();
        let result = tool.execute(serde_json::json!({"from_currency": "USD"}), &cache).await;
        assert_eq!(result.text, "unavailable: missing to_currency argument");
    }
}

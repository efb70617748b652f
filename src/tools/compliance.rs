//! `check_compliance_requirements`: a pure, table-driven evaluation of
//! which regulatory filings a transaction triggers (§4.3 tool table),
//! driven entirely by [`crate::config::ComplianceConfig`] rather than a
//! hard-coded rule set (§9 Open Question). Never cached, same reasoning
//! as [`super::risk::TransactionRiskTool`].

use async_trait::async_trait;
use serde_json::Value;

use crate::cache::CacheStore;
use crate::config::ComplianceConfig;
use crate::tool_protocol::{ToolMetadata, ToolParameter, ToolParameterType, ToolProtocol, ToolResult};

pub struct ComplianceTool {
    metadata: ToolMetadata,
    config: ComplianceConfig,
}

impl ComplianceTool {
    pub fn new(config: ComplianceConfig) -> Self {
        Self {
            metadata: ToolMetadata {
                name: "check_compliance_requirements".to_string(),
                description: "Determine which regulatory filings (CTR, SAR, ...) a transaction triggers \
                    given its amount, currency, destination country, and description, with filing \
                    deadlines and statutory citations."
                    .to_string(),
                parameters: vec![
                    ToolParameter {
                        name: "amount".to_string(),
                        param_type: ToolParameterType::Number,
                        required: true,
                        description: "transaction amount in USD-equivalent".to_string(),
                    },
                    ToolParameter {
                        name: "currency".to_string(),
                        param_type: ToolParameterType::String,
                        required: true,
                        description: "ISO 4217 currency code, e.g. USD".to_string(),
                    },
                    ToolParameter {
                        name: "country_to".to_string(),
                        param_type: ToolParameterType::String,
                        required: true,
                        description: "destination country name or ISO code".to_string(),
                    },
                    ToolParameter {
                        name: "description".to_string(),
                        param_type: ToolParameterType::String,
                        required: false,
                        description: "free-text transaction description, scanned for trigger keywords"
                            .to_string(),
                    },
                ],
            },
            config,
        }
    }
}

#[async_trait]
impl ToolProtocol for ComplianceTool {
    fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    async fn execute(&self, arguments: Value, _cache: &CacheStore) -> ToolResult {
        let amount = match arguments.get("amount").and_then(Value::as_f64) {
            Some(a) if a.is_finite() && a >= 0.0 => a,
            _ => return ToolResult::unavailable("missing or invalid amount argument"),
        };
        let currency = match arguments.get("currency").and_then(Value::as_str) {
            Some(c) => c.to_uppercase(),
            None => return ToolResult::unavailable("missing currency argument"),
        };
        let country_to = match arguments.get("country_to").and_then(Value::as_str) {
            Some(c) => c,
            None => return ToolResult::unavailable("missing country_to argument"),
        };
        let description = arguments
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_lowercase();

        let triggered: Vec<&crate::config::ComplianceRule> = self
            .config
            .rules
            .iter()
            .filter(|rule| {
                let over_threshold = amount >= rule.threshold;
                let keyword_hit = !rule.description_keywords.is_empty()
                    && rule
                        .description_keywords
                        .iter()
                        .any(|kw| description.contains(&kw.to_lowercase()));
                let jurisdiction_hit = rule
                    .high_risk_jurisdictions
                    .iter()
                    .any(|j| j.eq_ignore_ascii_case(country_to));
                over_threshold || keyword_hit || jurisdiction_hit
            })
            .collect();

        let text = if triggered.is_empty() {
            format!("no filing required for amount {:.2} {} to {}", amount, currency, country_to)
        } else {
            triggered
                .iter()
                .map(|rule| {
                    format!(
                        "{} filing required (threshold {:.2} {}, due within {} days): {}",
                        rule.filing_type, rule.threshold, currency, rule.deadline_days, rule.citation,
                    )
                })
                .collect::<Vec<_>>()
                .join("\n")
        };

        ToolResult::ok(text, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool() -> ComplianceTool {
        ComplianceTool::new(ComplianceConfig::default())
    }

    #[tokio::test]
    async fn amount_above_ctr_threshold_triggers_ctr() {
        let cache = CacheStore::new();
        let result = tool()
            .execute(
                serde_json::json!({
                    "amount": 12_000.0,
                    "currency": "USD",
                    "country_to": "US",
                    "description": "consulting fee",
                }),
                &cache,
            )
            .await;
        assert!(result.text.contains("CTR filing required"));
        assert!(!result.text.contains("SAR"));
    }

    #[tokio::test]
    async fn structuring_keyword_triggers_sar_below_ctr_threshold() {
        let cache = CacheStore::new();
        let result = tool()
            .execute(
                serde_json::json!({
                    "amount": 6_000.0,
                    "currency": "USD",
                    "country_to": "US",
                    "description": "series of structuring deposits",
                }),
                &cache,
            )
            .await;
        assert!(result.text.contains("SAR filing required"));
        assert!(!result.text.contains("CTR"));
    }

    #[tokio::test]
    async fn high_risk_jurisdiction_triggers_sar_regardless_of_amount() {
        let cache = CacheStore::new();
        let result = tool()
            .execute(
                serde_json::json!({
                    "amount": 50.0,
                    "currency": "USD",
                    "country_to": "Panama",
                    "description": "small transfer",
                }),
                &cache,
            )
            .await;
        assert!(result.text.contains("SAR filing required"));
    }

    #[tokio::test]
    async fn small_plain_transaction_requires_no_filing() {
        let cache = CacheStore::new();
        let result = tool()
            .execute(
                serde_json::json!({
                    "amount": 50.0,
                    "currency": "USD",
                    "country_to": "US",
                    "description": "groceries",
                }),
                &cache,
            )
            .await;
        assert!(result.text.starts_with("no filing required"));
    }

    #[tokio::test]
    async fn missing_country_to_is_unavailable() {
        let cache = CacheStore::new();
        let result = tool()
            .execute(serde_json::json!({"amount": 50.0, "currency": "USD"}), &cache)
            .await;
        assert!(result.text.starts_with("unavailable"));
    }
}

//! `calculate_transaction_risk`: a pure, deterministic blended risk score
//! over four independently-normalized [0,1] sub-scores (§4.3 tool table,
//! §9 Open Question). Never cached — the inputs are already in hand on
//! every call and recomputation is cheaper than a hash+lookup (§4.3:
//! "Unchanged ... two pure deterministic calculators").

use async_trait::async_trait;
use serde_json::Value;

use crate::cache::CacheStore;
use crate::config::RiskCoefficients;
use crate::tool_protocol::{ToolMetadata, ToolParameter, ToolParameterType, ToolProtocol, ToolResult};

pub struct TransactionRiskTool {
    metadata: ToolMetadata,
    coefficients: RiskCoefficients,
}

impl TransactionRiskTool {
    pub fn new(coefficients: RiskCoefficients) -> Self {
        Self {
            metadata: ToolMetadata {
                name: "calculate_transaction_risk".to_string(),
                description: "Compute a blended [0,1] fraud risk score from transaction amount, \
                    destination jurisdiction, customer risk rating, and account type."
                    .to_string(),
                parameters: vec![
                    ToolParameter {
                        name: "amount".to_string(),
                        param_type: ToolParameterType::Number,
                        required: true,
                        description: "transaction amount in USD-equivalent".to_string(),
                    },
                    ToolParameter {
                        name: "country_to".to_string(),
                        param_type: ToolParameterType::String,
                        required: true,
                        description: "destination country name or ISO code".to_string(),
                    },
                    ToolParameter {
                        name: "customer_risk".to_string(),
                        param_type: ToolParameterType::String,
                        required: true,
                        description: "one of low, medium, high, critical".to_string(),
                    },
                    ToolParameter {
                        name: "account_type".to_string(),
                        param_type: ToolParameterType::String,
                        required: true,
                        description: "account type, e.g. personal, business, corporate".to_string(),
                    },
                ],
            },
            coefficients,
        }
    }

    fn amount_subscore(&self, amount: f64) -> f64 {
        (amount.max(0.0) / self.coefficients.amount_saturation).min(1.0)
    }

    fn jurisdiction_subscore(&self, country: &str) -> f64 {
        self.coefficients
            .jurisdiction_risk
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(country))
            .map(|(_, score)| *score)
            .unwrap_or(self.coefficients.default_jurisdiction_risk)
    }

    fn customer_risk_subscore(rating: &str) -> Option<f64> {
        match rating.to_lowercase().as_str() {
            "low" => Some(0.1),
            "medium" => Some(0.4),
            "high" => Some(0.75),
            "critical" => Some(1.0),
            _ => None,
        }
    }

    fn account_type_subscore(account_type: &str) -> Option<f64> {
        match account_type.to_lowercase().replace(['_', '-'], "").as_str() {
            "personal" => Some(0.1),
            "business" => Some(0.3),
            "corporate" => Some(0.35),
            "nonprofit" => Some(0.4),
            "professionalservices" => Some(0.45),
            "gamingentertainment" => Some(0.8),
            "investment" => Some(0.5),
            "government" => Some(0.15),
            _ => None,
        }
    }
}

#[async_trait]
impl ToolProtocol for TransactionRiskTool {
    fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    async fn execute(&self, arguments: Value, _cache: &CacheStore) -> ToolResult {
        let amount = match arguments.get("amount").and_then(Value::as_f64) {
            Some(a) if a.is_finite() && a >= 0.0 => a,
            _ => return ToolResult::unavailable("missing or invalid amount argument"),
        };
        let country_to = match arguments.get("country_to").and_then(Value::as_str) {
            Some(c) => c,
            None => return ToolResult::unavailable("missing country_to argument"),
        };
        let customer_risk = match arguments.get("customer_risk").and_then(Value::as_str) {
            Some(r) => r,
            None => return ToolResult::unavailable("missing customer_risk argument"),
        };
        let account_type = match arguments.get("account_type").and_then(Value::as_str) {
            Some(t) => t,
            None => return ToolResult::unavailable("missing account_type argument"),
        };

        let Some(customer_sub) = Self::customer_risk_subscore(customer_risk) else {
            return ToolResult::unavailable(format!("unrecognized customer_risk: {}", customer_risk));
        };
        let Some(account_sub) = Self::account_type_subscore(account_type) else {
            return ToolResult::unavailable(format!("unrecognized account_type: {}", account_type));
        };

        let amount_sub = self.amount_subscore(amount);
        let jurisdiction_sub = self.jurisdiction_subscore(country_to);

        let score = self.coefficients.amount_weight * amount_sub
            + self.coefficients.jurisdiction_weight * jurisdiction_sub
            + self.coefficients.customer_risk_weight * customer_sub
            + self.coefficients.account_type_weight * account_sub;

        let text = format!(
            "risk_score={:.4} (amount={:.3}*{:.2} jurisdiction={:.3}*{:.2} customer_risk={:.3}*{:.2} account_type={:.3}*{:.2})",
            score,
            amount_sub,
            self.coefficients.amount_weight,
            jurisdiction_sub,
            self.coefficients.jurisdiction_weight,
            customer_sub,
            self.coefficients.customer_risk_weight,
            account_sub,
            self.coefficients.account_type_weight,
        );

        ToolResult::ok(text, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool() -> TransactionRiskTool {
        TransactionRiskTool::new(RiskCoefficients::default())
    }

    #[tokio::test]
    async fn high_risk_jurisdiction_and_amount_scores_above_half() {
        let cache = CacheStore::new();
        let result = tool()
            .execute(
                serde_json::json!({
                    "amount": 150_000.0,
                    "country_to": "Panama",
                    "customer_risk": "high",
                    "account_type": "gaming_entertainment",
                }),
                &cache,
            )
            .await;
        assert!(!result.text.starts_with("unavailable"));
        let score: f64 = result.text
            .strip_prefix("risk_score=")
            .and_then(|s| s.split_whitespace().next())
            .and_then(|s| s.parse().ok())
            .expect("score prefix present");
        assert!(score > 0.5, "expected high risk score, got {}", score);
    }

    #[tokio::test]
    async fn low_risk_domestic_transaction_scores_low() {
        let cache = CacheStore::new();
        let result = tool()
            .execute(
                serde_json::json!({
                    "amount": 200.0,
                    "country_to": "US",
                    "customer_risk": "low",
                    "account_type": "personal",
                }),
                &cache,
            )
            .await;
        let score: f64 = result.text
            .strip_prefix("risk_score=")
            .and_then(|s| s.split_whitespace().next())
            .and_then(|s| s.parse().ok())
            .expect("score prefix present");
        assert!(score < 0.2, "expected low risk score, got {}", score);
    }

    #[tokio::test]
    async fn unrecognized_rating_is_unavailable() {
        let cache = CacheStore::new();
        let result = tool()
            .execute(
                serde_json::json!({
                    "amount": 1.0,
                    "country_to": "US",
                    "customer_risk": "extreme",
                    "account_type": "personal",
                }),
                &cache,
            )
            .await;
        assert!(result.text.starts_with("unavailable"));
    }
}

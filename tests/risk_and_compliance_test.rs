//! End-to-end checks for the two pure calculators against the concrete
//! transaction scenarios in the specification's acceptance-test seeds
//! (structured deposit, shell-company-to-offshore, benign low-value).

use investigator::cache::CacheStore;
use investigator::config::{ComplianceConfig, RiskCoefficients};
use investigator::tool_protocol::ToolProtocol;
use investigator::tools::{ComplianceTool, TransactionRiskTool};
use serde_json::json;

fn risk_tool() -> TransactionRiskTool {
    TransactionRiskTool::new(RiskCoefficients::default())
}

fn compliance_tool() -> ComplianceTool {
    ComplianceTool::new(ComplianceConfig::default())
}

#[tokio::test]
async fn structured_deposit_just_under_ctr_still_triggers_a_filing() {
    let cache = CacheStore::new();
    let result = risk_tool()
        .execute(
            json!({
                "amount": 9500.0,
                "country_to": "US",
                "customer_risk": "low",
                "account_type": "business",
            }),
            &cache,
        )
        .await;

    assert!(!result.text.starts_with("unavailable"));

    // $9,500 sits $500 below the $10,000 CTR line but above the $5,000 SAR
    // line, so the table-driven rule set still surfaces a required filing
    // even though the structuring-specific CTR threshold isn't crossed.
    let compliance = compliance_tool()
        .execute(
            json!({
                "amount": 9500.0,
                "currency": "USD",
                "country_to": "US",
                "description": "Business cash deposit",
            }),
            &cache,
        )
        .await;
    assert!(
        compliance.text.contains("SAR filing required"),
        "expected a SAR filing near the CTR threshold, got: {}",
        compliance.text
    );
}

#[tokio::test]
async fn shell_company_offshore_transfer_triggers_sar_and_high_risk() {
    let cache = CacheStore::new();
    let result = risk_tool()
        .execute(
            json!({
                "amount": 85000.0,
                "country_to": "British Virgin Islands",
                "customer_risk": "high",
                "account_type": "business",
            }),
            &cache,
        )
        .await;

    let score: f64 = result
        .text
        .strip_prefix("risk_score=")
        .and_then(|s| s.split_whitespace().next())
        .and_then(|s| s.parse().ok())
        .expect("score prefix present");
    assert!(score >= 0.75, "expected risk score >= 0.75, parsed {} from: {}", score, result.text);

    let compliance = compliance_tool()
        .execute(
            json!({
                "amount": 85000.0,
                "currency": "USD",
                "country_to": "British Virgin Islands",
                "description": "Equipment purchase via offshore supplier",
            }),
            &cache,
        )
        .await;
    assert!(
        compliance.text.contains("SAR"),
        "expected a SAR filing requirement, got: {}",
        compliance.text
    );
    assert!(compliance.text.contains("30"), "expected the 30-day SAR deadline, got: {}", compliance.text);
}

#[tokio::test]
async fn benign_low_value_reimbursement_requires_no_filings() {
    let cache = CacheStore::new();
    let compliance = compliance_tool()
        .execute(
            json!({
                "amount": 1200.0,
                "currency": "USD",
                "country_to": "US",
                "description": "Office supplies reimbursement",
            }),
            &cache,
        )
        .await;
    assert!(
        compliance.text.to_lowercase().contains("no filing") || compliance.text.to_lowercase().contains("none required"),
        "expected no required filings for a benign low-value transaction, got: {}",
        compliance.text
    );
}

#[tokio::test]
async fn risk_tool_rejects_missing_required_argument() {
    let cache = CacheStore::new();
    let result = risk_tool().execute(json!({"amount": 100.0}), &cache).await;
    assert!(result.text.starts_with("unavailable"));
}

#[tokio::test]
async fn risk_and_compliance_are_never_marked_as_cache_hits() {
    let cache = CacheStore::new();
    let args = json!({
        "amount": 500.0,
        "country_to": "US",
        "customer_risk": "low",
        "account_type": "personal",
    });
    let first = risk_tool().execute(args.clone(), &cache).await;
    let second = risk_tool().execute(args, &cache).await;
    assert!(!first.cache_hit);
    assert!(!second.cache_hit);
}

//! Configuration for the investigator crate.
//!
//! Provides [`InvestigatorConfig`], constructed programmatically by the
//! embedding application — no TOML/YAML/env-file parsing dependency is
//! introduced, matching the "users construct this manually" design of
//! the crate this one is descended from. Every knob enumerated in the
//! external-interfaces configuration list, every per-category TTL, every
//! timeout default, and the two Open-Question coefficient tables all live
//! here so nothing is hard-coded deep in the call graph.

use std::collections::HashMap;
use std::time::Duration;

/// How the Vector Store should route a query (§4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalMethod {
    /// Run BM25; fall back to dense only on zero hits or error.
    Auto,
    /// Force lexical BM25 only.
    Bm25Only,
    /// Force dense cosine-similarity only.
    DenseOnly,
}

/// Resolution of the "cache replay on resubmission" Open Question (§9):
/// whether a cache-hit investigation replays a condensed event stream or
/// jumps straight to `Final`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheReplayMode {
    /// Emit one `Progress(100, "replayed from cache")` then `Final`.
    CondensedReplay,
    /// Emit only `Final`.
    SkipToFinal,
}

/// Per-category cache TTLs (§4.1).
#[derive(Debug, Clone)]
pub struct CacheTtlConfig {
    pub investigation_result: Duration,
    pub llm_completion: Duration,
    pub vector_search: Duration,
    pub web_intelligence: Duration,
    pub academic_research: Duration,
    pub exchange_rates: Duration,
}

impl Default for CacheTtlConfig {
    fn default() -> Self {
        Self {
            investigation_result: Duration::from_secs(24 * 3600),
            llm_completion: Duration::from_secs(6 * 3600),
            vector_search: Duration::from_secs(3600),
            web_intelligence: Duration::from_secs(30 * 60),
            academic_research: Duration::from_secs(6 * 3600),
            exchange_rates: Duration::from_secs(30 * 60),
        }
    }
}

/// Per-operation timeout defaults (§5).
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    pub llm_call: Duration,
    pub network_tool_call: Duration,
    pub vector_search: Duration,
    pub agent_total: Duration,
    pub investigation_total: Duration,
    /// Deadline for the CollectingAnalysis phase (D1, §4.6).
    pub analysis_deadline: Duration,
    /// Deadline for the Reporting phase (D2, §4.6).
    pub reporting_deadline: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            llm_call: Duration::from_secs(60),
            network_tool_call: Duration::from_secs(15),
            vector_search: Duration::from_secs(2),
            agent_total: Duration::from_secs(75),
            investigation_total: Duration::from_secs(180),
            analysis_deadline: Duration::from_secs(120),
            reporting_deadline: Duration::from_secs(90),
        }
    }
}

/// Bounded worker pool sizes (§5).
#[derive(Debug, Clone, Copy)]
pub struct WorkerPoolConfig {
    pub max_concurrent_llm_calls: usize,
    pub max_concurrent_network_tool_calls: usize,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            max_concurrent_llm_calls: 32,
            max_concurrent_network_tool_calls: 64,
        }
    }
}

/// Coefficients for `calculate_transaction_risk` (§9 Open Question: "the
/// source documents contributions from {amount, jurisdiction,
/// customer_risk_rating, account_type} but does not pin coefficients").
///
/// Weights are applied to four independently-normalized [0,1] sub-scores
/// and must sum to 1.0 so the blended score stays in [0,1].
#[derive(Debug, Clone)]
pub struct RiskCoefficients {
    pub amount_weight: f64,
    pub jurisdiction_weight: f64,
    pub customer_risk_weight: f64,
    pub account_type_weight: f64,
    /// Amount (in USD-equivalent) at which the amount sub-score saturates to 1.0.
    pub amount_saturation: f64,
    /// Per-country jurisdiction risk sub-score, looked up case-insensitively.
    /// Countries absent from this table score `default_jurisdiction_risk`.
    pub jurisdiction_risk: HashMap<String, f64>,
    pub default_jurisdiction_risk: f64,
}

impl Default for RiskCoefficients {
    fn default() -> Self {
        let mut jurisdiction_risk = HashMap::new();
        // FATF-style high-risk / monitored jurisdictions score higher;
        // this is a configuration table per the Open Question, not a
        // hard-coded model — callers are expected to override it.
        for country in [
            "British Virgin Islands",
            "Cayman Islands",
            "Panama",
            "Myanmar",
            "Iran",
            "North Korea",
        ] {
            jurisdiction_risk.insert(country.to_string(), 0.9);
        }
        for country in ["United States", "US", "Canada", "United Kingdom", "UK"] {
            jurisdiction_risk.insert(country.to_string(), 0.1);
        }

        Self {
            amount_weight: 0.35,
            jurisdiction_weight: 0.25,
            customer_risk_weight: 0.3,
            account_type_weight: 0.1,
            amount_saturation: 100_000.0,
            jurisdiction_risk,
            default_jurisdiction_risk: 0.5,
        }
    }
}

/// A single regulatory filing threshold row for `check_compliance_requirements`.
#[derive(Debug, Clone)]
pub struct ComplianceRule {
    pub filing_type: String,
    pub threshold: f64,
    pub deadline_days: u32,
    pub citation: String,
    /// Keywords in the transaction description that, combined with the
    /// threshold, make this filing required (empty = threshold alone decides).
    pub description_keywords: Vec<String>,
    /// Destination countries that trigger this filing regardless of amount
    /// or description (empty = jurisdiction alone never decides).
    pub high_risk_jurisdictions: Vec<String>,
}

/// Table-driven regulatory thresholds (§9: "Specify a table in configuration
/// rather than hard-coding").
#[derive(Debug, Clone)]
pub struct ComplianceConfig {
    pub rules: Vec<ComplianceRule>,
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            rules: vec![
                ComplianceRule {
                    filing_type: "CTR".to_string(),
                    threshold: 10_000.0,
                    deadline_days: 15,
                    citation: "31 U.S.C. 5313; 31 CFR 1010.311".to_string(),
                    description_keywords: vec![],
                    high_risk_jurisdictions: vec![],
                },
                ComplianceRule {
                    filing_type: "SAR".to_string(),
                    threshold: 5_000.0,
                    deadline_days: 30,
                    citation: "31 U.S.C. 5318(g); 31 CFR 1020.320".to_string(),
                    description_keywords: vec![
                        "offshore".to_string(),
                        "shell".to_string(),
                        "structuring".to_string(),
                    ],
                    // Same FATF-style high-risk jurisdiction set as
                    // `RiskCoefficients`' default: a transaction routed
                    // there warrants a SAR on its own.
                    high_risk_jurisdictions: vec![
                        "British Virgin Islands".to_string(),
                        "Cayman Islands".to_string(),
                        "Panama".to_string(),
                        "Myanmar".to_string(),
                        "Iran".to_string(),
                        "North Korea".to_string(),
                    ],
                },
            ],
        }
    }
}

/// External HTTP collaborators the Tool Registry's network tools bind to
/// (§6 Egress: web search provider, academic search provider, exchange
/// rate provider; plus the vector backend and tracing endpoint bindings
/// enumerated in the configuration list). Every field is optional — a
/// missing key degrades its tool to "unavailable" rather than failing the
/// crate to construct (§6: "Missing optional keys degrade the associated
/// tool to unavailable").
#[derive(Debug, Clone, Default)]
pub struct ExternalProvidersConfig {
    pub web_search_url: Option<String>,
    pub web_search_api_key: Option<String>,
    pub academic_search_url: Option<String>,
    pub academic_search_api_key: Option<String>,
    pub exchange_rate_url: Option<String>,
    pub exchange_rate_api_key: Option<String>,
    /// Out of scope per §1 (the core only binds the client); kept here so
    /// an embedder can point at a real collection without touching code.
    pub vector_backend_url: Option<String>,
    pub vector_collection_name: Option<String>,
    pub tracing_endpoint: Option<String>,
}

/// Top-level configuration bundle, constructed once and passed to the
/// [`Orchestrator`](crate::orchestrator::Orchestrator) at construction — no
/// process-wide mutable state (§9 Design Notes: "hold as an explicit
/// dependency bundle").
#[derive(Debug, Clone)]
pub struct InvestigatorConfig {
    pub llm_model: String,
    pub llm_max_tokens: usize,
    pub llm_max_iterations: usize,
    pub embedding_model: String,
    pub retrieval_method: RetrievalMethod,
    pub bm25_enabled: bool,
    pub cache_enabled: bool,
    pub providers: ExternalProvidersConfig,
    pub cache_replay_mode: CacheReplayMode,
    /// Whether the Report agent sees raw agent errors or only a sanitized
    /// "agent X failed: <reason>" summary (§9 Open Question).
    pub expose_raw_errors: bool,
    pub cache_ttls: CacheTtlConfig,
    pub timeouts: TimeoutConfig,
    pub worker_pools: WorkerPoolConfig,
    pub risk_coefficients: RiskCoefficients,
    pub compliance: ComplianceConfig,
    /// Bounded buffer capacity of the Progress Bus (§4.7, default 256).
    pub progress_bus_buffer_capacity: usize,
    /// Bounded subscriber queue depth before a slow consumer is disconnected
    /// (§4.7, default 64).
    pub progress_bus_subscriber_queue_depth: usize,
}

impl Default for InvestigatorConfig {
    fn default() -> Self {
        Self {
            llm_model: "gpt-4.1-mini".to_string(),
            llm_max_tokens: 4096,
            llm_max_iterations: 6,
            embedding_model: "text-embedding-3-large".to_string(),
            retrieval_method: RetrievalMethod::Auto,
            bm25_enabled: true,
            cache_enabled: true,
            providers: ExternalProvidersConfig::default(),
            cache_replay_mode: CacheReplayMode::SkipToFinal,
            expose_raw_errors: false,
            cache_ttls: CacheTtlConfig::default(),
            timeouts: TimeoutConfig::default(),
            worker_pools: WorkerPoolConfig::default(),
            risk_coefficients: RiskCoefficients::default(),
            compliance: ComplianceConfig::default(),
            progress_bus_buffer_capacity: 256,
            progress_bus_subscriber_queue_depth: 64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_weights_sum_to_one() {
        let c = RiskCoefficients::default();
        let sum = c.amount_weight
            + c.jurisdiction_weight
            + c.customer_risk_weight
            + c.account_type_weight;
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn default_config_matches_spec_timeouts() {
        let t = TimeoutConfig::default();
        assert_eq!(t.llm_call, Duration::from_secs(60));
        assert_eq!(t.investigation_total, Duration::from_secs(180));
    }
}

//! Core domain types shared by every component: the Transaction Input an
//! investigation is opened against, the Investigation aggregate itself,
//! and the record types each agent/tool produces along the way.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;

/// Account type enumerated on a [`TransactionInput`] (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Personal,
    Business,
    Corporate,
    Nonprofit,
    ProfessionalServices,
    GamingEntertainment,
    Investment,
    Government,
}

/// Customer risk rating enumerated on a [`TransactionInput`] (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskRating {
    Low,
    Medium,
    High,
    Critical,
}

/// The externally supplied record an investigation is opened against.
/// Immutable once accepted — nothing in this crate mutates a
/// `TransactionInput` after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionInput {
    /// Non-negative transaction amount, in `currency` units.
    pub amount: f64,
    /// ISO 4217 currency code, e.g. "USD".
    pub currency: String,
    /// Free text, bounded length (validated at the ingress boundary).
    pub description: String,
    pub customer_name: String,
    pub account_type: AccountType,
    pub risk_rating: RiskRating,
    /// Free-text country name or ISO code.
    pub country_to: String,
}

impl TransactionInput {
    /// Maximum accepted `description` length in bytes (§7 Input error kind).
    pub const MAX_DESCRIPTION_LEN: usize = 4096;

    /// Schema/bounds validation performed at the ingress boundary (§7: an
    /// Input error must surface immediately and the investigation must
    /// never enter `Running`).
    pub fn validate(&self) -> Result<(), String> {
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err("amount must be a non-negative finite number".to_string());
        }
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err("currency must be a 3-letter ISO 4217 code".to_string());
        }
        if self.description.len() > Self::MAX_DESCRIPTION_LEN {
            return Err(format!(
                "description exceeds {} bytes",
                Self::MAX_DESCRIPTION_LEN
            ));
        }
        if self.customer_name.trim().is_empty() {
            return Err("customer_name must not be empty".to_string());
        }
        if self.country_to.trim().is_empty() {
            return Err("country_to must not be empty".to_string());
        }
        Ok(())
    }
}

/// A single tool invocation recorded against an [`AgentResult`], in call order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub tool_name: String,
    /// Semantic JSON arguments as sent to the tool.
    pub arguments: serde_json::Value,
    pub result_text: String,
    pub latency_ms: u64,
    pub cache_hit: bool,
    pub error: Option<String>,
}

/// Output of one Agent Runtime execution. Produced by the runtime and
/// immutable once it returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResult {
    pub name: String,
    /// The agent's final message content; empty if it errored before concluding.
    pub text: String,
    pub tool_calls: Vec<ToolInvocation>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub error: Option<AgentError>,
}

/// A non-fatal error recorded on an [`AgentResult`] (§4.5 failure semantics,
/// §7 propagation policy). Distinct from [`crate::error::InvestigationError`],
/// which aborts the whole investigation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentError {
    pub kind: ErrorKind,
    pub message: String,
}

impl AgentResult {
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

/// Source/content metadata carried on a [`DocumentChunk`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub filename: String,
    pub content_category: String,
    pub jurisdiction: Option<String>,
    pub source_agency: Option<String>,
}

/// A single indexed unit in the Vector Store. Populated out-of-band by a
/// document ingestion collaborator (out of scope per §1) and otherwise
/// read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
    /// Dense embedding, fixed dimension across the corpus (§4.2). `None`
    /// for chunks indexed BM25-only (dense search then skips them).
    pub embedding: Option<Vec<f32>>,
}

/// How a [`RetrievalHit`] was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalMethodUsed {
    Bm25,
    Dense,
    Hybrid,
    Fallback,
}

/// One ranked result from `VectorStore::search` (§4.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalHit {
    pub chunk: DocumentChunk,
    pub score: f64,
    pub method: RetrievalMethodUsed,
}

/// Kind of a [`ProgressEvent`] (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressEventKind {
    Progress,
    AgentStart,
    AgentComplete,
    ToolCall,
    ToolResult,
    Error,
    Final,
}

/// An event published to the Progress Bus. `sequence` is assigned by the
/// Orchestrator's single serialization point (§5) and is strictly
/// increasing per investigation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub investigation_id: String,
    pub sequence: u64,
    pub kind: ProgressEventKind,
    pub agent: Option<String>,
    pub message: String,
    pub progress: u8,
    /// Present only on the terminal `Final` event.
    pub payload: Option<Investigation>,
}

/// Lifecycle status of an [`Investigation`] (§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvestigationStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Structured terminal error attached to a Failed investigation (§7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestigationFailure {
    pub kind: ErrorKind,
    pub message: String,
}

/// The root entity: one fraud investigation run. Owned exclusively by the
/// Orchestrator; created on request and destroyed when fully emitted or
/// abandoned.
///
/// Invariant: `status == Completed` iff all four agent outputs are present
/// OR a terminal error is recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Investigation {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub input: TransactionInput,
    pub status: InvestigationStatus,
    pub agent_results: HashMap<String, AgentResult>,
    pub final_report: Option<String>,
    pub error: Option<InvestigationFailure>,
}

impl Investigation {
    pub fn new(id: String, input: TransactionInput) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            input,
            status: InvestigationStatus::Pending,
            agent_results: HashMap::new(),
            final_report: None,
            error: None,
        }
    }

    /// The invariant from §3, checked by tests rather than enforced by
    /// construction (the Orchestrator is the only writer of `status`).
    pub fn is_status_consistent(&self) -> bool {
        match self.status {
            InvestigationStatus::Completed => {
                self.agent_results.len() == 4 || self.error.is_some()
            }
            InvestigationStatus::Failed => self.error.is_some(),
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_input() -> TransactionInput {
        TransactionInput {
            amount: 9500.0,
            currency: "USD".to_string(),
            description: "Business cash deposit".to_string(),
            customer_name: "Corner Market Express".to_string(),
            account_type: AccountType::Business,
            risk_rating: RiskRating::Low,
            country_to: "US".to_string(),
        }
    }

    #[test]
    fn valid_input_passes() {
        assert!(sample_input().validate().is_ok());
    }

    #[test]
    fn negative_amount_rejected() {
        let mut input = sample_input();
        input.amount = -1.0;
        assert!(input.validate().is_err());
    }

    #[test]
    fn oversized_description_rejected() {
        let mut input = sample_input();
        input.description = "x".repeat(TransactionInput::MAX_DESCRIPTION_LEN + 1);
        assert!(input.validate().is_err());
    }

    #[test]
    fn bad_currency_rejected() {
        let mut input = sample_input();
        input.currency = "US".to_string();
        assert!(input.validate().is_err());
    }

    #[test]
    fn pending_investigation_is_consistent() {
        let inv = Investigation::new("inv-1".to_string(), sample_input());
        assert!(inv.is_status_consistent());
    }
}

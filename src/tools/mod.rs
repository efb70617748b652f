//! Concrete [`crate::tool_protocol::ToolProtocol`] implementations backing
//! the Tool Registry (C3, §4.3): three HTTP-backed research/intelligence
//! tools, one HTTP-backed exchange-rate tool, and two pure deterministic
//! calculators.
//!
//! The HTTP-backed tools share one retry/backoff policy (§4.3: "connect
//! timeout, per-request timeout, single retry on retryable error (network
//! or 5xx with exponential backoff capped at 2 s)") via the helpers below,
//! grounded in the timeout/retry shape of the teacher's
//! `tools/http_client.rs` and `clients/common.rs`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

pub mod compliance;
pub mod exchange_rate;
pub mod regulatory;
pub mod research;
pub mod risk;
pub mod web_intelligence;

pub use compliance::ComplianceTool;
pub use exchange_rate::ExchangeRateTool;
pub use regulatory::RegulatoryDocumentsTool;
pub use research::FraudResearchTool;
pub use risk::TransactionRiskTool;
pub use web_intelligence::WebIntelligenceTool;

/// Backoff before the single retry, capped at 2 s per §4.3.
const RETRY_BACKOFF: Duration = Duration::from_millis(800);

fn is_retryable_status(status: reqwest::StatusCode) -> bool {
    status.as_u16() == 429 || status.is_server_error()
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

/// GET `url` with a bounded timeout, retrying once on a transient failure.
/// Never returns `Err` for a definitive failure — callers turn the
/// `Err(String)` case directly into `ToolResult::unavailable` (§4.3: "On
/// definitive failure, return a textual unavailable: <reason>").
pub(crate) async fn get_with_retry(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<reqwest::Response, String> {
    for attempt in 0..2 {
        match client.get(url).timeout(timeout).send().await {
            Ok(resp) if is_retryable_status(resp.status()) && attempt == 0 => {
                tokio::time::sleep(RETRY_BACKOFF).await;
            }
            Ok(resp) => return Ok(resp),
            Err(e) if is_retryable_error(&e) && attempt == 0 => {
                tokio::time::sleep(RETRY_BACKOFF).await;
            }
            Err(e) => return Err(format!("request failed: {}", e)),
        }
    }
    Err("request failed after retry".to_string())
}

/// Acquire a permit from the shared network-tool worker pool (§5: "64
/// network tool worker pool cap"), if one is configured. `None` leaves the
/// call unbounded, which the unit tests rely on.
pub(crate) async fn acquire_network_permit(pool: &Option<Arc<Semaphore>>) -> Option<OwnedSemaphorePermit> {
    match pool {
        Some(pool) => pool.clone().acquire_owned().await.ok(),
        None => None,
    }
}

/// POST `url` with a JSON body, same retry policy as [`get_with_retry`].
pub(crate) async fn post_json_with_retry(
    client: &reqwest::Client,
    url: &str,
    body: &serde_json::Value,
    timeout: Duration,
) -> Result<reqwest::Response, String> {
    for attempt in 0..2 {
        match client.post(url).json(body).timeout(timeout).send().await {
            Ok(resp) if is_retryable_status(resp.status()) && attempt == 0 => {
                tokio::time::sleep(RETRY_BACKOFF).await;
            }
            Ok(resp) => return Ok(resp),
            Err(e) if is_retryable_error(&e) && attempt == 0 => {
                tokio::time::sleep(RETRY_BACKOFF).await;
            }
            Err(e) => return Err(format!("request failed: {}", e)),
        }
    }
    Err("request failed after retry".to_string())
}

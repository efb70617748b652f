//! The HTTP ingress surface (§6), gated behind the `server` feature.
//!
//! This is ambient wiring, not a new core component (§9 Design Notes: "the
//! HTTP listener plumbing and request validation" are out of scope as a
//! *collaborator*). What's implemented here is a thin, concrete instance of
//! that collaborator so the documented interface is actually exercisable:
//! routes, status codes, and the SSE event shape are taken verbatim from
//! §6. Request-body schema validation beyond `TransactionInput::validate`
//! and things like auth, rate limiting, or a production-grade router setup
//! remain the embedder's problem.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower_http::limit::RequestBodyLimitLayer;

use crate::cache::CacheCategory;
use crate::domain::{ProgressEventKind, TransactionInput};
use crate::error::InvestigationError;
use crate::orchestrator::Orchestrator;

/// Shared state for every route: the Orchestrator plus the readiness flags
/// `GET /health` reports (§6).
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub vector_store_initialized: bool,
    pub llm_available: bool,
}

/// Build the router described in §6. Kept separate from `main` so an
/// embedder can mount it under their own Axum app instead of using the
/// `investigatord` binary directly.
/// Request bodies larger than this are rejected at the edge (413) before
/// ever reaching `TransactionInput` validation — a coarse, framework-level
/// analogue of the Gateway's own context-overflow check (§4.4, §6).
const MAX_REQUEST_BODY_BYTES: usize = 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    // The investigation-total deadline is already enforced inside the
    // Orchestrator's own run loop (it always reaches a terminal event and
    // unblocks `/investigate`), so the only cross-cutting concern left for
    // this layer is the request body size cap.
    Router::new()
        .route("/investigate", post(investigate))
        .route("/investigate/stream", post(investigate_stream))
        .route("/search", get(search_regulatory))
        .route("/web-search", get(search_web))
        .route("/arxiv-search", get(search_research))
        .route("/exchange-rate", get(exchange_rate))
        .route("/health", get(health))
        .route("/cache/stats", get(cache_stats))
        .route("/cache/clear", delete(cache_clear_all))
        .route("/cache/clear/{category}", delete(cache_clear_category))
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BODY_BYTES))
        .with_state(state)
}

fn error_body(kind: &str, message: impl Into<String>) -> Json<serde_json::Value> {
    Json(json!({"error": {"kind": kind, "message": message.into()}}))
}

fn investigation_error_response(e: InvestigationError) -> Response {
    let status = StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, error_body(&format!("{:?}", e.kind()), e.to_string())).into_response()
}

/// `POST /investigate` (§6): submit, await the terminal event, return the
/// compiled Investigation. Status 200 on success, or the mapped status for
/// the terminal failure kind (413 context_overflow, 429/503 provider, 504
/// deadline).
async fn investigate(State(state): State<AppState>, Json(input): Json<TransactionInput>) -> Response {
    let (id, _handle) = match state.orchestrator.submit(input).await {
        Ok(ok) => ok,
        Err(e) => return investigation_error_response(e),
    };

    let mut rx = state.orchestrator.subscribe(&id).await;
    while let Some(event) = rx.recv().await {
        if let Some(investigation) = event.payload {
            let status = match &investigation.error {
                Some(failure) => StatusCode::from_u16(failure.kind.http_status())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                None => StatusCode::OK,
            };
            return (status, Json(investigation)).into_response();
        }
    }

    // The stream closed without ever delivering a terminal event — only
    // possible if the producer task itself panicked.
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        error_body("internal", "investigation stream closed before a terminal event"),
    )
        .into_response()
}

/// `POST /investigate/stream` (§6): same body, but the response is the raw
/// SSE multiplex of every `ProgressEvent` for this investigation, closing
/// after the terminal event (§4.7).
async fn investigate_stream(State(state): State<AppState>, Json(input): Json<TransactionInput>) -> Response {
    let (id, _handle) = match state.orchestrator.submit(input).await {
        Ok(ok) => ok,
        Err(e) => return investigation_error_response(e),
    };

    let rx = state.orchestrator.subscribe(&id).await;
    let stream = futures_util::stream::unfold((rx, false), |(mut rx, done)| async move {
        if done {
            return None;
        }
        let event = rx.recv().await?;
        let terminal = matches!(event.kind, ProgressEventKind::Final | ProgressEventKind::Error);
        let data = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
        Some((Ok::<Event, Infallible>(Event::default().data(data)), (rx, terminal)))
    });
    Sse::new(stream).into_response()
}

#[derive(Deserialize)]
struct SearchParams {
    query: String,
    max_results: Option<u64>,
}

async fn dispatch_tool_query(state: &AppState, tool: &str, query: &str, max_results: Option<u64>) -> Response {
    let args = json!({"query": query, "max_results": max_results.unwrap_or(5)});
    let invocation = state.orchestrator.tools().dispatch(tool, args, state.orchestrator.cache()).await;
    (
        StatusCode::OK,
        Json(json!({
            "result": invocation.result_text,
            "cache_hit": invocation.cache_hit,
            "error": invocation.error,
        })),
    )
        .into_response()
}

/// `GET /search?query=&max_results=` (§6): thin wrapper over the Vector
/// Store via `search_regulatory_documents`.
async fn search_regulatory(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Response {
    dispatch_tool_query(&state, "search_regulatory_documents", &params.query, params.max_results).await
}

async fn search_web(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Response {
    dispatch_tool_query(&state, "search_web_intelligence", &params.query, params.max_results).await
}

async fn search_research(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Response {
    dispatch_tool_query(&state, "search_fraud_research", &params.query, params.max_results).await
}

#[derive(Deserialize)]
struct ExchangeRateParams {
    from_currency: String,
    to_currency: String,
}

/// `GET /exchange-rate` (§6): thin wrapper over `get_exchange_rate_data`.
async fn exchange_rate(State(state): State<AppState>, Query(params): Query<ExchangeRateParams>) -> Response {
    let args = json!({"from_currency": params.from_currency, "to_currency": params.to_currency});
    let invocation = state
        .orchestrator
        .tools()
        .dispatch("get_exchange_rate_data", args, state.orchestrator.cache())
        .await;
    (
        StatusCode::OK,
        Json(json!({
            "result": invocation.result_text,
            "cache_hit": invocation.cache_hit,
            "error": invocation.error,
        })),
    )
        .into_response()
}

/// `GET /health` (§6): component readiness flags.
async fn health(State(state): State<AppState>) -> Response {
    (
        StatusCode::OK,
        Json(json!({
            "cache_available": true,
            "vector_store_initialized": state.vector_store_initialized,
            "llm_available": state.llm_available,
        })),
    )
        .into_response()
}

/// `GET /cache/stats` (§6).
async fn cache_stats(State(state): State<AppState>) -> Response {
    let cache = state.orchestrator.cache();
    (
        StatusCode::OK,
        Json(json!({
            "hits": cache.hit_count(),
            "misses": cache.miss_count(),
            "hit_ratio": cache.hit_ratio(),
            "entries": cache.len(),
        })),
    )
        .into_response()
}

/// `DELETE /cache/clear` (§6): drop every cached entry.
async fn cache_clear_all(State(state): State<AppState>) -> Response {
    state.orchestrator.cache().clear(None);
    StatusCode::NO_CONTENT.into_response()
}

/// `DELETE /cache/clear/{category}` (§6): drop one TTL category.
async fn cache_clear_category(State(state): State<AppState>, Path(category): Path<String>) -> Response {
    match CacheCategory::parse(&category) {
        Some(cat) => {
            state.orchestrator.cache().clear(Some(cat));
            StatusCode::NO_CONTENT.into_response()
        }
        None => (StatusCode::BAD_REQUEST, error_body("input", format!("unknown cache category: {}", category)))
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentConfig;
    use crate::cache::CacheStore;
    use crate::client_wrapper::{ClientError, ClientWrapper, Message, TokenUsage, ToolDefinition, UsageSlot};
    use crate::config::InvestigatorConfig;
    use crate::gateway::LlmGateway;
    use crate::metrics::Metrics;
    use crate::progress_bus::ProgressBus;
    use crate::tool_protocol::ToolRegistry;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::Mutex;
    use std::time::Duration;
    use tower::ServiceExt;

    struct AlwaysConcludes {
        usage: UsageSlot,
    }

    #[async_trait]
    impl ClientWrapper for AlwaysConcludes {
        async fn send_message(
            &self,
            _messages: &[Message],
            _tools: Option<Vec<ToolDefinition>>,
        ) -> Result<Message, ClientError> {
            Ok(Message::assistant("nothing unusual found", vec![]))
        }

        fn model_name(&self) -> &str {
            "always-concludes"
        }

        fn get_last_usage(&self) -> TokenUsage {
            TokenUsage::default()
        }

        fn usage_slot(&self) -> UsageSlot {
            Arc::clone(&self.usage)
        }
    }

    fn test_state() -> AppState {
        let client = Arc::new(AlwaysConcludes {
            usage: Arc::new(Mutex::new(TokenUsage::default())),
        });
        let gateway = Arc::new(LlmGateway::new(client, CacheStore::new(), false, Duration::from_secs(60)));
        let mut config = InvestigatorConfig::default();
        config.timeouts.analysis_deadline = Duration::from_secs(5);
        config.timeouts.reporting_deadline = Duration::from_secs(5);
        config.timeouts.agent_total = Duration::from_secs(5);
        config.timeouts.investigation_total = Duration::from_secs(10);
        let orchestrator = Orchestrator::new(
            config,
            Arc::new(ToolRegistry::new()),
            gateway,
            CacheStore::new(),
            Arc::new(ProgressBus::new(256, 64)),
            Arc::new(Metrics::new()),
        );
        let _ = AgentConfig::regulatory_research();
        AppState {
            orchestrator: Arc::new(orchestrator),
            vector_store_initialized: false,
            llm_available: true,
        }
    }

    #[tokio::test]
    async fn health_reports_readiness_flags() {
        let app = build_router(test_state());
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn investigate_rejects_invalid_input_with_400() {
        let app = build_router(test_state());
        let body = serde_json::json!({
            "amount": -1.0,
            "currency": "USD",
            "description": "bad",
            "customer_name": "Acme",
            "account_type": "business",
            "risk_rating": "low",
            "country_to": "US",
        });
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/investigate")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn cache_clear_unknown_category_is_bad_request() {
        let app = build_router(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/cache/clear/not_a_real_category")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

//! The `investigatord` binary: wires every collaborator in §5's dependency
//! bundle from environment variables and serves the HTTP ingress surface
//! described in §6.
//!
//! ```bash
//! export OPENAI_API_KEY=sk-...
//! cargo run --bin investigatord --features server
//! ```
//!
//! A missing `OPENAI_API_KEY` is not fatal here — only the first LLM call
//! fails, surfaced as a `permanent` provider error on that investigation
//! (§6) — so the server still starts and the deterministic tools and
//! retrieval endpoints stay usable.

use std::sync::Arc;
use std::time::Duration;

use investigator::cache::CacheStore;
use investigator::clients::openai::OpenAiClient;
use investigator::config::{
    ExternalProvidersConfig, InvestigatorConfig, RetrievalMethod,
};
use investigator::domain::DocumentChunk;
use investigator::embeddings::OpenAiEmbeddingProvider;
use investigator::gateway::LlmGateway;
use investigator::metrics::Metrics;
use investigator::progress_bus::ProgressBus;
use investigator::server::{self, AppState};
use investigator::tool_protocol::ToolRegistry;
use investigator::tools::{
    ComplianceTool, ExchangeRateTool, FraudResearchTool, RegulatoryDocumentsTool, TransactionRiskTool,
    WebIntelligenceTool,
};
use investigator::vector_store::VectorStore;
use investigator::Orchestrator;

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_duration_secs(key: &str, default: Duration) -> Duration {
    env_string(key)
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    env_string(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    env_string(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Load the regulatory document corpus from a JSON array of `DocumentChunk`
/// if `REGULATORY_CORPUS_PATH` is set. Ingestion itself is out of scope
/// (§1); this just deserializes whatever an out-of-band ingestion step
/// already produced. Absent or unreadable, the store boots empty rather
/// than failing the process.
fn load_corpus() -> Vec<DocumentChunk> {
    let path = match env_string("REGULATORY_CORPUS_PATH") {
        Some(p) => p,
        None => return Vec::new(),
    };
    match std::fs::read_to_string(&path) {
        Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
            log::warn!("failed to parse regulatory corpus at {}: {}", path, e);
            Vec::new()
        }),
        Err(e) => {
            log::warn!("failed to read regulatory corpus at {}: {}", path, e);
            Vec::new()
        }
    }
}

fn retrieval_method_from_env() -> RetrievalMethod {
    match env_string("RETRIEVAL_METHOD").as_deref() {
        Some("bm25") => RetrievalMethod::Bm25Only,
        Some("dense") => RetrievalMethod::DenseOnly,
        _ => RetrievalMethod::Auto,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let llm_api_key = env_string("OPENAI_API_KEY");
    if llm_api_key.is_none() {
        log::warn!("OPENAI_API_KEY is not set; investigations will fail on their first LLM call");
    }
    let llm_model = env_string("LLM_MODEL").unwrap_or_else(|| "gpt-4.1-mini".to_string());
    let llm_max_tokens = env_usize("LLM_MAX_TOKENS", 4096);

    let mut config = InvestigatorConfig {
        llm_model: llm_model.clone(),
        llm_max_tokens,
        retrieval_method: retrieval_method_from_env(),
        bm25_enabled: env_bool("BM25_ENABLED", true),
        cache_enabled: env_bool("CACHE_ENABLED", true),
        providers: ExternalProvidersConfig {
            web_search_url: env_string("WEB_SEARCH_URL"),
            web_search_api_key: env_string("WEB_SEARCH_API_KEY"),
            academic_search_url: env_string("ACADEMIC_SEARCH_URL"),
            academic_search_api_key: env_string("ACADEMIC_SEARCH_API_KEY"),
            exchange_rate_url: env_string("EXCHANGE_RATE_URL"),
            exchange_rate_api_key: env_string("EXCHANGE_RATE_API_KEY"),
            vector_backend_url: env_string("VECTOR_BACKEND_URL"),
            vector_collection_name: env_string("VECTOR_COLLECTION_NAME"),
            tracing_endpoint: env_string("TRACING_ENDPOINT"),
        },
        embedding_model: env_string("EMBEDDING_MODEL").unwrap_or_else(|| "text-embedding-3-large".to_string()),
        ..InvestigatorConfig::default()
    };
    config.timeouts.llm_call = env_duration_secs("LLM_CALL_TIMEOUT_SECS", config.timeouts.llm_call);
    config.timeouts.investigation_total =
        env_duration_secs("INVESTIGATION_TOTAL_TIMEOUT_SECS", config.timeouts.investigation_total);
    config.worker_pools.max_concurrent_llm_calls =
        env_usize("MAX_CONCURRENT_LLM_CALLS", config.worker_pools.max_concurrent_llm_calls);
    config.worker_pools.max_concurrent_network_tool_calls = env_usize(
        "MAX_CONCURRENT_NETWORK_TOOL_CALLS",
        config.worker_pools.max_concurrent_network_tool_calls,
    );

    let cache = CacheStore::new();

    let client = Arc::new(OpenAiClient::new(llm_api_key.clone().unwrap_or_default(), &llm_model, llm_max_tokens));
    let gateway = Arc::new(LlmGateway::new(
        client,
        cache.clone(),
        config.cache_enabled,
        config.cache_ttls.llm_completion,
    ));

    let embeddings: Option<Arc<dyn investigator::embeddings::EmbeddingProvider>> = llm_api_key
        .as_ref()
        .map(|key| Arc::new(OpenAiEmbeddingProvider::new(key.clone(), &config.embedding_model, 3072)) as Arc<_>);

    let corpus = load_corpus();
    let vector_store_initialized = !corpus.is_empty();
    let vector_store = Arc::new(
        VectorStore::build(corpus, config.retrieval_method)
            .map_err(|e| format!("failed to build regulatory document index: {}", e))?,
    );

    let network_pool = Arc::new(tokio::sync::Semaphore::new(config.worker_pools.max_concurrent_network_tool_calls));

    let mut tools = ToolRegistry::new();
    tools.register(Arc::new(RegulatoryDocumentsTool::new(
        Arc::clone(&vector_store),
        embeddings.clone(),
        config.cache_ttls.vector_search,
    )));
    tools.register(Arc::new(
        WebIntelligenceTool::new(
            config.providers.web_search_url.clone(),
            config.providers.web_search_api_key.clone(),
            config.timeouts.network_tool_call,
            config.cache_ttls.web_intelligence,
        )
        .with_worker_pool(Arc::clone(&network_pool)),
    ));
    tools.register(Arc::new(
        FraudResearchTool::new(
            config.providers.academic_search_url.clone(),
            config.providers.academic_search_api_key.clone(),
            config.timeouts.network_tool_call,
            config.cache_ttls.academic_research,
        )
        .with_worker_pool(Arc::clone(&network_pool)),
    ));
    tools.register(Arc::new(
        ExchangeRateTool::new(
            config.providers.exchange_rate_url.clone(),
            config.providers.exchange_rate_api_key.clone(),
            config.timeouts.network_tool_call,
            config.cache_ttls.exchange_rates,
        )
        .with_worker_pool(Arc::clone(&network_pool)),
    ));
    tools.register(Arc::new(TransactionRiskTool::new(config.risk_coefficients.clone())));
    tools.register(Arc::new(ComplianceTool::new(config.compliance.clone())));

    let progress = Arc::new(ProgressBus::new(
        config.progress_bus_buffer_capacity,
        config.progress_bus_subscriber_queue_depth,
    ));
    let metrics = Arc::new(Metrics::new());

    let orchestrator = Arc::new(Orchestrator::new(
        config,
        Arc::new(tools),
        gateway,
        cache,
        progress,
        metrics,
    ));

    let state = AppState {
        orchestrator,
        vector_store_initialized,
        llm_available: llm_api_key.is_some(),
    };
    let router = server::build_router(state);

    let bind_addr = env_string("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string());
    log::info!("investigatord listening on {}", bind_addr);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}

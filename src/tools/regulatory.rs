//! `search_regulatory_documents`: delegates to the Vector Store (§4.3 tool
//! table), cached by query+k under the `VectorSearch` category (§4.1).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::cache::CacheStore;
use crate::embeddings::EmbeddingProvider;
use crate::tool_protocol::{ToolMetadata, ToolParameter, ToolParameterType, ToolProtocol, ToolResult};
use crate::vector_store::VectorStore;

pub struct RegulatoryDocumentsTool {
    metadata: ToolMetadata,
    store: Arc<VectorStore>,
    embeddings: Option<Arc<dyn EmbeddingProvider>>,
    ttl: Duration,
}

impl RegulatoryDocumentsTool {
    pub fn new(store: Arc<VectorStore>, embeddings: Option<Arc<dyn EmbeddingProvider>>, ttl: Duration) -> Self {
        Self {
            metadata: ToolMetadata {
                name: "search_regulatory_documents".to_string(),
                description: "Search the regulatory document index (FATF recommendations, SAR/CTR guidance, \
                    enforcement precedent) for passages relevant to a query."
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
            store,
            embeddings,
            ttl,
        }
    }

    fn format_hits(hits: &[crate::domain::RetrievalHit]) -> String {
        if hits.is_empty() {
            return "no regulatory documents matched this query".to_string();
        }
        hits.iter()
            .map(|hit| {
                format!(
                    "[{}] {} (category: {}{}) score={:.3}\n{}",
                    hit.chunk.id,
                    hit.chunk.metadata.filename,
                    hit.chunk.metadata.content_category,
                    hit.chunk
                        .metadata
                        .jurisdiction
                        .as_ref()
                        .map(|j| format!(", jurisdiction: {}", j))
                        .unwrap_or_default(),
                    hit.score,
                    truncate(&hit.chunk.text, 500),
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    }
}

#[async_trait]
impl ToolProtocol for RegulatoryDocumentsTool {
    fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    async fn execute(&self, arguments: Value, cache: &CacheStore) -> ToolResult {
        let query = match arguments.get("query").and_then(Value::as_str) {
            Some(q) => q,
            None => return ToolResult::unavailable("missing query argument"),
        };
        let k = arguments
            .get("max_results")
            .and_then(Value::as_u64)
            .unwrap_or(5)
            .clamp(1, 50) as usize;

        let key = CacheStore::canonical_key(
            "search_regulatory_documents",
            vec![("query".to_string(), query.to_string()), ("k".to_string(), k.to_string())],
            "v1",
        );
        if let (Some(cached), true) = cache.get(&key) {
            if let Ok(text) = serde_json::from_value::<String>(cached) {
                return ToolResult::ok(text, true);
            }
        }

        let query_embedding = if let Some(provider) = &self.embeddings {
            provider.embed_query(query).await.unwrap_or_default()
        } else {
            Vec::new()
        };

        let (hits, retrieval_error) = self.store.search(query, &query_embedding, k);
        let mut text = Self::format_hits(&hits);
        if let Some(err) = retrieval_error {
            text = format!("{}\n\n(note: {})", text, err);
        }

        if let Ok(value) = serde_json::to_value(&text) {
            cache.put(key, value, self.ttl).await;
        }

        ToolResult::ok(text, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetrievalMethod;
    use crate::domain::{ChunkMetadata, DocumentChunk};

    fn store_with(text: &str) -> Arc<VectorStore> {
        let chunk = DocumentChunk {
            id: "doc-1".to_string(),
            text: text.to_string(),
            metadata: ChunkMetadata {
                filename: "sar-guidance.pdf".to_string(),
                content_category: "sar_guidance".to_string(),
                jurisdiction: Some("US".to_string()),
                source_agency: Some("FinCEN".to_string()),
            },
            embedding: None,
        };
        Arc::new(VectorStore::build(vec![chunk], RetrievalMethod::Bm25Only).unwrap())
    }

    #[tokio::test]
    async fn returns_formatted_hit_and_caches_it() {
        let tool = RegulatoryDocumentsTool::new(
            store_with("structuring below the currency transaction report threshold"),
            None,
            Duration::from_secs(60),
        );
        let cache = CacheStore::new();
        let args = serde_json::json!({"query": "structuring currency transaction report", "max_results": 5});
        let first = tool.execute(args.clone(), &cache).await;
        assert!(!first.cache_hit);
        assert!(first.text.contains("sar-guidance.pdf"));

        let second = tool.execute(args, &cache).await;
        assert!(second.cache_hit);
        assert_eq!(second.text, first.text);
    }

    #[tokio::test]
    async fn missing_query_argument_is_unavailable() {
        let tool = RegulatoryDocumentsTool::new(store_with("anything"), None, Duration::from_secs(60));
        let cache = CacheStore::new();
        let result = tool.execute(serde_json::json!({}), &cache).await;
        assert!(result.text.starts_with("unavailable"));
    }
}

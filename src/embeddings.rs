//! The embedding provider seam the dense retrieval path binds to (§6
//! Egress: "Embedding provider: HTTPS JSON for query embeddings"). Kept
//! separate from [`crate::client_wrapper::ClientWrapper`] because an
//! embedding call has a different wire shape (one string in, one vector
//! out) than a chat completion.

use async_trait::async_trait;
use serde_json::json;

use crate::clients::common::get_shared_http_client;

/// Non-fatal: the Vector Store already degrades a missing/failing
/// embedding to an empty dense result plus a [`crate::vector_store::RetrievalError`]
/// (§4.2), so this only needs a message, not a transient/permanent split.
#[derive(Debug, Clone)]
pub struct EmbeddingError(pub String);

impl std::fmt::Display for EmbeddingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "embedding error: {}", self.0)
    }
}

impl std::error::Error for EmbeddingError {}

/// Produces a query embedding for the dense retrieval path.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    fn dimension(&self) -> usize;
}

/// OpenAI-compatible `/embeddings` endpoint client, the default
/// [`EmbeddingProvider`] (§2 C2, §6: "Embedding provider").
pub struct OpenAiEmbeddingProvider {
    base_url: String,
    api_key: String,
    model: String,
    dimension: usize,
    http_client: reqwest::Client,
}

impl OpenAiEmbeddingProvider {
    /// `dimension` must match the corpus embedding dimension the Vector
    /// Store was built with (§4.2 invariant: fixed embedding dimension
    /// across the corpus); 3072 matches `text-embedding-3-large`.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, dimension: usize) -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: api_key.into(),
            model: model.into(),
            dimension,
            http_client: get_shared_http_client(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let body = json!({
            "model": self.model,
            "input": text,
        });

        let resp = self
            .http_client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EmbeddingError(format!("request failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(EmbeddingError(format!("http {}: {}", status, text)));
        }

        let parsed: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| EmbeddingError(format!("invalid JSON response: {}", e)))?;

        let vector = parsed
            .get("data")
            .and_then(|d| d.get(0))
            .and_then(|d| d.get("embedding"))
            .and_then(|e| e.as_array())
            .ok_or_else(|| EmbeddingError("response had no embedding".to_string()))?;

        let embedding: Vec<f32> = vector.iter().filter_map(|v| v.as_f64()).map(|v| v as f32).collect();
        if embedding.len() != self.dimension {
            return Err(EmbeddingError(format!(
                "provider returned a {}-dimensional embedding, expected {}",
                embedding.len(),
                self.dimension
            )));
        }
        Ok(embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_exposes_configured_dimension() {
        let provider = OpenAiEmbeddingProvider::new("key", "text-embedding-3-large", 3072);
        assert_eq!(provider.dimension(), 3072);
    }
}

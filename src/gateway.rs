//! The LLM Gateway (C4): a thin wrapper over a [`ClientWrapper`] that adds
//! retry-with-backoff, context-overflow detection, and optional caching of
//! deterministic (temperature=0) completions (§4.4).

use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha256};
use tokio::sync::Semaphore;

use crate::cache::{CacheCategory, CacheStore};
use crate::client_wrapper::{ClientWrapper, Message, ProviderFailureKind, Role, ToolDefinition};
use crate::error::{InvestigationError, ProviderErrorKind};

/// Exponential backoff schedule for transient provider errors (§4.4: "200
/// ms, 800 ms").
const RETRY_BACKOFFS: [Duration; 2] = [Duration::from_millis(200), Duration::from_millis(800)];

/// `complete(messages, tool_schemas, max_tokens)` (§4.4), plus the
/// ambient retry/overflow/cache policy every call goes through.
pub struct LlmGateway {
    client: Arc<dyn ClientWrapper>,
    cache: CacheStore,
    cache_enabled: bool,
    cache_ttl: Duration,
    config_version: String,
    /// Bounds concurrent in-flight provider calls across every agent
    /// sharing this gateway (§5: "32 LLM ... worker pool caps via
    /// `tokio::sync::Semaphore`"). `None` leaves calls unbounded, which
    /// the test suite relies on to keep its mocks simple.
    worker_pool: Option<Arc<Semaphore>>,
}

impl LlmGateway {
    pub fn new(client: Arc<dyn ClientWrapper>, cache: CacheStore, cache_enabled: bool, cache_ttl: Duration) -> Self {
        Self {
            client,
            cache,
            cache_enabled,
            cache_ttl,
            config_version: "v1".to_string(),
            worker_pool: None,
        }
    }

    pub fn with_worker_pool(mut self, worker_pool: Arc<Semaphore>) -> Self {
        self.worker_pool = Some(worker_pool);
        self
    }

    fn approx_byte_length(messages: &[Message], tools: &[ToolDefinition]) -> usize {
        let msg_len: usize = messages.iter().map(|m| m.content.len()).sum();
        let tool_len: usize = tools
            .iter()
            .map(|t| t.name.len() + t.description.len() + t.parameters_schema.to_string().len())
            .sum();
        msg_len + tool_len
    }

    /// A deterministic completion is cacheable only at temperature=0, with
    /// a stable hash of messages+tools as the key (§4.4).
    fn cache_key(&self, messages: &[Message], tools: &[ToolDefinition], temperature: f64) -> Option<String> {
        if temperature != 0.0 {
            return None;
        }
        let mut hasher = Sha256::new();
        hasher.update(self.config_version.as_bytes());
        for m in messages {
            hasher.update(m.role.to_string().as_bytes());
            hasher.update(m.content.as_bytes());
        }
        for t in tools {
            hasher.update(t.name.as_bytes());
            hasher.update(t.parameters_schema.to_string().as_bytes());
        }
        Some(format!("{}:{:x}", CacheCategory::LlmCompletion.as_str(), hasher.finalize()))
    }

    /// Issue one completion call, retrying transient failures per §4.4's
    /// backoff schedule and surfacing permanent failures immediately.
    /// `temperature == 0.0` makes the call cache-eligible when caching is
    /// enabled on this gateway.
    pub async fn complete(
        &self,
        messages: &[Message],
        tools: Vec<ToolDefinition>,
        max_tokens: usize,
        temperature: f64,
    ) -> Result<Message, InvestigationError> {
        let context_limit = self.client.context_window_tokens() as usize * 4; // ~4 bytes/token
        let byte_len = Self::approx_byte_length(messages, &tools);
        if byte_len > context_limit {
            return Err(InvestigationError::ContextOverflow(format!(
                "message payload is {} bytes, exceeding the provider's ~{} byte limit",
                byte_len, context_limit
            )));
        }

        let key = if self.cache_enabled {
            self.cache_key(messages, &tools, temperature)
        } else {
            None
        };

        if let Some(key) = &key {
            let (value, hit) = self.cache.get(key);
            if hit {
                if let Some(value) = value {
                    if let Ok(cached) = serde_json::from_value::<CachedMessage>(value) {
                        return Ok(cached.into_message());
                    }
                }
            }
        }

        let tools_arg = if tools.is_empty() { None } else { Some(tools.clone()) };

        let _permit = match &self.worker_pool {
            Some(pool) => Some(
                pool.clone()
                    .acquire_owned()
                    .await
                    .map_err(|_| InvestigationError::Internal("llm worker pool closed".to_string()))?,
            ),
            None => None,
        };

        let mut last_err = None;
        for attempt in 0..=RETRY_BACKOFFS.len() {
            match self.client.send_message(messages, tools_arg.clone()).await {
                Ok(reply) => {
                    if let Some(key) = &key {
                        if let Ok(value) = serde_json::to_value(CachedMessage::from_message(&reply)) {
                            self.cache.put(key.clone(), value, self.cache_ttl).await;
                        }
                    }
                    return Ok(reply);
                }
                Err(e) if e.kind == ProviderFailureKind::Transient && attempt < RETRY_BACKOFFS.len() => {
                    tokio::time::sleep(RETRY_BACKOFFS[attempt]).await;
                    last_err = Some(e);
                }
                Err(e) => {
                    let kind = match e.kind {
                        ProviderFailureKind::Transient => ProviderErrorKind::Transient,
                        ProviderFailureKind::Permanent => ProviderErrorKind::Permanent,
                    };
                    return Err(InvestigationError::Provider(kind, e.message));
                }
            }
        }

        let e = last_err.expect("loop always sets last_err before exhausting retries");
        Err(InvestigationError::Provider(ProviderErrorKind::Transient, e.message))
    }
}

/// Serializable mirror of [`Message`] for cache storage (the real type
/// isn't `Serialize` — its `Role::Tool` carries a call id that has no
/// meaning once a cached reply is replayed against a fresh conversation).
#[derive(serde::Serialize, serde::Deserialize)]
struct CachedMessage {
    content: String,
    tool_calls: Vec<crate::client_wrapper::NativeToolCall>,
}

impl CachedMessage {
    fn from_message(m: &Message) -> Self {
        Self {
            content: m.content.to_string(),
            tool_calls: m.tool_calls.clone(),
        }
    }

    fn into_message(self) -> Message {
        Message {
            role: Role::Assistant,
            content: Arc::from(self.content),
            tool_calls: self.tool_calls,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client_wrapper::{ClientError, TokenUsage, UsageSlot};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FlakyClient {
        calls: AtomicUsize,
        fail_first: usize,
        usage: UsageSlot,
    }

    #[async_trait::async_trait]
    impl ClientWrapper for FlakyClient {
        async fn send_message(
            &self,
            _messages: &[Message],
            _tools: Option<Vec<ToolDefinition>>,
        ) -> Result<Message, ClientError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first {
                Err(ClientError::transient("rate limited"))
            } else {
                Ok(Message::assistant("final answer", vec![]))
            }
        }

        fn model_name(&self) -> &str {
            "flaky"
        }

        fn get_last_usage(&self) -> TokenUsage {
            TokenUsage::default()
        }

        fn usage_slot(&self) -> UsageSlot {
            Arc::clone(&self.usage)
        }
    }

    #[tokio::test]
    async fn retries_transient_errors_then_succeeds() {
        let client = Arc::new(FlakyClient {
            calls: AtomicUsize::new(0),
            fail_first: 1,
            usage: Arc::new(Mutex::new(TokenUsage::default())),
        });
        let gateway = LlmGateway::new(client, CacheStore::new(), false, Duration::from_secs(60));
        let messages = vec![Message::user("hello")];
        let reply = gateway.complete(&messages, vec![], 256, 0.7).await.unwrap();
        assert_eq!(reply.content.as_ref(), "final answer");
    }

    #[tokio::test]
    async fn context_overflow_is_detected_before_dispatch() {
        let client = Arc::new(FlakyClient {
            calls: AtomicUsize::new(0),
            fail_first: 0,
            usage: Arc::new(Mutex::new(TokenUsage::default())),
        });
        let gateway = LlmGateway::new(client, CacheStore::new(), false, Duration::from_secs(60));
        let huge = "x".repeat(10_000_000);
        let messages = vec![Message::user(huge)];
        let result = gateway.complete(&messages, vec![], 256, 0.0).await;
        assert!(matches!(result, Err(InvestigationError::ContextOverflow(_))));
    }
}

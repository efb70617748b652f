//! OpenAI-compatible provider, backing the LLM Gateway by default.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::client_wrapper::{
    ClientError, ClientWrapper, Message, TokenUsage, ToolDefinition, UsageSlot,
};

use super::common::{get_shared_http_client, send_with_native_tools};

/// Talks to any `/v1/chat/completions`-compatible endpoint (OpenAI itself,
/// or a compatible self-hosted gateway) using native tool calling.
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: usize,
    context_window_tokens: u64,
    http_client: reqwest::Client,
    usage: UsageSlot,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, max_tokens: usize) -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens,
            context_window_tokens: 128_000,
            http_client: get_shared_http_client(),
            usage: Arc::new(Mutex::new(TokenUsage::default())),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_context_window_tokens(mut self, tokens: u64) -> Self {
        self.context_window_tokens = tokens;
        self
    }
}

#[async_trait]
impl ClientWrapper for OpenAiClient {
    async fn send_message(
        &self,
        messages: &[Message],
        tools: Option<Vec<ToolDefinition>>,
    ) -> Result<Message, ClientError> {
        send_with_native_tools(
            &self.base_url,
            &self.api_key,
            &self.model,
            messages,
            tools,
            self.max_tokens,
            &self.http_client,
            &self.usage,
        )
        .await
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn get_last_usage(&self) -> TokenUsage {
        self.usage.lock().map(|u| *u).unwrap_or_default()
    }

    fn usage_slot(&self) -> UsageSlot {
        Arc::clone(&self.usage)
    }

    fn context_window_tokens(&self) -> u64 {
        self.context_window_tokens
    }
}

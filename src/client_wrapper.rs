//! The native tool-calling contract every chat completion provider
//! implements, and the message/tool types that flow across it.
//!
//! This is the thin seam the LLM Gateway (`gateway.rs`) sits behind: a
//! provider receives an ordered message list plus tool schemas and returns
//! exactly one assistant message, either a final answer or a list of tool
//! calls to dispatch.

use std::error::Error;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One message role in a conversation. `Tool` carries the `call_id` of the
/// tool call it answers, so the provider can correlate it on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool { call_id: String },
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::Tool { call_id } => write!(f, "tool[{}]", call_id),
        }
    }
}

/// A tool call the assistant asked to have dispatched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeToolCall {
    pub id: String,
    pub name: String,
    /// Raw JSON arguments as returned by the provider, before schema validation.
    pub arguments: serde_json::Value,
}

/// One turn of the conversation.
#[derive(Debug, Clone)]
pub struct Message {
    pub role: Role,
    pub content: Arc<str>,
    pub tool_calls: Vec<NativeToolCall>,
}

impl Message {
    pub fn system(content: impl Into<Arc<str>>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn user(content: impl Into<Arc<str>>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn assistant(content: impl Into<Arc<str>>, tool_calls: Vec<NativeToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls,
        }
    }

    pub fn tool(call_id: impl Into<String>, content: impl Into<Arc<str>>) -> Self {
        Self {
            role: Role::Tool {
                call_id: call_id.into(),
            },
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Schema a tool advertises to the provider: name, description, and a JSON
/// Schema object describing its arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters_schema: serde_json::Value,
}

/// Token accounting for one `send_message` call.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

/// Shared slot a client records its last call's usage into, so callers that
/// don't thread usage through return values can still read it (mirrors the
/// gateway's retry bookkeeping, which issues more than one call per
/// `complete`).
pub type UsageSlot = Arc<Mutex<TokenUsage>>;

/// Whether a provider failure should be retried (§4.4: transient vs permanent).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderFailureKind {
    Transient,
    Permanent,
}

/// Error returned by a [`ClientWrapper`] call.
#[derive(Debug)]
pub struct ClientError {
    pub kind: ProviderFailureKind,
    pub message: String,
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for ClientError {}

impl ClientError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderFailureKind::Transient,
            message: message.into(),
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderFailureKind::Permanent,
            message: message.into(),
        }
    }
}

/// A chat completion provider capable of native tool calling. Implementors
/// live under `clients/`.
#[async_trait]
pub trait ClientWrapper: Send + Sync {
    /// Send the conversation so far, with the given tool schemas (empty
    /// when the caller wants to force a final answer), and get back exactly
    /// one assistant message.
    async fn send_message(
        &self,
        messages: &[Message],
        tools: Option<Vec<ToolDefinition>>,
    ) -> Result<Message, ClientError>;

    fn model_name(&self) -> &str;

    /// Usage recorded by the most recent `send_message` call.
    fn get_last_usage(&self) -> TokenUsage;

    fn usage_slot(&self) -> UsageSlot;

    /// Provider-derived context window, in approximate tokens, used by the
    /// gateway's context-overflow check (§4.4).
    fn context_window_tokens(&self) -> u64 {
        128_000
    }
}

/// Shared monotonic id source for synthesizing tool-call ids when a
/// provider doesn't echo one back untouched.
pub fn next_call_id(counter: &AtomicU64) -> String {
    format!("call_{}", counter.fetch_add(1, Ordering::Relaxed))
}

//! Wire-format plumbing shared by every provider: a pooled HTTP client and
//! the OpenAI-compatible `chat/completions` request/response shape that
//! native tool calling rides on.

use std::sync::Arc;

use lazy_static::lazy_static;
use serde_json::{json, Value};

use crate::client_wrapper::{
    ClientError, Message, NativeToolCall, ProviderFailureKind, Role, ToolDefinition, TokenUsage,
    UsageSlot,
};

lazy_static! {
    static ref SHARED_HTTP_CLIENT: reqwest::Client = reqwest::Client::builder()
        .pool_max_idle_per_host(16)
        .build()
        .expect("failed to build shared HTTP client");
}

/// A single `reqwest::Client` reused across every provider instance and
/// tool, so connection pooling is actually effective.
pub fn get_shared_http_client() -> reqwest::Client {
    SHARED_HTTP_CLIENT.clone()
}

fn role_to_json(msg: &Message) -> Value {
    match &msg.role {
        Role::System => json!({"role": "system", "content": msg.content.as_ref()}),
        Role::User => json!({"role": "user", "content": msg.content.as_ref()}),
        Role::Assistant => {
            if msg.tool_calls.is_empty() {
                json!({"role": "assistant", "content": msg.content.as_ref()})
            } else {
                let tool_calls: Vec<Value> = msg
                    .tool_calls
                    .iter()
                    .map(|tc| {
                        json!({
                            "id": tc.id,
                            "type": "function",
                            "function": {
                                "name": tc.name,
                                "arguments": tc.arguments.to_string(),
                            }
                        })
                    })
                    .collect();
                json!({
                    "role": "assistant",
                    "content": if msg.content.is_empty() { Value::Null } else { Value::String(msg.content.to_string()) },
                    "tool_calls": tool_calls,
                })
            }
        }
        Role::Tool { call_id } => json!({
            "role": "tool",
            "tool_call_id": call_id,
            "content": msg.content.as_ref(),
        }),
    }
}

fn tool_to_json(tool: &ToolDefinition) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.parameters_schema,
        }
    })
}

/// POST a chat completion request built from `messages`/`tools` against an
/// OpenAI-compatible `{base_url}/chat/completions` endpoint, and parse the
/// reply back into a [`Message`]. Records token usage into `usage_slot`.
pub async fn send_with_native_tools(
    base_url: &str,
    api_key: &str,
    model: &str,
    messages: &[Message],
    tools: Option<Vec<ToolDefinition>>,
    max_tokens: usize,
    http_client: &reqwest::Client,
    usage_slot: &UsageSlot,
) -> Result<Message, ClientError> {
    let mut body = json!({
        "model": model,
        "messages": messages.iter().map(role_to_json).collect::<Vec<_>>(),
        "max_tokens": max_tokens,
    });

    if let Some(tools) = tools {
        if !tools.is_empty() {
            body["tools"] = Value::Array(tools.iter().map(tool_to_json).collect());
        }
    }

    let resp = http_client
        .post(format!("{}/chat/completions", base_url))
        .bearer_auth(api_key)
        .json(&body)
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() || e.is_connect() {
                ClientError::transient(format!("request error: {}", e))
            } else {
                ClientError::permanent(format!("request error: {}", e))
            }
        })?;

    let status = resp.status();
    if !status.is_success() {
        let text = resp.text().await.unwrap_or_default();
        let kind = if status.as_u16() == 429 || status.is_server_error() {
            ProviderFailureKind::Transient
        } else {
            ProviderFailureKind::Permanent
        };
        return Err(ClientError {
            kind,
            message: format!("http {}: {}", status, text),
        });
    }

    let parsed: Value = resp
        .json()
        .await
        .map_err(|e| ClientError::permanent(format!("invalid JSON response: {}", e)))?;

    if let Ok(mut slot) = usage_slot.lock() {
        if let Some(usage) = parsed.get("usage") {
            *slot = TokenUsage {
                input_tokens: usage.get("prompt_tokens").and_then(Value::as_u64).unwrap_or(0),
                output_tokens: usage
                    .get("completion_tokens")
                    .and_then(Value::as_u64)
                    .unwrap_or(0),
                total_tokens: usage.get("total_tokens").and_then(Value::as_u64).unwrap_or(0),
            };
        }
    }

    let choice = parsed
        .get("choices")
        .and_then(|c| c.get(0))
        .ok_or_else(|| ClientError::permanent("response had no choices"))?;
    let message = choice
        .get("message")
        .ok_or_else(|| ClientError::permanent("choice had no message"))?;

    let content = message
        .get("content")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();

    let tool_calls = message
        .get("tool_calls")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|tc| {
                    let id = tc.get("id")?.as_str()?.to_string();
                    let function = tc.get("function")?;
                    let name = function.get("name")?.as_str()?.to_string();
                    let args_str = function.get("arguments")?.as_str()?;
                    let arguments: Value =
                        serde_json::from_str(args_str).unwrap_or(Value::Object(Default::default()));
                    Some(NativeToolCall { id, name, arguments })
                })
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    Ok(Message::assistant(Arc::from(content), tool_calls))
}

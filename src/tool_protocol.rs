//! The Tool Registry (C3): a boot-time-immutable collection of named
//! tools, each schema-validated and invocable by an agent through the
//! LLM's tool-call protocol.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value;

use crate::cache::CacheStore;
use crate::client_wrapper::ToolDefinition;
use crate::domain::ToolInvocation;

/// A tool argument's expected JSON type, used for schema validation before
/// dispatch (§4.5 step 5: "Validate arguments against the tool's schema").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolParameterType {
    String,
    Number,
    Boolean,
}

#[derive(Debug, Clone)]
pub struct ToolParameter {
    pub name: String,
    pub param_type: ToolParameterType,
    pub required: bool,
    pub description: String,
}

/// Static metadata describing a tool, independent of its implementation.
#[derive(Debug, Clone)]
pub struct ToolMetadata {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ToolParameter>,
}

impl ToolMetadata {
    /// JSON Schema object for this tool's parameters, as sent to the LLM
    /// Gateway.
    pub fn json_schema(&self) -> Value {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();
        for p in &self.parameters {
            let type_name = match p.param_type {
                ToolParameterType::String => "string",
                ToolParameterType::Number => "number",
                ToolParameterType::Boolean => "boolean",
            };
            properties.insert(
                p.name.clone(),
                serde_json::json!({"type": type_name, "description": p.description}),
            );
            if p.required {
                required.push(Value::String(p.name.clone()));
            }
        }
        serde_json::json!({
            "type": "object",
            "properties": Value::Object(properties),
            "required": Value::Array(required),
        })
    }

    pub fn to_tool_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters_schema: self.json_schema(),
        }
    }

    /// Validate a call's arguments against this tool's declared schema.
    /// Returns `Err` describing the first mismatch found.
    pub fn validate_arguments(&self, arguments: &Value) -> Result<(), String> {
        let obj = arguments
            .as_object()
            .ok_or_else(|| "arguments must be a JSON object".to_string())?;
        for p in &self.parameters {
            match obj.get(&p.name) {
                None if p.required => return Err(format!("missing required argument: {}", p.name)),
                None => {}
                Some(v) => {
                    let matches = match p.param_type {
                        ToolParameterType::String => v.is_string(),
                        ToolParameterType::Number => v.is_number(),
                        ToolParameterType::Boolean => v.is_boolean(),
                    };
                    if !matches {
                        return Err(format!("argument {} has the wrong type", p.name));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Outcome of a tool execution before it is recorded onto an
/// [`AgentResult`](crate::domain::AgentResult); never raises — on
/// definitive failure a tool must return a textual "unavailable: <reason>"
/// result rather than an error (§4.3).
#[derive(Debug, Clone)]
pub struct ToolResult {
    pub text: String,
    pub cache_hit: bool,
}

impl ToolResult {
    pub fn ok(text: impl Into<String>, cache_hit: bool) -> Self {
        Self {
            text: text.into(),
            cache_hit,
        }
    }

    pub fn unavailable(reason: impl std::fmt::Display) -> Self {
        Self {
            text: format!("unavailable: {}", reason),
            cache_hit: false,
        }
    }
}

/// Errors internal to tool dispatch, never surfaced past the Agent Runtime
/// (which turns them into a Tool message per §4.5 step 5).
#[derive(Debug, Clone)]
pub enum ToolError {
    UnknownTool(String),
    InvalidArguments(String),
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolError::UnknownTool(name) => write!(f, "error: unknown tool {}", name),
            ToolError::InvalidArguments(msg) => write!(f, "error: invalid arguments: {}", msg),
        }
    }
}

/// Implemented by every concrete tool. `execute` never returns `Err` for
/// recoverable conditions (provider outage, missing credentials) — those
/// are folded into [`ToolResult::unavailable`] so a single tool failure
/// never ends an agent's loop.
#[async_trait]
pub trait ToolProtocol: Send + Sync {
    fn metadata(&self) -> &ToolMetadata;

    async fn execute(&self, arguments: Value, cache: &CacheStore) -> ToolResult;
}

/// A boxed tool plus its metadata, as held by the registry.
pub struct Tool {
    pub inner: Arc<dyn ToolProtocol>,
}

/// Immutable-after-boot collection of tools (§5: "The Tool Registry is
/// immutable after boot"). Construction happens once at startup; agents
/// only ever read from it.
pub struct ToolRegistry {
    tools: HashMap<String, Tool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register(&mut self, tool: Arc<dyn ToolProtocol>) {
        let name = tool.metadata().name.clone();
        self.tools.insert(name, Tool { inner: tool });
    }

    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    pub fn definitions_for(&self, allowed: &[&str]) -> Vec<ToolDefinition> {
        allowed
            .iter()
            .filter_map(|name| self.tools.get(*name))
            .map(|t| t.inner.metadata().to_tool_definition())
            .collect()
    }

    /// Validate and dispatch a tool call by name, producing the
    /// [`ToolInvocation`] record the Agent Runtime attaches to its
    /// `AgentResult` (§4.5 step 5).
    pub async fn dispatch(
        &self,
        tool_name: &str,
        arguments: Value,
        cache: &CacheStore,
    ) -> ToolInvocation {
        let start = Instant::now();
        let tool = match self.get(tool_name) {
            Some(t) => t,
            None => {
                let err = ToolError::UnknownTool(tool_name.to_string());
                return ToolInvocation {
                    tool_name: tool_name.to_string(),
                    arguments,
                    result_text: err.to_string(),
                    latency_ms: start.elapsed().as_millis() as u64,
                    cache_hit: false,
                    error: Some(err.to_string()),
                };
            }
        };

        if let Err(reason) = tool.inner.metadata().validate_arguments(&arguments) {
            let err = ToolError::InvalidArguments(reason);
            return ToolInvocation {
                tool_name: tool_name.to_string(),
                arguments,
                result_text: err.to_string(),
                latency_ms: start.elapsed().as_millis() as u64,
                cache_hit: false,
                error: Some(err.to_string()),
            };
        }

        let result = tool.inner.execute(arguments.clone(), cache).await;
        ToolInvocation {
            tool_name: tool_name.to_string(),
            arguments,
            result_text: result.text,
            latency_ms: start.elapsed().as_millis() as u64,
            cache_hit: result.cache_hit,
            error: None,
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

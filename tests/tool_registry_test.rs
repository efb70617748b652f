//! Tool Registry (C3) dispatch behavior (§4.5 step 5): unknown tools and
//! schema-invalid arguments are folded into a `ToolInvocation` error rather
//! than ever raising past the registry, so a single bad tool call never
//! ends an agent's ReAct loop.

use async_trait::async_trait;
use investigator::cache::CacheStore;
use investigator::tool_protocol::{ToolMetadata, ToolParameter, ToolParameterType, ToolProtocol, ToolRegistry, ToolResult};
use serde_json::{json, Value};
use std::sync::Arc;

struct EchoTool {
    metadata: ToolMetadata,
}

impl EchoTool {
    fn new() -> Self {
        Self {
            metadata: ToolMetadata {
                name: "echo".to_string(),
                description: "echoes its message argument".to_string(),
                parameters: vec![ToolParameter {
                    name: "message".to_string(),
                    param_type: ToolParameterType::String,
                    required: true,
                    description: "text to echo".to_string(),
                }],
            },
        }
    }
}

#[async_trait]
impl ToolProtocol for EchoTool {
    fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    async fn execute(&self, arguments: Value, _cache: &CacheStore) -> ToolResult {
        let message = arguments.get("message").and_then(Value::as_str).unwrap_or_default();
        ToolResult::ok(format!("echo: {}", message), false)
    }
}

fn registry_with_echo() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(EchoTool::new()));
    registry
}

#[tokio::test]
async fn dispatching_an_unknown_tool_yields_an_error_invocation_not_a_panic() {
    let registry = registry_with_echo();
    let cache = CacheStore::new();
    let invocation = registry.dispatch("does_not_exist", json!({}), &cache).await;
    assert_eq!(invocation.tool_name, "does_not_exist");
    assert!(invocation.error.is_some());
    assert!(invocation.result_text.contains("unknown tool"));
}

#[tokio::test]
async fn dispatching_with_a_missing_required_argument_is_an_invalid_arguments_error() {
    let registry = registry_with_echo();
    let cache = CacheStore::new();
    let invocation = registry.dispatch("echo", json!({}), &cache).await;
    assert!(invocation.error.is_some());
    assert!(invocation.result_text.contains("invalid arguments"));
}

#[tokio::test]
async fn dispatching_with_a_wrong_typed_argument_is_an_invalid_arguments_error() {
    let registry = registry_with_echo();
    let cache = CacheStore::new();
    let invocation = registry.dispatch("echo", json!({"message": 42}), &cache).await;
    assert!(invocation.error.is_some());
}

#[tokio::test]
async fn a_well_formed_call_dispatches_and_is_recorded_without_error() {
    let registry = registry_with_echo();
    let cache = CacheStore::new();
    let invocation = registry.dispatch("echo", json!({"message": "hello"}), &cache).await;
    assert!(invocation.error.is_none());
    assert_eq!(invocation.result_text, "echo: hello");
    assert!(!invocation.cache_hit);
}

#[tokio::test]
async fn definitions_for_filters_to_the_requested_allow_list() {
    let registry = registry_with_echo();
    let defs = registry.definitions_for(&["echo", "not_registered"]);
    assert_eq!(defs.len(), 1);
    assert_eq!(defs[0].name, "echo");
}

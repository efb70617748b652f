//! The Agent Runtime (C5): runs one agent's bounded ReAct loop — prompt,
//! call the LLM Gateway, dispatch any requested tools, repeat until the
//! model concludes or the iteration cap forces it to (§4.5).

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::timeout;

use crate::cache::CacheStore;
use crate::client_wrapper::Message;
use crate::domain::{AgentError, AgentResult, ToolInvocation};
use crate::domain::ProgressEventKind;
use crate::error::ErrorKind;
use crate::gateway::LlmGateway;
use crate::metrics::{log_span, Metrics};
use crate::progress_bus::ProgressBus;
use crate::tool_protocol::ToolRegistry;

/// Static per-agent configuration (§4.5: "a configuration ... not a new
/// component"). The four rows of the agents table in §4.5 are each one
/// `AgentConfig` value.
#[derive(Clone)]
pub struct AgentConfig {
    pub name: String,
    pub system_prompt: String,
    pub allowed_tools: Vec<&'static str>,
    /// Guidance only; the runtime must not reject a compliant response
    /// that omits it (§4.5).
    pub first_tool_hint: Option<&'static str>,
    pub max_iterations: usize,
}

impl AgentConfig {
    pub fn regulatory_research() -> Self {
        Self {
            name: "regulatory_research".to_string(),
            system_prompt: REGULATORY_RESEARCH_PROMPT.to_string(),
            allowed_tools: vec![
                "search_regulatory_documents",
                "search_fraud_research",
                "search_web_intelligence",
            ],
            first_tool_hint: Some("search_regulatory_documents"),
            max_iterations: 6,
        }
    }

    pub fn evidence_collection() -> Self {
        Self {
            name: "evidence_collection".to_string(),
            system_prompt: EVIDENCE_COLLECTION_PROMPT.to_string(),
            allowed_tools: vec![
                "calculate_transaction_risk",
                "get_exchange_rate_data",
                "search_web_intelligence",
            ],
            first_tool_hint: Some("calculate_transaction_risk"),
            max_iterations: 6,
        }
    }

    pub fn compliance_check() -> Self {
        Self {
            name: "compliance_check".to_string(),
            system_prompt: COMPLIANCE_CHECK_PROMPT.to_string(),
            allowed_tools: vec!["check_compliance_requirements", "search_regulatory_documents"],
            first_tool_hint: Some("check_compliance_requirements"),
            max_iterations: 6,
        }
    }

    pub fn report_generation() -> Self {
        Self {
            name: "report_generation".to_string(),
            system_prompt: REPORT_GENERATION_PROMPT.to_string(),
            allowed_tools: vec!["search_regulatory_documents", "check_compliance_requirements"],
            first_tool_hint: None,
            max_iterations: 6,
        }
    }
}

const REGULATORY_RESEARCH_PROMPT: &str = "You are a regulatory research analyst investigating a financial \
transaction for potential fraud or compliance exposure. Identify the regulatory guidance, FATF \
recommendations, and enforcement precedent that bear on this transaction. Start by searching the \
regulatory document index; use fraud research and web intelligence to corroborate. Cite what you find.";

const EVIDENCE_COLLECTION_PROMPT: &str = "You are an evidence collection analyst. Quantify the risk this \
transaction presents using the risk calculator, confirm currency conversion where relevant, and gather any \
corroborating web intelligence. Report a numeric risk score and the factors behind it.";

const COMPLIANCE_CHECK_PROMPT: &str = "You are a compliance officer. Determine which regulatory filings this \
transaction triggers (CTR, SAR, or others), their thresholds and deadlines, and cite the applicable \
regulation. Use the compliance requirements tool as your primary source, and the regulatory document index \
to corroborate.";

const REPORT_GENERATION_PROMPT: &str = "You are the lead investigator. You have been given the regulatory \
research, evidence collection, and compliance check findings for one transaction. Synthesize them into a \
single, well-organized investigation report covering: risk assessment, regulatory concerns, required \
filings, and a recommendation. Do not merely restate the inputs.";

/// Cooperative cancellation signal shared by the Orchestrator and every
/// agent/tool task it spawns (§5).
#[derive(Clone)]
pub struct CancellationToken {
    rx: watch::Receiver<bool>,
}

#[derive(Clone)]
pub struct CancellationHandle {
    tx: watch::Sender<bool>,
}

impl CancellationHandle {
    pub fn new() -> (Self, CancellationToken) {
        let (tx, rx) = watch::channel(false);
        (Self { tx }, CancellationToken { rx })
    }

    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

impl CancellationToken {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    async fn cancelled(&mut self) {
        while !*self.rx.borrow() {
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}

/// Runs the bounded ReAct loop for one agent (§4.5).
pub struct Agent {
    config: AgentConfig,
    tools: Arc<ToolRegistry>,
    gateway: Arc<LlmGateway>,
    cache: CacheStore,
    progress: Arc<ProgressBus>,
    metrics: Arc<Metrics>,
    llm_max_tokens: usize,
    agent_timeout: Duration,
}

impl Agent {
    pub fn new(
        config: AgentConfig,
        tools: Arc<ToolRegistry>,
        gateway: Arc<LlmGateway>,
        cache: CacheStore,
        progress: Arc<ProgressBus>,
        llm_max_tokens: usize,
        agent_timeout: Duration,
    ) -> Self {
        Self::with_metrics(
            config,
            tools,
            gateway,
            cache,
            progress,
            Arc::new(Metrics::new()),
            llm_max_tokens,
            agent_timeout,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn with_metrics(
        config: AgentConfig,
        tools: Arc<ToolRegistry>,
        gateway: Arc<LlmGateway>,
        cache: CacheStore,
        progress: Arc<ProgressBus>,
        metrics: Arc<Metrics>,
        llm_max_tokens: usize,
        agent_timeout: Duration,
    ) -> Self {
        Self {
            config,
            tools,
            gateway,
            cache,
            progress,
            metrics,
            llm_max_tokens,
            agent_timeout,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Run the loop to completion, or until `cancel` fires or the per-agent
    /// timeout elapses.
    pub async fn run(
        &self,
        investigation_id: &str,
        task: String,
        mut cancel: CancellationToken,
    ) -> AgentResult {
        let started_at = Utc::now();
        self.progress
            .emit(
                investigation_id,
                ProgressEventKind::AgentStart,
                Some(self.config.name.clone()),
                format!("{} starting", self.config.name),
                0,
                None,
            )
            .await;

        let run = self.react_loop(investigation_id, task, &mut cancel);
        let outcome = match timeout(self.agent_timeout, run).await {
            Ok(outcome) => outcome,
            Err(_) => LoopOutcome {
                text: String::new(),
                tool_calls: Vec::new(),
                error: Some(AgentError {
                    kind: ErrorKind::Cancelled,
                    message: format!("{} exceeded its {:?} deadline", self.config.name, self.agent_timeout),
                }),
            },
        };

        let finished_at = Utc::now();
        self.progress
            .emit(
                investigation_id,
                ProgressEventKind::AgentComplete,
                Some(self.config.name.clone()),
                format!("{} complete", self.config.name),
                0,
                None,
            )
            .await;

        AgentResult {
            name: self.config.name.clone(),
            text: outcome.text,
            tool_calls: outcome.tool_calls,
            started_at,
            finished_at,
            error: outcome.error,
        }
    }

    async fn react_loop(
        &self,
        investigation_id: &str,
        task: String,
        cancel: &mut CancellationToken,
    ) -> LoopOutcome {
        let mut messages = vec![Message::system(self.config.system_prompt.clone()), Message::user(task)];
        let mut tool_calls = Vec::new();
        let schemas = self.tools.definitions_for(&self.config.allowed_tools);
        let mut iteration = 0usize;
        let mut forced_conclusion = false;

        loop {
            if cancel.is_cancelled() {
                return LoopOutcome {
                    text: String::new(),
                    tool_calls,
                    error: Some(AgentError {
                        kind: ErrorKind::Cancelled,
                        message: "cancelled before completion".to_string(),
                    }),
                };
            }

            let offered_schemas = if forced_conclusion { vec![] } else { schemas.clone() };
            let reply = tokio::select! {
                reply = self.gateway.complete(&messages, offered_schemas, self.llm_max_tokens, 0.0) => reply,
                _ = cancel.cancelled() => {
                    return LoopOutcome {
                        text: String::new(),
                        tool_calls,
                        error: Some(AgentError {
                            kind: ErrorKind::Cancelled,
                            message: "cancelled awaiting LLM reply".to_string(),
                        }),
                    };
                }
            };

            let reply = match reply {
                Ok(reply) => reply,
                Err(e) => {
                    return LoopOutcome {
                        text: String::new(),
                        tool_calls,
                        error: Some(AgentError {
                            kind: e.kind(),
                            message: e.to_string(),
                        }),
                    };
                }
            };

            if !reply.has_tool_calls() || forced_conclusion {
                return LoopOutcome {
                    text: reply.content.to_string(),
                    tool_calls,
                    error: None,
                };
            }

            messages.push(Message::assistant(reply.content.clone(), reply.tool_calls.clone()));

            for call in &reply.tool_calls {
                if cancel.is_cancelled() {
                    return LoopOutcome {
                        text: String::new(),
                        tool_calls,
                        error: Some(AgentError {
                            kind: ErrorKind::Cancelled,
                            message: "cancelled mid tool dispatch".to_string(),
                        }),
                    };
                }

                self.progress
                    .emit(
                        investigation_id,
                        ProgressEventKind::ToolCall,
                        Some(self.config.name.clone()),
                        format!("calling {}", call.name),
                        0,
                        None,
                    )
                    .await;

                let invocation = self.tools.dispatch(&call.name, call.arguments.clone(), &self.cache).await;
                self.metrics.record_tool_latency_ms(&call.name, invocation.latency_ms);
                self.metrics.record_cache_access(invocation.cache_hit);
                log_span(
                    "agent_runtime",
                    "tool_call",
                    investigation_id,
                    Some(&self.config.name),
                    Some(&call.name),
                    Some(invocation.cache_hit),
                    invocation.latency_ms,
                    invocation.error.as_deref(),
                );

                self.progress
                    .emit(
                        investigation_id,
                        ProgressEventKind::ToolResult,
                        Some(self.config.name.clone()),
                        format!("{} returned", call.name),
                        0,
                        None,
                    )
                    .await;

                messages.push(Message::tool(call.id.clone(), invocation.result_text.clone()));
                tool_calls.push(invocation);
            }

            iteration += 1;
            if iteration >= self.config.max_iterations {
                messages.push(Message::system(
                    "tool budget exhausted; provide your final answer",
                ));
                forced_conclusion = true;
            }
        }
    }
}

struct LoopOutcome {
    text: String,
    tool_calls: Vec<ToolInvocation>,
    error: Option<AgentError>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheStore;
    use crate::client_wrapper::{ClientError, ClientWrapper, NativeToolCall, TokenUsage, ToolDefinition, UsageSlot};
    use crate::tool_protocol::{ToolMetadata, ToolParameter, ToolParameterType, ToolProtocol, ToolResult};
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct ScriptedClient {
        calls: AtomicUsize,
        usage: UsageSlot,
    }

    #[async_trait]
    impl ClientWrapper for ScriptedClient {
        async fn send_message(
            &self,
            _messages: &[Message],
            tools: Option<Vec<ToolDefinition>>,
        ) -> Result<Message, ClientError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n == 0 && tools.is_some() {
                Ok(Message::assistant(
                    "",
                    vec![NativeToolCall {
                        id: "call_1".to_string(),
                        name: "echo".to_string(),
                        arguments: serde_json::json!({"text": "hi"}),
                    }],
                ))
            } else {
                Ok(Message::assistant("final answer", vec![]))
            }
        }

        fn model_name(&self) -> &str {
            "scripted"
        }

        fn get_last_usage(&self) -> TokenUsage {
            TokenUsage::default()
        }

        fn usage_slot(&self) -> UsageSlot {
            Arc::clone(&self.usage)
        }
    }

    struct EchoTool {
        metadata: ToolMetadata,
    }

    impl EchoTool {
        fn new() -> Self {
            Self {
                metadata: ToolMetadata {
                    name: "echo".to_string(),
                    description: "echoes text".to_string(),
                    parameters: vec![ToolParameter {
                        name: "text".to_string(),
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
            ToolResult::ok(arguments["text"].as_str().unwrap_or("").to_string(), false)
        }
    }

    #[tokio::test]
    async fn loop_dispatches_tool_then_concludes() {
        let client = Arc::new(ScriptedClient {
            calls: AtomicUsize::new(0),
            usage: Arc::new(Mutex::new(TokenUsage::default())),
        });
        let gateway = Arc::new(LlmGateway::new(client, CacheStore::new(), false, Duration::from_secs(60)));
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool::new()));
        let mut config = AgentConfig::regulatory_research();
        config.allowed_tools = vec!["echo"];
        let progress = Arc::new(ProgressBus::new(256, 64));
        let agent = Agent::new(
            config,
            Arc::new(registry),
            gateway,
            CacheStore::new(),
            progress,
            256,
            Duration::from_secs(5),
        );
        let (_handle, token) = CancellationHandle::new();
        let result = agent.run("inv-1", "investigate".to_string(), token).await;
        assert_eq!(result.text, "final answer");
        assert_eq!(result.tool_calls.len(), 1);
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn cancellation_before_start_returns_cancelled_error() {
        let client = Arc::new(ScriptedClient {
            calls: AtomicUsize::new(0),
            usage: Arc::new(Mutex::new(TokenUsage::default())),
        });
        let gateway = Arc::new(LlmGateway::new(client, CacheStore::new(), false, Duration::from_secs(60)));
        let registry = Arc::new(ToolRegistry::new());
        let progress = Arc::new(ProgressBus::new(256, 64));
        let agent = Agent::new(
            AgentConfig::report_generation(),
            registry,
            gateway,
            CacheStore::new(),
            progress,
            256,
            Duration::from_secs(5),
        );
        let (handle, token) = CancellationHandle::new();
        handle.cancel();
        let result = agent.run("inv-2", "investigate".to_string(), token).await;
        assert_eq!(result.error.unwrap().kind, ErrorKind::Cancelled);
    }
}

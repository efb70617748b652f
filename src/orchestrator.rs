//! The Orchestrator (C6): the workflow state machine coordinating the four
//! agents for one investigation (§4.6).
//!
//! ```text
//! Pending -> Running -> { CollectingAnalysis -> Reporting -> Completed }
//!                    \-> Failed
//! ```
//!
//! One [`Orchestrator`] is shared process-wide; each call to [`Orchestrator::submit`]
//! spawns its own driver task so investigations run independently and
//! concurrently, sharing only the read-only dependency bundle (§5).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use futures_util::future::select_all;
use uuid::Uuid;

use crate::agent::{Agent, AgentConfig, CancellationHandle, CancellationToken};
use crate::cache::{CacheCategory, CacheStore};
use crate::config::{CacheReplayMode, InvestigatorConfig};
use crate::domain::{
    AgentResult, Investigation, InvestigationFailure, InvestigationStatus, ProgressEventKind, TransactionInput,
};
use crate::error::{ErrorKind, InvestigationError};
use crate::gateway::LlmGateway;
use crate::metrics::{log_span, Metrics};
use crate::progress_bus::ProgressBus;
use crate::tool_protocol::ToolRegistry;

/// The three concurrent analysis agents plus the Report agent, wired
/// against one shared dependency bundle (§9 Design Notes: "hold as an
/// explicit dependency bundle passed to the Orchestrator at construction").
#[derive(Clone)]
pub struct Orchestrator {
    config: InvestigatorConfig,
    tools: Arc<ToolRegistry>,
    gateway: Arc<LlmGateway>,
    cache: CacheStore,
    progress: Arc<ProgressBus>,
    metrics: Arc<Metrics>,
}

/// Outcome of one investigation's CollectingAnalysis + Reporting run,
/// before it is folded into the final [`Investigation`] record.
enum RunOutcome {
    Completed {
        agent_results: HashMap<String, AgentResult>,
        report: String,
    },
    Failed {
        agent_results: HashMap<String, AgentResult>,
        failure: InvestigationFailure,
    },
}

impl Orchestrator {
    pub fn new(
        config: InvestigatorConfig,
        tools: Arc<ToolRegistry>,
        gateway: Arc<LlmGateway>,
        cache: CacheStore,
        progress: Arc<ProgressBus>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            config,
            tools,
            gateway,
            cache,
            progress,
            metrics,
        }
    }

    /// Subscribe to an investigation's progress stream (§4.7). Exposed so an
    /// ingress layer (e.g. the `server` feature's SSE route) can hand a
    /// caller a live or replayed event stream without reaching into private
    /// fields.
    pub async fn subscribe(&self, investigation_id: &str) -> tokio::sync::mpsc::Receiver<crate::domain::ProgressEvent> {
        self.progress.subscribe(investigation_id).await
    }

    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub fn config(&self) -> &InvestigatorConfig {
        &self.config
    }

    /// Validate and accept one investigation request. Returns immediately
    /// with the investigation's id and a handle the caller can use to
    /// cancel it early (§5 trigger (b): "client subscription terminated").
    /// An `Input` error surfaces synchronously and the investigation never
    /// enters `Running` (§7).
    pub async fn submit(&self, input: TransactionInput) -> Result<(String, CancellationHandle), InvestigationError> {
        input.validate().map_err(InvestigationError::Input)?;

        let id = Uuid::new_v4().to_string();
        let (handle, token) = CancellationHandle::new();

        if self.config.cache_enabled {
            let key = Self::canonical_input_key(&input);
            let (cached, hit) = self.cache.get(&key);
            if hit {
                if let Some(cached) = cached.and_then(|v| serde_json::from_value::<Investigation>(v).ok()) {
                    let orchestrator = self.clone();
                    let id_for_replay = id.clone();
                    tokio::spawn(async move { orchestrator.replay_from_cache(&id_for_replay, cached).await });
                    return Ok((id, handle));
                }
            }
        }

        let orchestrator = self.clone();
        let id_for_run = id.clone();
        let handle_for_run = handle.clone();
        tokio::spawn(async move { orchestrator.run(id_for_run, input, handle_for_run, token).await });
        Ok((id, handle))
    }

    async fn replay_from_cache(&self, id: &str, mut investigation: Investigation) {
        investigation.id = id.to_string();
        if self.config.cache_replay_mode == CacheReplayMode::CondensedReplay {
            self.progress
                .emit(id, ProgressEventKind::Progress, None, "replayed from cache", 100, None)
                .await;
        }
        self.progress
            .emit(
                id,
                ProgressEventKind::Final,
                None,
                "investigation replayed from cache",
                100,
                Some(investigation),
            )
            .await;
    }

    /// Drive one investigation from `Running` through to a terminal event,
    /// bounded by the overall investigation deadline (§5: 180 s default).
    async fn run(&self, id: String, input: TransactionInput, handle: CancellationHandle, token: CancellationToken) {
        let start = Instant::now();
        let mut investigation = Investigation::new(id.clone(), input.clone());
        investigation.status = InvestigationStatus::Running;

        self.progress
            .emit(&id, ProgressEventKind::Progress, None, "initializing", 0, None)
            .await;

        let body = self.run_body(&id, &input, token);
        tokio::pin!(body);
        let total_deadline = self.config.timeouts.investigation_total;
        let sleep = tokio::time::sleep(total_deadline);
        tokio::pin!(sleep);

        let outcome = tokio::select! {
            outcome = &mut body => outcome,
            _ = &mut sleep => {
                handle.cancel();
                body.await
            }
        };

        match outcome {
            RunOutcome::Completed { agent_results, report } => {
                investigation.agent_results = agent_results;
                investigation.final_report = Some(report);
                investigation.status = InvestigationStatus::Completed;
            }
            RunOutcome::Failed { agent_results, failure } => {
                investigation.agent_results = agent_results;
                investigation.status = InvestigationStatus::Failed;
                investigation.error = Some(failure);
            }
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        self.metrics.record_terminal_status(investigation.status);
        let error_kind = investigation.error.as_ref().map(|e| e.kind);
        if error_kind == Some(ErrorKind::Cancelled) {
            self.metrics.record_cancelled();
        }
        self.metrics.record_investigation_duration_ms(duration_ms);
        log_span(
            "orchestrator",
            "investigation",
            &id,
            None,
            None,
            None,
            duration_ms,
            error_kind.map(|k| format!("{:?}", k)).as_deref(),
        );

        if self.config.cache_enabled && investigation.status == InvestigationStatus::Completed {
            let key = Self::canonical_input_key(&input);
            if let Ok(value) = serde_json::to_value(&investigation) {
                self.cache.put(key, value, self.config.cache_ttls.investigation_result).await;
            }
        }

        let terminal_kind = if investigation.status == InvestigationStatus::Completed {
            ProgressEventKind::Final
        } else {
            ProgressEventKind::Error
        };
        self.progress
            .emit(&id, terminal_kind, None, "investigation finished", 100, Some(investigation))
            .await;
    }

    /// CollectingAnalysis then Reporting, without the top-level timeout or
    /// terminal bookkeeping (split out so [`Self::run`] can keep polling
    /// this same future after the overall deadline fires and cancellation
    /// has been signalled, per §5's "partial AgentResults are retained").
    async fn run_body(&self, id: &str, input: &TransactionInput, token: CancellationToken) -> RunOutcome {
        if token.is_cancelled() {
            return RunOutcome::Failed {
                agent_results: HashMap::new(),
                failure: InvestigationFailure {
                    kind: ErrorKind::Cancelled,
                    message: "cancelled before analysis began".to_string(),
                },
            };
        }

        let mut agent_results = self.collect_analyses(id, input, token.clone()).await;

        let failures: Vec<ErrorKind> = agent_results
            .values()
            .filter_map(|r| r.error.as_ref().map(|e| e.kind))
            .collect();
        if failures.len() == 3 && failures.windows(2).all(|w| w[0] == w[1]) {
            return RunOutcome::Failed {
                agent_results,
                failure: InvestigationFailure {
                    kind: failures[0],
                    message: "all analysis agents failed".to_string(),
                },
            };
        }

        if token.is_cancelled() {
            return RunOutcome::Failed {
                agent_results,
                failure: InvestigationFailure {
                    kind: ErrorKind::Cancelled,
                    message: "cancelled before reporting began".to_string(),
                },
            };
        }

        self.progress
            .emit(
                id,
                ProgressEventKind::Progress,
                None,
                "analysis complete; generating report",
                80,
                None,
            )
            .await;

        let report_result = self.run_report(id, input, &agent_results, token).await;
        let failure = report_result.error.as_ref().map(|e| InvestigationFailure {
            kind: e.kind,
            message: format!("report generation failed: {}", e.message),
        });
        let report_text = report_result.text.clone();
        agent_results.insert("report_generation".to_string(), report_result);

        match failure {
            Some(failure) => RunOutcome::Failed { agent_results, failure },
            None => RunOutcome::Completed { agent_results, report: report_text },
        }
    }

    /// Dispatch the three analysis agents concurrently (§5: "operations are
    /// concurrent; no memory is shared between them except the read-only
    /// Transaction Input"), each its own task, bounded by the D1 deadline
    /// (§4.6, default 120 s). On deadline, stop waiting and abort whatever
    /// hasn't returned — already-completed results are retained.
    async fn collect_analyses(
        &self,
        id: &str,
        input: &TransactionInput,
        token: CancellationToken,
    ) -> HashMap<String, AgentResult> {
        let task = Self::task_description(input);
        let mut handles: Vec<tokio::task::JoinHandle<AgentResult>> = [
            AgentConfig::regulatory_research(),
            AgentConfig::evidence_collection(),
            AgentConfig::compliance_check(),
        ]
        .into_iter()
        .map(|config| {
            let agent = self.build_agent(config);
            let id = id.to_string();
            let task = task.clone();
            let token = token.clone();
            tokio::spawn(async move { agent.run(&id, task, token).await })
        })
        .collect();

        let deadline = self.config.timeouts.analysis_deadline;
        let sleep = tokio::time::sleep(deadline);
        tokio::pin!(sleep);

        let mut results = HashMap::new();
        let mut completed = 0u8;
        while !handles.is_empty() {
            tokio::select! {
                (output, _index, remaining) = select_all(handles) => {
                    handles = remaining;
                    if let Ok(result) = output {
                        completed += 1;
                        self.progress
                            .emit(
                                id,
                                ProgressEventKind::Progress,
                                None,
                                format!("{} of 3 analysis agents complete", completed),
                                20 + 20 * completed,
                                None,
                            )
                            .await;
                        results.insert(result.name.clone(), result);
                    }
                }
                _ = &mut sleep => {
                    for handle in handles.drain(..) {
                        handle.abort();
                    }
                    break;
                }
            }
        }
        results
    }

    /// Dispatch the Report agent with the three analyses as context,
    /// bounded by its own timeout set directly to the D2 deadline (§4.6,
    /// default 90 s) rather than the generic per-agent timeout.
    async fn run_report(
        &self,
        id: &str,
        input: &TransactionInput,
        agent_results: &HashMap<String, AgentResult>,
        token: CancellationToken,
    ) -> AgentResult {
        let report_agent = Agent::with_metrics(
            AgentConfig::report_generation(),
            Arc::clone(&self.tools),
            Arc::clone(&self.gateway),
            self.cache.clone(),
            Arc::clone(&self.progress),
            Arc::clone(&self.metrics),
            self.config.llm_max_tokens,
            self.config.timeouts.reporting_deadline,
        );
        let task = self.build_report_task(input, agent_results);
        report_agent.run(id, task, token).await
    }

    fn build_agent(&self, config: AgentConfig) -> Agent {
        Agent::with_metrics(
            config,
            Arc::clone(&self.tools),
            Arc::clone(&self.gateway),
            self.cache.clone(),
            Arc::clone(&self.progress),
            Arc::clone(&self.metrics),
            self.config.llm_max_tokens,
            self.config.timeouts.agent_total,
        )
    }

    fn task_description(input: &TransactionInput) -> String {
        format!(
            "Transaction: {:.2} {} sent to {} via a {:?} account for customer {} (declared risk rating \
             {:?}). Description: {}",
            input.amount,
            input.currency,
            input.country_to,
            input.account_type,
            input.customer_name,
            input.risk_rating,
            input.description,
        )
    }

    /// Build the Report agent's seed by concatenating the three
    /// `AgentResult`s as sectioned context (§4.6: "concatenating the three
    /// AgentResults as User messages with section headers"). A failed
    /// agent contributes a note instead of its (absent) findings; whether
    /// that note carries the raw provider error or a sanitized reason is
    /// the `expose_raw_errors` Open Question resolution (§9).
    fn build_report_task(&self, input: &TransactionInput, agent_results: &HashMap<String, AgentResult>) -> String {
        let mut sections = vec![format!("## Transaction\n{}", Self::task_description(input))];
        for name in ["regulatory_research", "evidence_collection", "compliance_check"] {
            let section = match agent_results.get(name) {
                Some(result) if result.error.is_none() => format!("## {}\n{}", name, result.text),
                Some(result) => {
                    let reason = match &result.error {
                        Some(err) if self.config.expose_raw_errors => err.message.clone(),
                        Some(err) => Self::sanitized_reason(err.kind),
                        None => "unknown failure".to_string(),
                    };
                    format!("## {}\nagent {} failed: {}", name, name, reason)
                }
                None => format!("## {}\nagent {} did not return a result", name, name),
            };
            sections.push(section);
        }
        sections.join("\n\n")
    }

    fn sanitized_reason(kind: ErrorKind) -> String {
        match kind {
            ErrorKind::Input => "received invalid input".to_string(),
            ErrorKind::Transient => "a temporary provider failure".to_string(),
            ErrorKind::Permanent => "the provider is unavailable".to_string(),
            ErrorKind::Cancelled => "timed out".to_string(),
            ErrorKind::ContextOverflow => "its input exceeded the provider's context limit".to_string(),
            ErrorKind::Internal => "an internal error".to_string(),
        }
    }

    /// Canonical hash of a Transaction Input, used both to look up a cached
    /// investigation result and to store a freshly completed one (§4.6,
    /// §4.1: 24 h TTL).
    fn canonical_input_key(input: &TransactionInput) -> String {
        CacheStore::canonical_key(
            CacheCategory::InvestigationResult.as_str(),
            vec![
                ("amount".to_string(), input.amount.to_string()),
                ("currency".to_string(), input.currency.clone()),
                ("description".to_string(), input.description.clone()),
                ("customer_name".to_string(), input.customer_name.clone()),
                ("account_type".to_string(), format!("{:?}", input.account_type)),
                ("risk_rating".to_string(), format!("{:?}", input.risk_rating)),
                ("country_to".to_string(), input.country_to.clone()),
            ],
            "v1",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client_wrapper::{ClientError, ClientWrapper, Message, TokenUsage, ToolDefinition, UsageSlot};
    use crate::domain::{AccountType, RiskRating};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    struct AlwaysConcludes {
        usage: UsageSlot,
    }

    #[async_trait]
    impl ClientWrapper for AlwaysConcludes {
        async fn send_message(
            &self,
            _messages: &[Message],
            _tools: Option<Vec<ToolDefinition>>,
        ) -> Result<Message, ClientError> {
            Ok(Message::assistant("finding: nothing unusual", vec![]))
        }

        fn model_name(&self) -> &str {
            "always-concludes"
        }

        fn get_last_usage(&self) -> TokenUsage {
            TokenUsage::default()
        }

        fn usage_slot(&self) -> UsageSlot {
            Arc::clone(&self.usage)
        }
    }

    fn sample_input() -> TransactionInput {
        TransactionInput {
            amount: 2_500.0,
            currency: "USD".to_string(),
            description: "consulting invoice".to_string(),
            customer_name: "Acme Consulting".to_string(),
            account_type: AccountType::Business,
            risk_rating: RiskRating::Low,
            country_to: "US".to_string(),
        }
    }

    fn test_orchestrator() -> Orchestrator {
        let client = Arc::new(AlwaysConcludes {
            usage: Arc::new(Mutex::new(TokenUsage::default())),
        });
        let gateway = Arc::new(LlmGateway::new(client, CacheStore::new(), false, Duration::from_secs(60)));
        let mut config = InvestigatorConfig::default();
        config.timeouts.analysis_deadline = Duration::from_secs(5);
        config.timeouts.reporting_deadline = Duration::from_secs(5);
        config.timeouts.agent_total = Duration::from_secs(5);
        config.timeouts.investigation_total = Duration::from_secs(10);
        Orchestrator::new(
            config,
            Arc::new(ToolRegistry::new()),
            gateway,
            CacheStore::new(),
            Arc::new(ProgressBus::new(256, 64)),
            Arc::new(Metrics::new()),
        )
    }

    #[tokio::test]
    async fn successful_investigation_reaches_completed_with_final_event() {
        let orchestrator = test_orchestrator();
        let (id, _handle) = orchestrator.submit(sample_input()).await.unwrap();
        let mut rx = orchestrator.progress.subscribe(&id).await;

        let mut final_event = None;
        while let Some(event) = rx.recv().await {
            if event.kind == ProgressEventKind::Final {
                final_event = Some(event);
                break;
            }
        }

        let event = final_event.expect("a Final event must always be emitted");
        let investigation = event.payload.expect("Final event carries the compiled Investigation");
        assert_eq!(investigation.status, InvestigationStatus::Completed);
        assert!(investigation.final_report.is_some());
        assert_eq!(investigation.agent_results.len(), 4);
        assert!(investigation.is_status_consistent());
    }

    #[tokio::test]
    async fn invalid_input_is_rejected_before_running() {
        let orchestrator = test_orchestrator();
        let mut input = sample_input();
        input.amount = -1.0;
        let result = orchestrator.submit(input).await;
        assert!(matches!(result, Err(InvestigationError::Input(_))));
    }
}

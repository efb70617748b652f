// src/lib.rs

//! A multi-agent fraud-investigation orchestrator.
//!
//! An [`Investigation`](domain::Investigation) is driven by the
//! [`Orchestrator`](orchestrator::Orchestrator) through four specialized
//! [`Agent`](agent::Agent)s (Regulatory Research, Evidence Collection,
//! Compliance Check, Report Generation). Each agent runs a bounded ReAct
//! loop against an [`LlmGateway`](gateway::LlmGateway), dispatching tools
//! from a [`ToolRegistry`](tool_protocol::ToolRegistry) that is backed by a
//! hybrid BM25/dense [`VectorStore`](vector_store::VectorStore) and a
//! [`CacheStore`](cache::CacheStore). Progress is fanned out to subscribers
//! through the [`ProgressBus`](progress_bus::ProgressBus).

pub mod agent;
pub mod cache;
pub mod client_wrapper;
pub mod clients;
pub mod config;
pub mod domain;
pub mod embeddings;
pub mod error;
pub mod gateway;
pub mod metrics;
pub mod orchestrator;
pub mod progress_bus;
#[cfg(feature = "server")]
pub mod server;
pub mod tool_protocol;
pub mod tools;
pub mod vector_store;

pub use agent::Agent;
pub use config::InvestigatorConfig;
pub use domain::{AgentResult, Investigation, ProgressEvent, ToolInvocation, TransactionInput};
pub use error::InvestigationError;
pub use orchestrator::Orchestrator;

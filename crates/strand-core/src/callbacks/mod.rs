//! Lifecycle callbacks.
//!
//! A [`CallbackHandler`] observes model calls, pipeline stages, tool calls,
//! agent decisions and retrievals. Every hook has an empty default body, so a
//! handler only spells out the events it cares about. Hooks are synchronous
//! and must not panic: the [`CallbackManager`] calls handlers one after
//! another in registration order with no isolation between them.

mod manager;
mod tracing_handler;

pub use manager::CallbackManager;
pub use tracing_handler::TracingHandler;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::RunError;
use crate::ids::RunId;
use crate::messages::{AiMessage, Document, Message};

/// Identity of the run a start event belongs to.
#[derive(Clone, Copy, Debug)]
pub struct RunInfo<'a> {
    /// This run.
    pub run_id: &'a RunId,
    /// The enclosing run, if nested.
    pub parent_run_id: Option<&'a RunId>,
    /// Display name of the unit.
    pub name: &'a str,
    /// Tags carried by the config.
    pub tags: &'a [String],
}

/// Payload of an agent-action event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionEvent {
    /// Tool the agent chose.
    pub tool: String,
    /// Raw input for the tool.
    pub tool_input: String,
    /// Planner rationale.
    pub log: String,
}

/// Payload of an agent-finish event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FinishEvent {
    /// Values the agent returns.
    pub return_values: serde_json::Map<String, Value>,
    /// Final rationale.
    pub log: String,
}

/// Result of one model call.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmResult {
    /// Replies produced by the call.
    pub generations: Vec<AiMessage>,
}

/// Observer of lifecycle events.
#[allow(unused_variables)]
pub trait CallbackHandler: Send + Sync {
    // Model calls
    /// A completion model was called with these prompts.
    fn on_llm_start(&self, run: &RunInfo<'_>, prompts: &[String]) {}
    /// A chat model was called with these messages.
    fn on_chat_model_start(&self, run: &RunInfo<'_>, messages: &[Message]) {}
    /// A streamed model produced a token.
    fn on_llm_new_token(&self, run_id: &RunId, token: &str) {}
    /// A model call finished.
    fn on_llm_end(&self, run_id: &RunId, result: &LlmResult) {}
    /// A model call failed.
    fn on_llm_error(&self, run_id: &RunId, error: &RunError) {}

    // Pipeline stages
    /// A pipeline unit started.
    fn on_chain_start(&self, run: &RunInfo<'_>, inputs: &Value) {}
    /// A pipeline unit finished.
    fn on_chain_end(&self, run_id: &RunId, outputs: &Value) {}
    /// A pipeline unit failed.
    fn on_chain_error(&self, run_id: &RunId, error: &RunError) {}

    // Tools
    /// A tool was called.
    fn on_tool_start(&self, run: &RunInfo<'_>, tool: &str, input: &str) {}
    /// A tool returned.
    fn on_tool_end(&self, run_id: &RunId, output: &str) {}
    /// A tool failed.
    fn on_tool_error(&self, run_id: &RunId, error: &RunError) {}

    // Agent
    /// The agent chose a tool.
    fn on_agent_action(&self, run_id: &RunId, action: &ActionEvent) {}
    /// The agent produced its final answer.
    fn on_agent_finish(&self, run_id: &RunId, finish: &FinishEvent) {}

    // Retrieval
    /// A retriever was queried.
    fn on_retriever_start(&self, run: &RunInfo<'_>, query: &str) {}
    /// A retriever returned documents.
    fn on_retriever_end(&self, run_id: &RunId, documents: &[Document]) {}
    /// A retriever failed.
    fn on_retriever_error(&self, run_id: &RunId, error: &RunError) {}

    /// Free-form text worth surfacing.
    fn on_text(&self, run_id: &RunId, text: &str) {}
}

/// Handler that ignores every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopHandler;

impl CallbackHandler for NoopHandler {}

//! Callback handler backed by `tracing`.

use serde_json::Value;
use tracing::{debug, info, trace, warn};

use super::{ActionEvent, CallbackHandler, FinishEvent, LlmResult, RunInfo};
use crate::errors::RunError;
use crate::ids::RunId;
use crate::messages::{Document, Message};

/// Turns every lifecycle event into a `tracing` event under the
/// `strand::callbacks` target.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingHandler;

impl CallbackHandler for TracingHandler {
    fn on_llm_start(&self, run: &RunInfo<'_>, prompts: &[String]) {
        debug!(target: "strand::callbacks", run_id = %run.run_id, name = run.name, prompts = prompts.len(), "llm start");
    }

    fn on_chat_model_start(&self, run: &RunInfo<'_>, messages: &[Message]) {
        debug!(target: "strand::callbacks", run_id = %run.run_id, name = run.name, messages = messages.len(), "chat model start");
    }

    fn on_llm_new_token(&self, run_id: &RunId, token: &str) {
        trace!(target: "strand::callbacks", %run_id, token, "llm token");
    }

    fn on_llm_end(&self, run_id: &RunId, result: &LlmResult) {
        debug!(target: "strand::callbacks", %run_id, generations = result.generations.len(), "llm end");
    }

    fn on_llm_error(&self, run_id: &RunId, error: &RunError) {
        warn!(target: "strand::callbacks", %run_id, kind = error.kind(), %error, "llm error");
    }

    fn on_chain_start(&self, run: &RunInfo<'_>, _inputs: &Value) {
        debug!(
            target: "strand::callbacks",
            run_id = %run.run_id,
            parent_run_id = run.parent_run_id.map(RunId::as_str),
            name = run.name,
            "chain start"
        );
    }

    fn on_chain_end(&self, run_id: &RunId, _outputs: &Value) {
        debug!(target: "strand::callbacks", %run_id, "chain end");
    }

    fn on_chain_error(&self, run_id: &RunId, error: &RunError) {
        warn!(target: "strand::callbacks", %run_id, kind = error.kind(), %error, "chain error");
    }

    fn on_tool_start(&self, run: &RunInfo<'_>, tool: &str, input: &str) {
        debug!(target: "strand::callbacks", run_id = %run.run_id, tool, input_len = input.len(), "tool start");
    }

    fn on_tool_end(&self, run_id: &RunId, output: &str) {
        debug!(target: "strand::callbacks", %run_id, output_len = output.len(), "tool end");
    }

    fn on_tool_error(&self, run_id: &RunId, error: &RunError) {
        warn!(target: "strand::callbacks", %run_id, %error, "tool error");
    }

    fn on_agent_action(&self, run_id: &RunId, action: &ActionEvent) {
        info!(target: "strand::callbacks", %run_id, tool = %action.tool, "agent action");
    }

    fn on_agent_finish(&self, run_id: &RunId, finish: &FinishEvent) {
        info!(target: "strand::callbacks", %run_id, keys = finish.return_values.len(), "agent finish");
    }

    fn on_retriever_start(&self, run: &RunInfo<'_>, query: &str) {
        debug!(target: "strand::callbacks", run_id = %run.run_id, query, "retriever start");
    }

    fn on_retriever_end(&self, run_id: &RunId, documents: &[Document]) {
        debug!(target: "strand::callbacks", %run_id, documents = documents.len(), "retriever end");
    }

    fn on_retriever_error(&self, run_id: &RunId, error: &RunError) {
        warn!(target: "strand::callbacks", %run_id, %error, "retriever error");
    }

    fn on_text(&self, run_id: &RunId, text: &str) {
        debug!(target: "strand::callbacks", %run_id, text, "text");
    }
}

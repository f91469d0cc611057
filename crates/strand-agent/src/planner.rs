//! The planner contract and helpers shared by the built-in planners.

use async_trait::async_trait;
use serde_json::Value;

use strand_core::callbacks::LlmResult;
use strand_core::{
    AiMessage, CallbackHandler, ChatModel, Message, Result, RunConfig, RunError, Variables,
};

use crate::types::{AgentOutput, AgentStep};

/// Decides the next move of an agent.
///
/// `steps` is the full step log of the current execution, oldest first. A
/// planner must not keep state between calls; everything it needs to
/// reconstruct the history is in `steps` and `inputs`.
#[async_trait]
pub trait Planner: Send + Sync {
    /// Choose the next actions, or finish, given the step log so far.
    async fn plan(
        &self,
        steps: &[AgentStep],
        inputs: &Variables,
        config: &RunConfig,
    ) -> Result<AgentOutput>;

    /// Input keys the planner reads.
    fn input_keys(&self) -> Vec<String> {
        vec!["input".to_string()]
    }

    /// Keys a finish carries.
    fn output_keys(&self) -> Vec<String> {
        vec!["output".to_string()]
    }
}

/// Call a chat model under a child run, reporting it to the callbacks.
pub(crate) async fn call_model(
    model: &dyn ChatModel,
    messages: Vec<Message>,
    config: &RunConfig,
) -> Result<AiMessage> {
    let callbacks = config.callbacks();
    callbacks.on_chat_model_start(&config.run_info(model.name()), &messages);
    match model.invoke(messages, config).await {
        Ok(reply) => {
            callbacks.on_llm_end(
                config.run_id(),
                &LlmResult {
                    generations: vec![reply.clone()],
                },
            );
            Ok(reply)
        }
        Err(e) => {
            callbacks.on_llm_error(config.run_id(), &e);
            Err(e)
        }
    }
}

/// The planner's primary input rendered as text.
pub(crate) fn input_text(inputs: &Variables, key: &str) -> Result<String> {
    match inputs.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Ok(other.to_string()),
        None => Err(RunError::InvalidPlan(format!("missing input key {key:?}"))),
    }
}

//! Planner for models with native tool calling.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use strand_core::{AiMessage, ChatModel, Message, Result, RunConfig, ToolCall, ToolCallId, Variables};
use strand_tools::ToolRegistry;

use crate::planner::{Planner, call_model, input_text};
use crate::types::{AgentAction, AgentFinish, AgentOutput, AgentStep};

/// Asks a tool-bound model what to do next.
///
/// Every tool call in the reply becomes one action; a reply without tool
/// calls is the final answer.
pub struct ToolCallingPlanner {
    model: Arc<dyn ChatModel>,
    system_prompt: Option<String>,
}

impl ToolCallingPlanner {
    /// Bind the registry's tool definitions to `model`.
    pub fn new(model: &dyn ChatModel, tools: &ToolRegistry) -> Self {
        Self {
            model: model.bind_tools(&tools.definitions()),
            system_prompt: None,
        }
    }

    /// Prepend a system message to every model call.
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    fn messages(&self, steps: &[AgentStep], inputs: &Variables) -> Result<Vec<Message>> {
        let mut messages = Vec::with_capacity(2 + steps.len() * 2);
        if let Some(prompt) = &self.system_prompt {
            messages.push(Message::system(prompt.clone()));
        }
        messages.push(Message::human(input_text(inputs, "input")?));
        messages.extend(scratchpad(steps));
        Ok(messages)
    }
}

#[async_trait]
impl Planner for ToolCallingPlanner {
    async fn plan(
        &self,
        steps: &[AgentStep],
        inputs: &Variables,
        config: &RunConfig,
    ) -> Result<AgentOutput> {
        let messages = self.messages(steps, inputs)?;
        let model_config = config.child(Some("tool_calling:model"))?;
        let reply = call_model(self.model.as_ref(), messages, &model_config).await?;
        debug!(tool_calls = reply.tool_calls.len(), "tool-calling model replied");
        Ok(interpret(reply))
    }
}

fn interpret(reply: AiMessage) -> AgentOutput {
    if reply.tool_calls.is_empty() {
        let content = reply.content.clone();
        return AgentOutput::Finish(
            AgentFinish::output(content.clone(), content).with_message_log(vec![Message::Ai(reply)]),
        );
    }

    let message_log = vec![Message::Ai(reply.clone())];
    let actions = reply
        .tool_calls
        .into_iter()
        .map(|call| {
            let input = match call.arguments {
                Value::String(s) => s,
                other => other.to_string(),
            };
            AgentAction::new(call.name.clone(), input, format!("Calling tool: {}", call.name))
                .with_message_log(message_log.clone())
                .with_tool_call_id(call.id)
        })
        .collect();
    AgentOutput::Actions(actions)
}

/// The id the model gave this call, or a synthetic one for actions that
/// did not come from a tool-call reply.
fn call_id(action: &AgentAction) -> ToolCallId {
    if let Some(id) = &action.tool_call_id {
        return id.clone();
    }
    let matching: Vec<&ToolCall> = action
        .message_log
        .iter()
        .filter_map(|message| match message {
            Message::Ai(ai) => Some(&ai.tool_calls),
            _ => None,
        })
        .flatten()
        .filter(|call| call.name == action.tool)
        .collect();
    match matching.as_slice() {
        [only] => only.id.clone(),
        _ => ToolCallId::from_raw(format!("call_{}", action.tool)),
    }
}

/// Previous steps as (assistant tool call, tool result) message pairs.
pub fn scratchpad(steps: &[AgentStep]) -> Vec<Message> {
    let mut messages = Vec::with_capacity(steps.len() * 2);
    for step in steps {
        let arguments = serde_json::from_str::<Value>(&step.action.tool_input)
            .unwrap_or_else(|_| json!({ "input": step.action.tool_input }));
        let id = call_id(&step.action);
        messages.push(Message::Ai(AiMessage::with_tool_calls(
            "",
            vec![ToolCall {
                id: id.clone(),
                name: step.action.tool.clone(),
                arguments,
            }],
        )));
        messages.push(Message::tool(id, step.observation.clone()));
    }
    messages
}

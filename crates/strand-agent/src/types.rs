//! Agent data model: what a planner decides and what the loop records.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use strand_core::callbacks::{ActionEvent, FinishEvent};
use strand_core::{Message, ToolCallId, Variables};

/// A request to run one tool.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentAction {
    /// Name of the tool to run.
    pub tool: String,
    /// Raw input handed to the tool, often JSON.
    pub tool_input: String,
    /// The planner's rationale.
    pub log: String,
    /// Messages that produced this action.
    #[serde(skip)]
    pub message_log: Vec<Message>,
    /// Id of the model tool call this action answers, when there was one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<ToolCallId>,
}

impl AgentAction {
    /// An action with no message log.
    pub fn new(
        tool: impl Into<String>,
        tool_input: impl Into<String>,
        log: impl Into<String>,
    ) -> Self {
        Self {
            tool: tool.into(),
            tool_input: tool_input.into(),
            log: log.into(),
            message_log: Vec::new(),
            tool_call_id: None,
        }
    }

    /// Attach the messages that produced this action.
    #[must_use]
    pub fn with_message_log(mut self, messages: Vec<Message>) -> Self {
        self.message_log = messages;
        self
    }

    /// Record the model tool call this action answers.
    #[must_use]
    pub fn with_tool_call_id(mut self, id: ToolCallId) -> Self {
        self.tool_call_id = Some(id);
        self
    }

    pub(crate) fn to_event(&self) -> ActionEvent {
        ActionEvent {
            tool: self.tool.clone(),
            tool_input: self.tool_input.clone(),
            log: self.log.clone(),
        }
    }
}

/// The planner's final answer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentFinish {
    /// Values the agent returns.
    pub return_values: Variables,
    /// The planner's rationale.
    pub log: String,
    /// Messages that produced the answer.
    #[serde(skip)]
    pub message_log: Vec<Message>,
}

impl AgentFinish {
    /// A finish with no message log.
    pub fn new(return_values: Variables, log: impl Into<String>) -> Self {
        Self {
            return_values,
            log: log.into(),
            message_log: Vec::new(),
        }
    }

    /// A finish carrying a single `"output"` value.
    pub fn output(text: impl Into<String>, log: impl Into<String>) -> Self {
        let mut values = Variables::new();
        let _ = values.insert("output".to_string(), Value::String(text.into()));
        Self::new(values, log)
    }

    /// Attach the messages that produced this answer.
    #[must_use]
    pub fn with_message_log(mut self, messages: Vec<Message>) -> Self {
        self.message_log = messages;
        self
    }

    pub(crate) fn to_event(&self, return_values: &Variables) -> FinishEvent {
        FinishEvent {
            return_values: return_values.clone(),
            log: self.log.clone(),
        }
    }
}

/// One planner decision.
///
/// `Actions` must be non-empty; the executor rejects an empty list.
#[derive(Clone, Debug, PartialEq)]
pub enum AgentOutput {
    /// Run these tools, in order.
    Actions(Vec<AgentAction>),
    /// Stop and return.
    Finish(AgentFinish),
}

impl AgentOutput {
    /// Shorthand for a single action.
    pub fn action(action: AgentAction) -> Self {
        Self::Actions(vec![action])
    }

    /// A finish whose `"output"` and log are both `text`.
    pub fn answer(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::Finish(AgentFinish::output(text.clone(), text))
    }

    /// True for a final answer.
    pub fn is_finish(&self) -> bool {
        matches!(self, Self::Finish(_))
    }
}

/// One completed action and what it produced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentStep {
    /// What was run.
    pub action: AgentAction,
    /// What the tool returned, or why it failed.
    pub observation: String,
}

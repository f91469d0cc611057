//! Text-protocol planner: the model reasons in `Thought:` / `Action:` /
//! `Action Input:` lines and ends with `Final Answer:`.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use strand_core::{ChatModel, Message, Result, RunConfig, RunError, Variables};
use strand_tools::ToolRegistry;

use crate::planner::{Planner, call_model, input_text};
use crate::types::{AgentAction, AgentFinish, AgentOutput, AgentStep};

/// Stop sequence that keeps the model from inventing its own observations.
pub const OBSERVATION_STOP: &str = "\nObservation:";

/// Default system prompt. `{tools}` and `{tool_names}` are filled in per call.
pub const DEFAULT_REACT_PROMPT: &str = "Answer the following questions as best you can. \
You have access to the following tools:

{tools}

Use the following format:

Question: the input question you must answer
Thought: you should always think about what to do
Action: the action to take, should be one of [{tool_names}]
Action Input: the input to the action
Observation: the result of the action
... (this Thought/Action/Action Input/Observation can repeat N times)
Thought: I now know the final answer
Final Answer: the final answer to the original input question

Begin!";

static ACTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Action\s*:\s*(.+?)(?:\n|$)").unwrap());
static ACTION_INPUT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Action\s*Input\s*:\s*(.+?)(?:\n|$)").unwrap());
static FINAL_ANSWER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Final\s*Answer\s*:\s*(.+)").unwrap());

/// Planner for text models that follow the ReAct format.
pub struct ReActPlanner {
    model: Arc<dyn ChatModel>,
    tools: ToolRegistry,
    prompt: String,
}

impl ReActPlanner {
    /// A planner using the default prompt.
    pub fn new(model: Arc<dyn ChatModel>, tools: ToolRegistry) -> Self {
        Self {
            model,
            tools,
            prompt: DEFAULT_REACT_PROMPT.to_string(),
        }
    }

    /// Replace the system prompt. `{tools}` and `{tool_names}` placeholders
    /// are substituted.
    #[must_use]
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    fn messages(&self, steps: &[AgentStep], inputs: &Variables) -> Result<Vec<Message>> {
        let system = self
            .prompt
            .replace("{tools}", &self.tools.render_descriptions())
            .replace("{tool_names}", &self.tools.names().join(", "));
        let mut messages = vec![Message::system(system)];
        if !steps.is_empty() {
            messages.push(Message::ai(scratchpad(steps)));
        }
        messages.push(Message::human(input_text(inputs, "input")?));
        Ok(messages)
    }
}

#[async_trait]
impl Planner for ReActPlanner {
    async fn plan(
        &self,
        steps: &[AgentStep],
        inputs: &Variables,
        config: &RunConfig,
    ) -> Result<AgentOutput> {
        let messages = self.messages(steps, inputs)?;
        let model_config = config
            .child(Some("react:model"))?
            .to_builder()
            .with_stop([OBSERVATION_STOP])
            .build();
        let reply = call_model(self.model.as_ref(), messages, &model_config).await?;
        debug!(chars = reply.content.len(), "react model replied");
        parse_output(&reply.content)
    }
}

/// Previous steps as the model's own transcript.
pub fn scratchpad(steps: &[AgentStep]) -> String {
    let mut out = String::new();
    for step in steps {
        out.push_str(&step.action.log);
        out.push_str("\nObservation: ");
        out.push_str(&step.observation);
        out.push_str("\nThought: ");
    }
    out
}

/// Parse a model reply. A final answer wins over an action when both appear.
pub fn parse_output(text: &str) -> Result<AgentOutput> {
    if let Some(answer) = FINAL_ANSWER.captures(text).and_then(|c| c.get(1)) {
        return Ok(AgentOutput::Finish(AgentFinish::output(
            answer.as_str().trim(),
            text,
        )));
    }

    if let Some(tool) = ACTION.captures(text).and_then(|c| c.get(1)) {
        let input = ACTION_INPUT
            .captures(text)
            .and_then(|c| c.get(1))
            .map_or("", |m| m.as_str().trim());
        return Ok(AgentOutput::action(AgentAction::new(
            tool.as_str().trim(),
            input,
            text,
        )));
    }

    Err(RunError::OutputParse(format!("{text:?}")))
}

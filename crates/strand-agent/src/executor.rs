//! The plan → act → observe loop.
//!
//! Each call owns its step log. Per iteration the loop checks cancellation,
//! asks the planner for a decision, and either returns the finish or runs the
//! requested actions one after another, recording an observation for each.
//! Unknown tools and failing tools become observations; only planner
//! failures, cancellation and an exhausted iteration budget end the call
//! with an error.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use strand_core::{CallbackHandler, Result, RunConfig, RunError, Runnable, Variables};
use strand_tools::{RunnableTool, ToolRegistry};

use crate::planner::Planner;
use crate::types::{AgentAction, AgentOutput, AgentStep};

/// Tool name recorded for a step that captures a planner failure.
pub const PARSING_ERROR_TOOL: &str = "_error";
/// Key the step log is returned under when requested.
pub const INTERMEDIATE_STEPS_KEY: &str = "intermediate_steps";

/// Runs a [`Planner`] against a set of tools until it finishes.
pub struct AgentExecutor {
    planner: Arc<dyn Planner>,
    tools: ToolRegistry,
    max_iterations: usize,
    return_intermediate_steps: bool,
    handle_parsing_errors: bool,
    name: Option<String>,
}

impl AgentExecutor {
    /// Build an executor with defaults taken from the process settings.
    pub fn new(planner: Arc<dyn Planner>, tools: ToolRegistry) -> Self {
        let settings = strand_settings::get_settings();
        Self {
            planner,
            tools,
            max_iterations: settings.agent.max_iterations,
            return_intermediate_steps: settings.agent.return_intermediate_steps,
            handle_parsing_errors: settings.agent.handle_parsing_errors,
            name: None,
        }
    }

    /// Planner calls allowed per execution. A per-call
    /// [`RunConfig::max_iterations`] takes precedence.
    #[must_use]
    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n.max(1);
        self
    }

    /// Include the step log under `intermediate_steps`.
    #[must_use]
    pub fn with_return_intermediate_steps(mut self, enabled: bool) -> Self {
        self.return_intermediate_steps = enabled;
        self
    }

    /// Record planner failures as observations and keep going.
    #[must_use]
    pub fn with_handle_parsing_errors(mut self, enabled: bool) -> Self {
        self.handle_parsing_errors = enabled;
        self
    }

    /// Name reported in callbacks.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Tools the agent can call.
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Iteration budget when the call sets none.
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    fn available_tools(&self) -> String {
        self.tools.names().join(", ")
    }

    #[instrument(skip_all, fields(run_id = %config.run_id(), agent = self.name()))]
    async fn run_loop(&self, inputs: &Variables, config: &RunConfig) -> Result<Variables> {
        let limit = config.max_iterations().unwrap_or(self.max_iterations);
        let callbacks = config.callbacks();
        let mut steps: Vec<AgentStep> = Vec::new();

        for iteration in 0..limit {
            config.check_cancelled()?;
            debug!(iteration, steps = steps.len(), "planning");

            let output = match self.plan(&steps, inputs, config).await {
                Ok(output) => output,
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) if self.handle_parsing_errors => {
                    warn!(iteration, error = %e, "planner failed, asking it to retry");
                    steps.push(AgentStep {
                        action: AgentAction::new(PARSING_ERROR_TOOL, "", e.to_string()),
                        observation: format!("Error: {e}. Please try again with valid output."),
                    });
                    continue;
                }
                Err(e) => return Err(RunError::Planning(Box::new(e))),
            };

            match output {
                AgentOutput::Finish(finish) => {
                    let values = self.finish_values(finish.return_values.clone(), &steps)?;
                    info!(iteration, steps = steps.len(), "agent finished");
                    callbacks.on_agent_finish(config.run_id(), &finish.to_event(&values));
                    return Ok(values);
                }
                AgentOutput::Actions(actions) => {
                    for action in actions {
                        let observation = self.act(&action, config).await;
                        steps.push(AgentStep {
                            action,
                            observation,
                        });
                    }
                }
            }
        }

        warn!(limit, "agent hit iteration limit");
        Err(RunError::IterationLimitExceeded { limit })
    }

    async fn plan(
        &self,
        steps: &[AgentStep],
        inputs: &Variables,
        config: &RunConfig,
    ) -> Result<AgentOutput> {
        let child = config.child(Some("agent:plan"))?;
        let output = self.planner.plan(steps, inputs, &child).await?;
        match output {
            AgentOutput::Actions(ref actions) if actions.is_empty() => Err(RunError::InvalidPlan(
                "planner returned no actions and no finish".into(),
            )),
            output => Ok(output),
        }
    }

    /// Run one action and describe the outcome.
    async fn act(&self, action: &AgentAction, config: &RunConfig) -> String {
        config
            .callbacks()
            .on_agent_action(config.run_id(), &action.to_event());

        let Some(tool) = self.tools.get(&action.tool) else {
            warn!(tool = %action.tool, "planner requested an unknown tool");
            return format!(
                "Tool {:?} not found. Available tools: {}",
                action.tool,
                self.available_tools()
            );
        };

        let result = RunnableTool::new(tool)
            .invoke(action.tool_input.clone(), config)
            .await;
        match result {
            Ok(output) => output,
            Err(e) => {
                warn!(tool = %action.tool, error = %e, "tool failed, recording observation");
                match e {
                    RunError::Tool { name, message } => {
                        format!("Error executing tool {name}: {message}")
                    }
                    other => format!("Error executing tool {}: {other}", action.tool),
                }
            }
        }
    }

    fn finish_values(&self, mut values: Variables, steps: &[AgentStep]) -> Result<Variables> {
        if self.return_intermediate_steps {
            let _ = values.insert(
                INTERMEDIATE_STEPS_KEY.to_string(),
                serde_json::to_value(steps)?,
            );
        }
        Ok(values)
    }
}

impl std::fmt::Debug for AgentExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentExecutor")
            .field("name", &self.name())
            .field("tools", &self.tools.names())
            .field("max_iterations", &self.max_iterations)
            .field("return_intermediate_steps", &self.return_intermediate_steps)
            .field("handle_parsing_errors", &self.handle_parsing_errors)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Runnable<Variables, Variables> for AgentExecutor {
    fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("AgentExecutor")
    }

    async fn invoke(&self, inputs: Variables, config: &RunConfig) -> Result<Variables> {
        let callbacks = config.callbacks();
        callbacks.on_chain_start(&config.run_info(self.name()), &Value::Object(inputs.clone()));
        let result = self.run_loop(&inputs, config).await;
        match &result {
            Ok(values) => callbacks.on_chain_end(config.run_id(), &Value::Object(values.clone())),
            Err(e) => callbacks.on_chain_error(config.run_id(), e),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use parking_lot::Mutex;
    use strand_tools::{FnTool, ToolError};

    /// Replays a fixed list of decisions, then repeats the last one.
    struct Scripted {
        script: Mutex<Vec<Result<AgentOutput>>>,
        seen: Mutex<Vec<usize>>,
    }

    impl Scripted {
        fn new(script: Vec<Result<AgentOutput>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into_iter().rev().collect()),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Planner for Scripted {
        async fn plan(&self, steps: &[AgentStep], _: &Variables, _: &RunConfig) -> Result<AgentOutput> {
            self.seen.lock().push(steps.len());
            self.script
                .lock()
                .pop()
                .unwrap_or_else(|| Err(RunError::Internal("script exhausted".into())))
        }
    }

    fn call(tool: &str, input: &str) -> Result<AgentOutput> {
        Ok(AgentOutput::action(AgentAction::new(tool, input, format!("use {tool}"))))
    }

    fn tools() -> ToolRegistry {
        ToolRegistry::new()
            .with_tool(Arc::new(FnTool::new("echo", "Echo input", |s: String| async move {
                Ok(s)
            })))
            .with_tool(Arc::new(FnTool::new("fail", "Always fails", |_: String| async move {
                Err(ToolError::ExecutionFailed("boom".into()))
            })))
    }

    fn input() -> Variables {
        let mut v = Variables::new();
        let _ = v.insert("input".into(), Value::from("question"));
        v
    }

    #[tokio::test]
    async fn tool_failure_becomes_observation() {
        let planner = Scripted::new(vec![call("fail", "x"), Ok(AgentOutput::answer("done"))]);
        let exec = AgentExecutor::new(planner.clone(), tools()).with_return_intermediate_steps(true);
        let out = exec.invoke(input(), &RunConfig::default()).await.unwrap();
        assert_eq!(
            out[INTERMEDIATE_STEPS_KEY][0]["observation"],
            "Error executing tool fail: execution failed: boom"
        );
        assert_eq!(*planner.seen.lock(), vec![0, 1]);
    }

    #[tokio::test]
    async fn unknown_tool_lists_available() {
        let planner = Scripted::new(vec![call("nope", ""), Ok(AgentOutput::answer("ok"))]);
        let exec = AgentExecutor::new(planner, tools()).with_return_intermediate_steps(true);
        let out = exec.invoke(input(), &RunConfig::default()).await.unwrap();
        assert_eq!(
            out[INTERMEDIATE_STEPS_KEY][0]["observation"],
            r#"Tool "nope" not found. Available tools: echo, fail"#
        );
    }

    #[tokio::test]
    async fn empty_actions_is_a_planning_failure() {
        let planner = Scripted::new(vec![Ok(AgentOutput::Actions(Vec::new()))]);
        let exec = AgentExecutor::new(planner, tools()).with_handle_parsing_errors(false);
        let err = exec.invoke(input(), &RunConfig::default()).await.unwrap_err();
        assert_matches!(err, RunError::Planning(inner) if matches!(*inner, RunError::InvalidPlan(_)));
    }

    #[tokio::test]
    async fn parsing_errors_are_retried_within_budget() {
        let planner = Scripted::new(vec![
            Err(RunError::OutputParse("gibberish".into())),
            Ok(AgentOutput::answer("recovered")),
        ]);
        let exec = AgentExecutor::new(planner.clone(), tools())
            .with_handle_parsing_errors(true)
            .with_return_intermediate_steps(true);
        let out = exec.invoke(input(), &RunConfig::default()).await.unwrap();
        assert_eq!(out["output"], "recovered");
        let step = &out[INTERMEDIATE_STEPS_KEY][0];
        assert_eq!(step["action"]["tool"], PARSING_ERROR_TOOL);
        assert_eq!(
            step["observation"],
            "Error: could not parse model output: gibberish. Please try again with valid output."
        );
    }

    #[tokio::test]
    async fn parsing_retries_consume_iterations() {
        let planner = Scripted::new(vec![
            Err(RunError::OutputParse("a".into())),
            Err(RunError::OutputParse("b".into())),
            Ok(AgentOutput::answer("too late")),
        ]);
        let exec = AgentExecutor::new(planner, tools())
            .with_handle_parsing_errors(true)
            .with_max_iterations(2);
        assert_matches!(
            exec.invoke(input(), &RunConfig::default()).await,
            Err(RunError::IterationLimitExceeded { limit: 2 })
        );
    }

    #[tokio::test]
    async fn config_iteration_budget_wins() {
        let planner = Scripted::new((0..10).map(|_| call("echo", "again")).collect());
        let exec = AgentExecutor::new(planner.clone(), tools()).with_max_iterations(8);
        let config = RunConfig::builder().with_max_iterations(2).build();
        assert_matches!(
            exec.invoke(input(), &config).await,
            Err(RunError::IterationLimitExceeded { limit: 2 })
        );
        assert_eq!(planner.seen.lock().len(), 2);
    }

    #[test]
    fn debug_lists_tools() {
        let exec = AgentExecutor::new(Scripted::new(Vec::new()), tools()).with_name("helper");
        let rendered = format!("{exec:?}");
        assert!(rendered.contains("helper"));
        assert!(rendered.contains("echo"));
    }
}

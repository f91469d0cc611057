//! The tool contract and the context a tool runs with.

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use strand_core::{RunConfig, RunError, RunId, ToolDefinition};

/// Context available to a tool while it runs.
#[derive(Clone, Debug)]
pub struct ToolContext {
    config: RunConfig,
}

impl ToolContext {
    /// Wrap the config of the tool's own run.
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    /// Config of the tool's run.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Id of the tool's run.
    pub fn run_id(&self) -> &RunId {
        self.config.run_id()
    }

    /// Id of the run that called the tool.
    pub fn parent_run_id(&self) -> Option<&RunId> {
        self.config.parent_run_id()
    }

    /// Token that fires when the caller cancels.
    pub fn cancellation(&self) -> &CancellationToken {
        self.config.cancellation()
    }

    /// True once the caller has cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.config.is_cancelled()
    }
}

/// Schema used when a tool takes a single free-text input.
pub fn string_input_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "input": { "type": "string" }
        },
        "required": ["input"]
    })
}

/// Trait implemented by each tool.
///
/// The input is the raw string chosen by the planner, often JSON.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name the planner calls the tool by.
    fn name(&self) -> &str;
    /// What the tool does, shown to the model.
    fn description(&self) -> &str;

    /// JSON schema of the input.
    fn args_schema(&self) -> Value {
        string_input_schema()
    }

    /// Run the tool on the planner's raw input.
    async fn run(&self, input: &str, ctx: &ToolContext) -> Result<String, ToolError>;

    /// Definition handed to tool-calling models.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.args_schema(),
        }
    }
}

/// Failure reported by a tool.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// The input could not be used.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The tool ran and failed.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),
    /// The call was cancelled.
    #[error("cancelled")]
    Cancelled,
}

impl ToolError {
    /// Convert into the contract error, naming the tool.
    pub fn into_run_error(self, tool: &str) -> RunError {
        match self {
            Self::Cancelled => RunError::Cancelled,
            other => RunError::Tool {
                name: tool.to_string(),
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Repeats its input"
        }

        async fn run(&self, input: &str, _ctx: &ToolContext) -> Result<String, ToolError> {
            Ok(input.to_string())
        }
    }

    #[test]
    fn definition_uses_default_schema() {
        let def = Echo.to_definition();
        assert_eq!(def.name, "echo");
        assert_eq!(def.description, "Repeats its input");
        assert_eq!(def.parameters["required"][0], "input");
    }

    #[tokio::test]
    async fn context_exposes_run_identity() {
        let parent = RunConfig::default();
        let ctx = ToolContext::new(parent.child(Some("echo")).unwrap());
        assert_eq!(ctx.parent_run_id(), Some(parent.run_id()));
        assert!(!ctx.is_cancelled());
        assert_eq!(Echo.run("hi", &ctx).await.unwrap(), "hi");
    }

    #[test]
    fn error_conversion() {
        assert_matches!(ToolError::Cancelled.into_run_error("t"), RunError::Cancelled);
        let err = ToolError::ExecutionFailed("disk full".into()).into_run_error("writer");
        assert_eq!(err.to_string(), "tool writer: execution failed: disk full");
    }
}

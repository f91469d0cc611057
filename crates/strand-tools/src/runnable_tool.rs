//! Adapter running a tool as a pipeline unit.

use std::sync::Arc;

use async_trait::async_trait;

use strand_core::{CallbackHandler, Result, RunConfig, RunError, Runnable};

use crate::traits::{Tool, ToolContext};

/// Any tool as a `Runnable<String, String>`, so it can sit inside a pipeline.
///
/// Each call runs under a child config and reports tool start/end/error to
/// the caller's callbacks.
pub struct RunnableTool {
    tool: Arc<dyn Tool>,
}

impl RunnableTool {
    /// Wrap a shared tool.
    pub fn new(tool: Arc<dyn Tool>) -> Self {
        Self { tool }
    }
}

#[async_trait]
impl Runnable<String, String> for RunnableTool {
    fn name(&self) -> &str {
        self.tool.name()
    }

    async fn invoke(&self, input: String, config: &RunConfig) -> Result<String> {
        config.check_cancelled()?;
        let name = self.tool.name();
        let child = config.child(Some(name))?;
        let callbacks = config.callbacks();
        callbacks.on_tool_start(&child.run_info(name), name, &input);

        let ctx = ToolContext::new(child);
        match self.tool.run(&input, &ctx).await {
            Ok(output) => {
                callbacks.on_tool_end(ctx.run_id(), &output);
                Ok(output)
            }
            Err(e) => {
                let err: RunError = e.into_run_error(name);
                callbacks.on_tool_error(ctx.run_id(), &err);
                Err(err)
            }
        }
    }
}

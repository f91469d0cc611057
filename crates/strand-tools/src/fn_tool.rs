//! Tools built from closures.

use std::future::Future;

use async_trait::async_trait;
use serde_json::Value;

use crate::traits::{Tool, ToolContext, ToolError, string_input_schema};

/// A tool backed by an async closure over the raw input string.
pub struct FnTool<F> {
    name: String,
    description: String,
    schema: Value,
    f: F,
}

impl<F, Fut> FnTool<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, ToolError>> + Send,
{
    /// A tool with the single-string input schema.
    pub fn new(name: impl Into<String>, description: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            schema: string_input_schema(),
            f,
        }
    }

    /// Replace the advertised input schema.
    #[must_use]
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = schema;
        self
    }
}

#[async_trait]
impl<F, Fut> Tool for FnTool<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, ToolError>> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn args_schema(&self) -> Value {
        self.schema.clone()
    }

    async fn run(&self, input: &str, ctx: &ToolContext) -> Result<String, ToolError> {
        if ctx.is_cancelled() {
            return Err(ToolError::Cancelled);
        }
        (self.f)(input.to_string()).await
    }
}

//! Tools with JSON-typed input.

use std::future::Future;
use std::marker::PhantomData;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::traits::{Tool, ToolContext, ToolError};

/// A tool whose raw input is parsed as JSON into `T` before the handler runs.
pub struct TypedTool<T, F> {
    name: String,
    description: String,
    schema: Value,
    f: F,
    _args: PhantomData<fn(T)>,
}

impl<T, F, Fut> TypedTool<T, F>
where
    T: DeserializeOwned + Send,
    F: Fn(T, ToolContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, ToolError>> + Send,
{
    /// `schema` describes `T` for models that bind tools.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        schema: Value,
        f: F,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            schema,
            f,
            _args: PhantomData,
        }
    }
}

#[async_trait]
impl<T, F, Fut> Tool for TypedTool<T, F>
where
    T: DeserializeOwned + Send,
    F: Fn(T, ToolContext) -> Fut + Send + Sync,
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
        let args: T = serde_json::from_str(input).map_err(|e| {
            ToolError::InvalidInput(format!("{} expects JSON arguments: {e}", self.name))
        })?;
        (self.f)(args, ctx.clone()).await
    }
}

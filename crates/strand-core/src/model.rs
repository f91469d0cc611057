//! Chat model contract.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::messages::{AiMessage, Message};
use crate::runnable::Runnable;

/// Tool description handed to a model so it can request calls.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name the model calls it by.
    pub name: String,
    /// What the tool does.
    pub description: String,
    /// JSON schema of the arguments.
    pub parameters: serde_json::Value,
}

/// A chat model: messages in, one assistant message out.
///
/// Provider HTTP clients live outside strand; they plug in by implementing
/// this trait.
pub trait ChatModel: Runnable<Vec<Message>, AiMessage> {
    /// A model that may answer with calls to the given tools.
    fn bind_tools(&self, tools: &[ToolDefinition]) -> Arc<dyn ChatModel>;

    /// A model constrained to answer with JSON matching `schema`.
    fn with_structured_output(&self, schema: serde_json::Value) -> Arc<dyn ChatModel>;
}

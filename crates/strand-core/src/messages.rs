//! Chat messages, tool calls and documents.

use serde::{Deserialize, Serialize};

use crate::ids::ToolCallId;

/// One chat message exchanged with a model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role")]
pub enum Message {
    /// Instructions for the model.
    #[serde(rename = "system")]
    System {
        /// Message text.
        content: String,
    },
    /// Input from the user.
    #[serde(rename = "human")]
    Human {
        /// Message text.
        content: String,
    },
    /// A model reply.
    #[serde(rename = "ai")]
    Ai(AiMessage),
    /// The result of a tool call.
    #[serde(rename = "tool")]
    Tool {
        /// The call this result answers.
        tool_call_id: ToolCallId,
        /// Tool output.
        content: String,
    },
}

impl Message {
    /// A system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::System {
            content: content.into(),
        }
    }

    /// A human message.
    pub fn human(content: impl Into<String>) -> Self {
        Self::Human {
            content: content.into(),
        }
    }

    /// An AI message with text only.
    pub fn ai(content: impl Into<String>) -> Self {
        Self::Ai(AiMessage::text(content))
    }

    /// A tool result for the given call.
    pub fn tool(tool_call_id: ToolCallId, content: impl Into<String>) -> Self {
        Self::Tool {
            tool_call_id,
            content: content.into(),
        }
    }

    /// Text content regardless of role.
    pub fn content(&self) -> &str {
        match self {
            Self::System { content } | Self::Human { content } | Self::Tool { content, .. } => {
                content
            }
            Self::Ai(ai) => &ai.content,
        }
    }

    /// Short role label used when rendering a transcript.
    pub fn role(&self) -> &'static str {
        match self {
            Self::System { .. } => "System",
            Self::Human { .. } => "Human",
            Self::Ai(_) => "AI",
            Self::Tool { .. } => "Tool",
        }
    }
}

/// Assistant reply, optionally requesting tool calls.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AiMessage {
    /// Reply text, possibly empty when tools are called.
    pub content: String,
    /// Tool calls requested by the model.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Token counts, when the model reports them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

impl AiMessage {
    /// A reply without tool calls.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    /// A reply requesting the given tool calls.
    pub fn with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content: content.into(),
            tool_calls,
            usage: None,
        }
    }
}

/// A model's request to run one tool.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Id the tool result must echo back.
    pub id: ToolCallId,
    /// Name of the tool to run.
    pub name: String,
    /// Arguments as produced by the model.
    pub arguments: serde_json::Value,
}

/// Token counts reported by a model call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Prompt tokens.
    pub input_tokens: u32,
    /// Completion tokens.
    pub output_tokens: u32,
}

/// A piece of text with metadata, as returned by a retriever.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Document text.
    pub page_content: String,
    /// Arbitrary metadata from the source.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    /// Source identifier, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Document {
    /// A document with no metadata.
    pub fn new(page_content: impl Into<String>) -> Self {
        Self {
            page_content: page_content.into(),
            ..Self::default()
        }
    }

    /// Add one metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        let _ = self.metadata.insert(key.into(), value);
        self
    }
}

/// Render messages as `Role: content` lines.
pub fn buffer_string(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.role(), m.content()))
        .collect::<Vec<_>>()
        .join("\n")
}

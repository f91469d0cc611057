//! # strand-tools
//!
//! The [`Tool`] contract agents call, the [`ToolRegistry`] they resolve names
//! against, and adapters for building tools from closures ([`FnTool`],
//! [`TypedTool`]) or using them as pipeline stages ([`RunnableTool`]).

#![deny(unsafe_code)]

pub mod fn_tool;
pub mod registry;
pub mod runnable_tool;
pub mod traits;
pub mod typed_tool;

pub use fn_tool::FnTool;
pub use registry::{ToolFilter, ToolRegistry};
pub use runnable_tool::RunnableTool;
pub use traits::{Tool, ToolContext, ToolError, string_input_schema};
pub use typed_tool::TypedTool;


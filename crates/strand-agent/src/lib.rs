//! # strand-agent
//!
//! The plan → act → observe loop for tool-using agents.
//!
//! - [`AgentExecutor`]: drives a [`Planner`] against a
//!   [`ToolRegistry`](strand_tools::ToolRegistry) until it finishes, fails,
//!   or runs out of iterations. It is itself a `Runnable` over JSON maps.
//! - [`ReActPlanner`]: text protocol with `Action:` / `Final Answer:` lines.
//! - [`ToolCallingPlanner`]: native model tool calls.

#![deny(unsafe_code)]

pub mod executor;
pub mod planner;
pub mod react;
pub mod tool_calling;
pub mod types;

pub use executor::{AgentExecutor, INTERMEDIATE_STEPS_KEY, PARSING_ERROR_TOOL};
pub use planner::Planner;
pub use react::{DEFAULT_REACT_PROMPT, OBSERVATION_STOP, ReActPlanner};
pub use tool_calling::ToolCallingPlanner;
pub use types::{AgentAction, AgentFinish, AgentOutput, AgentStep};

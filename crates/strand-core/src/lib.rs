//! # strand-core
//!
//! The execution model shared by every strand component:
//!
//! - [`Runnable`]: the capability contract (`invoke`, `stream`, `batch`, `name`).
//! - [`StreamIterator`]: pull-based consumption of a producer task.
//! - [`RunConfig`]: the immutable per-call config and its builder.
//! - [`callbacks`]: lifecycle observers and their dispatcher.
//! - [`erased`]: object-safe units for pipelines assembled at runtime.
//! - Collaborator interfaces: [`ChatModel`], [`Retriever`], [`Memory`].

#![deny(unsafe_code)]

pub mod callbacks;
pub mod config;
pub mod erased;
pub mod errors;
pub mod ids;
pub mod logging;
pub mod memory;
pub mod messages;
pub mod model;
pub mod retriever;
pub mod runnable;
pub mod stream;

pub use callbacks::{CallbackHandler, CallbackManager, NoopHandler, RunInfo, TracingHandler};
pub use config::{RunConfig, RunConfigBuilder};
pub use erased::{AnyValue, DynRunnable, TypeInfo, erase};
pub use errors::{BoxError, Result, RunError};
pub use ids::{RunId, ToolCallId};
pub use memory::{Memory, Variables};
pub use messages::{AiMessage, Document, Message, TokenUsage, ToolCall};
pub use model::{ChatModel, ToolDefinition};
pub use retriever::Retriever;
pub use runnable::{BoxRunnable, Runnable};
pub use stream::{StreamChunk, StreamIterator, StreamSender};

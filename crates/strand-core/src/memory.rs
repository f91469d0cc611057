//! Memory that carries state between calls.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::errors::Result;

/// Keyed values passed into and out of memory-aware units.
pub type Variables = Map<String, Value>;

/// Conversation state that survives across calls.
#[async_trait]
pub trait Memory: Send + Sync {
    /// Keys [`load_memory_variables`](Self::load_memory_variables) produces.
    fn memory_variables(&self) -> Vec<String>;

    /// Values to merge into the next input.
    async fn load_memory_variables(&self, inputs: &Variables) -> Result<Variables>;

    /// Record one exchange.
    async fn save_context(&self, inputs: &Variables, outputs: &Variables) -> Result<()>;

    /// Forget everything stored so far.
    async fn clear(&self) -> Result<()>;
}

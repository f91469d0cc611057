//! Memory around a map-to-map unit.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use strand_core::{BoxRunnable, Memory, Result, RunConfig, Runnable, Variables};

/// Wraps a map-to-map unit with conversation memory.
///
/// Memory variables are merged over the caller's input before the call (a
/// memory key shadows an input key of the same name). After a successful
/// call the caller's original input and the unit's output are saved.
pub struct WithMemory {
    inner: BoxRunnable<Variables, Variables>,
    memory: Arc<dyn Memory>,
}

impl WithMemory {
    /// Wrap `inner` so each call loads from and saves to `memory`.
    pub fn new<R>(inner: R, memory: Arc<dyn Memory>) -> Self
    where
        R: Runnable<Variables, Variables> + 'static,
    {
        Self {
            inner: Arc::new(inner),
            memory,
        }
    }

    /// The memory this unit reads and writes.
    pub fn memory(&self) -> &Arc<dyn Memory> {
        &self.memory
    }
}

#[async_trait]
impl Runnable<Variables, Variables> for WithMemory {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn invoke(&self, input: Variables, config: &RunConfig) -> Result<Variables> {
        config.check_cancelled()?;
        let loaded = self.memory.load_memory_variables(&input).await?;
        debug!(keys = loaded.len(), "loaded memory variables");

        let mut merged = input.clone();
        merged.extend(loaded);
        let output = self.inner.invoke(merged, config).await?;

        self.memory.save_context(&input, &output).await?;
        Ok(output)
    }
}

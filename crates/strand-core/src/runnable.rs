//! The capability contract shared by every composable unit.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::RunConfig;
use crate::errors::Result;
use crate::stream::StreamIterator;

/// A unit that turns an `I` into an `O`.
///
/// Only [`invoke`](Self::invoke) is required. Units without incremental
/// output inherit a [`stream`](Self::stream) that yields the invoke result as
/// one chunk, and a [`batch`](Self::batch) that invokes each input in order
/// and stops at the first failure.
#[async_trait]
pub trait Runnable<I, O>: Send + Sync
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Name used in error annotations and callbacks.
    fn name(&self) -> &str;

    /// Run once and return the whole output.
    async fn invoke(&self, input: I, config: &RunConfig) -> Result<O>;

    /// Run once, yielding output as it becomes available.
    async fn stream(&self, input: I, config: &RunConfig) -> Result<StreamIterator<O>> {
        let output = self.invoke(input, config).await?;
        Ok(StreamIterator::once(output))
    }

    /// Run once per input, keeping outputs aligned with inputs.
    async fn batch(&self, inputs: Vec<I>, config: &RunConfig) -> Result<Vec<O>> {
        let mut outputs = Vec::with_capacity(inputs.len());
        for (index, input) in inputs.into_iter().enumerate() {
            let output = self
                .invoke(input, config)
                .await
                .map_err(|e| e.at_batch_item(index))?;
            outputs.push(output);
        }
        Ok(outputs)
    }
}

/// Shared, type-erased handle to a unit.
pub type BoxRunnable<I, O> = Arc<dyn Runnable<I, O>>;

#[async_trait]
impl<I, O, R> Runnable<I, O> for Arc<R>
where
    I: Send + 'static,
    O: Send + 'static,
    R: Runnable<I, O> + ?Sized,
{
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn invoke(&self, input: I, config: &RunConfig) -> Result<O> {
        (**self).invoke(input, config).await
    }

    async fn stream(&self, input: I, config: &RunConfig) -> Result<StreamIterator<O>> {
        (**self).stream(input, config).await
    }

    async fn batch(&self, inputs: Vec<I>, config: &RunConfig) -> Result<Vec<O>> {
        (**self).batch(inputs, config).await
    }
}

//! Functions as units.

use std::future::{Future, Ready};
use std::marker::PhantomData;

use async_trait::async_trait;

use strand_core::{Result, RunConfig, Runnable};

/// An async function as a unit.
///
/// The function receives the input and the caller's config (for cancellation
/// and callbacks). No incremental output can be derived from an opaque
/// function, so streaming yields the result as one chunk.
pub struct Lambda<I, O, F> {
    f: F,
    name: String,
    _types: PhantomData<fn(I) -> O>,
}

impl<I, O, F, Fut> Lambda<I, O, F>
where
    F: Fn(I, RunConfig) -> Fut + Send + Sync,
    Fut: Future<Output = Result<O>> + Send,
{
    /// Wrap an async function of the input and config.
    pub fn new(f: F) -> Self {
        Self {
            f,
            name: "RunnableLambda".to_string(),
            _types: PhantomData,
        }
    }

    /// Name reported in errors and callbacks.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Wrap a synchronous fallible function.
pub fn sync_lambda<I, O, G>(
    g: G,
) -> Lambda<I, O, impl Fn(I, RunConfig) -> Ready<Result<O>> + Send + Sync>
where
    I: Send,
    O: Send,
    G: Fn(I) -> Result<O> + Send + Sync,
{
    Lambda::new(move |input, _config| std::future::ready(g(input)))
}

#[async_trait]
impl<I, O, F, Fut> Runnable<I, O> for Lambda<I, O, F>
where
    I: Send + 'static,
    O: Send + 'static,
    F: Fn(I, RunConfig) -> Fut + Send + Sync,
    Fut: Future<Output = Result<O>> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, input: I, config: &RunConfig) -> Result<O> {
        (self.f)(input, config.clone()).await
    }
}

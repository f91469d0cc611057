//! Named fan-out / fan-in.
//!
//! Every entry receives a clone of the same input on its own task. Tasks are
//! gated by a semaphore sized from the call's `max_concurrency` (0 means one
//! permit per entry). The join waits for every task; the caller sees either
//! a result for every registered name or a single error, never a partial map.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, instrument};

use strand_core::{BoxRunnable, CallbackHandler, Result, RunConfig, RunError, Runnable};

use crate::lambda::Lambda;

/// Runs each registered unit concurrently on the same input.
pub struct Parallel<I, O = Value> {
    entries: Vec<(String, BoxRunnable<I, O>)>,
    name: Option<String>,
}

impl<I, O> Default for Parallel<I, O> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            name: None,
        }
    }
}

impl<I, O> Parallel<I, O>
where
    I: Clone + Send + 'static,
    O: Send + 'static,
{
    /// A unit with no entries.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a unit under `key`, replacing any unit already there.
    #[must_use]
    pub fn add<R>(mut self, key: impl Into<String>, unit: R) -> Self
    where
        R: Runnable<I, O> + 'static,
    {
        let key = key.into();
        let unit: BoxRunnable<I, O> = Arc::new(unit);
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = unit;
        } else {
            self.entries.push((key, unit));
        }
        self
    }

    /// Register an async function under `key`.
    #[must_use]
    pub fn add_fn<F, Fut>(self, key: impl Into<String>, f: F) -> Self
    where
        F: Fn(I, RunConfig) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O>> + Send + 'static,
    {
        let key = key.into();
        let unit = Lambda::new(f).with_name(key.clone());
        self.add(key, unit)
    }

    /// Name reported in errors and callbacks.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Registered names in registration order.
    pub fn keys(&self) -> Vec<&str> {
        self.entries.iter().map(|(k, _)| k.as_str()).collect()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[instrument(skip_all, fields(run_id = %config.run_id(), entries = self.entries.len()))]
    async fn fan_out(&self, input: I, config: &RunConfig) -> Result<BTreeMap<String, O>> {
        config.check_cancelled()?;

        let permits = match config.max_concurrency() {
            0 => self.entries.len().max(1),
            n => n,
        };
        let semaphore = Arc::new(Semaphore::new(permits));

        let mut tasks = JoinSet::new();
        let mut keys_by_task = HashMap::new();
        for (key, unit) in &self.entries {
            let child = config.child(Some(key.as_str()))?;
            let unit = Arc::clone(unit);
            let input = input.clone();
            let semaphore = Arc::clone(&semaphore);
            let task_key = key.clone();
            let handle = tasks.spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => unit.invoke(input, &child).await,
                    Err(_) => Err(RunError::Internal("parallel semaphore closed".into())),
                };
                (task_key, result)
            });
            let _ = keys_by_task.insert(handle.id(), key.clone());
        }

        let mut results = BTreeMap::new();
        let mut failure: Option<RunError> = None;
        loop {
            let joined = tokio::select! {
                biased;
                () = config.cancellation().cancelled() => {
                    tasks.abort_all();
                    return Err(RunError::Cancelled);
                }
                joined = tasks.join_next() => joined,
            };
            match joined {
                None => break,
                Some(Ok((key, Ok(value)))) => {
                    debug!(key = %key, "parallel branch finished");
                    let _ = results.insert(key, value);
                }
                Some(Ok((key, Err(e)))) => {
                    debug!(key = %key, error = %e, "parallel branch failed");
                    let _ = failure.get_or_insert(e.in_branch(key));
                }
                Some(Err(join_err)) => {
                    let key = keys_by_task
                        .get(&join_err.id())
                        .cloned()
                        .unwrap_or_default();
                    error!(key = %key, error = %join_err, "parallel branch task died");
                    let _ = failure.get_or_insert(
                        RunError::Internal(format!("task failed: {join_err}")).in_branch(key),
                    );
                }
            }
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(results),
        }
    }
}

impl<I> Parallel<I, Value>
where
    I: Clone + Send + 'static,
{
    /// Register a unit with any serializable output; its result is stored as
    /// JSON.
    #[must_use]
    pub fn add_json<T, R>(self, key: impl Into<String>, unit: R) -> Self
    where
        T: Serialize + Send + 'static,
        R: Runnable<I, T> + 'static,
    {
        let key = key.into();
        let unit = Arc::new(unit);
        let name = key.clone();
        self.add(
            key,
            Lambda::new(move |input: I, config: RunConfig| {
                let unit = Arc::clone(&unit);
                async move {
                    let output = unit.invoke(input, &config).await?;
                    Ok::<Value, RunError>(serde_json::to_value(output)?)
                }
            })
            .with_name(name),
        )
    }
}

#[async_trait]
impl<I, O> Runnable<I, BTreeMap<String, O>> for Parallel<I, O>
where
    I: Clone + Send + 'static,
    O: Send + 'static,
{
    fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("RunnableParallel")
    }

    async fn invoke(&self, input: I, config: &RunConfig) -> Result<BTreeMap<String, O>> {
        let callbacks = config.callbacks();
        callbacks.on_chain_start(&config.run_info(self.name()), &Value::Null);
        let result = self.fan_out(input, config).await;
        match &result {
            Ok(map) => callbacks.on_chain_end(
                config.run_id(),
                &Value::from(map.keys().cloned().collect::<Vec<_>>()),
            ),
            Err(e) => callbacks.on_chain_error(config.run_id(), e),
        }
        result
    }
}

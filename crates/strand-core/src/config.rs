//! Per-call invocation config.
//!
//! A [`RunConfig`] is built once through [`RunConfigBuilder`] before a call is
//! dispatched and is never mutated afterwards. Every field is either `Copy`,
//! an owned collection, or an `Arc`, so components share it by reference and
//! clone it only to derive a child config for nested work.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::callbacks::{CallbackHandler, CallbackManager, RunInfo};
use crate::errors::{Result, RunError};
use crate::ids::RunId;

/// Immutable settings for one call.
#[derive(Clone, Debug)]
pub struct RunConfig {
    tags: Vec<String>,
    metadata: HashMap<String, Value>,
    callbacks: CallbackManager,
    run_name: Option<String>,
    max_concurrency: usize,
    default_concurrency: usize,
    recursion_limit: usize,
    max_iterations: Option<usize>,
    configurable: HashMap<String, Value>,
    run_id: RunId,
    parent_run_id: Option<RunId>,
    depth: usize,
    stop: Vec<String>,
    cancellation: CancellationToken,
}

impl RunConfig {
    /// Start an empty builder.
    pub fn builder() -> RunConfigBuilder {
        RunConfigBuilder::default()
    }

    /// Start a builder pre-filled with this config's values.
    ///
    /// The run id is kept; call [`RunConfigBuilder::with_run_id`] to replace it.
    pub fn to_builder(&self) -> RunConfigBuilder {
        RunConfigBuilder {
            tags: self.tags.clone(),
            metadata: self.metadata.clone(),
            callbacks: self.callbacks.clone(),
            run_name: self.run_name.clone(),
            max_concurrency: Some(self.max_concurrency),
            recursion_limit: Some(self.recursion_limit),
            max_iterations: self.max_iterations,
            configurable: self.configurable.clone(),
            run_id: Some(self.run_id.clone()),
            parent_run_id: self.parent_run_id.clone(),
            depth: self.depth,
            stop: self.stop.clone(),
            cancellation: Some(self.cancellation.clone()),
            default_concurrency: Some(self.default_concurrency),
        }
    }

    /// Tags attached to this call.
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Metadata attached to this call.
    pub fn metadata(&self) -> &HashMap<String, Value> {
        &self.metadata
    }

    /// Handlers for this level.
    pub fn callbacks(&self) -> &CallbackManager {
        &self.callbacks
    }

    /// Display name override for the top unit.
    pub fn run_name(&self) -> Option<&str> {
        self.run_name.as_deref()
    }

    /// Upper bound on concurrent tasks; 0 means unbounded.
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Concurrency for components that batch concurrently: the configured
    /// limit, or the settings default when the limit is unset.
    pub fn batch_concurrency(&self) -> usize {
        if self.max_concurrency > 0 {
            self.max_concurrency
        } else {
            self.default_concurrency
        }
    }

    /// Deepest nesting allowed.
    pub fn recursion_limit(&self) -> usize {
        self.recursion_limit
    }

    /// Iteration budget override for agent loops, if set for this call.
    pub fn max_iterations(&self) -> Option<usize> {
        self.max_iterations
    }

    /// Runtime overrides by key.
    pub fn configurable(&self) -> &HashMap<String, Value> {
        &self.configurable
    }

    /// Id of this run.
    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    /// Id of the enclosing run, if nested.
    pub fn parent_run_id(&self) -> Option<&RunId> {
        self.parent_run_id.as_ref()
    }

    /// Nesting depth; the root call is 0.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Stop sequences for model stages.
    pub fn stop(&self) -> &[String] {
        &self.stop
    }

    /// Token that fires when the caller cancels.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// True once the caller has cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Fail with [`RunError::Cancelled`] if the caller has cancelled.
    pub fn check_cancelled(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(RunError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Identity used when reporting a start event for this run.
    pub fn run_info<'a>(&'a self, default_name: &'a str) -> RunInfo<'a> {
        RunInfo {
            run_id: &self.run_id,
            parent_run_id: self.parent_run_id.as_ref(),
            name: self.run_name.as_deref().unwrap_or(default_name),
            tags: &self.tags,
        }
    }

    /// Derive the config for a nested execution.
    ///
    /// The child gets a fresh run id, this run as its parent, inheritable
    /// callbacks only, no run name, and a cancellation token that fires when
    /// this one does. Stop sequences and the iteration override carry over. Fails once nesting would exceed the recursion limit.
    pub fn child(&self, tag: Option<&str>) -> Result<Self> {
        let depth = self.depth + 1;
        if depth > self.recursion_limit {
            return Err(RunError::RecursionLimit {
                limit: self.recursion_limit,
            });
        }
        Ok(Self {
            tags: self.tags.clone(),
            metadata: self.metadata.clone(),
            callbacks: self.callbacks.child(tag),
            run_name: None,
            max_concurrency: self.max_concurrency,
            default_concurrency: self.default_concurrency,
            recursion_limit: self.recursion_limit,
            max_iterations: self.max_iterations,
            configurable: self.configurable.clone(),
            run_id: RunId::new(),
            parent_run_id: Some(self.run_id.clone()),
            depth,
            stop: self.stop.clone(),
            cancellation: self.cancellation.child_token(),
        })
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfigBuilder::default().build()
    }
}

/// Builder for [`RunConfig`]; the only way callers configure a call.
#[derive(Default)]
pub struct RunConfigBuilder {
    tags: Vec<String>,
    metadata: HashMap<String, Value>,
    callbacks: CallbackManager,
    run_name: Option<String>,
    max_concurrency: Option<usize>,
    default_concurrency: Option<usize>,
    recursion_limit: Option<usize>,
    max_iterations: Option<usize>,
    configurable: HashMap<String, Value>,
    run_id: Option<RunId>,
    parent_run_id: Option<RunId>,
    depth: usize,
    stop: Vec<String>,
    cancellation: Option<CancellationToken>,
}

impl RunConfigBuilder {
    /// Append tags.
    #[must_use]
    pub fn with_tags<S: Into<String>>(mut self, tags: impl IntoIterator<Item = S>) -> Self {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Merge metadata entries; later keys win.
    #[must_use]
    pub fn with_metadata<K: Into<String>>(
        mut self,
        metadata: impl IntoIterator<Item = (K, Value)>,
    ) -> Self {
        self.metadata
            .extend(metadata.into_iter().map(|(k, v)| (k.into(), v)));
        self
    }

    /// Append handlers; they are inherited by nested executions.
    #[must_use]
    pub fn with_callbacks(mut self, handlers: impl IntoIterator<Item = Arc<dyn CallbackHandler>>) -> Self {
        for handler in handlers {
            self.callbacks = self.callbacks.with_inheritable_handler(handler);
        }
        self
    }

    /// Append a handler that sees only this level.
    #[must_use]
    pub fn with_local_callback(mut self, handler: Arc<dyn CallbackHandler>) -> Self {
        self.callbacks = self.callbacks.with_handler(handler);
        self
    }

    /// Replace the callback manager wholesale.
    #[must_use]
    pub fn with_callback_manager(mut self, manager: CallbackManager) -> Self {
        self.callbacks = manager;
        self
    }

    /// Name the top unit of this call.
    #[must_use]
    pub fn with_run_name(mut self, name: impl Into<String>) -> Self {
        self.run_name = Some(name.into());
        self
    }

    /// Bound concurrent tasks; 0 means unbounded.
    #[must_use]
    pub fn with_max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = Some(n);
        self
    }

    /// Limit nesting depth.
    #[must_use]
    pub fn with_recursion_limit(mut self, n: usize) -> Self {
        self.recursion_limit = Some(n.max(1));
        self
    }

    /// Override the iteration budget of agent loops for this call.
    #[must_use]
    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = Some(n.max(1));
        self
    }

    /// Merge runtime overrides; later keys win.
    #[must_use]
    pub fn with_configurable<K: Into<String>>(
        mut self,
        values: impl IntoIterator<Item = (K, Value)>,
    ) -> Self {
        self.configurable
            .extend(values.into_iter().map(|(k, v)| (k.into(), v)));
        self
    }

    /// Use a caller-chosen run id.
    #[must_use]
    pub fn with_run_id(mut self, run_id: RunId) -> Self {
        self.run_id = Some(run_id);
        self
    }

    /// Replace the stop sequences.
    #[must_use]
    pub fn with_stop<S: Into<String>>(mut self, stop: impl IntoIterator<Item = S>) -> Self {
        self.stop = stop.into_iter().map(Into::into).collect();
        self
    }

    /// Cancel the call through this token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Finish the config, seeding unset limits from the process settings.
    pub fn build(self) -> RunConfig {
        let settings = strand_settings::get_settings();
        RunConfig {
            tags: self.tags,
            metadata: self.metadata,
            callbacks: self.callbacks,
            run_name: self.run_name,
            max_concurrency: self.max_concurrency.unwrap_or(0),
            default_concurrency: self
                .default_concurrency
                .unwrap_or(settings.runnable.batch_concurrency),
            recursion_limit: self
                .recursion_limit
                .unwrap_or(settings.runnable.recursion_limit),
            max_iterations: self.max_iterations,
            configurable: self.configurable,
            run_id: self.run_id.unwrap_or_default(),
            parent_run_id: self.parent_run_id,
            depth: self.depth,
            stop: self.stop,
            cancellation: self.cancellation.unwrap_or_default(),
        }
    }
}

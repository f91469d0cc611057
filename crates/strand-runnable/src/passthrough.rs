//! Identity and key-augmenting units.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use strand_core::{
    BoxRunnable, CallbackHandler, Result, RunConfig, RunError, Runnable, Variables,
};

use crate::lambda::Lambda;

/// Returns its input unchanged.
pub struct Passthrough<T> {
    _type: PhantomData<fn(T) -> T>,
}

impl<T> Passthrough<T> {
    /// The identity unit.
    pub fn new() -> Self {
        Self { _type: PhantomData }
    }
}

impl<T> Default for Passthrough<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Send + 'static> Runnable<T, T> for Passthrough<T> {
    fn name(&self) -> &str {
        "RunnablePassthrough"
    }

    async fn invoke(&self, input: T, config: &RunConfig) -> Result<T> {
        config.check_cancelled()?;
        Ok(input)
    }

    async fn batch(&self, inputs: Vec<T>, config: &RunConfig) -> Result<Vec<T>> {
        config.check_cancelled()?;
        Ok(inputs)
    }
}

/// Copies an object and adds one key per registered unit.
///
/// Units see the original input, not each other's results, and run one after
/// another in registration order. A unit registered under a key already
/// present in the input overwrites it.
pub struct Assign {
    entries: Vec<(String, BoxRunnable<Variables, Value>)>,
    name: Option<String>,
}

impl Default for Assign {
    fn default() -> Self {
        Self::new()
    }
}

impl Assign {
    /// An assign unit with no keys.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            name: None,
        }
    }

    /// Register a unit computing `key`. Re-registering a key replaces it in
    /// place.
    #[must_use]
    pub fn add<R>(mut self, key: impl Into<String>, unit: R) -> Self
    where
        R: Runnable<Variables, Value> + 'static,
    {
        let key = key.into();
        let unit: BoxRunnable<Variables, Value> = Arc::new(unit);
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = unit;
        } else {
            self.entries.push((key, unit));
        }
        self
    }

    /// Register a unit with any serializable output.
    #[must_use]
    pub fn add_json<T, R>(self, key: impl Into<String>, unit: R) -> Self
    where
        T: Serialize + Send + 'static,
        R: Runnable<Variables, T> + 'static,
    {
        let key = key.into();
        let unit = Arc::new(unit);
        let name = key.clone();
        self.add(
            key,
            Lambda::new(move |input: Variables, config: RunConfig| {
                let unit = Arc::clone(&unit);
                async move {
                    let output = unit.invoke(input, &config).await?;
                    Ok::<Value, RunError>(serde_json::to_value(output)?)
                }
            })
            .with_name(name),
        )
    }

    /// Name reported in errors and callbacks.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Keys in registration order.
    pub fn keys(&self) -> Vec<&str> {
        self.entries.iter().map(|(k, _)| k.as_str()).collect()
    }

    async fn assign(&self, input: Variables, config: &RunConfig) -> Result<Variables> {
        let mut output = input.clone();
        for (key, unit) in &self.entries {
            config.check_cancelled()?;
            let child = config.child(Some(key.as_str()))?;
            let value = unit
                .invoke(input.clone(), &child)
                .await
                .map_err(|e| e.in_branch(key.clone()))?;
            let _ = output.insert(key.clone(), value);
        }
        Ok(output)
    }
}

#[async_trait]
impl Runnable<Variables, Variables> for Assign {
    fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("RunnableAssign")
    }

    async fn invoke(&self, input: Variables, config: &RunConfig) -> Result<Variables> {
        let callbacks = config.callbacks();
        callbacks.on_chain_start(&config.run_info(self.name()), &Value::Object(input.clone()));
        let result = self.assign(input, config).await;
        match &result {
            Ok(output) => callbacks.on_chain_end(config.run_id(), &Value::Object(output.clone())),
            Err(e) => callbacks.on_chain_error(config.run_id(), e),
        }
        result
    }
}

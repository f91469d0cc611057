//! Pipelines assembled from erased stages at runtime.
//!
//! This is the weaker counterpart of [`Sequence`](crate::Sequence): adjacent
//! stage types are compared when the pipeline is built, and every value is
//! re-checked at each boundary when it runs. Either check fails with
//! [`RunError::TypeMismatch`] naming the offending stage.

use std::any::type_name;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use strand_core::erased::{DynRunnable, TypeInfo};
use strand_core::{CallbackHandler, Result, RunConfig, RunError, Runnable};

use crate::sequence::{downcast, run_steps};

/// A pipeline of erased stages, typed only at its two ends.
pub struct DynSequence<I, O> {
    steps: Vec<Arc<dyn DynRunnable>>,
    name: Option<String>,
    _types: PhantomData<fn(I) -> O>,
}

impl<I, O> std::fmt::Debug for DynSequence<I, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynSequence")
            .field("steps", &self.steps.iter().map(|s| s.name()).collect::<Vec<_>>())
            .field("name", &self.name)
            .finish()
    }
}

impl<I, O> DynSequence<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Build from stages, checking that each stage accepts what the previous
    /// one produces and that the ends match `I` and `O`.
    pub fn from_steps(steps: Vec<Arc<dyn DynRunnable>>) -> Result<Self> {
        let Some(last) = steps.last() else {
            return Err(RunError::InvalidPlan(
                "a pipeline needs at least one step".into(),
            ));
        };

        let mut found = TypeInfo::of::<I>();
        for (index, step) in steps.iter().enumerate() {
            let expected = step.input_type();
            if expected != found {
                return Err(RunError::TypeMismatch {
                    step: index,
                    name: step.name().to_string(),
                    expected: expected.name,
                    found: found.name,
                });
            }
            found = step.output_type();
        }

        if found != TypeInfo::of::<O>() {
            return Err(RunError::TypeMismatch {
                step: steps.len() - 1,
                name: last.name().to_string(),
                expected: type_name::<O>(),
                found: found.name,
            });
        }

        Ok(Self {
            steps,
            name: None,
            _types: PhantomData,
        })
    }

    /// Name reported in errors and callbacks.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Always false; construction rejects empty pipelines.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[async_trait]
impl<I, O> Runnable<I, O> for DynSequence<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("DynSequence")
    }

    async fn invoke(&self, input: I, config: &RunConfig) -> Result<O> {
        let callbacks = config.callbacks();
        callbacks.on_chain_start(&config.run_info(self.name()), &Value::Null);
        let result = run_steps(&self.steps, 0, Box::new(input), TypeInfo::of::<I>(), config)
            .await
            .and_then(|(value, _)| downcast::<O>(value, self.name()));
        match &result {
            Ok(_) => callbacks.on_chain_end(config.run_id(), &Value::Null),
            Err(e) => callbacks.on_chain_error(config.run_id(), e),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lambda::sync_lambda;
    use assert_matches::assert_matches;
    use strand_core::erase;

    fn len_step() -> Arc<dyn DynRunnable> {
        erase(sync_lambda(|s: String| Ok(s.len())).with_name("len"))
    }

    fn double_step() -> Arc<dyn DynRunnable> {
        erase(sync_lambda(|n: usize| Ok(n * 2)).with_name("double"))
    }

    fn show_step() -> Arc<dyn DynRunnable> {
        erase(sync_lambda(|n: usize| Ok(format!("n={n}"))).with_name("show"))
    }

    #[tokio::test]
    async fn runs_well_typed_pipeline() {
        let seq: DynSequence<String, String> =
            DynSequence::from_steps(vec![len_step(), double_step(), show_step()]).unwrap();
        assert_eq!(seq.len(), 3);
        let out = seq.invoke("abc".into(), &RunConfig::default()).await.unwrap();
        assert_eq!(out, "n=6");
    }

    #[test]
    fn rejects_mismatch_between_steps() {
        let err = DynSequence::<String, String>::from_steps(vec![len_step(), show_step(), double_step()])
            .unwrap_err();
        assert_matches!(
            err,
            RunError::TypeMismatch { step: 2, ref name, expected, found }
                if name == "double" && expected == "usize" && found == "alloc::string::String"
        );
    }

    #[test]
    fn rejects_wrong_input_end() {
        let err = DynSequence::<i32, usize>::from_steps(vec![len_step()]).unwrap_err();
        assert_matches!(err, RunError::TypeMismatch { step: 0, .. });
    }

    #[test]
    fn rejects_wrong_output_end() {
        let err = DynSequence::<String, bool>::from_steps(vec![len_step()]).unwrap_err();
        assert_matches!(err, RunError::TypeMismatch { step: 0, expected: "bool", .. });
    }

    #[test]
    fn rejects_empty() {
        assert_matches!(
            DynSequence::<String, String>::from_steps(vec![]),
            Err(RunError::InvalidPlan(_))
        );
    }

    #[tokio::test]
    async fn failure_names_step() {
        let failing = erase(
            sync_lambda(|_: usize| Err::<usize, _>(RunError::Internal("nope".into())))
                .with_name("fail"),
        );
        let seq = DynSequence::<String, usize>::from_steps(vec![len_step(), failing]).unwrap();
        let err = seq.invoke("x".into(), &RunConfig::default()).await.unwrap_err();
        assert_matches!(err, RunError::Step { index: 1, ref name, .. } if name == "fail");
    }
}

//! Ordered pipelines.
//!
//! Stage types are checked by the compiler: [`Sequence::new`] starts a
//! pipeline and [`Sequence::then`] appends a stage whose input type must equal
//! the current output type. Internally stages are erased so a pipeline of any
//! length is one type, `Sequence<I, O>`.
//!
//! Only the final stage streams. Every earlier stage is fully invoked first,
//! because threading chunks through stages that change type would need an
//! adapter per type pair.

use std::any::type_name;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use strand_core::erased::{AnyValue, DynRunnable, Erased, TypeInfo};
use strand_core::{CallbackHandler, Result, RunConfig, RunError, Runnable, StreamIterator};

/// Last stage of a pipeline, typed on what it produces.
#[async_trait]
pub(crate) trait TailStage<O>: DynRunnable {
    async fn invoke_typed(&self, input: AnyValue, config: &RunConfig) -> Result<O>;
    async fn stream_typed(&self, input: AnyValue, config: &RunConfig)
    -> Result<StreamIterator<O>>;
}

#[async_trait]
impl<I, O, R> TailStage<O> for Erased<I, O, R>
where
    I: Send + 'static,
    O: Send + 'static,
    R: Runnable<I, O>,
{
    async fn invoke_typed(&self, input: AnyValue, config: &RunConfig) -> Result<O> {
        let input = downcast::<I>(input, self.inner().name())?;
        self.inner().invoke(input, config).await
    }

    async fn stream_typed(
        &self,
        input: AnyValue,
        config: &RunConfig,
    ) -> Result<StreamIterator<O>> {
        let input = downcast::<I>(input, self.inner().name())?;
        self.inner().stream(input, config).await
    }
}

pub(crate) fn downcast<T: 'static>(value: AnyValue, stage: &str) -> Result<T> {
    value.downcast::<T>().map(|boxed| *boxed).map_err(|_| {
        RunError::Internal(format!(
            "{stage} produced a value that is not {}",
            type_name::<T>()
        ))
    })
}

fn step_tag(index: usize) -> String {
    format!("seq:step:{}", index + 1)
}

/// Thread `value` through `steps`, checking the value's type at every
/// boundary. `offset` is the index of `steps[0]` within the whole pipeline.
pub(crate) async fn run_steps(
    steps: &[Arc<dyn DynRunnable>],
    offset: usize,
    mut value: AnyValue,
    mut found: TypeInfo,
    config: &RunConfig,
) -> Result<(AnyValue, TypeInfo)> {
    for (i, step) in steps.iter().enumerate() {
        let index = offset + i;
        config.check_cancelled()?;
        if !step.accepts(&*value) {
            return Err(RunError::TypeMismatch {
                step: index,
                name: step.name().to_string(),
                expected: step.input_type().name,
                found: found.name,
            });
        }
        let child = config.child(Some(&step_tag(index)))?;
        debug!(step = index, name = step.name(), "running sequence step");
        value = step
            .invoke_any(value, &child)
            .await
            .map_err(|e| e.at_step(index, step.name()))?;
        found = step.output_type();
    }
    Ok((value, found))
}

/// A pipeline whose stage outputs feed the next stage's input.
pub struct Sequence<I, O> {
    head: Vec<Arc<dyn DynRunnable>>,
    tail: Arc<dyn TailStage<O>>,
    name: Option<String>,
    _input: PhantomData<fn(I)>,
}

impl<I, O> Sequence<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// One-stage pipeline.
    pub fn new<R>(first: R) -> Self
    where
        R: Runnable<I, O> + 'static,
    {
        Self {
            head: Vec::new(),
            tail: Arc::new(Erased::<I, O, R>::new(first)),
            name: None,
            _input: PhantomData,
        }
    }

    /// Append a stage consuming this pipeline's output.
    pub fn then<P, R>(self, next: R) -> Sequence<I, P>
    where
        P: Send + 'static,
        R: Runnable<O, P> + 'static,
    {
        let mut head = self.head;
        head.push(self.tail);
        Sequence {
            head,
            tail: Arc::new(Erased::<O, P, R>::new(next)),
            name: self.name,
            _input: PhantomData,
        }
    }

    /// Name reported in errors and callbacks.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.head.len() + 1
    }

    /// Always false; a sequence has at least one stage.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Stage names in execution order.
    pub fn step_names(&self) -> Vec<&str> {
        self.head
            .iter()
            .map(|s| s.name())
            .chain(std::iter::once(self.tail.name()))
            .collect()
    }

    async fn run_head(&self, input: I, config: &RunConfig) -> Result<AnyValue> {
        let (value, _) =
            run_steps(&self.head, 0, Box::new(input), TypeInfo::of::<I>(), config).await?;
        config.check_cancelled()?;
        Ok(value)
    }

    async fn run(&self, input: I, config: &RunConfig) -> Result<O> {
        let value = self.run_head(input, config).await?;
        let index = self.head.len();
        let child = config.child(Some(&step_tag(index)))?;
        self.tail
            .invoke_typed(value, &child)
            .await
            .map_err(|e| e.at_step(index, self.tail.name()))
    }
}

#[async_trait]
impl<I, O> Runnable<I, O> for Sequence<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("RunnableSequence")
    }

    async fn invoke(&self, input: I, config: &RunConfig) -> Result<O> {
        let callbacks = config.callbacks();
        callbacks.on_chain_start(&config.run_info(self.name()), &Value::Null);
        let result = self.run(input, config).await;
        match &result {
            Ok(_) => callbacks.on_chain_end(config.run_id(), &Value::Null),
            Err(e) => callbacks.on_chain_error(config.run_id(), e),
        }
        result
    }

    async fn stream(&self, input: I, config: &RunConfig) -> Result<StreamIterator<O>> {
        let value = self.run_head(input, config).await?;
        let index = self.head.len();
        let child = config.child(Some(&step_tag(index)))?;
        self.tail
            .stream_typed(value, &child)
            .await
            .map_err(|e| e.at_step(index, self.tail.name()))
    }
}

/// Two-stage pipeline.
pub fn pipe2<A, B, C, R1, R2>(first: R1, second: R2) -> Sequence<A, C>
where
    A: Send + 'static,
    B: Send + 'static,
    C: Send + 'static,
    R1: Runnable<A, B> + 'static,
    R2: Runnable<B, C> + 'static,
{
    Sequence::new(first).then(second)
}

/// Three-stage pipeline.
pub fn pipe3<A, B, C, D, R1, R2, R3>(first: R1, second: R2, third: R3) -> Sequence<A, D>
where
    A: Send + 'static,
    B: Send + 'static,
    C: Send + 'static,
    D: Send + 'static,
    R1: Runnable<A, B> + 'static,
    R2: Runnable<B, C> + 'static,
    R3: Runnable<C, D> + 'static,
{
    Sequence::new(first).then(second).then(third)
}

/// Four-stage pipeline.
pub fn pipe4<A, B, C, D, E, R1, R2, R3, R4>(
    first: R1,
    second: R2,
    third: R3,
    fourth: R4,
) -> Sequence<A, E>
where
    A: Send + 'static,
    B: Send + 'static,
    C: Send + 'static,
    D: Send + 'static,
    E: Send + 'static,
    R1: Runnable<A, B> + 'static,
    R2: Runnable<B, C> + 'static,
    R3: Runnable<C, D> + 'static,
    R4: Runnable<D, E> + 'static,
{
    Sequence::new(first).then(second).then(third).then(fourth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lambda::{Lambda, sync_lambda};
    use assert_matches::assert_matches;
    use parking_lot::Mutex;
    use strand_core::{RunId, RunInfo, StreamChunk};

    #[tokio::test]
    async fn pipe2_threads_types() {
        let seq = pipe2(
            sync_lambda(|s: String| Ok(s.len())),
            sync_lambda(|n: usize| Ok(n % 2 == 0)),
        );
        assert!(seq.invoke("abcd".into(), &RunConfig::default()).await.unwrap());
        assert_eq!(seq.len(), 2);
    }

    #[tokio::test]
    async fn then_extends() {
        let seq = Sequence::new(sync_lambda(|x: i32| Ok(x + 1)))
            .then(sync_lambda(|x: i32| Ok(x.to_string())))
            .then(sync_lambda(|s: String| Ok(format!("<{s}>"))))
            .with_name("fmt");
        assert_eq!(seq.name(), "fmt");
        assert_eq!(seq.invoke(1, &RunConfig::default()).await.unwrap(), "<2>");
    }

    #[tokio::test]
    async fn error_annotated_with_step() {
        let seq = pipe3(
            sync_lambda(|x: i32| Ok(x)),
            sync_lambda(|_: i32| Err::<i32, _>(RunError::Internal("bad".into()))).with_name("breaker"),
            sync_lambda(|x: i32| Ok(x)),
        );
        let err = seq.invoke(0, &RunConfig::default()).await.unwrap_err();
        assert_matches!(&err, RunError::Step { index: 1, name, .. } if name == "breaker");
        assert_eq!(err.to_string(), "step 1 (breaker): internal error: bad");
    }

    #[tokio::test]
    async fn stream_streams_only_the_last_stage() {
        struct Spell;

        #[async_trait]
        impl Runnable<String, char> for Spell {
            fn name(&self) -> &str {
                "Spell"
            }
            async fn invoke(&self, input: String, _config: &RunConfig) -> Result<char> {
                input.chars().next().ok_or_else(|| RunError::Internal("empty".into()))
            }
            async fn stream(&self, input: String, _config: &RunConfig) -> Result<StreamIterator<char>> {
                Ok(StreamIterator::from_chunks(input.chars().map(StreamChunk::Value).collect::<Vec<_>>()))
            }
        }

        let seq = pipe2(sync_lambda(|s: &'static str| Ok(s.to_uppercase())), Spell);
        let it = seq.stream("abc", &RunConfig::default()).await.unwrap();
        assert_eq!(it.collect().await.unwrap(), vec!['A', 'B', 'C']);
    }

    #[tokio::test]
    async fn steps_run_under_child_configs() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let record = Arc::clone(&seen);
        let seq = pipe2(
            Lambda::new(move |x: i32, config: RunConfig| {
                record
                    .lock()
                    .push((config.depth(), config.parent_run_id().cloned()));
                async move { Ok(x) }
            }),
            sync_lambda(|x: i32| Ok(x)),
        );
        let config = RunConfig::default();
        let _ = seq.invoke(1, &config).await.unwrap();
        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, 1);
        assert_eq!(seen[0].1.as_ref(), Some(config.run_id()));
    }

    #[tokio::test]
    async fn cancelled_before_start() {
        let seq = pipe2(sync_lambda(|x: i32| Ok(x)), sync_lambda(|x: i32| Ok(x)));
        let config = RunConfig::default();
        config.cancellation().cancel();
        assert_matches!(seq.invoke(1, &config).await, Err(RunError::Cancelled));
    }

    #[derive(Default)]
    struct ChainEvents(Mutex<Vec<String>>);

    impl CallbackHandler for ChainEvents {
        fn on_chain_start(&self, run: &RunInfo<'_>, _inputs: &Value) {
            self.0.lock().push(format!("start:{}", run.name));
        }
        fn on_chain_end(&self, _run_id: &RunId, _outputs: &Value) {
            self.0.lock().push("end".into());
        }
        fn on_chain_error(&self, _run_id: &RunId, error: &RunError) {
            self.0.lock().push(format!("error:{}", error.kind()));
        }
    }

    #[tokio::test]
    async fn reports_chain_lifecycle() {
        let events = Arc::new(ChainEvents::default());
        let config = RunConfig::builder()
            .with_callbacks([events.clone() as Arc<dyn CallbackHandler>])
            .build();

        let ok = pipe2(sync_lambda(|x: i32| Ok(x)), sync_lambda(|x: i32| Ok(x)));
        let _ = ok.invoke(1, &config).await.unwrap();

        let failing = pipe2(
            sync_lambda(|x: i32| Ok(x)),
            sync_lambda(|_: i32| Err::<i32, _>(RunError::Internal("x".into()))),
        )
        .with_name("failing");
        let _ = failing.invoke(1, &config).await.unwrap_err();

        assert_eq!(
            *events.0.lock(),
            vec!["start:RunnableSequence", "end", "start:failing", "error:step"]
        );
    }

    #[test]
    fn step_names_in_order() {
        let seq = pipe3(
            sync_lambda(|x: i32| Ok(x)).with_name("a"),
            sync_lambda(|x: i32| Ok(x)).with_name("b"),
            sync_lambda(|x: i32| Ok(x)).with_name("c"),
        );
        assert_eq!(seq.step_names(), vec!["a", "b", "c"]);
    }
}

//! Conditional routing between units.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use strand_core::{BoxRunnable, Result, RunConfig, RunError, Runnable, StreamIterator};

type Predicate<I> = Box<dyn Fn(&I) -> bool + Send + Sync>;

/// First-match router.
///
/// Predicates are evaluated in registration order and must be free of side
/// effects; evaluation stops at the first one that holds. Each call (and each
/// element of a batch) is routed independently.
pub struct Branch<I, O> {
    routes: Vec<(Predicate<I>, BoxRunnable<I, O>)>,
    default: Option<BoxRunnable<I, O>>,
    name: Option<String>,
}

impl<I, O> Default for Branch<I, O> {
    fn default() -> Self {
        Self {
            routes: Vec::new(),
            default: None,
            name: None,
        }
    }
}

impl<I, O> Branch<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// A branch with no routes and no default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Route inputs satisfying `predicate` to `unit`.
    #[must_use]
    pub fn when<P, R>(mut self, predicate: P, unit: R) -> Self
    where
        P: Fn(&I) -> bool + Send + Sync + 'static,
        R: Runnable<I, O> + 'static,
    {
        self.routes.push((Box::new(predicate), Arc::new(unit)));
        self
    }

    /// Route inputs no predicate matched.
    #[must_use]
    pub fn otherwise<R>(mut self, unit: R) -> Self
    where
        R: Runnable<I, O> + 'static,
    {
        self.default = Some(Arc::new(unit));
        self
    }

    /// Name reported in errors and callbacks.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    fn select(&self, input: &I) -> Result<(String, &BoxRunnable<I, O>)> {
        for (index, (predicate, unit)) in self.routes.iter().enumerate() {
            if predicate(input) {
                debug!(route = index, unit = unit.name(), "branch matched");
                return Ok((format!("branch:{}", index + 1), unit));
            }
        }
        match &self.default {
            Some(unit) => {
                debug!(unit = unit.name(), "branch fell through to default");
                Ok(("branch:default".to_string(), unit))
            }
            None => Err(RunError::NoBranchMatched {
                name: self.name().to_string(),
            }),
        }
    }
}

#[async_trait]
impl<I, O> Runnable<I, O> for Branch<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("RunnableBranch")
    }

    async fn invoke(&self, input: I, config: &RunConfig) -> Result<O> {
        config.check_cancelled()?;
        let (tag, unit) = self.select(&input)?;
        let child = config.child(Some(&tag))?;
        unit.invoke(input, &child).await
    }

    async fn stream(&self, input: I, config: &RunConfig) -> Result<StreamIterator<O>> {
        config.check_cancelled()?;
        let (tag, unit) = self.select(&input)?;
        let child = config.child(Some(&tag))?;
        unit.stream(input, &child).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lambda::sync_lambda;
    use assert_matches::assert_matches;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn label(text: &'static str) -> impl Runnable<i32, String> {
        sync_lambda(move |_: i32| Ok(text.to_string())).with_name(text)
    }

    #[tokio::test]
    async fn first_match_wins() {
        let branch = Branch::new()
            .when(|x: &i32| *x > 0, label("positive"))
            .when(|x: &i32| *x > 10, label("big"))
            .otherwise(label("other"));
        let config = RunConfig::default();
        assert_eq!(branch.invoke(50, &config).await.unwrap(), "positive");
        assert_eq!(branch.invoke(-1, &config).await.unwrap(), "other");
    }

    #[tokio::test]
    async fn later_predicates_not_evaluated() {
        let evaluated = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&evaluated);
        let branch = Branch::new().when(|_: &i32| true, label("first")).when(
            move |_: &i32| {
                let _ = counter.fetch_add(1, Ordering::SeqCst);
                true
            },
            label("second"),
        );
        assert_eq!(branch.invoke(1, &RunConfig::default()).await.unwrap(), "first");
        assert_eq!(evaluated.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn no_match_without_default() {
        let branch = Branch::new()
            .when(|x: &i32| *x == 0, label("zero"))
            .with_name("router");
        let err = branch.invoke(5, &RunConfig::default()).await.unwrap_err();
        assert_matches!(err, RunError::NoBranchMatched { ref name } if name == "router");
    }

    #[tokio::test]
    async fn batch_routes_each_element() {
        let branch = Branch::new()
            .when(|x: &i32| x % 2 == 0, label("even"))
            .otherwise(label("odd"));
        let out = branch.batch(vec![1, 2, 3, 4], &RunConfig::default()).await.unwrap();
        assert_eq!(out, vec!["odd", "even", "odd", "even"]);
    }

    #[tokio::test]
    async fn stream_uses_matched_unit() {
        let branch = Branch::new().when(|_: &i32| false, label("never")).otherwise(label("fallback"));
        let it = branch.stream(3, &RunConfig::default()).await.unwrap();
        assert_eq!(it.collect().await.unwrap(), vec!["fallback"]);
    }

    #[tokio::test]
    async fn stream_reports_no_match() {
        let branch: Branch<i32, String> = Branch::new();
        assert_matches!(
            branch.stream(1, &RunConfig::default()).await,
            Err(RunError::NoBranchMatched { .. })
        );
    }
}

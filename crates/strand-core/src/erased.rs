//! Type-erased units for pipelines assembled at runtime.
//!
//! Values cross stage boundaries as `Box<dyn Any + Send>`. Each erased unit
//! reports the concrete types it accepts and produces so a builder can check
//! adjacent stages before anything runs, and [`DynRunnable::accepts`] lets the
//! executor re-check every value at the boundary.

use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::RunConfig;
use crate::errors::{Result, RunError};
use crate::runnable::Runnable;

/// A value travelling through an erased pipeline.
pub type AnyValue = Box<dyn Any + Send>;

/// Runtime identity of a Rust type.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeInfo {
    /// Identity used for comparison.
    pub id: TypeId,
    /// Type name used in error messages.
    pub name: &'static str,
}

impl TypeInfo {
    /// Info for `T`.
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Object-safe form of [`Runnable`] over [`AnyValue`].
#[async_trait]
pub trait DynRunnable: Send + Sync {
    /// Display name of the wrapped unit.
    fn name(&self) -> &str;
    /// Type the unit accepts.
    fn input_type(&self) -> TypeInfo;
    /// Type the unit produces.
    fn output_type(&self) -> TypeInfo;

    /// True if `value` has this unit's input type.
    fn accepts(&self, value: &(dyn Any + Send)) -> bool;

    /// Run the unit on a boxed input of its input type.
    async fn invoke_any(&self, input: AnyValue, config: &RunConfig) -> Result<AnyValue>;
}

/// Adapter erasing a typed unit.
pub struct Erased<I, O, R> {
    inner: R,
    _types: PhantomData<fn(I) -> O>,
}

impl<I, O, R> Erased<I, O, R> {
    /// Wrap a typed unit.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            _types: PhantomData,
        }
    }

    /// The wrapped unit.
    pub fn inner(&self) -> &R {
        &self.inner
    }

    /// Unwrap the typed unit.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

/// Erase a typed unit into a shared [`DynRunnable`].
pub fn erase<I, O, R>(unit: R) -> Arc<dyn DynRunnable>
where
    I: Send + 'static,
    O: Send + 'static,
    R: Runnable<I, O> + 'static,
{
    Arc::new(Erased::<I, O, R>::new(unit))
}

#[async_trait]
impl<I, O, R> DynRunnable for Erased<I, O, R>
where
    I: Send + 'static,
    O: Send + 'static,
    R: Runnable<I, O>,
{
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn input_type(&self) -> TypeInfo {
        TypeInfo::of::<I>()
    }

    fn output_type(&self) -> TypeInfo {
        TypeInfo::of::<O>()
    }

    fn accepts(&self, value: &(dyn Any + Send)) -> bool {
        value.is::<I>()
    }

    async fn invoke_any(&self, input: AnyValue, config: &RunConfig) -> Result<AnyValue> {
        let input = input.downcast::<I>().map_err(|_| {
            RunError::Internal(format!(
                "{} received a value that is not {}",
                self.inner.name(),
                std::any::type_name::<I>()
            ))
        })?;
        let output = self.inner.invoke(*input, config).await?;
        Ok(Box::new(output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    struct Len;

    #[async_trait]
    impl Runnable<String, usize> for Len {
        fn name(&self) -> &str {
            "Len"
        }

        async fn invoke(&self, input: String, _config: &RunConfig) -> Result<usize> {
            Ok(input.len())
        }
    }

    #[test]
    fn reports_types() {
        let unit = erase::<String, usize, _>(Len);
        assert_eq!(unit.input_type(), TypeInfo::of::<String>());
        assert_eq!(unit.output_type(), TypeInfo::of::<usize>());
        assert_eq!(unit.name(), "Len");
    }

    #[test]
    fn accepts_checks_concrete_type() {
        let unit = erase::<String, usize, _>(Len);
        let good: AnyValue = Box::new("abc".to_string());
        let bad: AnyValue = Box::new(3_u32);
        assert!(unit.accepts(good.as_ref()));
        assert!(!unit.accepts(bad.as_ref()));
    }

    #[tokio::test]
    async fn invoke_any_round_trips() {
        let unit = erase::<String, usize, _>(Len);
        let out = unit
            .invoke_any(Box::new("four".to_string()), &RunConfig::default())
            .await
            .unwrap();
        assert_eq!(*out.downcast::<usize>().unwrap(), 4);
    }

    #[tokio::test]
    async fn invoke_any_rejects_wrong_type() {
        let unit = erase::<String, usize, _>(Len);
        let result = unit.invoke_any(Box::new(1_i32), &RunConfig::default()).await;
        assert_matches!(result, Err(RunError::Internal(_)));
    }
}

//! Executor bindings.
//!
//! An executor is the external capability a stage invokes to turn its
//! assembled input into output text, typically an LLM call. The engine treats
//! the returned text as opaque and only stores it.

#[cfg(feature = "openai")]
mod openai;

#[cfg(feature = "openai")]
pub use openai::{OpenAiConfig, OpenAiExecutor, OpenAiExecutorFactory, DEFAULT_BASE_URL};

use crate::errors::ExecutorError;
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

/// Trait for executor bindings.
///
/// A new kind of stage needs no new type: it needs a binding implementing
/// this trait and a configuration entry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Executor: Send + Sync {
    /// Produces a result for the given context.
    ///
    /// # Arguments
    ///
    /// * `context` - The rendered stage input
    /// * `timeout` - The time budget for this invocation. The engine enforces
    ///   it independently; bindings may pass it on to their transport.
    async fn invoke(&self, context: &str, timeout: Duration) -> Result<String, ExecutorError>;
}

/// Creates the executor binding for a configured stage.
pub trait ExecutorFactory: Send + Sync {
    /// Returns an executor for `stage`, driven by its opaque `instructions`.
    fn create(&self, stage: &str, instructions: &str) -> Arc<dyn Executor>;
}

impl<F> ExecutorFactory for F
where
    F: Fn(&str, &str) -> Arc<dyn Executor> + Send + Sync,
{
    fn create(&self, stage: &str, instructions: &str) -> Arc<dyn Executor> {
        self(stage, instructions)
    }
}

/// A simple function-based executor.
pub struct FnExecutor<F>
where
    F: Fn(&str) -> Result<String, ExecutorError> + Send + Sync,
{
    name: String,
    func: F,
}

impl<F> FnExecutor<F>
where
    F: Fn(&str) -> Result<String, ExecutorError> + Send + Sync,
{
    /// Creates a new function-based executor.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }

    /// Returns the executor name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<F> Debug for FnExecutor<F>
where
    F: Fn(&str) -> Result<String, ExecutorError> + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnExecutor")
            .field("name", &self.name)
            .finish()
    }
}

#[async_trait]
impl<F> Executor for FnExecutor<F>
where
    F: Fn(&str) -> Result<String, ExecutorError> + Send + Sync,
{
    async fn invoke(&self, context: &str, _timeout: Duration) -> Result<String, ExecutorError> {
        (self.func)(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fn_executor() {
        let executor = FnExecutor::new("upper", |ctx: &str| Ok(ctx.to_uppercase()));

        assert_eq!(executor.name(), "upper");
        let output = executor.invoke("abc", Duration::from_secs(1)).await.unwrap();
        assert_eq!(output, "ABC");
    }

    #[tokio::test]
    async fn test_fn_executor_error() {
        let executor = FnExecutor::new("broken", |_ctx: &str| Err(ExecutorError::failure("nope")));

        let err = executor.invoke("abc", Duration::from_secs(1)).await.unwrap_err();
        assert_eq!(err, ExecutorError::Failure("nope".into()));
    }

    #[tokio::test]
    async fn test_closure_factory() {
        let factory = |stage: &str, instructions: &str| -> Arc<dyn Executor> {
            let tag = format!("{stage}:{instructions}");
            Arc::new(FnExecutor::new(stage, move |_ctx: &str| Ok(tag.clone())))
        };

        let executor = factory.create("analyze", "think");
        let output = executor.invoke("", Duration::from_secs(1)).await.unwrap();
        assert_eq!(output, "analyze:think");
    }

    #[tokio::test]
    async fn test_mock_executor_as_trait_object() {
        let mut mock = MockExecutor::new();
        mock.expect_invoke()
            .times(1)
            .returning(|ctx, _| Ok(format!("seen {} bytes", ctx.len())));

        let executor: Arc<dyn Executor> = Arc::new(mock);
        let output = executor.invoke("abcd", Duration::from_secs(1)).await.unwrap();
        assert_eq!(output, "seen 4 bytes");
    }
}

//! Executor doubles for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;

use crate::errors::ExecutorError;
use crate::executor::Executor;

/// An executor that replays a script of outcomes and records every input.
///
/// Once the script is exhausted it keeps returning the fallback output.
#[derive(Debug)]
pub struct ScriptedExecutor {
    name: String,
    script: Mutex<VecDeque<Result<String, ExecutorError>>>,
    fallback: String,
    calls: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
    /// Creates an executor that answers `"<name> output"` once its script runs out.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            fallback: format!("{name} output"),
            name,
            script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queues a successful outcome.
    #[must_use]
    pub fn then_ok(self, output: impl Into<String>) -> Self {
        self.script.lock().push_back(Ok(output.into()));
        self
    }

    /// Queues a failed outcome.
    #[must_use]
    pub fn then_err(self, error: ExecutorError) -> Self {
        self.script.lock().push_back(Err(error));
        self
    }

    /// Sets the output returned after the script runs out.
    #[must_use]
    pub fn with_fallback(mut self, output: impl Into<String>) -> Self {
        self.fallback = output.into();
        self
    }

    /// Returns the executor name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of invocations.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Returns the rendered input of every invocation.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Returns the input of the most recent invocation.
    #[must_use]
    pub fn last_call(&self) -> Option<String> {
        self.calls.lock().last().cloned()
    }
}

#[async_trait]
impl Executor for ScriptedExecutor {
    async fn invoke(&self, context: &str, _timeout: Duration) -> Result<String, ExecutorError> {
        self.calls.lock().push(context.to_string());
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(self.fallback.clone()))
    }
}

/// An executor that always fails.
#[derive(Debug)]
pub struct FailingExecutor {
    name: String,
    error: String,
    calls: Mutex<usize>,
}

impl FailingExecutor {
    /// Creates a new failing executor.
    #[must_use]
    pub fn new(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            error: error.into(),
            calls: Mutex::new(0),
        }
    }

    /// Returns the executor name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of invocations.
    #[must_use]
    pub fn call_count(&self) -> usize {
        *self.calls.lock()
    }
}

#[async_trait]
impl Executor for FailingExecutor {
    async fn invoke(&self, _context: &str, _timeout: Duration) -> Result<String, ExecutorError> {
        *self.calls.lock() += 1;
        Err(ExecutorError::failure(&self.error))
    }
}

/// An executor that sleeps before answering.
///
/// It ignores the timeout it is given, so the engine's own deadline is what
/// cuts it short.
#[derive(Debug)]
pub struct SlowExecutor {
    name: String,
    delay: Duration,
    calls: Mutex<usize>,
}

impl SlowExecutor {
    /// Creates a new slow executor.
    #[must_use]
    pub fn new(name: impl Into<String>, delay: Duration) -> Self {
        Self {
            name: name.into(),
            delay,
            calls: Mutex::new(0),
        }
    }

    /// Creates a slow executor with delay in milliseconds.
    #[must_use]
    pub fn with_delay_ms(name: impl Into<String>, ms: u64) -> Self {
        Self::new(name, Duration::from_millis(ms))
    }

    /// Returns the number of invocations.
    #[must_use]
    pub fn call_count(&self) -> usize {
        *self.calls.lock()
    }
}

#[async_trait]
impl Executor for SlowExecutor {
    async fn invoke(&self, _context: &str, _timeout: Duration) -> Result<String, ExecutorError> {
        *self.calls.lock() += 1;
        tokio::time::sleep(self.delay).await;
        Ok(format!("{} output", self.name))
    }
}

/// An executor that returns its input unchanged.
#[derive(Debug, Default)]
pub struct EchoExecutor;

#[async_trait]
impl Executor for EchoExecutor {
    async fn invoke(&self, context: &str, _timeout: Duration) -> Result<String, ExecutorError> {
        Ok(context.to_string())
    }
}

//! Stage definitions.

use crate::core::FailurePolicy;
use crate::executor::Executor;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// An immutable descriptor of one stage in a pipeline.
#[derive(Clone)]
pub struct StageDefinition {
    /// The unique name of the stage.
    pub name: String,
    /// Names of stages this stage depends on, in declaration order.
    pub depends_on: Vec<String>,
    /// The binding invoked to produce the stage output.
    pub executor: Arc<dyn Executor>,
    /// Total attempts allowed, including the first.
    pub max_attempts: u32,
    /// Per-invocation timeout; falls back to the engine default.
    pub timeout: Option<Duration>,
    /// Failure policy; falls back to the engine default.
    pub on_failure: Option<FailurePolicy>,
}

impl StageDefinition {
    /// Creates a stage with no dependencies and a single attempt.
    #[must_use]
    pub fn new(name: impl Into<String>, executor: Arc<dyn Executor>) -> Self {
        Self {
            name: name.into(),
            depends_on: Vec::new(),
            executor,
            max_attempts: 1,
            timeout: None,
            on_failure: None,
        }
    }

    /// Sets the dependencies. Duplicates are dropped.
    #[must_use]
    pub fn with_dependencies(mut self, deps: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.depends_on.clear();
        for dep in deps {
            self = self.with_dependency(dep);
        }
        self
    }

    /// Adds a dependency.
    #[must_use]
    pub fn with_dependency(mut self, dep: impl Into<String>) -> Self {
        let dep = dep.into();
        if !self.depends_on.contains(&dep) {
            self.depends_on.push(dep);
        }
        self
    }

    /// Sets the total attempt budget.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Sets the per-invocation timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the failure policy.
    #[must_use]
    pub fn with_on_failure(mut self, policy: FailurePolicy) -> Self {
        self.on_failure = Some(policy);
        self
    }

    /// Returns true if this stage declares `stage` as a dependency.
    #[must_use]
    pub fn depends_on(&self, stage: &str) -> bool {
        self.depends_on.iter().any(|d| d == stage)
    }
}

impl fmt::Debug for StageDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageDefinition")
            .field("name", &self.name)
            .field("depends_on", &self.depends_on)
            .field("max_attempts", &self.max_attempts)
            .field("timeout", &self.timeout)
            .field("on_failure", &self.on_failure)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::FnExecutor;

    fn echo() -> Arc<dyn Executor> {
        Arc::new(FnExecutor::new("echo", |ctx: &str| Ok(ctx.to_string())))
    }

    #[test]
    fn test_definition_defaults() {
        let def = StageDefinition::new("analyze", echo());

        assert_eq!(def.name, "analyze");
        assert!(def.depends_on.is_empty());
        assert_eq!(def.max_attempts, 1);
        assert!(def.timeout.is_none());
        assert!(def.on_failure.is_none());
    }

    #[test]
    fn test_dependencies_deduplicated_in_order() {
        let def = StageDefinition::new("verify", echo())
            .with_dependencies(["implement", "analyze", "implement"]);

        assert_eq!(def.depends_on, vec!["implement", "analyze"]);
        assert!(def.depends_on("analyze"));
        assert!(!def.depends_on("verify"));
    }

    #[test]
    fn test_builder_setters() {
        let def = StageDefinition::new("implement", echo())
            .with_max_attempts(3)
            .with_timeout(Duration::from_secs(30))
            .with_on_failure(FailurePolicy::ContinueWithFailure);

        assert_eq!(def.max_attempts, 3);
        assert_eq!(def.timeout, Some(Duration::from_secs(30)));
        assert_eq!(def.on_failure, Some(FailurePolicy::ContinueWithFailure));
    }

    #[test]
    fn test_debug_omits_executor() {
        let def = StageDefinition::new("analyze", echo());
        let debug = format!("{def:?}");
        assert!(debug.contains("analyze"));
        assert!(!debug.contains("FnExecutor"));
    }
}

//! Pipeline builder.

use super::{EngineConfig, Pipeline, RetryConfig, StageDefinition};
use crate::core::FailurePolicy;
use crate::events::{EventSink, NoOpEventSink};
use crate::errors::ConfigurationError;
use crate::executor::Executor;
use std::sync::Arc;
use std::time::Duration;

/// Builder for creating validated pipelines.
///
/// Stages may be added in any order; the graph is validated once, in
/// [`PipelineBuilder::build`].
#[derive(Clone)]
pub struct PipelineBuilder {
    /// The pipeline name.
    name: String,
    /// The stage definitions in declaration order.
    stages: Vec<StageDefinition>,
    /// Engine-wide defaults.
    config: EngineConfig,
    /// Where run events go.
    events: Option<Arc<dyn EventSink>>,
}

impl std::fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("name", &self.name)
            .field("stages", &self.stages)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PipelineBuilder {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
            config: EngineConfig::default(),
            events: None,
        }
    }

    /// Adds a stage with default attempts, timeout and policy.
    #[must_use]
    pub fn stage(
        self,
        name: impl Into<String>,
        executor: Arc<dyn Executor>,
        dependencies: &[&str],
    ) -> Self {
        let def = StageDefinition::new(name, executor).with_dependencies(dependencies.iter().copied());
        self.add_stage(def)
    }

    /// Adds a fully specified stage.
    #[must_use]
    pub fn add_stage(mut self, definition: StageDefinition) -> Self {
        self.stages.push(definition);
        self
    }

    /// Sets the timeout for stages that do not set their own.
    #[must_use]
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.config.default_timeout = timeout;
        self
    }

    /// Sets the failure policy for stages that do not set their own.
    #[must_use]
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.config.default_on_failure = policy;
        self
    }

    /// Sets the delay between attempts.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.config.retry = retry;
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = Some(sink);
        self
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Validates the graph and builds the pipeline.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` for an empty pipeline, duplicate or
    /// unknown stage names, zero attempts, a zero timeout or a cycle.
    pub fn build(self) -> Result<Pipeline, ConfigurationError> {
        let events = self.events.unwrap_or_else(|| Arc::new(NoOpEventSink));
        Pipeline::new(self.name, self.stages, self.config, events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::FnExecutor;

    fn echo(name: &str) -> Arc<dyn Executor> {
        Arc::new(FnExecutor::new(name, |ctx: &str| Ok(ctx.to_string())))
    }

    #[test]
    fn test_builder_creation() {
        let builder = PipelineBuilder::new("solver");
        assert_eq!(builder.name(), "solver");
        assert_eq!(builder.stage_count(), 0);
    }

    #[test]
    fn test_builder_with_dependencies() {
        let pipeline = PipelineBuilder::new("solver")
            .stage("verify", echo("verify"), &["implement"])
            .stage("implement", echo("implement"), &["analyze"])
            .stage("analyze", echo("analyze"), &[])
            .build()
            .unwrap();

        assert_eq!(pipeline.stage_count(), 3);
        assert_eq!(pipeline.execution_order(), &["analyze", "implement", "verify"]);
    }

    #[test]
    fn test_builder_missing_dependency() {
        let err = PipelineBuilder::new("solver")
            .stage("verify", echo("verify"), &["implement"])
            .build()
            .unwrap_err();

        assert_eq!(err.code(), "CONFIG-MISSING_DEP");
    }

    #[test]
    fn test_builder_cycle_detection() {
        let err = PipelineBuilder::new("solver")
            .stage("a", echo("a"), &["b"])
            .stage("b", echo("b"), &["a"])
            .build()
            .unwrap_err();

        assert!(matches!(err, ConfigurationError::CycleDetected { .. }));
    }

    #[test]
    fn test_builder_empty_build() {
        let err = PipelineBuilder::new("solver").build().unwrap_err();
        assert_eq!(err, ConfigurationError::EmptyPipeline);
    }

    #[test]
    fn test_builder_zero_timeout() {
        let err = PipelineBuilder::new("solver")
            .add_stage(StageDefinition::new("analyze", echo("analyze")).with_timeout(Duration::ZERO))
            .build()
            .unwrap_err();

        assert!(matches!(err, ConfigurationError::InvalidTimeout { ref stage, .. } if stage == "analyze"));
    }

    #[test]
    fn test_builder_engine_defaults() {
        let pipeline = PipelineBuilder::new("solver")
            .stage("analyze", echo("analyze"), &[])
            .with_default_timeout(Duration::from_secs(5))
            .with_failure_policy(FailurePolicy::ContinueWithFailure)
            .with_retry(RetryConfig::new().with_base_delay_ms(10))
            .build()
            .unwrap();

        let config = pipeline.config();
        assert_eq!(config.default_timeout, Duration::from_secs(5));
        assert_eq!(config.default_on_failure, FailurePolicy::ContinueWithFailure);
        assert_eq!(config.retry.base_delay_ms, 10);
    }
}

//! Sequential pipeline execution.
//!
//! Stages run one at a time in resolved order. Each stage sees the problem
//! input plus the outputs of exactly the stages it depends on. Failures are
//! retried up to the stage's attempt budget and then handled by its failure
//! policy.

use super::{resolve_order, ResolvedOrder, RetryConfig, StageDefinition};
use crate::cancellation::CancellationToken;
use crate::context::{ContextStore, StageInput};
use crate::core::{
    FailureKind, FailurePolicy, RunArtifact, RunArtifactBuilder, StageFailure, StageResult,
};
use crate::errors::{ConfigurationError, ExecutorError};
use crate::events::{EventSink, NoOpEventSink};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Default per-invocation timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Engine-wide defaults applied to stages that do not override them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Timeout for stages without their own.
    pub default_timeout: Duration,
    /// Failure policy for stages without their own.
    pub default_on_failure: FailurePolicy,
    /// Delay between attempts.
    pub retry: RetryConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_timeout: DEFAULT_TIMEOUT,
            default_on_failure: FailurePolicy::Abort,
            retry: RetryConfig::default(),
        }
    }
}

/// A validated pipeline, ready to run any number of times.
///
/// The pipeline itself holds no run state: every call to [`Pipeline::run`]
/// gets its own context store and artifact builder, so independent runs may
/// execute concurrently.
pub struct Pipeline {
    name: String,
    stages: Vec<StageDefinition>,
    order: ResolvedOrder,
    config: EngineConfig,
    events: Arc<dyn EventSink>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("order", &self.order.names())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Validates the stages and resolves their order.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` if the stage set is invalid. No stage
    /// executes on a broken graph.
    pub fn new(
        name: impl Into<String>,
        stages: Vec<StageDefinition>,
        config: EngineConfig,
        events: Arc<dyn EventSink>,
    ) -> Result<Self, ConfigurationError> {
        if config.default_timeout.is_zero() {
            return Err(ConfigurationError::InvalidTimeout {
                stage: "(default)".to_string(),
                reason: "default timeout must be positive".to_string(),
            });
        }
        let order = resolve_order(&stages)?;
        Ok(Self {
            name: name.into(),
            stages,
            order,
            config,
            events,
        })
    }

    /// Creates a pipeline with default engine config and no event sink.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` if the stage set is invalid.
    pub fn with_defaults(
        name: impl Into<String>,
        stages: Vec<StageDefinition>,
    ) -> Result<Self, ConfigurationError> {
        Self::new(name, stages, EngineConfig::default(), Arc::new(NoOpEventSink))
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

    /// Returns the stage names in execution order.
    #[must_use]
    pub fn execution_order(&self) -> &[String] {
        self.order.names()
    }

    /// Returns the stage definitions in declaration order.
    #[must_use]
    pub fn stages(&self) -> &[StageDefinition] {
        &self.stages
    }

    /// Returns the engine config.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Runs the pipeline over one problem.
    pub async fn run(&self, problem_input: &str) -> RunArtifact {
        self.run_with_cancel(problem_input, &CancellationToken::new())
            .await
    }

    /// Runs the pipeline, checking `cancel` before each stage and retry.
    pub async fn run_with_cancel(
        &self,
        problem_input: &str,
        cancel: &CancellationToken,
    ) -> RunArtifact {
        let artifact = RunArtifactBuilder::new(&self.name, problem_input);
        let span = info_span!("pipeline_run", pipeline = %self.name, run_id = %artifact.run_id());

        self.drive(artifact, problem_input, cancel)
            .instrument(span)
            .await
    }

    async fn drive(
        &self,
        mut artifact: RunArtifactBuilder,
        problem_input: &str,
        cancel: &CancellationToken,
    ) -> RunArtifact {
        let run_id = artifact.run_id().to_string();
        let mut context = ContextStore::new();
        // Stages that failed or were skipped; their dependents are skipped.
        let mut unsuccessful: HashSet<&str> = HashSet::new();

        info!(stages = self.stages.len(), "Pipeline started");
        self.events.try_emit(
            "pipeline.started",
            Some(json!({
                "pipeline": &self.name,
                "run_id": &run_id,
                "order": self.order.names(),
            })),
        );

        for &idx in self.order.indices() {
            let stage = &self.stages[idx];

            if let Some(reason) = cancel.check() {
                warn!(stage = %stage.name, reason = %reason, "Pipeline cancelled before stage");
                self.events.try_emit(
                    "pipeline.cancelled",
                    Some(json!({"run_id": &run_id, "next_stage": &stage.name, "reason": &reason})),
                );
                artifact.mark_cancelled(reason);
                break;
            }

            if let Some(dep) = stage
                .depends_on
                .iter()
                .find(|d| unsuccessful.contains(d.as_str()))
            {
                let reason = format!("dependency '{dep}' did not succeed");
                info!(stage = %stage.name, reason = %reason, "Stage skipped");
                self.events.try_emit(
                    "stage.skipped",
                    Some(json!({"run_id": &run_id, "stage": &stage.name, "reason": &reason})),
                );
                unsuccessful.insert(stage.name.as_str());
                artifact.record(StageResult::skipped(&stage.name, reason));
                continue;
            }

            let result = match StageInput::assemble(
                &stage.name,
                &stage.depends_on,
                problem_input,
                &context,
            ) {
                Ok(input) => self.execute_stage(stage, &input, cancel, &run_id).await,
                Err(err) => {
                    error!(stage = %stage.name, error = %err, "Stage input could not be assembled");
                    let failure = StageFailure {
                        kind: FailureKind::Failure,
                        message: err.to_string(),
                        attempt: 0,
                    };
                    StageResult::failed(&stage.name, failure, 0, 0.0)
                }
            };

            if let Some(output) = result.output.as_deref() {
                if let Err(err) = context.set(&stage.name, output) {
                    error!(stage = %stage.name, error = %err, "Context write rejected");
                }
                artifact.record(result);
                continue;
            }

            let policy = stage.on_failure.unwrap_or(self.config.default_on_failure);
            self.events.try_emit(
                "stage.failed",
                Some(json!({
                    "run_id": &run_id,
                    "stage": &stage.name,
                    "attempts": result.attempts,
                    "error": &result.error,
                    "policy": policy.to_string(),
                })),
            );
            unsuccessful.insert(stage.name.as_str());
            artifact.record(result);

            if policy == FailurePolicy::Abort {
                warn!(stage = %stage.name, "Stage failed, aborting pipeline");
                artifact.mark_aborted();
                break;
            }
            warn!(stage = %stage.name, "Stage failed, continuing with independent stages");
        }

        let finished = artifact.finish();
        info!(status = %finished.overall_status, "Pipeline finished");
        self.events.try_emit(
            "pipeline.finished",
            Some(json!({
                "run_id": &run_id,
                "status": finished.overall_status.to_string(),
                "stages_recorded": finished.ordered_results.len(),
            })),
        );
        finished
    }

    /// Invokes one stage, retrying until it succeeds or its attempts run out.
    async fn execute_stage(
        &self,
        stage: &StageDefinition,
        input: &StageInput,
        cancel: &CancellationToken,
        run_id: &str,
    ) -> StageResult {
        let timeout = stage.timeout.unwrap_or(self.config.default_timeout);
        let rendered = input.render();
        let started = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            debug!(stage = %stage.name, attempt, input_len = rendered.len(), "Invoking executor");
            self.events.try_emit(
                "stage.started",
                Some(json!({"run_id": run_id, "stage": &stage.name, "attempt": attempt})),
            );

            let outcome = match tokio::time::timeout(timeout, stage.executor.invoke(&rendered, timeout)).await {
                Ok(result) => result,
                Err(_) => Err(ExecutorError::Timeout(timeout)),
            };

            match outcome {
                Ok(output) => {
                    let duration_ms = elapsed_ms(started);
                    info!(stage = %stage.name, attempt, duration_ms, "Stage succeeded");
                    self.events.try_emit(
                        "stage.succeeded",
                        Some(json!({
                            "run_id": run_id,
                            "stage": &stage.name,
                            "attempts": attempt,
                            "duration_ms": duration_ms,
                            "output_len": output.len(),
                        })),
                    );
                    return StageResult::succeeded(&stage.name, output, attempt, duration_ms);
                }
                Err(err) => {
                    warn!(stage = %stage.name, attempt, max_attempts = stage.max_attempts, error = %err, "Stage attempt failed");
                    self.events.try_emit(
                        "stage.attempt_failed",
                        Some(json!({
                            "run_id": run_id,
                            "stage": &stage.name,
                            "attempt": attempt,
                            "timeout": err.is_timeout(),
                            "error": err.to_string(),
                        })),
                    );

                    if attempt >= stage.max_attempts || cancel.is_cancelled() {
                        let failure = StageFailure::from_executor_error(&err, attempt);
                        return StageResult::failed(&stage.name, failure, attempt, elapsed_ms(started));
                    }

                    let delay = self.config.retry.delay_for(attempt);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{RunStatus, StageStatus};
    use crate::events::CollectingEventSink;
    use crate::executor::{Executor, FnExecutor, MockExecutor};
    use crate::testing::{FailingExecutor, ScriptedExecutor, SlowExecutor};

    fn ok(name: &str) -> Arc<dyn Executor> {
        let label = name.to_string();
        Arc::new(FnExecutor::new(name, move |_ctx: &str| Ok(format!("{label} done"))))
    }

    #[tokio::test]
    async fn test_single_stage() {
        let pipeline = Pipeline::with_defaults("p", vec![StageDefinition::new("only", ok("only"))]).unwrap();

        let artifact = pipeline.run("reverse a string").await;
        assert_eq!(artifact.overall_status, RunStatus::Completed);
        assert_eq!(artifact.output("only"), Some("only done"));
        assert_eq!(artifact.ordered_results[0].attempts, 1);
    }

    #[tokio::test]
    async fn test_invalid_graph_invokes_nothing() {
        let mut mock = MockExecutor::new();
        mock.expect_invoke().never();
        let executor: Arc<dyn Executor> = Arc::new(mock);

        let err = Pipeline::with_defaults(
            "p",
            vec![StageDefinition::new("verify", executor).with_dependency("implement")],
        )
        .unwrap_err();

        assert!(matches!(err, ConfigurationError::UnknownDependency { .. }));
    }

    #[test]
    fn test_zero_timeouts_rejected() {
        let err = Pipeline::with_defaults(
            "p",
            vec![StageDefinition::new("analyze", ok("analyze")).with_timeout(Duration::ZERO)],
        )
        .unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidTimeout { ref stage, .. } if stage == "analyze"));

        let config = EngineConfig {
            default_timeout: Duration::ZERO,
            ..EngineConfig::default()
        };
        let err = Pipeline::new(
            "p",
            vec![StageDefinition::new("analyze", ok("analyze"))],
            config,
            Arc::new(NoOpEventSink),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidTimeout { ref stage, .. } if stage == "(default)"));
    }

    #[tokio::test]
    async fn test_retry_until_success() {
        let flaky = Arc::new(
            ScriptedExecutor::new("implement")
                .then_err(ExecutorError::failure("rate limited"))
                .then_err(ExecutorError::failure("rate limited"))
                .then_ok("def solve(): ..."),
        );
        let pipeline = Pipeline::with_defaults(
            "p",
            vec![StageDefinition::new("implement", flaky.clone()).with_max_attempts(3)],
        )
        .unwrap();

        let artifact = pipeline.run("p").await;
        let result = artifact.result("implement").unwrap();

        assert_eq!(result.status, StageStatus::Succeeded);
        assert_eq!(result.attempts, 3);
        assert_eq!(flaky.call_count(), 3);
        // Every attempt sees the same input.
        let calls = flaky.calls();
        assert!(calls.iter().all(|c| c == &calls[0]));
    }

    #[tokio::test]
    async fn test_timeout_is_a_failure() {
        let slow = Arc::new(SlowExecutor::new("slow", Duration::from_millis(200)));
        let pipeline = Pipeline::with_defaults(
            "p",
            vec![StageDefinition::new("analyze", slow.clone())
                .with_timeout(Duration::from_millis(10))
                .with_max_attempts(2)],
        )
        .unwrap();

        let artifact = pipeline.run("p").await;
        let result = artifact.result("analyze").unwrap();

        assert_eq!(artifact.overall_status, RunStatus::Aborted);
        assert_eq!(result.status, StageStatus::Failed);
        assert_eq!(result.attempts, 2);
        let error = result.error.as_ref().unwrap();
        assert_eq!(error.kind, FailureKind::Timeout);
        assert_eq!(error.attempt, 2);
        assert_eq!(slow.call_count(), 2);
    }

    #[tokio::test]
    async fn test_engine_default_policy_applies() {
        let config = EngineConfig {
            default_on_failure: FailurePolicy::ContinueWithFailure,
            ..EngineConfig::default()
        };
        let stages = vec![
            StageDefinition::new("a", Arc::new(FailingExecutor::new("a", "down"))),
            StageDefinition::new("b", ok("b")),
        ];
        let pipeline = Pipeline::new("p", stages, config, Arc::new(NoOpEventSink)).unwrap();

        let artifact = pipeline.run("p").await;
        assert_eq!(artifact.overall_status, RunStatus::PartiallyFailed);
        assert_eq!(artifact.result("b").unwrap().status, StageStatus::Succeeded);
    }

    #[tokio::test]
    async fn test_stage_policy_overrides_default() {
        let stages = vec![
            StageDefinition::new("a", Arc::new(FailingExecutor::new("a", "down")))
                .with_on_failure(FailurePolicy::ContinueWithFailure),
            StageDefinition::new("b", ok("b")),
        ];
        let pipeline = Pipeline::with_defaults("p", stages).unwrap();

        let artifact = pipeline.run("p").await;
        assert_eq!(artifact.overall_status, RunStatus::PartiallyFailed);
        assert_eq!(artifact.stage_order(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_cancelled_before_first_stage() {
        let executor = Arc::new(ScriptedExecutor::new("analyze"));
        let pipeline = Pipeline::with_defaults(
            "p",
            vec![StageDefinition::new("analyze", executor.clone())],
        )
        .unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel("shutdown");
        let artifact = pipeline.run_with_cancel("p", &cancel).await;

        assert_eq!(artifact.overall_status, RunStatus::Aborted);
        assert!(artifact.ordered_results.is_empty());
        assert_eq!(artifact.cancel_reason.as_deref(), Some("shutdown"));
        assert_eq!(executor.call_count(), 0);
    }

    #[tokio::test]
    async fn test_cancel_between_stages() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let first: Arc<dyn Executor> = Arc::new(FnExecutor::new("first", move |_ctx: &str| {
            trigger.cancel("operator request");
            Ok("first done".to_string())
        }));
        let second = Arc::new(ScriptedExecutor::new("second"));

        let pipeline = Pipeline::with_defaults(
            "p",
            vec![
                StageDefinition::new("first", first),
                StageDefinition::new("second", second.clone()).with_dependency("first"),
            ],
        )
        .unwrap();

        let artifact = pipeline.run_with_cancel("p", &cancel).await;

        // The in-flight stage completes; the next one never starts.
        assert_eq!(artifact.stage_order(), vec!["first"]);
        assert_eq!(artifact.result("first").unwrap().status, StageStatus::Succeeded);
        assert_eq!(artifact.overall_status, RunStatus::Aborted);
        assert_eq!(second.call_count(), 0);
    }

    #[tokio::test]
    async fn test_events_emitted_in_order() {
        let sink = Arc::new(CollectingEventSink::new());
        let stages = vec![
            StageDefinition::new(
                "analyze",
                Arc::new(
                    ScriptedExecutor::new("analyze")
                        .then_err(ExecutorError::failure("flaky"))
                        .then_ok("plan"),
                ),
            )
            .with_max_attempts(2),
            StageDefinition::new("implement", Arc::new(FailingExecutor::new("implement", "down")))
                .with_on_failure(FailurePolicy::ContinueWithFailure),
            StageDefinition::new("verify", ok("verify")).with_dependency("implement"),
        ];
        let pipeline = Pipeline::new("p", stages, EngineConfig::default(), sink.clone()).unwrap();

        pipeline.run("p").await;

        assert_eq!(
            sink.event_types(),
            vec![
                "pipeline.started",
                "stage.started",
                "stage.attempt_failed",
                "stage.started",
                "stage.succeeded",
                "stage.started",
                "stage.attempt_failed",
                "stage.failed",
                "stage.skipped",
                "pipeline.finished",
            ]
        );
    }
}

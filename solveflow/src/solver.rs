//! Runs the pipeline over every unsolved problem.
//!
//! Each problem gets its own independent run. Up to `concurrency` runs are in
//! flight at once; every finished artifact is persisted, and a problem is
//! marked solved only when its run completed.

use crate::cancellation::CancellationToken;
use crate::core::RunStatus;
use crate::errors::{SolveflowError, StorageError};
use crate::events::{EventSink, NoOpEventSink};
use crate::intake::{Problem, ProblemSource};
use crate::observability::WideEventEmitter;
use crate::persistence::ArtifactStore;
use crate::pipeline::Pipeline;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};

/// What happened to one problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProblemOutcome {
    /// Problem name.
    pub problem: String,
    /// Overall status of its run.
    pub status: RunStatus,
    /// Where the artifact was stored; `None` if the problem was never run.
    pub artifact_path: Option<PathBuf>,
    /// Whether the problem was moved to the solved set.
    pub marked_solved: bool,
}

/// Outcomes of a batch, in problem order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SolveReport {
    /// One outcome per problem.
    pub outcomes: Vec<ProblemOutcome>,
}

impl SolveReport {
    /// Returns the number of problems.
    #[must_use]
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// Returns true if there were no problems.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Returns the number of problems marked solved.
    #[must_use]
    pub fn solved(&self) -> usize {
        self.outcomes.iter().filter(|o| o.marked_solved).count()
    }

    /// Returns the number of runs with the given status.
    #[must_use]
    pub fn count(&self, status: RunStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }
}

/// Drives a pipeline over a problem source.
pub struct ProblemSolver {
    pipeline: Arc<Pipeline>,
    source: Arc<dyn ProblemSource>,
    store: Arc<dyn ArtifactStore>,
    concurrency: usize,
    cancel: CancellationToken,
    events: Arc<dyn EventSink>,
    wide_events: WideEventEmitter,
}

impl std::fmt::Debug for ProblemSolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProblemSolver")
            .field("pipeline", &self.pipeline.name())
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

impl ProblemSolver {
    /// Creates a solver that handles one problem at a time.
    #[must_use]
    pub fn new(
        pipeline: Arc<Pipeline>,
        source: Arc<dyn ProblemSource>,
        store: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self {
            pipeline,
            source,
            store,
            concurrency: 1,
            cancel: CancellationToken::new(),
            events: Arc::new(NoOpEventSink),
            wide_events: WideEventEmitter::new(),
        }
    }

    /// Sets how many problems run at once. Zero is treated as one.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Shares a cancellation token with the caller.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Sets the sink for per-run summary events.
    #[must_use]
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Returns the cancellation token.
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Solves every unsolved problem.
    ///
    /// # Errors
    ///
    /// Returns `SolveflowError::Intake` if the problem list cannot be read and
    /// `SolveflowError::Storage` as soon as an artifact cannot be stored.
    pub async fn solve_all(&self) -> Result<SolveReport, SolveflowError> {
        let problems = self.source.unsolved().await?;
        info!(count = problems.len(), concurrency = self.concurrency, "Solving problems");

        let mut indexed: Vec<(usize, ProblemOutcome)> = stream::iter(problems.into_iter().enumerate())
            .map(|(index, problem)| async move {
                self.solve_one(problem).await.map(|outcome| (index, outcome))
            })
            .buffer_unordered(self.concurrency)
            .try_collect()
            .await?;
        indexed.sort_by_key(|(index, _)| *index);

        let report = SolveReport {
            outcomes: indexed.into_iter().map(|(_, outcome)| outcome).collect(),
        };
        info!(
            total = report.total(),
            solved = report.solved(),
            aborted = report.count(RunStatus::Aborted),
            "Finished solving problems"
        );
        Ok(report)
    }

    /// Runs, persists and, on success, marks one problem.
    ///
    /// # Errors
    ///
    /// Returns a `StorageError` if the artifact cannot be stored.
    pub async fn solve_one(&self, problem: Problem) -> Result<ProblemOutcome, StorageError> {
        if let Some(reason) = self.cancel.check() {
            info!(problem = %problem.name, reason = %reason, "Skipping problem after cancellation");
            return Ok(ProblemOutcome {
                problem: problem.name,
                status: RunStatus::Aborted,
                artifact_path: None,
                marked_solved: false,
            });
        }

        let span = info_span!("problem", name = %problem.name);
        async {
            info!("Starting to process problem");
            let artifact = self
                .pipeline
                .run_with_cancel(&problem.text, &self.cancel)
                .await;
            self.wide_events
                .emit_run_event(self.events.as_ref(), &problem.name, &artifact);

            let path = self.store.store(&problem, &artifact).await?;

            let marked_solved = if artifact.overall_status == RunStatus::Completed {
                match self.source.mark_solved(&problem).await {
                    Ok(()) => true,
                    Err(err) => {
                        warn!(error = %err, "Could not mark problem as solved");
                        false
                    }
                }
            } else {
                warn!(status = %artifact.overall_status, "Problem left unsolved");
                false
            };

            Ok::<_, StorageError>(ProblemOutcome {
                problem: problem.name.clone(),
                status: artifact.overall_status,
                artifact_path: Some(path),
                marked_solved,
            })
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StageStatus;
    use crate::errors::ExecutorError;
    use crate::events::CollectingEventSink;
    use crate::executor::{Executor, FnExecutor};
    use crate::pipeline::PipelineBuilder;
    use crate::testing::{InMemoryArtifactStore, InMemoryProblemSource, SlowExecutor};
    use pretty_assertions::assert_eq;

    fn solving_pipeline() -> Arc<Pipeline> {
        // Problems mentioning "impossible" fail the implement stage.
        let implement: Arc<dyn Executor> = Arc::new(FnExecutor::new("implement", |ctx: &str| {
            if ctx.contains("impossible") {
                Err(ExecutorError::failure("no idea"))
            } else {
                Ok("```python\ndef solve(): pass\n```".to_string())
            }
        }));
        let analyze: Arc<dyn Executor> = Arc::new(FnExecutor::new("analyze", |_ctx: &str| Ok("plan".to_string())));

        Arc::new(
            PipelineBuilder::new("solver")
                .stage("analyze", analyze, &[])
                .stage("implement", implement, &["analyze"])
                .build()
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_solve_all_marks_completed_only() {
        let source = Arc::new(InMemoryProblemSource::new([
            ("a_easy", "reverse a string"),
            ("b_hard", "an impossible problem"),
            ("c_easy", "add two numbers"),
        ]));
        let store = Arc::new(InMemoryArtifactStore::new());
        let solver = ProblemSolver::new(solving_pipeline(), source.clone(), store.clone());

        let report = solver.solve_all().await.unwrap();

        let names: Vec<_> = report.outcomes.iter().map(|o| o.problem.as_str()).collect();
        assert_eq!(names, vec!["a_easy", "b_hard", "c_easy"]);
        assert_eq!(report.solved(), 2);
        assert_eq!(report.count(RunStatus::Aborted), 1);
        assert!(!report.outcomes[1].marked_solved);
        assert!(report.outcomes.iter().all(|o| o.artifact_path.is_some()));

        assert_eq!(source.solved(), vec!["a_easy", "c_easy"]);
        assert_eq!(source.remaining(), vec!["b_hard"]);
        assert_eq!(store.stored().len(), 3);

        let failed = store.get("b_hard").unwrap();
        assert_eq!(failed.result("implement").unwrap().status, StageStatus::Failed);
    }

    #[tokio::test]
    async fn test_concurrent_runs_keep_problem_order() {
        let slow: Arc<dyn Executor> = Arc::new(SlowExecutor::with_delay_ms("analyze", 50));
        let pipeline = Arc::new(PipelineBuilder::new("slow").stage("analyze", slow, &[]).build().unwrap());
        let source = Arc::new(InMemoryProblemSource::new([("p1", "x"), ("p2", "y"), ("p3", "z"), ("p4", "w")]));
        let store = Arc::new(InMemoryArtifactStore::new());

        let solver = ProblemSolver::new(pipeline, source, store).with_concurrency(4);
        let started = std::time::Instant::now();
        let report = solver.solve_all().await.unwrap();

        assert_eq!(report.solved(), 4);
        let names: Vec<_> = report.outcomes.iter().map(|o| o.problem.as_str()).collect();
        assert_eq!(names, vec!["p1", "p2", "p3", "p4"]);
        assert!(started.elapsed() < std::time::Duration::from_millis(180));
    }

    #[tokio::test]
    async fn test_storage_error_propagates() {
        let source = Arc::new(InMemoryProblemSource::new([("a", "reverse a string")]));
        let solver = ProblemSolver::new(
            solving_pipeline(),
            source.clone(),
            Arc::new(InMemoryArtifactStore::failing()),
        );

        let err = solver.solve_all().await.unwrap_err();

        assert!(matches!(err, SolveflowError::Storage(StorageError::Io { .. })));
        assert!(source.solved().is_empty());
    }

    #[tokio::test]
    async fn test_mark_failure_is_not_fatal() {
        let source = Arc::new(InMemoryProblemSource::new([("a", "reverse a string")]).failing_mark());
        let solver = ProblemSolver::new(solving_pipeline(), source, Arc::new(InMemoryArtifactStore::new()));

        let report = solver.solve_all().await.unwrap();

        assert_eq!(report.outcomes[0].status, RunStatus::Completed);
        assert!(!report.outcomes[0].marked_solved);
    }

    #[tokio::test]
    async fn test_cancelled_solver_runs_nothing() {
        let source = Arc::new(InMemoryProblemSource::new([("a", "x"), ("b", "y")]));
        let store = Arc::new(InMemoryArtifactStore::new());
        let cancel = CancellationToken::new();
        cancel.cancel("shutdown");

        let solver = ProblemSolver::new(solving_pipeline(), source, store.clone()).with_cancellation(cancel);
        let report = solver.solve_all().await.unwrap();

        assert_eq!(report.count(RunStatus::Aborted), 2);
        assert!(report.outcomes.iter().all(|o| o.artifact_path.is_none()));
        assert!(store.stored().is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_problem_does_not_block_batch() {
        use crate::intake::DirectoryProblemSource;
        use tempfile::TempDir;

        let tmp = TempDir::new().unwrap();
        let source = Arc::new(DirectoryProblemSource::new(tmp.path()));
        source.ensure_dirs().await.unwrap();
        tokio::fs::write(source.unsolved_dir().join("a_good.txt"), "reverse a string")
            .await
            .unwrap();
        tokio::fs::write(source.unsolved_dir().join("b_bad.txt"), [0xff, 0xfe, 0x00])
            .await
            .unwrap();
        let store = Arc::new(InMemoryArtifactStore::new());

        let solver = ProblemSolver::new(solving_pipeline(), source.clone(), store.clone());
        let report = solver.solve_all().await.unwrap();

        assert_eq!(report.total(), 1);
        assert_eq!(report.outcomes[0].problem, "a_good");
        assert!(report.outcomes[0].marked_solved);
        assert!(source.solved_dir().join("a_good.txt").exists());
        assert!(source.unsolved_dir().join("b_bad.txt").exists());
    }

    #[tokio::test]
    async fn test_empty_source() {
        let solver = ProblemSolver::new(
            solving_pipeline(),
            Arc::new(InMemoryProblemSource::default()),
            Arc::new(InMemoryArtifactStore::new()),
        );

        let report = solver.solve_all().await.unwrap();
        assert!(report.is_empty());
        assert_eq!(report.total(), 0);
    }

    #[tokio::test]
    async fn test_summary_event_per_problem() {
        let sink = Arc::new(CollectingEventSink::new());
        let source = Arc::new(InMemoryProblemSource::new([("a", "x"), ("b", "y")]));
        let solver = ProblemSolver::new(solving_pipeline(), source, Arc::new(InMemoryArtifactStore::new()))
            .with_event_sink(sink.clone());

        solver.solve_all().await.unwrap();

        let summaries = sink.events_of_type("pipeline.wide");
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].1.as_ref().unwrap()["status"], "completed");
    }
}

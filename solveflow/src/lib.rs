//! # Solveflow
//!
//! A stage-dependency pipeline engine for solving coding problems with LLM
//! stages.
//!
//! A pipeline is a set of named stages with declared dependencies. Solveflow
//! provides:
//!
//! - **Deterministic resolution**: a topological order computed once, ties
//!   broken by declaration order, cycles and unknown names rejected up front
//! - **Dependency-scoped context**: each stage sees the problem plus the
//!   outputs of exactly the stages it depends on
//! - **Retries and failure policies**: per-stage attempt budgets and timeouts,
//!   abort or continue-with-failure, transitive skipping of dependents
//! - **Run artifacts**: one structured record per run, persisted as text and
//!   JSON, optionally with the results of running the extracted test cases
//! - **Problem batches**: intake from a directory, concurrent independent
//!   runs, solved problems moved aside
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use solveflow::prelude::*;
//!
//! let pipeline = PipelineBuilder::new("solver")
//!     .stage("analyze", analyze_executor, &[])
//!     .stage("implement", implement_executor, &["analyze"])
//!     .stage("verify", verify_executor, &["implement"])
//!     .build()?;
//!
//! let artifact = pipeline.run("reverse a string").await;
//! assert_eq!(artifact.overall_status, RunStatus::Completed);
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod config;
pub mod context;
pub mod core;
pub mod errors;
pub mod events;
pub mod executor;
pub mod extract;
pub mod intake;
pub mod observability;
pub mod persistence;
pub mod pipeline;
pub mod solver;
pub mod test_runner;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::config::{load_env_file, PipelineConfig, Settings, StageConfig};
    pub use crate::context::{ContextStore, StageInput};
    pub use crate::core::{
        FailureKind, FailurePolicy, RunArtifact, RunStatus, StageFailure, StageResult,
        StageStatus,
    };
    pub use crate::errors::{
        ConfigurationError, ContextError, ExecutorError, IntakeError, SettingsError,
        SolveflowError, StorageError, TestRunError,
    };
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::executor::{Executor, ExecutorFactory, FnExecutor};
    #[cfg(feature = "openai")]
    pub use crate::executor::{OpenAiConfig, OpenAiExecutor, OpenAiExecutorFactory};
    pub use crate::extract::{extract_solution, extract_test_cases, TestCase};
    pub use crate::intake::{DirectoryProblemSource, Problem, ProblemSource};
    pub use crate::observability::{init_logging, LogConfig};
    pub use crate::persistence::{ArtifactStore, FileArtifactStore};
    pub use crate::pipeline::{
        resolve_order, BackoffStrategy, EngineConfig, Pipeline, PipelineBuilder,
        ResolvedOrder, RetryConfig, StageDefinition,
    };
    pub use crate::solver::{ProblemOutcome, ProblemSolver, SolveReport};
    pub use crate::test_runner::{PythonTestRunner, TestReport, TestRunner};
}

/// Version of the solveflow crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

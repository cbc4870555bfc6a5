//! Persisting run artifacts.
//!
//! [`FileArtifactStore`] writes a human-readable report next to a JSON copy
//! of the artifact. With a [`TestRunner`] attached, the extracted test cases
//! are run against the extracted solution first and the report gains a
//! `Test Results` section.
//!
//!
//! ```text
//! <solved_dir>/<problem>_results_<YYYYmmdd_HHMMSS>.txt
//! <solved_dir>/<problem>_results_<YYYYmmdd_HHMMSS>.json
//! ```

use crate::core::{RunArtifact, StageStatus};
use crate::errors::StorageError;
use crate::extract::{code_blocks, extract_solution, extract_test_cases, TestCase};
use crate::intake::Problem;
use crate::test_runner::{TestReport, TestRunner};
use crate::utils::file_timestamp;
use async_trait::async_trait;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Stores the artifact of a finished run.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Persists `artifact` and returns where it was written.
    async fn store(&self, problem: &Problem, artifact: &RunArtifact) -> Result<PathBuf, StorageError>;
}

/// Writes text and JSON result files into a directory.
#[derive(Debug, Clone)]
pub struct FileArtifactStore {
    dir: PathBuf,
    solution_stage: String,
    tests_stage: String,
    runner: Option<Arc<dyn TestRunner>>,
}

impl FileArtifactStore {
    /// Writes into `dir`, reading the solution from `implement` and the test
    /// cases from `verify`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            solution_stage: "implement".to_string(),
            tests_stage: "verify".to_string(),
            runner: None,
        }
    }

    /// Runs extracted test cases with `runner` before writing the report.
    #[must_use]
    pub fn with_test_runner(mut self, runner: Arc<dyn TestRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    /// Sets the stage whose output holds the solution code.
    #[must_use]
    pub fn with_solution_stage(mut self, stage: impl Into<String>) -> Self {
        self.solution_stage = stage.into();
        self
    }

    /// Sets the stage whose output holds the test cases.
    #[must_use]
    pub fn with_tests_stage(mut self, stage: impl Into<String>) -> Self {
        self.tests_stage = stage.into();
        self
    }

    /// Returns the output directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Finds the solution code.
    ///
    /// Prefers the configured stage. Otherwise takes the first code block of
    /// the last succeeded stage that has one.
    #[must_use]
    pub fn solution(&self, artifact: &RunArtifact) -> Option<String> {
        artifact
            .output(&self.solution_stage)
            .and_then(extract_solution)
            .or_else(|| {
                artifact
                    .ordered_results
                    .iter()
                    .rev()
                    .filter_map(|r| r.output.as_deref())
                    .find_map(extract_solution)
            })
    }

    /// Finds the test cases.
    ///
    /// Prefers the configured stage. Otherwise scans every succeeded stage.
    #[must_use]
    pub fn test_cases(&self, artifact: &RunArtifact) -> Vec<TestCase> {
        let preferred = artifact
            .output(&self.tests_stage)
            .map(extract_test_cases)
            .unwrap_or_default();
        if !preferred.is_empty() {
            return preferred;
        }
        artifact
            .ordered_results
            .iter()
            .filter_map(|r| r.output.as_deref())
            .flat_map(extract_test_cases)
            .collect()
    }

    /// Runs the extracted test cases, if a runner is attached.
    pub async fn run_tests(&self, artifact: &RunArtifact) -> Option<TestReport> {
        let runner = self.runner.as_ref()?;
        let solution = self.solution(artifact).unwrap_or_default();
        Some(runner.run(&solution, &self.test_cases(artifact)).await)
    }

    /// Renders the text report.
    #[must_use]
    pub fn render(&self, problem: &Problem, artifact: &RunArtifact, tests: Option<&TestReport>) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "=== Problem ===");
        let _ = writeln!(out, "{}", problem.text.trim_end());

        for result in &artifact.ordered_results {
            let _ = write!(out, "\n=== Stage: {} ({}", result.stage_name, result.status);
            if result.status != StageStatus::Skipped {
                let _ = write!(out, ", {} attempt(s), {:.1} ms", result.attempts, result.duration_ms);
            }
            let _ = writeln!(out, ") ===");

            if let Some(output) = &result.output {
                let _ = writeln!(out, "{}", output.trim_end());
            }
            if let Some(error) = &result.error {
                let _ = writeln!(out, "Error ({:?}, attempt {}): {}", error.kind, error.attempt, error.message);
            }
            if let Some(reason) = &result.skip_reason {
                let _ = writeln!(out, "Skipped: {reason}");
            }
        }

        let _ = writeln!(out, "\n=== Solution ===");
        match self.solution(artifact) {
            Some(code) => {
                let _ = writeln!(out, "{code}");
            }
            None => {
                let _ = writeln!(out, "(no solution code found)");
            }
        }

        let _ = writeln!(out, "\n=== Test Cases ===");
        let cases = self.test_cases(artifact);
        if cases.is_empty() {
            let blocks = artifact
                .output(&self.tests_stage)
                .map(|o| code_blocks(o).len())
                .unwrap_or_default();
            let _ = writeln!(out, "(no test cases found; {blocks} code block(s) in '{}')", self.tests_stage);
        }
        for (i, case) in cases.iter().enumerate() {
            let _ = writeln!(out, "\nTest Case {}:", i + 1);
            let _ = writeln!(out, "Input: {}", case.input);
            let _ = writeln!(out, "Expected: {}", case.expected);
        }

        if let Some(report) = tests {
            let _ = writeln!(out, "\n=== Test Results ===");
            let _ = write!(out, "{report}");
        }

        let _ = writeln!(out, "\n=== Run ===");
        let _ = writeln!(out, "Run ID: {}", artifact.run_id);
        let _ = writeln!(out, "Pipeline: {}", artifact.pipeline_name);
        let _ = writeln!(out, "Status: {}", artifact.overall_status);
        if let Some(reason) = &artifact.cancel_reason {
            let _ = writeln!(out, "Cancelled: {reason}");
        }
        let _ = writeln!(out, "Started: {}", artifact.started_at);
        let _ = writeln!(out, "Finished: {}", artifact.finished_at);

        out
    }
}

async fn write_file(path: &Path, contents: &str) -> Result<(), StorageError> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|source| StorageError::Io {
            path: path.to_path_buf(),
            source,
        })
}

#[async_trait]
impl ArtifactStore for FileArtifactStore {
    async fn store(&self, problem: &Problem, artifact: &RunArtifact) -> Result<PathBuf, StorageError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| StorageError::Io {
                path: self.dir.clone(),
                source,
            })?;

        let stem = format!("{}_results_{}", problem.name, file_timestamp());
        let text_path = self.dir.join(format!("{stem}.txt"));
        let json_path = self.dir.join(format!("{stem}.json"));

        let json = artifact.to_json()?;
        let tests = self.run_tests(artifact).await;
        write_file(&text_path, &self.render(problem, artifact, tests.as_ref())).await?;
        write_file(&json_path, &json).await?;

        info!(problem = %problem.name, path = %text_path.display(), "Results saved");
        Ok(text_path)
    }
}

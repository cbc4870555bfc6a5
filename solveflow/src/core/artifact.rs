//! The run artifact and the builder that accumulates it.

use super::{RunStatus, StageResult};
use crate::utils::iso_timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The final structured record of one pipeline run.
///
/// Created once per problem and finalized when the engine terminates. The
/// engine never touches it after handing it to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunArtifact {
    /// Unique ID of the run.
    pub run_id: Uuid,
    /// Name of the pipeline that produced the artifact.
    pub pipeline_name: String,
    /// The problem text the run started from.
    pub problem_input: String,
    /// Stage results in execution order.
    pub ordered_results: Vec<StageResult>,
    /// The single outcome code for the run.
    pub overall_status: RunStatus,
    /// When the run started (ISO 8601).
    pub started_at: String,
    /// When the run finished (ISO 8601).
    pub finished_at: String,
    /// Set when the run stopped because it was cancelled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel_reason: Option<String>,
}

impl RunArtifact {
    /// Returns the result recorded for a stage.
    #[must_use]
    pub fn result(&self, stage: &str) -> Option<&StageResult> {
        self.ordered_results.iter().find(|r| r.stage_name == stage)
    }

    /// Returns the output of a succeeded stage.
    #[must_use]
    pub fn output(&self, stage: &str) -> Option<&str> {
        self.result(stage).and_then(|r| r.output.as_deref())
    }

    /// Returns the stage names in the order they were recorded.
    #[must_use]
    pub fn stage_order(&self) -> Vec<&str> {
        self.ordered_results
            .iter()
            .map(|r| r.stage_name.as_str())
            .collect()
    }

    /// Serializes the artifact as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Accumulates stage results during a run and computes the overall status.
#[derive(Debug)]
pub struct RunArtifactBuilder {
    run_id: Uuid,
    pipeline_name: String,
    problem_input: String,
    results: Vec<StageResult>,
    started_at: String,
    aborted: bool,
    cancel_reason: Option<String>,
}

impl RunArtifactBuilder {
    /// Starts a new artifact for one run.
    #[must_use]
    pub fn new(pipeline_name: impl Into<String>, problem_input: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            pipeline_name: pipeline_name.into(),
            problem_input: problem_input.into(),
            results: Vec::new(),
            started_at: iso_timestamp(),
            aborted: false,
            cancel_reason: None,
        }
    }

    /// Returns the run ID.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Appends a stage result.
    pub fn record(&mut self, result: StageResult) {
        self.results.push(result);
    }

    /// Returns the results recorded so far.
    #[must_use]
    pub fn results(&self) -> &[StageResult] {
        &self.results
    }

    /// Marks the run as stopped before the end of the resolved order.
    pub fn mark_aborted(&mut self) {
        self.aborted = true;
    }

    /// Marks the run as cancelled. Cancellation is a form of abort.
    pub fn mark_cancelled(&mut self, reason: impl Into<String>) {
        self.aborted = true;
        self.cancel_reason = Some(reason.into());
    }

    /// Computes the status the artifact would have if finished now.
    #[must_use]
    pub fn overall_status(&self) -> RunStatus {
        if self.aborted {
            RunStatus::Aborted
        } else if self.results.iter().all(StageResult::is_success) {
            RunStatus::Completed
        } else {
            RunStatus::PartiallyFailed
        }
    }

    /// Finalizes the artifact.
    #[must_use]
    pub fn finish(self) -> RunArtifact {
        let overall_status = self.overall_status();
        RunArtifact {
            run_id: self.run_id,
            pipeline_name: self.pipeline_name,
            problem_input: self.problem_input,
            ordered_results: self.results,
            overall_status,
            started_at: self.started_at,
            finished_at: iso_timestamp(),
            cancel_reason: self.cancel_reason,
        }
    }
}

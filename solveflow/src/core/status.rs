//! Stage status, run status and failure policy enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The terminal status of a single stage in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// The executor returned an output.
    Succeeded,
    /// Every attempt failed or timed out.
    Failed,
    /// The stage was not invoked because a dependency did not succeed.
    Skipped,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

impl StageStatus {
    /// Returns true if the stage produced an output.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// The overall outcome of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every stage succeeded.
    Completed,
    /// The run reached the end of the resolved order with at least one
    /// failed or skipped stage.
    PartiallyFailed,
    /// The run stopped before the end of the resolved order.
    Aborted,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::PartiallyFailed => write!(f, "partially_failed"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

/// What the engine does once a stage has exhausted its attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop the pipeline and mark the run aborted.
    #[default]
    Abort,
    /// Record the failure, skip dependents, continue with unrelated stages.
    ContinueWithFailure,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Abort => write!(f, "abort"),
            Self::ContinueWithFailure => write!(f, "continue_with_failure"),
        }
    }
}

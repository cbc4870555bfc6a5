//! Per-stage result records.

use super::StageStatus;
use crate::errors::ExecutorError;
use serde::{Deserialize, Serialize};

/// Why a stage attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The executor returned an error.
    Failure,
    /// The executor did not answer within the timeout.
    Timeout,
}

/// The error recorded for a failed stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFailure {
    /// Failure or timeout.
    pub kind: FailureKind,
    /// The underlying cause.
    pub message: String,
    /// The attempt (1-indexed) that produced this error.
    pub attempt: u32,
}

impl StageFailure {
    /// Records an executor error for the given attempt.
    #[must_use]
    pub fn from_executor_error(err: &ExecutorError, attempt: u32) -> Self {
        let kind = if err.is_timeout() {
            FailureKind::Timeout
        } else {
            FailureKind::Failure
        };
        Self {
            kind,
            message: err.to_string(),
            attempt,
        }
    }
}

/// The outcome of one stage within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    /// The stage name.
    pub stage_name: String,
    /// Terminal status.
    pub status: StageStatus,
    /// Produced output, present iff the stage succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Last error, present iff the stage failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<StageFailure>,
    /// Why the stage was skipped, present iff the stage was skipped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
    /// Number of executor invocations made.
    pub attempts: u32,
    /// Wall time spent on the stage in milliseconds.
    pub duration_ms: f64,
}

impl StageResult {
    /// Creates a succeeded result.
    #[must_use]
    pub fn succeeded(
        stage_name: impl Into<String>,
        output: impl Into<String>,
        attempts: u32,
        duration_ms: f64,
    ) -> Self {
        Self {
            stage_name: stage_name.into(),
            status: StageStatus::Succeeded,
            output: Some(output.into()),
            error: None,
            skip_reason: None,
            attempts,
            duration_ms,
        }
    }

    /// Creates a failed result.
    #[must_use]
    pub fn failed(
        stage_name: impl Into<String>,
        error: StageFailure,
        attempts: u32,
        duration_ms: f64,
    ) -> Self {
        Self {
            stage_name: stage_name.into(),
            status: StageStatus::Failed,
            output: None,
            error: Some(error),
            skip_reason: None,
            attempts,
            duration_ms,
        }
    }

    /// Creates a skipped result. Skipped stages are never invoked.
    #[must_use]
    pub fn skipped(stage_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            stage_name: stage_name.into(),
            status: StageStatus::Skipped,
            output: None,
            error: None,
            skip_reason: Some(reason.into()),
            attempts: 0,
            duration_ms: 0.0,
        }
    }

    /// Returns true if the stage succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_succeeded_has_output_only() {
        let result = StageResult::succeeded("analyze", "plan", 1, 3.5);

        assert!(result.is_success());
        assert_eq!(result.output.as_deref(), Some("plan"));
        assert!(result.error.is_none());
        assert!(result.skip_reason.is_none());
    }

    #[test]
    fn test_failed_has_error_only() {
        let failure = StageFailure::from_executor_error(&ExecutorError::failure("rate limited"), 3);
        let result = StageResult::failed("implement", failure, 3, 12.0);

        assert_eq!(result.status, StageStatus::Failed);
        assert!(result.output.is_none());
        let error = result.error.unwrap();
        assert_eq!(error.kind, FailureKind::Failure);
        assert_eq!(error.attempt, 3);
        assert!(error.message.contains("rate limited"));
    }

    #[test]
    fn test_timeout_failure_kind() {
        let err = ExecutorError::Timeout(Duration::from_secs(2));
        let failure = StageFailure::from_executor_error(&err, 1);
        assert_eq!(failure.kind, FailureKind::Timeout);
    }

    #[test]
    fn test_skipped_serialization_omits_absent_fields() {
        let result = StageResult::skipped("verify", "dependency 'implement' did not succeed");
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["status"], "skipped");
        assert_eq!(json["attempts"], 0);
        assert!(json.get("output").is_none());
        assert!(json.get("error").is_none());
    }
}

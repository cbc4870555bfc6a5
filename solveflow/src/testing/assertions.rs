//! Test assertions for run artifacts.

use crate::core::{FailureKind, RunArtifact, RunStatus, StageStatus};

/// Asserts the overall status of a run.
pub fn assert_run_status(artifact: &RunArtifact, expected: RunStatus) {
    assert_eq!(
        artifact.overall_status, expected,
        "Expected run status {expected}, got {}. Stages: {:?}",
        artifact.overall_status,
        artifact.stage_order()
    );
}

/// Asserts that a stage was recorded with the given status.
pub fn assert_stage_status(artifact: &RunArtifact, stage: &str, expected: StageStatus) {
    let result = artifact.result(stage).unwrap_or_else(|| {
        panic!(
            "Expected stage '{stage}' in artifact, recorded stages: {:?}",
            artifact.stage_order()
        )
    });
    assert_eq!(
        result.status, expected,
        "Expected stage '{stage}' to be {expected}, got {}",
        result.status
    );
}

/// Asserts that a stage succeeded with exactly this output.
pub fn assert_stage_output(artifact: &RunArtifact, stage: &str, expected: &str) {
    assert_stage_status(artifact, stage, StageStatus::Succeeded);
    assert_eq!(artifact.output(stage), Some(expected), "Unexpected output for stage '{stage}'");
}

/// Asserts that a stage failed with the given kind after `attempts` attempts.
pub fn assert_stage_failed(artifact: &RunArtifact, stage: &str, kind: FailureKind, attempts: u32) {
    assert_stage_status(artifact, stage, StageStatus::Failed);
    let result = artifact.result(stage).expect("stage present");
    let error = result.error.as_ref().expect("failed stage carries an error");
    assert_eq!(error.kind, kind, "Unexpected failure kind for stage '{stage}'");
    assert_eq!(result.attempts, attempts, "Unexpected attempt count for stage '{stage}'");
}

/// Asserts that a stage was skipped because of `dependency`.
pub fn assert_stage_skipped(artifact: &RunArtifact, stage: &str, dependency: &str) {
    assert_stage_status(artifact, stage, StageStatus::Skipped);
    let reason = artifact
        .result(stage)
        .and_then(|r| r.skip_reason.as_deref())
        .unwrap_or_default();
    assert!(
        reason.contains(&format!("'{dependency}'")),
        "Expected stage '{stage}' to be skipped because of '{dependency}', reason: {reason}"
    );
}

/// Asserts that a stage is absent from the artifact.
pub fn assert_stage_absent(artifact: &RunArtifact, stage: &str) {
    assert!(
        artifact.result(stage).is_none(),
        "Expected stage '{stage}' to be absent, recorded stages: {:?}",
        artifact.stage_order()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{RunArtifactBuilder, StageFailure, StageResult};
    use crate::errors::ExecutorError;
    use std::time::Duration;

    fn artifact() -> RunArtifact {
        let mut builder = RunArtifactBuilder::new("p", "x");
        builder.record(StageResult::succeeded("a", "out", 1, 1.0));
        let failure = StageFailure::from_executor_error(&ExecutorError::Timeout(Duration::from_millis(5)), 2);
        builder.record(StageResult::failed("b", failure, 2, 10.0));
        builder.record(StageResult::skipped("c", "dependency 'b' did not succeed"));
        builder.finish()
    }

    #[test]
    fn test_assertions_pass() {
        let artifact = artifact();
        assert_run_status(&artifact, RunStatus::PartiallyFailed);
        assert_stage_output(&artifact, "a", "out");
        assert_stage_failed(&artifact, "b", FailureKind::Timeout, 2);
        assert_stage_skipped(&artifact, "c", "b");
        assert_stage_absent(&artifact, "d");
    }

    #[test]
    #[should_panic(expected = "Expected stage 'a' to be failed")]
    fn test_status_mismatch_panics() {
        assert_stage_status(&artifact(), "a", StageStatus::Failed);
    }
}

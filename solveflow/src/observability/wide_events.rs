//! One wide summary event per finished run.

use crate::core::{RunArtifact, StageStatus};
use crate::events::EventSink;
use std::collections::BTreeMap;

/// Emitter for run summary events.
#[derive(Debug, Clone)]
pub struct WideEventEmitter {
    /// Event type for run summaries.
    pub run_event_type: String,
}

impl Default for WideEventEmitter {
    fn default() -> Self {
        Self {
            run_event_type: "pipeline.wide".to_string(),
        }
    }
}

impl WideEventEmitter {
    /// Creates a new wide event emitter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a summary payload for a finished run.
    #[must_use]
    pub fn build_run_payload(problem: &str, artifact: &RunArtifact) -> serde_json::Value {
        let mut stage_counts: BTreeMap<String, u32> = BTreeMap::new();
        for status in [StageStatus::Succeeded, StageStatus::Failed, StageStatus::Skipped] {
            stage_counts.insert(status.to_string(), 0);
        }
        for result in &artifact.ordered_results {
            *stage_counts.entry(result.status.to_string()).or_insert(0) += 1;
        }

        let stage_details: Vec<serde_json::Value> = artifact
            .ordered_results
            .iter()
            .map(|r| {
                serde_json::json!({
                    "stage": &r.stage_name,
                    "status": r.status.to_string(),
                    "attempts": r.attempts,
                    "duration_ms": r.duration_ms,
                    "error": r.error.as_ref().map(|e| e.message.as_str()),
                })
            })
            .collect();

        let total_attempts: u32 = artifact.ordered_results.iter().map(|r| r.attempts).sum();
        let total_duration_ms: f64 = artifact.ordered_results.iter().map(|r| r.duration_ms).sum();

        serde_json::json!({
            "run_id": artifact.run_id.to_string(),
            "pipeline_name": &artifact.pipeline_name,
            "problem": problem,
            "status": artifact.overall_status.to_string(),
            "stage_counts": stage_counts,
            "total_attempts": total_attempts,
            "total_duration_ms": total_duration_ms,
            "started_at": &artifact.started_at,
            "finished_at": &artifact.finished_at,
            "cancel_reason": &artifact.cancel_reason,
            "stage_details": stage_details,
        })
    }

    /// Emits a run summary event.
    pub fn emit_run_event(&self, sink: &dyn EventSink, problem: &str, artifact: &RunArtifact) {
        sink.try_emit(&self.run_event_type, Some(Self::build_run_payload(problem, artifact)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{RunArtifactBuilder, StageFailure, StageResult};
    use crate::errors::ExecutorError;
    use crate::events::CollectingEventSink;

    fn artifact() -> RunArtifact {
        let mut builder = RunArtifactBuilder::new("solver", "p");
        builder.record(StageResult::succeeded("analyze", "plan", 1, 5.0));
        let failure = StageFailure::from_executor_error(&ExecutorError::failure("down"), 2);
        builder.record(StageResult::failed("implement", failure, 2, 7.5));
        builder.record(StageResult::skipped("verify", "dependency 'implement' did not succeed"));
        builder.finish()
    }

    #[test]
    fn test_emitter_creation() {
        assert_eq!(WideEventEmitter::new().run_event_type, "pipeline.wide");
    }

    #[test]
    fn test_build_run_payload() {
        let payload = WideEventEmitter::build_run_payload("two_sum", &artifact());

        assert_eq!(payload["pipeline_name"], "solver");
        assert_eq!(payload["problem"], "two_sum");
        assert_eq!(payload["status"], "partially_failed");
        assert_eq!(
            payload["stage_counts"],
            serde_json::json!({"failed": 1, "skipped": 1, "succeeded": 1})
        );
        assert_eq!(payload["total_attempts"], 3);
        assert_eq!(payload["total_duration_ms"], 12.5);
        assert_eq!(payload["stage_details"][1]["stage"], "implement");
        assert_eq!(payload["stage_details"][1]["error"], "executor failed: down");
        assert!(payload["stage_details"][0]["error"].is_null());
    }

    #[test]
    fn test_emit_run_event() {
        let sink = CollectingEventSink::new();
        WideEventEmitter::new().emit_run_event(&sink, "two_sum", &artifact());

        assert_eq!(sink.event_types(), vec!["pipeline.wide"]);
    }
}

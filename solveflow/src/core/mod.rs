//! Core domain model types for solveflow.
//!
//! This module contains the records a pipeline run produces:
//! - Stage and run status enums plus the failure policy
//! - Per-stage results
//! - The run artifact and its builder

mod artifact;
mod result;
mod status;

pub use artifact::{RunArtifact, RunArtifactBuilder};
pub use result::{FailureKind, StageFailure, StageResult};
pub use status::{FailurePolicy, RunStatus, StageStatus};

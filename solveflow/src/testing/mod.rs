//! Testing utilities for solveflow pipelines.
//!
//! This module provides:
//! - Executor doubles that record their inputs
//! - Assertions over run artifacts
//! - In-memory problem sources and artifact stores

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{
    assert_run_status, assert_stage_absent, assert_stage_failed, assert_stage_output,
    assert_stage_skipped, assert_stage_status,
};
pub use fixtures::{InMemoryArtifactStore, InMemoryProblemSource};
pub use mocks::{EchoExecutor, FailingExecutor, ScriptedExecutor, SlowExecutor};

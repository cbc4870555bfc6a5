//! Pipeline definition, resolution and execution.
//!
//! This module provides:
//! - Stage definitions
//! - Deterministic dependency resolution
//! - A builder with lazy validation
//! - The sequential execution engine
//! - Retry delay configuration

mod builder;
mod definition;
mod engine;
mod resolver;
mod retry;


pub use builder::PipelineBuilder;
pub use definition::StageDefinition;
pub use engine::{EngineConfig, Pipeline, DEFAULT_TIMEOUT};
pub use resolver::{resolve_order, ResolvedOrder};
pub use retry::{BackoffStrategy, RetryConfig};

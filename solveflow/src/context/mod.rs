//! Run-scoped context.
//!
//! This module provides:
//! - The write-once store of stage outputs for a single run
//! - Input assembly from a stage's declared dependencies

mod inputs;
mod store;

pub use inputs::StageInput;
pub use store::ContextStore;

//! Pipeline lifecycle events.
//!
//! The engine reports stage and run transitions to an `EventSink` owned by
//! the pipeline. Event types:
//!
//! - `pipeline.started`, `pipeline.finished`, `pipeline.cancelled`
//! - `stage.started` (once per attempt), `stage.attempt_failed`
//! - `stage.succeeded`, `stage.failed`, `stage.skipped`
//!
//! The problem solver adds one `pipeline.wide` summary per finished run.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

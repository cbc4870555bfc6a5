//! Observability utilities.

mod logging;
mod wide_events;

pub use logging::{init_logging, LogConfig, DEFAULT_LOG_FILE};
pub use wide_events::WideEventEmitter;

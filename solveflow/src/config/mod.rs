//! Configuration: pipeline definitions, environment settings and `.env`
//! loading.

mod env_file;
mod pipeline;
mod settings;

pub use env_file::{load_env_file, parse_env};
pub use pipeline::{PipelineConfig, StageConfig};
pub use settings::{Settings, DEFAULT_API_BASE_URL, DEFAULT_MODEL, DEFAULT_TEMPERATURE};

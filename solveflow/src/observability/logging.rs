//! Subscriber installation.
//!
//! `RUST_LOG` wins over the configured level when it is set. Console output
//! goes to stderr; the optional file layer appends plain text without ANSI
//! colors.

use crate::errors::LoggingError;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

/// Default log file name.
pub const DEFAULT_LOG_FILE: &str = "problem_solver.log";

/// Logging options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Filter used when `RUST_LOG` is unset, e.g. `info` or `solveflow=debug`.
    pub level: String,
    /// Emit JSON lines on the console instead of compact text.
    pub json: bool,
    /// Also append to this file.
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl LogConfig {
    /// Creates a config with the given level.
    #[must_use]
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            ..Self::default()
        }
    }

    /// Switches console output to JSON.
    #[must_use]
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    /// Appends to a log file as well.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    fn filter(&self) -> Result<EnvFilter, LoggingError> {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => EnvFilter::try_new(&self.level)
                .map_err(|e| LoggingError::Init(format!("invalid log level '{}': {e}", self.level))),
        }
    }
}

fn open_log_file(path: &Path) -> Result<File, LoggingError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| LoggingError::File {
            path: path.to_path_buf(),
            source,
        })
}

/// Installs the global tracing subscriber.
///
/// # Errors
///
/// Returns a `LoggingError` if the log file cannot be opened, the level does
/// not parse, or a subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> Result<(), LoggingError> {
    let filter = config.filter()?;

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    if config.json {
        layers.push(fmt::layer().json().with_writer(std::io::stderr).boxed());
    } else {
        layers.push(fmt::layer().with_writer(std::io::stderr).compact().boxed());
    }

    if let Some(path) = &config.file {
        let file = open_log_file(path)?;
        layers.push(
            fmt::layer()
                .with_ansi(false)
                .with_file(true)
                .with_line_number(true)
                .with_writer(Mutex::new(file))
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = LogConfig::default();
        assert_eq!(config.level, "info");
        assert!(!config.json);
        assert!(config.file.is_none());
    }

    #[test]
    fn test_builder() {
        let config = LogConfig::new("debug")
            .with_json(true)
            .with_file(DEFAULT_LOG_FILE);

        assert_eq!(config.level, "debug");
        assert!(config.json);
        assert_eq!(config.file.as_deref(), Some(Path::new("problem_solver.log")));
    }

    #[test]
    fn test_open_log_file_appends() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("run.log");
        std::fs::write(&path, "existing\n").unwrap();

        drop(open_log_file(&path).unwrap());

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "existing\n");
    }

    #[test]
    fn test_open_log_file_in_missing_dir() {
        let tmp = TempDir::new().unwrap();
        let err = open_log_file(&tmp.path().join("missing/run.log")).unwrap_err();
        assert!(matches!(err, LoggingError::File { .. }));
    }
}

//! Error types for the solveflow engine.
//!
//! Configuration errors are detected before any stage executes and are
//! always fatal. Executor errors happen during a stage invocation and are
//! subject to the stage's retry and failure policy. Storage and intake errors
//! come from the I/O collaborators and are surfaced to the caller unchanged.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// The main error type for solveflow operations.
#[derive(Debug, Error)]
pub enum SolveflowError {
    /// The pipeline definition is invalid.
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),

    /// A context store access failed.
    #[error("{0}")]
    Context(#[from] ContextError),

    /// Persisting a run artifact failed.
    #[error("{0}")]
    Storage(#[from] StorageError),

    /// Reading or moving problem files failed.
    #[error("{0}")]
    Intake(#[from] IntakeError),

    /// Environment or configuration file loading failed.
    #[error("{0}")]
    Settings(#[from] SettingsError),
}

/// Errors in the static pipeline definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// The dependency graph contains a cycle.
    #[error("Cycle detected in pipeline: {}", cycle.join(" -> "))]
    CycleDetected {
        /// One concrete cycle, first stage repeated at the end.
        cycle: Vec<String>,
    },

    /// A stage names a dependency that is not part of the pipeline.
    #[error("Stage '{stage}' depends on unknown stage '{dependency}'")]
    UnknownDependency {
        /// The stage declaring the dependency.
        stage: String,
        /// The missing dependency name.
        dependency: String,
    },

    /// Two stages share a name.
    #[error("Duplicate stage name '{name}'")]
    DuplicateStageName {
        /// The repeated name.
        name: String,
    },

    /// The pipeline has no stages.
    #[error("Pipeline has no stages")]
    EmptyPipeline,

    /// A stage was configured with zero attempts.
    #[error("Stage '{stage}' must allow at least one attempt")]
    InvalidMaxAttempts {
        /// The offending stage.
        stage: String,
    },

    /// A timeout value cannot be represented as a duration.
    #[error("Stage '{stage}' has an invalid timeout: {reason}")]
    InvalidTimeout {
        /// The offending stage, or the pipeline name for the default timeout.
        stage: String,
        /// Why the value was rejected.
        reason: String,
    },
}

impl ConfigurationError {
    /// Returns a stable error code for diagnostics.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::CycleDetected { .. } => "CONFIG-CYCLE",
            Self::UnknownDependency { .. } => "CONFIG-MISSING_DEP",
            Self::DuplicateStageName { .. } => "CONFIG-DUPLICATE",
            Self::EmptyPipeline => "CONFIG-EMPTY",
            Self::InvalidMaxAttempts { .. } => "CONFIG-ATTEMPTS",
            Self::InvalidTimeout { .. } => "CONFIG-TIMEOUT",
        }
    }

    /// Returns a hint for fixing the configuration.
    #[must_use]
    pub fn fix_hint(&self) -> &'static str {
        match self {
            Self::CycleDetected { .. } => {
                "Remove one of the dependencies in the cycle to break it."
            }
            Self::UnknownDependency { .. } => {
                "Ensure all dependencies reference stages that exist in the pipeline. \
                 Check for typos in stage names."
            }
            Self::DuplicateStageName { .. } => "Give every stage a unique name.",
            Self::EmptyPipeline => "Add at least one stage to the pipeline before building.",
            Self::InvalidMaxAttempts { .. } => "Set max_attempts to 1 or more.",
            Self::InvalidTimeout { .. } => "Use a finite, positive number of seconds.",
        }
    }
}

/// Errors returned by an executor binding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutorError {
    /// The executor reported a failure.
    #[error("executor failed: {0}")]
    Failure(String),

    /// The invocation did not finish within its timeout.
    #[error("executor timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
}

impl ExecutorError {
    /// Creates a failure error.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure(message.into())
    }

    /// Returns true if this is a timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// Errors from the write-once context store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    /// The stage has not produced an output yet.
    #[error("No output recorded for stage '{stage}'")]
    KeyNotFound {
        /// The requested stage.
        stage: String,
    },

    /// The stage already has an output.
    #[error("Output for stage '{stage}' was already recorded")]
    DuplicateWrite {
        /// The stage written twice.
        stage: String,
    },
}

/// Errors raised while persisting a run artifact.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Writing to the filesystem failed.
    #[error("Failed to write {}: {source}", path.display())]
    Io {
        /// The path being written.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The artifact could not be serialized.
    #[error("Failed to serialize run artifact: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors raised while reading or moving problem files.
#[derive(Debug, Error)]
#[error("Problem intake failed for {}: {source}", path.display())]
pub struct IntakeError {
    /// The path being accessed.
    pub path: PathBuf,
    /// The underlying error.
    #[source]
    pub source: std::io::Error,
}

impl IntakeError {
    pub(crate) fn new(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self {
            path: path.into(),
            source,
        }
    }
}

/// Errors raised while loading settings and configuration files.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// A required environment variable is not set.
    #[error("Missing environment variable {0}")]
    MissingVar(String),

    /// An environment variable has an unusable value.
    #[error("Invalid value '{value}' for {name}: {reason}")]
    InvalidVar {
        /// The variable name.
        name: String,
        /// The raw value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A configuration file could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        /// The file path.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A configuration file could not be parsed.
    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        /// The file path.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: serde_json::Error,
    },
}

/// Errors raised while running extracted test cases.
#[derive(Debug, Error)]
pub enum TestRunError {
    /// The interpreter could not be started.
    #[error("Failed to start {}: {source}", interpreter.display())]
    Spawn {
        /// The interpreter path.
        interpreter: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Talking to the interpreter process failed.
    #[error("Interpreter I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The harness could not be generated.
    #[error("Failed to build test harness: {0}")]
    Harness(#[from] serde_json::Error),

    /// The interpreter did not finish in time.
    #[error("Test run timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The interpreter exited without reporting any case.
    #[error("Interpreter exited with {status}: {stderr}")]
    Exited {
        /// Exit status as displayed by the OS.
        status: String,
        /// Last line of standard error.
        stderr: String,
    },
}

/// Errors raised while installing the logging subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The log file could not be opened.
    #[error("Failed to open log file {}: {source}", path.display())]
    File {
        /// The log file path.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A global subscriber was already installed.
    #[error("Failed to install tracing subscriber: {0}")]
    Init(String),
}

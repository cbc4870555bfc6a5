//! Pipeline definitions loaded from JSON.

use crate::core::FailurePolicy;
use crate::errors::{ConfigurationError, SettingsError, SolveflowError};
use crate::events::EventSink;
use crate::executor::ExecutorFactory;
use crate::pipeline::{Pipeline, PipelineBuilder, RetryConfig, StageDefinition};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

const ANALYZE_INSTRUCTIONS: &str = "You are a research analyst. Analyze the coding problem you are given. \
Cover the requirements and constraints, the edge cases to consider, and common pitfalls to avoid. \
Suggest an algorithm and its time and space complexity. Do not write the final code.";

const IMPLEMENT_INSTRUCTIONS: &str = "You are a senior Python developer. Using the problem and the analysis, \
write a complete Python solution in a single ```python code block. Include a clear function or class \
definition, a docstring with examples, error handling where appropriate, and comments on complex logic.";

const VERIFY_INSTRUCTIONS: &str = "You are a test engineer. Write test cases for the given solution: examples \
from the problem statement, edge cases and boundary conditions, invalid inputs, and large inputs. Put them in \
a ```python code block as a list of tuples whose last element is the expected output:\n\
test_cases = [\n    (input1, input2, expected_output1),\n]";

/// One stage entry of a pipeline file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    /// Unique stage name.
    pub name: String,
    /// Stages whose outputs this stage consumes.
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Total attempts, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Per-invocation timeout; the pipeline default applies when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<f64>,
    /// Failure policy; the pipeline default applies when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_failure: Option<FailurePolicy>,
    /// Opaque text handed to the executor binding.
    #[serde(default)]
    pub instructions: String,
}

fn default_max_attempts() -> u32 {
    1
}

fn default_timeout_secs() -> f64 {
    120.0
}

fn default_name() -> String {
    "solver".to_string()
}

impl StageConfig {
    /// Creates a stage entry with defaults.
    #[must_use]
    pub fn new(name: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            depends_on: Vec::new(),
            max_attempts: default_max_attempts(),
            timeout_secs: None,
            on_failure: None,
            instructions: instructions.into(),
        }
    }

    /// Sets the dependencies.
    #[must_use]
    pub fn with_dependencies(mut self, deps: &[&str]) -> Self {
        self.depends_on = deps.iter().map(|d| (*d).to_string()).collect();
        self
    }

    /// Sets the attempt budget.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }
}

/// A pipeline definition: engine defaults plus stage entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pipeline name.
    #[serde(default = "default_name")]
    pub name: String,
    /// Timeout for stages without their own.
    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: f64,
    /// Failure policy for stages without their own.
    #[serde(default)]
    pub on_failure: FailurePolicy,
    /// Delay between attempts.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Stage entries in declaration order.
    pub stages: Vec<StageConfig>,
}

impl PipelineConfig {
    /// Returns the built-in `analyze -> implement -> verify` chain.
    #[must_use]
    pub fn default_solver() -> Self {
        Self {
            name: default_name(),
            default_timeout_secs: default_timeout_secs(),
            on_failure: FailurePolicy::Abort,
            retry: RetryConfig::new().with_base_delay_ms(1_000),
            stages: vec![
                StageConfig::new("analyze", ANALYZE_INSTRUCTIONS).with_max_attempts(2),
                StageConfig::new("implement", IMPLEMENT_INSTRUCTIONS)
                    .with_dependencies(&["analyze"])
                    .with_max_attempts(2),
                StageConfig::new("verify", VERIFY_INSTRUCTIONS)
                    .with_dependencies(&["implement"])
                    .with_max_attempts(2),
            ],
        }
    }

    /// Parses a JSON definition.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if the text is not a valid definition.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Reads a JSON definition from disk.
    ///
    /// # Errors
    ///
    /// Returns a `SettingsError` if the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Serializes the definition as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error on failure.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Builds a pipeline, binding each stage through `factory`.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` if a timeout is not a positive finite
    /// number or the stage graph is invalid.
    pub fn build(
        &self,
        factory: &dyn ExecutorFactory,
        events: Arc<dyn EventSink>,
    ) -> Result<Pipeline, ConfigurationError> {
        let default_timeout = seconds(&self.name, self.default_timeout_secs)?;

        let mut builder = PipelineBuilder::new(&self.name)
            .with_default_timeout(default_timeout)
            .with_failure_policy(self.on_failure)
            .with_retry(self.retry.clone())
            .with_event_sink(events);

        for stage in &self.stages {
            let executor = factory.create(&stage.name, &stage.instructions);
            let mut def = StageDefinition::new(&stage.name, executor)
                .with_dependencies(stage.depends_on.iter().cloned())
                .with_max_attempts(stage.max_attempts);
            if let Some(secs) = stage.timeout_secs {
                def = def.with_timeout(seconds(&stage.name, secs)?);
            }
            if let Some(policy) = stage.on_failure {
                def = def.with_on_failure(policy);
            }
            builder = builder.add_stage(def);
        }

        builder.build()
    }

    /// Reads a definition from disk and builds it.
    ///
    /// # Errors
    ///
    /// Returns a `SolveflowError` for read, parse or graph errors.
    pub fn load(
        path: impl AsRef<Path>,
        factory: &dyn ExecutorFactory,
        events: Arc<dyn EventSink>,
    ) -> Result<Pipeline, SolveflowError> {
        Ok(Self::from_path(path)?.build(factory, events)?)
    }
}

fn seconds(stage: &str, secs: f64) -> Result<Duration, ConfigurationError> {
    if !(secs.is_finite() && secs > 0.0) {
        return Err(ConfigurationError::InvalidTimeout {
            stage: stage.to_string(),
            reason: format!("{secs} is not a positive number of seconds"),
        });
    }
    Duration::try_from_secs_f64(secs).map_err(|e| ConfigurationError::InvalidTimeout {
        stage: stage.to_string(),
        reason: e.to_string(),
    })
}

//! Stage input assembly.

use super::ContextStore;
use crate::errors::ContextError;
use std::fmt::Write as _;

/// The input handed to one stage: the problem plus the outputs of exactly
/// the stages it declared as dependencies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageInput {
    stage_name: String,
    problem: String,
    /// `(dependency, output)` in declaration order.
    upstream: Vec<(String, String)>,
}

impl StageInput {
    /// Selects the declared dependencies' outputs from the context.
    ///
    /// # Errors
    ///
    /// Returns `KeyNotFound` if a dependency has not completed.
    pub fn assemble(
        stage_name: impl Into<String>,
        depends_on: &[String],
        problem: impl Into<String>,
        context: &ContextStore,
    ) -> Result<Self, ContextError> {
        let upstream = depends_on
            .iter()
            .map(|dep| context.get(dep).map(|output| (dep.clone(), output.to_string())))
            .collect::<Result<Vec<_>, ContextError>>()?;

        Ok(Self {
            stage_name: stage_name.into(),
            problem: problem.into(),
            upstream,
        })
    }

    /// Returns the stage this input is for.
    #[must_use]
    pub fn stage_name(&self) -> &str {
        &self.stage_name
    }

    /// Returns the original problem text.
    #[must_use]
    pub fn problem(&self) -> &str {
        &self.problem
    }

    /// Returns the dependency outputs in declaration order.
    #[must_use]
    pub fn upstream(&self) -> &[(String, String)] {
        &self.upstream
    }

    /// Returns one dependency's output.
    #[must_use]
    pub fn get(&self, stage: &str) -> Option<&str> {
        self.upstream
            .iter()
            .find(|(name, _)| name == stage)
            .map(|(_, output)| output.as_str())
    }

    /// Renders the input as the text passed to the executor.
    ///
    /// The problem comes first, then one section per dependency.
    #[must_use]
    pub fn render(&self) -> String {
        let mut text = format!("## Problem\n\n{}\n", self.problem.trim_end());
        for (stage, output) in &self.upstream {
            let _ = write!(text, "\n## Output of `{stage}`\n\n{}\n", output.trim_end());
        }
        text
    }
}

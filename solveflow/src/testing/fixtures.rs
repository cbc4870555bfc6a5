//! In-memory problem source and artifact store.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::PathBuf;

use crate::core::RunArtifact;
use crate::errors::{IntakeError, StorageError};
use crate::intake::{Problem, ProblemSource};
use crate::persistence::ArtifactStore;

/// A problem source backed by a list.
#[derive(Debug, Default)]
pub struct InMemoryProblemSource {
    unsolved: Mutex<Vec<Problem>>,
    solved: Mutex<Vec<String>>,
    fail_mark: bool,
}

impl InMemoryProblemSource {
    /// Creates a source from `(name, text)` pairs.
    #[must_use]
    pub fn new<'a>(problems: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            unsolved: Mutex::new(
                problems
                    .into_iter()
                    .map(|(name, text)| Problem::new(name, text))
                    .collect(),
            ),
            ..Self::default()
        }
    }

    /// Makes every `mark_solved` call fail.
    #[must_use]
    pub fn failing_mark(mut self) -> Self {
        self.fail_mark = true;
        self
    }

    /// Returns the names of solved problems, in the order they were marked.
    #[must_use]
    pub fn solved(&self) -> Vec<String> {
        self.solved.lock().clone()
    }

    /// Returns the names of problems still unsolved.
    #[must_use]
    pub fn remaining(&self) -> Vec<String> {
        self.unsolved.lock().iter().map(|p| p.name.clone()).collect()
    }
}

#[async_trait]
impl ProblemSource for InMemoryProblemSource {
    async fn unsolved(&self) -> Result<Vec<Problem>, IntakeError> {
        Ok(self.unsolved.lock().clone())
    }

    async fn mark_solved(&self, problem: &Problem) -> Result<(), IntakeError> {
        if self.fail_mark {
            return Err(IntakeError::new(
                &problem.name,
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            ));
        }
        self.unsolved.lock().retain(|p| p.name != problem.name);
        self.solved.lock().push(problem.name.clone());
        Ok(())
    }
}

/// An artifact store that keeps artifacts in memory.
#[derive(Debug, Default)]
pub struct InMemoryArtifactStore {
    stored: Mutex<Vec<(String, RunArtifact)>>,
    fail: bool,
}

impl InMemoryArtifactStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store whose writes always fail.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Returns the stored artifacts with their problem names.
    #[must_use]
    pub fn stored(&self) -> Vec<(String, RunArtifact)> {
        self.stored.lock().clone()
    }

    /// Returns the artifact stored for a problem.
    #[must_use]
    pub fn get(&self, problem: &str) -> Option<RunArtifact> {
        self.stored
            .lock()
            .iter()
            .find(|(name, _)| name == problem)
            .map(|(_, artifact)| artifact.clone())
    }
}

#[async_trait]
impl ArtifactStore for InMemoryArtifactStore {
    async fn store(&self, problem: &Problem, artifact: &RunArtifact) -> Result<PathBuf, StorageError> {
        let path = PathBuf::from(format!("memory/{}_results.txt", problem.name));
        if self.fail {
            return Err(StorageError::Io {
                path,
                source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            });
        }
        self.stored.lock().push((problem.name.clone(), artifact.clone()));
        Ok(path)
    }
}

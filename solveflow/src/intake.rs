//! Problem intake.
//!
//! Problems are plain-text files. A [`DirectoryProblemSource`] serves every
//! `*.txt` file under `<root>/unsolved` and moves a file to `<root>/solved`
//! once its run completes.

use crate::errors::IntakeError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One problem to solve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    /// File stem, used to name result files.
    pub name: String,
    /// The problem statement.
    pub text: String,
    /// Where the problem was read from, if it came from disk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl Problem {
    /// Creates an in-memory problem.
    #[must_use]
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            path: None,
        }
    }
}

/// Supplies problems and records which ones are solved.
#[async_trait]
pub trait ProblemSource: Send + Sync {
    /// Returns every unsolved problem in a stable order.
    async fn unsolved(&self) -> Result<Vec<Problem>, IntakeError>;

    /// Marks a problem as solved.
    async fn mark_solved(&self, problem: &Problem) -> Result<(), IntakeError>;
}

/// Problems stored as `.txt` files in `unsolved/` and `solved/` directories.
#[derive(Debug, Clone)]
pub struct DirectoryProblemSource {
    unsolved_dir: PathBuf,
    solved_dir: PathBuf,
}

impl DirectoryProblemSource {
    /// Uses `<root>/unsolved` and `<root>/solved`.
    #[must_use]
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self::with_dirs(root.join("unsolved"), root.join("solved"))
    }

    /// Uses explicit directories.
    #[must_use]
    pub fn with_dirs(unsolved_dir: impl Into<PathBuf>, solved_dir: impl Into<PathBuf>) -> Self {
        Self {
            unsolved_dir: unsolved_dir.into(),
            solved_dir: solved_dir.into(),
        }
    }

    /// Returns the unsolved directory.
    #[must_use]
    pub fn unsolved_dir(&self) -> &Path {
        &self.unsolved_dir
    }

    /// Returns the solved directory.
    #[must_use]
    pub fn solved_dir(&self) -> &Path {
        &self.solved_dir
    }

    /// Creates both directories if they are missing.
    ///
    /// # Errors
    ///
    /// Returns an `IntakeError` if a directory cannot be created.
    pub async fn ensure_dirs(&self) -> Result<(), IntakeError> {
        for dir in [&self.unsolved_dir, &self.solved_dir] {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| IntakeError::new(dir, e))?;
        }
        Ok(())
    }
}

#[async_trait]
impl ProblemSource for DirectoryProblemSource {
    async fn unsolved(&self) -> Result<Vec<Problem>, IntakeError> {
        self.ensure_dirs().await?;

        let mut paths = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.unsolved_dir)
            .await
            .map_err(|e| IntakeError::new(&self.unsolved_dir, e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| IntakeError::new(&self.unsolved_dir, e))?
        {
            let path = entry.path();
            let is_file = entry
                .file_type()
                .await
                .map_err(|e| IntakeError::new(&path, e))?
                .is_file();
            if is_file && path.extension().is_some_and(|ext| ext == "txt") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut problems = Vec::with_capacity(paths.len());
        for path in paths {
            // One unreadable file must not hold back the rest of the batch.
            let text = match tokio::fs::read_to_string(&path).await {
                Ok(text) => text,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "Skipping unreadable problem file");
                    continue;
                }
            };
            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            debug!(problem = %name, len = text.len(), "Loaded problem");
            problems.push(Problem {
                name,
                text,
                path: Some(path),
            });
        }

        info!(count = problems.len(), dir = %self.unsolved_dir.display(), "Found unsolved problems");
        Ok(problems)
    }

    async fn mark_solved(&self, problem: &Problem) -> Result<(), IntakeError> {
        let Some(source) = problem.path.as_deref() else {
            return Ok(());
        };
        let Some(file_name) = source.file_name() else {
            return Ok(());
        };

        tokio::fs::create_dir_all(&self.solved_dir)
            .await
            .map_err(|e| IntakeError::new(&self.solved_dir, e))?;

        let target = self.solved_dir.join(file_name);
        tokio::fs::rename(source, &target)
            .await
            .map_err(|e| IntakeError::new(source, e))?;

        info!(problem = %problem.name, to = %target.display(), "Moved problem to solved directory");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn write(dir: &Path, name: &str, text: &str) {
        tokio::fs::write(dir.join(name), text).await.unwrap();
    }

    #[tokio::test]
    async fn test_creates_missing_dirs() {
        let tmp = TempDir::new().unwrap();
        let source = DirectoryProblemSource::new(tmp.path().join("problems"));

        let problems = source.unsolved().await.unwrap();

        assert!(problems.is_empty());
        assert!(source.unsolved_dir().is_dir());
        assert!(source.solved_dir().is_dir());
    }

    #[tokio::test]
    async fn test_lists_txt_files_sorted() {
        let tmp = TempDir::new().unwrap();
        let source = DirectoryProblemSource::new(tmp.path());
        source.ensure_dirs().await.unwrap();

        write(source.unsolved_dir(), "two_sum.txt", "Find two numbers.").await;
        write(source.unsolved_dir(), "reverse_list.txt", "Reverse a list.").await;
        write(source.unsolved_dir(), "notes.md", "ignored").await;
        tokio::fs::create_dir(source.unsolved_dir().join("nested.txt")).await.unwrap();

        let problems = source.unsolved().await.unwrap();
        let names: Vec<_> = problems.iter().map(|p| p.name.as_str()).collect();

        assert_eq!(names, vec!["reverse_list", "two_sum"]);
        assert_eq!(problems[1].text, "Find two numbers.");
        assert_eq!(
            problems[1].path.as_deref(),
            Some(source.unsolved_dir().join("two_sum.txt").as_path())
        );
    }

    #[tokio::test]
    async fn test_unreadable_file_is_skipped() {
        let tmp = TempDir::new().unwrap();
        let source = DirectoryProblemSource::new(tmp.path());
        source.ensure_dirs().await.unwrap();
        write(source.unsolved_dir(), "a_good.txt", "reverse a string").await;
        tokio::fs::write(source.unsolved_dir().join("b_bad.txt"), [0xff, 0xfe, 0x00])
            .await
            .unwrap();

        let problems = source.unsolved().await.unwrap();

        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].name, "a_good");
        assert!(source.unsolved_dir().join("b_bad.txt").exists());
    }

    #[tokio::test]
    async fn test_mark_solved_moves_file() {
        let tmp = TempDir::new().unwrap();
        let source = DirectoryProblemSource::new(tmp.path());
        source.ensure_dirs().await.unwrap();
        write(source.unsolved_dir(), "two_sum.txt", "Find two numbers.").await;

        let problem = source.unsolved().await.unwrap().remove(0);
        source.mark_solved(&problem).await.unwrap();

        assert!(!source.unsolved_dir().join("two_sum.txt").exists());
        assert!(source.solved_dir().join("two_sum.txt").exists());
        assert!(source.unsolved().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mark_solved_without_path_is_noop() {
        let tmp = TempDir::new().unwrap();
        let source = DirectoryProblemSource::new(tmp.path());

        source.mark_solved(&Problem::new("inline", "text")).await.unwrap();
    }

    #[tokio::test]
    async fn test_mark_solved_missing_file_errors() {
        let tmp = TempDir::new().unwrap();
        let source = DirectoryProblemSource::new(tmp.path());
        let problem = Problem {
            path: Some(tmp.path().join("unsolved/gone.txt")),
            ..Problem::new("gone", "")
        };

        let err = source.mark_solved(&problem).await.unwrap_err();
        assert!(err.path.ends_with("gone.txt"));
    }
}

//! Write-once store of stage outputs.

use crate::errors::ContextError;
use std::collections::HashMap;

/// Maps stage names to the outputs they produced during one run.
///
/// Each key is written once, after the stage succeeds. A second write for the
/// same stage fails with `DuplicateWrite`, so the store is an exact record of
/// what every stage produced. The store is owned by a single run and is never
/// shared, so it needs no locking.
#[derive(Debug, Clone, Default)]
pub struct ContextStore {
    outputs: HashMap<String, String>,
    /// Write order, for stable iteration.
    order: Vec<String>,
}

impl ContextStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the output recorded for a stage.
    ///
    /// # Errors
    ///
    /// Returns `KeyNotFound` if the stage has not completed.
    pub fn get(&self, stage: &str) -> Result<&str, ContextError> {
        self.outputs
            .get(stage)
            .map(String::as_str)
            .ok_or_else(|| ContextError::KeyNotFound {
                stage: stage.to_string(),
            })
    }

    /// Records the output of a stage.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateWrite` if the stage already has an output.
    pub fn set(
        &mut self,
        stage: impl Into<String>,
        output: impl Into<String>,
    ) -> Result<(), ContextError> {
        let stage = stage.into();
        if self.outputs.contains_key(&stage) {
            return Err(ContextError::DuplicateWrite { stage });
        }

        self.order.push(stage.clone());
        self.outputs.insert(stage, output.into());
        Ok(())
    }

    /// Checks if a stage has an output.
    #[must_use]
    pub fn contains(&self, stage: &str) -> bool {
        self.outputs.contains_key(stage)
    }

    /// Returns the number of recorded outputs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    /// Returns true if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// Iterates over `(stage, output)` pairs in write order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.order.iter().filter_map(|stage| {
            self.outputs
                .get(stage)
                .map(|output| (stage.as_str(), output.as_str()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let mut store = ContextStore::new();
        store.set("analyze", "steps").unwrap();

        assert_eq!(store.get("analyze").unwrap(), "steps");
        assert!(store.contains("analyze"));
        assert!(!store.contains("verify"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_duplicate_write() {
        let mut store = ContextStore::new();
        store.set("analyze", "first").unwrap();

        let err = store.set("analyze", "second").unwrap_err();
        assert_eq!(
            err,
            ContextError::DuplicateWrite {
                stage: "analyze".into()
            }
        );
        assert_eq!(store.get("analyze").unwrap(), "first");
    }

    #[test]
    fn test_key_not_found() {
        let store = ContextStore::new();

        let err = store.get("implement").unwrap_err();
        assert_eq!(
            err,
            ContextError::KeyNotFound {
                stage: "implement".into()
            }
        );
        assert!(store.is_empty());
    }

    #[test]
    fn test_iter_in_write_order() {
        let mut store = ContextStore::new();
        store.set("b", "2").unwrap();
        store.set("a", "1").unwrap();
        store.set("c", "3").unwrap();

        let pairs: Vec<_> = store.iter().collect();
        assert_eq!(pairs, vec![("b", "2"), ("a", "1"), ("c", "3")]);
    }
}

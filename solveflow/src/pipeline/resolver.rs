//! Dependency resolution.
//!
//! Computes a deterministic topological order over a set of stage
//! definitions. Ties are broken by declaration order: at every step the
//! earliest-declared stage whose dependencies are all placed goes next.

use super::StageDefinition;
use crate::errors::ConfigurationError;
use std::collections::HashMap;

/// A validated execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOrder {
    /// Indices into the definition slice, in execution order.
    indices: Vec<usize>,
    /// Stage names, in execution order.
    names: Vec<String>,
}

impl ResolvedOrder {
    /// Returns the definition indices in execution order.
    #[must_use]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Returns the stage names in execution order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Returns the position of a stage in the order.
    #[must_use]
    pub fn position(&self, stage: &str) -> Option<usize> {
        self.names.iter().position(|n| n == stage)
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Returns true if the order is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Resolves the execution order of a stage set.
///
/// # Errors
///
/// - `EmptyPipeline` if `stages` is empty
/// - `DuplicateStageName` if two stages share a name
/// - `InvalidMaxAttempts` if a stage allows zero attempts
/// - `InvalidTimeout` if a stage sets a zero timeout
/// - `UnknownDependency` if a dependency names no stage
/// - `CycleDetected` if the graph is not acyclic
pub fn resolve_order(stages: &[StageDefinition]) -> Result<ResolvedOrder, ConfigurationError> {
    if stages.is_empty() {
        return Err(ConfigurationError::EmptyPipeline);
    }

    let mut index: HashMap<&str, usize> = HashMap::with_capacity(stages.len());
    for (i, stage) in stages.iter().enumerate() {
        if index.insert(stage.name.as_str(), i).is_some() {
            return Err(ConfigurationError::DuplicateStageName {
                name: stage.name.clone(),
            });
        }
    }

    for stage in stages {
        if stage.max_attempts == 0 {
            return Err(ConfigurationError::InvalidMaxAttempts {
                stage: stage.name.clone(),
            });
        }
        if stage.timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigurationError::InvalidTimeout {
                stage: stage.name.clone(),
                reason: "timeout must be positive".to_string(),
            });
        }
        if let Some(dep) = stage.depends_on.iter().find(|d| !index.contains_key(d.as_str())) {
            return Err(ConfigurationError::UnknownDependency {
                stage: stage.name.clone(),
                dependency: dep.clone(),
            });
        }
    }

    let deps: Vec<Vec<usize>> = stages
        .iter()
        .map(|s| {
            s.depends_on
                .iter()
                .filter_map(|d| index.get(d.as_str()).copied())
                .collect()
        })
        .collect();

    let mut placed = vec![false; stages.len()];
    let mut indices = Vec::with_capacity(stages.len());

    while indices.len() < stages.len() {
        let next = (0..stages.len()).find(|&i| !placed[i] && deps[i].iter().all(|&d| placed[d]));

        match next {
            Some(i) => {
                placed[i] = true;
                indices.push(i);
            }
            None => {
                return Err(ConfigurationError::CycleDetected {
                    cycle: find_cycle(stages, &deps, &placed),
                });
            }
        }
    }

    let names = indices.iter().map(|&i| stages[i].name.clone()).collect();
    Ok(ResolvedOrder { indices, names })
}

/// Walks dependency edges among unplaced stages until a stage repeats.
///
/// Every unplaced stage has at least one unplaced dependency, otherwise it
/// would have been placed, so the walk always closes a cycle.
fn find_cycle(stages: &[StageDefinition], deps: &[Vec<usize>], placed: &[bool]) -> Vec<String> {
    let Some(start) = placed.iter().position(|p| !p) else {
        return Vec::new();
    };

    let mut path: Vec<usize> = Vec::new();
    let mut seen: HashMap<usize, usize> = HashMap::new();
    let mut current = start;

    loop {
        if let Some(&pos) = seen.get(&current) {
            let mut cycle: Vec<String> = path[pos..]
                .iter()
                .map(|&i| stages[i].name.clone())
                .collect();
            cycle.push(stages[current].name.clone());
            return cycle;
        }

        seen.insert(current, path.len());
        path.push(current);

        match deps[current].iter().copied().find(|&d| !placed[d]) {
            Some(next) => current = next,
            None => return path.iter().map(|&i| stages[i].name.clone()).collect(),
        }
    }
}

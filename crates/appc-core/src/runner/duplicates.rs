//! First-writer-wins bookkeeping for entries merged from several
//! dependencies.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use appc_schema::ArtifactCoords;
use serde::Serialize;

/// A set of dependencies that provided the same entries, with one of them
/// as an example.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    /// In resolution order; the first one's copies were kept.
    pub dependencies: Vec<ArtifactCoords>,
    pub example_path: String,
}

impl fmt::Display for DuplicateGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.dependencies.iter().map(ToString::to_string).collect();
        write!(
            f,
            "Dependencies with duplicate files detected. The dependencies [{}] contain duplicate files, e.g. {}",
            names.join(", "),
            self.example_path
        )
    }
}

#[derive(Debug, Default)]
pub struct DuplicateTracker {
    first: HashMap<String, ArtifactCoords>,
    conflicts: BTreeMap<String, Vec<ArtifactCoords>>,
}

impl DuplicateTracker {
    /// Record that `provider` offers `path`. Returns `true` if it is the first
    /// to do so and its copy should be kept.
    pub fn claim(&mut self, path: &str, provider: &ArtifactCoords) -> bool {
        let Some(first) = self.first.get(path) else {
            self.first.insert(path.to_string(), provider.clone());
            return true;
        };
        if first != provider {
            let providers = self
                .conflicts
                .entry(path.to_string())
                .or_insert_with(|| vec![first.clone()]);
            if !providers.contains(provider) {
                providers.push(provider.clone());
            }
        }
        false
    }

    /// Who provided `path` first.
    pub fn first_provider(&self, path: &str) -> Option<&ArtifactCoords> {
        self.first.get(path)
    }

    /// One group per distinct set of conflicting dependencies.
    pub fn groups(&self) -> Vec<DuplicateGroup> {
        let mut explained: Vec<(BTreeSet<&ArtifactCoords>, DuplicateGroup)> = Vec::new();
        for (path, providers) in &self.conflicts {
            let set: BTreeSet<&ArtifactCoords> = providers.iter().collect();
            if explained.iter().any(|(seen, _)| *seen == set) {
                continue;
            }
            explained.push((
                set,
                DuplicateGroup {
                    dependencies: providers.clone(),
                    example_path: path.clone(),
                },
            ));
        }
        explained.into_iter().map(|(_, group)| group).collect()
    }
}

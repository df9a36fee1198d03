//! Artifact resolution.
//!
//! The curator only talks to an [`ArtifactResolver`]; the default
//! implementation is [`MavenArtifactResolver`], which works against a local
//! Maven-layout repository backed by remote repositories.

pub mod maven;
pub mod pom;

use std::fmt;
use std::path::{Path, PathBuf};

use appc_schema::{AppDependency, ArtifactCoords, MavenVersion};
use serde::{Deserialize, Serialize};

use crate::error::Result;
pub use maven::MavenArtifactResolver;
use pom::Pom;

/// A remote repository to fetch artifacts from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRepository {
    pub id: String,
    pub url: String,
}

impl RemoteRepository {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into().trim_end_matches('/').to_string(),
        }
    }
}

impl fmt::Display for RemoteRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.url)
    }
}

/// Access to artifacts, their descriptors and their dependency graphs.
///
/// Implementations must be reusable sequentially by several phases; nothing
/// here is called concurrently.
pub trait ArtifactResolver: Send + Sync + fmt::Debug {
    /// Make `artifact` resolve to `path` without it being installed anywhere.
    fn relink(&mut self, artifact: &ArtifactCoords, path: &Path);

    /// Consult `repo` too, after the repositories already known.
    fn add_remote_repository(&mut self, repo: RemoteRepository);

    /// Local path of the artifact file, fetching it if necessary.
    fn resolve(&self, artifact: &ArtifactCoords) -> Result<PathBuf>;

    /// The POM describing `artifact`, as written.
    fn read_pom(&self, artifact: &ArtifactCoords) -> Result<Pom>;

    /// Packaged direct dependencies declared by `artifact`'s effective POM,
    /// with managed versions applied.
    fn direct_dependencies(&self, artifact: &ArtifactCoords) -> Result<Vec<AppDependency>>;

    /// Transitive closure of `direct`, mediated as if `root` declared them.
    /// Every member's file is resolved before returning.
    fn resolve_dependency_list(
        &self,
        root: &ArtifactCoords,
        direct: &[AppDependency],
    ) -> Result<Vec<AppDependency>>;

    /// Every known version of `artifact`, in ascending order.
    fn list_versions(&self, artifact: &ArtifactCoords) -> Result<Vec<String>>;

    /// Copy `file` into the local repository as `artifact`.
    fn install(&self, artifact: &ArtifactCoords, file: &Path) -> Result<PathBuf>;

    /// Transitive closure of `artifact`'s own dependencies.
    fn resolve_dependencies(&self, artifact: &ArtifactCoords) -> Result<Vec<AppDependency>> {
        let direct = self.direct_dependencies(artifact)?;
        self.resolve_dependency_list(artifact, &direct)
    }

    /// Versions strictly between `above` and `below`, ascending. `None`
    /// leaves that side open.
    fn versions_between(
        &self,
        artifact: &ArtifactCoords,
        above: Option<&str>,
        below: Option<&str>,
    ) -> Result<Vec<String>> {
        let above = above.map(MavenVersion::new);
        let below = below.map(MavenVersion::new);
        let mut versions: Vec<MavenVersion> = self
            .list_versions(artifact)?
            .iter()
            .map(|v| MavenVersion::new(v))
            .filter(|v| above.as_ref().is_none_or(|a| v > a))
            .filter(|v| below.as_ref().is_none_or(|b| v < b))
            .collect();
        versions.sort();
        versions.dedup();
        Ok(versions.iter().map(|v| v.as_str().to_string()).collect())
    }

    /// The lowest version newer than `artifact`'s and below `below`.
    fn next_version(&self, artifact: &ArtifactCoords, below: Option<&str>) -> Result<Option<String>> {
        Ok(self
            .versions_between(artifact, Some(artifact.version()), below)?
            .into_iter()
            .next())
    }

    /// The highest version newer than `artifact`'s and below `below`.
    fn latest_version(&self, artifact: &ArtifactCoords, below: Option<&str>) -> Result<Option<String>> {
        Ok(self
            .versions_between(artifact, Some(artifact.version()), below)?
            .pop())
    }

    /// The highest version below `below`, regardless of `artifact`'s own
    /// version.
    fn latest_version_below(
        &self,
        artifact: &ArtifactCoords,
        below: Option<&str>,
    ) -> Result<Option<String>> {
        Ok(self.versions_between(artifact, None, below)?.pop())
    }
}

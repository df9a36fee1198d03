//! Maven repository resolver.
//!
//! Artifacts live in a local repository using the standard Maven layout and
//! are fetched from the configured remote repositories on demand. Dependency
//! graphs are walked breadth-first with nearest-wins conflict resolution.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use appc_schema::{AppDependency, ArtifactCoords, ArtifactKey, MavenVersion};
use roxmltree::Document;

use super::pom::{EffectivePom, Exclusion, Pom};
use super::{ArtifactResolver, RemoteRepository};
use crate::app_jar::read_embedded_pom;
use crate::config::CurateConfig;
use crate::error::{AppCreatorError, IoResultExt, Result};
use crate::io::download::{Fetcher, write_atomically};
use crate::paths::{self, MAVEN_CENTRAL_URL};

const METADATA_FILE: &str = "maven-metadata.xml";

/// [`ArtifactResolver`] backed by a local Maven repository and any number of
/// remote ones.
#[derive(Debug)]
pub struct MavenArtifactResolver {
    local_repo: PathBuf,
    remotes: Vec<RemoteRepository>,
    relinked: HashMap<ArtifactCoords, PathBuf>,
    fetcher: Fetcher,
    effective_poms: Mutex<HashMap<ArtifactCoords, Arc<EffectivePom>>>,
}

/// A dependency waiting in the breadth-first queue, with the exclusions
/// accumulated along its path.
struct Pending {
    dependency: AppDependency,
    exclusions: Vec<Exclusion>,
}

impl MavenArtifactResolver {
    pub fn new(local_repo: impl Into<PathBuf>, fetcher: Fetcher) -> Self {
        Self {
            local_repo: local_repo.into(),
            remotes: Vec::new(),
            relinked: HashMap::new(),
            fetcher,
            effective_poms: Mutex::new(HashMap::new()),
        }
    }

    /// A resolver that only ever looks at `local_repo`.
    pub fn offline(local_repo: impl Into<PathBuf>) -> Self {
        Self::new(local_repo, Fetcher::offline())
    }

    /// Build the resolver described by the curate settings.
    ///
    /// # Errors
    ///
    /// Fails if no local repository location can be determined or the HTTP
    /// client cannot be created.
    pub fn from_config(config: &CurateConfig) -> Result<Self> {
        let local_repo = paths::local_repo(config.local_repo.as_deref()).ok_or_else(|| {
            AppCreatorError::Config(
                "Cannot determine the local repository; set local-repo".to_string(),
            )
        })?;
        let mut resolver = Self::new(local_repo, Fetcher::new(config.offline)?);
        for url in &config.remote_repositories {
            let id = if url.trim_end_matches('/') == MAVEN_CENTRAL_URL {
                "central"
            } else {
                url.as_str()
            };
            resolver.add_remote_repository(RemoteRepository::new(id, url.as_str()));
        }
        Ok(resolver)
    }

    /// Where `artifact` lives in the local repository.
    pub fn local_path(&self, artifact: &ArtifactCoords) -> PathBuf {
        self.local_repo.join(layout_path(artifact))
    }

    /// The effective POM of `artifact` (of its POM, for non-POM artifacts).
    pub fn effective_pom(&self, artifact: &ArtifactCoords) -> Result<Arc<EffectivePom>> {
        let pom_coords = pom_coords_of(artifact);
        if let Some(cached) = self.cache().get(&pom_coords) {
            return Ok(Arc::clone(cached));
        }
        let pom = self.load_pom(&pom_coords)?;
        let effective = Arc::new(EffectivePom::build(&pom, &|c: &ArtifactCoords| self.load_pom(c))?);
        self.cache().insert(pom_coords, Arc::clone(&effective));
        Ok(effective)
    }

    fn cache(&self) -> std::sync::MutexGuard<'_, HashMap<ArtifactCoords, Arc<EffectivePom>>> {
        self.effective_poms
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn load_pom(&self, pom_coords: &ArtifactCoords) -> Result<Pom> {
        if let Some(jar) = self.relinked_jar_for(pom_coords) {
            if let Some(xml) =
                read_embedded_pom(jar, pom_coords.group_id(), pom_coords.artifact_id())?
            {
                return Pom::parse(&xml, &pom_coords.to_string());
            }
        }
        let path = self.resolve(pom_coords)?;
        let xml = fs::read_to_string(&path).at(&path)?;
        Pom::parse(&xml, &path.display().to_string())
    }

    /// The relinked jar whose embedded descriptor stands in for `pom_coords`.
    fn relinked_jar_for(&self, pom_coords: &ArtifactCoords) -> Option<&Path> {
        if !pom_coords.classifier().is_empty() {
            return None;
        }
        self.relinked.iter().find_map(|(coords, path)| {
            (coords.group_id() == pom_coords.group_id()
                && coords.artifact_id() == pom_coords.artifact_id()
                && coords.version() == pom_coords.version()
                && coords.classifier().is_empty()
                && path.extension().is_some_and(|e| e == "jar"))
            .then_some(path.as_path())
        })
    }

    fn local_versions(&self, artifact: &ArtifactCoords) -> Result<Vec<String>> {
        let dir = self
            .local_repo
            .join(artifact.group_id().replace('.', "/"))
            .join(artifact.artifact_id());
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut versions = Vec::new();
        for entry in fs::read_dir(&dir).at(&dir)? {
            let entry = entry.at(&dir)?;
            let Some(version) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if self.local_path(&artifact.with_version(&version)).is_file() {
                versions.push(version);
            }
        }
        Ok(versions)
    }

    fn remote_versions(&self, artifact: &ArtifactCoords) -> Result<Vec<String>> {
        if !self.fetcher.is_online() {
            return Ok(Vec::new());
        }
        let mut versions = Vec::new();
        for repo in &self.remotes {
            let url = format!(
                "{}/{}/{}/{METADATA_FILE}",
                repo.url,
                artifact.group_id().replace('.', "/"),
                artifact.artifact_id()
            );
            let Some(bytes) = self.fetcher.fetch_bytes(&url)? else {
                continue;
            };
            match parse_metadata_versions(&String::from_utf8_lossy(&bytes)) {
                Ok(found) => versions.extend(found),
                Err(e) => tracing::warn!("Ignoring unreadable version metadata {url}: {e}"),
            }
        }
        Ok(versions)
    }
}

impl ArtifactResolver for MavenArtifactResolver {
    fn relink(&mut self, artifact: &ArtifactCoords, path: &Path) {
        tracing::debug!("Relinking {artifact} to {}", path.display());
        self.relinked.insert(artifact.clone(), path.to_path_buf());
    }

    fn add_remote_repository(&mut self, repo: RemoteRepository) {
        if self.remotes.iter().any(|r| r.url == repo.url) {
            return;
        }
        tracing::debug!("Adding remote repository {repo}");
        self.remotes.push(repo);
    }

    fn resolve(&self, artifact: &ArtifactCoords) -> Result<PathBuf> {
        if let Some(path) = self.relinked.get(artifact) {
            return Ok(path.clone());
        }
        let local = self.local_path(artifact);
        if local.is_file() {
            return Ok(local);
        }
        if self.fetcher.is_online() {
            let relative = layout_path(artifact);
            for repo in &self.remotes {
                let url = format!("{}/{relative}", repo.url);
                if self.fetcher.download(&url, &local)? {
                    tracing::info!("Downloaded {artifact} from {}", repo.id);
                    return Ok(local);
                }
            }
        }
        Err(AppCreatorError::ArtifactNotFound(artifact.clone()))
    }

    fn read_pom(&self, artifact: &ArtifactCoords) -> Result<Pom> {
        self.load_pom(&pom_coords_of(artifact))
    }

    fn direct_dependencies(&self, artifact: &ArtifactCoords) -> Result<Vec<AppDependency>> {
        let pom = self.effective_pom(artifact)?;
        let mut direct = Vec::new();
        for declared in &pom.dependencies {
            if !declared.scope()?.is_packaged() {
                tracing::debug!(
                    "Skipping {}:{} ({})",
                    declared.group_id,
                    declared.artifact_id,
                    declared.scope()?
                );
                continue;
            }
            direct.push(declared.to_app_dependency(artifact)?);
        }
        Ok(direct)
    }

    fn resolve_dependency_list(
        &self,
        root: &ArtifactCoords,
        direct: &[AppDependency],
    ) -> Result<Vec<AppDependency>> {
        let root_pom = self.effective_pom(root)?;
        let mut seen: HashSet<ArtifactKey> = HashSet::from([root.key()]);
        let mut queue: VecDeque<Pending> = direct
            .iter()
            .filter(|dep| dep.scope.is_packaged())
            .map(|dep| Pending {
                dependency: dep.clone(),
                exclusions: root_pom
                    .dependencies
                    .iter()
                    .find(|declared| declared.key() == dep.artifact.key())
                    .map(|declared| declared.exclusions.clone())
                    .unwrap_or_default(),
            })
            .collect();

        let mut resolved = Vec::new();
        while let Some(Pending {
            dependency,
            exclusions,
        }) = queue.pop_front()
        {
            if !seen.insert(dependency.artifact.key()) {
                tracing::debug!("{} omitted for conflict", dependency.artifact);
                continue;
            }

            let pom = match self.effective_pom(&dependency.artifact) {
                Ok(pom) => Some(pom),
                Err(AppCreatorError::ArtifactNotFound(missing))
                    if missing == dependency.artifact.pom_coords() =>
                {
                    tracing::warn!(
                        "The POM for {} is missing, no dependency information available",
                        dependency.artifact
                    );
                    None
                }
                Err(e) => return Err(e),
            };

            for child in pom.iter().flat_map(|p| &p.dependencies) {
                if child.optional {
                    continue;
                }
                let Some(scope) = dependency.scope.mediate(child.scope()?) else {
                    continue;
                };
                if exclusions
                    .iter()
                    .any(|e| e.matches(&child.group_id, &child.artifact_id))
                {
                    tracing::debug!(
                        "{}:{} excluded below {}",
                        child.group_id,
                        child.artifact_id,
                        dependency.artifact
                    );
                    continue;
                }
                let mut artifact = child.coords(&dependency.artifact)?;
                if let Some(managed) = root_pom
                    .managed(&child.key())
                    .and_then(|m| m.version.as_deref())
                {
                    artifact = artifact.with_version(managed);
                }
                let mut child_exclusions = exclusions.clone();
                child_exclusions.extend(child.exclusions.iter().cloned());
                queue.push_back(Pending {
                    dependency: AppDependency {
                        artifact,
                        scope,
                        optional: false,
                    },
                    exclusions: child_exclusions,
                });
            }
            resolved.push(dependency);
        }

        for dep in &resolved {
            self.resolve(&dep.artifact)?;
        }
        Ok(resolved)
    }

    fn list_versions(&self, artifact: &ArtifactCoords) -> Result<Vec<String>> {
        let mut versions = self.local_versions(artifact)?;
        versions.extend(self.remote_versions(artifact)?);
        versions.extend(
            self.relinked
                .keys()
                .filter(|c| c.key() == artifact.key())
                .map(|c| c.version().to_string()),
        );
        versions.sort_by_cached_key(|v| MavenVersion::new(v));
        versions.dedup();
        Ok(versions)
    }

    fn install(&self, artifact: &ArtifactCoords, file: &Path) -> Result<PathBuf> {
        let dest = self.local_path(artifact);
        if dest != file {
            let bytes = fs::read(file).at(file)?;
            write_atomically(&dest, &bytes).at(&dest)?;
        }
        self.cache().remove(&pom_coords_of(artifact));
        tracing::info!("Installed {artifact} to {}", dest.display());
        Ok(dest)
    }
}

fn pom_coords_of(artifact: &ArtifactCoords) -> ArtifactCoords {
    if artifact.artifact_type() == "pom" {
        artifact.clone()
    } else {
        artifact.pom_coords()
    }
}

/// File extension and effective classifier of an artifact type.
fn extension_and_classifier(artifact: &ArtifactCoords) -> (&str, &str) {
    let classifier = artifact.classifier();
    match artifact.artifact_type() {
        "test-jar" if classifier.is_empty() => ("jar", "tests"),
        "ejb-client" if classifier.is_empty() => ("jar", "client"),
        "jar" | "test-jar" | "ejb-client" | "maven-plugin" | "ejb" | "bundle" => ("jar", classifier),
        other => (other, classifier),
    }
}

/// Repository-relative path: `g/r/o/u/p/artifact/version/artifact-version[-classifier].ext`
pub fn layout_path(artifact: &ArtifactCoords) -> String {
    let (extension, classifier) = extension_and_classifier(artifact);
    let mut file = format!("{}-{}", artifact.artifact_id(), artifact.version());
    if !classifier.is_empty() {
        file.push('-');
        file.push_str(classifier);
    }
    format!(
        "{}/{}/{}/{file}.{extension}",
        artifact.group_id().replace('.', "/"),
        artifact.artifact_id(),
        artifact.version()
    )
}

fn parse_metadata_versions(xml: &str) -> std::result::Result<Vec<String>, roxmltree::Error> {
    let doc = Document::parse(xml)?;
    Ok(doc
        .descendants()
        .filter(|n| n.has_tag_name("versions"))
        .flat_map(|versions| versions.children().filter(|c| c.has_tag_name("version")))
        .filter_map(|v| v.text())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect())
}

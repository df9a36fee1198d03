//! Dependency curation.
//!
//! Resolves the application's effective dependency set, either fresh from
//! the application's own POM or pinned to the closure recorded by a
//! previously persisted state artifact, and computes available updates.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use appc_schema::{
    AppDependency, ArtifactCoords, ArtifactKey, DependencyUpdate, InitialDeps, STATE_CLASSIFIER,
    SELF_GROUP_ID_PLACEHOLDER, Scope, UpdateNumber, UpdatePolicy, update_bound,
};

use crate::app_jar::AppJar;
use crate::config::CurateConfig;
use crate::error::{AppCreatorError, IoResultExt, Result};
use crate::reporter::Reporter;
use crate::resolver::pom::interpolate;
use crate::resolver::{ArtifactResolver, MavenArtifactResolver, RemoteRepository};

/// Result of the curation phase. Read-only once built.
#[derive(Debug)]
pub struct CurateOutcome {
    pub app_artifact: ArtifactCoords,
    pub app_jar: PathBuf,
    /// The resolver used, reusable by later phases.
    pub resolver: Box<dyn ArtifactResolver>,
    pub initial_deps: Vec<AppDependency>,
    /// The dependency set after applying `updates`, if there were any.
    pub updated_deps: Option<Vec<AppDependency>>,
    pub updates: Vec<DependencyUpdate>,
    /// The state artifact the initial set was reproduced from.
    pub state_artifact: Option<ArtifactCoords>,
    /// Repositories declared by the application's POM.
    pub artifact_repos: Vec<RemoteRepository>,
}

impl CurateOutcome {
    /// The dependency set later phases should use: the updated one when
    /// updates were applied, the initial one otherwise.
    pub fn effective_deps(&self) -> &[AppDependency] {
        self.updated_deps.as_deref().unwrap_or(&self.initial_deps)
    }

    /// Coordinates the state artifact of this build is published under.
    pub fn state_coords(&self) -> ArtifactCoords {
        state_coords(&self.app_artifact, self.app_artifact.version())
    }
}

/// A dependency list read back from a state artifact.
struct StateSnapshot {
    artifact: ArtifactCoords,
    dependencies: Vec<AppDependency>,
}

/// Curate with the default Maven resolver built from `config`.
///
/// # Errors
///
/// Any failure is fatal; see [`curate_with`].
pub fn curate(config: &CurateConfig, reporter: &dyn Reporter) -> Result<CurateOutcome> {
    let resolver = MavenArtifactResolver::from_config(config)?;
    curate_with(config, Box::new(resolver), reporter)
}

/// Curate with the given resolver.
///
/// # Errors
///
/// A missing application jar, an unreadable POM, a malformed version or a
/// resolution failure aborts the phase. Failing to find or fetch a state
/// artifact in `last-update` mode does not; resolution then starts from the
/// application itself.
pub fn curate_with(
    config: &CurateConfig,
    mut resolver: Box<dyn ArtifactResolver>,
    reporter: &dyn Reporter,
) -> Result<CurateOutcome> {
    let app_jar = config
        .app_jar
        .as_deref()
        .ok_or_else(|| AppCreatorError::Config("app-jar is not set".to_string()))?;
    reporter.phase("Curating application dependencies");

    let app = AppJar::inspect(app_jar)?;
    resolver.relink(&app.coords, &app.path);

    let props = app.pom.own_properties();
    let artifact_repos: Vec<RemoteRepository> = app
        .pom
        .repositories
        .iter()
        .map(|r| RemoteRepository::new(interpolate(&r.id, &props), interpolate(&r.url, &props)))
        .collect();
    for repo in &artifact_repos {
        resolver.add_remote_repository(repo.clone());
    }

    let state = match config.initial_deps {
        InitialDeps::Application => None,
        InitialDeps::LastUpdate => {
            try_resolve_state(resolver.as_ref(), &app.coords, config.update_number, reporter)?
        }
    };

    let declared = resolver.direct_dependencies(&app.coords)?;
    let (direct, state_artifact) = match state {
        Some(state) => {
            reporter.info(&format!("Reproducing dependencies recorded by {}", state.artifact));
            let merged = merge_declared(state.dependencies, declared.clone(), reporter);
            (merged, Some(state.artifact))
        }
        None => (declared.clone(), None),
    };
    let initial_deps = resolver.resolve_dependency_list(&app.coords, &direct)?;
    tracing::debug!("Resolved {} dependencies", initial_deps.len());

    let updates = if config.update == UpdatePolicy::None {
        Vec::new()
    } else {
        compute_updates(resolver.as_ref(), &app, &declared, &initial_deps, config, reporter)?
    };
    let updated_deps = if updates.is_empty() {
        None
    } else {
        let updated_direct = apply_updates(&direct, &updates);
        Some(resolver.resolve_dependency_list(&app.coords, &updated_direct)?)
    };

    Ok(CurateOutcome {
        app_artifact: app.coords,
        app_jar: app.path,
        resolver,
        initial_deps,
        updated_deps,
        updates,
        state_artifact,
        artifact_repos,
    })
}

fn state_coords(app: &ArtifactCoords, version: &str) -> ArtifactCoords {
    ArtifactCoords::new(app.group_id(), app.artifact_id(), STATE_CLASSIFIER, "pom", version)
}

/// Network trouble and absent artifacts both mean "no usable state".
fn is_unavailable(err: &AppCreatorError) -> bool {
    matches!(
        err,
        AppCreatorError::Download(_) | AppCreatorError::ArtifactNotFound(_)
    )
}

fn try_resolve_state(
    resolver: &dyn ArtifactResolver,
    app: &ArtifactCoords,
    number: UpdateNumber,
    reporter: &dyn Reporter,
) -> Result<Option<StateSnapshot>> {
    let probe = state_coords(app, app.version());
    let bound = update_bound(app.version(), number)?;

    let version = match resolver.latest_version_below(&probe, bound.as_deref()) {
        Ok(Some(version)) => version,
        Ok(None) => {
            tracing::debug!("No state artifact recorded for {app}");
            return Ok(None);
        }
        Err(e) if is_unavailable(&e) => {
            reporter.warning(&format!("Could not look up the state of {app}: {e}"));
            return Ok(None);
        }
        Err(e) => return Err(e),
    };

    let artifact = probe.with_version(version);
    let pom = match resolver.read_pom(&artifact) {
        Ok(pom) => pom,
        Err(e) if is_unavailable(&e) => {
            reporter.warning(&format!("Could not read {artifact}: {e}"));
            return Ok(None);
        }
        Err(e) => return Err(e),
    };

    let dependencies = pom
        .dependencies
        .iter()
        .filter(|d| d.group_id != SELF_GROUP_ID_PLACEHOLDER)
        .map(|d| d.to_app_dependency(&artifact))
        .collect::<Result<Vec<_>>>()?;
    Ok(Some(StateSnapshot {
        artifact,
        dependencies,
    }))
}

/// Add declared dependencies the recorded state does not know about. Those
/// it does know keep their recorded version.
fn merge_declared(
    recorded: Vec<AppDependency>,
    declared: Vec<AppDependency>,
    reporter: &dyn Reporter,
) -> Vec<AppDependency> {
    let mut merged = recorded;
    for dep in declared {
        let key = dep.artifact.key();
        match merged.iter().find(|d| d.artifact.key() == key) {
            Some(pinned) if pinned.artifact.version() != dep.artifact.version() => {
                tracing::info!(
                    "{key} stays at {} from the last update (declared {})",
                    pinned.artifact.version(),
                    dep.artifact.version()
                );
            }
            Some(_) => {}
            None => {
                reporter.info(&format!("New dependency since the last update: {}", dep.artifact));
                merged.push(dep);
            }
        }
    }
    merged
}

/// Versions the application's own POM spells out literally, by key.
fn literal_versions(app: &AppJar) -> HashMap<ArtifactKey, &str> {
    let props = app.pom.own_properties();
    app.pom
        .dependencies
        .iter()
        .filter_map(|declared| {
            let version = declared.version.as_deref()?;
            let key = ArtifactKey {
                group_id: interpolate(&declared.group_id, &props),
                artifact_id: interpolate(&declared.artifact_id, &props),
                classifier: interpolate(&declared.classifier, &props),
                artifact_type: interpolate(&declared.artifact_type, &props),
            };
            Some((key, version))
        })
        .collect()
}

fn is_version_range(version: &str) -> bool {
    version.starts_with('[') || version.starts_with('(')
}

/// Updates for the direct dependencies of the effective POM, inherited ones
/// included.
fn compute_updates(
    resolver: &dyn ArtifactResolver,
    app: &AppJar,
    declared: &[AppDependency],
    resolved: &[AppDependency],
    config: &CurateConfig,
    reporter: &dyn Reporter,
) -> Result<Vec<DependencyUpdate>> {
    let literal = literal_versions(app);
    let by_key: HashMap<ArtifactKey, &AppDependency> =
        resolved.iter().map(|d| (d.artifact.key(), d)).collect();

    let mut updates = Vec::new();
    for dep in declared {
        let key = dep.artifact.key();
        let Some(current) = by_key.get(&key) else {
            continue;
        };
        // Literal versions and ranges are pinned by the application.
        if is_version_range(dep.artifact.version())
            || literal.get(&key).copied() == Some(current.artifact.version())
        {
            continue;
        }

        let bound = update_bound(current.artifact.version(), config.update_number)?;
        let candidate = match config.update {
            UpdatePolicy::None => None,
            UpdatePolicy::Next => resolver.next_version(&current.artifact, bound.as_deref())?,
            UpdatePolicy::Latest => resolver.latest_version(&current.artifact, bound.as_deref())?,
        };
        let Some(new_version) = candidate else {
            continue;
        };
        if new_version == current.artifact.version() {
            continue;
        }
        let update = DependencyUpdate {
            artifact: current.artifact.clone(),
            new_version,
        };
        reporter.update_available(&update);
        updates.push(update);
    }
    Ok(updates)
}

fn apply_updates(direct: &[AppDependency], updates: &[DependencyUpdate]) -> Vec<AppDependency> {
    direct
        .iter()
        .map(|dep| {
            let key = dep.artifact.key();
            match updates.iter().find(|u| u.artifact.key() == key) {
                Some(update) => AppDependency {
                    artifact: update.updated(),
                    ..dep.clone()
                },
                None => dep.clone(),
            }
        })
        .collect()
}

/// Record the effective dependency set of `outcome` as a state artifact in
/// the local repository, so a later `last-update` curation reproduces it.
///
/// # Errors
///
/// Fails if the descriptor cannot be written or installed.
pub fn persist_state(outcome: &CurateOutcome, reporter: &dyn Reporter) -> Result<ArtifactCoords> {
    let state = outcome.state_coords();
    let xml = state_pom_xml(&outcome.app_artifact, outcome.effective_deps());

    let staging = outcome.app_jar.with_file_name(format!(
        "{}-{}-{STATE_CLASSIFIER}.pom",
        state.artifact_id(),
        state.version()
    ));
    fs::write(&staging, xml).at(&staging)?;
    let installed = outcome.resolver.install(&state, &staging);
    fs::remove_file(&staging).ok();
    let installed = installed?;

    reporter.info(&format!("Recorded {state} at {}", installed.display()));
    Ok(state)
}

fn state_pom_xml(app: &ArtifactCoords, deps: &[AppDependency]) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str("<project xmlns=\"http://maven.apache.org/POM/4.0.0\">\n");
    xml.push_str("  <modelVersion>4.0.0</modelVersion>\n");
    let _ = writeln!(xml, "  <groupId>{}</groupId>", escape(app.group_id()));
    let _ = writeln!(xml, "  <artifactId>{}</artifactId>", escape(app.artifact_id()));
    let _ = writeln!(xml, "  <version>{}</version>", escape(app.version()));
    xml.push_str("  <packaging>pom</packaging>\n");
    xml.push_str("  <dependencies>\n");
    push_dependency(
        &mut xml,
        SELF_GROUP_ID_PLACEHOLDER,
        app.artifact_id(),
        "${project.version}",
        "",
        "jar",
        Scope::Compile,
    );
    for dep in deps {
        let a = &dep.artifact;
        push_dependency(
            &mut xml,
            a.group_id(),
            a.artifact_id(),
            a.version(),
            a.classifier(),
            a.artifact_type(),
            dep.scope,
        );
    }
    xml.push_str("  </dependencies>\n</project>\n");
    xml
}

fn push_dependency(
    xml: &mut String,
    group_id: &str,
    artifact_id: &str,
    version: &str,
    classifier: &str,
    artifact_type: &str,
    scope: Scope,
) {
    xml.push_str("    <dependency>\n");
    let _ = writeln!(xml, "      <groupId>{}</groupId>", escape(group_id));
    let _ = writeln!(xml, "      <artifactId>{}</artifactId>", escape(artifact_id));
    let _ = writeln!(xml, "      <version>{}</version>", escape(version));
    if artifact_type != "jar" {
        let _ = writeln!(xml, "      <type>{}</type>", escape(artifact_type));
    }
    if !classifier.is_empty() {
        let _ = writeln!(xml, "      <classifier>{}</classifier>", escape(classifier));
    }
    if scope != Scope::Compile {
        let _ = writeln!(xml, "      <scope>{scope}</scope>");
    }
    xml.push_str("    </dependency>\n");
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

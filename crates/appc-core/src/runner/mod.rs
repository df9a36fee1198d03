//! Runner jar assembly.
//!
//! Combines the curated dependencies with the augmentation output into a
//! runnable jar. Two layouts are supported:
//!
//! | Mode | Output |
//! |---|---|
//! | thin (default) | `<output>/<final-name>-runner.jar` with a `Class-Path` into `<lib>/`, one `<groupId>.<file>` per dependency (`modified-<groupId>.<file>` when augmentation rewrote some of its classes) |
//! | uber | a single self-contained `<output>/<final-name>-runner.jar`; a pre-existing `<final-name>.jar` becomes `<final-name>.jar.original` |
//!
//! ## Merge rules
//!
//! - Dependency jars (uber mode) are merged in resolution order and the
//!   first one to provide a path wins. Signature files, ignored entries and
//!   classes rewritten for that jar are dropped.
//! - The wiring, application, config and transformed class directories are
//!   merged in that order afterwards; each replaces what came before.
//! - `META-INF/services/*` files from every source are concatenated.
//! - The manifest is synthesized last, on top of whatever manifest the
//!   merged sources carried.

pub mod archive;
pub mod duplicates;
pub mod entries;
pub mod lib_jars;
pub mod manifest;

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use appc_schema::ArtifactCoords;
use serde::Serialize;
use walkdir::WalkDir;
use zip::ZipArchive;

pub use duplicates::DuplicateGroup;

use self::archive::RunnerArchive;
use self::duplicates::DuplicateTracker;
use self::entries::{
    IgnoredEntries, MANIFEST_PATH, ServiceProviders, is_service_file, is_signature_file,
};
use self::manifest::ManifestSettings;
use crate::augment::AugmentOutcome;
use crate::config::RunnerJarConfig;
use crate::curate::CurateOutcome;
use crate::error::{AppCreatorError, IoResultExt, Result, ZipResultExt};
use crate::io::fsutil::{create_or_empty_dir, entry_name, make_world_readable, sha256_file};
use crate::paths;
use crate::reporter::Reporter;

/// Largest single resource that can be merged.
const MAX_RESOURCE_SIZE: u64 = i32::MAX as u64 - 8;

const VERSIONS_PREFIX: &str = "META-INF/versions/";

/// What the assembler produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunnerJarOutcome {
    pub runner_jar: PathBuf,
    /// Thin mode only.
    pub lib_dir: Option<PathBuf>,
    /// The plain application jar: renamed to `.original` in uber mode.
    pub original_jar: Option<PathBuf>,
    pub duplicates: Vec<DuplicateGroup>,
    pub sha256: String,
}

/// Assemble the runner jar for `curate`'s dependency set and `augment`'s
/// output.
///
/// # Errors
///
/// Missing input directories, unreadable dependency jars, entry conflicts
/// and any failure writing the output are fatal. No runner jar is left
/// behind in that case.
pub fn build_runner_jar(
    config: &RunnerJarConfig,
    curate: &CurateOutcome,
    augment: &AugmentOutcome,
    reporter: &dyn Reporter,
) -> Result<RunnerJarOutcome> {
    augment.check_inputs()?;

    let app = &curate.app_artifact;
    let output_dir = config
        .output_dir
        .clone()
        .or_else(|| curate.app_jar.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));
    let final_name = config
        .final_name
        .clone()
        .unwrap_or_else(|| format!("{}-{}", app.artifact_id(), app.version()));
    let runner_path = paths::runner_jar_path(&output_dir, &final_name);

    reporter.phase(&format!("Building runner jar {}", runner_path.display()));
    let mut assembly = Assembly {
        archive: RunnerArchive::new(&runner_path),
        ignored: IgnoredEntries::new(&config.ignored_entries)?,
        services: ServiceProviders::default(),
        duplicates: DuplicateTracker::default(),
        reporter,
    };

    let lib_dir = if config.uber_jar {
        None
    } else {
        let lib_dir = config.lib_dir.clone().unwrap_or_else(|| output_dir.join("lib"));
        create_or_empty_dir(&lib_dir).at(&lib_dir)?;
        Some(lib_dir)
    };
    let prefix = lib_dir
        .as_deref()
        .map(|lib| class_path_prefix(lib, &output_dir))
        .unwrap_or_default();
    let mut class_path: Vec<String> = Vec::new();

    for dep in curate.effective_deps() {
        let jar = curate.resolver.resolve(&dep.artifact)?;
        if !jar.to_string_lossy().ends_with(".jar") {
            tracing::debug!("Skipping non-jar dependency {} ({})", dep.artifact, jar.display());
            continue;
        }
        let transformed = augment.transformed_classes.for_jar(&jar);
        match &lib_dir {
            None => assembly.merge_dependency_jar(&jar, &dep.artifact, transformed)?,
            Some(lib_dir) => {
                let name = lib_jars::copy_dependency(&jar, &dep.artifact, lib_dir, transformed)?;
                class_path.push(format!("{prefix}{name}"));
            }
        }
    }

    assembly.merge_directory(&augment.wiring_classes_dir)?;
    assembly.merge_directory(&augment.app_classes_dir)?;
    if let Some(config_dir) = &augment.config_dir {
        assembly.merge_directory(config_dir)?;
    }
    assembly.merge_directory(&augment.transformed_classes_dir)?;

    let Assembly {
        mut archive,
        services,
        duplicates,
        ..
    } = assembly;

    let existing = archive.take(MANIFEST_PATH)?;
    let class_path = class_path.join(" ");
    let settings = ManifestSettings {
        main_class: &config.main_class,
        class_path: &class_path,
        multi_release: config.uber_jar && archive.has_prefix(VERSIONS_PREFIX),
        implementation: config
            .add_implementation_entries
            .then(|| (app.artifact_id(), app.version())),
    };
    let manifest = manifest::synthesize(existing.as_deref(), &settings, reporter);
    archive.put_bytes(MANIFEST_PATH, manifest.to_bytes())?;

    for (name, content) in services.merged() {
        archive.put_bytes(&name, content)?;
    }

    let groups = duplicates.groups();
    for group in &groups {
        reporter.duplicates(group);
    }

    let runner_jar = archive.finish()?;
    if let Err(e) = make_world_readable(&runner_jar) {
        reporter.warning(&format!(
            "Unable to make {} world-readable: {e}",
            runner_jar.display()
        ));
    }
    let sha256 = sha256_file(&runner_jar).at(&runner_jar)?;

    let plain = paths::plain_jar_path(&output_dir, &final_name);
    let original_jar = if !plain.exists() {
        None
    } else if config.uber_jar {
        let original = paths::original_jar_path(&output_dir, &final_name);
        fs::rename(&plain, &original).at(&original)?;
        tracing::debug!("Renamed {} to {}", plain.display(), original.display());
        Some(original)
    } else {
        Some(plain)
    };

    reporter.info(&format!("Built {}", runner_jar.display()));
    Ok(RunnerJarOutcome {
        runner_jar,
        lib_dir,
        original_jar,
        duplicates: groups,
        sha256,
    })
}

/// How `Class-Path` entries refer to `lib_dir` from the runner jar.
fn class_path_prefix(lib_dir: &Path, output_dir: &Path) -> String {
    match lib_dir.strip_prefix(output_dir).ok().and_then(entry_name) {
        Some(relative) if relative.is_empty() => String::new(),
        Some(relative) => format!("{relative}/"),
        None => format!("{}/", lib_dir.display()),
    }
}

/// Per-invocation merge state.
struct Assembly<'a> {
    archive: RunnerArchive,
    ignored: IgnoredEntries,
    services: ServiceProviders,
    duplicates: DuplicateTracker,
    reporter: &'a dyn Reporter,
}

impl Assembly<'_> {
    fn merge_dependency_jar(
        &mut self,
        jar: &Path,
        artifact: &ArtifactCoords,
        transformed: Option<&BTreeSet<String>>,
    ) -> Result<()> {
        tracing::debug!("Merging {artifact} from {}", jar.display());
        let shared: Arc<Path> = Arc::from(jar);
        let mut input = ZipArchive::new(File::open(jar).at(jar)?).at(jar)?;

        for index in 0..input.len() {
            let mut entry = input.by_index(index).at(jar)?;
            let Some(name) = entry.enclosed_name().and_then(|p| entry_name(&p)) else {
                tracing::debug!("Skipping unsafe entry {} in {}", entry.name(), jar.display());
                continue;
            };
            if name.is_empty() {
                continue;
            }
            if entry.is_dir() {
                self.archive.add_dir(&name)?;
                continue;
            }
            if self.ignored.is_ignored(&name) || is_signature_file(&name) {
                continue;
            }
            if transformed.is_some_and(|t| t.contains(&name)) {
                tracing::debug!("Skipping {name} from {artifact}: transformed");
                continue;
            }
            if is_service_file(&name) {
                check_size(jar.join(&name), entry.size())?;
                let mut content = Vec::with_capacity(entry.size() as usize);
                entry.read_to_end(&mut content).at(jar)?;
                self.services.append(&name, content);
                continue;
            }

            if self.duplicates.claim(&name, artifact) {
                self.archive.put_archived(&name, &shared, index)?;
                continue;
            }
            if let Some(first) = self.duplicates.first_provider(&name) {
                if first != artifact && !name.ends_with(".class") {
                    self.reporter.warning(&format!(
                        "Duplicate entry {name} from {artifact} will be ignored. Existing file was provided by {first}"
                    ));
                }
            }
        }
        Ok(())
    }

    fn merge_directory(&mut self, dir: &Path) -> Result<()> {
        tracing::debug!("Merging directory {}", dir.display());
        for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
            let entry = entry.map_err(|e| AppCreatorError::io(dir, e.into()))?;
            let path = entry.path();
            let Some(name) = path.strip_prefix(dir).ok().and_then(entry_name) else {
                continue;
            };
            if name.is_empty() {
                continue;
            }
            if entry.file_type().is_dir() {
                self.archive.add_dir(&name)?;
                continue;
            }
            if name != MANIFEST_PATH && self.ignored.is_ignored(&name) {
                continue;
            }
            let size = entry.metadata().map_err(|e| AppCreatorError::io(path, e.into()))?.len();
            check_size(path.to_path_buf(), size)?;
            if is_service_file(&name) {
                let content = fs::read(path).at(path)?;
                self.services.append(&name, content);
            } else {
                self.archive.put_file(&name, path)?;
            }
        }
        Ok(())
    }
}

fn check_size(path: PathBuf, size: u64) -> Result<()> {
    if size > MAX_RESOURCE_SIZE {
        return Err(AppCreatorError::ResourceTooLarge { path, size });
    }
    Ok(())
}

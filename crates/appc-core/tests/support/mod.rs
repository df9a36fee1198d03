//! Fixtures shared by the integration tests: a throwaway local repository,
//! application jars and augmentation output directories.
#![allow(dead_code)]

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use appc_core::resolver::maven::layout_path;
use appc_core::{AugmentOutcome, CurateConfig, DuplicateGroup, Reporter};
use appc_schema::{ArtifactCoords, DependencyUpdate};
use tempfile::TempDir;
use zip::ZipArchive;
use zip::write::{SimpleFileOptions, ZipWriter};

/// Write a jar containing `entries`. Names ending in `/` become directories.
pub fn write_jar(path: &Path, entries: &[(&str, &str)]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut writer = ZipWriter::new(File::create(path).unwrap());
    for (name, content) in entries {
        if name.ends_with('/') {
            writer.add_directory(*name, SimpleFileOptions::default()).unwrap();
        } else {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
    }
    writer.finish().unwrap();
}

pub fn entry_names(jar: &Path) -> Vec<String> {
    let mut archive = ZipArchive::new(File::open(jar).unwrap()).unwrap();
    (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect()
}

pub fn read_entry(jar: &Path, name: &str) -> Option<Vec<u8>> {
    let mut archive = ZipArchive::new(File::open(jar).unwrap()).unwrap();
    let mut entry = archive.by_name(name).ok()?;
    let mut content = Vec::new();
    entry.read_to_end(&mut content).unwrap();
    Some(content)
}

pub fn dependency_xml(coords: &str) -> String {
    let c: ArtifactCoords = coords.parse().unwrap();
    format!(
        "<dependency><groupId>{}</groupId><artifactId>{}</artifactId><version>{}</version></dependency>",
        c.group_id(),
        c.artifact_id(),
        c.version()
    )
}

pub fn pom_xml(coords: &str, body: &str) -> String {
    let c: ArtifactCoords = coords.parse().unwrap();
    format!(
        "<project><modelVersion>4.0.0</modelVersion><groupId>{}</groupId><artifactId>{}</artifactId>\
         <version>{}</version>{body}</project>",
        c.group_id(),
        c.artifact_id(),
        c.version()
    )
}

/// A local repository plus a work directory, both temporary.
pub struct Workspace {
    tmp: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            tmp: tempfile::tempdir().unwrap(),
        }
    }

    pub fn repo(&self) -> PathBuf {
        self.tmp.path().join("repo")
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.tmp.path().join(relative)
    }

    /// Install `coords` with a POM declaring `deps` and a jar holding `entries`.
    pub fn publish(&self, coords: &str, deps: &[&str], entries: &[(&str, &str)]) -> PathBuf {
        let jar: ArtifactCoords = coords.parse().unwrap();
        let deps: String = deps.iter().map(|d| dependency_xml(d)).collect();
        let pom_path = self.repo().join(layout_path(&jar.pom_coords()));
        fs::create_dir_all(pom_path.parent().unwrap()).unwrap();
        fs::write(&pom_path, pom_xml(coords, &format!("<dependencies>{deps}</dependencies>"))).unwrap();
        let jar_path = self.repo().join(layout_path(&jar));
        write_jar(&jar_path, entries);
        jar_path
    }

    /// Write the application jar `target/<a>-<v>.jar` with an embedded POM
    /// whose body is `body`.
    pub fn app_jar(&self, coords: &str, body: &str) -> PathBuf {
        let c: ArtifactCoords = coords.parse().unwrap();
        let dir = format!("META-INF/maven/{}/{}/", c.group_id(), c.artifact_id());
        let properties = format!(
            "groupId={}\nartifactId={}\nversion={}\n",
            c.group_id(),
            c.artifact_id(),
            c.version()
        );
        let pom = pom_xml(coords, body);
        let path = self.path(&format!("target/{}-{}.jar", c.artifact_id(), c.version()));
        let pom_entry = format!("{dir}pom.xml");
        let properties_entry = format!("{dir}pom.properties");
        write_jar(
            &path,
            &[
                (pom_entry.as_str(), pom.as_str()),
                (properties_entry.as_str(), properties.as_str()),
                ("org/app/Main.class", "app-main"),
            ],
        );
        path
    }

    /// An application declaring `deps` directly.
    pub fn app_with_deps(&self, coords: &str, deps: &[&str]) -> PathBuf {
        let deps: String = deps.iter().map(|d| dependency_xml(d)).collect();
        self.app_jar(coords, &format!("<dependencies>{deps}</dependencies>"))
    }

    pub fn curate_config(&self, app_jar: &Path) -> CurateConfig {
        CurateConfig {
            app_jar: Some(app_jar.to_path_buf()),
            local_repo: Some(self.repo()),
            remote_repositories: Vec::new(),
            offline: true,
            ..CurateConfig::default()
        }
    }

    /// Empty augmentation output directories under `augment/`.
    pub fn augment_outcome(&self) -> AugmentOutcome {
        let outcome = AugmentOutcome::new(
            self.path("augment/wiring"),
            self.path("augment/classes"),
            self.path("augment/transformed"),
        );
        for dir in [
            &outcome.wiring_classes_dir,
            &outcome.app_classes_dir,
            &outcome.transformed_classes_dir,
        ] {
            fs::create_dir_all(dir).unwrap();
        }
        outcome
    }
}

pub fn write_file(path: &Path, content: &[u8]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Records everything reported to it.
#[derive(Default)]
pub struct Recorder {
    pub warnings: Mutex<Vec<String>>,
    pub updates: Mutex<Vec<DependencyUpdate>>,
    pub duplicates: Mutex<Vec<DuplicateGroup>>,
}

impl Recorder {
    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().unwrap().clone()
    }
}

impl Reporter for Recorder {
    fn phase(&self, _title: &str) {}

    fn update_available(&self, update: &DependencyUpdate) {
        self.updates.lock().unwrap().push(update.clone());
    }

    fn duplicates(&self, group: &DuplicateGroup) {
        self.duplicates.lock().unwrap().push(group.clone());
    }

    fn info(&self, _msg: &str) {}

    fn warning(&self, msg: &str) {
        self.warnings.lock().unwrap().push(msg.to_string());
    }
}

//! Inspection of the application's primary jar.
//!
//! Maven-built jars carry their own descriptor under
//! `META-INF/maven/<groupId>/<artifactId>/`: a `pom.properties` with the
//! coordinates and the `pom.xml` the jar was built from.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use appc_schema::ArtifactCoords;
use zip::ZipArchive;

use crate::error::{AppCreatorError, IoResultExt, Result, ZipResultExt};
use crate::resolver::pom::Pom;

const MAVEN_DESCRIPTOR_DIR: &str = "META-INF/maven/";

/// The application jar together with what it says about itself.
#[derive(Debug, Clone)]
pub struct AppJar {
    pub path: PathBuf,
    pub coords: ArtifactCoords,
    /// The embedded POM, un-interpolated.
    pub pom: Pom,
}

impl AppJar {
    /// Read coordinates and embedded POM from the jar at `path`.
    ///
    /// # Errors
    ///
    /// [`AppCreatorError::MissingInput`] if the jar does not exist,
    /// [`AppCreatorError::Pom`] if it carries no readable descriptor.
    pub fn inspect(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(AppCreatorError::MissingInput {
                what: "Application jar",
                path: path.to_path_buf(),
            });
        }
        let file = File::open(path).at(path)?;
        let mut archive = ZipArchive::new(file).at(path)?;

        let descriptor_dir = archive
            .file_names()
            .filter(|name| name.starts_with(MAVEN_DESCRIPTOR_DIR) && name.ends_with("/pom.xml"))
            .filter(|name| name.matches('/').count() == 4)
            .min()
            .map(|name| name.trim_end_matches("pom.xml").to_string())
            .ok_or_else(|| AppCreatorError::pom(path.display(), "no embedded pom.xml"))?;

        let xml = read_entry(&mut archive, path, &format!("{descriptor_dir}pom.xml"))?
            .ok_or_else(|| AppCreatorError::pom(path.display(), "no embedded pom.xml"))?;
        let pom = Pom::parse(&xml, &path.display().to_string())?;

        let props = read_entry(&mut archive, path, &format!("{descriptor_dir}pom.properties"))?
            .map(|text| parse_properties(&text))
            .unwrap_or_default();
        let lookup = |key: &str, fallback: Option<&str>| {
            props
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
                .or_else(|| fallback.map(str::to_string))
                .filter(|v| !v.is_empty() && !v.contains("${"))
                .ok_or_else(|| {
                    AppCreatorError::pom(path.display(), format!("cannot determine {key}"))
                })
        };
        let coords = ArtifactCoords::jar(
            lookup("groupId", pom.group_id())?,
            lookup("artifactId", Some(pom.artifact_id.as_str()))?,
            lookup("version", pom.version())?,
        );
        tracing::debug!("Application artifact is {coords}");

        Ok(Self {
            path: path.to_path_buf(),
            coords,
            pom,
        })
    }
}

/// The `pom.xml` embedded in `jar` for `group_id:artifact_id`, if present.
pub fn read_embedded_pom(jar: &Path, group_id: &str, artifact_id: &str) -> Result<Option<String>> {
    let file = File::open(jar).at(jar)?;
    let mut archive = ZipArchive::new(file).at(jar)?;
    read_entry(
        &mut archive,
        jar,
        &format!("{MAVEN_DESCRIPTOR_DIR}{group_id}/{artifact_id}/pom.xml"),
    )
}

fn read_entry(archive: &mut ZipArchive<File>, jar: &Path, name: &str) -> Result<Option<String>> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(AppCreatorError::zip(jar, e)),
    };
    let mut text = String::new();
    entry.read_to_string(&mut text).at(jar)?;
    Ok(Some(text))
}

/// Parse a Java `.properties` document. Only the `key=value` form that
/// Maven writes is supported.
fn parse_properties(text: &str) -> Vec<(String, String)> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
        .filter_map(|line| {
            let (key, value) = line.split_once(['=', ':'])?;
            Some((key.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

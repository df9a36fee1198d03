//! Dependency jars copied next to a thin runner jar.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use appc_schema::ArtifactCoords;
use zip::{ZipArchive, ZipWriter};

use crate::error::{AppCreatorError, IoResultExt, Result, ZipResultExt};
use crate::io::download::part_path;

const MODIFIED_PREFIX: &str = "modified-";

/// Copy `jar` into `lib_dir` as `<groupId>.<file name>` and return the name
/// it was given.
///
/// When `transformed` lists entries of this jar, a filtered copy named
/// `modified-<groupId>.<file name>` is written instead, without those
/// entries.
///
/// # Errors
///
/// Fails on any read or write error; a partially written copy is removed.
pub fn copy_dependency(
    jar: &Path,
    artifact: &ArtifactCoords,
    lib_dir: &Path,
    transformed: Option<&BTreeSet<String>>,
) -> Result<String> {
    let file_name = jar
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| AppCreatorError::resolution(artifact, "resolved path has no file name"))?;
    let plain = format!("{}.{file_name}", artifact.group_id());

    match transformed {
        None => {
            let dest = lib_dir.join(&plain);
            fs::copy(jar, &dest).at(&dest)?;
            Ok(plain)
        }
        Some(skip) => {
            let name = format!("{MODIFIED_PREFIX}{plain}");
            let dest = lib_dir.join(&name);
            let part = part_path(&dest);
            let result = filtered_copy(jar, &part, skip).and_then(|()| fs::rename(&part, &dest).at(&dest));
            if result.is_err() {
                fs::remove_file(&part).ok();
            }
            result?;
            tracing::debug!("Wrote {} without {} transformed entries", dest.display(), skip.len());
            Ok(name)
        }
    }
}

fn filtered_copy(jar: &Path, dest: &Path, skip: &BTreeSet<String>) -> Result<()> {
    let mut input = ZipArchive::new(File::open(jar).at(jar)?).at(jar)?;
    let out = File::create(dest).at(dest)?;
    let mut writer = ZipWriter::new(BufWriter::new(out));
    for index in 0..input.len() {
        let entry = input.by_index_raw(index).at(jar)?;
        if skip.contains(entry.name()) {
            continue;
        }
        writer.raw_copy_file(entry).at(dest)?;
    }
    let mut out = writer.finish().at(dest)?;
    out.flush().at(dest)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use zip::write::SimpleFileOptions;

    fn write_jar(path: &Path, entries: &[&str]) {
        let mut writer = ZipWriter::new(File::create(path).unwrap());
        for name in entries {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(name.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    fn names(path: &Path) -> Vec<String> {
        let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
        (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect()
    }

    #[test]
    fn test_plain_copy_is_prefixed_with_group() {
        let tmp = tempfile::tempdir().unwrap();
        let jar = tmp.path().join("lib-a-1.0.jar");
        write_jar(&jar, &["a/A.class"]);
        let lib = tmp.path().join("lib");
        fs::create_dir(&lib).unwrap();

        let coords: ArtifactCoords = "org.acme:lib-a:1.0".parse().unwrap();
        let name = copy_dependency(&jar, &coords, &lib, None).unwrap();
        assert_eq!(name, "org.acme.lib-a-1.0.jar");
        assert_eq!(fs::read(lib.join(&name)).unwrap(), fs::read(&jar).unwrap());
    }

    #[test]
    fn test_transformed_entries_are_filtered_out() {
        let tmp = tempfile::tempdir().unwrap();
        let jar = tmp.path().join("lib-a-1.0.jar");
        write_jar(&jar, &["a/A.class", "a/B.class", "a/res.txt"]);
        let lib = tmp.path().join("lib");
        fs::create_dir(&lib).unwrap();

        let coords: ArtifactCoords = "org.acme:lib-a:1.0".parse().unwrap();
        let skip: BTreeSet<String> = ["a/B.class".to_string()].into();
        let name = copy_dependency(&jar, &coords, &lib, Some(&skip)).unwrap();
        assert_eq!(name, "modified-org.acme.lib-a-1.0.jar");
        assert_eq!(names(&lib.join(&name)), ["a/A.class", "a/res.txt"]);
        assert!(!part_path(&lib.join(&name)).exists());
    }

    #[test]
    fn test_unreadable_jar_leaves_no_copy() {
        let tmp = tempfile::tempdir().unwrap();
        let jar = tmp.path().join("broken.jar");
        fs::write(&jar, b"not a zip").unwrap();
        let lib = tmp.path().join("lib");
        fs::create_dir(&lib).unwrap();

        let coords: ArtifactCoords = "org.acme:broken:1.0".parse().unwrap();
        let skip: BTreeSet<String> = ["x".to_string()].into();
        assert!(copy_dependency(&jar, &coords, &lib, Some(&skip)).is_err());
        assert_eq!(fs::read_dir(&lib).unwrap().count(), 0);
    }
}

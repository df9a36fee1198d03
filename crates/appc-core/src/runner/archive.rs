//! The runner archive under construction.
//!
//! Entries are collected in memory (content for generated data, references
//! for files and dependency jar entries) and written in one go by
//! [`RunnerArchive::finish`]: directories and the manifest first, everything
//! else in name order, all with the same fixed timestamp. The archive goes to
//! a `.part` file that is renamed into place only once it is complete.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

use super::entries::MANIFEST_PATH;
use crate::error::{AppCreatorError, IoResultExt, Result, ZipResultExt};
use crate::io::download::part_path;

const META_INF_DIR: &str = "META-INF";

#[derive(Debug, Clone)]
enum EntrySource {
    Directory,
    Bytes(Vec<u8>),
    File(PathBuf),
    Archived { jar: Arc<Path>, index: usize },
}

#[derive(Debug)]
pub struct RunnerArchive {
    path: PathBuf,
    entries: BTreeMap<String, EntrySource>,
}

impl RunnerArchive {
    /// An empty archive that will be written to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Create directory `name` and its parents. Existing directories are fine;
    /// an existing file of that name is an [`AppCreatorError::EntryConflict`].
    pub fn add_dir(&mut self, name: &str) -> Result<()> {
        let name = name.trim_end_matches('/');
        if name.is_empty() {
            return Ok(());
        }
        self.ensure_parents(name)?;
        match self.entries.get(name) {
            Some(EntrySource::Directory) => Ok(()),
            Some(_) => Err(self.conflict(name, "a file with that name already exists")),
            None => {
                self.entries.insert(name.to_string(), EntrySource::Directory);
                Ok(())
            }
        }
    }

    pub fn put_bytes(&mut self, name: &str, content: Vec<u8>) -> Result<()> {
        self.put(name, EntrySource::Bytes(content))
    }

    /// Add (or replace) `name` with the content of a file on disk.
    pub fn put_file(&mut self, name: &str, file: &Path) -> Result<()> {
        self.put(name, EntrySource::File(file.to_path_buf()))
    }

    /// Add (or replace) `name` with entry `index` of `jar`.
    pub fn put_archived(&mut self, name: &str, jar: &Arc<Path>, index: usize) -> Result<()> {
        self.put(
            name,
            EntrySource::Archived {
                jar: Arc::clone(jar),
                index,
            },
        )
    }

    /// Whether any entry lies under `prefix`, which should end with `/`.
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.entries
            .range::<str, _>((std::ops::Bound::Included(prefix), std::ops::Bound::Unbounded))
            .next()
            .is_some_and(|(name, _)| name.starts_with(prefix))
    }

    /// Remove `name` and return its content, if it is a file.
    pub fn take(&mut self, name: &str) -> Result<Option<Vec<u8>>> {
        let content = match self.entries.get(name) {
            None | Some(EntrySource::Directory) => return Ok(None),
            Some(source) => read_source(source, &mut HashMap::new())?,
        };
        self.entries.remove(name);
        Ok(Some(content))
    }

    /// Write the archive and move it into place.
    ///
    /// # Errors
    ///
    /// Any read or write failure. The partially written file is removed.
    pub fn finish(self) -> Result<PathBuf> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).at(parent)?;
        }
        let part = part_path(&self.path);
        let result = self.write_to(&part).and_then(|()| fs::rename(&part, &self.path).at(&self.path));
        if result.is_err() {
            fs::remove_file(&part).ok();
        }
        result?;
        tracing::debug!("Wrote {} ({} entries)", self.path.display(), self.entries.len());
        Ok(self.path)
    }

    fn write_to(&self, part: &Path) -> Result<()> {
        let file = File::create(part).at(part)?;
        let mut writer = ZipWriter::new(BufWriter::new(file));
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default());
        let mut open_jars: HashMap<Arc<Path>, ZipArchive<File>> = HashMap::new();

        for (name, source) in self.write_order() {
            match source {
                EntrySource::Directory => {
                    writer.add_directory(format!("{name}/"), options).at(&self.path)?;
                }
                EntrySource::Bytes(content) => {
                    writer.start_file(name, options).at(&self.path)?;
                    writer.write_all(content).at(&self.path)?;
                }
                EntrySource::File(path) => {
                    writer.start_file(name, options).at(&self.path)?;
                    let mut input = File::open(path).at(path)?;
                    io::copy(&mut input, &mut writer).at(path)?;
                }
                EntrySource::Archived { jar, index } => {
                    writer.start_file(name, options).at(&self.path)?;
                    let archive = open_archive(&mut open_jars, jar)?;
                    let mut entry = archive.by_index(*index).at(&**jar)?;
                    io::copy(&mut entry, &mut writer).at(&**jar)?;
                }
            }
        }

        let mut out = writer.finish().at(&self.path)?;
        out.flush().at(part)?;
        out.get_ref().sync_all().at(part)?;
        Ok(())
    }

    /// `META-INF/`, then the manifest, then everything else by name.
    fn write_order(&self) -> Vec<(&str, &EntrySource)> {
        let leading = [META_INF_DIR, MANIFEST_PATH];
        let mut ordered: Vec<(&str, &EntrySource)> = leading
            .iter()
            .filter_map(|name| self.entries.get_key_value(*name))
            .map(|(name, source)| (name.as_str(), source))
            .collect();
        ordered.extend(
            self.entries
                .iter()
                .filter(|(name, _)| !leading.contains(&name.as_str()))
                .map(|(name, source)| (name.as_str(), source)),
        );
        ordered
    }

    fn put(&mut self, name: &str, source: EntrySource) -> Result<()> {
        self.ensure_parents(name)?;
        if let Some(EntrySource::Directory) = self.entries.get(name) {
            return Err(self.conflict(name, "a directory with that name already exists"));
        }
        self.entries.insert(name.to_string(), source);
        Ok(())
    }

    fn ensure_parents(&mut self, name: &str) -> Result<()> {
        let mut end = 0;
        while let Some(pos) = name[end..].find('/') {
            let parent = &name[..end + pos];
            match self.entries.get(parent) {
                Some(EntrySource::Directory) => {}
                Some(_) => return Err(self.conflict(parent, "a file is in the way of a directory")),
                None => {
                    self.entries.insert(parent.to_string(), EntrySource::Directory);
                }
            }
            end += pos + 1;
        }
        Ok(())
    }

    fn conflict(&self, entry: &str, reason: &'static str) -> AppCreatorError {
        AppCreatorError::EntryConflict {
            archive: self.path.clone(),
            entry: entry.to_string(),
            reason,
        }
    }
}

fn open_archive<'a>(
    open: &'a mut HashMap<Arc<Path>, ZipArchive<File>>,
    jar: &Arc<Path>,
) -> Result<&'a mut ZipArchive<File>> {
    if !open.contains_key(jar) {
        let file = File::open(jar).at(&**jar)?;
        let archive = ZipArchive::new(file).at(&**jar)?;
        open.insert(Arc::clone(jar), archive);
    }
    open.get_mut(jar)
        .ok_or_else(|| AppCreatorError::io(&**jar, io::ErrorKind::NotFound.into()))
}

fn read_source(
    source: &EntrySource,
    open: &mut HashMap<Arc<Path>, ZipArchive<File>>,
) -> Result<Vec<u8>> {
    match source {
        EntrySource::Directory => Ok(Vec::new()),
        EntrySource::Bytes(content) => Ok(content.clone()),
        EntrySource::File(path) => fs::read(path).at(path),
        EntrySource::Archived { jar, index } => {
            let archive = open_archive(open, jar)?;
            let mut entry = archive.by_index(*index).at(&**jar)?;
            let mut content = Vec::new();
            entry.read_to_end(&mut content).at(&**jar)?;
            Ok(content)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_written_first_then_sorted() {
        let tmp = tempfile::tempdir().unwrap();
        let mut archive = RunnerArchive::new(tmp.path().join("out.jar"));
        archive.put_bytes("org/acme/B.class", b"b".to_vec()).unwrap();
        archive.put_bytes("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\r\n\r\n".to_vec()).unwrap();
        archive.put_bytes("META-INF/services/S", b"x".to_vec()).unwrap();
        archive.put_bytes("a.txt", b"a".to_vec()).unwrap();
        let path = archive.finish().unwrap();

        let mut zip = ZipArchive::new(File::open(&path).unwrap()).unwrap();
        let ordered: Vec<String> = (0..zip.len())
            .map(|i| zip.by_index(i).unwrap().name().to_string())
            .collect();
        assert_eq!(
            ordered,
            [
                "META-INF/",
                "META-INF/MANIFEST.MF",
                "META-INF/services/",
                "META-INF/services/S",
                "a.txt",
                "org/",
                "org/acme/",
                "org/acme/B.class",
            ]
        );
        assert!(!part_path(&path).exists());
    }

    #[test]
    fn test_directories_are_idempotent_but_conflict_with_files() {
        let tmp = tempfile::tempdir().unwrap();
        let mut archive = RunnerArchive::new(tmp.path().join("out.jar"));
        archive.add_dir("org/acme/").unwrap();
        archive.add_dir("org/acme").unwrap();
        assert!(archive.has_prefix("org/"));
        assert!(!archive.has_prefix("com/"));

        archive.put_bytes("data", b"x".to_vec()).unwrap();
        assert!(matches!(
            archive.add_dir("data/"),
            Err(AppCreatorError::EntryConflict { .. })
        ));
        assert!(matches!(
            archive.put_bytes("org/acme", b"x".to_vec()),
            Err(AppCreatorError::EntryConflict { .. })
        ));
        assert!(matches!(
            archive.put_bytes("data/nested.txt", b"x".to_vec()),
            Err(AppCreatorError::EntryConflict { .. })
        ));
    }

    #[test]
    fn test_take_removes_entry() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("MANIFEST.MF");
        fs::write(&file, b"Main-Class: x\r\n").unwrap();
        let mut archive = RunnerArchive::new(tmp.path().join("out.jar"));
        archive.put_file("META-INF/MANIFEST.MF", &file).unwrap();
        assert_eq!(
            archive.take("META-INF/MANIFEST.MF").unwrap().as_deref(),
            Some(b"Main-Class: x\r\n".as_slice())
        );
        assert!(archive.take("META-INF/MANIFEST.MF").unwrap().is_none());
    }

    #[test]
    fn test_output_is_deterministic() {
        let tmp = tempfile::tempdir().unwrap();
        let build = |name: &str| {
            let mut archive = RunnerArchive::new(tmp.path().join(name));
            archive.put_bytes("b.txt", b"b".to_vec()).unwrap();
            archive.put_bytes("a/c.txt", b"c".to_vec()).unwrap();
            fs::read(archive.finish().unwrap()).unwrap()
        };
        assert_eq!(build("one.jar"), build("two.jar"));
    }
}

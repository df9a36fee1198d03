//! What the augmentation phase hands to the runner assembler.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AppCreatorError, IoResultExt, Result};

/// Output directories of augmentation plus the classes it rewrote.
#[derive(Debug, Clone)]
pub struct AugmentOutcome {
    /// Generated wiring classes.
    pub wiring_classes_dir: PathBuf,
    /// The application's compiled classes and resources.
    pub app_classes_dir: PathBuf,
    /// Rewritten classes; these shadow every other copy.
    pub transformed_classes_dir: PathBuf,
    pub config_dir: Option<PathBuf>,
    pub transformed_classes: TransformedClasses,
}

impl AugmentOutcome {
    pub fn new(
        wiring_classes_dir: impl Into<PathBuf>,
        app_classes_dir: impl Into<PathBuf>,
        transformed_classes_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            wiring_classes_dir: wiring_classes_dir.into(),
            app_classes_dir: app_classes_dir.into(),
            transformed_classes_dir: transformed_classes_dir.into(),
            config_dir: None,
            transformed_classes: TransformedClasses::default(),
        }
    }

    /// Fail unless every required directory (and the config directory, when
    /// one is given) exists.
    pub fn check_inputs(&self) -> Result<()> {
        let required = [
            ("Wiring classes directory", Some(&self.wiring_classes_dir)),
            ("Application classes directory", Some(&self.app_classes_dir)),
            ("Transformed classes directory", Some(&self.transformed_classes_dir)),
            ("Config directory", self.config_dir.as_ref()),
        ];
        for (what, dir) in required {
            if let Some(dir) = dir {
                if !dir.is_dir() {
                    return Err(AppCreatorError::MissingInput {
                        what,
                        path: dir.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Class files rewritten by augmentation, per dependency jar. Those entries
/// must not be copied from the jar itself.
///
/// Jar paths are canonicalised on insert and lookup, so a relative and an
/// absolute spelling of the same jar match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformedClasses {
    by_jar: HashMap<PathBuf, BTreeSet<String>>,
}

impl TransformedClasses {
    pub fn insert(&mut self, jar: &Path, class_file: impl Into<String>) {
        self.by_jar
            .entry(canonical(jar))
            .or_default()
            .insert(class_file.into());
    }

    /// Entries of `jar` that were transformed, if any.
    pub fn for_jar(&self, jar: &Path) -> Option<&BTreeSet<String>> {
        self.by_jar.get(&canonical(jar)).filter(|set| !set.is_empty())
    }

    /// Load `{ "<jar path>": ["x/Y.class", ...] }` from a JSON file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or is not such a document.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).at(path)?;
        Self::from_json(&content)
            .map_err(|e| AppCreatorError::Config(format!("{}: {e}", path.display())))
    }

    pub fn from_json(content: &str) -> std::result::Result<Self, serde_json::Error> {
        let raw: BTreeMap<PathBuf, Vec<String>> = serde_json::from_str(content)?;
        let mut classes = Self::default();
        for (jar, entries) in raw {
            for entry in entries {
                classes.insert(&jar, entry);
            }
        }
        Ok(classes)
    }
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

//! Phase configuration.
//!
//! A [`CreatorConfig`] can be read from a TOML file with `[curate]` and
//! `[runner-jar]` sections and then adjusted with property-style overrides
//! (`update=latest`, `uber-jar=true`, ...). Every value is validated when it
//! is set, so a bad setting fails before any resolution or assembly starts.

use std::fs;
use std::path::{Path, PathBuf};

use appc_schema::{InitialDeps, UpdateNumber, UpdatePolicy};
use serde::{Deserialize, Serialize};

use crate::error::{AppCreatorError, IoResultExt, Result};
use crate::paths::MAVEN_CENTRAL_URL;

/// Main class written to the runner manifest unless configured otherwise.
pub const DEFAULT_MAIN_CLASS: &str = "io.quarkus.runner.GeneratedMain";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct CreatorConfig {
    pub curate: CurateConfig,
    pub runner_jar: RunnerJarConfig,
}

/// Settings of the dependency curation phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct CurateConfig {
    /// The application jar to curate.
    pub app_jar: Option<PathBuf>,
    pub initial_deps: InitialDeps,
    pub update: UpdatePolicy,
    pub update_number: UpdateNumber,
    /// Local repository override. See [`crate::paths::local_repo`].
    pub local_repo: Option<PathBuf>,
    /// Remote repositories consulted in order, before the ones the
    /// application declares.
    pub remote_repositories: Vec<String>,
    pub offline: bool,
}

impl Default for CurateConfig {
    fn default() -> Self {
        Self {
            app_jar: None,
            initial_deps: InitialDeps::default(),
            update: UpdatePolicy::default(),
            update_number: UpdateNumber::default(),
            local_repo: None,
            remote_repositories: vec![MAVEN_CENTRAL_URL.to_string()],
            offline: false,
        }
    }
}

/// Settings of the runner jar assembly phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct RunnerJarConfig {
    /// Output directory; defaults to the directory holding the application jar.
    #[serde(rename = "output")]
    pub output_dir: Option<PathBuf>,
    /// Thin-jar dependency directory; defaults to `<output>/lib`.
    #[serde(rename = "lib")]
    pub lib_dir: Option<PathBuf>,
    /// Base name of the produced files; defaults to `<artifactId>-<version>`.
    pub final_name: Option<String>,
    pub main_class: String,
    pub uber_jar: bool,
    /// Extra entries to leave out of the runner jar, as glob patterns.
    pub ignored_entries: Vec<String>,
    pub add_implementation_entries: bool,
}

impl Default for RunnerJarConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            lib_dir: None,
            final_name: None,
            main_class: DEFAULT_MAIN_CLASS.to_string(),
            uber_jar: false,
            ignored_entries: Vec::new(),
            add_implementation_entries: true,
        }
    }
}

impl CreatorConfig {
    /// Load a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or does not match the configuration
    /// schema (unknown keys included).
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).at(path)?;
        Self::from_toml(&content)
            .map_err(|e| AppCreatorError::Config(format!("{}: {e}", path.display())))
    }

    /// Parse a TOML configuration document.
    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Apply a `key=value` assignment.
    pub fn apply_assignment(&mut self, assignment: &str) -> Result<()> {
        let (key, value) = assignment.split_once('=').ok_or_else(|| {
            AppCreatorError::Config(format!("Expected key=value, got '{assignment}'"))
        })?;
        self.apply_property(key.trim(), value.trim())
    }

    /// Set a single property-style value.
    ///
    /// # Errors
    ///
    /// Unknown keys are a [`AppCreatorError::Config`] error, illegal values of
    /// enumerated properties a [`AppCreatorError::Policy`] error.
    pub fn apply_property(&mut self, key: &str, value: &str) -> Result<()> {
        let curate = &mut self.curate;
        let runner = &mut self.runner_jar;
        match key {
            "app-jar" => curate.app_jar = Some(PathBuf::from(value)),
            "initial-deps" => curate.initial_deps = value.parse()?,
            "update" => curate.update = value.parse()?,
            "update-number" => curate.update_number = value.parse()?,
            "local-repo" => curate.local_repo = non_empty(value).map(PathBuf::from),
            "offline" => curate.offline = parse_bool(key, value)?,
            "output" => runner.output_dir = non_empty(value).map(PathBuf::from),
            "lib" => runner.lib_dir = non_empty(value).map(PathBuf::from),
            "final-name" => runner.final_name = non_empty(value).map(str::to_string),
            "main-class" => {
                if value.is_empty() {
                    return Err(AppCreatorError::Config("main-class must not be empty".into()));
                }
                runner.main_class = value.to_string();
            }
            "uber-jar" => runner.uber_jar = parse_bool(key, value)?,
            "ignored-entries" => {
                runner.ignored_entries = value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            "add-implementation-entries" => {
                runner.add_implementation_entries = parse_bool(key, value)?;
            }
            _ => {
                return Err(AppCreatorError::Config(format!(
                    "Unknown property '{key}'"
                )));
            }
        }
        Ok(())
    }
}

fn non_empty(value: &str) -> Option<&str> {
    (!value.is_empty()).then_some(value)
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(AppCreatorError::Config(format!(
            "Unrecognized value '{value}' for '{key}', expected true or false"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CreatorConfig::default();
        assert_eq!(config.runner_jar.main_class, DEFAULT_MAIN_CLASS);
        assert!(config.runner_jar.add_implementation_entries);
        assert!(!config.runner_jar.uber_jar);
        assert_eq!(config.curate.update, UpdatePolicy::None);
        assert_eq!(config.curate.remote_repositories, [MAVEN_CENTRAL_URL]);
    }

    #[test]
    fn test_from_toml() {
        let config = CreatorConfig::from_toml(
            r#"
            [curate]
            initial-deps = "last-update"
            update = "latest"
            update-number = "minor"
            offline = true

            [runner-jar]
            uber-jar = true
            final-name = "demo"
            ignored-entries = ["META-INF/*.kotlin_module"]
            "#,
        )
        .unwrap();
        assert_eq!(config.curate.initial_deps, InitialDeps::LastUpdate);
        assert_eq!(config.curate.update, UpdatePolicy::Latest);
        assert_eq!(config.curate.update_number, UpdateNumber::Minor);
        assert!(config.curate.offline);
        assert!(config.runner_jar.uber_jar);
        assert_eq!(config.runner_jar.final_name.as_deref(), Some("demo"));
        assert_eq!(config.runner_jar.main_class, DEFAULT_MAIN_CLASS);
    }

    #[test]
    fn test_toml_rejects_unknown_keys() {
        assert!(CreatorConfig::from_toml("[runner-jar]\nuber = true\n").is_err());
    }

    #[test]
    fn test_apply_property() {
        let mut config = CreatorConfig::default();
        config.apply_property("update", "next").unwrap();
        config.apply_property("uber-jar", "true").unwrap();
        config
            .apply_assignment("ignored-entries = a.txt, META-INF/*.md")
            .unwrap();
        assert_eq!(config.curate.update, UpdatePolicy::Next);
        assert!(config.runner_jar.uber_jar);
        assert_eq!(config.runner_jar.ignored_entries, ["a.txt", "META-INF/*.md"]);
    }

    #[test]
    fn test_bad_policy_value_is_descriptive() {
        let mut config = CreatorConfig::default();
        let err = config.apply_property("update", "sometimes").unwrap_err();
        assert!(matches!(err, AppCreatorError::Policy(_)));
        let msg = err.to_string();
        assert!(msg.contains("sometimes"), "{msg}");
        assert!(msg.contains("none, next, latest"), "{msg}");
    }

    #[test]
    fn test_unknown_property() {
        let mut config = CreatorConfig::default();
        assert!(matches!(
            config.apply_property("uber", "true"),
            Err(AppCreatorError::Config(_))
        ));
        assert!(config.apply_assignment("no-equals-sign").is_err());
        assert!(config.apply_property("uber-jar", "maybe").is_err());
    }
}

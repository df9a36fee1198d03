//! Subcommand implementations.

pub mod build;
pub mod curate;
pub mod state;

use std::path::Path;

use anyhow::{Context, Result};
use appc_core::CreatorConfig;
use appc_schema::AppDependency;

/// Options shared by every subcommand.
#[derive(Debug, Clone, Copy)]
pub struct Common<'a> {
    pub config: Option<&'a Path>,
    pub defines: &'a [String],
    pub json: bool,
}

impl Common<'_> {
    /// The configuration file (if any) with `-D` overrides and the
    /// `--app-jar` flag applied, in that order.
    pub fn load_config(&self, app_jar: Option<&Path>) -> Result<CreatorConfig> {
        let mut config = match self.config {
            Some(path) => CreatorConfig::load(path)
                .with_context(|| format!("Failed to load {}", path.display()))?,
            None => CreatorConfig::default(),
        };
        for define in self.defines {
            config
                .apply_assignment(define)
                .with_context(|| format!("Invalid -D {define}"))?;
        }
        if let Some(app_jar) = app_jar {
            config.curate.app_jar = Some(app_jar.to_path_buf());
        }
        Ok(config)
    }
}

fn dependency_json(dep: &AppDependency) -> serde_json::Value {
    serde_json::json!({
        "artifact": dep.artifact.to_string(),
        "scope": dep.scope.as_str(),
    })
}

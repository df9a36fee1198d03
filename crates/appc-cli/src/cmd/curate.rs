//! Curate command

use std::path::Path;

use anyhow::{Context, Result};
use appc_core::{CurateOutcome, TracingReporter};

use super::{Common, dependency_json};

/// Resolve and print the effective dependency set and pending updates.
pub fn curate(common: &Common<'_>, app_jar: Option<&Path>) -> Result<()> {
    let config = common.load_config(app_jar)?;
    let outcome =
        appc_core::curate(&config.curate, &TracingReporter).context("Dependency curation failed")?;
    print_outcome(&outcome, common.json)
}

fn print_outcome(outcome: &CurateOutcome, json: bool) -> Result<()> {
    if json {
        let value = serde_json::json!({
            "application": outcome.app_artifact.to_string(),
            "state": outcome.state_artifact.as_ref().map(ToString::to_string),
            "dependencies": outcome.effective_deps().iter().map(dependency_json).collect::<Vec<_>>(),
            "updates": outcome.updates.iter().map(|u| serde_json::json!({
                "artifact": u.artifact.to_string(),
                "new_version": u.new_version,
            })).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("{}", outcome.app_artifact);
    if let Some(state) = &outcome.state_artifact {
        println!("  reproduced from {state}");
    }
    for dep in outcome.effective_deps() {
        println!("  {} ({})", dep.artifact, dep.scope.as_str());
    }
    if !outcome.updates.is_empty() {
        println!();
        println!("Updates:");
        for update in &outcome.updates {
            println!("  {} -> {}", update.artifact, update.new_version);
        }
    }
    Ok(())
}

//! Persist-state command

use std::path::Path;

use anyhow::{Context, Result};
use appc_core::TracingReporter;

use super::Common;

/// Curate and publish the result as a state artifact.
pub fn persist_state(common: &Common<'_>, app_jar: Option<&Path>) -> Result<()> {
    let config = common.load_config(app_jar)?;
    let reporter = TracingReporter;
    let outcome =
        appc_core::curate(&config.curate, &reporter).context("Dependency curation failed")?;
    let state = appc_core::persist_state(&outcome, &reporter)
        .with_context(|| format!("Failed to record the state of {}", outcome.app_artifact))?;
    if common.json {
        println!("{}", serde_json::json!({ "state": state.to_string() }));
    } else {
        println!("{state}");
    }
    Ok(())
}

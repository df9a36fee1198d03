//! Build command

use anyhow::{Context, Result};
use appc_core::{AugmentOutcome, TracingReporter, TransformedClasses, build_runner_jar};

use super::Common;
use crate::BuildArgs;

/// Curate, then assemble the runner jar from the augmentation output.
pub fn build(common: &Common<'_>, args: &BuildArgs) -> Result<()> {
    let mut config = common.load_config(args.app_jar.as_deref())?;
    if args.uber_jar {
        config.runner_jar.uber_jar = true;
    }
    if let Some(output) = &args.output {
        config.runner_jar.output_dir = Some(output.clone());
    }

    let mut augment = AugmentOutcome::new(
        &args.wiring_classes,
        &args.app_classes,
        &args.transformed_classes,
    );
    augment.config_dir.clone_from(&args.config_dir);
    if let Some(map) = &args.transformed_map {
        augment.transformed_classes = TransformedClasses::load(map)
            .with_context(|| format!("Failed to read {}", map.display()))?;
    }
    // Missing directories fail before resolution starts.
    augment.check_inputs()?;

    let reporter = TracingReporter;
    let curate =
        appc_core::curate(&config.curate, &reporter).context("Dependency curation failed")?;
    let outcome = build_runner_jar(&config.runner_jar, &curate, &augment, &reporter)
        .context("Runner jar assembly failed")?;

    if common.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }
    println!("{}", outcome.runner_jar.display());
    if let Some(lib_dir) = &outcome.lib_dir {
        println!("  lib:      {}", lib_dir.display());
    }
    if let Some(original) = &outcome.original_jar {
        println!("  original: {}", original.display());
    }
    println!("  sha256:   {}", outcome.sha256);
    Ok(())
}

//! appc - application creator
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! Curates the dependencies of a packaged application and assembles its
//! runner jar.
//!
//! # Overview
//!
//! - `appc curate` resolves the effective dependency set and lists pending
//!   updates.
//! - `appc build` curates, then merges the augmentation output and the
//!   dependencies into a thin or uber runner jar.
//! - `appc persist-state` records the curated set so a later
//!   `initial-deps=last-update` run reproduces it.
//!
//! # Output Layout
//!
//! ```text
//! <output>/
//! ├── <final-name>-runner.jar      # Main-Class + Class-Path manifest
//! ├── <final-name>.jar(.original)  # plain application jar
//! └── lib/                         # thin mode only
//!     ├── <groupId>.<file>.jar
//!     └── modified-<groupId>.<file>.jar
//! ```

pub mod cmd;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub use appc_core::USER_AGENT;

#[derive(Debug, Parser)]
#[command(name = "appc")]
#[command(author, version, about = "appc - dependency curation and runner jar assembly")]
pub struct Cli {
    /// TOML configuration file with [curate] and [runner-jar] sections
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override a setting, e.g. -D update=latest (repeatable)
    #[arg(short = 'D', value_name = "KEY=VALUE", global = true)]
    pub defines: Vec<String>,

    /// Log per-entry decisions
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Resolve the application's dependencies and list available updates
    Curate {
        /// The application jar
        #[arg(long)]
        app_jar: Option<PathBuf>,
    },
    /// Curate, then assemble the runner jar
    Build(BuildArgs),
    /// Curate, then record the dependency set as a state artifact
    #[command(name = "persist-state")]
    PersistState {
        /// The application jar
        #[arg(long)]
        app_jar: Option<PathBuf>,
    },
}

#[derive(Debug, Args)]
pub struct BuildArgs {
    /// The application jar
    #[arg(long)]
    pub app_jar: Option<PathBuf>,
    /// Generated wiring classes
    #[arg(long)]
    pub wiring_classes: PathBuf,
    /// Compiled application classes and resources
    #[arg(long)]
    pub app_classes: PathBuf,
    /// Classes rewritten by augmentation
    #[arg(long)]
    pub transformed_classes: PathBuf,
    /// Extra configuration resources
    #[arg(long)]
    pub config_dir: Option<PathBuf>,
    /// JSON map of dependency jar path to transformed class entries
    #[arg(long)]
    pub transformed_map: Option<PathBuf>,
    /// Produce a self-contained jar instead of a thin jar plus lib/
    #[arg(long)]
    pub uber_jar: bool,
    /// Output directory
    #[arg(long)]
    pub output: Option<PathBuf>,
}

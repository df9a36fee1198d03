pub mod app_jar;
pub mod augment;
pub mod config;
pub mod curate;
pub mod error;
pub mod io;
pub mod paths;
pub mod resolver;
pub mod runner;

pub mod reporter;

pub use augment::{AugmentOutcome, TransformedClasses};
pub use config::{CreatorConfig, CurateConfig, RunnerJarConfig};
pub use curate::{CurateOutcome, curate, curate_with, persist_state};
pub use error::{AppCreatorError, Result};
pub use reporter::{NullReporter, Reporter, TracingReporter};
pub use resolver::{ArtifactResolver, MavenArtifactResolver, RemoteRepository};
pub use runner::{DuplicateGroup, RunnerJarOutcome, build_runner_jar};

/// User Agent string for repository requests
pub const USER_AGENT: &str = concat!("appc-core/", env!("CARGO_PKG_VERSION"));

//! Shared data types for the application creator.
//!
//! Everything here is plain data: artifact coordinates, dependency edges,
//! Maven-style version ordering and the enumerated phase policies. Nothing in
//! this crate touches the filesystem or the network, so both phases (and
//! their tests) can build values freely.

pub mod coords;
pub mod dependency;
pub mod policy;
pub mod version;

// Re-exports
pub use coords::{ArtifactCoords, ArtifactKey, CoordsError, DEFAULT_TYPE};
pub use dependency::{AppDependency, DependencyUpdate, Scope};
pub use policy::{InitialDeps, PolicyError, UpdateNumber, UpdatePolicy};
pub use version::{MavenVersion, VersionError, update_bound};

/// Classifier reserved for the synthetic "state" artifact that records the
/// dependency closure of a previous build.
pub const STATE_CLASSIFIER: &str = "state";

/// Placeholder a state descriptor uses for the application's own groupId.
/// Dependencies carrying it literally are self-references.
pub const SELF_GROUP_ID_PLACEHOLDER: &str = "${project.groupId}";

//! Dependency edges and scopes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::coords::{ArtifactCoords, CoordsError};

/// Maven dependency scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Available everywhere; the default.
    #[default]
    Compile,
    /// Needed at runtime only.
    Runtime,
    /// Supplied by the runtime environment; never packaged.
    Provided,
    /// Test classpath only.
    Test,
    /// Like `provided` but pinned to a local path.
    System,
    /// Dependency-management import of a BOM.
    Import,
}

impl Scope {
    /// The scope name as written in a POM.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Compile => "compile",
            Self::Runtime => "runtime",
            Self::Provided => "provided",
            Self::Test => "test",
            Self::System => "system",
            Self::Import => "import",
        }
    }

    /// Whether a dependency in this scope belongs on the packaged runtime
    /// classpath.
    pub fn is_packaged(self) -> bool {
        matches!(self, Self::Compile | Self::Runtime)
    }

    /// Scope a transitive dependency ends up with, given the scope of the edge
    /// that pulled it in. Returns `None` when the transitive dependency does
    /// not propagate at all.
    ///
    /// ```
    /// use appc_schema::Scope;
    ///
    /// assert_eq!(Scope::Compile.mediate(Scope::Runtime), Some(Scope::Runtime));
    /// assert_eq!(Scope::Runtime.mediate(Scope::Compile), Some(Scope::Runtime));
    /// assert_eq!(Scope::Compile.mediate(Scope::Test), None);
    /// ```
    pub fn mediate(self, transitive: Scope) -> Option<Scope> {
        if !transitive.is_packaged() {
            return None;
        }
        match (self, transitive) {
            (Self::Compile, Self::Compile) => Some(Self::Compile),
            (Self::Compile | Self::Runtime, _) => Some(Self::Runtime),
            _ => None,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = CoordsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "compile" => Ok(Self::Compile),
            "runtime" => Ok(Self::Runtime),
            "provided" => Ok(Self::Provided),
            "test" => Ok(Self::Test),
            "system" => Ok(Self::System),
            "import" => Ok(Self::Import),
            other => Err(CoordsError::UnknownScope(other.to_string())),
        }
    }
}

/// A dependency edge: an artifact plus the scope it is used in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AppDependency {
    /// The artifact this edge points at.
    pub artifact: ArtifactCoords,
    /// Usage scope.
    #[serde(default)]
    pub scope: Scope,
    /// Whether the dependency was declared optional.
    #[serde(default)]
    pub optional: bool,
}

impl AppDependency {
    /// A non-optional dependency edge.
    pub fn new(artifact: ArtifactCoords, scope: Scope) -> Self {
        Self {
            artifact,
            scope,
            optional: false,
        }
    }
}

impl fmt::Display for AppDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.artifact, self.scope)?;
        if self.optional {
            f.write_str(" optional")?;
        }
        Ok(())
    }
}

/// An available upstream version for one of the application's dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyUpdate {
    /// The dependency at its currently resolved version.
    pub artifact: ArtifactCoords,
    /// The version it can move to.
    pub new_version: String,
}

impl DependencyUpdate {
    /// The artifact at its updated version.
    pub fn updated(&self) -> ArtifactCoords {
        self.artifact.with_version(&self.new_version)
    }
}

impl fmt::Display for DependencyUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.artifact, self.new_version)
    }
}

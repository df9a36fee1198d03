//! Artifact coordinates and keys.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Artifact type assumed when none is declared.
pub const DEFAULT_TYPE: &str = "jar";

/// Errors raised while parsing coordinate strings.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum CoordsError {
    /// The string does not have 3 to 5 colon-separated parts.
    #[error("Invalid artifact coordinates '{0}': expected groupId:artifactId[:type[:classifier]]:version")]
    Malformed(String),

    /// One of the mandatory parts is empty.
    #[error("Invalid artifact coordinates '{coords}': empty {part}")]
    EmptyPart {
        /// The offending input.
        coords: String,
        /// Which part was empty.
        part: &'static str,
    },

    /// The dependency scope is not one Maven knows about.
    #[error("Unknown dependency scope '{0}'")]
    UnknownScope(String),
}

/// Immutable identity of an artifact: `(groupId, artifactId, classifier, type, version)`.
///
/// An empty classifier means "no classifier". Equality and hashing cover all
/// five parts, so two coordinates that differ only by version are different
/// artifacts. Use [`ArtifactCoords::key`] for version-less identity.
///
/// # Example
///
/// ```
/// use appc_schema::ArtifactCoords;
///
/// let coords: ArtifactCoords = "org.acme:greeting:1.0.0".parse().unwrap();
/// assert_eq!(coords.artifact_type(), "jar");
/// assert_eq!(coords.to_string(), "org.acme:greeting:1.0.0");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtifactCoords {
    group_id: String,
    artifact_id: String,
    #[serde(default)]
    classifier: String,
    #[serde(rename = "type", default = "default_type")]
    artifact_type: String,
    version: String,
}

fn default_type() -> String {
    DEFAULT_TYPE.to_string()
}

impl ArtifactCoords {
    /// Create coordinates from all five parts.
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        classifier: impl Into<String>,
        artifact_type: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        let artifact_type = artifact_type.into();
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            classifier: classifier.into(),
            artifact_type: if artifact_type.is_empty() {
                default_type()
            } else {
                artifact_type
            },
            version: version.into(),
        }
    }

    /// Coordinates of a plain jar artifact.
    pub fn jar(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self::new(group_id, artifact_id, "", DEFAULT_TYPE, version)
    }

    /// Coordinates of a POM artifact.
    pub fn pom(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self::new(group_id, artifact_id, "", "pom", version)
    }

    /// The groupId.
    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    /// The artifactId.
    pub fn artifact_id(&self) -> &str {
        &self.artifact_id
    }

    /// The classifier, empty when absent.
    pub fn classifier(&self) -> &str {
        &self.classifier
    }

    /// The artifact type (`jar`, `pom`, ...).
    pub fn artifact_type(&self) -> &str {
        &self.artifact_type
    }

    /// The version string exactly as declared.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Same artifact at a different version.
    pub fn with_version(&self, version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            ..self.clone()
        }
    }

    /// The POM describing this artifact (same group, artifact and version).
    pub fn pom_coords(&self) -> Self {
        Self::pom(&self.group_id, &self.artifact_id, &self.version)
    }

    /// Version-less identity used for conflict mediation and duplicate detection.
    pub fn key(&self) -> ArtifactKey {
        ArtifactKey {
            group_id: self.group_id.clone(),
            artifact_id: self.artifact_id.clone(),
            classifier: self.classifier.clone(),
            artifact_type: self.artifact_type.clone(),
        }
    }
}

impl fmt::Display for ArtifactCoords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group_id, self.artifact_id)?;
        if !self.classifier.is_empty() {
            write!(f, ":{}:{}", self.artifact_type, self.classifier)?;
        } else if self.artifact_type != DEFAULT_TYPE {
            write!(f, ":{}", self.artifact_type)?;
        }
        write!(f, ":{}", self.version)
    }
}

impl FromStr for ArtifactCoords {
    type Err = CoordsError;

    /// Parse `groupId:artifactId[:type[:classifier]]:version`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        let (group, artifact, artifact_type, classifier, version) = match parts.as_slice() {
            [g, a, v] => (*g, *a, DEFAULT_TYPE, "", *v),
            [g, a, t, v] => (*g, *a, *t, "", *v),
            [g, a, t, c, v] => (*g, *a, *t, *c, *v),
            _ => return Err(CoordsError::Malformed(s.to_string())),
        };
        for (part, value) in [("groupId", group), ("artifactId", artifact), ("version", version)] {
            if value.is_empty() {
                return Err(CoordsError::EmptyPart {
                    coords: s.to_string(),
                    part,
                });
            }
        }
        Ok(Self::new(group, artifact, classifier, artifact_type, version))
    }
}

/// Version-less artifact identity: `(groupId, artifactId, classifier, type)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtifactKey {
    /// The groupId.
    pub group_id: String,
    /// The artifactId.
    pub artifact_id: String,
    /// The classifier, empty when absent.
    pub classifier: String,
    /// The artifact type.
    pub artifact_type: String,
}

impl ArtifactKey {
    /// Whether this key names the same `groupId:artifactId` pair, ignoring
    /// classifier and type.
    pub fn same_module(&self, group_id: &str, artifact_id: &str) -> bool {
        self.group_id == group_id && self.artifact_id == artifact_id
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group_id, self.artifact_id)?;
        if !self.classifier.is_empty() {
            write!(f, ":{}", self.classifier)?;
        }
        if self.artifact_type != DEFAULT_TYPE {
            write!(f, ":{}", self.artifact_type)?;
        }
        Ok(())
    }
}

//! The build-level error shared by every phase.
//!
//! Any fatal condition in curation or assembly ends up here, carrying the
//! responsible path or coordinate so the caller can report it as-is.

use std::path::{Path, PathBuf};

use appc_schema::{ArtifactCoords, CoordsError, PolicyError, VersionError};
use thiserror::Error;

use crate::io::download::DownloadError;

/// Result alias used throughout the crate.
pub type Result<T, E = AppCreatorError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum AppCreatorError {
    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("{what} does not exist: {}", path.display())]
    MissingInput { what: &'static str, path: PathBuf },

    #[error("Failed to resolve {artifact}: {message}")]
    Resolution {
        artifact: ArtifactCoords,
        message: String,
    },

    #[error("Artifact {0} could not be found in any repository")]
    ArtifactNotFound(ArtifactCoords),

    #[error(transparent)]
    Coords(#[from] CoordsError),

    #[error(transparent)]
    Version(#[from] VersionError),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error("Failed to parse POM {source_name}: {message}")]
    Pom {
        source_name: String,
        message: String,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Archive error on {}: {source}", path.display())]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Cannot add {entry} to {}: {reason}", archive.display())]
    EntryConflict {
        archive: PathBuf,
        entry: String,
        reason: &'static str,
    },

    #[error("Resource {} is too large ({size} bytes) to be merged", path.display())]
    ResourceTooLarge { path: PathBuf, size: u64 },
}

impl AppCreatorError {
    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Wrap an archive error with the archive it happened on.
    pub fn zip(path: impl AsRef<Path>, source: zip::result::ZipError) -> Self {
        Self::Zip {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn resolution(artifact: &ArtifactCoords, message: impl std::fmt::Display) -> Self {
        Self::Resolution {
            artifact: artifact.clone(),
            message: message.to_string(),
        }
    }

    pub fn pom(source_name: impl std::fmt::Display, message: impl std::fmt::Display) -> Self {
        Self::Pom {
            source_name: source_name.to_string(),
            message: message.to_string(),
        }
    }
}

/// Attach a path to I/O results, mirroring `anyhow::Context` for the typed error.
pub(crate) trait IoResultExt<T> {
    fn at(self, path: impl AsRef<Path>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn at(self, path: impl AsRef<Path>) -> Result<T> {
        self.map_err(|e| AppCreatorError::io(path, e))
    }
}

pub(crate) trait ZipResultExt<T> {
    fn at(self, path: impl AsRef<Path>) -> Result<T>;
}

impl<T> ZipResultExt<T> for zip::result::ZipResult<T> {
    fn at(self, path: impl AsRef<Path>) -> Result<T> {
        self.map_err(|e| AppCreatorError::zip(path, e))
    }
}

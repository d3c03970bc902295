//! Project version metadata (the `package.json`-style version file).

use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

/// Default version file, relative to the project root.
pub const DEFAULT_VERSION_FILE: &str = "package.json";

/// Errors reading the version file.
#[derive(Error, Debug)]
pub enum MetadataError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// File path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file is not valid JSON of the expected shape.
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// File path.
        path: String,
        /// Underlying JSON error.
        source: serde_json::Error,
    },
}

/// Result alias for metadata operations.
pub type MetadataResult<T> = Result<T, MetadataError>;

/// The fields of the version file the release cares about.
///
/// Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageMetadata {
    /// Project name, the default artifact id.
    pub name: Option<String>,
    /// Current development version (e.g. `1.0.0-SNAPSHOT`).
    pub version: Option<String>,
    /// Declared packaging, the default for `packaging`.
    pub packaging: Option<String>,
}

impl PackageMetadata {
    /// Read metadata from a JSON version file.
    #[instrument]
    pub fn load(path: &Utf8Path) -> MetadataResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| MetadataError::Read {
            path: path.to_string(),
            source,
        })?;
        let metadata = Self::parse(&raw).map_err(|source| MetadataError::Parse {
            path: path.to_string(),
            source,
        })?;
        debug!(name = ?metadata.name, version = ?metadata.version, "loaded version file");
        Ok(metadata)
    }

    /// Parse metadata from JSON text.
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

//! Release and development version arithmetic.
//!
//! Projects carry a development version (`1.2.0-SNAPSHOT`) between releases.
//! A release strips the marker, and the following development version is the
//! patch increment with the marker put back.

use semver::Version;
use thiserror::Error;
use tracing::{debug, instrument};

/// Suffix marking an in-progress development version.
pub const SNAPSHOT_SUFFIX: &str = "-SNAPSHOT";

/// Errors from version operations.
#[derive(Error, Debug)]
pub enum VersionError {
    /// Failed to parse a semver string.
    #[error("invalid semver `{input}`: {source}")]
    InvalidSemver {
        /// The rejected input.
        input: String,
        /// Parser error.
        source: semver::Error,
    },

    /// Neither an explicit version nor a version-file version was available.
    #[error("no version given and none found in the version file")]
    Missing,

    /// No usable version was available to compute from.
    #[error("failed to determine next development version based on version ({version})")]
    ComputationFailed {
        /// The release version the computation started from.
        version: String,
    },
}

/// Result alias for version operations.
pub type VersionResult<T> = Result<T, VersionError>;

/// Parse a version string, stripping an optional `v` prefix.
pub fn parse_version(s: &str) -> VersionResult<Version> {
    let trimmed = s.trim();
    let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
    Version::parse(trimmed).map_err(|source| VersionError::InvalidSemver {
        input: s.to_string(),
        source,
    })
}

/// Derive the release version from a development version.
///
/// `2.3.0-SNAPSHOT` becomes `2.3.0`. A version without the marker is
/// released as-is.
#[instrument]
pub fn release_version(development: &str) -> VersionResult<Version> {
    let trimmed = development.trim();
    let base = trimmed.strip_suffix(SNAPSHOT_SUFFIX).unwrap_or(trimmed);
    let version = parse_version(base)?;
    debug!(%version, "derived release version");
    Ok(version)
}

/// Compute the next development version after `release`.
///
/// Patch increment plus [`SNAPSHOT_SUFFIX`]. A pre-release such as
/// `2.0.0-rc.1` increments to `2.0.0`, matching npm semantics.
#[instrument(skip_all, fields(%release))]
pub fn next_development_version(release: &Version) -> VersionResult<String> {
    let next = if release.pre.is_empty() {
        let patch = release
            .patch
            .checked_add(1)
            .ok_or_else(|| VersionError::ComputationFailed {
                version: release.to_string(),
            })?;
        Version::new(release.major, release.minor, patch)
    } else {
        Version::new(release.major, release.minor, release.patch)
    };

    let next = format!("{next}{SNAPSHOT_SUFFIX}");
    debug!(%next, "computed next development version");
    Ok(next)
}

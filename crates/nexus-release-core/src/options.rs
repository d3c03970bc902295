//! Option resolution: raw settings plus version-file metadata into one
//! validated [`ReleaseOptions`] record.
//!
//! Resolution runs once per invocation, before anything touches the
//! repository. The result is never mutated afterwards; every step of the
//! release reads from it.

use camino::{Utf8Path, Utf8PathBuf};
use semver::Version;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::artifact;
use crate::config::{DEFAULT_GOAL, ReleaseSettings};
use crate::mapping::{self, FileMapping};
use crate::metadata::{DEFAULT_VERSION_FILE, PackageMetadata};
use crate::version::{self, VersionError};

/// Default commit message template for version bumps.
pub const DEFAULT_COMMIT_PREFIX: &str = "%s";

/// Errors from option resolution.
#[derive(Error, Debug)]
pub enum OptionsError {
    /// One or more required options are absent.
    #[error("required options {} missing", quote_keys(.keys))]
    MissingOptions {
        /// Every missing key, in check order.
        keys: Vec<String>,
    },

    /// The release or next development version could not be computed.
    #[error(transparent)]
    Version(#[from] VersionError),
}

/// Result alias for option resolution.
pub type OptionsResult<T> = Result<T, OptionsError>;

fn quote_keys(keys: &[String]) -> String {
    keys.iter()
        .map(|k| format!("\"{k}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Fully resolved options for one release run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseOptions {
    /// Name of the goal being run.
    pub goal: String,
    /// Maven group id.
    pub group_id: String,
    /// Maven artifact id.
    pub artifact_id: String,
    /// Declared packaging, as configured or read from the version file.
    pub packaging: Option<String>,
    /// Declared artifact type.
    pub artifact_type: Option<String>,
    /// Maven classifier.
    pub classifier: Option<String>,
    /// Resolved file extension, also deployed as the Maven packaging.
    pub extension: String,
    /// Version being released.
    pub version: Version,
    /// Development version committed after the release.
    pub next_version: String,
    /// Repository URL.
    pub url: String,
    /// Archive path, relative to the project root unless absolute.
    pub file: Utf8PathBuf,
    /// Folder injected in front of every mapping destination, if any.
    pub dest_folder: Option<String>,
    /// File mappings, destinations already rewritten.
    pub files: Vec<FileMapping>,
    /// Template wrapped around both release commit messages.
    pub commit_prefix: String,
    /// Raw unique-version marker.
    pub unique_version: Option<String>,
    /// Server id from the Maven settings file.
    pub repository_id: Option<String>,
    /// Maven settings file path.
    pub settings_xml: Option<String>,
    /// Extra deploy arguments, in order.
    pub optional_params: Vec<String>,
    /// Verbose deploy output.
    pub debug: bool,
    /// Accept any TLS certificate when deploying.
    pub unsecure: bool,
    /// Push tags together with the branch.
    pub push_tags: bool,
    /// Version file rewritten by the bump steps.
    pub version_file: Utf8PathBuf,
}

impl ReleaseOptions {
    /// The annotated tag created for this release: `<artifact_id>-<version>`.
    pub fn tag_name(&self) -> String {
        format!("{}-{}", self.artifact_id, self.version)
    }

    /// Archive path resolved against `root`.
    pub fn artifact_path(&self, root: &Utf8Path) -> Utf8PathBuf {
        if self.file.is_absolute() {
            self.file.clone()
        } else {
            root.join(&self.file)
        }
    }

    /// Whether `-DuniqueVersion=true` should be passed.
    pub fn unique_version_enabled(&self) -> bool {
        self.unique_version.as_deref() == Some("true")
    }
}

/// Resolve raw settings into [`ReleaseOptions`].
///
/// `explicit_version` (e.g. from the command line) beats a configured
/// `version`, which beats the version file's development version with the
/// snapshot marker stripped.
///
/// # Errors
///
/// [`OptionsError::MissingOptions`] listing every missing required key, or
/// [`OptionsError::Version`] when no valid version can be determined.
#[instrument(skip_all, fields(goal = ?raw.goal))]
pub fn resolve(
    raw: &ReleaseSettings,
    metadata: &PackageMetadata,
    explicit_version: Option<&str>,
) -> OptionsResult<ReleaseOptions> {
    let mut missing = Vec::new();
    let group_id = required(&raw.group_id, "group_id", &mut missing);

    let artifact_id = raw.artifact_id.clone().or_else(|| metadata.name.clone());
    let packaging = raw.packaging.clone().or_else(|| metadata.packaging.clone());

    let url = required(&raw.url, "url", &mut missing);
    let artifact_id = required(&artifact_id, "artifact_id", &mut missing);

    let (Some(group_id), Some(url), Some(artifact_id)) = (group_id, url, artifact_id) else {
        return Err(OptionsError::MissingOptions { keys: missing });
    };

    let version = match explicit_version.or(raw.version.as_deref()) {
        Some(v) => version::parse_version(v)?,
        None => {
            let dev = metadata.version.as_deref().ok_or(VersionError::Missing)?;
            version::release_version(dev)?
        }
    };
    let next_version = version::next_development_version(&version)?;

    let classifier = raw.classifier.clone().filter(|c| !c.is_empty());
    let extension = artifact::extension(
        packaging.as_deref(),
        classifier.as_deref(),
        raw.artifact_type.as_deref(),
    );
    let base = artifact::file_name_base(&artifact_id, &version, classifier.as_deref());
    let file = raw
        .file
        .clone()
        .unwrap_or_else(|| Utf8PathBuf::from(format!("{base}.{extension}")));

    let inject = raw.inject_dest_folder.unwrap_or(true);
    debug!(inject, dest_folder = ?raw.dest_folder, "destination folder settings");
    let mappings = raw.files.clone().unwrap_or_default();
    let (dest_folder, files) = if inject {
        let folder = raw.dest_folder.clone().unwrap_or(base);
        let files = mapping::inject_dest_folder(&folder, mappings);
        (Some(folder), files)
    } else {
        (None, mappings)
    };

    let options = ReleaseOptions {
        goal: raw.goal.clone().unwrap_or_else(|| DEFAULT_GOAL.to_string()),
        group_id,
        artifact_id,
        packaging,
        artifact_type: raw.artifact_type.clone(),
        classifier,
        extension,
        version,
        next_version,
        url,
        file,
        dest_folder,
        files,
        commit_prefix: raw
            .commit_prefix
            .clone()
            .unwrap_or_else(|| DEFAULT_COMMIT_PREFIX.to_string()),
        unique_version: raw.unique_version.clone(),
        repository_id: raw.repository_id.clone(),
        settings_xml: raw.settings_xml.clone(),
        optional_params: raw.optional_params.clone().unwrap_or_default(),
        debug: raw.debug.unwrap_or(false),
        unsecure: raw.unsecure.unwrap_or(false),
        push_tags: raw.push_tags.unwrap_or(false),
        version_file: raw
            .version_file
            .clone()
            .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_VERSION_FILE)),
    };

    info!(
        version = %options.version,
        next_version = %options.next_version,
        file = %options.file,
        extension = %options.extension,
        "release options resolved"
    );
    Ok(options)
}

fn required(value: &Option<String>, key: &str, missing: &mut Vec<String>) -> Option<String> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Some(v.to_string()),
        _ => {
            missing.push(key.to_string());
            None
        }
    }
}

//! Configuration loading and discovery.
//!
//! Release options live in a config file next to the project so that every
//! invocation of a release is reproducible from the repository alone.
//!
//! # Config file locations (in order of precedence, highest first):
//! - files passed explicitly (`--config`)
//! - `.nexus-release.<ext>` in current directory or any parent
//! - `nexus-release.<ext>` in current directory or any parent
//! - `~/.config/nexus-release/config.<ext>` (user config)
//!
//! Where `<ext>` is one of: `toml`, `yaml`, `yml`, `json`
//!
//! # Example
//! ```toml
//! log_level = "info"
//!
//! [release]
//! group_id = "com.example"
//! url = "https://nexus.example.com/repository/releases"
//!
//! [[release.files]]
//! src = ["dist/**"]
//!
//! [targets.docs]
//! classifier = "javadoc"
//! ```

use std::collections::BTreeMap;

use camino::{Utf8Path, Utf8PathBuf};
use figment::Figment;
use figment::providers::{Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::mapping::FileMapping;

/// Goal name used when no target is selected.
pub const DEFAULT_GOAL: &str = "release";

/// The configuration for nexus-release.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Log level for the application (e.g., "debug", "info", "warn", "error").
    pub log_level: LogLevel,
    /// Directory for JSONL log files (falls back to platform defaults if unset).
    pub log_dir: Option<Utf8PathBuf>,
    /// Base release options shared by every target.
    pub release: ReleaseSettings,
    /// Named option sets layered over [`Config::release`].
    pub targets: BTreeMap<String, ReleaseSettings>,
    /// Executable overrides for the external tools.
    pub tools: Option<ToolsConfig>,
}

/// Raw, unresolved release options as written in a config file.
///
/// Every field is optional here; [`crate::options::resolve`] validates the
/// required ones and fills in computed defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ReleaseSettings {
    /// Maven group id (required).
    pub group_id: Option<String>,
    /// Repository URL to deploy to (required).
    pub url: Option<String>,
    /// Maven artifact id. Defaults to the version file's `name`.
    pub artifact_id: Option<String>,
    /// Declared packaging. Defaults to the version file's `packaging`.
    pub packaging: Option<String>,
    /// Explicit artifact type, preferred over `packaging` for the extension.
    #[serde(rename = "type")]
    pub artifact_type: Option<String>,
    /// Maven classifier (e.g. `sources`, `javadoc`).
    pub classifier: Option<String>,
    /// Release version override.
    pub version: Option<String>,
    /// Archive file name override.
    pub file: Option<Utf8PathBuf>,
    /// Folder prefixed to every file mapping destination.
    pub dest_folder: Option<String>,
    /// Whether to prefix mapping destinations at all (default: `true`).
    pub inject_dest_folder: Option<bool>,
    /// Template for the release commit messages; `%s` is the message (default: `%s`).
    pub commit_prefix: Option<String>,
    /// Passes `-DuniqueVersion=true` only when set to the string `"true"`.
    pub unique_version: Option<String>,
    /// Server id from the Maven settings file.
    pub repository_id: Option<String>,
    /// Path to a Maven settings file.
    pub settings_xml: Option<String>,
    /// Extra arguments appended verbatim to the deploy command.
    pub optional_params: Option<Vec<String>>,
    /// Run the deploy tool with error and debug output.
    pub debug: Option<bool>,
    /// Accept any TLS certificate when deploying.
    pub unsecure: Option<bool>,
    /// File holding the project name and development version.
    pub version_file: Option<Utf8PathBuf>,
    /// Push annotated tags along with the branch.
    pub push_tags: Option<bool>,
    /// Name of the goal being run. Defaults to the selected target name.
    pub goal: Option<String>,
    /// Prompt before executing (default: `true`).
    pub confirm: Option<bool>,
    /// Files to package into the release archive.
    pub files: Option<Vec<FileMapping>>,
}

/// Program names for the external tools the release shells out to.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ToolsConfig {
    /// Version-control executable (default: `git`).
    pub git: Option<String>,
    /// Version bump executable (default: `npm`).
    pub npm: Option<String>,
    /// Deploy executable (default: `mvn`).
    pub mvn: Option<String>,
}

/// Log level configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Verbose output for debugging and development.
    Debug,
    /// Standard operational information (default).
    #[default]
    Info,
    /// Warnings about potential issues.
    Warn,
    /// Errors that indicate failures.
    Error,
}

impl LogLevel {
    /// Returns the log level as a lowercase string slice.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl Config {
    /// Release settings for `target`, layered over the base `[release]` table.
    ///
    /// The goal defaults to the target name, or [`DEFAULT_GOAL`] when no
    /// target is given.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownTarget`] if `target` names no table.
    pub fn settings_for(&self, target: Option<&str>) -> ConfigResult<ReleaseSettings> {
        let mut settings = match target {
            Some(name) => {
                let over = self
                    .targets
                    .get(name)
                    .ok_or_else(|| ConfigError::UnknownTarget(name.to_string()))?;
                self.release.overlay(over)
            }
            None => self.release.clone(),
        };
        if settings.goal.is_none() {
            settings.goal = Some(target.unwrap_or(DEFAULT_GOAL).to_string());
        }
        Ok(settings)
    }

    /// Program name for `git`.
    pub fn git_program(&self) -> &str {
        self.tools
            .as_ref()
            .and_then(|t| t.git.as_deref())
            .unwrap_or("git")
    }

    /// Program name for `npm`.
    pub fn npm_program(&self) -> &str {
        self.tools
            .as_ref()
            .and_then(|t| t.npm.as_deref())
            .unwrap_or("npm")
    }

    /// Program name for `mvn`.
    pub fn mvn_program(&self) -> &str {
        self.tools
            .as_ref()
            .and_then(|t| t.mvn.as_deref())
            .unwrap_or("mvn")
    }
}

impl ReleaseSettings {
    /// Return a copy of `self` with every field set in `over` replacing ours.
    pub fn overlay(&self, over: &Self) -> Self {
        fn pick<T: Clone>(over: &Option<T>, base: &Option<T>) -> Option<T> {
            over.as_ref().or(base.as_ref()).cloned()
        }

        Self {
            group_id: pick(&over.group_id, &self.group_id),
            url: pick(&over.url, &self.url),
            artifact_id: pick(&over.artifact_id, &self.artifact_id),
            packaging: pick(&over.packaging, &self.packaging),
            artifact_type: pick(&over.artifact_type, &self.artifact_type),
            classifier: pick(&over.classifier, &self.classifier),
            version: pick(&over.version, &self.version),
            file: pick(&over.file, &self.file),
            dest_folder: pick(&over.dest_folder, &self.dest_folder),
            inject_dest_folder: pick(&over.inject_dest_folder, &self.inject_dest_folder),
            commit_prefix: pick(&over.commit_prefix, &self.commit_prefix),
            unique_version: pick(&over.unique_version, &self.unique_version),
            repository_id: pick(&over.repository_id, &self.repository_id),
            settings_xml: pick(&over.settings_xml, &self.settings_xml),
            optional_params: pick(&over.optional_params, &self.optional_params),
            debug: pick(&over.debug, &self.debug),
            unsecure: pick(&over.unsecure, &self.unsecure),
            version_file: pick(&over.version_file, &self.version_file),
            push_tags: pick(&over.push_tags, &self.push_tags),
            goal: pick(&over.goal, &self.goal),
            confirm: pick(&over.confirm, &self.confirm),
            files: pick(&over.files, &self.files),
        }
    }
}

/// Supported configuration file extensions (in order of preference).
const CONFIG_EXTENSIONS: &[&str] = &["toml", "yaml", "yml", "json"];

/// Application name for XDG directory lookup and config file names.
const APP_NAME: &str = "nexus-release";

/// Builder for loading configuration from multiple sources.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    project_search_root: Option<Utf8PathBuf>,
    include_user_config: bool,
    boundary_marker: Option<String>,
    explicit_files: Vec<Utf8PathBuf>,
}

impl ConfigLoader {
    /// Create a new config loader with default settings.
    pub fn new() -> Self {
        Self {
            project_search_root: None,
            include_user_config: true,
            boundary_marker: Some(".git".to_string()),
            explicit_files: Vec::new(),
        }
    }

    /// Walk up from `path` looking for a project config file.
    pub fn with_project_search<P: AsRef<Utf8Path>>(mut self, path: P) -> Self {
        self.project_search_root = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set whether to include user config from `~/.config/nexus-release/`.
    pub const fn with_user_config(mut self, include: bool) -> Self {
        self.include_user_config = include;
        self
    }

    /// Stop the upward search at a directory containing `marker` (default `.git`).
    pub fn with_boundary_marker<S: Into<String>>(mut self, marker: S) -> Self {
        self.boundary_marker = Some(marker.into());
        self
    }

    /// Search all the way to the filesystem root.
    pub fn without_boundary_marker(mut self) -> Self {
        self.boundary_marker = None;
        self
    }

    /// Add an explicit config file. Later files take precedence.
    pub fn with_file<P: AsRef<Utf8Path>>(mut self, path: P) -> Self {
        self.explicit_files.push(path.as_ref().to_path_buf());
        self
    }

    /// Load configuration, merging all discovered sources.
    ///
    /// Precedence (highest to lowest): explicit files, project config,
    /// user config, defaults.
    #[tracing::instrument(skip(self), fields(search_root = ?self.project_search_root))]
    pub fn load(self) -> ConfigResult<Config> {
        tracing::debug!("loading configuration");
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if self.include_user_config
            && let Some(user_config) = self.find_user_config()
        {
            figment = Self::merge_file(figment, &user_config);
        }

        if let Some(ref root) = self.project_search_root
            && let Some(project_config) = self.find_project_config(root)
        {
            figment = Self::merge_file(figment, &project_config);
        }

        for file in &self.explicit_files {
            figment = Self::merge_file(figment, file);
        }

        let config: Config = figment
            .extract()
            .map_err(|e| ConfigError::Deserialize(Box::new(e)))?;
        tracing::info!(
            log_level = config.log_level.as_str(),
            targets = config.targets.len(),
            "configuration loaded"
        );
        Ok(config)
    }

    fn find_project_config(&self, start: &Utf8Path) -> Option<Utf8PathBuf> {
        let mut current = Some(start.to_path_buf());

        while let Some(dir) = current {
            for ext in CONFIG_EXTENSIONS {
                let dotfile = dir.join(format!(".{APP_NAME}.{ext}"));
                if dotfile.is_file() {
                    return Some(dotfile);
                }
                let regular = dir.join(format!("{APP_NAME}.{ext}"));
                if regular.is_file() {
                    return Some(regular);
                }
            }

            // The boundary directory itself is searched, its parents are not.
            if let Some(ref marker) = self.boundary_marker
                && dir.join(marker).exists()
            {
                break;
            }

            current = dir.parent().map(Utf8Path::to_path_buf);
        }

        None
    }

    fn find_user_config(&self) -> Option<Utf8PathBuf> {
        let config_dir = user_config_dir()?;
        CONFIG_EXTENSIONS
            .iter()
            .map(|ext| config_dir.join(format!("config.{ext}")))
            .find(|path| path.is_file())
    }

    fn merge_file(figment: Figment, path: &Utf8Path) -> Figment {
        match path.extension() {
            Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path.as_str())),
            Some("json") => figment.merge(Json::file_exact(path.as_str())),
            _ => figment.merge(Toml::file_exact(path.as_str())),
        }
    }
}

/// Find the project config file [`ConfigLoader::load`] would use, without loading it.
pub fn find_project_config<P: AsRef<Utf8Path>>(start: P) -> Option<Utf8PathBuf> {
    ConfigLoader::new().find_project_config(start.as_ref())
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", APP_NAME)
}

/// Get the user config directory path (`~/.config/nexus-release/` on Linux).
pub fn user_config_dir() -> Option<Utf8PathBuf> {
    let proj_dirs = project_dirs()?;
    Utf8PathBuf::from_path_buf(proj_dirs.config_dir().to_path_buf()).ok()
}

/// Get the user cache directory path (`~/.cache/nexus-release/` on Linux).
pub fn user_cache_dir() -> Option<Utf8PathBuf> {
    let proj_dirs = project_dirs()?;
    Utf8PathBuf::from_path_buf(proj_dirs.cache_dir().to_path_buf()).ok()
}

/// Get the local data directory path (machine-specific, not synced).
pub fn user_data_local_dir() -> Option<Utf8PathBuf> {
    let proj_dirs = project_dirs()?;
    Utf8PathBuf::from_path_buf(proj_dirs.data_local_dir().to_path_buf()).ok()
}

//! Version file bumps via `npm version`.
//!
//! The release commits and tags on its own, so npm is only asked to rewrite
//! the version file in place (`--no-git-tag-version`).

use std::process::Command;

use camino::Utf8PathBuf;
use thiserror::Error;
use tracing::{debug, instrument};

/// Errors from version bumps.
#[derive(Error, Debug)]
pub enum BumpError {
    /// The bump tool could not be spawned.
    #[error("failed to run {program}: {source}")]
    Exec {
        /// Program that could not be spawned.
        program: String,
        /// Spawn error.
        source: std::io::Error,
    },

    /// The bump tool exited unsuccessfully.
    #[error("failed to bump version to {version}: {stderr}")]
    ToolFailed {
        /// Target version.
        version: String,
        /// Exit code, if the process exited normally.
        code: Option<i32>,
        /// Captured stderr.
        stderr: String,
    },
}

/// Result alias for bump operations.
pub type BumpResult<T> = Result<T, BumpError>;

/// Arguments passed to `npm` for a bump to `version`.
///
/// No `-m`: npm only uses it for the commit it would make, and
/// `--no-git-tag-version` turns that commit off.
pub fn bump_args(version: &str) -> Vec<String> {
    vec![
        "version".to_string(),
        version.to_string(),
        "--no-git-tag-version".to_string(),
        "--allow-same-version".to_string(),
    ]
}

/// Rewrites the version file through `npm version`.
#[derive(Debug, Clone)]
pub struct VersionBumper {
    program: String,
    root: Utf8PathBuf,
}

impl VersionBumper {
    /// Run `npm` inside `root`.
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            program: "npm".to_string(),
            root: root.into(),
        }
    }

    /// Use a different npm executable.
    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Set the version file to `version`.
    #[instrument(skip(self), fields(root = %self.root))]
    pub fn bump(&self, version: &str) -> BumpResult<()> {
        let args = bump_args(version);
        debug!(program = %self.program, ?args, "bumping version");

        let output = Command::new(&self.program)
            .args(&args)
            .current_dir(self.root.as_std_path())
            .output()
            .map_err(|source| BumpError::Exec {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(BumpError::ToolFailed {
                version: version.to_string(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        debug!(%version, "version bumped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bump_args_leave_git_alone() {
        let args = bump_args("1.0.0");
        assert_eq!(args[0], "version");
        assert_eq!(args[1], "1.0.0");
        assert!(args.contains(&"--no-git-tag-version".to_string()));
        assert!(!args.contains(&"-m".to_string()));
    }

    #[test]
    fn missing_program_is_exec_error() {
        let bumper = VersionBumper::new(".").with_program("definitely-not-npm-here");
        assert!(matches!(
            bumper.bump("1.0.0"),
            Err(BumpError::Exec { .. })
        ));
    }
}

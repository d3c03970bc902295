//! Artifact upload through `mvn deploy:deploy-file`.

use std::process::{Command, Stdio};

use camino::Utf8PathBuf;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::options::ReleaseOptions;

/// Maven goal used for uploads.
pub const DEPLOY_GOAL: &str = "deploy:deploy-file";

/// Errors from deployment.
#[derive(Error, Debug)]
pub enum DeployError {
    /// The Maven executable could not be spawned.
    #[error("failed to run {program}: {source}")]
    Exec {
        /// Program that could not be spawned.
        program: String,
        /// Spawn error.
        source: std::io::Error,
    },

    /// Maven exited unsuccessfully.
    #[error("{program} exited with {}", describe_code(*.code))]
    ToolFailed {
        /// Program that failed.
        program: String,
        /// Exit code, if the process exited normally.
        code: Option<i32>,
    },
}

/// Result alias for deployment.
pub type DeployResult<T> = Result<T, DeployError>;

fn describe_code(code: Option<i32>) -> String {
    code.map_or_else(|| "a signal".to_string(), |c| format!("status {c}"))
}

/// Build the full `mvn` argument list for `options`.
///
/// The order is fixed; identical options always give identical arguments.
pub fn deploy_args(options: &ReleaseOptions) -> Vec<String> {
    let mut args = vec![
        DEPLOY_GOAL.to_string(),
        format!("-Dfile={}", options.file),
        format!("-DgroupId={}", options.group_id),
        format!("-DartifactId={}", options.artifact_id),
        format!("-Dpackaging={}", options.extension),
        format!("-Dversion={}", options.version),
    ];

    if options.unsecure {
        args.push("-Dmaven.wagon.http.ssl.insecure=true".to_string());
        args.push("-Dmaven.wagon.http.ssl.allowall=true".to_string());
    }

    if let Some(classifier) = &options.classifier {
        args.push(format!("-Dclassifier={classifier}"));
    }

    if options.unique_version_enabled() {
        args.push("-DuniqueVersion=true".to_string());
    }

    args.push(format!("-Durl={}", options.url));

    if let Some(id) = non_empty(options.repository_id.as_deref()) {
        args.push(format!("-DrepositoryId={id}"));
    }

    // Maven takes the settings path glued to the flag.
    if let Some(settings) = non_empty(options.settings_xml.as_deref()) {
        args.push(format!("-s{settings}"));
    }

    args.extend(options.optional_params.iter().cloned());

    if options.debug {
        args.push("-e".to_string());
        args.push("-X".to_string());
    }

    args
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Runs Maven uploads from a project root.
#[derive(Debug, Clone)]
pub struct Deployer {
    program: String,
    root: Utf8PathBuf,
}

impl Deployer {
    /// Run `mvn` inside `root`.
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            program: "mvn".to_string(),
            root: root.into(),
        }
    }

    /// Use a different Maven executable.
    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Run Maven with `args`.
    ///
    /// Output streams straight to the terminal so the user sees Maven's own
    /// progress and errors.
    #[instrument(skip_all, fields(root = %self.root, program = %self.program))]
    pub fn deploy(&self, args: &[String]) -> DeployResult<()> {
        debug!(?args, "running deploy");

        let status = Command::new(&self.program)
            .args(args)
            .current_dir(self.root.as_std_path())
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|source| DeployError::Exec {
                program: self.program.clone(),
                source,
            })?;

        if !status.success() {
            return Err(DeployError::ToolFailed {
                program: self.program.clone(),
                code: status.code(),
            });
        }

        info!(
            file = property(args, "file").unwrap_or_default(),
            url = property(args, "url").unwrap_or_default(),
            "artifact deployed"
        );
        Ok(())
    }
}

/// Value of the `-D<name>=` property in a deploy argument list.
pub fn property<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    let prefix = format!("-D{name}=");
    args.iter().find_map(|arg| arg.strip_prefix(prefix.as_str()))
}

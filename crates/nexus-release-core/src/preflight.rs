//! Preflight checks for release readiness.
//!
//! Validates the git state, the version file, option resolution, and tool
//! availability before a release. Returns structured results that the CLI
//! formats. Nothing here changes the repository.

use camino::Utf8Path;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::config::Config;
use crate::git::Git;
use crate::metadata::{DEFAULT_VERSION_FILE, PackageMetadata};
use crate::options::{self, ReleaseOptions};

/// A single preflight check result.
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    /// Human-readable name of the check.
    pub name: String,
    /// Whether the check passed.
    pub passed: bool,
    /// Description of the result (reason for failure, or confirmation).
    pub message: String,
}

impl CheckResult {
    fn pass(name: &str, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            message: message.into(),
        }
    }

    fn fail(name: &str, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: false,
            message: message.into(),
        }
    }
}

/// Full preflight report.
#[derive(Debug, Clone, Serialize)]
pub struct PreflightReport {
    /// Individual check results.
    pub checks: Vec<CheckResult>,
    /// Whether all checks passed.
    pub all_passed: bool,
    /// Resolved options, when resolution succeeded.
    pub options: Option<ReleaseOptions>,
}

/// Run all preflight checks for `target`.
#[instrument(skip(config), fields(root = %project_root))]
pub fn run_preflight(
    project_root: &Utf8Path,
    config: &Config,
    target: Option<&str>,
) -> PreflightReport {
    let mut checks = Vec::new();
    let git = Git::new(project_root).with_program(config.git_program());

    // Git checks only make sense inside a repository.
    let in_repo = check_git_repo(&git);
    let is_repo = in_repo.passed;
    checks.push(in_repo);
    if is_repo {
        checks.push(check_clean_tree(&git));
    }

    let (check, options) = check_options(project_root, config, target);
    checks.push(check);

    checks.push(check_required_tools(config));

    let all_passed = checks.iter().all(|c| c.passed);
    debug!(all_passed, check_count = checks.len(), "preflight complete");

    PreflightReport {
        checks,
        all_passed,
        options,
    }
}

fn check_git_repo(git: &Git) -> CheckResult {
    const NAME: &str = "Git repository";
    match git.is_inside_repo() {
        Ok(true) => match git.current_branch() {
            Ok(Some(branch)) => {
                CheckResult::pass(NAME, format!("Inside a git repository on branch {branch}"))
            }
            // Detached HEAD or no commits yet; push targets are the operator's call.
            _ => CheckResult::pass(NAME, "Inside a git repository"),
        },
        Ok(false) => CheckResult::fail(NAME, "Not inside a git repository"),
        Err(e) => CheckResult::fail(NAME, format!("Failed to check: {e}")),
    }
}

fn check_clean_tree(git: &Git) -> CheckResult {
    const NAME: &str = "Working tree";
    match git.is_clean() {
        Ok(true) => CheckResult::pass(NAME, "Clean working tree"),
        Ok(false) => CheckResult::fail(NAME, "Uncommitted changes in working tree"),
        Err(e) => CheckResult::fail(NAME, format!("Failed to check: {e}")),
    }
}

fn check_options(
    project_root: &Utf8Path,
    config: &Config,
    target: Option<&str>,
) -> (CheckResult, Option<ReleaseOptions>) {
    const NAME: &str = "Release options";

    let settings = match config.settings_for(target) {
        Ok(s) => s,
        Err(e) => return (CheckResult::fail(NAME, e.to_string()), None),
    };

    let version_file = settings
        .version_file
        .as_deref()
        .unwrap_or(Utf8Path::new(DEFAULT_VERSION_FILE));
    let metadata = match PackageMetadata::load(&project_root.join(version_file)) {
        Ok(m) => m,
        Err(e) => return (CheckResult::fail(NAME, e.to_string()), None),
    };

    match options::resolve(&settings, &metadata, None) {
        Ok(opts) => {
            let message = format!(
                "Releasing {} {} as {}",
                opts.artifact_id, opts.version, opts.file
            );
            (CheckResult::pass(NAME, message), Some(opts))
        }
        Err(e) => (CheckResult::fail(NAME, e.to_string()), None),
    }
}

fn check_required_tools(config: &Config) -> CheckResult {
    const NAME: &str = "Required tools";
    let missing: Vec<&str> = [
        config.git_program(),
        config.npm_program(),
        config.mvn_program(),
    ]
    .into_iter()
    .filter(|bin| which::which(bin).is_err())
    .collect();

    if missing.is_empty() {
        CheckResult::pass(NAME, "All required tools are installed")
    } else {
        CheckResult::fail(NAME, format!("Missing tools: {}", missing.join(", ")))
    }
}

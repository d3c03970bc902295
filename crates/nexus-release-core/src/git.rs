//! Git operations for the release workflow.
//!
//! Shells out to `git` for all operations. This ensures we inherit the user's
//! SSH keys, GPG signing, hooks, and other configuration.

use std::process::Command;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Errors from git operations.
#[derive(Error, Debug)]
pub enum GitError {
    /// Failed to execute the `git` command.
    #[error("failed to run {program}: {source}")]
    Exec {
        /// Program that could not be spawned.
        program: String,
        /// Spawn error.
        source: std::io::Error,
    },

    /// `git` returned a non-zero exit code.
    #[error("git {command} failed: {stderr}")]
    Command {
        /// The git subcommand that failed (e.g., "status").
        command: String,
        /// Exit code, if the process exited normally.
        code: Option<i32>,
        /// Captured stderr.
        stderr: String,
    },

    /// The working tree has uncommitted changes.
    #[error("uncommitted changes in working tree:\n{changes}")]
    DirtyWorkingTree {
        /// `git status --porcelain` output.
        changes: String,
    },
}

/// Result alias for git operations.
pub type GitResult<T> = Result<T, GitError>;

/// A git executable bound to a working directory.
#[derive(Debug, Clone)]
pub struct Git {
    program: String,
    root: Utf8PathBuf,
}

impl Git {
    /// Run `git` inside `root`.
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            program: "git".to_string(),
            root: root.into(),
        }
    }

    /// Use a different git executable.
    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Working directory the commands run in.
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Fail unless the working tree has no uncommitted changes.
    ///
    /// A zero exit status is not enough: any `status --porcelain` output
    /// counts as dirty.
    #[instrument(skip(self), fields(root = %self.root))]
    pub fn ensure_clean(&self) -> GitResult<()> {
        let output = self.run(&["status", "--porcelain"])?;
        let changes = output.trim_end();
        if changes.is_empty() {
            debug!("working tree clean");
            Ok(())
        } else {
            warn!(%changes, "uncommitted changes");
            Err(GitError::DirtyWorkingTree {
                changes: changes.to_string(),
            })
        }
    }

    /// Whether the working tree has no uncommitted changes.
    pub fn is_clean(&self) -> GitResult<bool> {
        match self.ensure_clean() {
            Ok(()) => Ok(true),
            Err(GitError::DirtyWorkingTree { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Stage all tracked changes and commit them with `message`.
    #[instrument(skip(self), fields(root = %self.root))]
    pub fn commit_all(&self, message: &str) -> GitResult<()> {
        self.run(&["commit", "-a", "-m", message])?;
        debug!("committed");
        Ok(())
    }

    /// Create an annotated tag.
    #[instrument(skip(self), fields(root = %self.root))]
    pub fn tag_annotated(&self, name: &str, message: &str) -> GitResult<()> {
        self.run(&["tag", "-a", name, "-m", message])?;
        debug!("tagged");
        Ok(())
    }

    /// Push the current branch to its upstream.
    ///
    /// Tags only travel along when `follow_tags` is set.
    #[instrument(skip(self), fields(root = %self.root))]
    pub fn push(&self, follow_tags: bool) -> GitResult<()> {
        if follow_tags {
            self.run(&["push", "--follow-tags"])?;
        } else {
            self.run(&["push"])?;
        }
        debug!("pushed");
        Ok(())
    }

    /// Get the current branch name. `None` in a detached HEAD state.
    #[instrument(skip(self))]
    pub fn current_branch(&self) -> GitResult<Option<String>> {
        let output = self.run(&["rev-parse", "--abbrev-ref", "HEAD"])?;
        let branch = output.trim().to_string();
        if branch == "HEAD" {
            Ok(None)
        } else {
            Ok(Some(branch))
        }
    }

    /// Check if the working directory is inside a git repository.
    #[instrument(skip(self))]
    pub fn is_inside_repo(&self) -> GitResult<bool> {
        match self.run(&["rev-parse", "--is-inside-work-tree"]) {
            Ok(output) => Ok(output.trim() == "true"),
            Err(GitError::Command { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Run a git command and return its stdout.
    fn run(&self, args: &[&str]) -> GitResult<String> {
        debug!(program = %self.program, ?args, "running git");
        let output = Command::new(&self.program)
            .args(args)
            .current_dir(self.root.as_std_path())
            .output()
            .map_err(|source| GitError::Exec {
                program: self.program.clone(),
                source,
            })?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).to_string())
        } else {
            Err(GitError::Command {
                command: args.first().unwrap_or(&"").to_string(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

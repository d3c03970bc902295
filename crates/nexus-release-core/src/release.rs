//! Release orchestrator.
//!
//! # Two-phase workflow
//!
//! 1. **Plan** ([`plan_release`] / [`ReleasePlan::new`]): resolve options once
//!    and lay out the fixed step list. Every step argument (versions, commit
//!    messages, tag name, deploy arguments) is captured here.
//! 2. **Execute** ([`ReleasePlan::execute`]): run the steps strictly in order
//!    through a [`ReleaseTools`] implementation, stopping at the first
//!    failure.
//!
//! Nothing is rolled back. When a step fails, the error lists the steps that
//! already completed so the operator knows what to clean up by hand.

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, instrument};

use crate::bump::{BumpError, BumpResult, VersionBumper};
use crate::config::Config;
use crate::deploy::{self, DeployError, DeployResult, Deployer};
use crate::error::ConfigError;
use crate::git::{Git, GitError, GitResult};
use crate::metadata::{DEFAULT_VERSION_FILE, MetadataError, PackageMetadata};
use crate::options::{self, OptionsError, ReleaseOptions};
use crate::package::{self, ArchiveSpec, PackageError, PackageResult};

/// Prefix on every commit and tag message the release creates.
pub const MESSAGE_PREFIX: &str = "[nexus-release]";

/// Commit message for the post-release development version.
pub const NEXT_ITERATION_MESSAGE: &str = "[nexus-release] prepare for next development iteration";

/// Commit message for the release version.
pub fn release_commit_message(version: &str) -> String {
    format!("{MESSAGE_PREFIX} release {version}")
}

/// Apply the configured commit prefix template to `text`.
///
/// `%s` in the prefix stands for the message; a prefix without `%s` is
/// prepended as is.
pub fn commit_message(commit_prefix: &str, text: &str) -> String {
    if commit_prefix.contains("%s") {
        commit_prefix.replace("%s", text)
    } else {
        format!("{commit_prefix}{text}")
    }
}

/// Annotation for the release tag.
pub fn tag_message(tag: &str) -> String {
    format!("{MESSAGE_PREFIX} release tag {tag}")
}

// ──────────────────────────────────────────────
// Errors
// ──────────────────────────────────────────────

/// Failure of a single step.
#[derive(Error, Debug)]
pub enum StepError {
    /// Version-control failure, including a dirty working tree.
    #[error(transparent)]
    Git(#[from] GitError),

    /// Version file bump failure.
    #[error(transparent)]
    Bump(#[from] BumpError),

    /// Archive creation failure.
    #[error(transparent)]
    Package(#[from] PackageError),

    /// Upload failure.
    #[error(transparent)]
    Deploy(#[from] DeployError),
}

/// Errors from planning or running a release.
#[derive(Error, Debug)]
pub enum ReleaseError {
    /// Configuration could not be loaded or the target does not exist.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The version file could not be read.
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    /// Options did not resolve.
    #[error(transparent)]
    Options(#[from] OptionsError),

    /// A step failed; everything after it was skipped.
    #[error("step `{step}` failed after {} completed step(s)", .completed.len())]
    StepFailed {
        /// The failing step.
        step: Box<Step>,
        /// Steps that finished before the failure, in order.
        completed: Vec<Step>,
        /// What went wrong.
        #[source]
        source: StepError,
    },
}

/// Result alias for release operations.
pub type ReleaseResult<T> = Result<T, ReleaseError>;

// ──────────────────────────────────────────────
// Steps and events
// ──────────────────────────────────────────────

/// One step of the release, with its argument already captured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "step")]
pub enum Step {
    /// Require a clean working tree.
    CheckStatus,
    /// Rewrite the version file.
    BumpVersion {
        /// New version.
        version: String,
    },
    /// Commit all tracked changes.
    Commit {
        /// Commit message.
        message: String,
    },
    /// Create the annotated release tag.
    Tag {
        /// Tag name.
        name: String,
        /// Tag annotation.
        message: String,
    },
    /// Push the current branch.
    Push {
        /// Also push annotated tags reachable from the pushed commits.
        follow_tags: bool,
    },
    /// Build the release archive.
    Package {
        /// Archive description.
        archive: ArchiveSpec,
    },
    /// Upload the archive.
    Deploy {
        /// Repository URL, for display.
        url: String,
        /// Full deploy tool arguments.
        args: Vec<String>,
    },
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CheckStatus => write!(f, "check status"),
            Self::BumpVersion { version } => write!(f, "bump version to {version}"),
            Self::Commit { message } => write!(f, "commit \"{message}\""),
            Self::Tag { name, .. } => write!(f, "tag {name}"),
            Self::Push { follow_tags: true } => write!(f, "push (with tags)"),
            Self::Push { follow_tags: false } => write!(f, "push"),
            Self::Package { archive } => write!(f, "package {}", archive.file),
            Self::Deploy { url, .. } => write!(f, "deploy to {url}"),
        }
    }
}

/// Progress events emitted while executing.
#[derive(Debug, Clone)]
pub enum ReleaseEvent {
    /// A step is about to run.
    StepStarted {
        /// Zero-based position in the plan.
        index: usize,
        /// Total number of steps.
        total: usize,
        /// The step.
        step: Step,
    },
    /// A step finished successfully.
    StepCompleted {
        /// Zero-based position in the plan.
        index: usize,
        /// The step.
        step: Step,
        /// What happened.
        message: String,
    },
}

/// A completed step and its result message.
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    /// The step.
    #[serde(flatten)]
    pub step: Step,
    /// What happened.
    pub message: String,
}

/// Outcome of a full release.
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseOutcome {
    /// Goal that ran.
    pub goal: String,
    /// Released version.
    pub version: String,
    /// Development version committed afterwards.
    pub next_version: String,
    /// Release tag.
    pub tag: String,
    /// Archive that was deployed.
    pub file: Utf8PathBuf,
    /// Repository URL.
    pub url: String,
    /// Every step in execution order.
    pub steps: Vec<StepRecord>,
}

// ──────────────────────────────────────────────
// Tools
// ──────────────────────────────────────────────

/// Executors behind the release steps.
///
/// Each call must finish, including any process it spawns, before returning.
pub trait ReleaseTools {
    /// Fail unless the working tree is clean.
    fn check_status(&mut self) -> GitResult<()>;
    /// Rewrite the version file to `version`.
    fn bump_version(&mut self, version: &str) -> BumpResult<()>;
    /// Commit all tracked changes.
    fn commit(&mut self, message: &str) -> GitResult<()>;
    /// Create an annotated tag.
    fn tag(&mut self, name: &str, message: &str) -> GitResult<()>;
    /// Push the current branch.
    fn push(&mut self, follow_tags: bool) -> GitResult<()>;
    /// Build the archive and return where it was written.
    fn package(&mut self, archive: &ArchiveSpec) -> PackageResult<Utf8PathBuf>;
    /// Upload with the given deploy arguments.
    fn deploy(&mut self, args: &[String]) -> DeployResult<()>;
}

/// [`ReleaseTools`] backed by the real `git`, `npm` and `mvn` executables.
#[derive(Debug, Clone)]
pub struct SystemTools {
    root: Utf8PathBuf,
    git: Git,
    bumper: VersionBumper,
    deployer: Deployer,
}

impl SystemTools {
    /// Tools running in `root`, with program names from `config`.
    pub fn new(root: &Utf8Path, config: &Config) -> Self {
        Self {
            root: root.to_path_buf(),
            git: Git::new(root).with_program(config.git_program()),
            bumper: VersionBumper::new(root).with_program(config.npm_program()),
            deployer: Deployer::new(root).with_program(config.mvn_program()),
        }
    }
}

impl ReleaseTools for SystemTools {
    fn check_status(&mut self) -> GitResult<()> {
        self.git.ensure_clean()
    }

    fn bump_version(&mut self, version: &str) -> BumpResult<()> {
        self.bumper.bump(version)
    }

    fn commit(&mut self, message: &str) -> GitResult<()> {
        self.git.commit_all(message)
    }

    fn tag(&mut self, name: &str, message: &str) -> GitResult<()> {
        self.git.tag_annotated(name, message)
    }

    fn push(&mut self, follow_tags: bool) -> GitResult<()> {
        self.git.push(follow_tags)
    }

    fn package(&mut self, archive: &ArchiveSpec) -> PackageResult<Utf8PathBuf> {
        package::build_archive(&self.root, archive)
    }

    fn deploy(&mut self, args: &[String]) -> DeployResult<()> {
        self.deployer.deploy(args)
    }
}

// ──────────────────────────────────────────────
// Plan
// ──────────────────────────────────────────────

/// Resolved options and the step list built from them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleasePlan {
    /// Options every step reads from.
    pub options: ReleaseOptions,
    /// Steps in execution order.
    pub steps: Vec<Step>,
}

impl ReleasePlan {
    /// Lay out the fixed step sequence for `options`.
    pub fn new(options: ReleaseOptions) -> Self {
        let version = options.version.to_string();
        let tag = options.tag_name();
        let prefix = options.commit_prefix.as_str();
        let follow_tags = options.push_tags;

        let steps = vec![
            Step::CheckStatus,
            Step::BumpVersion {
                version: version.clone(),
            },
            Step::Commit {
                message: commit_message(prefix, &release_commit_message(&version)),
            },
            Step::Tag {
                message: tag_message(&tag),
                name: tag,
            },
            Step::Push { follow_tags },
            Step::Package {
                archive: ArchiveSpec {
                    file: options.file.clone(),
                    files: options.files.clone(),
                },
            },
            Step::Deploy {
                url: options.url.clone(),
                args: deploy::deploy_args(&options),
            },
            Step::BumpVersion {
                version: options.next_version.clone(),
            },
            Step::Commit {
                message: commit_message(prefix, NEXT_ITERATION_MESSAGE),
            },
            Step::Push { follow_tags },
        ];

        debug!(count = steps.len(), "release plan built");
        Self { options, steps }
    }

    /// Run every step in order, stopping at the first failure.
    ///
    /// Calls `on_event` around each step so the caller can show progress.
    #[instrument(skip_all, fields(
        goal = %self.options.goal,
        version = %self.options.version,
    ))]
    pub fn execute<T: ReleaseTools>(
        &self,
        tools: &mut T,
        mut on_event: impl FnMut(ReleaseEvent),
    ) -> ReleaseResult<ReleaseOutcome> {
        let total = self.steps.len();
        let mut records: Vec<StepRecord> = Vec::with_capacity(total);
        let mut file = self.options.file.clone();

        for (index, step) in self.steps.iter().enumerate() {
            on_event(ReleaseEvent::StepStarted {
                index,
                total,
                step: step.clone(),
            });
            info!(step = %step, "running step");

            let message = match run_step(tools, step) {
                Ok(StepOutput::Message(message)) => message,
                Ok(StepOutput::Archive(path)) => {
                    let message = format!("created {path}");
                    file = path;
                    message
                }
                Err(source) => {
                    error!(step = %step, error = %source, completed = records.len(), "step failed");
                    return Err(ReleaseError::StepFailed {
                        step: Box::new(step.clone()),
                        completed: records.into_iter().map(|r| r.step).collect(),
                        source,
                    });
                }
            };

            on_event(ReleaseEvent::StepCompleted {
                index,
                step: step.clone(),
                message: message.clone(),
            });
            records.push(StepRecord {
                step: step.clone(),
                message,
            });
        }

        info!(
            tag = %self.options.tag_name(),
            file = %file,
            url = %self.options.url,
            "release complete"
        );

        Ok(ReleaseOutcome {
            goal: self.options.goal.clone(),
            version: self.options.version.to_string(),
            next_version: self.options.next_version.clone(),
            tag: self.options.tag_name(),
            file,
            url: self.options.url.clone(),
            steps: records,
        })
    }
}

enum StepOutput {
    Message(String),
    Archive(Utf8PathBuf),
}

fn run_step<T: ReleaseTools>(tools: &mut T, step: &Step) -> Result<StepOutput, StepError> {
    let message = match step {
        Step::CheckStatus => {
            tools.check_status()?;
            "working tree clean".to_string()
        }
        Step::BumpVersion { version } => {
            tools.bump_version(version)?;
            format!("version set to {version}")
        }
        Step::Commit { message } => {
            tools.commit(message)?;
            format!("committed \"{message}\"")
        }
        Step::Tag { name, message } => {
            tools.tag(name, message)?;
            format!("tagged {name}")
        }
        Step::Push { follow_tags } => {
            tools.push(*follow_tags)?;
            if *follow_tags {
                "pushed branch and tags".to_string()
            } else {
                "pushed branch".to_string()
            }
        }
        Step::Package { archive } => {
            return Ok(StepOutput::Archive(tools.package(archive)?));
        }
        Step::Deploy { url, args } => {
            tools.deploy(args)?;
            format!("deployed to {url}")
        }
    };
    Ok(StepOutput::Message(message))
}

/// Load settings for `target`, read the version file under `root`, and
/// resolve them into a plan.
#[instrument(skip(config), fields(%root))]
pub fn plan_release(
    root: &Utf8Path,
    config: &Config,
    target: Option<&str>,
    explicit_version: Option<&str>,
) -> ReleaseResult<ReleasePlan> {
    let settings = config.settings_for(target)?;
    let version_file = settings
        .version_file
        .clone()
        .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_VERSION_FILE));
    let metadata = PackageMetadata::load(&root.join(version_file))?;
    let options = options::resolve(&settings, &metadata, explicit_version)?;
    Ok(ReleasePlan::new(options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReleaseSettings;
    use crate::mapping::FileMapping;

    /// Records every call and fails on request.
    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
        dirty: bool,
        fail_deploy: bool,
    }

    impl ReleaseTools for Recorder {
        fn check_status(&mut self) -> GitResult<()> {
            self.calls.push("status".into());
            if self.dirty {
                Err(GitError::DirtyWorkingTree {
                    changes: " M package.json".into(),
                })
            } else {
                Ok(())
            }
        }

        fn bump_version(&mut self, version: &str) -> BumpResult<()> {
            self.calls.push(format!("bump {version}"));
            Ok(())
        }

        fn commit(&mut self, message: &str) -> GitResult<()> {
            self.calls.push(format!("commit {message}"));
            Ok(())
        }

        fn tag(&mut self, name: &str, _message: &str) -> GitResult<()> {
            self.calls.push(format!("tag {name}"));
            Ok(())
        }

        fn push(&mut self, follow_tags: bool) -> GitResult<()> {
            self.calls.push(format!("push {follow_tags}"));
            Ok(())
        }

        fn package(&mut self, archive: &ArchiveSpec) -> PackageResult<Utf8PathBuf> {
            self.calls.push(format!("package {}", archive.file));
            Ok(Utf8PathBuf::from("/work").join(&archive.file))
        }

        fn deploy(&mut self, args: &[String]) -> DeployResult<()> {
            self.calls.push(format!("deploy {}", args.len()));
            if self.fail_deploy {
                Err(DeployError::ToolFailed {
                    program: "mvn".into(),
                    code: Some(1),
                })
            } else {
                Ok(())
            }
        }
    }

    fn options() -> ReleaseOptions {
        let raw = ReleaseSettings {
            group_id: Some("com.x".into()),
            url: Some("http://nexus/repo".into()),
            files: Some(vec![FileMapping::new(["dist/**"])]),
            ..ReleaseSettings::default()
        };
        let meta = PackageMetadata {
            name: Some("widget".into()),
            version: Some("1.0.0-SNAPSHOT".into()),
            packaging: None,
        };
        options::resolve(&raw, &meta, None).unwrap()
    }

    #[test]
    fn steps_follow_fixed_order() {
        let plan = ReleasePlan::new(options());
        let names: Vec<String> = plan.steps.iter().map(ToString::to_string).collect();
        assert_eq!(
            names,
            vec![
                "check status",
                "bump version to 1.0.0",
                "commit \"[nexus-release] release 1.0.0\"",
                "tag widget-1.0.0",
                "push",
                "package widget-1.0.0.zip",
                "deploy to http://nexus/repo",
                "bump version to 1.0.1-SNAPSHOT",
                "commit \"[nexus-release] prepare for next development iteration\"",
                "push",
            ]
        );
    }

    #[test]
    fn end_to_end_runs_every_step() {
        let plan = ReleasePlan::new(options());
        let mut tools = Recorder::default();
        let mut started = 0;

        let outcome = plan
            .execute(&mut tools, |event| {
                if matches!(event, ReleaseEvent::StepStarted { .. }) {
                    started += 1;
                }
            })
            .unwrap();

        assert_eq!(started, 10);
        assert_eq!(
            tools.calls,
            vec![
                "status",
                "bump 1.0.0",
                "commit [nexus-release] release 1.0.0",
                "tag widget-1.0.0",
                "push false",
                "package widget-1.0.0.zip",
                "deploy 7",
                "bump 1.0.1-SNAPSHOT",
                "commit [nexus-release] prepare for next development iteration",
                "push false",
            ]
        );
        assert_eq!(outcome.version, "1.0.0");
        assert_eq!(outcome.next_version, "1.0.1-SNAPSHOT");
        assert_eq!(outcome.tag, "widget-1.0.0");
        assert_eq!(outcome.file, Utf8PathBuf::from("/work/widget-1.0.0.zip"));
        assert_eq!(outcome.steps.len(), 10);
    }

    #[test]
    fn deploy_step_carries_release_version() {
        let plan = ReleasePlan::new(options());
        let args = plan
            .steps
            .iter()
            .find_map(|s| match s {
                Step::Deploy { args, .. } => Some(args.clone()),
                _ => None,
            })
            .unwrap();
        assert!(args.contains(&"-Dversion=1.0.0".to_string()));
    }

    #[test]
    fn dirty_tree_stops_before_any_side_effect() {
        let plan = ReleasePlan::new(options());
        let mut tools = Recorder {
            dirty: true,
            ..Recorder::default()
        };

        let err = plan.execute(&mut tools, |_| {}).unwrap_err();
        assert_eq!(tools.calls, vec!["status"]);
        match err {
            ReleaseError::StepFailed {
                step,
                completed,
                source,
            } => {
                assert_eq!(*step, Step::CheckStatus);
                assert!(completed.is_empty());
                assert!(matches!(
                    source,
                    StepError::Git(GitError::DirtyWorkingTree { .. })
                ));
            }
            other => panic!("expected StepFailed, got {other:?}"),
        }
    }

    #[test]
    fn deploy_failure_reports_completed_steps() {
        let plan = ReleasePlan::new(options());
        let mut tools = Recorder {
            fail_deploy: true,
            ..Recorder::default()
        };

        let err = plan.execute(&mut tools, |_| {}).unwrap_err();
        assert_eq!(tools.calls.len(), 7);
        assert!(tools.calls.last().unwrap().starts_with("deploy"));
        match err {
            ReleaseError::StepFailed { completed, .. } => {
                assert_eq!(completed.len(), 6);
                assert_eq!(completed[0], Step::CheckStatus);
            }
            other => panic!("expected StepFailed, got {other:?}"),
        }
    }

    #[test]
    fn push_tags_applies_to_both_pushes() {
        let mut opts = options();
        opts.push_tags = true;
        let plan = ReleasePlan::new(opts);
        let pushes: Vec<&Step> = plan
            .steps
            .iter()
            .filter(|s| matches!(s, Step::Push { .. }))
            .collect();
        assert_eq!(pushes.len(), 2);
        assert!(
            pushes
                .iter()
                .all(|s| **s == Step::Push { follow_tags: true })
        );
    }

    #[test]
    fn commit_prefix_wraps_both_commits() {
        let mut opts = options();
        opts.commit_prefix = "[ci skip] %s".into();
        let plan = ReleasePlan::new(opts);
        let commits: Vec<&str> = plan
            .steps
            .iter()
            .filter_map(|s| match s {
                Step::Commit { message } => Some(message.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(
            commits,
            vec![
                "[ci skip] [nexus-release] release 1.0.0",
                "[ci skip] [nexus-release] prepare for next development iteration",
            ]
        );
    }

    #[test]
    fn commit_message_without_placeholder_prepends() {
        assert_eq!(commit_message("%s", "release"), "release");
        assert_eq!(commit_message("chore: ", "release"), "chore: release");
    }

    #[test]
    fn identical_options_give_identical_plans() {
        assert_eq!(ReleasePlan::new(options()), ReleasePlan::new(options()));
    }

    #[test]
    fn plan_serializes_with_step_tags() {
        let plan = ReleasePlan::new(options());
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["steps"][0]["step"], "check_status");
        assert_eq!(json["steps"][3]["name"], "widget-1.0.0");
        assert_eq!(json["options"]["next_version"], "1.0.1-SNAPSHOT");
    }

    #[test]
    fn plan_release_reads_version_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        std::fs::write(
            root.join("package.json"),
            r#"{"name": "widget", "version": "2.3.0-SNAPSHOT"}"#,
        )
        .unwrap();
        let config = Config {
            release: ReleaseSettings {
                group_id: Some("com.x".into()),
                url: Some("http://nexus/repo".into()),
                ..ReleaseSettings::default()
            },
            ..Config::default()
        };

        let plan = plan_release(&root, &config, None, None).unwrap();
        assert_eq!(plan.options.version.to_string(), "2.3.0");
        assert_eq!(plan.options.next_version, "2.3.1-SNAPSHOT");
    }

    #[test]
    fn plan_release_without_version_file_fails() {
        let tmp = tempfile::TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        let err = plan_release(&root, &Config::default(), None, None).unwrap_err();
        assert!(matches!(err, ReleaseError::Metadata(_)));
    }
}

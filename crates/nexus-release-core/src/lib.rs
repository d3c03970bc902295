//! Core library for nexus-release.
//!
//! This crate provides the release workflow used by the `nexus-release` CLI:
//! option resolution, version arithmetic, archive packaging, and the ordered
//! git / bump / deploy steps.
//!
//! # Modules
//!
//! - [`artifact`] - Artifact extension and file name resolution
//! - [`bump`] - Version file bumps via `npm version`
//! - [`config`] - Configuration loading and management
//! - [`deploy`] - Maven `deploy:deploy-file` invocation
//! - [`error`] - Configuration error types and result aliases
//! - [`git`] - Git operations for the release workflow
//! - [`mapping`] - File mappings and destination folder injection
//! - [`metadata`] - Version file parsing
//! - [`options`] - Resolution of raw settings into release options
//! - [`package`] - Release archive creation
//! - [`preflight`] - Release readiness checks
//! - [`release`] - The release plan and its sequential executor
//! - [`version`] - Release and development version computation
//!
//! # Quick Start
//!
//! ```no_run
//! use camino::Utf8Path;
//! use nexus_release_core::ConfigLoader;
//! use nexus_release_core::release::{SystemTools, plan_release};
//!
//! let root = Utf8Path::new(".");
//! let config = ConfigLoader::new()
//!     .with_project_search(root)
//!     .load()
//!     .expect("Failed to load configuration");
//!
//! let plan = plan_release(root, &config, None, None).expect("options did not resolve");
//! let mut tools = SystemTools::new(root, &config);
//! let outcome = plan.execute(&mut tools, |_| {}).expect("release failed");
//! println!("released {}", outcome.tag);
//! ```
#![deny(unsafe_code)]

pub mod artifact;

pub mod bump;

pub mod config;

pub mod deploy;

pub mod error;

pub mod git;

pub mod mapping;

pub mod metadata;

pub mod options;

pub mod package;

pub mod preflight;

pub mod release;

pub mod version;

pub use config::{Config, ConfigLoader, LogLevel};

pub use error::{ConfigError, ConfigResult};

pub use options::ReleaseOptions;

pub use release::{ReleaseError, ReleasePlan};

// Re-export semver so downstream crates don't need a direct dependency.
pub use semver;

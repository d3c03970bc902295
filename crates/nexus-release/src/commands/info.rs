//! Info command: show the resolved release options without running anything.

use anyhow::Context;
use clap::Args;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

use nexus_release_core::ReleaseOptions;
use nexus_release_core::config::{self, Config};
use nexus_release_core::release;

/// Arguments for the `info` subcommand.
#[derive(Args, Debug, Default)]
pub struct InfoArgs {
    /// Named target to resolve instead of the base `[release]` options
    pub target: Option<String>,

    /// Resolve as if releasing this version
    #[arg(long, value_name = "VERSION")]
    pub version: Option<String>,
}

#[derive(Serialize)]
struct ConfigInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    config_file: Option<String>,
    log_level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    log_dir: Option<String>,
    targets: Vec<String>,
}

impl ConfigInfo {
    fn from_config(config: &Config, cwd: &camino::Utf8Path) -> Self {
        Self {
            config_file: config::find_project_config(cwd).map(|p| p.to_string()),
            log_level: config.log_level.as_str().to_string(),
            log_dir: config.log_dir.as_ref().map(|p| p.to_string()),
            targets: config.targets.keys().cloned().collect(),
        }
    }
}

#[derive(Serialize)]
struct FullInfo {
    name: &'static str,
    version: &'static str,
    config: ConfigInfo,
    options: ReleaseOptions,
}

/// Print the options a release would run with.
#[instrument(name = "cmd_info", skip_all, fields(target = ?args.target))]
pub fn cmd_info(
    args: InfoArgs,
    global_json: bool,
    config: &Config,
    cwd: &camino::Utf8Path,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, "executing info command");

    let plan = release::plan_release(cwd, config, args.target.as_deref(), args.version.as_deref())
        .context("failed to resolve release options")?;

    let info = FullInfo {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        config: ConfigInfo::from_config(config, cwd),
        options: plan.options,
    };

    if global_json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("{} {}", info.name.bold(), info.version.green());
    println!();

    println!("{}", "Configuration".bold().underline());
    match info.config.config_file {
        Some(ref path) => println!("  {}: {}", "Config file".dimmed(), path.cyan()),
        None => println!("  {}: {}", "Config file".dimmed(), "none found".yellow()),
    }
    println!("  {}: {}", "Log level".dimmed(), info.config.log_level);
    if !info.config.targets.is_empty() {
        println!(
            "  {}: {}",
            "Targets".dimmed(),
            info.config.targets.join(", ")
        );
    }
    println!();

    println!("{}", "Release options".bold().underline());
    super::print_options(&info.options);
    if !info.options.files.is_empty() {
        println!("  {}", "Files:".dimmed());
        for mapping in &info.options.files {
            println!(
                "    {} → {}",
                mapping.src.join(", "),
                mapping.dest.as_deref().unwrap_or(".").cyan()
            );
        }
    }

    Ok(())
}

//! Doctor command: diagnose configuration and environment.

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use inquire::Confirm;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

use nexus_release_core::config::{self, Config, ConfigLoader};

/// Arguments for the `doctor` subcommand.
#[derive(Args, Debug, Default)]
pub struct DoctorArgs {
    // No subcommand-specific arguments; uses global --json flag
}

#[derive(Serialize)]
struct DoctorReport {
    directories: DirectoryPaths,
    config: ConfigStatus,
    tools: Vec<ToolStatus>,
    environment: EnvironmentInfo,
}

#[derive(Serialize)]
struct DirectoryPaths {
    config: Option<String>,
    cache: Option<String>,
    data_local: Option<String>,
}

#[derive(Serialize)]
struct ConfigStatus {
    /// Path to the discovered project config file, if any
    file: Option<String>,
    found: bool,
}

#[derive(Serialize)]
struct ToolStatus {
    name: String,
    /// Resolved executable path, `None` when not on PATH
    path: Option<String>,
}

#[derive(Serialize)]
struct EnvironmentInfo {
    cwd: String,
    env_vars: Vec<EnvVar>,
}

#[derive(Serialize)]
struct EnvVar {
    name: &'static str,
    value: Option<String>,
    description: &'static str,
}

const WATCHED_VARS: &[(&str, &str)] = &[
    ("XDG_CONFIG_HOME", "Override config directory"),
    ("XDG_CACHE_HOME", "Override cache directory"),
    ("RUST_LOG", "Log filter directive"),
    ("NEXUS_RELEASE_LOG_PATH", "Explicit log file path"),
    ("NEXUS_RELEASE_LOG_DIR", "Log directory"),
    ("MAVEN_OPTS", "JVM options for the deploy tool"),
];

impl DoctorReport {
    fn gather(cwd: &camino::Utf8Path) -> Self {
        let config_file = config::find_project_config(cwd);
        // Tool overrides come from whatever config discovery finds here.
        let loaded = ConfigLoader::new()
            .with_project_search(cwd)
            .load()
            .unwrap_or_default();

        Self {
            directories: DirectoryPaths {
                config: config::user_config_dir().map(|p| p.to_string()),
                cache: config::user_cache_dir().map(|p| p.to_string()),
                data_local: config::user_data_local_dir().map(|p| p.to_string()),
            },
            config: ConfigStatus {
                found: config_file.is_some(),
                file: config_file.map(|p| p.to_string()),
            },
            tools: [
                loaded.git_program(),
                loaded.npm_program(),
                loaded.mvn_program(),
            ]
            .into_iter()
            .map(|name| ToolStatus {
                name: name.to_string(),
                path: which::which(name).ok().map(|p| p.display().to_string()),
            })
            .collect(),
            environment: EnvironmentInfo {
                cwd: cwd.to_string(),
                env_vars: WATCHED_VARS
                    .iter()
                    .map(|&(name, description)| EnvVar {
                        name,
                        value: std::env::var(name).ok(),
                        description,
                    })
                    .collect(),
            },
        }
    }
}

/// Run diagnostics and report configuration status.
#[instrument(name = "cmd_doctor", skip_all)]
pub fn cmd_doctor(
    _args: DoctorArgs,
    global_json: bool,
    cwd: &camino::Utf8Path,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, "executing doctor command");

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message("Gathering diagnostics...");
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    let report = DoctorReport::gather(cwd);
    spinner.finish_and_clear();

    if global_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", "Configuration".bold().underline());
    match report.config.file {
        Some(ref file) => println!("  {} Config file: {}", "✓".green(), file.cyan()),
        None => {
            println!("  {} No project config file found", "○".yellow());
            offer_config_creation(cwd)?;
        }
    }
    println!();

    println!("{}", "Tools".bold().underline());
    for tool in &report.tools {
        match tool.path {
            Some(ref path) => println!("  {} {}: {}", "✓".green(), tool.name, path.cyan()),
            None => println!("  {} {}: {}", "✗".red(), tool.name, "not on PATH".yellow()),
        }
    }
    println!();

    println!("{}", "Directories".bold().underline());
    print_dir("  Config", &report.directories.config);
    print_dir("  Cache", &report.directories.cache);
    print_dir("  Data (local)", &report.directories.data_local);
    println!();

    println!("{}", "Environment".bold().underline());
    println!("  {}: {}", "Working directory".dimmed(), cwd.cyan());
    let set_vars: Vec<_> = report
        .environment
        .env_vars
        .iter()
        .filter(|v| v.value.is_some())
        .collect();
    if set_vars.is_empty() {
        println!("  {} No overrides set", "○".dimmed());
    } else {
        for var in set_vars {
            println!(
                "  {}: {} {}",
                var.name.dimmed(),
                var.value.as_deref().unwrap_or("").cyan(),
                format!("({})", var.description).dimmed()
            );
        }
    }

    Ok(())
}

fn print_dir(label: &str, path: &Option<String>) {
    print!("{}: ", label.dimmed());
    match path {
        Some(p) => println!("{}", p.cyan()),
        None => println!("{}", "(unavailable)".yellow()),
    }
}

/// Offer to write a starter `.nexus-release.yaml` in the working directory.
fn offer_config_creation(cwd: &camino::Utf8Path) -> anyhow::Result<()> {
    if !std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        return Ok(());
    }

    let config_path = cwd.join(".nexus-release.yaml");
    let create = Confirm::new("Create a starter config file?")
        .with_default(false)
        .with_help_message(&format!("Will create {config_path}"))
        .prompt();

    if let Ok(true) = create {
        let yaml = serde_saphyr::to_string(&Config::default())?;
        std::fs::write(&config_path, yaml)?;
        println!("  {} Created {}", "✓".green(), config_path.cyan());
    }

    Ok(())
}

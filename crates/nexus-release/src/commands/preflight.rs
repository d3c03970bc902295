//! Preflight command: validate release readiness.

use clap::Args;
use owo_colors::OwoColorize;
use tracing::{debug, instrument};

use nexus_release_core::config::Config;
use nexus_release_core::preflight;

/// Arguments for the `preflight` subcommand.
#[derive(Args, Debug, Default)]
pub struct PreflightArgs {
    /// Named target to check instead of the base `[release]` options
    pub target: Option<String>,
}

/// Run preflight checks and display results.
#[instrument(name = "cmd_preflight", skip_all, fields(target = ?args.target))]
pub fn cmd_preflight(
    args: PreflightArgs,
    global_json: bool,
    config: &Config,
    cwd: &camino::Utf8Path,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, "executing preflight command");

    let report = preflight::run_preflight(cwd, config, args.target.as_deref());

    if global_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", "Preflight Checks".bold().underline());
        println!();

        for check in &report.checks {
            let icon = if check.passed {
                "✓".green().to_string()
            } else {
                "✗".red().to_string()
            };
            println!("  {icon} {}: {}", check.name.bold(), check.message);
        }

        println!();
        if report.all_passed {
            println!("  {}", "Ready to release!".green().bold());
        } else {
            let failed = report.checks.iter().filter(|c| !c.passed).count();
            println!(
                "  {}: fix issues above before releasing",
                format!("{failed} check(s) failed").red().bold(),
            );
        }
    }

    if report.all_passed {
        Ok(())
    } else {
        Err(anyhow::anyhow!("preflight checks failed"))
    }
}

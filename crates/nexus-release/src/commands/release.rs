//! Release command: thin CLI layer over `nexus_release_core::release`.

use anyhow::Context;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use inquire::Confirm;
use owo_colors::OwoColorize;
use tracing::{debug, instrument};

use nexus_release_core::config::Config;
use nexus_release_core::release::{
    self, ReleaseError, ReleaseEvent, ReleasePlan, Step, SystemTools,
};

/// Arguments for the `release` subcommand.
#[derive(Args, Debug, Default)]
pub struct ReleaseArgs {
    /// Named target from `[targets.<name>]` to layer over `[release]`
    pub target: Option<String>,

    /// Release this version instead of the version file's (e.g. "1.2.3")
    #[arg(long, value_name = "VERSION")]
    pub version: Option<String>,

    /// Print the plan without running any step
    #[arg(long)]
    pub dry_run: bool,

    /// Skip confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

/// Execute the release command.
#[instrument(name = "cmd_release", skip_all, fields(target = ?args.target))]
pub fn cmd_release(
    args: ReleaseArgs,
    global_json: bool,
    config: &Config,
    cwd: &camino::Utf8Path,
) -> anyhow::Result<()> {
    debug!(
        json_output = global_json,
        dry_run = args.dry_run,
        "executing release command"
    );

    let plan = release::plan_release(cwd, config, args.target.as_deref(), args.version.as_deref())
        .context("release planning failed")?;

    if args.dry_run {
        if global_json {
            println!("{}", serde_json::to_string_pretty(&plan)?);
        } else {
            print_plan(&plan, true);
        }
        return Ok(());
    }

    if !global_json {
        print_plan(&plan, false);

        let settings = config.settings_for(args.target.as_deref())?;
        if settings.confirm.unwrap_or(true) && !args.yes {
            let confirmed = Confirm::new("Proceed with release?")
                .with_default(true)
                .with_help_message("Nothing is rolled back if a step fails")
                .prompt()
                .context("confirmation prompt failed")?;
            if !confirmed {
                println!("{}", "Release cancelled.".yellow());
                return Ok(());
            }
            println!();
        }
    }

    let mut tools = SystemTools::new(cwd, config);
    let mut spinner: Option<ProgressBar> = None;
    let result = plan.execute(&mut tools, |event| {
        if !global_json {
            handle_event(event, &mut spinner);
        }
    });
    if let Some(bar) = spinner.take() {
        bar.finish_and_clear();
    }

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(err) => {
            if !global_json {
                print_failure(&err);
            }
            return Err(err).context("release failed");
        }
    };

    if global_json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!();
        println!(
            "{} Released {} to {}",
            "✓".green().bold(),
            outcome.tag.green().bold(),
            outcome.url.cyan(),
        );
        println!(
            "  {}: {}",
            "Now at".dimmed(),
            outcome.next_version.bold()
        );
    }

    Ok(())
}

/// Print the options header and numbered step list.
fn print_plan(plan: &ReleasePlan, is_dry: bool) {
    if is_dry {
        println!("\n{}", "DRY RUN: no changes will be made".yellow().bold());
    }
    println!(
        "\n{}: {} {}",
        "Release".bold(),
        plan.options.artifact_id.bold(),
        plan.options.version.to_string().green().bold(),
    );
    super::print_options(&plan.options);
    println!();

    println!("{}", "Steps".bold().underline());
    for (i, step) in plan.steps.iter().enumerate() {
        println!("  {:>2}. {step}", i + 1);
        if is_dry && let Step::Deploy { args, .. } = step {
            for arg in args {
                println!("        {}", arg.dimmed());
            }
        }
    }
    println!();
}

/// Handle a release event for terminal progress display.
///
/// The deploy step streams Maven's own output, so it gets no spinner.
fn handle_event(event: ReleaseEvent, spinner: &mut Option<ProgressBar>) {
    match event {
        ReleaseEvent::StepStarted { index, total, step } => {
            let label = format!("[{}/{total}] {step}", index + 1);
            if matches!(step, Step::Deploy { .. }) {
                println!("  {} {}", "→".cyan(), label.bold());
                return;
            }
            let bar = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::with_template("  {spinner:.cyan} {msg}") {
                bar.set_style(
                    style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
                );
            }
            bar.set_message(format!("{label}..."));
            bar.enable_steady_tick(std::time::Duration::from_millis(80));
            *spinner = Some(bar);
        }
        ReleaseEvent::StepCompleted { step, message, .. } => {
            if let Some(bar) = spinner.take() {
                bar.finish_and_clear();
            }
            println!(
                "  {} {} {}",
                "✓".green(),
                step.to_string().bold(),
                message.dimmed()
            );
        }
    }
}

/// Tell the operator what already happened, since nothing is undone.
fn print_failure(err: &ReleaseError) {
    let ReleaseError::StepFailed {
        step, completed, ..
    } = err
    else {
        return;
    };

    eprintln!();
    eprintln!("  {} {}", "✗".red(), step.to_string().red().bold());
    if completed.is_empty() {
        eprintln!("  {}", "No changes were made.".dimmed());
        return;
    }
    eprintln!(
        "  {}",
        "These steps completed and were not rolled back:".yellow()
    );
    for done in completed {
        eprintln!("    {} {done}", "•".yellow());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use nexus_release_core::config::ReleaseSettings;
    use tempfile::TempDir;

    fn project() -> (TempDir, Utf8PathBuf, Config) {
        let tmp = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        std::fs::write(
            root.join("package.json"),
            r#"{"name":"widget","version":"1.0.0-SNAPSHOT"}"#,
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
        (tmp, root, config)
    }

    #[test]
    fn dry_run_text_succeeds() {
        let (_tmp, root, config) = project();
        let args = ReleaseArgs {
            dry_run: true,
            ..ReleaseArgs::default()
        };
        assert!(cmd_release(args, false, &config, &root).is_ok());
    }

    #[test]
    fn dry_run_json_succeeds() {
        let (_tmp, root, config) = project();
        let args = ReleaseArgs {
            dry_run: true,
            version: Some("2.0.0".into()),
            ..ReleaseArgs::default()
        };
        assert!(cmd_release(args, true, &config, &root).is_ok());
    }

    #[test]
    fn unknown_target_fails_planning() {
        let (_tmp, root, config) = project();
        let args = ReleaseArgs {
            target: Some("nope".into()),
            dry_run: true,
            ..ReleaseArgs::default()
        };
        let err = cmd_release(args, true, &config, &root).unwrap_err();
        assert!(format!("{err:#}").contains("nope"));
    }
}

//! Command implementations

pub mod doctor;

pub mod info;

pub mod preflight;

pub mod release;

use owo_colors::OwoColorize;

use nexus_release_core::ReleaseOptions;

/// Print the resolved options as aligned `label: value` lines.
///
/// Shared by `info` and the `release` plan header.
pub fn print_options(options: &ReleaseOptions) {
    let rows: Vec<(&str, String)> = vec![
        ("Goal", options.goal.clone()),
        (
            "Artifact",
            format!("{}:{}", options.group_id, options.artifact_id),
        ),
        ("Version", options.version.to_string()),
        ("Next version", options.next_version.clone()),
        ("Tag", options.tag_name()),
        ("File", options.file.to_string()),
        ("Extension", options.extension.clone()),
        ("Repository", options.url.clone()),
    ];
    for (label, value) in rows {
        println!("  {:<13} {}", format!("{label}:").dimmed(), value.cyan());
    }
    if let Some(ref classifier) = options.classifier {
        println!("  {:<13} {}", "Classifier:".dimmed(), classifier);
    }
    if let Some(ref folder) = options.dest_folder {
        println!("  {:<13} {}", "Dest folder:".dimmed(), folder);
    }
}

//! File mappings: which files go into the release archive, and where.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// A set of source patterns and the archive folder they land in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMapping {
    /// Glob patterns selecting the files to include.
    pub src: Vec<String>,
    /// Destination folder inside the archive. `None` means the archive root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest: Option<String>,
    /// Directory the patterns are evaluated in. Stripped from entry names.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
}

impl FileMapping {
    /// Create a mapping for `src` patterns with no destination.
    pub fn new<I, S>(src: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            src: src.into_iter().map(Into::into).collect(),
            dest: None,
            cwd: None,
        }
    }

    /// Set the destination folder.
    #[must_use]
    pub fn with_dest(mut self, dest: impl Into<String>) -> Self {
        self.dest = Some(dest.into());
        self
    }

    /// Set the base directory for the source patterns.
    #[must_use]
    pub fn with_cwd(mut self, cwd: impl Into<String>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }
}

/// Prefix every mapping's destination with `folder`.
///
/// Not idempotent: applying it twice nests the folder twice.
pub fn inject_dest_folder(folder: &str, mappings: Vec<FileMapping>) -> Vec<FileMapping> {
    debug!(%folder, count = mappings.len(), "injecting destination folder");
    mappings
        .into_iter()
        .map(|mut mapping| {
            let dest = join_dest(folder, mapping.dest.as_deref().unwrap_or(""));
            mapping.dest = Some(dest);
            mapping
        })
        .collect()
}

/// Join two archive path segments with `/` and normalise the result.
///
/// Empty and `.` parts are dropped and `..` removes the part before it. A
/// `..` with nothing left to remove is dropped, so entries never climb above
/// the archive root.
pub(crate) fn join_dest(base: &str, rest: &str) -> String {
    let mut joined: Vec<&str> = Vec::new();
    for part in base.split('/').chain(rest.split('/')) {
        match part {
            "" | "." => {}
            ".." => {
                joined.pop();
            }
            _ => joined.push(part),
        }
    }
    if joined.is_empty() {
        ".".to_string()
    } else {
        joined.join("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn injects_folder_before_existing_dest() {
        let mappings = vec![FileMapping::new(["dist/**"]).with_dest("a")];
        let out = inject_dest_folder("lib-1.0", mappings);
        assert_eq!(out[0].dest.as_deref(), Some("lib-1.0/a"));
        assert_eq!(out[0].src, vec!["dist/**"]);
    }

    #[test]
    fn missing_dest_becomes_folder() {
        let out = inject_dest_folder("lib-1.0", vec![FileMapping::new(["x"])]);
        assert_eq!(out[0].dest.as_deref(), Some("lib-1.0"));
    }

    #[test]
    fn reapplying_compounds_the_prefix() {
        let once = inject_dest_folder("lib-1.0", vec![FileMapping::new(["x"]).with_dest("a")]);
        let twice = inject_dest_folder("lib-1.0", once);
        assert_eq!(twice[0].dest.as_deref(), Some("lib-1.0/lib-1.0/a"));
    }

    #[test]
    fn every_mapping_is_rewritten() {
        let mappings = vec![
            FileMapping::new(["a/**"]).with_dest("a"),
            FileMapping::new(["b/**"]).with_dest("b/"),
            FileMapping::new(["c/**"]),
        ];
        let dests: Vec<_> = inject_dest_folder("pkg", mappings)
            .into_iter()
            .map(|m| m.dest.unwrap())
            .collect();
        assert_eq!(dests, vec!["pkg/a", "pkg/b", "pkg"]);
    }

    #[test]
    fn join_dest_normalizes_separators() {
        assert_eq!(join_dest("lib/", "./a"), "lib/a");
        assert_eq!(join_dest("", ""), ".");
        assert_eq!(join_dest("", "a/b"), "a/b");
    }

    #[test]
    fn join_dest_collapses_parent_segments() {
        assert_eq!(join_dest("widget-1.0.0", "../x"), "x");
        assert_eq!(join_dest("lib", "a/../b"), "lib/b");
        assert_eq!(join_dest("", "../../x/a"), "x/a");
        assert_eq!(join_dest("lib", ".."), ".");
    }

    #[test]
    fn injected_dest_with_parent_stays_inside_archive() {
        let out = inject_dest_folder("widget-1.0.0", vec![FileMapping::new(["x"]).with_dest("../x")]);
        assert_eq!(out[0].dest.as_deref(), Some("x"));
    }
}

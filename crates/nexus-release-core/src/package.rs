//! Release archive creation.
//!
//! Every file selected by the resolved [`FileMapping`]s is written into a ZIP
//! archive staged as a uniquely named `.zip` temporary file beside the
//! artifact. The staged file is then persisted to the artifact path, which
//! carries the resolved extension. No other file in the project is written,
//! so an existing `<name>.zip` next to a `<name>.jar` artifact is left alone.

use std::collections::BTreeMap;
use std::fs::File;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument};
use walkdir::WalkDir;
use zip::CompressionMethod;
use zip::write::FileOptions;

use crate::mapping::{FileMapping, join_dest};

/// Extension of the format the archive is staged in.
pub const ARCHIVE_FORMAT_EXTENSION: &str = "zip";

/// Errors from packaging.
#[derive(Error, Debug)]
pub enum PackageError {
    /// Filesystem error.
    #[error("{path}: {source}")]
    Io {
        /// Path being read or written.
        path: String,
        /// Underlying error.
        source: io::Error,
    },

    /// A source pattern is not a valid glob.
    #[error("invalid file pattern `{pattern}`: {source}")]
    Pattern {
        /// The rejected pattern.
        pattern: String,
        /// Parser error.
        source: glob::PatternError,
    },

    /// A matched path could not be read while expanding a pattern.
    #[error(transparent)]
    Glob(#[from] glob::GlobError),

    /// A matched directory could not be walked.
    #[error(transparent)]
    Walk(#[from] walkdir::Error),

    /// The ZIP writer failed.
    #[error("failed to write archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// A matched path is not valid UTF-8.
    #[error("path is not valid UTF-8: {0}")]
    NonUtf8Path(String),

    /// The mappings selected no files.
    #[error("no files matched the configured file mappings")]
    NoFiles,
}

/// Result alias for packaging.
pub type PackageResult<T> = Result<T, PackageError>;

/// What to package and where to put it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveSpec {
    /// Final artifact path, relative to the project root unless absolute.
    pub file: Utf8PathBuf,
    /// Mappings selecting the archive contents.
    pub files: Vec<FileMapping>,
}

/// Build the archive described by `spec` under `root`.
///
/// Returns the absolute path of the finished artifact.
#[instrument(skip_all, fields(%root, file = %spec.file))]
pub fn build_archive(root: &Utf8Path, spec: &ArchiveSpec) -> PackageResult<Utf8PathBuf> {
    let target = absolute(root, &spec.file);

    let entries = collect_entries(root, &spec.files, &target)?;
    if entries.is_empty() {
        return Err(PackageError::NoFiles);
    }

    let parent = target.parent().unwrap_or(root);
    std::fs::create_dir_all(parent).map_err(|source| io_error(parent, source))?;

    let staged = tempfile::Builder::new()
        .prefix(".nexus-release-")
        .suffix(&format!(".{ARCHIVE_FORMAT_EXTENSION}"))
        .tempfile_in(parent)
        .map_err(|source| io_error(parent, source))?;
    debug!(count = entries.len(), staging = %staged.path().display(), "writing archive");

    let mut zip = zip::ZipWriter::new(staged.as_file());
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, source_path) in &entries {
        zip.start_file(name.as_str(), options)?;
        let mut input = File::open(source_path).map_err(|source| io_error(source_path, source))?;
        io::copy(&mut input, &mut zip).map_err(|source| io_error(source_path, source))?;
    }
    zip.finish()?;
    drop(zip);

    // Dropping `staged` on any error above removes the temporary file.
    staged
        .persist(&target)
        .map_err(|e| io_error(&target, e.error))?;

    info!(file = %target, entries = entries.len(), "archive created");
    Ok(target)
}

/// Expand the mappings into `entry name -> source file`, sorted by entry name.
fn collect_entries(
    root: &Utf8Path,
    mappings: &[FileMapping],
    exclude: &Utf8Path,
) -> PackageResult<BTreeMap<String, Utf8PathBuf>> {
    let mut entries = BTreeMap::new();

    for mapping in mappings {
        let base = mapping
            .cwd
            .as_deref()
            .map_or_else(|| root.to_path_buf(), |cwd| absolute(root, Utf8Path::new(cwd)));
        let dest = mapping.dest.as_deref().unwrap_or("");

        for pattern in &mapping.src {
            let full = format!("{}/{pattern}", glob::Pattern::escape(base.as_str()));
            let paths = glob::glob(&full).map_err(|source| PackageError::Pattern {
                pattern: pattern.clone(),
                source,
            })?;

            for path in paths {
                let path = utf8(path?)?;
                if path.is_dir() {
                    for entry in WalkDir::new(&path).sort_by_file_name() {
                        let entry = entry?;
                        if entry.file_type().is_file() {
                            let file = utf8(entry.into_path())?;
                            add_entry(&mut entries, &base, dest, file, exclude);
                        }
                    }
                } else if path.is_file() {
                    add_entry(&mut entries, &base, dest, path, exclude);
                }
            }
        }
    }

    Ok(entries)
}

fn add_entry(
    entries: &mut BTreeMap<String, Utf8PathBuf>,
    base: &Utf8Path,
    dest: &str,
    file: Utf8PathBuf,
    exclude: &Utf8Path,
) {
    if file == exclude {
        return;
    }
    let relative = file.strip_prefix(base).unwrap_or(&file);
    let relative: Vec<&str> = relative.components().map(|c| c.as_str()).collect();
    let name = join_dest(dest, &relative.join("/"));
    entries.entry(name).or_insert(file);
}

fn absolute(root: &Utf8Path, path: &Utf8Path) -> Utf8PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

fn utf8(path: std::path::PathBuf) -> PackageResult<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(path).map_err(|p| PackageError::NonUtf8Path(p.display().to_string()))
}

fn io_error(path: &Utf8Path, source: io::Error) -> PackageError {
    PackageError::Io {
        path: path.to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn project() -> (TempDir, Utf8PathBuf) {
        let tmp = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        fs::create_dir_all(root.join("dist/sub")).unwrap();
        fs::write(root.join("dist/a.txt"), "a").unwrap();
        fs::write(root.join("dist/sub/b.txt"), "b").unwrap();
        fs::write(root.join("README.md"), "readme").unwrap();
        (tmp, root)
    }

    fn entry_names(path: &Utf8Path) -> Vec<String> {
        let mut archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
        let mut names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn packages_directory_under_dest() {
        let (_tmp, root) = project();
        let spec = ArchiveSpec {
            file: "widget-1.0.0.zip".into(),
            files: vec![FileMapping::new(["dist"]).with_dest("widget-1.0.0")],
        };

        let out = build_archive(&root, &spec).unwrap();
        assert_eq!(out, root.join("widget-1.0.0.zip"));
        assert_eq!(
            entry_names(&out),
            vec!["widget-1.0.0/dist/a.txt", "widget-1.0.0/dist/sub/b.txt"]
        );
    }

    #[test]
    fn cwd_is_stripped_from_entry_names() {
        let (_tmp, root) = project();
        let spec = ArchiveSpec {
            file: "out/widget.zip".into(),
            files: vec![FileMapping::new(["**/*.txt"]).with_cwd("dist")],
        };

        let out = build_archive(&root, &spec).unwrap();
        assert_eq!(entry_names(&out), vec!["a.txt", "sub/b.txt"]);
    }

    #[test]
    fn archive_renamed_to_resolved_extension() {
        let (_tmp, root) = project();
        let spec = ArchiveSpec {
            file: "widget-1.0.0.jar".into(),
            files: vec![FileMapping::new(["README.md"])],
        };

        let out = build_archive(&root, &spec).unwrap();
        assert_eq!(out, root.join("widget-1.0.0.jar"));
        assert!(out.is_file());
        assert!(!root.join("widget-1.0.0.zip").exists());
        assert_eq!(entry_names(&out), vec!["README.md"]);
    }

    #[test]
    fn zip_inside_the_name_is_left_alone() {
        let (_tmp, root) = project();
        let spec = ArchiveSpec {
            file: "gzip-tools-1.0.0.jar".into(),
            files: vec![FileMapping::new(["README.md"])],
        };

        let out = build_archive(&root, &spec).unwrap();
        assert_eq!(out.file_name(), Some("gzip-tools-1.0.0.jar"));
    }

    #[test]
    fn duplicate_matches_are_written_once() {
        let (_tmp, root) = project();
        let spec = ArchiveSpec {
            file: "w.zip".into(),
            files: vec![FileMapping::new(["dist/a.txt", "dist/*.txt"])],
        };

        let out = build_archive(&root, &spec).unwrap();
        assert_eq!(entry_names(&out), vec!["dist/a.txt"]);
    }

    #[test]
    fn archive_does_not_include_itself() {
        let (_tmp, root) = project();
        fs::write(root.join("w.zip"), "stale").unwrap();
        let spec = ArchiveSpec {
            file: "w.zip".into(),
            files: vec![FileMapping::new(["*"])],
        };

        let out = build_archive(&root, &spec).unwrap();
        let names = entry_names(&out);
        assert!(!names.contains(&"w.zip".to_string()));
        assert!(names.contains(&"README.md".to_string()));
    }

    #[test]
    fn existing_zip_beside_other_extension_survives() {
        let (_tmp, root) = project();
        fs::write(root.join("dist/app.zip"), "user data").unwrap();
        let spec = ArchiveSpec {
            file: "dist/app.jar".into(),
            files: vec![FileMapping::new(["dist/*"])],
        };

        let out = build_archive(&root, &spec).unwrap();
        assert_eq!(fs::read_to_string(root.join("dist/app.zip")).unwrap(), "user data");
        let names = entry_names(&out);
        assert!(names.contains(&"dist/app.zip".to_string()));
        assert!(names.contains(&"dist/a.txt".to_string()));
        assert!(!names.contains(&"dist/app.jar".to_string()));
    }

    #[test]
    fn no_staging_file_left_behind() {
        let (_tmp, root) = project();
        let spec = ArchiveSpec {
            file: "out/w.jar".into(),
            files: vec![FileMapping::new(["README.md"])],
        };

        build_archive(&root, &spec).unwrap();
        let leftovers: Vec<_> = fs::read_dir(root.join("out"))
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(leftovers, vec!["w.jar"]);
    }

    #[test]
    fn no_matches_is_an_error() {
        let (_tmp, root) = project();
        let spec = ArchiveSpec {
            file: "w.zip".into(),
            files: vec![FileMapping::new(["nothing/**"])],
        };
        assert!(matches!(
            build_archive(&root, &spec),
            Err(PackageError::NoFiles)
        ));
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let (_tmp, root) = project();
        let spec = ArchiveSpec {
            file: "w.zip".into(),
            files: vec![FileMapping::new(["dist/[.txt"])],
        };
        assert!(matches!(
            build_archive(&root, &spec),
            Err(PackageError::Pattern { .. })
        ));
    }
}

//! Artifact naming: file extension and file name base.

use semver::Version;

/// Extension used when nothing else determines one.
pub const DEFAULT_EXTENSION: &str = "zip";

/// Classifiers that are always shipped as zip archives.
const ZIP_CLASSIFIERS: &[&str] = &["javadoc", "sources"];

/// Resolve the artifact file extension.
///
/// `javadoc` and `sources` classifiers force `zip`. Otherwise an explicit
/// `artifact_type` wins over `packaging`, which wins over `zip`.
pub fn extension(
    packaging: Option<&str>,
    classifier: Option<&str>,
    artifact_type: Option<&str>,
) -> String {
    if classifier.is_some_and(|c| ZIP_CLASSIFIERS.contains(&c)) {
        return DEFAULT_EXTENSION.to_string();
    }
    artifact_type
        .filter(|t| !t.is_empty())
        .or(packaging.filter(|p| !p.is_empty()))
        .unwrap_or(DEFAULT_EXTENSION)
        .to_string()
}

/// `<artifact_id>-<version>[-<classifier>]`, shared by the archive file name
/// and the injected destination folder.
pub fn file_name_base(artifact_id: &str, version: &Version, classifier: Option<&str>) -> String {
    match classifier {
        Some(classifier) if !classifier.is_empty() => {
            format!("{artifact_id}-{version}-{classifier}")
        }
        _ => format!("{artifact_id}-{version}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sources_classifier_forces_zip() {
        assert_eq!(extension(Some("jar"), Some("sources"), None), "zip");
    }

    #[test]
    fn javadoc_classifier_beats_type() {
        assert_eq!(extension(Some("jar"), Some("javadoc"), Some("war")), "zip");
    }

    #[test]
    fn packaging_used_without_classifier() {
        assert_eq!(extension(Some("jar"), None, None), "jar");
    }

    #[test]
    fn type_beats_packaging() {
        assert_eq!(extension(Some("jar"), Some("dist"), Some("tgz")), "tgz");
    }

    #[test]
    fn falls_back_to_zip() {
        assert_eq!(extension(None, None, None), "zip");
        assert_eq!(extension(Some(""), None, Some("")), "zip");
    }

    #[test]
    fn name_base_with_and_without_classifier() {
        let v = Version::new(1, 0, 0);
        assert_eq!(file_name_base("lib", &v, None), "lib-1.0.0");
        assert_eq!(file_name_base("lib", &v, Some("sources")), "lib-1.0.0-sources");
        assert_eq!(file_name_base("lib", &v, Some("")), "lib-1.0.0");
    }
}

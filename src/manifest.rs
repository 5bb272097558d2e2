// src/manifest.rs
//! Project and extension manifest metadata
//!
//! Both the project manifest (`package.json`) and browser-extension
//! manifests carry the two fields this tool cares about: `name` and
//! `version`. Everything else in the file is ignored.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Project versions must be plain MAJOR.MINOR.PATCH
pub const VERSION_PATTERN: &str = r"^[0-9]+\.[0-9]+\.[0-9]+$";

/// Manifest errors
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("failed to read {}: {}", .path.display(), .source)]
    Read {
        path: PathBuf,
        source: io::Error,
    },

    #[error("failed to parse {}: {}", .path.display(), .source)]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("cannot normalize version string: {0}")]
    Version(String),
}

/// The name/version pair extracted from a JSON manifest
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PackageInfo {
    pub name: String,
    pub version: String,
}

impl PackageInfo {
    /// Load name and version from a JSON manifest file
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| ManifestError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Package-descriptor name: lowercased, spaces turned into dashes
pub fn descriptor_name(name: &str) -> String {
    name.to_lowercase().replace(' ', "-")
}

/// Normalize an extension version into package-descriptor form
///
/// Extension manifests allow one to four dotted components; package
/// descriptors want `a.b.c` with an optional `-d` build suffix:
///
/// * `1` becomes `1.0.0`
/// * `1.2` becomes `1.2.0`
/// * `1.2.3` stays as is
/// * `1.2.3.4` becomes `1.2.3-4`
pub fn descriptor_version(version: &str) -> Result<String, ManifestError> {
    match version.matches('.').count() {
        0 => Ok(format!("{version}.0.0")),
        1 => Ok(format!("{version}.0")),
        2 => Ok(version.to_string()),
        3 => {
            let i = version.rfind('.').expect("three dots counted above");
            Ok(format!("{}-{}", &version[..i], &version[i + 1..]))
        }
        _ => Err(ManifestError::Version(version.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_manifest() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"name": "My Extension", "version": "2.1.0", "permissions": ["tabs"]}}"#
        )
        .unwrap();

        let info = PackageInfo::load(file.path()).unwrap();
        assert_eq!(info.name, "My Extension");
        assert_eq!(info.version, "2.1.0");
    }

    #[test]
    fn test_load_manifest_missing_fields_default_empty() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"permissions": []}}"#).unwrap();

        let info = PackageInfo::load(file.path()).unwrap();
        assert!(info.name.is_empty());
        assert!(info.version.is_empty());
    }

    #[test]
    fn test_load_manifest_missing_file() {
        let result = PackageInfo::load(Path::new("/nonexistent/manifest.json"));
        assert!(matches!(result, Err(ManifestError::Read { .. })));
    }

    #[test]
    fn test_load_manifest_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let result = PackageInfo::load(file.path());
        assert!(matches!(result, Err(ManifestError::Parse { .. })));
    }

    #[test]
    fn test_descriptor_name() {
        assert_eq!(descriptor_name("My Cool Extension"), "my-cool-extension");
        assert_eq!(descriptor_name("simple"), "simple");
    }

    #[test]
    fn test_descriptor_version() {
        assert_eq!(descriptor_version("1").unwrap(), "1.0.0");
        assert_eq!(descriptor_version("1.2").unwrap(), "1.2.0");
        assert_eq!(descriptor_version("1.2.3").unwrap(), "1.2.3");
        assert_eq!(descriptor_version("1.2.3.4").unwrap(), "1.2.3-4");
        assert!(matches!(
            descriptor_version("1.2.3.4.5"),
            Err(ManifestError::Version(_))
        ));
    }
}

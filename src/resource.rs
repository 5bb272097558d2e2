// src/resource.rs
//! Windows VERSIONINFO resource generation
//!
//! Builds a `version.rc` resource script for packaged extension DLLs.
//! All inputs come from `VRC_*` environment variables so the file can
//! be produced inside CI without a checked-in template; the version
//! may alternatively come from an extension manifest. `$BUILD_NUMBER`
//! (default `0`) is appended as the fourth version component.

use std::env;

use regex::Regex;
use thiserror::Error;

const COMPANY_ENV: &str = "VRC_COMPANYNAME";
const DESCRIPTION_ENV: &str = "VRC_FILEDESCRIPTION";
const VERSION_ENV: &str = "VRC_VERSION";
const COPYRIGHT_ENV: &str = "VRC_LEGALCOPYRIGHT";
const PRODUCT_ENV: &str = "VRC_PRODUCTNAME";
const INTERNAL_NAME_ENV: &str = "VRC_INTERNALNAME";

/// Resource versions carry exactly four dotted components
const RESOURCE_VERSION_PATTERN: &str = r"^[0-9]+(\.[0-9]+){3}$";

/// Resource generation errors
#[derive(Error, Debug)]
pub enum ResourceError {
    #[error("{0} not set")]
    MissingEnv(&'static str),

    #[error("invalid resource version {0:?} (expected a.b.c.d)")]
    InvalidVersion(String),
}

/// The resolved VERSIONINFO context
#[derive(Debug, Clone)]
pub struct VersionResource {
    pub company_name: String,
    pub file_description: String,
    /// Four-component dotted version, build number included
    pub version: String,
    pub legal_copyright: String,
    pub product_name: String,
    pub internal_name: String,
}

impl VersionResource {
    /// Resolve the resource context from the environment
    ///
    /// `manifest_version` takes precedence over `$VRC_VERSION`, so a
    /// browser-extension manifest can drive the DLL version.
    pub fn from_env(manifest_version: Option<&str>) -> Result<Self, ResourceError> {
        let version = match manifest_version {
            Some(version) if !version.is_empty() => version.to_string(),
            _ => required(VERSION_ENV)?,
        };

        let build = env::var("BUILD_NUMBER")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "0".to_string());
        let version = format!("{version}.{build}");

        let pattern =
            Regex::new(RESOURCE_VERSION_PATTERN).expect("resource version pattern is valid");
        if !pattern.is_match(&version) {
            return Err(ResourceError::InvalidVersion(version));
        }

        let product_name = required(PRODUCT_ENV)?;
        let internal_name = env::var(INTERNAL_NAME_ENV)
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| format!("{}.dll", product_name.to_lowercase()));

        Ok(Self {
            company_name: required(COMPANY_ENV)?,
            file_description: required(DESCRIPTION_ENV)?,
            version,
            legal_copyright: required(COPYRIGHT_ENV)?,
            product_name,
            internal_name,
        })
    }

    /// Render the VERSIONINFO resource script
    pub fn render(&self) -> String {
        let version_commas = self.version.replace('.', ",");

        format!(
            r#"
1 VERSIONINFO
FILEVERSION {version_commas}
PRODUCTVERSION {version_commas}
FILEOS 0x4
FILETYPE 0x2
{{
BLOCK "StringFileInfo"
{{
        BLOCK "040904b0"
        {{
                VALUE "CompanyName", "{company}"
                VALUE "FileDescription", "{description}"
                VALUE "FileVersion", "{version}"
                VALUE "InternalName", "{internal}"
                VALUE "LegalCopyright", "{copyright}"
                VALUE "OriginalFilename", "{internal}"
                VALUE "ProductName", "{product}"
                VALUE "ProductVersion", "{version}"
        }}
}}

BLOCK "VarFileInfo"
{{
        VALUE "Translation", 0x0409 0x04E4
}}
}}
"#,
            version_commas = version_commas,
            version = self.version,
            company = self.company_name,
            description = self.file_description,
            internal = self.internal_name,
            copyright = self.legal_copyright,
            product = self.product_name,
        )
    }
}

fn required(name: &'static str) -> Result<String, ResourceError> {
    env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or(ResourceError::MissingEnv(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> VersionResource {
        VersionResource {
            company_name: "Example Corp".to_string(),
            file_description: "Example browser helper".to_string(),
            version: "1.2.3.4".to_string(),
            legal_copyright: "(c) Example Corp".to_string(),
            product_name: "Example".to_string(),
            internal_name: "example.dll".to_string(),
        }
    }

    #[test]
    fn test_render_substitutes_both_version_forms() {
        let rendered = sample().render();
        assert!(rendered.contains("FILEVERSION 1,2,3,4"));
        assert!(rendered.contains("PRODUCTVERSION 1,2,3,4"));
        assert!(rendered.contains(r#"VALUE "FileVersion", "1.2.3.4""#));
        assert!(rendered.contains(r#"VALUE "ProductVersion", "1.2.3.4""#));
    }

    #[test]
    fn test_render_substitutes_strings() {
        let rendered = sample().render();
        assert!(rendered.contains(r#"VALUE "CompanyName", "Example Corp""#));
        assert!(rendered.contains(r#"VALUE "InternalName", "example.dll""#));
        assert!(rendered.contains(r#"VALUE "OriginalFilename", "example.dll""#));
        assert!(rendered.contains(r#"VALUE "Translation", 0x0409 0x04E4"#));
    }

    #[test]
    fn test_version_pattern() {
        let pattern = Regex::new(RESOURCE_VERSION_PATTERN).unwrap();
        assert!(pattern.is_match("1.2.3.4"));
        assert!(pattern.is_match("10.20.30.4000"));
        assert!(!pattern.is_match("1.2.3"));
        assert!(!pattern.is_match("1.2.3.4.5"));
        assert!(!pattern.is_match("1.2.3.beta"));
    }
}

// src/config/mod.rs
//! Layered configuration
//!
//! Configuration cascades from four sources, later layers winning:
//!
//! 1. `package.json` in the working directory (project name/version)
//! 2. the user rc file: `$STOWAGE_USER_CONFIG`, else `~/.stowagerc`
//! 3. the project rc file: `./.stowagerc`
//! 4. command-line flags (credentials only)
//!
//! Rc files are JSON and may carry the store URL, the per-project URL
//! secrets, and Basic auth credentials. The user rc file holds
//! credentials, so a mode that lets other users read it draws a
//! warning. Missing rc files are skipped; unreadable ones are errors.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::manifest::{self, ManifestError, PackageInfo};
use crate::store::Credentials;

/// Rc file name, both user-level and project-level
pub const RC_FILENAME: &str = ".stowagerc";

/// Project manifest read from the working directory
pub const PACKAGE_FILE: &str = "package.json";

/// Overrides the user rc file location
pub const USER_CONFIG_ENV: &str = "STOWAGE_USER_CONFIG";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),

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

    #[error("empty package name in package.json")]
    EmptyName,

    #[error("package version {0:?} does not match MAJOR.MINOR.PATCH")]
    InvalidVersion(String),

    #[error("no store secret configured for project {0}")]
    MissingSecret(String),

    #[error("no store URL configured")]
    MissingStoreUrl,

    #[error("cannot locate the home directory")]
    NoHome,
}

/// Global command-line flags feeding into the configuration cascade
#[derive(Debug, Clone, Default)]
pub struct Flags {
    pub verbose: bool,
    pub dry_run: bool,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// One rc file layer; every field optional so layers merge field-wise
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RcFile {
    #[serde(rename = "storeURL")]
    store_url: Option<String>,
    secrets: Option<HashMap<String, String>>,
    username: Option<String>,
    password: Option<String>,
}

impl RcFile {
    /// Overlay `layer` on top of this one. Scalar fields present in
    /// the layer win; secret maps merge per key.
    fn merge(&mut self, layer: RcFile) {
        if layer.store_url.is_some() {
            self.store_url = layer.store_url;
        }
        if let Some(new) = layer.secrets {
            match &mut self.secrets {
                Some(existing) => existing.extend(new),
                slot => *slot = Some(new),
            }
        }
        if layer.username.is_some() {
            self.username = layer.username;
        }
        if layer.password.is_some() {
            self.password = layer.password;
        }
    }
}

/// Fully resolved configuration for one invocation
#[derive(Debug)]
pub struct Config {
    pub package: PackageInfo,
    pub store_url: String,
    /// URL secret for this project, from the rc secrets map
    pub secret: String,
    pub credentials: Option<Credentials>,
    pub verbose: bool,
    pub dry_run: bool,
}

impl Config {
    /// Load and validate the full configuration cascade
    pub fn load(flags: &Flags) -> Result<Self, ConfigError> {
        let package = PackageInfo::load(Path::new(PACKAGE_FILE))?;

        let user_rc = user_rc_path()?;
        check_rc_permissions(&user_rc);

        let mut rc = RcFile::default();
        for path in [user_rc, PathBuf::from(RC_FILENAME)] {
            debug!("reading {}", path.display());
            if let Some(layer) = load_rc(&path)? {
                rc.merge(layer);
            }
        }

        if package.name.is_empty() {
            return Err(ConfigError::EmptyName);
        }

        let version_pattern =
            Regex::new(manifest::VERSION_PATTERN).expect("version pattern is valid");
        if !version_pattern.is_match(&package.version) {
            return Err(ConfigError::InvalidVersion(package.version.clone()));
        }

        let secret = rc
            .secrets
            .as_ref()
            .and_then(|secrets| secrets.get(&package.name))
            .filter(|secret| !secret.is_empty())
            .cloned()
            .ok_or_else(|| ConfigError::MissingSecret(package.name.clone()))?;

        let credentials = resolve_credentials(flags, &rc);

        let store_url = rc
            .store_url
            .filter(|url| !url.is_empty())
            .ok_or(ConfigError::MissingStoreUrl)?;

        Ok(Self {
            package,
            store_url,
            secret,
            credentials,
            verbose: flags.verbose,
            dry_run: flags.dry_run,
        })
    }
}

/// Branch name from `$BRANCH`, for store paths and archive names
pub fn branch_from_env() -> String {
    sanitize_branch(env::var("BRANCH").ok().as_deref())
}

/// Build number from `$BUILD_NUMBER`, if set and non-empty
pub fn build_number_from_env() -> Option<String> {
    env::var("BUILD_NUMBER").ok().filter(|v| !v.is_empty())
}

fn sanitize_branch(raw: Option<&str>) -> String {
    match raw {
        None | Some("") => "unknown".to_string(),
        Some(branch) => branch.replace('/', ""),
    }
}

/// Resolve Basic auth credentials. Flags overwrite whatever the rc
/// files configured; a username without a password yields an empty
/// password rather than no credentials.
fn resolve_credentials(flags: &Flags, rc: &RcFile) -> Option<Credentials> {
    let username = flags.username.clone().or_else(|| rc.username.clone());
    let password = flags.password.clone().or_else(|| rc.password.clone());
    username.map(|username| Credentials {
        username,
        password: password.unwrap_or_default(),
    })
}

fn user_rc_path() -> Result<PathBuf, ConfigError> {
    if let Ok(path) = env::var(USER_CONFIG_ENV)
        && !path.is_empty()
    {
        return Ok(PathBuf::from(path));
    }
    dirs::home_dir()
        .map(|home| home.join(RC_FILENAME))
        .ok_or(ConfigError::NoHome)
}

/// Load one rc layer; a missing file is simply an absent layer
fn load_rc(path: &Path) -> Result<Option<RcFile>, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let layer = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(layer))
}

/// Warn when the user rc file is readable by other users; it can
/// carry credentials and should be mode 0600.
fn check_rc_permissions(path: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        if let Ok(metadata) = fs::metadata(path)
            && metadata.permissions().mode() & 0o077 != 0
        {
            warn!(
                "{} is accessible by other users; chmod 600 is recommended",
                path.display()
            );
        }
    }
    #[cfg(not(unix))]
    let _ = path;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rc_from(json: &str) -> RcFile {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_rc_parse_store_url_key() {
        let rc = rc_from(r#"{"storeURL": "https://store.example.com"}"#);
        assert_eq!(rc.store_url.as_deref(), Some("https://store.example.com"));
        assert!(rc.secrets.is_none());
    }

    #[test]
    fn test_rc_merge_project_overrides_user() {
        let mut rc = rc_from(
            r#"{
                "storeURL": "https://user.example.com",
                "username": "alice",
                "password": "hunter2",
                "secrets": {"frontend": "abc"}
            }"#,
        );
        rc.merge(rc_from(
            r#"{"storeURL": "https://project.example.com", "secrets": {"backend": "def"}}"#,
        ));

        assert_eq!(rc.store_url.as_deref(), Some("https://project.example.com"));
        // Fields absent from the project layer survive from the user layer.
        assert_eq!(rc.username.as_deref(), Some("alice"));
        assert_eq!(rc.password.as_deref(), Some("hunter2"));
        // Secret maps merge per key rather than replacing wholesale.
        let secrets = rc.secrets.unwrap();
        assert_eq!(secrets.get("frontend").unwrap(), "abc");
        assert_eq!(secrets.get("backend").unwrap(), "def");
    }

    #[test]
    fn test_rc_merge_same_secret_key_overridden() {
        let mut rc = rc_from(r#"{"secrets": {"frontend": "old"}}"#);
        rc.merge(rc_from(r#"{"secrets": {"frontend": "new"}}"#));
        assert_eq!(rc.secrets.unwrap().get("frontend").unwrap(), "new");
    }

    #[test]
    fn test_sanitize_branch() {
        assert_eq!(sanitize_branch(None), "unknown");
        assert_eq!(sanitize_branch(Some("")), "unknown");
        assert_eq!(sanitize_branch(Some("main")), "main");
        assert_eq!(sanitize_branch(Some("feature/login")), "featurelogin");
    }

    #[test]
    fn test_flags_override_rc_credentials() {
        let rc = rc_from(r#"{"username": "alice", "password": "hunter2"}"#);
        let flags = Flags {
            username: Some("bob".to_string()),
            password: Some("sw0rdfish".to_string()),
            ..Flags::default()
        };

        let credentials = resolve_credentials(&flags, &rc).unwrap();
        assert_eq!(credentials.username, "bob");
        assert_eq!(credentials.password, "sw0rdfish");
    }

    #[test]
    fn test_rc_credentials_used_without_flags() {
        let rc = rc_from(r#"{"username": "alice", "password": "hunter2"}"#);
        let credentials = resolve_credentials(&Flags::default(), &rc).unwrap();
        assert_eq!(credentials.username, "alice");
        assert_eq!(credentials.password, "hunter2");
    }

    #[test]
    fn test_no_username_means_no_credentials() {
        // A password alone is not enough to authenticate with.
        let rc = rc_from(r#"{"password": "hunter2"}"#);
        assert!(resolve_credentials(&Flags::default(), &rc).is_none());

        let credentials = resolve_credentials(
            &Flags {
                username: Some("alice".to_string()),
                ..Flags::default()
            },
            &RcFile::default(),
        )
        .unwrap();
        assert_eq!(credentials.username, "alice");
        assert_eq!(credentials.password, "");
    }

    #[test]
    fn test_load_rc_missing_file_is_absent_layer() {
        let layer = load_rc(Path::new("/nonexistent/.stowagerc")).unwrap();
        assert!(layer.is_none());
    }

    #[test]
    fn test_load_rc_invalid_json_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        use std::io::Write;
        write!(file, "not json").unwrap();

        let result = load_rc(file.path());
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }
}

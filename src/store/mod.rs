// src/store/mod.rs
//! HTTP artifact-store client
//!
//! Thin wrapper around a blocking reqwest client for moving archives
//! to and from the artifact store with HTTP PUT and GET, plus the
//! naming scheme that maps a project onto its store location.
//!
//! The store speaks plain HTTP with optional Basic authentication.
//! Failures are never retried here; a failed transfer aborts the
//! whole invocation.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::{Body, Client, Response};
use reqwest::StatusCode;
use thiserror::Error;
use tracing::debug;

use crate::archive::ArchiveFormat;

/// Connect timeout for store requests. Whole-request timeouts are
/// deliberately not set: archive transfers can be arbitrarily large.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Basic authentication credentials for the artifact store
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Store transfer errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to create HTTP client: {0}")]
    Init(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        source: reqwest::Error,
    },

    #[error("{verb} {url} returned HTTP {status}")]
    Status {
        verb: &'static str,
        url: String,
        status: StatusCode,
    },

    #[error("failed to write {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        source: io::Error,
    },
}

/// Blocking HTTP client for the artifact store
pub struct StoreClient {
    client: Client,
}

impl StoreClient {
    /// Create a new store client
    pub fn new() -> Result<Self, StoreError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(StoreError::Init)?;

        Ok(Self { client })
    }

    /// Upload a sized body to `url` with HTTP PUT
    ///
    /// `length` becomes the Content-Length of the request so the
    /// store can validate the transfer. Any status of 300 or above
    /// is an error.
    pub fn put<B>(
        &self,
        url: &str,
        body: B,
        length: u64,
        credentials: Option<&Credentials>,
    ) -> Result<(), StoreError>
    where
        B: Read + Send + 'static,
    {
        debug!("PUT {url}");

        let mut request = self.client.put(url).body(Body::sized(body, length));
        if let Some(cred) = credentials {
            request = request.basic_auth(&cred.username, Some(&cred.password));
        }

        let response = request.send().map_err(|source| StoreError::Request {
            url: url.to_string(),
            source,
        })?;

        check_status("PUT", url, response.status())?;
        Ok(())
    }

    /// Fetch `url` with HTTP GET, returning the open response
    ///
    /// The response body has not been consumed; callers stream it
    /// wherever it needs to go. Any status of 300 or above is an
    /// error.
    pub fn get(
        &self,
        url: &str,
        credentials: Option<&Credentials>,
    ) -> Result<Response, StoreError> {
        debug!("GET {url}");

        let mut request = self.client.get(url);
        if let Some(cred) = credentials {
            request = request.basic_auth(&cred.username, Some(&cred.password));
        }

        let response = request.send().map_err(|source| StoreError::Request {
            url: url.to_string(),
            source,
        })?;

        check_status("GET", url, response.status())?;
        Ok(response)
    }

    /// Download `url` into a new file at `dest`
    ///
    /// Streams the response body to disk and returns the number of
    /// bytes written. Refuses to overwrite an existing file.
    pub fn download_to_file(
        &self,
        url: &str,
        dest: &Path,
        credentials: Option<&Credentials>,
    ) -> Result<u64, StoreError> {
        let mut response = self.get(url, credentials)?;

        let io_err = |source: io::Error| StoreError::Io {
            path: dest.to_path_buf(),
            source,
        };

        let mut file = File::options()
            .write(true)
            .create_new(true)
            .open(dest)
            .map_err(io_err)?;

        let written = io::copy(&mut response, &mut file).map_err(io_err)?;
        debug!("wrote {written} bytes to {}", dest.display());
        Ok(written)
    }
}

fn check_status(verb: &'static str, url: &str, status: StatusCode) -> Result<(), StoreError> {
    if status.as_u16() >= 300 {
        return Err(StoreError::Status {
            verb,
            url: url.to_string(),
            status,
        });
    }
    Ok(())
}

/// Archive file name for a published project:
/// `{name}[-TAG]-{branch}-{version}.{ext}`
pub fn archive_filename(
    name: &str,
    tag: Option<&str>,
    branch: &str,
    version: &str,
    format: ArchiveFormat,
) -> String {
    let tag = match tag {
        Some(tag) if !tag.is_empty() => format!("-{tag}"),
        _ => String::new(),
    };
    format!("{name}{tag}-{branch}-{version}.{}", format.extension())
}

/// Store location of an archive:
/// `{store_url}/{name}-{secret}/{branch}/{filename}`
pub fn artifact_url(
    store_url: &str,
    name: &str,
    secret: &str,
    branch: &str,
    filename: &str,
) -> String {
    format!("{store_url}/{name}-{secret}/{branch}/{filename}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_filename_without_tag() {
        let filename = archive_filename("frontend", None, "main", "1.2.3", ArchiveFormat::Tar);
        assert_eq!(filename, "frontend-main-1.2.3.tar");
    }

    #[test]
    fn test_archive_filename_with_tag() {
        let filename =
            archive_filename("frontend", Some("rc1"), "main", "1.2.3", ArchiveFormat::TarGz);
        assert_eq!(filename, "frontend-rc1-main-1.2.3.tar.gz");
    }

    #[test]
    fn test_archive_filename_empty_tag() {
        let filename = archive_filename("frontend", Some(""), "main", "1.2.3", ArchiveFormat::Tar);
        assert_eq!(filename, "frontend-main-1.2.3.tar");
    }

    #[test]
    fn test_artifact_url() {
        let url = artifact_url(
            "https://store.example.com/artifacts",
            "frontend",
            "s3cret",
            "main",
            "frontend-main-1.2.3.tar",
        );
        assert_eq!(
            url,
            "https://store.example.com/artifacts/frontend-s3cret/main/frontend-main-1.2.3.tar"
        );
    }
}

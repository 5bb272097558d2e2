// src/commands/fetch.rs
//! Fetch published build artifacts from the store

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use crate::archive::ArchiveFormat;
use crate::config::{self, Config, Flags};
use crate::store::{self, StoreClient};

/// GET a previously published archive from the artifact store
///
/// The source URL is constructed exactly as `cmd_publish` constructs
/// its destination, so a fetch with the same configuration, tag, and
/// environment retrieves what the matching publish uploaded. The
/// archive is written to OUTPUT (default: the archive file name);
/// existing files are never overwritten.
pub fn cmd_fetch(
    flags: &Flags,
    output: Option<&str>,
    tag: Option<&str>,
    format_name: &str,
) -> Result<()> {
    let format = ArchiveFormat::from_name(format_name)?;
    let mut config = Config::load(flags)?;
    info!("fetching artifacts for {}", config.package.name);

    let branch = config::branch_from_env();
    if let Some(build) = config::build_number_from_env() {
        config.package.version = format!("{}.{build}", config.package.version);
    }

    let filename = store::archive_filename(
        &config.package.name,
        tag,
        &branch,
        &config.package.version,
        format,
    );
    let url = store::artifact_url(
        &config.store_url,
        &config.package.name,
        &config.secret,
        &branch,
        &filename,
    );
    let dest = output.unwrap_or(&filename);

    if config.verbose {
        println!("GET {url}");
    }

    if config.dry_run {
        println!("Archive would be fetched from\n\n  {url}\n");
        return Ok(());
    }

    let client = StoreClient::new()?;
    let written = client
        .download_to_file(&url, Path::new(dest), config.credentials.as_ref())
        .context("failed to fetch the archive")?;

    println!("Wrote {written} bytes to {dest}");
    Ok(())
}

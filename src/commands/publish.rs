// src/commands/publish.rs
//! Publish build artifacts to the store

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use crate::archive::{self, ArchiveFormat, PackOptions};
use crate::config::{self, Config, Flags};
use crate::store::{self, StoreClient};

/// Pack ARTIFACTS_DIR and PUT the archive to the artifact store
///
/// The destination is
/// `{store_url}/{name}-{secret}/{branch}/{name}[-TAG]-{branch}-{version}.{ext}`
/// with the branch taken from `$BRANCH` and `$BUILD_NUMBER` appended
/// to the version when set. In dry-run mode the archive is still
/// packed (headers only) and the destination printed, but nothing is
/// uploaded.
pub fn cmd_publish(
    flags: &Flags,
    artifacts_dir: &str,
    tag: Option<&str>,
    format_name: &str,
) -> Result<()> {
    let format = ArchiveFormat::from_name(format_name)?;
    let mut config = Config::load(flags)?;
    info!("publishing artifacts for {}", config.package.name);

    let branch = config::branch_from_env();
    if let Some(build) = config::build_number_from_env() {
        config.package.version = format!("{}.{build}", config.package.version);
    }

    let options = PackOptions {
        dry_run: config.dry_run,
        verbose: config.verbose,
    };
    let archive = archive::pack(Path::new(artifacts_dir), format, &options)
        .context("failed to create the artifacts archive")?;

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

    if config.verbose {
        println!("PUT {url}");
    }

    if config.dry_run {
        archive::remove_archive(archive.path());
        println!("Archive uploaded to\n\n  {url}\n");
        return Ok(());
    }

    let size = archive.size()?;
    let (file, staging_path) = archive.into_parts();

    let client = StoreClient::new()?;
    let uploaded = client.put(&url, file, size, config.credentials.as_ref());

    // The staging file is done with either way; removal failure is a
    // warning, upload failure is the error that matters.
    archive::remove_archive(&staging_path);
    uploaded.context("failed to upload the archive")?;

    println!("Archive uploaded to\n\n  {url}\n");
    Ok(())
}

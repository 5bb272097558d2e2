// src/commands/extension.rs
//! Browser extension helpers
//!
//! Small subcommands around packaged browser extensions: manifest
//! metadata extraction, package download (with optional container
//! unwrapping), package-descriptor generation, and VERSIONINFO
//! resource generation.

use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::Path;
use tracing::debug;

use crate::config::Flags;
use crate::container;
use crate::manifest::{self, PackageInfo};
use crate::resource::VersionResource;
use crate::store::StoreClient;

/// Extension store URL template; the placeholder is replaced by the
/// extension id.
const PACKAGE_URL_TEMPLATE: &str =
    "https://clients2.google.com/service/update2/crx?response=redirect&x=id%3D~~~~%26uc";
const ID_PLACEHOLDER: &str = "~~~~";

/// Print the name field of an extension manifest
///
/// No trailing newline: the output is meant for shell substitution.
pub fn cmd_extension_name(manifest: &str) -> Result<()> {
    let info = PackageInfo::load(Path::new(manifest))?;
    print!("{}", info.name);
    Ok(())
}

/// Print the version field of an extension manifest
pub fn cmd_extension_version(manifest: &str) -> Result<()> {
    let info = PackageInfo::load(Path::new(manifest))?;
    print!("{}", info.version);
    Ok(())
}

/// Download a packaged extension and write it to a local file
///
/// Accepts either `EXTENSION_ID FILENAME` (store URL template) or
/// `FILENAME` with `--url`. With `unwrap`, the container prelude is
/// stripped and only the embedded zip payload reaches the file.
pub fn cmd_extension_fetch(
    flags: &Flags,
    extension_id: Option<&str>,
    filename: Option<&str>,
    url: Option<&str>,
    unwrap: bool,
) -> Result<()> {
    // Two positional forms share the argument slots: with --url the
    // single positional is the filename.
    let (url, filename) = match (extension_id, filename, url) {
        (Some(_), Some(filename), Some(url)) => (url.to_string(), filename),
        (Some(id), Some(filename), None) => {
            (PACKAGE_URL_TEMPLATE.replacen(ID_PLACEHOLDER, id, 1), filename)
        }
        (Some(filename), None, Some(url)) => (url.to_string(), filename),
        _ => bail!("expected EXTENSION_ID and FILENAME, or --url URL and FILENAME"),
    };

    if flags.verbose {
        println!("GET {url}");
    }
    if flags.dry_run {
        return Ok(());
    }

    let client = StoreClient::new()?;
    let mut response = client
        .get(&url, None)
        .context("failed to download the extension package")?;

    let mut file = super::create_new(Path::new(filename))?;

    if unwrap {
        let header = container::strip_header(&mut response)
            .context("failed to unwrap the extension container")?;
        debug!(
            "stripped container header (version {}, key {} bytes, signature {} bytes)",
            header.version, header.public_key_len, header.signature_len
        );
    }

    let written = io::copy(&mut response, &mut file)
        .with_context(|| format!("failed to write {filename}"))?;

    println!("Wrote {written} bytes to {filename}");
    Ok(())
}

/// Package descriptor written by `gen-package`
#[derive(Serialize)]
struct PackageDescriptor {
    name: String,
    version: String,
    dependencies: BTreeMap<String, String>,
}

/// Generate package.json in the working directory from an extension
/// manifest
///
/// The manifest name is lowercased with spaces turned into dashes and
/// the version normalized to `a.b.c[-d]`. Dependencies come from
/// repeated `--dep NAME:VERSION` flags; duplicate names are rejected.
pub fn cmd_extension_gen_package(manifest: &str, deps: &[String]) -> Result<()> {
    let info = PackageInfo::load(Path::new(manifest))?;

    let mut dependencies = BTreeMap::new();
    for dep in deps {
        let (name, version) = dep
            .split_once(':')
            .ok_or_else(|| anyhow!("invalid dependency {dep:?} (expected NAME:VERSION)"))?;
        if let Some(previous) = dependencies.insert(name.to_string(), version.to_string()) {
            bail!("dependency {name} already set to {previous}");
        }
    }

    let descriptor = PackageDescriptor {
        name: manifest::descriptor_name(&info.name),
        version: manifest::descriptor_version(&info.version)?,
        dependencies,
    };

    let content =
        serde_json::to_string_pretty(&descriptor).context("failed to serialize package.json")?;

    let mut file = super::create_new(Path::new("package.json"))?;
    file.write_all(content.as_bytes())
        .context("failed to write package.json")?;

    println!("package.json created");
    Ok(())
}

/// Generate a Windows VERSIONINFO resource file
pub fn cmd_extension_gen_version_rc(manifest: Option<&str>, output: &str) -> Result<()> {
    let manifest_version = match manifest {
        Some(path) => Some(PackageInfo::load(Path::new(path))?.version),
        None => None,
    };

    let resource = VersionResource::from_env(manifest_version.as_deref())?;

    let mut file = super::create_new(Path::new(output))?;
    file.write_all(resource.render().as_bytes())
        .with_context(|| format!("failed to write {output}"))?;

    println!("{output} created");
    Ok(())
}

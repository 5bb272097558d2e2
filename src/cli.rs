// src/cli.rs
//! CLI definitions for the stowage artifact manager
//!
//! This module contains all command-line interface definitions using
//! clap. The actual command implementations are in the `commands`
//! module.

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "stowage")]
#[command(author = "Stowage Project")]
#[command(version)]
#[command(
    about = "A build artifact manager that packs, publishes, and fetches project artifacts",
    long_about = "Stowage packs a directory of build artifacts into a tar or tar.gz \
                  archive and publishes it to (or fetches it from) an HTTP artifact \
                  store, using HTTP PUT and GET with optional Basic authentication. \
                  Credentials and the store location come from package.json, \
                  ~/.stowagerc, ./.stowagerc, and command-line flags, in that order. \
                  Set STOWAGE_USER_CONFIG to relocate the user rc file."
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalFlags,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Flags shared by every subcommand
#[derive(Args)]
pub struct GlobalFlags {
    /// Print verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Go through the motions without uploading or downloading
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Basic auth username (overrides the rc files)
    #[arg(long, global = true)]
    pub username: Option<String>,

    /// Basic auth password (overrides the rc files)
    #[arg(long, global = true)]
    pub password: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Pack a directory of build artifacts and upload it to the store
    Publish {
        /// Directory containing the build artifacts
        artifacts_dir: String,

        /// Tag to include in the archive file name
        #[arg(long)]
        tag: Option<String>,

        /// Archive format: tar or tar.gz
        #[arg(long, default_value = "tar")]
        format: String,
    },

    /// Download a previously published artifacts archive
    Fetch {
        /// Output file (default: the archive file name)
        output: Option<String>,

        /// Tag used in the archive file name
        #[arg(long)]
        tag: Option<String>,

        /// Archive format: tar or tar.gz
        #[arg(long, default_value = "tar")]
        format: String,
    },

    /// Browser extension helpers
    #[command(subcommand)]
    Extension(ExtensionCommands),
}

#[derive(Subcommand)]
pub enum ExtensionCommands {
    /// Print the name field of an extension manifest
    Name {
        /// Path to the extension manifest (manifest.json)
        manifest: String,
    },

    /// Print the version field of an extension manifest
    Version {
        /// Path to the extension manifest (manifest.json)
        manifest: String,
    },

    /// Download a packaged extension from the extension store
    ///
    /// With EXTENSION_ID the download URL comes from the store URL
    /// template; with --url the package is fetched from that URL
    /// instead and only FILENAME is expected.
    Fetch {
        /// Extension id substituted into the store URL template
        extension_id: Option<String>,

        /// Destination file (refuses to overwrite)
        filename: Option<String>,

        /// Download from this URL instead of the store template
        #[arg(long)]
        url: Option<String>,

        /// Strip the container header and keep the embedded zip payload
        #[arg(long)]
        unwrap: bool,
    },

    /// Generate package.json from an extension manifest
    GenPackage {
        /// Path to the extension manifest (manifest.json)
        manifest: String,

        /// Add a dependency; may be repeated
        #[arg(long = "dep", value_name = "NAME:VERSION")]
        deps: Vec<String>,
    },

    /// Generate a Windows VERSIONINFO resource file
    ///
    /// The resource context comes from VRC_COMPANYNAME,
    /// VRC_FILEDESCRIPTION, VRC_VERSION, VRC_LEGALCOPYRIGHT,
    /// VRC_PRODUCTNAME, and optionally VRC_INTERNALNAME; BUILD_NUMBER
    /// (default 0) becomes the fourth version component. With
    /// --manifest the version is read from an extension manifest
    /// instead of VRC_VERSION.
    GenVersionRc {
        /// Output file (refuses to overwrite)
        #[arg(default_value = "version.rc")]
        output: String,

        /// Read the version from this extension manifest
        #[arg(long)]
        manifest: Option<String>,
    },
}

// src/main.rs

use anyhow::Result;
use clap::Parser;

use stowage::cli::{Cli, Commands, ExtensionCommands};
use stowage::commands;
use stowage::config::Flags;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing subscriber for logging; --verbose raises the
    // default level, RUST_LOG still wins when set.
    let default_filter = if cli.global.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    let flags = Flags {
        verbose: cli.global.verbose,
        dry_run: cli.global.dry_run,
        username: cli.global.username.clone(),
        password: cli.global.password.clone(),
    };

    match cli.command {
        Some(Commands::Publish {
            artifacts_dir,
            tag,
            format,
        }) => commands::cmd_publish(&flags, &artifacts_dir, tag.as_deref(), &format),
        Some(Commands::Fetch {
            output,
            tag,
            format,
        }) => commands::cmd_fetch(&flags, output.as_deref(), tag.as_deref(), &format),
        Some(Commands::Extension(extension)) => match extension {
            ExtensionCommands::Name { manifest } => commands::cmd_extension_name(&manifest),
            ExtensionCommands::Version { manifest } => commands::cmd_extension_version(&manifest),
            ExtensionCommands::Fetch {
                extension_id,
                filename,
                url,
                unwrap,
            } => commands::cmd_extension_fetch(
                &flags,
                extension_id.as_deref(),
                filename.as_deref(),
                url.as_deref(),
                unwrap,
            ),
            ExtensionCommands::GenPackage { manifest, deps } => {
                commands::cmd_extension_gen_package(&manifest, &deps)
            }
            ExtensionCommands::GenVersionRc { output, manifest } => {
                commands::cmd_extension_gen_version_rc(manifest.as_deref(), &output)
            }
        },
        None => {
            // No command provided, show a pointer to the help.
            println!("stowage v{}", env!("CARGO_PKG_VERSION"));
            println!("Run 'stowage --help' for usage information");
            Ok(())
        }
    }
}

// src/commands/mod.rs
//! Command handlers for the stowage CLI

mod extension;
mod fetch;
mod publish;

// Re-export all command handlers
pub use extension::{
    cmd_extension_fetch, cmd_extension_gen_package, cmd_extension_gen_version_rc,
    cmd_extension_name, cmd_extension_version,
};
pub use fetch::cmd_fetch;
pub use publish::cmd_publish;

use anyhow::{Context, Result};
use std::fs::File;
use std::path::Path;

/// Open `path` for writing, refusing to overwrite an existing file
pub(crate) fn create_new(path: &Path) -> Result<File> {
    File::options()
        .write(true)
        .create_new(true)
        .open(path)
        .with_context(|| format!("failed to create {}", path.display()))
}

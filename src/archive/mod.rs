// src/archive/mod.rs
//! Artifact archive construction
//!
//! Packs a directory of build artifacts into a single archive file
//! (plain tar, or gzip-compressed tar). The archive is staged in a
//! uniquely named temporary file in the current working directory,
//! rewound to offset 0, and handed back as a [`PackedArchive`] ready
//! to be streamed to the artifact store.
//!
//! The walk is deterministic: depth-first, parents before children,
//! siblings in byte-lexicographic order. This makes archive output
//! reproducible for a given source tree.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use tar::{Builder as TarBuilder, EntryType, Header};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Prefix for the staged archive file created in the working directory.
/// The tempfile machinery appends a random suffix, so concurrent
/// invocations in the same directory never collide.
const TEMP_PREFIX: &str = "artifacts_archive_";

/// Archive-construction errors
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("artifacts directory not found: {}", .0.display())]
    SourceMissing(PathBuf),

    #[error("no artifacts found in {}", .0.display())]
    NoArtifacts(PathBuf),

    #[error("unknown archive format: {0}")]
    UnknownFormat(String),

    #[error("failed to archive {}: {}", .path.display(), .source)]
    Walk {
        path: PathBuf,
        source: io::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Supported archive formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// Plain tar (.tar)
    Tar,
    /// Gzip-compressed tar (.tar.gz)
    TarGz,
}

impl ArchiveFormat {
    /// Resolve an archive format from its command-line name
    ///
    /// # Examples
    /// ```
    /// use stowage::archive::ArchiveFormat;
    ///
    /// assert_eq!(ArchiveFormat::from_name("tar").unwrap(), ArchiveFormat::Tar);
    /// assert_eq!(ArchiveFormat::from_name("tar.gz").unwrap(), ArchiveFormat::TarGz);
    /// assert_eq!(ArchiveFormat::from_name("tgz").unwrap(), ArchiveFormat::TarGz);
    /// assert!(ArchiveFormat::from_name("zip").is_err());
    /// ```
    pub fn from_name(name: &str) -> Result<Self, ArchiveError> {
        match name {
            "tar" => Ok(Self::Tar),
            "tar.gz" | "tgz" => Ok(Self::TarGz),
            other => Err(ArchiveError::UnknownFormat(other.to_string())),
        }
    }

    /// File extension used in archive filenames
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Tar => "tar",
            Self::TarGz => "tar.gz",
        }
    }

    /// Human-readable name for this format
    pub fn name(&self) -> &'static str {
        match self {
            Self::Tar => "tar",
            Self::TarGz => "tar.gz",
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Per-invocation packing options, passed explicitly into [`pack`]
#[derive(Debug, Clone, Copy, Default)]
pub struct PackOptions {
    /// Write headers only: entry sizes are forced to zero and file
    /// contents are skipped, producing a cheap structural preview.
    pub dry_run: bool,
    /// List every archived entry at info level.
    pub verbose: bool,
}

/// A finished archive: an open file rewound to offset 0, plus the
/// path of the staging file. The caller owns removal of the staging
/// file once the archive has been consumed (see [`remove_archive`]).
#[derive(Debug)]
pub struct PackedArchive {
    file: File,
    path: PathBuf,
}

impl PackedArchive {
    /// Path of the staging file backing this archive
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Total archive size in bytes
    pub fn size(&self) -> io::Result<u64> {
        self.file.metadata().map(|m| m.len())
    }

    /// Split into the open file and the staging path. The file is
    /// positioned at offset 0; the path remains the caller's to remove.
    pub fn into_parts(self) -> (File, PathBuf) {
        (self.file, self.path)
    }
}

impl Read for PackedArchive {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

/// Remove an archive staging file, tolerating double removal
///
/// Removal failure (for instance because another owner already
/// removed the file) is logged as a warning, never an error.
pub fn remove_archive(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        warn!("failed to remove temporary archive {}: {}", path.display(), e);
    }
}

/// Pack a directory of build artifacts into an archive
///
/// Walks `src_dir` depth-first (parents before children, siblings in
/// byte-lexicographic order) and streams every entry into a staging
/// file in the current working directory. The root directory itself
/// is not emitted. On success the staging file is rewound to offset 0
/// and returned; on failure all writers are torn down, the staging
/// file is deleted, and the original error is propagated.
///
/// Fails with [`ArchiveError::SourceMissing`] when `src_dir` does not
/// exist and [`ArchiveError::NoArtifacts`] when it contains no entries.
pub fn pack(
    src_dir: &Path,
    format: ArchiveFormat,
    options: &PackOptions,
) -> Result<PackedArchive, ArchiveError> {
    probe_source(src_dir)?;

    let cwd = std::env::current_dir()?;
    let staging = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .tempfile_in(cwd)?;

    if options.verbose {
        info!("packing artifacts from {}", src_dir.display());
    }

    // Writers borrow the staging file so it survives their teardown.
    // An early return drops the builders (close errors suppressed in
    // favor of the original error) and then the staging guard, which
    // deletes the partial file. Only the success path reaches keep().
    match format {
        ArchiveFormat::Tar => {
            let mut builder = TarBuilder::new(staging.as_file());
            append_tree(&mut builder, src_dir, options)?;
            builder.into_inner()?;
        }
        ArchiveFormat::TarGz => {
            let encoder = GzEncoder::new(staging.as_file(), Compression::default());
            let mut builder = TarBuilder::new(encoder);
            append_tree(&mut builder, src_dir, options)?;
            // Inner tar writer before outer gzip writer, or the
            // end-of-archive blocks never reach the compressor.
            builder.into_inner()?.finish()?;
        }
    }

    if options.verbose {
        info!("archive created");
    }

    let (mut file, path) = staging.keep().map_err(|e| ArchiveError::Io(e.error))?;
    file.seek(SeekFrom::Start(0))?;

    Ok(PackedArchive { file, path })
}

/// Fail fast when the source directory is missing or empty
///
/// Reads at most one directory entry; this is a probe, not a pre-scan.
fn probe_source(src_dir: &Path) -> Result<(), ArchiveError> {
    let mut entries = fs::read_dir(src_dir).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            ArchiveError::SourceMissing(src_dir.to_path_buf())
        } else {
            ArchiveError::Walk {
                path: src_dir.to_path_buf(),
                source: e,
            }
        }
    })?;

    match entries.next() {
        None => Err(ArchiveError::NoArtifacts(src_dir.to_path_buf())),
        Some(Err(e)) => Err(ArchiveError::Walk {
            path: src_dir.to_path_buf(),
            source: e,
        }),
        Some(Ok(_)) => Ok(()),
    }
}

/// Stream every node under `src_dir` into the tar builder
fn append_tree<W: Write>(
    builder: &mut TarBuilder<W>,
    src_dir: &Path,
    options: &PackOptions,
) -> Result<(), ArchiveError> {
    let walker = WalkDir::new(src_dir).min_depth(1).sort_by_file_name();

    for entry in walker {
        let entry = entry.map_err(|e| walk_error(e, src_dir))?;
        let relative = entry
            .path()
            .strip_prefix(src_dir)
            .expect("walk entries live under the source root");

        let file_type = entry.file_type();
        let name = entry_name(relative, file_type.is_dir());

        if options.verbose {
            info!("    {name}");
        } else {
            debug!("    {name}");
        }

        let metadata = entry.metadata().map_err(|e| walk_error(e, src_dir))?;
        let mut header = Header::new_gnu();
        header.set_metadata(&metadata);

        let entry_path = entry.path();
        let write_err = |source: io::Error| ArchiveError::Walk {
            path: entry_path.to_path_buf(),
            source,
        };

        if file_type.is_dir() {
            header.set_entry_type(EntryType::Directory);
            header.set_size(0);
            builder
                .append_data(&mut header, Path::new(&name), io::empty())
                .map_err(write_err)?;
        } else if file_type.is_symlink() {
            let target = fs::read_link(entry_path).map_err(write_err)?;
            header.set_entry_type(EntryType::Symlink);
            header.set_size(0);
            builder
                .append_link(&mut header, Path::new(&name), &target)
                .map_err(write_err)?;
        } else if options.dry_run {
            header.set_size(0);
            builder
                .append_data(&mut header, Path::new(&name), io::empty())
                .map_err(write_err)?;
        } else {
            let file = File::open(entry_path).map_err(write_err)?;
            builder
                .append_data(&mut header, Path::new(&name), file)
                .map_err(write_err)?;
        }
    }

    Ok(())
}

/// Archive entry name: relative path with forward slashes, trailing
/// slash on directories (tar always uses '/' regardless of host OS)
fn entry_name(relative: &Path, is_dir: bool) -> String {
    let mut name = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    if is_dir {
        name.push('/');
    }
    name
}

fn walk_error(e: walkdir::Error, src_dir: &Path) -> ArchiveError {
    let path = e
        .path()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| src_dir.to_path_buf());
    match e.into_io_error() {
        Some(source) => ArchiveError::Walk { path, source },
        None => ArchiveError::Walk {
            path,
            source: io::Error::other("filesystem loop detected"),
        },
    }
}

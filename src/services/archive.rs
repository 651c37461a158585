//! Zip extraction and entry point discovery for uploaded game packages.

use std::{
    fs::{self, File},
    io,
    path::{Path, PathBuf},
};

use thiserror::Error;
use tokio::task;
use tracing::{debug, warn};
use walkdir::WalkDir;
use zip::{ZipArchive, result::ZipError};

/// File that makes an extracted package playable.
pub const ENTRY_POINT: &str = "index.html";
/// Directories deeper than this are not searched for the entry point.
pub const MAX_ENTRY_POINT_DEPTH: usize = 32;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive does not contain an {ENTRY_POINT} entry point")]
    MissingEntryPoint,
    #[error("invalid zip archive")]
    InvalidArchive(#[source] ZipError),
    #[error("I/O error on `{path}`")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("extraction task failed")]
    Join(#[source] task::JoinError),
}

impl ArchiveError {
    fn io(path: &Path) -> impl FnOnce(io::Error) -> Self + '_ {
        move |source| ArchiveError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Extract `archive` into `destination` on the blocking pool and return the directory holding
/// the entry point, relative to `destination` (empty when it sits at the root).
pub async fn extract(archive: PathBuf, destination: PathBuf) -> Result<PathBuf, ArchiveError> {
    task::spawn_blocking(move || extract_blocking(&archive, &destination))
        .await
        .map_err(ArchiveError::Join)?
}

pub fn extract_blocking(archive: &Path, destination: &Path) -> Result<PathBuf, ArchiveError> {
    unpack(archive, destination)?;
    find_entry_point(destination)?.ok_or(ArchiveError::MissingEntryPoint)
}

fn unpack(archive: &Path, destination: &Path) -> Result<(), ArchiveError> {
    let file = File::open(archive).map_err(ArchiveError::io(archive))?;
    let mut zip = ZipArchive::new(file).map_err(ArchiveError::InvalidArchive)?;
    fs::create_dir_all(destination).map_err(ArchiveError::io(destination))?;

    for index in 0..zip.len() {
        let mut entry = zip.by_index(index).map_err(ArchiveError::InvalidArchive)?;
        let Some(relative) = entry.enclosed_name() else {
            warn!(
                archive = %archive.display(),
                entry = entry.name(),
                "skipping zip entry escaping the destination"
            );
            continue;
        };
        let target = destination.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(ArchiveError::io(&target))?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(ArchiveError::io(parent))?;
        }
        let mut out = File::create(&target).map_err(ArchiveError::io(&target))?;
        io::copy(&mut entry, &mut out).map_err(ArchiveError::io(&target))?;
    }

    debug!(
        archive = %archive.display(),
        destination = %destination.display(),
        entries = zip.len(),
        "archive unpacked"
    );
    Ok(())
}

/// Depth-first search for [`ENTRY_POINT`], matched case-insensitively. At each level files are
/// visited before subdirectories and names in lexical order, so the shallowest match wins.
pub fn find_entry_point(root: &Path) -> Result<Option<PathBuf>, ArchiveError> {
    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(MAX_ENTRY_POINT_DEPTH)
        .sort_by(|a, b| {
            a.file_type()
                .is_dir()
                .cmp(&b.file_type().is_dir())
                .then_with(|| a.file_name().cmp(b.file_name()))
        });

    for entry in walker {
        let entry = entry.map_err(|err| {
            let path = err.path().unwrap_or(root).to_path_buf();
            ArchiveError::Io {
                path,
                source: err.into(),
            }
        })?;
        let is_entry_point = entry.file_type().is_file()
            && entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.eq_ignore_ascii_case(ENTRY_POINT));
        if !is_entry_point {
            continue;
        }

        let parent = entry.path().parent().unwrap_or(root);
        let relative = parent.strip_prefix(root).unwrap_or(Path::new(""));
        return Ok(Some(relative.to_path_buf()));
    }

    Ok(None)
}

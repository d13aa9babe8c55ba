//! Archive creation.
//!
//! Packages a resolved file set into a single gzip-compressed tar archive
//! inside a staging directory. Entry names keep each file's own path
//! (minus any leading `/`, which tar requires stripped) so extraction
//! reproduces the directory structure.

use crate::error::EngineError;
use crate::model::{ARCHIVE_EXTENSION, ARCHIVE_FILENAME_PREFIX, ARCHIVE_TIMESTAMP_FORMAT};
use chrono::Local;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::collections::BTreeSet;
use std::fs::File;
use std::path::{Path, PathBuf};
use tar::Builder as TarBuilder;

/// Create one archive in `staging_dir` containing every file in `files`.
///
/// The filename is `archive<YYYYMMDDHHMMSS>.tar.gz`, with the timestamp
/// captured once per archive so the retention sweeper can parse it back.
/// Callers own `staging_dir` and discard it wholesale on failure, so no
/// extra partial-file handling happens here.
///
/// # Errors
/// Returns `EngineError` if the archive file cannot be created or any
/// entry fails to append.
pub fn create_archive(
    files: &BTreeSet<PathBuf>,
    staging_dir: &Path,
) -> Result<PathBuf, EngineError> {
    let timestamp = Local::now().format(ARCHIVE_TIMESTAMP_FORMAT);
    let filename = format!("{ARCHIVE_FILENAME_PREFIX}{timestamp}{ARCHIVE_EXTENSION}");
    let archive_path = staging_dir.join(&filename);

    let file = File::create(&archive_path).map_err(|e| EngineError::WriteError {
        path: archive_path.clone(),
        source: e,
    })?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = TarBuilder::new(encoder);

    for path in files {
        // Tar entry names must be relative; keep the rest of the path
        // intact so extraction rebuilds the tree.
        let entry_name = path.strip_prefix("/").unwrap_or(path.as_path());
        builder
            .append_path_with_name(path, entry_name)
            .map_err(|e| EngineError::ArchiveWriteFailed {
                path: path.clone(),
                source: e,
            })?;
    }

    let encoder = builder
        .into_inner()
        .map_err(|e| EngineError::ArchiveWriteFailed {
            path: archive_path.clone(),
            source: e,
        })?;
    encoder.finish().map_err(|e| EngineError::WriteError {
        path: archive_path.clone(),
        source: e,
    })?;

    Ok(archive_path)
}

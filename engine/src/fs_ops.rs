//! Filesystem operations: archive replication and directory helpers.

use crate::error::EngineError;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Copy an archive into a destination directory, creating the directory
/// (including parents) if absent. The archive keeps its base filename and
/// its modification time.
///
/// # Returns
/// Path of the copied file inside `destination_dir`.
///
/// # Errors
/// Returns `EngineError` if the archive is missing, the directory cannot
/// be created, or the copy itself fails. Failures are fatal for this
/// destination only; callers continue with the remaining destinations.
pub fn copy_to_destination(archive: &Path, destination_dir: &Path) -> Result<PathBuf, EngineError> {
    let metadata = match fs::metadata(archive) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(EngineError::ArchiveNotFound {
                path: archive.to_path_buf(),
            });
        }
        Err(e) => {
            return Err(EngineError::ReadError {
                path: archive.to_path_buf(),
                source: e,
            });
        }
    };

    ensure_dir_exists(destination_dir)?;

    let filename = archive
        .file_name()
        .ok_or_else(|| EngineError::ArchiveNotFound {
            path: archive.to_path_buf(),
        })?;
    let target = destination_dir.join(filename);

    // The copy can fail on either side; name both in the error.
    fs::copy(archive, &target).map_err(|e| EngineError::CopyFailed {
        from: archive.to_path_buf(),
        to: target.clone(),
        source: e,
    })?;

    // Preserve modification time if available
    if let Ok(mtime) = metadata.modified() {
        let _ = filetime::set_file_mtime(&target, filetime::FileTime::from_system_time(mtime));
    }

    Ok(target)
}

/// Ensure a directory exists, creating it recursively if necessary.
///
/// # Errors
/// Returns `EngineError::DirectoryCreationFailed` if creation fails or the
/// path exists but is not a directory.
pub fn ensure_dir_exists(dir: &Path) -> Result<(), EngineError> {
    match fs::metadata(dir) {
        Ok(metadata) => {
            if metadata.is_dir() {
                Ok(())
            } else {
                Err(EngineError::DirectoryCreationFailed {
                    path: dir.to_path_buf(),
                    source: io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "Path exists but is not a directory",
                    ),
                })
            }
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            fs::create_dir_all(dir).map_err(|e| EngineError::DirectoryCreationFailed {
                path: dir.to_path_buf(),
                source: e,
            })
        }
        Err(e) => Err(EngineError::DirectoryCreationFailed {
            path: dir.to_path_buf(),
            source: e,
        }),
    }
}

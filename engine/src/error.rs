//! Error types for the backup engine.
//!
//! The primary error type is `EngineError`. Expected failure modes
//! (unknown selector ids, per-destination copy failures) are recorded in
//! the run report and the error log instead; `EngineError` covers the
//! conditions that stop an operation outright.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can stop an engine operation.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration file is absent at startup
    #[error("Config file not found. Please ensure that the file is present: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Configuration file could not be read
    #[error("Failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Configuration file is not valid JSON
    #[error("Invalid JSON format: {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// An include or exclude pattern failed to compile
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// File to replicate does not exist
    #[error("Archive not found: {path}")]
    ArchiveNotFound { path: PathBuf },

    /// Failed to create a directory
    #[error("Failed to create directory: {path}")]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to read from a source file
    #[error("Failed to read file: {path}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to write to a destination file
    #[error("Failed to write file: {path}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to copy a file to a destination
    #[error("Failed to copy {from} to {to}")]
    CopyFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to append an entry to the archive
    #[error("Failed to archive file: {path}")]
    ArchiveWriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A selected profile resolved to zero files; fatal for the whole run
    #[error("No files found for profile \"{profile}\". Please check the configuration file")]
    NoFilesFound { profile: String },
}

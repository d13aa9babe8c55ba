//! # FileSystemBackup Engine
//!
//! A headless library for profile-driven file-system backups.
//!
//! ## Overview
//!
//! The engine implements the whole backup pipeline:
//! - File selection by include globs and ignore patterns
//! - Packaging a file set into one timestamped `.tar.gz` archive
//! - Replicating the archive to any number of destination directories
//! - Retention sweeps that prune archives older than a per-destination age
//!
//! All operations take explicit paths; the engine never changes the
//! process working directory.
//!
//! ## Basic Usage
//!
//! ```no_run
//! use engine::{BackupConfig, RunLog, RunOptions, run_backup};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), engine::EngineError> {
//! let log = RunLog::new("20240101120000");
//! let config = BackupConfig::load(Path::new("config.json"), &log)?;
//!
//! let report = run_backup(&config, &RunOptions::default(), &log)?;
//! println!(
//!     "{} profiles backed up, {} old archives removed",
//!     report.profiles.len(),
//!     report.swept_files
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - **model**: Core data structures (Profile, Destination, RunReport)
//! - **error**: Error types and handling
//! - **config**: JSON configuration loading and validation
//! - **select**: Include/exclude pattern resolution
//! - **archive**: Archive creation
//! - **fs_ops**: Replication and directory helpers
//! - **retention**: Age-based archive pruning
//! - **logging**: Console hints plus the durable CSV error log
//! - **job**: Run orchestration

pub mod archive;
pub mod config;
pub mod error;
pub mod fs_ops;
pub mod job;
pub mod logging;
pub mod model;
pub mod retention;
pub mod select;

// Re-export main types and functions
pub use config::BackupConfig;
pub use error::EngineError;
pub use job::{run_backup, select_destinations, select_profiles};
pub use logging::RunLog;
pub use model::{
    Destination, DestinationFailure, Profile, ProfileOutcome, RunOptions, RunReport,
    ARCHIVE_EXTENSION, ARCHIVE_FILENAME_PREFIX, ARCHIVE_TIMESTAMP_FORMAT, BACKUP_DIR_PREFIX,
};
pub use retention::{parse_archive_timestamp, sweep_destination, SweepStats};
pub use select::resolve_file_set;

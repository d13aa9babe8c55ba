//! Core data model for backup runs.
//!
//! This module defines the main data structures for representing backup
//! operations:
//! - Profile: a named source-selection policy (include/exclude patterns)
//! - Destination: a named target directory with its own retention policy
//! - RunOptions, RunReport: input and outcome of one orchestrated run

use std::path::PathBuf;

/// Prefix of the per-profile folder created under each destination.
pub const BACKUP_DIR_PREFIX: &str = "BACKUP_";

/// Prefix of every archive filename produced by the archiver.
pub const ARCHIVE_FILENAME_PREFIX: &str = "archive";

/// Extension of every archive filename produced by the archiver.
///
/// The retention sweeper slices the timestamp out of filenames between
/// [`ARCHIVE_FILENAME_PREFIX`] and this extension, so the two must stay in
/// sync with whatever the archiver writes.
pub const ARCHIVE_EXTENSION: &str = ".tar.gz";

/// Timestamp format embedded in archive filenames (`YYYYMMDDHHMMSS`).
pub const ARCHIVE_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// A named source-selection policy for one logical backup job.
///
/// Profiles are constructed once from configuration at startup and are
/// immutable afterward. A profile with an empty `source` list is invalid
/// and never reaches a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    /// Unique identifier (deduplicated by suffixing an index on collision)
    pub id: String,

    /// Whether this profile participates in unselected runs
    pub active: bool,

    /// Ordered list of include patterns (paths, directories or globs)
    pub source: Vec<String>,

    /// Ordered list of exclude glob patterns
    pub ignore: Vec<String>,
}

/// A named target directory with its own retention policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    /// Unique identifier (deduplicated by suffixing an index on collision)
    pub id: String,

    /// Whether this destination participates in unselected runs
    pub active: bool,

    /// Target directory; its parent must be writable at load time
    pub directory: PathBuf,

    /// Archives older than this many days are pruned; values < 1 disable
    /// cleanup for this destination
    pub days_to_keep: i64,
}

/// User-facing options for one backup run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Perform selection and reporting only; no archive or replication
    pub dry_run: bool,

    /// Restrict the run to a single profile id
    pub profile: Option<String>,

    /// Restrict the run to the given destination ids (empty = all active)
    pub destinations: Vec<String>,
}

/// Outcome of one profile within a run.
#[derive(Debug, Clone)]
pub struct ProfileOutcome {
    /// Profile this outcome belongs to
    pub profile_id: String,

    /// Number of files the pattern matcher resolved
    pub files_found: usize,

    /// Base filename of the created archive (None in dry-run mode)
    pub archive_name: Option<String>,

    /// Ids of destinations that received the archive
    pub replicated_to: Vec<String>,

    /// Per-destination failures; these never stop the other destinations
    pub failures: Vec<DestinationFailure>,
}

/// One failed replication attempt.
#[derive(Debug, Clone)]
pub struct DestinationFailure {
    /// Destination the copy was attempted to
    pub destination_id: String,

    /// Human-readable failure description
    pub message: String,
}

/// Summary of an entire backup run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Per-profile outcomes, in processing order
    pub profiles: Vec<ProfileOutcome>,

    /// Set when a profile resolved to zero files and the run was aborted;
    /// holds the offending profile id
    pub aborted: Option<String>,

    /// Total number of archive files deleted by the retention sweep
    pub swept_files: usize,
}

impl RunReport {
    /// Returns true if any destination failed during replication.
    pub fn has_failures(&self) -> bool {
        self.profiles.iter().any(|p| !p.failures.is_empty())
    }
}

//! Retention sweep: delete archives older than a per-destination age.
//!
//! The sweeper walks a destination tree, descending only into the
//! `BACKUP_*` folders this tool creates, and deletes every archive whose
//! embedded timestamp is older than the configured number of days. It runs
//! over all configured destinations after every backup, independent of
//! which profiles or destinations the run targeted.

use crate::logging::RunLog;
use crate::model::{
    ARCHIVE_EXTENSION, ARCHIVE_FILENAME_PREFIX, ARCHIVE_TIMESTAMP_FORMAT, BACKUP_DIR_PREFIX,
};
use chrono::{Local, NaiveDateTime};
use std::fs;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Counters reported by one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// Archive files whose timestamp was examined
    pub examined: usize,

    /// Archive files deleted
    pub deleted: usize,
}

/// Parse the timestamp embedded in an archive filename.
///
/// Returns `None` for names that do not carry the archive prefix and
/// extension, or whose timestamp slice does not parse.
pub fn parse_archive_timestamp(filename: &str) -> Option<NaiveDateTime> {
    let stamp = filename
        .strip_prefix(ARCHIVE_FILENAME_PREFIX)?
        .strip_suffix(ARCHIVE_EXTENSION)?;
    NaiveDateTime::parse_from_str(stamp, ARCHIVE_TIMESTAMP_FORMAT).ok()
}

/// Delete archives under `destination_dir` older than `days_to_keep` days.
///
/// No-op when `days_to_keep < 1` or the directory does not exist. Only
/// subdirectories named `BACKUP_*` are descended into; files directly at
/// the top level are still visited. Files without the archive prefix, or
/// with an unparseable timestamp, are logged and left untouched; the
/// sweep never aborts over a single bad filename.
pub fn sweep_destination(destination_dir: &Path, days_to_keep: i64, log: &RunLog) -> SweepStats {
    let mut stats = SweepStats::default();

    if days_to_keep < 1 {
        return stats;
    }
    if !destination_dir.is_dir() {
        log.error(&format!(
            "Cleanup skipped, destination directory not found: {}",
            destination_dir.display()
        ));
        return stats;
    }

    let now = Local::now().naive_local();
    let walker = WalkDir::new(destination_dir).into_iter().filter_entry(|e| {
        // Filter decided before recursing; non-backup subdirectories are
        // pruned from traversal entirely.
        e.depth() == 0
            || !e.file_type().is_dir()
            || e.file_name()
                .to_string_lossy()
                .starts_with(BACKUP_DIR_PREFIX)
    });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log.error(&format!("Cleanup cannot read entry: {e}"));
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let filename = entry.file_name().to_string_lossy();
        if !filename.starts_with(ARCHIVE_FILENAME_PREFIX) {
            continue;
        }

        stats.examined += 1;
        let Some(file_datetime) = parse_archive_timestamp(&filename) else {
            log.error(&format!(
                "Cleanup cannot parse archive timestamp, file left in place: {}",
                entry.path().display()
            ));
            continue;
        };

        let age = now.signed_duration_since(file_datetime);
        if age.num_days() > days_to_keep {
            match fs::remove_file(entry.path()) {
                Ok(()) => {
                    debug!("Removed expired archive: {}", entry.path().display());
                    stats.deleted += 1;
                }
                Err(e) => {
                    log.error(&format!(
                        "Cleanup failed to remove {}: {e}",
                        entry.path().display()
                    ));
                }
            }
        }
    }

    stats
}

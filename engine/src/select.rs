//! File selection: expand include patterns, drop excluded paths.
//!
//! Include patterns are shell globs (`*`, `?`, `[...]`, `**`) and may name
//! files or directories; directories are descended recursively. Exclude
//! patterns are matched against the full candidate path with fnmatch-style
//! semantics, where `*` may span path separators.

use crate::error::EngineError;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// Resolve include/exclude patterns to a deduplicated set of file paths.
///
/// Each include pattern is expanded with glob semantics; every match that
/// is a directory contributes all files beneath it (the directories
/// themselves are not part of the result). A candidate is dropped when its
/// full path matches any exclude pattern.
///
/// An empty include list yields an empty set. A pattern matching zero
/// paths is silently skipped. Unreadable entries encountered mid-walk are
/// logged and skipped rather than failing the selection.
///
/// # Errors
/// Returns `EngineError::InvalidPattern` if a pattern fails to compile.
pub fn resolve_file_set(
    include_patterns: &[String],
    exclude_patterns: &[String],
) -> Result<BTreeSet<PathBuf>, EngineError> {
    let excludes = build_exclude_set(exclude_patterns)?;
    let mut files = BTreeSet::new();

    for pattern in include_patterns {
        let matches = glob::glob(pattern).map_err(|e| EngineError::InvalidPattern {
            pattern: pattern.clone(),
            reason: e.to_string(),
        })?;

        for entry in matches {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    warn!("Skipping unreadable match for '{pattern}': {e}");
                    continue;
                }
            };

            if path.is_dir() {
                collect_directory(&path, &excludes, &mut files);
            } else if !excludes.is_match(&path) {
                files.insert(path);
            }
        }
    }

    Ok(files)
}

/// Recursively collect all files under `dir` that pass the exclude set.
fn collect_directory(dir: &Path, excludes: &GlobSet, files: &mut BTreeSet<PathBuf>) {
    for entry in WalkDir::new(dir) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {e}", dir.display());
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }
        if excludes.is_match(entry.path()) {
            continue;
        }
        files.insert(entry.path().to_path_buf());
    }
}

/// Compile exclude patterns into one matcher.
///
/// `literal_separator` stays off so `*.tmp` matches `/any/depth/x.tmp`,
/// mirroring fnmatch.
fn build_exclude_set(patterns: &[String]) -> Result<GlobSet, EngineError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(false)
            .build()
            .map_err(|e| EngineError::InvalidPattern {
                pattern: pattern.clone(),
                reason: e.to_string(),
            })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| EngineError::InvalidPattern {
        pattern: patterns.join(", "),
        reason: e.to_string(),
    })
}

//! Run orchestration.
//!
//! One run walks through: select profiles, select destinations, back up
//! each profile (resolve files, archive, replicate), then sweep retention
//! over every configured destination. Profiles are processed strictly one
//! after another; destinations within a profile in list order. The staging
//! directory of each profile is exclusively owned by that profile's step
//! and removed on every exit path by `TempDir`'s scope.

use crate::archive::create_archive;
use crate::config::BackupConfig;
use crate::error::EngineError;
use crate::fs_ops::copy_to_destination;
use crate::logging::RunLog;
use crate::model::{
    BACKUP_DIR_PREFIX, Destination, DestinationFailure, Profile, ProfileOutcome, RunOptions,
    RunReport,
};
use crate::retention::sweep_destination;
use crate::select::resolve_file_set;

/// Resolve the profiles this run works on.
///
/// A requested id that is not configured is a selection error: logged, and
/// the run continues with an empty selection for that request. Without a
/// request, all active profiles are taken.
pub fn select_profiles<'a>(
    config: &'a BackupConfig,
    options: &RunOptions,
    log: &RunLog,
) -> Vec<&'a Profile> {
    match options.profile.as_deref().map(str::trim) {
        Some(requested) if !requested.is_empty() => match config.find_profile(requested) {
            Some(profile) => vec![profile],
            None => {
                log.error(&format!(
                    "Profile \"{requested}\" does not exist in config file"
                ));
                Vec::new()
            }
        },
        _ => config.profiles.iter().filter(|p| p.active).collect(),
    }
}

/// Resolve the destinations this run replicates to; symmetric to
/// [`select_profiles`], except each unknown id is skipped individually.
pub fn select_destinations<'a>(
    config: &'a BackupConfig,
    options: &RunOptions,
    log: &RunLog,
) -> Vec<&'a Destination> {
    if options.destinations.is_empty() {
        return config.destinations.iter().filter(|d| d.active).collect();
    }

    let mut selected = Vec::new();
    for requested in &options.destinations {
        match config.find_destination(requested.trim()) {
            Some(destination) => selected.push(destination),
            None => {
                log.error(&format!(
                    "Destination \"{requested}\" does not exist in config file"
                ));
            }
        }
    }
    selected
}

/// Execute one backup run.
///
/// Expected failure modes (unknown selector ids, zero files for a profile,
/// per-destination copy failures) are logged and recorded in the returned
/// report; they never surface as `Err`. Cleanup runs over every configured
/// destination regardless of the run's selection, except in dry-run mode
/// or when the run was a no-op.
///
/// # Errors
/// Returns `EngineError` only for unexpected conditions, e.g. a staging
/// directory that cannot be created.
pub fn run_backup(
    config: &BackupConfig,
    options: &RunOptions,
    log: &RunLog,
) -> Result<RunReport, EngineError> {
    if options.dry_run {
        log.hint("START Dry run backup process.");
    } else {
        log.hint("START Backup process.");
    }

    let profiles = select_profiles(config, options, log);
    let destinations = select_destinations(config, options, log);

    let mut report = RunReport::default();

    if profiles.is_empty() || destinations.is_empty() {
        // No-op run: zero side effects, not even a retention sweep.
        log.hint("Backup process completed. No valid and active profiles or destinations defined.");
        return Ok(report);
    }

    for profile in profiles {
        log.hint(&format!(
            "[{id}]:: Start backup of file system (profile: \"{id}\")",
            id = profile.id
        ));
        log.hint(&format!("[{}]:: Collecting files...", profile.id));

        let files = match resolve_file_set(&profile.source, &profile.ignore) {
            Ok(files) => files,
            Err(e) => {
                // A profile with broken patterns cannot be backed up;
                // treat it like the zero-files case and stop the run.
                log.error(&format!("[{}]:: {e}", profile.id));
                report.aborted = Some(profile.id.clone());
                break;
            }
        };

        log.hint(&format!(
            "[{}]:: Found {} files to back up.",
            profile.id,
            files.len()
        ));

        if files.is_empty() {
            log.error(&EngineError::NoFilesFound {
                profile: profile.id.clone(),
            }
            .to_string());
            report.aborted = Some(profile.id.clone());
            break;
        }

        let mut outcome = ProfileOutcome {
            profile_id: profile.id.clone(),
            files_found: files.len(),
            archive_name: None,
            replicated_to: Vec::new(),
            failures: Vec::new(),
        };

        if options.dry_run {
            log.hint("Dry run. No backup is created.");
            report.profiles.push(outcome);
            continue;
        }

        log.hint(&format!("[{}]:: Creating backup...", profile.id));
        // Staging directory is removed when this binding drops, on
        // success and on failure alike.
        let staging = tempfile::tempdir().map_err(|e| EngineError::DirectoryCreationFailed {
            path: std::env::temp_dir(),
            source: e,
        })?;

        let archive = match create_archive(&files, staging.path()) {
            Ok(archive) => archive,
            Err(e) => {
                log.error(&format!("[{}]:: {e}", profile.id));
                report.profiles.push(outcome);
                continue;
            }
        };
        outcome.archive_name = archive
            .file_name()
            .map(|n| n.to_string_lossy().into_owned());

        log.hint(&format!(
            "[{}]:: Copying backup to {} backup destinations...",
            profile.id,
            destinations.len()
        ));
        let folder = format!("{}{}", BACKUP_DIR_PREFIX, profile.id);
        for destination in &destinations {
            let target_dir = destination.directory.join(&folder);
            match copy_to_destination(&archive, &target_dir) {
                Ok(target) => {
                    log.hint(&format!(
                        "[{}]:: File system backed up to: {}",
                        profile.id,
                        target.display()
                    ));
                    outcome.replicated_to.push(destination.id.clone());
                }
                Err(e) => {
                    // Fatal for this destination only.
                    log.error(&format!(
                        "[{}]:: Backup to destination \"{}\" failed: {e}",
                        profile.id, destination.id
                    ));
                    outcome.failures.push(DestinationFailure {
                        destination_id: destination.id.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        report.profiles.push(outcome);
    }

    log.hint("Backup process completed!");

    if !options.dry_run {
        // Retention is a global policy: every configured destination is
        // swept, not only the ones this run replicated to.
        for destination in &config.destinations {
            let stats = sweep_destination(&destination.directory, destination.days_to_keep, log);
            report.swept_files += stats.deleted;
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ARCHIVE_EXTENSION, ARCHIVE_FILENAME_PREFIX};
    use std::fs;
    use std::path::{Path, PathBuf};

    fn test_log(dir: &Path) -> RunLog {
        RunLog::with_directory("20240101120000", dir.join("logs"))
    }

    fn profile(id: &str, source: Vec<String>, ignore: Vec<String>) -> Profile {
        Profile {
            id: id.to_string(),
            active: true,
            source,
            ignore,
        }
    }

    fn destination(id: &str, directory: &Path, days_to_keep: i64) -> Destination {
        Destination {
            id: id.to_string(),
            active: true,
            directory: directory.to_path_buf(),
            days_to_keep,
        }
    }

    fn archives_in(dir: &Path) -> Vec<PathBuf> {
        match fs::read_dir(dir) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| {
                    p.file_name()
                        .map(|n| {
                            let n = n.to_string_lossy();
                            n.starts_with(ARCHIVE_FILENAME_PREFIX) && n.ends_with(ARCHIVE_EXTENSION)
                        })
                        .unwrap_or(false)
                })
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    fn source_tree(root: &Path) -> PathBuf {
        let docs = root.join("docs");
        fs::create_dir_all(docs.join("sub")).expect("Failed to create source tree");
        fs::write(docs.join("a.txt"), "a").expect("Failed to write a.txt");
        fs::write(docs.join("b.tmp"), "b").expect("Failed to write b.tmp");
        fs::write(docs.join("sub/c.txt"), "c").expect("Failed to write c.txt");
        docs
    }

    #[test]
    fn test_full_run_replicates_to_every_destination() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let docs = source_tree(temp_dir.path());
        let dst1 = temp_dir.path().join("dst1");
        let dst2 = temp_dir.path().join("dst2");

        let config = BackupConfig {
            profiles: vec![profile(
                "docs",
                vec![docs.to_string_lossy().into_owned()],
                vec!["*.tmp".to_string()],
            )],
            destinations: vec![destination("d1", &dst1, 7), destination("d2", &dst2, 7)],
        };

        let report = run_backup(
            &config,
            &RunOptions::default(),
            &test_log(temp_dir.path()),
        )
        .expect("Run failed");

        assert!(report.aborted.is_none());
        assert_eq!(report.profiles.len(), 1);
        assert_eq!(report.profiles[0].files_found, 2); // b.tmp ignored
        assert_eq!(report.profiles[0].replicated_to, vec!["d1", "d2"]);
        assert_eq!(archives_in(&dst1.join("BACKUP_docs")).len(), 1);
        assert_eq!(archives_in(&dst2.join("BACKUP_docs")).len(), 1);
    }

    #[test]
    fn test_empty_selection_is_a_noop_with_zero_side_effects() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let dst = temp_dir.path().join("dst/BACKUP_docs");
        fs::create_dir_all(&dst).expect("Failed to create dst");
        // An expired archive that a sweep would delete.
        fs::write(dst.join("archive20200101000000.tar.gz"), b"old")
            .expect("Failed to write archive");

        let config = BackupConfig {
            profiles: Vec::new(),
            destinations: vec![destination("d1", &temp_dir.path().join("dst"), 7)],
        };

        let report = run_backup(
            &config,
            &RunOptions::default(),
            &test_log(temp_dir.path()),
        )
        .expect("Run failed");

        assert!(report.profiles.is_empty());
        assert_eq!(report.swept_files, 0);
        assert!(dst.join("archive20200101000000.tar.gz").exists());
    }

    #[test]
    fn test_no_resolved_destinations_is_a_noop_with_zero_side_effects() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let docs = source_tree(temp_dir.path());
        let dst = temp_dir.path().join("dst");
        let stale = dst.join("BACKUP_docs");
        fs::create_dir_all(&stale).expect("Failed to create dst");
        // An expired archive that a sweep would delete.
        fs::write(stale.join("archive20200101000000.tar.gz"), b"old")
            .expect("Failed to write archive");

        let mut inactive = destination("d1", &dst, 7);
        inactive.active = false;
        let config = BackupConfig {
            profiles: vec![profile(
                "docs",
                vec![docs.to_string_lossy().into_owned()],
                vec![],
            )],
            destinations: vec![inactive],
        };

        let report = run_backup(
            &config,
            &RunOptions::default(),
            &test_log(temp_dir.path()),
        )
        .expect("Run failed");

        // The profile is never backed up and nothing is swept.
        assert!(report.profiles.is_empty());
        assert!(report.aborted.is_none());
        assert_eq!(report.swept_files, 0);
        assert_eq!(archives_in(&stale).len(), 1);

        // Requesting only an unknown destination id behaves the same.
        let options = RunOptions {
            destinations: vec!["ghost".to_string()],
            ..Default::default()
        };
        let report =
            run_backup(&config, &options, &test_log(temp_dir.path())).expect("Run failed");

        assert!(report.profiles.is_empty());
        assert_eq!(report.swept_files, 0);
        assert!(stale.join("archive20200101000000.tar.gz").exists());
    }

    #[test]
    fn test_inactive_records_are_not_selected() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let docs = source_tree(temp_dir.path());
        let log = test_log(temp_dir.path());

        let mut inactive = profile("docs", vec![docs.to_string_lossy().into_owned()], vec![]);
        inactive.active = false;
        let config = BackupConfig {
            profiles: vec![inactive],
            destinations: vec![destination("d1", &temp_dir.path().join("dst"), 7)],
        };

        assert!(select_profiles(&config, &RunOptions::default(), &log).is_empty());
    }

    #[test]
    fn test_requested_profile_overrides_active_flag() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let log = test_log(temp_dir.path());

        let mut inactive = profile("docs", vec!["/src".to_string()], vec![]);
        inactive.active = false;
        let config = BackupConfig {
            profiles: vec![inactive],
            destinations: Vec::new(),
        };

        let options = RunOptions {
            profile: Some("docs".to_string()),
            ..Default::default()
        };
        let selected = select_profiles(&config, &options, &log);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, "docs");
    }

    #[test]
    fn test_unknown_profile_id_empties_selection_and_logs() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let log = test_log(temp_dir.path());
        let config = BackupConfig::default();

        let options = RunOptions {
            profile: Some("ghost".to_string()),
            ..Default::default()
        };
        assert!(select_profiles(&config, &options, &log).is_empty());
        let logged = fs::read_to_string(log.error_log_file()).expect("Failed to read log");
        assert!(logged.contains("ghost"));
    }

    #[test]
    fn test_unknown_destination_ids_are_skipped_individually() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let log = test_log(temp_dir.path());
        let config = BackupConfig {
            profiles: Vec::new(),
            destinations: vec![destination("d1", &temp_dir.path().join("dst"), 7)],
        };

        let options = RunOptions {
            destinations: vec!["ghost".to_string(), "d1".to_string()],
            ..Default::default()
        };
        let selected = select_destinations(&config, &options, &log);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, "d1");
    }

    #[test]
    fn test_zero_files_aborts_before_later_profiles() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let empty_dir = temp_dir.path().join("empty");
        fs::create_dir(&empty_dir).expect("Failed to create empty dir");
        let docs = source_tree(temp_dir.path());
        let dst = temp_dir.path().join("dst");

        let config = BackupConfig {
            profiles: vec![
                profile("first", vec![empty_dir.to_string_lossy().into_owned()], vec![]),
                profile("second", vec![docs.to_string_lossy().into_owned()], vec![]),
            ],
            destinations: vec![destination("d1", &dst, 7)],
        };

        let report = run_backup(
            &config,
            &RunOptions::default(),
            &test_log(temp_dir.path()),
        )
        .expect("Run failed");

        assert_eq!(report.aborted.as_deref(), Some("first"));
        // Neither the empty profile nor the later one produced anything.
        assert!(report.profiles.is_empty());
        assert!(!dst.join("BACKUP_first").exists());
        assert!(!dst.join("BACKUP_second").exists());
    }

    #[test]
    fn test_dry_run_creates_nothing_but_reports_files() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let docs = source_tree(temp_dir.path());
        let dst = temp_dir.path().join("dst");
        fs::create_dir(&dst).expect("Failed to create dst");

        let config = BackupConfig {
            profiles: vec![profile(
                "docs",
                vec![docs.to_string_lossy().into_owned()],
                vec![],
            )],
            destinations: vec![destination("d1", &dst, 7)],
        };

        let options = RunOptions {
            dry_run: true,
            ..Default::default()
        };
        let report =
            run_backup(&config, &options, &test_log(temp_dir.path())).expect("Run failed");

        assert_eq!(report.profiles[0].files_found, 3);
        assert!(report.profiles[0].archive_name.is_none());
        assert!(!dst.join("BACKUP_docs").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_one_failing_destination_does_not_block_the_other() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let docs = source_tree(temp_dir.path());
        let blocked = temp_dir.path().join("blocked");
        fs::create_dir(&blocked).expect("Failed to create blocked dir");
        fs::set_permissions(&blocked, fs::Permissions::from_mode(0o555))
            .expect("Failed to set permissions");
        let open = temp_dir.path().join("open");

        let config = BackupConfig {
            profiles: vec![profile(
                "docs",
                vec![docs.to_string_lossy().into_owned()],
                vec![],
            )],
            destinations: vec![destination("bad", &blocked, 7), destination("good", &open, 7)],
        };

        let report = run_backup(
            &config,
            &RunOptions::default(),
            &test_log(temp_dir.path()),
        )
        .expect("Run failed");

        fs::set_permissions(&blocked, fs::Permissions::from_mode(0o755))
            .expect("Failed to restore permissions");

        assert!(report.has_failures());
        assert_eq!(report.profiles[0].failures.len(), 1);
        assert_eq!(report.profiles[0].failures[0].destination_id, "bad");
        assert_eq!(report.profiles[0].replicated_to, vec!["good"]);
        assert_eq!(archives_in(&open.join("BACKUP_docs")).len(), 1);
    }

    #[test]
    fn test_cleanup_sweeps_all_configured_destinations() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let docs = source_tree(temp_dir.path());
        let selected_dst = temp_dir.path().join("selected");
        let unselected_dst = temp_dir.path().join("unselected");

        let stale = unselected_dst.join("BACKUP_docs");
        fs::create_dir_all(&stale).expect("Failed to create stale dir");
        fs::write(stale.join("archive20200101000000.tar.gz"), b"old")
            .expect("Failed to write stale archive");

        let mut unselected = destination("cold", &unselected_dst, 7);
        unselected.active = false;
        let config = BackupConfig {
            profiles: vec![profile(
                "docs",
                vec![docs.to_string_lossy().into_owned()],
                vec![],
            )],
            destinations: vec![destination("hot", &selected_dst, 7), unselected],
        };

        let report = run_backup(
            &config,
            &RunOptions::default(),
            &test_log(temp_dir.path()),
        )
        .expect("Run failed");

        // Only the active destination received the new archive, but the
        // inactive one was still swept.
        assert_eq!(report.profiles[0].replicated_to, vec!["hot"]);
        assert_eq!(report.swept_files, 1);
        assert!(!stale.join("archive20200101000000.tar.gz").exists());
    }
}

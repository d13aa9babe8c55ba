//! Run logging: console hints plus a durable CSV error log.
//!
//! Hints and errors go to the console through `tracing`. Errors are
//! additionally appended to a `;`-delimited record file so the operator can
//! review them after the run; the orchestrator surfaces that file at the
//! end of every run.

use chrono::Local;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Directory the error log files are written to, relative to the working
/// directory of the process.
pub const ERRORLOG_DIRECTORY: &str = ".backup/ErrorLog";

/// Filename prefix of every error log file.
pub const ERRORLOG_PREFIX: &str = "ERROR_occured_backup";

/// Logging sink for one backup run.
///
/// Every run is identified by a timestamp captured at startup; the error
/// log filename embeds it so each run gets its own file.
#[derive(Debug, Clone)]
pub struct RunLog {
    run_stamp: String,
    directory: PathBuf,
}

impl RunLog {
    /// Creates a log for the given run timestamp, writing to the default
    /// error log directory.
    pub fn new(run_stamp: impl Into<String>) -> Self {
        Self::with_directory(run_stamp, ERRORLOG_DIRECTORY)
    }

    /// Creates a log writing error records under `directory`.
    pub fn with_directory(run_stamp: impl Into<String>, directory: impl Into<PathBuf>) -> Self {
        RunLog {
            run_stamp: run_stamp.into(),
            directory: directory.into(),
        }
    }

    /// Timestamp identifying this run.
    pub fn run_stamp(&self) -> &str {
        &self.run_stamp
    }

    /// Operator-facing progress message; console only.
    pub fn hint(&self, msg: &str) {
        info!("{msg}");
    }

    /// Error message; printed and appended to the durable error log.
    pub fn error(&self, msg: &str) {
        error!("{msg}");

        let event_stamp = Local::now().format("%H%M%S").to_string();
        if let Err(e) = self.append_record(&event_stamp, msg) {
            // The log itself is best-effort; there is nowhere left to
            // report its own failures but the console.
            error!("Failed to write error log: {e}");
        }
    }

    /// Path of the error log file for this run.
    pub fn error_log_file(&self) -> PathBuf {
        let filename = format!("{}{}.log", ERRORLOG_PREFIX, self.run_stamp);
        self.directory.join(filename)
    }

    fn append_record(&self, event_stamp: &str, msg: &str) -> csv::Result<()> {
        fs::create_dir_all(&self.directory)?;

        let primary = self.error_log_file();
        match self.append_to(&primary, event_stamp, msg) {
            Ok(()) => Ok(()),
            Err(_) => {
                // Primary file unwritable (locked or permission change
                // mid-run); retry once with a suffixed sibling.
                let fallback = self.directory.join(format!(
                    "{}{}-1.log",
                    ERRORLOG_PREFIX, self.run_stamp
                ));
                self.append_to(&fallback, event_stamp, msg)
            }
        }
    }

    fn append_to(&self, path: &Path, event_stamp: &str, msg: &str) -> csv::Result<()> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b';')
            .has_headers(false)
            .from_writer(file);
        writer.write_record([self.run_stamp.as_str(), event_stamp, msg])?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_log_file_name_embeds_run_stamp() {
        let log = RunLog::with_directory("20240101120000", "/tmp/logs");
        assert_eq!(
            log.error_log_file(),
            PathBuf::from("/tmp/logs/ERROR_occured_backup20240101120000.log")
        );
    }

    #[test]
    fn test_error_appends_csv_record() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let log = RunLog::with_directory("20240101120000", temp_dir.path());

        log.error("first failure");
        log.error("second; with delimiter");

        let content =
            fs::read_to_string(log.error_log_file()).expect("Failed to read error log");
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("20240101120000;"));
        assert!(lines[0].ends_with(";first failure"));
        // Field containing the delimiter must be quoted
        assert!(lines[1].ends_with(";\"second; with delimiter\""));
    }

    #[test]
    fn test_hint_writes_no_record() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let log = RunLog::with_directory("20240101120000", temp_dir.path());

        log.hint("all fine");

        assert!(!log.error_log_file().exists());
    }
}

//! FileSystemBackup - command-line interface for the backup engine.
//!
//! Thin I/O glue: argument parsing, tracing setup, config loading, and
//! surfacing the error log in an editor after every run.

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use engine::{run_backup, BackupConfig, RunLog, RunOptions, RunReport};
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// FileSystemBackup: automates file-system backups
#[derive(Parser, Debug)]
#[command(name = "fsbackup")]
#[command(version)]
#[command(about = "Profile-driven file-system backups with retention")]
struct Args {
    /// Perform a dry run to test configs and permissions without creating a backup
    #[arg(short = 't', long)]
    dryrun: bool,

    /// Id of the profile that should be backed up
    #[arg(short, long, value_name = "ID")]
    profile: Option<String>,

    /// List of destination ids
    #[arg(short, long, value_name = "ID", num_args = 0..)]
    destinations: Vec<String>,

    /// Path of the configuration file
    #[arg(long, value_name = "PATH", default_value = "config.json")]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Enable quiet mode
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let args = Args::parse();

    init_tracing(args.verbose, args.quiet);

    let run_stamp = Local::now().format("%Y%m%d%H%M%S").to_string();
    let log = RunLog::new(&run_stamp);

    let exit_code = match run_cli(&args, &log) {
        Ok(_report) => {
            // Surface what happened to the operator, success or not.
            open_with_editor(&log.error_log_file());
            0
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            2
        }
    };

    std::process::exit(exit_code);
}

/// Main CLI logic - separated for testability
fn run_cli(args: &Args, log: &RunLog) -> Result<RunReport> {
    let config = BackupConfig::load(&args.config, log)
        .with_context(|| format!("Cannot load config file {}", args.config.display()))?;

    let options = RunOptions {
        dry_run: args.dryrun,
        profile: args.profile.clone(),
        destinations: args.destinations.clone(),
    };

    let report = run_backup(&config, &options, log).context("Backup run failed")?;
    Ok(report)
}

fn init_tracing(verbose: bool, quiet: bool) {
    let level = if quiet {
        "warn"
    } else if verbose {
        "debug"
    } else {
        "info"
    };

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::new(format!("engine={level},fsbackup={level}")))
        .with_target(false)
        .finish();

    // Tests may initialize more than once; later calls are ignored.
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Open the error log with the platform's editor so the operator sees the
/// run's errors. Best-effort: a missing editor never fails the run.
#[cfg(target_os = "macos")]
fn open_with_editor(file_path: &Path) {
    if let Err(e) = std::process::Command::new("open").arg(file_path).spawn() {
        tracing::warn!("Could not open error log {}: {e}", file_path.display());
    }
}

#[cfg(target_os = "windows")]
fn open_with_editor(file_path: &Path) {
    if let Err(e) = std::process::Command::new("notepad.exe")
        .arg(file_path)
        .spawn()
    {
        tracing::warn!("Could not open error log {}: {e}", file_path.display());
    }
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn open_with_editor(file_path: &Path) {
    tracing::info!("Error log written to {}", file_path.display());
}

//! Configuration loading and validation.
//!
//! The config file is a JSON document with two ordered lists,
//! `backup_profiles` and `backup_destinations`. Records are deserialized
//! into typed structs and validated once at load time; invalid records are
//! rejected with logged validation errors instead of producing
//! partially-populated objects. A missing or non-list section degrades to
//! an empty set plus a logged error. Only a missing or unparseable file
//! aborts startup.

use crate::error::EngineError;
use crate::logging::RunLog;
use crate::model::{Destination, Profile};
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const BACKUP_PROFILES: &str = "backup_profiles";
const BACKUP_DESTINATIONS: &str = "backup_destinations";

/// Raw profile record as written in the config file.
#[derive(Debug, Deserialize)]
struct ProfileRecord {
    id: Option<String>,
    active: Option<bool>,
    source: Option<Vec<String>>,
    ignore: Option<Vec<String>>,
}

/// Raw destination record as written in the config file.
#[derive(Debug, Deserialize)]
struct DestinationRecord {
    id: Option<String>,
    active: Option<bool>,
    directory: Option<String>,
    days_to_keep: Option<i64>,
}

/// Validated configuration: the profiles and destinations a run works on.
///
/// Both lists keep the file order and contain only valid records.
#[derive(Debug, Clone, Default)]
pub struct BackupConfig {
    pub profiles: Vec<Profile>,
    pub destinations: Vec<Destination>,
}

impl BackupConfig {
    /// Load and validate a configuration file.
    ///
    /// # Errors
    /// Returns `EngineError` when the file is missing, unreadable or not
    /// valid JSON. Section-level and record-level problems are logged and
    /// degrade to empty sets instead.
    pub fn load(path: &Path, log: &RunLog) -> Result<Self, EngineError> {
        log.hint("Loading and parsing config file.");

        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(EngineError::ConfigNotFound {
                    path: path.to_path_buf(),
                });
            }
            Err(e) => {
                return Err(EngineError::ConfigRead {
                    path: path.to_path_buf(),
                    source: e,
                });
            }
        };

        let document: serde_json::Value =
            serde_json::from_str(&raw).map_err(|e| EngineError::ConfigParse {
                path: path.to_path_buf(),
                source: e,
            })?;

        let profiles = extract_profiles(&document, log);
        let destinations = extract_destinations(&document, log);

        Ok(BackupConfig {
            profiles,
            destinations,
        })
    }

    /// Look up a profile by id. `None` means not configured, nothing else.
    pub fn find_profile(&self, id: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.id == id)
    }

    /// Look up a destination by id.
    pub fn find_destination(&self, id: &str) -> Option<&Destination> {
        self.destinations.iter().find(|d| d.id == id)
    }
}

/// Take a list-valued section out of the document, logging when it is
/// missing or not a list.
fn section_records<'a>(
    document: &'a serde_json::Value,
    key: &str,
    log: &RunLog,
) -> Vec<&'a serde_json::Value> {
    match document.get(key) {
        Some(serde_json::Value::Array(records)) => records.iter().collect(),
        Some(_) => {
            log.error(&format!(
                "Invalid config file. The value for \"{key}\" is not a list."
            ));
            Vec::new()
        }
        None => {
            log.error(&format!(
                "Invalid config file. Key \"{key}\" not found in configuration."
            ));
            Vec::new()
        }
    }
}

/// Resolve a record id: missing or already-taken ids get an index suffix.
fn dedup_id(id: Option<String>, index: usize, taken: &[String]) -> String {
    match id {
        Some(id) if !taken.contains(&id) => id,
        Some(id) => format!("{id}_{index}"),
        None => format!("_{index}"),
    }
}

fn extract_profiles(document: &serde_json::Value, log: &RunLog) -> Vec<Profile> {
    let mut profiles: Vec<Profile> = Vec::new();

    for (index, value) in section_records(document, BACKUP_PROFILES, log)
        .into_iter()
        .enumerate()
    {
        let record: ProfileRecord = match serde_json::from_value(value.clone()) {
            Ok(record) => record,
            Err(e) => {
                log.error(&format!(
                    "Invalid config file. Cannot parse profile at index {index}: {e}"
                ));
                continue;
            }
        };

        let taken: Vec<String> = profiles.iter().map(|p| p.id.clone()).collect();
        let id = dedup_id(record.id, index, &taken);

        let mut errors: Vec<String> = Vec::new();
        if record.active.is_none() {
            errors.push(format!(
                "The value of \"active\" has to be defined as bool. Error occured in profile: {id}"
            ));
        }
        if record.ignore.is_none() {
            errors.push(format!(
                "The value of \"ignore\" has to be defined as list. Error occured in profile: {id}"
            ));
        }
        match &record.source {
            None => errors.push(format!(
                "The value of \"source\" has to be defined as list. Error occured in profile: {id}"
            )),
            Some(source) if source.is_empty() => {
                errors.push(format!("Please define \"source\" in profile: {id}"));
            }
            Some(_) => {}
        }

        if errors.is_empty() {
            profiles.push(Profile {
                id,
                active: record.active.unwrap_or(false),
                source: record.source.unwrap_or_default(),
                ignore: record.ignore.unwrap_or_default(),
            });
        } else {
            for error in errors {
                log.error(&error);
            }
        }
    }

    profiles
}

fn extract_destinations(document: &serde_json::Value, log: &RunLog) -> Vec<Destination> {
    let mut destinations: Vec<Destination> = Vec::new();

    for (index, value) in section_records(document, BACKUP_DESTINATIONS, log)
        .into_iter()
        .enumerate()
    {
        let record: DestinationRecord = match serde_json::from_value(value.clone()) {
            Ok(record) => record,
            Err(e) => {
                log.error(&format!(
                    "Invalid config file. Cannot parse destination at index {index}: {e}"
                ));
                continue;
            }
        };

        let taken: Vec<String> = destinations.iter().map(|d| d.id.clone()).collect();
        let id = dedup_id(record.id, index, &taken);

        let mut errors: Vec<String> = Vec::new();
        if record.active.is_none() {
            errors.push(format!(
                "The value of \"active\" has to be defined as bool. Error occured in destination: {id}"
            ));
        }
        let directory = match record.directory.as_deref() {
            None | Some("") => {
                errors.push(format!("Please define \"directory\" in destination: {id}"));
                None
            }
            Some(directory) => {
                let directory = PathBuf::from(directory);
                if parent_is_writable(&directory) {
                    Some(directory)
                } else {
                    errors.push(format!(
                        "Write privileges are not given at destination directory: {}. Error occured in destination: {id}",
                        directory.display()
                    ));
                    None
                }
            }
        };

        match (errors.is_empty(), directory) {
            (true, Some(directory)) => destinations.push(Destination {
                id,
                active: record.active.unwrap_or(false),
                directory,
                // Missing retention disables cleanup for this destination.
                days_to_keep: record.days_to_keep.unwrap_or(-1),
            }),
            _ => {
                for error in errors {
                    log.error(&error);
                }
            }
        }
    }

    destinations
}

/// Check write access on the parent of a destination directory. The
/// destination itself may not exist yet; its parent must.
///
/// Mode bits alone say nothing about ownership or ACLs, so after the
/// readonly check the effective access is confirmed by creating a
/// short-lived temp file in the parent.
fn parent_is_writable(directory: &Path) -> bool {
    let parent = match directory.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    match fs::metadata(parent) {
        Ok(metadata) if !metadata.permissions().readonly() => {}
        _ => return false,
    }
    tempfile::Builder::new()
        .prefix(".write-check")
        .tempfile_in(parent)
        .is_ok()
}

//! On-disk formats for the tool database
//!
//! The database file and export files are JSON. Writes go to a sibling
//! `.tmp` file which is synced and then renamed over the target, so a crash
//! never leaves a half-written database behind.

use super::tools::Tool;
use crate::error::PersistenceError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Current database format version
pub const DATABASE_VERSION: &str = "1.0";

/// Persisted tool database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDatabaseFile {
    pub version: String,
    pub saved_at: DateTime<Utc>,
    pub current_tool: Option<u32>,
    pub tools: Vec<Tool>,
}

impl ToolDatabaseFile {
    /// Snapshot of the given tools stamped with the current time
    pub fn new(current_tool: Option<u32>, tools: Vec<Tool>) -> Self {
        Self {
            version: DATABASE_VERSION.to_string(),
            saved_at: Utc::now(),
            current_tool,
            tools,
        }
    }
}

/// Export / import file
///
/// Import reads only `tools`; a `current_tool` key in the file is ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportFile {
    pub exported_at: DateTime<Utc>,
    pub tools: Vec<Tool>,
}

/// Path of the temporary file used for atomic writes
pub fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Serialize `value` as pretty JSON and atomically replace `path` with it
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), PersistenceError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let content = serde_json::to_string_pretty(value)?;
    let tmp = temp_path(path);
    {
        let mut file = File::create(&tmp)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
    }

    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

/// Read the database file.
///
/// Returns `Ok(None)` when the file does not exist and
/// [`PersistenceError::Corrupt`] when it exists but cannot be decoded.
pub fn read_database(path: &Path) -> Result<Option<ToolDatabaseFile>, PersistenceError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| PersistenceError::Corrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

/// Move an unreadable database aside so it can be inspected later.
///
/// Returns the new location: `<file>.corrupt-<timestamp>`.
pub fn quarantine(path: &Path) -> Result<PathBuf, PersistenceError> {
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".corrupt-{}", Utc::now().format("%Y%m%d%H%M%S")));
    let target = PathBuf::from(name);
    fs::rename(path, &target)?;
    Ok(target)
}

/// Read an export file
pub fn read_export(path: &Path) -> Result<ExportFile, PersistenceError> {
    if !path.exists() {
        return Err(PersistenceError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

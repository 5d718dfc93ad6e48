//! Moving files between the session and the user's filesystem.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::core::session::Session;
use crate::core::types::{File, Settings};

/// A file picked from disk, before it joins the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskFile {
    pub name: String,
    pub content: String,
}

/// Read a text file for "load from disk".
pub fn read_disk_file(path: &Path) -> Result<DiskFile> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("path has no file name: {}", path.display()))?
        .to_string();
    let content = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    debug!(name = %name, bytes = content.len(), "read file from disk");
    Ok(DiskFile { name, content })
}

/// Write one file's content for "save to disk".
///
/// A directory target receives the file under its own name. Returns the
/// path actually written.
pub fn write_disk_file(target: &Path, file: &File) -> Result<std::path::PathBuf> {
    let path = if target.is_dir() {
        target.join(&file.name)
    } else {
        target.to_path_buf()
    };
    fs::write(&path, &file.content).with_context(|| format!("write {}", path.display()))?;
    debug!(path = %path.display(), "saved file to disk");
    Ok(path)
}

/// Project snapshot written by "export".
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectExport<'a> {
    pub files: &'a [File],
    pub active_file_id: &'a str,
    pub settings: &'a Settings,
    pub timestamp: DateTime<Utc>,
}

pub fn export_project(path: &Path, session: &Session, timestamp: DateTime<Utc>) -> Result<()> {
    let export = ProjectExport {
        files: &session.files,
        active_file_id: &session.active_file_id,
        settings: &session.settings,
        timestamp,
    };
    let mut payload = serde_json::to_string_pretty(&export).context("serialize project")?;
    payload.push('\n');
    fs::write(path, payload).with_context(|| format!("write {}", path.display()))
}

//! Durable key-value substrate behind the persistence gateway.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing::debug;

/// String-keyed storage with whole-value reads and writes.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// One file per key inside a state directory.
#[derive(Debug, Clone)]
pub struct FileKvStore {
    dir: PathBuf,
}

impl FileKvStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(anyhow!("invalid storage key '{key}'"));
        }
        Ok(self.dir.join(key))
    }
}

impl KeyValueStore for FileKvStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(None);
        }
        let value =
            fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
        Ok(Some(value))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        debug!(key, bytes = value.len(), "writing storage key");
        write_atomic(&path, value)
    }
}

/// Atomically replace `path` (temp file + rename).
pub(crate) fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp file {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}

/// In-memory store, used as the test fake and for ephemeral sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryKvStore {
    values: HashMap<String, String>,
    writes: Vec<String>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys in the order they were written, one entry per write.
    pub fn writes(&self) -> &[String] {
        &self.writes
    }

    pub fn write_count(&self, key: &str) -> usize {
        self.writes.iter().filter(|k| k.as_str() == key).count()
    }

    pub fn insert(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

impl KeyValueStore for MemoryKvStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        self.writes.push(key.to_string());
        Ok(())
    }
}

//! Editor configuration stored as `config.toml` in the state directory.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::io::kv::write_atomic;

/// Editor configuration (TOML).
///
/// Missing fields default to values that work against the public Piston
/// instance with a local `node` installation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EditorConfig {
    /// Quiet period before edited files are written to storage.
    pub autosave_debounce_ms: u64,

    pub sandbox: SandboxConfig,

    pub remote: RemoteConfig,
}

/// Limits for locally executed JavaScript.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SandboxConfig {
    /// Interpreter command; the heap flag and script name are appended.
    pub command: Vec<String>,

    /// Wall-clock budget per run in seconds.
    pub timeout_secs: u64,

    /// V8 old-space cap in megabytes.
    pub memory_mb: u32,

    /// Truncate captured stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the Piston API (without `/execute`).
    pub api_base: String,

    /// Request timeout in seconds; 0 keeps the HTTP client default.
    pub timeout_secs: u64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            command: vec!["node".to_string()],
            timeout_secs: 10,
            memory_mb: 128,
            output_limit_bytes: 100_000,
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_base: "https://emkc.org/api/v2/piston".to_string(),
            timeout_secs: 0,
        }
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            autosave_debounce_ms: 1000,
            sandbox: SandboxConfig::default(),
            remote: RemoteConfig::default(),
        }
    }
}

impl RemoteConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl EditorConfig {
    pub fn autosave_debounce(&self) -> Duration {
        Duration::from_millis(self.autosave_debounce_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sandbox.command.is_empty() || self.sandbox.command[0].trim().is_empty() {
            return Err(anyhow!("sandbox.command must be a non-empty array"));
        }
        if self.sandbox.timeout_secs == 0 {
            return Err(anyhow!("sandbox.timeout_secs must be > 0"));
        }
        if self.sandbox.memory_mb == 0 {
            return Err(anyhow!("sandbox.memory_mb must be > 0"));
        }
        if self.sandbox.output_limit_bytes == 0 {
            return Err(anyhow!("sandbox.output_limit_bytes must be > 0"));
        }
        let base = self.remote.api_base.trim();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(anyhow!("remote.api_base must be an http(s) URL"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `EditorConfig::default()`.
pub fn load_config(path: &Path) -> Result<EditorConfig> {
    if !path.exists() {
        let cfg = EditorConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: EditorConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &EditorConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

//! Command surface: the session store, the dispatcher and the busy flag
//! behind one handle.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::{info, instrument};

use crate::core::types::{ExecutionResult, File};
use crate::dispatch::{ExecutionDispatcher, RunGate};
use crate::io::config::EditorConfig;
use crate::io::disk;
use crate::io::kv::{FileKvStore, KeyValueStore};
use crate::io::persistence::PersistenceGateway;
use crate::io::remote::{PistonClient, RemoteExecutor};
use crate::io::sandbox::{LocalExecutor, LocalSandboxRunner};
use crate::store::{Clock, SessionStore, SystemClock};

/// Why a run request did not start.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunRefused {
    #[error("a run is already in progress")]
    Busy,
    #[error("no file with id {0}")]
    UnknownFile(String),
}

pub struct Workbench<S: KeyValueStore, L, R, C: Clock = SystemClock> {
    store: SessionStore<S, C>,
    dispatcher: ExecutionDispatcher<L, R>,
    gate: RunGate,
}

/// Workbench over a state directory, running JavaScript locally and
/// everything else against the configured Piston service.
pub type DiskWorkbench = Workbench<FileKvStore, LocalSandboxRunner, PistonClient>;

/// Open the on-disk workbench, creating `state_dir` if needed.
pub fn open_workbench(state_dir: &Path, config: &EditorConfig) -> Result<DiskWorkbench> {
    fs::create_dir_all(state_dir)
        .with_context(|| format!("create state directory {}", state_dir.display()))?;
    let gateway = PersistenceGateway::new(
        FileKvStore::new(state_dir),
        config.autosave_debounce(),
    );
    let remote = PistonClient::new(&config.remote)?;
    let local = LocalSandboxRunner::new(config.sandbox.clone());
    Ok(Workbench::new(
        SessionStore::open(gateway),
        ExecutionDispatcher::new(local, remote),
    ))
}

impl<S, L, R, C> Workbench<S, L, R, C>
where
    S: KeyValueStore,
    L: LocalExecutor + Send + Sync + 'static,
    R: RemoteExecutor,
    C: Clock,
{
    pub fn new(store: SessionStore<S, C>, dispatcher: ExecutionDispatcher<L, R>) -> Self {
        Self {
            store,
            dispatcher,
            gate: RunGate::default(),
        }
    }

    pub fn store(&self) -> &SessionStore<S, C> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut SessionStore<S, C> {
        &mut self.store
    }

    pub fn gate(&self) -> &RunGate {
        &self.gate
    }

    /// Run the given file, or the active one. Refused while another run is
    /// outstanding.
    #[instrument(skip(self))]
    pub async fn run(&self, id: Option<&str>) -> Result<ExecutionResult, RunRefused> {
        let session = self.store.session();
        let file = match id {
            Some(id) => session.file(id),
            None => session.active_file(),
        }
        .ok_or_else(|| RunRefused::UnknownFile(id.unwrap_or(&session.active_file_id).to_string()))?;

        let _ticket = self.gate.try_begin().ok_or(RunRefused::Busy)?;
        info!(file = %file.name, "running");
        Ok(self.dispatcher.run(file).await)
    }

    /// Load a file from disk into a new, active session entry.
    pub fn open_from_disk(&mut self, path: &Path) -> Result<&File> {
        let loaded = disk::read_disk_file(path)?;
        self.store.add_loaded_file(&loaded.name, loaded.content);
        self.store
            .active_file()
            .context("session has no active file after load")
    }

    /// Write a file's content to disk. Returns the path written.
    pub fn save_to_disk(&self, id: Option<&str>, target: &Path) -> Result<PathBuf> {
        let session = self.store.session();
        let file = match id {
            Some(id) => session.file(id),
            None => session.active_file(),
        }
        .with_context(|| format!("no file with id {}", id.unwrap_or(&session.active_file_id)))?;
        disk::write_disk_file(target, file)
    }

    pub fn export(&self, path: &Path) -> Result<()> {
        disk::export_project(path, self.store.session(), self.store.clock().utc())
    }

    /// Write any pending autosave and hand back the store.
    ///
    /// Fails when the pending edits could not be written.
    pub fn finish(mut self) -> Result<SessionStore<S, C>> {
        self.store.flush()?;
        Ok(self.store)
    }
}

//! Execution dispatcher: routes a file to its runner and normalizes the result.
//!
//! The dispatcher holds no run state. Refusing overlapping runs is the
//! caller's job, using a [`RunGate`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{error, info, instrument, warn};

use crate::core::language::{RemoteTarget, RunnerKind};
use crate::core::normalize::{
    LocalOutcome, normalize_local, normalize_remote, transport_failure, unsupported_language,
};
use crate::core::types::{ExecutionResult, File};
use crate::io::remote::RemoteExecutor;
use crate::io::sandbox::LocalExecutor;

pub struct ExecutionDispatcher<L, R> {
    local: Arc<L>,
    remote: R,
}

impl<L, R> ExecutionDispatcher<L, R>
where
    L: LocalExecutor + Send + Sync + 'static,
    R: RemoteExecutor,
{
    pub fn new(local: L, remote: R) -> Self {
        Self {
            local: Arc::new(local),
            remote,
        }
    }

    /// Run a file and return its normalized result. Never fails.
    #[instrument(skip_all, fields(file = %file.name, language = %file.language))]
    pub async fn run(&self, file: &File) -> ExecutionResult {
        let result = match file.language.runner() {
            None => {
                warn!("no runner for language");
                unsupported_language(file.language)
            }
            Some(RunnerKind::Local) => self.run_local(&file.content).await,
            Some(RunnerKind::Remote(target)) => self.run_remote(&target, &file.content).await,
        };
        info!(status = ?result.status, exit_code = ?result.exit_code, "run finished");
        result
    }

    async fn run_local(&self, source: &str) -> ExecutionResult {
        let local = Arc::clone(&self.local);
        let source = source.to_string();
        match tokio::task::spawn_blocking(move || local.execute(&source)).await {
            Ok(outcome) => normalize_local(&outcome),
            Err(err) => {
                error!(err = %err, "local runner task failed");
                normalize_local(&LocalOutcome {
                    thrown: Some(format!("local runner failed: {err}")),
                    ..LocalOutcome::default()
                })
            }
        }
    }

    async fn run_remote(&self, target: &RemoteTarget, source: &str) -> ExecutionResult {
        match self.remote.execute(target, source).await {
            Ok(outcome) => normalize_remote(&outcome),
            Err(err) => {
                warn!(err = %err, "remote execution unavailable");
                transport_failure(err.to_string())
            }
        }
    }
}

/// Busy flag allowing at most one outstanding run.
#[derive(Debug, Clone, Default)]
pub struct RunGate {
    busy: Arc<AtomicBool>,
}

/// Held for the duration of a run; releases the gate on drop.
#[derive(Debug)]
pub struct RunTicket {
    busy: Arc<AtomicBool>,
}

impl RunGate {
    /// Claim the gate, or `None` if a run is already outstanding.
    pub fn try_begin(&self) -> Option<RunTicket> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunTicket {
                busy: Arc::clone(&self.busy),
            })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Drop for RunTicket {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

//! Test-only fakes: deterministic clock, recording observer, scripted runners.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::core::language::{Language, RemoteTarget};
use crate::core::normalize::{LocalOutcome, RunOutcome};
use crate::core::session::Session;
use crate::core::types::{File, SessionChange};
use crate::io::kv::{KeyValueStore, MemoryKvStore};
use crate::io::remote::{RemoteExecutor, TransportFailure};
use crate::io::sandbox::LocalExecutor;
use crate::store::{Clock, SessionObserver};

/// File with the language template as content.
pub fn file(id: &str, name: &str, language: Language) -> File {
    File::new(id, name, language)
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    start: Instant,
    elapsed: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            elapsed: Rc::new(Cell::new(Duration::ZERO)),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.elapsed.set(self.elapsed.get() + by);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + self.elapsed.get()
    }

    /// Fixed epoch plus elapsed time, so generated ids are reproducible.
    fn utc(&self) -> DateTime<Utc> {
        let epoch = Utc
            .with_ymd_and_hms(2026, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or_default();
        epoch + chrono::Duration::milliseconds(self.elapsed.get().as_millis() as i64)
    }
}

/// In-memory store whose writes can be made to fail. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct FlakyKvStore {
    inner: Rc<RefCell<MemoryKvStore>>,
    failing: Rc<Cell<bool>>,
}

impl FlakyKvStore {
    pub fn set_failing(&self, failing: bool) {
        self.failing.set(failing);
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.inner.borrow().value(key).map(str::to_string)
    }
}

impl KeyValueStore for FlakyKvStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.inner.borrow().get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        if self.failing.get() {
            bail!("disk full");
        }
        self.inner.borrow_mut().set(key, value)
    }
}

/// Observer that keeps every change it is shown.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    changes: Rc<RefCell<Vec<SessionChange>>>,
}

impl RecordingObserver {
    pub fn changes(&self) -> Vec<SessionChange> {
        self.changes.borrow().clone()
    }
}

impl SessionObserver for RecordingObserver {
    fn session_changed(&mut self, change: &SessionChange, _session: &Session) {
        self.changes.borrow_mut().push(change.clone());
    }
}

/// Local executor returning queued outcomes and recording submitted sources.
///
/// An empty queue yields a silent success.
#[derive(Debug, Clone, Default)]
pub struct ScriptedLocal {
    outcomes: Arc<Mutex<VecDeque<LocalOutcome>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedLocal {
    pub fn new(outcomes: Vec<LocalOutcome>) -> Self {
        Self {
            outcomes: Arc::new(Mutex::new(outcomes.into())),
            calls: Arc::default(),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }
}

impl LocalExecutor for ScriptedLocal {
    fn execute(&self, source: &str) -> LocalOutcome {
        self.calls.lock().expect("calls lock").push(source.to_string());
        self.outcomes
            .lock()
            .expect("outcomes lock")
            .pop_front()
            .unwrap_or_default()
    }
}

/// Remote executor returning queued responses and recording requests.
///
/// An empty queue yields a network failure.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRemote {
    responses: Arc<Mutex<VecDeque<Result<RunOutcome, TransportFailure>>>>,
    calls: Arc<Mutex<Vec<(RemoteTarget, String)>>>,
}

impl ScriptedRemote {
    pub fn new(responses: Vec<Result<RunOutcome, TransportFailure>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses.into())),
            calls: Arc::default(),
        }
    }

    pub fn calls(&self) -> Vec<(RemoteTarget, String)> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl RemoteExecutor for ScriptedRemote {
    async fn execute(
        &self,
        target: &RemoteTarget,
        source: &str,
    ) -> Result<RunOutcome, TransportFailure> {
        self.calls
            .lock()
            .expect("calls lock")
            .push((*target, source.to_string()));
        self.responses
            .lock()
            .expect("responses lock")
            .pop_front()
            .unwrap_or_else(|| Err(TransportFailure::Network("no scripted response".to_string())))
    }
}

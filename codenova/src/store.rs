//! Session store: the single owner of editor state.
//!
//! Mutations are applied in call order. Each accepted mutation is handed to
//! the persistence gateway first and then to every subscribed observer,
//! synchronously. Rejected mutations leave the session untouched and notify
//! nobody. Mutations never return an error; storage failures are logged.
//! [`SessionStore::flush`] is the exception: it reports a failed final save
//! so the caller can tell the user that edits were not written.

use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, instrument, warn};

use crate::core::language::Language;
use crate::core::session::{Session, UNTITLED_NAME};
use crate::core::types::{File, SessionChange, SettingsPatch, Theme};
use crate::io::kv::KeyValueStore;
use crate::io::persistence::{PersistenceCorruption, PersistenceGateway};

/// Time source for debounce deadlines, id seeds and save stamps.
pub trait Clock {
    fn now(&self) -> Instant;
    fn utc(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Receives every accepted mutation after it has been applied.
pub trait SessionObserver {
    fn session_changed(&mut self, change: &SessionChange, session: &Session);
}

impl<F> SessionObserver for F
where
    F: FnMut(&SessionChange, &Session),
{
    fn session_changed(&mut self, change: &SessionChange, session: &Session) {
        self(change, session);
    }
}

pub struct SessionStore<S: KeyValueStore, C: Clock = SystemClock> {
    session: Session,
    theme: Theme,
    corruption: Vec<PersistenceCorruption>,
    gateway: PersistenceGateway<S>,
    clock: C,
    observers: Vec<Box<dyn SessionObserver>>,
    /// Autosave setting as of the last persisted change.
    auto_save: bool,
}

impl<S: KeyValueStore> SessionStore<S, SystemClock> {
    pub fn open(gateway: PersistenceGateway<S>) -> Self {
        Self::open_with_clock(gateway, SystemClock)
    }
}

impl<S: KeyValueStore, C: Clock> SessionStore<S, C> {
    /// Build the store from whatever the gateway can restore.
    pub fn open_with_clock(gateway: PersistenceGateway<S>, clock: C) -> Self {
        let loaded = gateway.load();
        let auto_save = loaded.session.settings.auto_save;
        Self {
            session: loaded.session,
            theme: loaded.theme,
            corruption: loaded.corruption,
            gateway,
            clock,
            observers: Vec::new(),
            auto_save,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// Storage keys that were replaced by defaults at startup.
    pub fn corruption(&self) -> &[PersistenceCorruption] {
        &self.corruption
    }

    pub fn gateway(&self) -> &PersistenceGateway<S> {
        &self.gateway
    }

    pub fn active_file(&self) -> Option<&File> {
        self.session.active_file()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn subscribe(&mut self, observer: Box<dyn SessionObserver>) {
        self.observers.push(observer);
    }

    /// Create `untitled.js` with the JavaScript template and select it.
    pub fn add_file(&mut self) -> &Session {
        let id = self.session.fresh_id(self.clock.utc().timestamp_millis());
        let file = File::new(id, UNTITLED_NAME, Language::JavaScript);
        let change = self.session.add_file(file);
        self.commit(change)
    }

    /// Add a file read from disk, guessing its language from the name.
    pub fn add_loaded_file(&mut self, name: &str, content: String) -> &Session {
        let id = self.session.fresh_id(self.clock.utc().timestamp_millis());
        let file = File {
            id,
            name: name.to_string(),
            language: Language::detect(name),
            content,
        };
        let change = self.session.add_file(file);
        self.commit(change)
    }

    pub fn close_file(&mut self, id: &str) -> &Session {
        let change = self.session.close_file(id);
        self.commit(change)
    }

    pub fn rename_file(&mut self, id: &str, new_name: &str) -> &Session {
        let change = self.session.rename_file(id, new_name);
        self.commit(change)
    }

    /// Switch language; the file's content is replaced by the new template
    /// unless the target is plaintext.
    pub fn change_language(&mut self, id: &str, language: Language) -> &Session {
        let change = self.session.change_language(id, language);
        self.commit(change)
    }

    pub fn update_content(&mut self, id: &str, content: String) -> &Session {
        let change = self.session.update_content(id, content);
        self.commit(change)
    }

    pub fn set_active_file(&mut self, id: &str) -> &Session {
        let change = self.session.set_active_file(id);
        self.commit(change)
    }

    pub fn update_settings(&mut self, patch: &SettingsPatch) -> &Session {
        let change = self.session.update_settings(patch);
        self.commit(change)
    }

    pub fn reset_settings(&mut self) -> &Session {
        let change = self.session.reset_settings();
        self.commit(change)
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
        if let Err(err) = self.gateway.save_theme(theme) {
            warn!(err = %format!("{err:#}"), "failed to save theme");
        }
    }

    /// Write debounced files if their window has elapsed.
    ///
    /// A failed write is logged and retried on the next poll.
    pub fn poll_autosave(&mut self) -> bool {
        match self.gateway.poll(self.clock.now()) {
            Ok(written) => self.mark_saved(written),
            Err(err) => {
                warn!(err = %format!("{err:#}"), "autosave failed, will retry");
                false
            }
        }
    }

    /// Write any pending files now. Called before the store is abandoned.
    ///
    /// On error the files stay pending and a later flush can retry.
    pub fn flush(&mut self) -> Result<bool> {
        let written = self.gateway.flush().context("save pending files")?;
        Ok(self.mark_saved(written))
    }

    pub fn autosave_deadline(&self) -> Option<Instant> {
        self.gateway.autosave_deadline()
    }

    fn mark_saved(&mut self, written: bool) -> bool {
        if written {
            self.session.last_saved_at = Some(self.clock.utc());
        }
        written
    }

    #[instrument(skip_all)]
    fn commit(&mut self, change: Option<SessionChange>) -> &Session {
        let Some(change) = change else {
            debug!("mutation rejected");
            return &self.session;
        };
        debug!(?change, "mutation applied");
        self.persist(&change);
        for observer in &mut self.observers {
            observer.session_changed(&change, &self.session);
        }
        &self.session
    }

    fn persist(&mut self, change: &SessionChange) {
        let now = self.clock.now();
        if change.touches_files() {
            self.gateway.schedule_files(&self.session, now);
        }
        if change.touches_active()
            && let Err(err) = self.gateway.save_active(&self.session.active_file_id)
        {
            warn!(err = %format!("{err:#}"), "failed to save active file");
        }
        if *change == SessionChange::SettingsChanged {
            if let Err(err) = self.gateway.save_settings(&self.session.settings) {
                warn!(err = %format!("{err:#}"), "failed to save settings");
            }
            let enabled = self.session.settings.auto_save;
            if enabled != self.auto_save {
                self.auto_save = enabled;
                // Off drops a pending write; on schedules the current files.
                self.gateway.schedule_files(&self.session, now);
            }
        }
    }
}

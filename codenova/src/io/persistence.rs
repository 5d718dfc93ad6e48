//! Persistence gateway: maps the session onto independent storage keys.
//!
//! File contents are written through a debounce window so rapid typing
//! produces one write per burst. The active file id, settings and theme are
//! low-frequency and written as soon as they change.

use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use jsonschema::validator_for;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::core::debounce::Debouncer;
use crate::core::invariants::validate_files;
use crate::core::session::Session;
use crate::core::types::{File, Settings, Theme};
use crate::io::kv::KeyValueStore;

pub const FILES_KEY: &str = "code-editor-files";
pub const ACTIVE_FILE_KEY: &str = "code-editor-active-file";
pub const THEME_KEY: &str = "code-editor-theme";
pub const SETTINGS_KEY: &str = "code-editor-settings";

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1000);

const FILES_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../schemas/session_files/v1.schema.json"
));

/// A stored key that could not be used and was replaced by its default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistenceCorruption {
    pub key: &'static str,
    pub message: String,
}

/// Everything restored at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedState {
    pub session: Session,
    pub theme: Theme,
    /// Keys that failed to parse; empty on a clean load.
    pub corruption: Vec<PersistenceCorruption>,
}

pub struct PersistenceGateway<S: KeyValueStore> {
    store: S,
    autosave: Debouncer<Vec<File>>,
}

impl<S: KeyValueStore> PersistenceGateway<S> {
    pub fn new(store: S, debounce: Duration) -> Self {
        Self {
            store,
            autosave: Debouncer::new(debounce),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Restore the session, falling back to defaults key by key.
    ///
    /// Never fails: read and parse errors are logged and reported in
    /// [`LoadedState::corruption`].
    #[instrument(skip_all)]
    pub fn load(&self) -> LoadedState {
        let mut corruption = Vec::new();

        let settings = self
            .read_key(SETTINGS_KEY, &mut corruption, parse_settings)
            .unwrap_or_default();
        let files = self.read_key(FILES_KEY, &mut corruption, parse_files);
        let active = self.read_key(ACTIVE_FILE_KEY, &mut corruption, |raw| Ok(raw.to_string()));
        let theme = self
            .read_key(THEME_KEY, &mut corruption, parse_theme)
            .unwrap_or_default();

        let session = match files {
            Some(files) => {
                let active_file_id = active
                    .filter(|id| files.iter().any(|f| &f.id == id))
                    .unwrap_or_else(|| files[0].id.clone());
                Session {
                    files,
                    active_file_id,
                    settings,
                    last_saved_at: None,
                }
            }
            None => Session::with_settings(settings),
        };

        info!(
            files = session.files.len(),
            active = %session.active_file_id,
            corrupted = corruption.len(),
            "session loaded"
        );
        LoadedState {
            session,
            theme,
            corruption,
        }
    }

    fn read_key<T>(
        &self,
        key: &'static str,
        corruption: &mut Vec<PersistenceCorruption>,
        parse: impl FnOnce(&str) -> Result<T>,
    ) -> Option<T> {
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key, "no stored value");
                return None;
            }
            Err(err) => {
                warn!(key, err = %format!("{err:#}"), "failed to read stored value");
                corruption.push(PersistenceCorruption {
                    key,
                    message: format!("{err:#}"),
                });
                return None;
            }
        };
        match parse(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(key, err = %format!("{err:#}"), "stored value is corrupt, using default");
                corruption.push(PersistenceCorruption {
                    key,
                    message: format!("{err:#}"),
                });
                None
            }
        }
    }

    /// Arm the autosave window with the current files.
    ///
    /// Does nothing when autosave is disabled; a pending write is dropped.
    pub fn schedule_files(&mut self, session: &Session, now: Instant) {
        if !session.settings.auto_save {
            self.cancel_autosave();
            return;
        }
        self.autosave.schedule(now, session.files.clone());
    }

    pub fn cancel_autosave(&mut self) {
        if self.autosave.take().is_some() {
            debug!("pending autosave dropped");
        }
    }

    pub fn autosave_deadline(&self) -> Option<Instant> {
        self.autosave.deadline()
    }

    /// Write the pending files if the window has elapsed. Returns whether a
    /// write happened.
    ///
    /// The snapshot is cleared only after a successful write; on failure it
    /// stays pending with its deadline and the next poll retries it.
    pub fn poll(&mut self, now: Instant) -> Result<bool> {
        let Some(files) = self.autosave.due(now) else {
            return Ok(false);
        };
        write_files(&mut self.store, files)?;
        self.autosave.take();
        Ok(true)
    }

    /// Write the pending files immediately, if any. A failed write leaves
    /// them pending.
    pub fn flush(&mut self) -> Result<bool> {
        let Some(files) = self.autosave.pending() else {
            return Ok(false);
        };
        write_files(&mut self.store, files)?;
        self.autosave.take();
        Ok(true)
    }

    pub fn save_files(&mut self, files: &[File]) -> Result<()> {
        write_files(&mut self.store, files)
    }

    pub fn save_active(&mut self, id: &str) -> Result<()> {
        self.store.set(ACTIVE_FILE_KEY, id)
    }

    pub fn save_settings(&mut self, settings: &Settings) -> Result<()> {
        let payload = serde_json::to_string(settings).context("serialize settings")?;
        self.store.set(SETTINGS_KEY, &payload)
    }

    pub fn save_theme(&mut self, theme: Theme) -> Result<()> {
        self.store.set(THEME_KEY, theme.as_str())
    }

    /// Write every session key now, bypassing the debounce window.
    pub fn save(&mut self, session: &Session) -> Result<()> {
        self.autosave.take();
        self.save_files(&session.files)?;
        self.save_active(&session.active_file_id)?;
        self.save_settings(&session.settings)
    }
}

fn write_files<S: KeyValueStore>(store: &mut S, files: &[File]) -> Result<()> {
    let payload = serde_json::to_string(files).context("serialize files")?;
    store.set(FILES_KEY, &payload)?;
    debug!(files = files.len(), "files saved");
    Ok(())
}

fn parse_settings(raw: &str) -> Result<Settings> {
    serde_json::from_str(raw).context("parse settings")
}

fn parse_theme(raw: &str) -> Result<Theme> {
    Theme::parse(raw.trim()).ok_or_else(|| anyhow!("unknown theme '{}'", raw.trim()))
}

/// Parse stored files: JSON, schema, then semantic invariants.
fn parse_files(raw: &str) -> Result<Vec<File>> {
    let value: Value = serde_json::from_str(raw).context("parse files json")?;
    validate_schema(&value)?;
    let files: Vec<File> = serde_json::from_value(value).context("deserialize files")?;
    let errors = validate_files(&files);
    if !errors.is_empty() {
        return Err(anyhow!("file invariants failed: {}", errors.join("; ")));
    }
    Ok(files)
}

fn validate_schema(files: &Value) -> Result<()> {
    let schema: Value = serde_json::from_str(FILES_SCHEMA).context("parse files schema")?;
    let compiled = validator_for(&schema).map_err(|err| anyhow!("invalid schema: {}", err))?;
    if !compiled.is_valid(files) {
        let messages = compiled
            .iter_errors(files)
            .map(|err| err.to_string())
            .collect::<Vec<_>>();
        return Err(anyhow!(
            "files schema validation failed: {}",
            messages.join("; ")
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::language::Language;
    use crate::io::kv::{FileKvStore, MemoryKvStore};
    use crate::test_support::{FlakyKvStore, file};

    fn gateway(store: MemoryKvStore) -> PersistenceGateway<MemoryKvStore> {
        PersistenceGateway::new(store, DEFAULT_DEBOUNCE)
    }

    fn sample_session() -> Session {
        let mut session = Session::default();
        session.add_file(file("2", "solver.py", Language::Python));
        session.add_file(file("3", "Main.java", Language::Java));
        session.set_active_file("2");
        session.settings = Settings {
            font_size: 14,
            tab_size: 4,
            word_wrap: false,
            minimap: false,
            line_numbers: true,
            auto_save: true,
            format_on_save: true,
        };
        session
    }

    #[test]
    fn empty_store_loads_default_session() {
        let loaded = gateway(MemoryKvStore::new()).load();
        assert_eq!(loaded.session, Session::default());
        assert_eq!(loaded.theme, Theme::Dark);
        assert!(loaded.corruption.is_empty());
    }

    /// `last_saved_at` is runtime-only, so the round trip holds for sessions
    /// that have not been stamped by an autosave.
    #[test]
    fn save_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let session = sample_session();

        let mut gw = PersistenceGateway::new(FileKvStore::new(temp.path()), DEFAULT_DEBOUNCE);
        gw.save(&session).expect("save");
        gw.save_theme(Theme::Light).expect("save theme");

        let reopened = PersistenceGateway::new(FileKvStore::new(temp.path()), DEFAULT_DEBOUNCE);
        let loaded = reopened.load();
        assert_eq!(loaded.session, session);
        assert_eq!(loaded.theme, Theme::Light);
        assert!(loaded.corruption.is_empty());
    }

    #[test]
    fn malformed_files_fall_back_to_single_default() {
        let mut store = MemoryKvStore::new();
        store.insert(FILES_KEY, "[{\"id\": 1");
        let loaded = gateway(store).load();
        assert_eq!(loaded.session.files.len(), 1);
        assert_eq!(loaded.session, Session::default());
        assert_eq!(loaded.corruption.len(), 1);
        assert_eq!(loaded.corruption[0].key, FILES_KEY);
    }

    #[test]
    fn schema_and_invariant_violations_are_corruption() {
        for raw in [
            "[]",
            r#"[{"id":"1","name":"a.js","language":"javascript"}]"#,
            r#"[{"id":"1","name":"a.js","language":"javascript","content":""},
                {"id":"1","name":"b.js","language":"javascript","content":""}]"#,
        ] {
            let mut store = MemoryKvStore::new();
            store.insert(FILES_KEY, raw);
            let loaded = gateway(store).load();
            assert_eq!(loaded.session.files, Session::default().files, "{raw}");
            assert_eq!(loaded.corruption.len(), 1, "{raw}");
        }
    }

    #[test]
    fn corrupt_settings_do_not_block_files() {
        let mut store = MemoryKvStore::new();
        let files = vec![file("7", "x.c", Language::C), file("8", "y.py", Language::Python)];
        store.insert(FILES_KEY, &serde_json::to_string(&files).expect("json"));
        store.insert(ACTIVE_FILE_KEY, "8");
        store.insert(SETTINGS_KEY, "{not json");
        store.insert(THEME_KEY, "sepia");

        let loaded = gateway(store).load();
        assert_eq!(loaded.session.files, files);
        assert_eq!(loaded.session.active_file_id, "8");
        assert_eq!(loaded.session.settings, Settings::default());
        assert_eq!(loaded.theme, Theme::Dark);
        let keys: Vec<_> = loaded.corruption.iter().map(|c| c.key).collect();
        assert_eq!(keys, vec![SETTINGS_KEY, THEME_KEY]);
    }

    #[test]
    fn dangling_active_id_selects_first_file() {
        let mut store = MemoryKvStore::new();
        let files = vec![file("7", "x.c", Language::C)];
        store.insert(FILES_KEY, &serde_json::to_string(&files).expect("json"));
        store.insert(ACTIVE_FILE_KEY, "gone");
        let loaded = gateway(store).load();
        assert_eq!(loaded.session.active_file_id, "7");
    }

    #[test]
    fn partial_settings_merge_over_defaults() {
        let mut store = MemoryKvStore::new();
        store.insert(SETTINGS_KEY, r#"{"autoSave":false}"#);
        let loaded = gateway(store).load();
        assert!(!loaded.session.settings.auto_save);
        assert_eq!(loaded.session.settings.font_size, 18);
    }

    #[test]
    fn autosave_collapses_burst_into_one_write() {
        let start = Instant::now();
        let mut gw = gateway(MemoryKvStore::new());
        let mut session = Session::default();
        for i in 0..5u64 {
            session.update_content("1", format!("edit {i}"));
            gw.schedule_files(&session, start + Duration::from_millis(i * 200));
            assert!(!gw.poll(start + Duration::from_millis(i * 200 + 10)).expect("poll"));
        }
        assert!(gw.poll(start + Duration::from_millis(1800)).expect("poll"));
        assert!(!gw.poll(start + Duration::from_millis(4000)).expect("poll"));

        assert_eq!(gw.store().write_count(FILES_KEY), 1);
        let stored: Vec<File> =
            serde_json::from_str(gw.store().value(FILES_KEY).expect("stored")).expect("json");
        assert_eq!(stored[0].content, "edit 4");
    }

    #[test]
    fn autosave_disabled_schedules_nothing() {
        let mut gw = gateway(MemoryKvStore::new());
        let mut session = Session::default();
        gw.schedule_files(&session, Instant::now());
        session.settings.auto_save = false;
        gw.schedule_files(&session, Instant::now());
        assert_eq!(gw.autosave_deadline(), None);
        assert!(!gw.flush().expect("flush"));
        assert!(gw.store().writes().is_empty());
    }

    #[test]
    fn failed_write_keeps_files_pending() {
        let kv = FlakyKvStore::default();
        let mut gw = PersistenceGateway::new(kv.clone(), DEFAULT_DEBOUNCE);
        let mut session = Session::default();
        session.update_content("1", "unsaved edit".to_string());
        let start = Instant::now();
        gw.schedule_files(&session, start);

        kv.set_failing(true);
        assert!(gw.poll(start + Duration::from_secs(2)).is_err());
        assert!(gw.flush().is_err());
        assert_eq!(gw.autosave_deadline(), Some(start + DEFAULT_DEBOUNCE));

        kv.set_failing(false);
        assert!(gw.flush().expect("flush after recovery"));
        assert!(kv.value(FILES_KEY).expect("files").contains("unsaved edit"));
        assert!(!gw.flush().expect("nothing left"));
    }
}

//! In-memory session model and its pure mutation rules.
//!
//! Every mutation either returns the [`SessionChange`] it applied or `None`
//! when the request was rejected, in which case the session is untouched.

use chrono::{DateTime, Utc};

use crate::core::language::Language;
use crate::core::types::{File, SessionChange, Settings, SettingsPatch};

/// Name given to files created with "new file".
pub const UNTITLED_NAME: &str = "untitled.js";

/// Complete state of one editing instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub files: Vec<File>,
    pub active_file_id: String,
    pub settings: Settings,
    pub last_saved_at: Option<DateTime<Utc>>,
}

impl Default for Session {
    /// Single `main.js` file with id `"1"` and default settings.
    fn default() -> Self {
        Self::with_settings(Settings::default())
    }
}

impl Session {
    pub fn with_settings(settings: Settings) -> Self {
        let file = File::new("1", "main.js", Language::JavaScript);
        Self {
            active_file_id: file.id.clone(),
            files: vec![file],
            settings,
            last_saved_at: None,
        }
    }

    pub fn file(&self, id: &str) -> Option<&File> {
        self.files.iter().find(|f| f.id == id)
    }

    fn file_mut(&mut self, id: &str) -> Option<&mut File> {
        self.files.iter_mut().find(|f| f.id == id)
    }

    pub fn active_file(&self) -> Option<&File> {
        self.file(&self.active_file_id)
    }

    /// Smallest id at or above `seed` that no file uses yet.
    pub fn fresh_id(&self, seed: i64) -> String {
        let mut candidate = seed;
        loop {
            let id = candidate.to_string();
            if self.file(&id).is_none() {
                return id;
            }
            candidate += 1;
        }
    }

    /// Append `file` and make it active. Rejected if the id is taken.
    pub fn add_file(&mut self, file: File) -> Option<SessionChange> {
        if self.file(&file.id).is_some() {
            return None;
        }
        let id = file.id.clone();
        self.files.push(file);
        self.active_file_id = id.clone();
        Some(SessionChange::FileAdded { id })
    }

    /// Remove a file unless it is the last one.
    ///
    /// When the active file is closed the first remaining file becomes active.
    pub fn close_file(&mut self, id: &str) -> Option<SessionChange> {
        if self.files.len() <= 1 {
            return None;
        }
        let index = self.files.iter().position(|f| f.id == id)?;
        self.files.remove(index);
        if self.active_file_id == id {
            self.active_file_id = self.files[0].id.clone();
        }
        Some(SessionChange::FileClosed { id: id.to_string() })
    }

    /// Rename a file; blank names are discarded.
    pub fn rename_file(&mut self, id: &str, new_name: &str) -> Option<SessionChange> {
        let trimmed = new_name.trim();
        if trimmed.is_empty() {
            return None;
        }
        let file = self.file_mut(id)?;
        file.name = trimmed.to_string();
        Some(SessionChange::FileRenamed { id: id.to_string() })
    }

    /// Switch a file's language.
    ///
    /// The name keeps everything before the first `.` and takes the new
    /// extension. The content is replaced by the language template; plaintext
    /// has none, so switching to it keeps the content.
    pub fn change_language(&mut self, id: &str, language: Language) -> Option<SessionChange> {
        let file = self.file_mut(id)?;
        let base = file.name.split('.').next().unwrap_or_default();
        file.name = format!("{base}{}", language.extension());
        file.language = language;
        let template = language.template();
        if !template.is_empty() {
            file.content = template.to_string();
        }
        Some(SessionChange::LanguageChanged {
            id: id.to_string(),
            language,
        })
    }

    pub fn update_content(&mut self, id: &str, content: String) -> Option<SessionChange> {
        let file = self.file_mut(id)?;
        file.content = content;
        Some(SessionChange::ContentUpdated { id: id.to_string() })
    }

    pub fn set_active_file(&mut self, id: &str) -> Option<SessionChange> {
        self.file(id)?;
        self.active_file_id = id.to_string();
        Some(SessionChange::ActiveFileChanged { id: id.to_string() })
    }

    /// Merge a settings patch. Values are taken as given.
    pub fn update_settings(&mut self, patch: &SettingsPatch) -> Option<SessionChange> {
        if patch.is_empty() {
            return None;
        }
        self.settings.apply(patch);
        Some(SessionChange::SettingsChanged)
    }

    pub fn reset_settings(&mut self) -> Option<SessionChange> {
        self.settings = Settings::default();
        Some(SessionChange::SettingsChanged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::invariants::validate_invariants;
    use crate::test_support::file;

    fn three_files() -> Session {
        let mut session = Session::default();
        session.add_file(file("2", "b.py", Language::Python));
        session.add_file(file("3", "c.c", Language::C));
        session
    }

    #[test]
    fn closing_every_file_keeps_one() {
        let mut session = three_files();
        for id in ["1", "2", "3", "3", "2", "1"] {
            session.close_file(id);
            assert!(validate_invariants(&session).is_empty());
        }
        assert_eq!(session.files.len(), 1);
        assert_eq!(session.files[0].id, "3");
        assert_eq!(session.close_file("3"), None);
    }

    #[test]
    fn closing_active_file_selects_first_remaining() {
        let mut session = three_files();
        session.set_active_file("2");
        session.close_file("2");
        assert_eq!(session.active_file_id, "1");

        session.set_active_file("3");
        session.close_file("1");
        assert_eq!(session.active_file_id, "3");
    }

    #[test]
    fn closing_unknown_id_is_noop() {
        let mut session = three_files();
        let before = session.clone();
        assert_eq!(session.close_file("nope"), None);
        assert_eq!(session, before);
    }

    #[test]
    fn blank_rename_keeps_previous_name() {
        let mut session = Session::default();
        assert_eq!(session.rename_file("1", "   "), None);
        assert_eq!(session.files[0].name, "main.js");

        session.rename_file("1", "  app.js ");
        assert_eq!(session.files[0].name, "app.js");
    }

    #[test]
    fn language_switch_replaces_content_and_extension() {
        let mut session = Session::default();
        session.update_content("1", "let x = 42;".to_string());
        session.rename_file("1", "solver.v2.js");

        let change = session.change_language("1", Language::Python);
        assert_eq!(
            change,
            Some(SessionChange::LanguageChanged {
                id: "1".to_string(),
                language: Language::Python
            })
        );
        let file = &session.files[0];
        assert_eq!(file.name, "solver.py");
        assert_eq!(file.language, Language::Python);
        assert_eq!(file.content, Language::Python.template());
    }

    #[test]
    fn switching_to_plaintext_keeps_content() {
        let mut session = Session::default();
        session.update_content("1", "my notes".to_string());

        session.change_language("1", Language::PlainText);
        let file = &session.files[0];
        assert_eq!(file.name, "main.txt");
        assert_eq!(file.language, Language::PlainText);
        assert_eq!(file.content, "my notes");
    }

    #[test]
    fn set_active_rejects_unknown_id() {
        let mut session = three_files();
        assert_eq!(session.set_active_file("9"), None);
        assert_eq!(session.active_file_id, "3");
    }

    #[test]
    fn fresh_id_skips_taken_ids() {
        let session = three_files();
        assert_eq!(session.fresh_id(2), "4");
        assert_eq!(session.fresh_id(100), "100");
    }

    #[test]
    fn add_file_rejects_duplicate_id() {
        let mut session = Session::default();
        assert_eq!(session.add_file(file("1", "dup.js", Language::JavaScript)), None);
        assert_eq!(session.files.len(), 1);
    }

    #[test]
    fn update_settings_merges_without_validation() {
        let mut session = Session::default();
        session.update_settings(&SettingsPatch {
            font_size: Some(99),
            ..SettingsPatch::default()
        });
        assert_eq!(session.settings.font_size, 99);
        assert_eq!(session.update_settings(&SettingsPatch::default()), None);

        session.reset_settings();
        assert_eq!(session.settings, Settings::default());
    }
}

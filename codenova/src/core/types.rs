//! Shared deterministic types for the editor core.
//!
//! These types are the contracts between the session store, the persistence
//! gateway and the execution dispatcher. They carry no I/O.

use serde::{Deserialize, Serialize};

use crate::core::language::Language;

/// One open editor buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    /// Opaque identifier, unique within the session.
    pub id: String,
    /// Display name including extension.
    pub name: String,
    pub language: Language,
    pub content: String,
}

impl File {
    pub fn new(id: impl Into<String>, name: impl Into<String>, language: Language) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            language,
            content: language.template().to_string(),
        }
    }
}

/// Editor preferences.
///
/// Missing keys in stored JSON fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Font size in points, 10..=24.
    pub font_size: u32,
    /// One of 2, 4, 6, 8.
    pub tab_size: u32,
    pub word_wrap: bool,
    pub minimap: bool,
    pub line_numbers: bool,
    pub auto_save: bool,
    pub format_on_save: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            font_size: 18,
            tab_size: 2,
            word_wrap: true,
            minimap: true,
            line_numbers: true,
            auto_save: true,
            format_on_save: false,
        }
    }
}

impl Settings {
    pub const FONT_SIZE_MIN: u32 = 10;
    pub const FONT_SIZE_MAX: u32 = 24;
    pub const TAB_SIZES: [u32; 4] = [2, 4, 6, 8];

    /// Apply the ranges the UI controls enforce.
    ///
    /// Font size is clamped; tab size snaps to the nearest allowed value,
    /// preferring the smaller one on ties.
    pub fn clamped(mut self) -> Self {
        self.font_size = self
            .font_size
            .clamp(Self::FONT_SIZE_MIN, Self::FONT_SIZE_MAX);
        let tab_size = self.tab_size;
        self.tab_size = Self::TAB_SIZES
            .into_iter()
            .min_by_key(|allowed| allowed.abs_diff(tab_size))
            .unwrap_or(2);
        self
    }

    pub fn is_within_limits(&self) -> bool {
        (Self::FONT_SIZE_MIN..=Self::FONT_SIZE_MAX).contains(&self.font_size)
            && Self::TAB_SIZES.contains(&self.tab_size)
    }

    /// Merge the fields present in `patch`.
    pub fn apply(&mut self, patch: &SettingsPatch) {
        if let Some(v) = patch.font_size {
            self.font_size = v;
        }
        if let Some(v) = patch.tab_size {
            self.tab_size = v;
        }
        if let Some(v) = patch.word_wrap {
            self.word_wrap = v;
        }
        if let Some(v) = patch.minimap {
            self.minimap = v;
        }
        if let Some(v) = patch.line_numbers {
            self.line_numbers = v;
        }
        if let Some(v) = patch.auto_save {
            self.auto_save = v;
        }
        if let Some(v) = patch.format_on_save {
            self.format_on_save = v;
        }
    }
}

/// Partial settings update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SettingsPatch {
    pub font_size: Option<u32>,
    pub tab_size: Option<u32>,
    pub word_wrap: Option<bool>,
    pub minimap: Option<bool>,
    pub line_numbers: Option<bool>,
    pub auto_save: Option<bool>,
    pub format_on_save: Option<bool>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        self == &SettingsPatch::default()
    }
}

/// Presentation preference, persisted apart from the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    pub fn parse(value: &str) -> Option<Theme> {
        match value {
            "dark" => Some(Theme::Dark),
            "light" => Some(Theme::Light),
            _ => None,
        }
    }
}

/// Accepted session mutation, reported to observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionChange {
    FileAdded { id: String },
    FileClosed { id: String },
    FileRenamed { id: String },
    LanguageChanged { id: String, language: Language },
    ContentUpdated { id: String },
    ActiveFileChanged { id: String },
    SettingsChanged,
}

impl SessionChange {
    /// True if the file collection itself changed (debounced save).
    pub fn touches_files(&self) -> bool {
        !matches!(
            self,
            SessionChange::ActiveFileChanged { .. } | SessionChange::SettingsChanged
        )
    }

    /// True if the active file reference may have changed.
    pub fn touches_active(&self) -> bool {
        matches!(
            self,
            SessionChange::FileAdded { .. }
                | SessionChange::FileClosed { .. }
                | SessionChange::ActiveFileChanged { .. }
        )
    }
}

/// Classification of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    Success,
    /// The code ran and exited non-zero, raised, or timed out.
    ProgramFailure,
    /// The execution service could not run the code.
    TransportFailure,
    /// No runner is configured for the file's language.
    UnsupportedLanguage,
}

/// Normalized outcome of one run, ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub output_text: String,
    pub exit_code: Option<i32>,
    pub error_message: Option<String>,
    pub status: ExecutionStatus,
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Success
    }

    /// Text for the output panel.
    pub fn display_text(&self) -> String {
        let Some(error) = &self.error_message else {
            return self.output_text.clone();
        };
        match self.status {
            ExecutionStatus::Success => self.output_text.clone(),
            ExecutionStatus::ProgramFailure => match self.exit_code {
                Some(code) => format!("Execution Error (Exit Code: {code}):\n{error}"),
                None if self.output_text.is_empty() => format!("Error: {error}"),
                None => format!("{}\nError: {error}", self.output_text),
            },
            ExecutionStatus::TransportFailure => format!("API Error: {error}"),
            ExecutionStatus::UnsupportedLanguage => format!("Error: {error}"),
        }
    }
}

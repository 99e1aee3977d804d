//! Localization
//!
//! Key → per-language text. A lookup never fails: a missing key logs a
//! warning and returns the key itself, so a broken table shows raw keys
//! instead of blank labels.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Result label for the winning side.
pub const KEY_WIN: &str = "WIN";
/// Result label for the losing side.
pub const KEY_LOSE: &str = "LOSE";

/// Supported languages.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// English (fallback for partial entries).
    #[default]
    English,
    /// Simplified Chinese.
    Chinese,
    /// Spanish.
    Spanish,
}

/// Sent to subscribers when the active language changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LanguageChanged {
    /// Previous language.
    pub from: Language,
    /// New language.
    pub to: Language,
}

/// Table loading errors.
#[derive(Debug, thiserror::Error)]
pub enum LocalizationError {
    /// File could not be read.
    #[error("Failed to read localization table: {0}")]
    Io(#[from] std::io::Error),

    /// JSON did not parse.
    #[error("Invalid localization table: {0}")]
    Parse(#[from] serde_json::Error),
}

type Table = BTreeMap<String, BTreeMap<Language, String>>;

/// Text lookup with a current language.
#[derive(Debug)]
pub struct Localizer {
    table: Table,
    language: Language,
    changes: broadcast::Sender<LanguageChanged>,
}

impl Default for Localizer {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl Localizer {
    /// Localizer over `table`, starting in English.
    pub fn new(table: Table) -> Self {
        let (changes, _) = broadcast::channel(16);
        Self {
            table,
            language: Language::English,
            changes,
        }
    }

    /// Built-in table with the result labels.
    pub fn with_defaults() -> Self {
        let mut table = Table::new();
        table.insert(KEY_WIN.to_string(), BTreeMap::from([
            (Language::English, "Victory".to_string()),
            (Language::Chinese, "胜利".to_string()),
            (Language::Spanish, "Victoria".to_string()),
        ]));
        table.insert(KEY_LOSE.to_string(), BTreeMap::from([
            (Language::English, "Defeat".to_string()),
            (Language::Chinese, "失败".to_string()),
            (Language::Spanish, "Derrota".to_string()),
        ]));
        Self::new(table)
    }

    /// Parse a `{ "KEY": { "english": "...", ... } }` table.
    pub fn from_json_str(json: &str) -> Result<Self, LocalizationError> {
        let table: Table = serde_json::from_str(json)?;
        info!("Loaded {} localization keys", table.len());
        Ok(Self::new(table))
    }

    /// Read a JSON table from disk.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, LocalizationError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Text for `key` in the current language.
    pub fn lookup(&self, key: &str) -> String {
        self.lookup_in(key, self.language)
    }

    /// Text for `key` in `language`, falling back to English, then the key.
    pub fn lookup_in(&self, key: &str, language: Language) -> String {
        let Some(entry) = self.table.get(key) else {
            warn!("Text key '{}' not found for {:?}", key, language);
            return key.to_string();
        };

        if let Some(text) = entry.get(&language).or_else(|| entry.get(&Language::English)) {
            return text.clone();
        }
        warn!("Text key '{}' has no {:?} or English text", key, language);
        key.to_string()
    }

    /// Is `key` in the table?
    pub fn has_key(&self, key: &str) -> bool {
        self.table.contains_key(key)
    }

    /// Active language.
    pub fn language(&self) -> Language {
        self.language
    }

    /// Switch language, notifying subscribers if it actually changed.
    pub fn set_language(&mut self, language: Language) -> bool {
        if language == self.language {
            return false;
        }
        let change = LanguageChanged { from: self.language, to: language };
        self.language = language;
        info!("Language changed to {:?}", language);

        // No subscribers is fine.
        let _ = self.changes.send(change);
        true
    }

    /// Receive future language changes.
    pub fn subscribe(&self) -> broadcast::Receiver<LanguageChanged> {
        self.changes.subscribe()
    }
}

//! Per-call localization of step content and engine messages.
//!
//! The `Localizer` is immutable and threaded explicitly through the engine;
//! the active language always comes from the session, never from process state.

use std::collections::HashMap;

use ussd_types::error::CatalogError;

/// Message keys the engine itself emits.
pub mod keys {
    pub const INVALID_INPUT: &str = "invalid_input";
    pub const SYSTEM_ERROR: &str = "system_error";
    pub const END_SESSION_DEFAULT: &str = "end_session_default";
    pub const MORE_SUFFIX: &str = "more_suffix";
}

/// English texts used when no catalog provides the engine keys.
fn builtin_default(key: &str) -> Option<&'static str> {
    match key {
        keys::INVALID_INPUT => Some("Invalid input. Please try again."),
        keys::SYSTEM_ERROR => Some("Sorry, the service is unavailable. Please try again later."),
        keys::END_SESSION_DEFAULT => Some("Thank you. Your request was successful."),
        keys::MORE_SUFFIX => Some("\nn. More"),
        _ => None,
    }
}

/// Translation tables keyed by language, then by message key.
#[derive(Debug, Clone)]
pub struct Localizer {
    languages: HashMap<String, HashMap<String, String>>,
    fallback_language: String,
}

impl Localizer {
    /// A localizer with no translations: keys resolve to built-in defaults or
    /// to themselves.
    pub fn empty(fallback_language: impl Into<String>) -> Self {
        Self {
            languages: HashMap::new(),
            fallback_language: fallback_language.into(),
        }
    }

    pub fn new(
        languages: HashMap<String, HashMap<String, String>>,
        fallback_language: impl Into<String>,
    ) -> Self {
        Self {
            languages,
            fallback_language: fallback_language.into(),
        }
    }

    /// Parse a TOML document with one table per language:
    ///
    /// ```toml
    /// [en]
    /// "menu.home" = "1. Balance\n2. Help"
    /// ```
    pub fn from_toml(content: &str, fallback_language: &str) -> Result<Self, CatalogError> {
        let languages: HashMap<String, HashMap<String, String>> =
            toml::from_str(content).map_err(|e| CatalogError::Parse(e.to_string()))?;
        Ok(Self::new(languages, fallback_language))
    }

    /// Resolve `key` for `language`.
    ///
    /// Lookup order: requested language, fallback language, built-in engine
    /// default, then the key itself (content authored as literal text).
    pub fn resolve(&self, key: &str, language: &str) -> String {
        [language, self.fallback_language.as_str()]
            .iter()
            .find_map(|lang| self.languages.get(*lang).and_then(|table| table.get(key)))
            .cloned()
            .or_else(|| builtin_default(key).map(str::to_string))
            .unwrap_or_else(|| key.to_string())
    }

    pub fn fallback_language(&self) -> &str {
        &self.fallback_language
    }

    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.languages.keys().map(String::as_str)
    }
}

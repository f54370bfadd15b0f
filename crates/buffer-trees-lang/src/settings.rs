//! User settings, loaded from JSON.
//!
//! Every field is optional in the file; missing fields take their defaults.
//!
//! ```json
//! {
//!   "installed_languages": ["python", "rust"],
//!   "language_name_to_scopes": { "javascript": ["source.js", "source.mjs"] },
//!   "language_name_to_debounce_ms": { "markdown": 150 },
//!   "file_ignore_patterns": ["/node_modules/"],
//!   "debug": false,
//!   "queries_path": "/path/to/queries",
//!   "max_cached_trees": 16
//! }
//! ```

use crate::scopes::ScopeMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors produced while loading settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file could not be read.
    #[error("failed to read settings from {path}: {source}")]
    Io {
        /// Settings file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The settings text is not valid JSON for [`Settings`].
    #[error("invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// A file ignore pattern is not a valid regular expression.
    #[error("invalid file ignore pattern {pattern:?}: {source}")]
    InvalidIgnorePattern {
        /// Offending pattern.
        pattern: String,
        /// Regex compile error.
        #[source]
        source: regex::Error,
    },
}

/// User settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Grammars the host has installed.
    pub installed_languages: Vec<String>,
    /// Per-language scope lists, replacing the built-in entry for each language named.
    pub language_name_to_scopes: BTreeMap<String, Vec<String>>,
    /// Per-language debounce hints for callers that throttle re-parsing.
    pub language_name_to_debounce_ms: BTreeMap<String, f64>,
    /// Regexes matched against file paths; a match disables tree tracking for the file.
    pub file_ignore_patterns: Vec<String>,
    /// Enables extra consistency checks in the store.
    pub debug: bool,
    /// Directory holding query files laid out as `<queries_path>/<language>/<file>`, for
    /// instance `python/symbols.scm`.
    pub queries_path: Option<PathBuf>,
    /// Upper bound on the number of cached trees.
    pub max_cached_trees: Option<usize>,
}

impl Settings {
    /// Parse settings from JSON text and check the ignore patterns.
    pub fn from_json(text: &str) -> Result<Self, SettingsError> {
        let settings: Settings = serde_json::from_str(text)?;
        settings.ignore_patterns()?;
        Ok(settings)
    }

    /// Read and parse a settings file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_json(&text)?;
        tracing::debug!(
            path = %path.display(),
            languages = settings.installed_languages.len(),
            "loaded settings"
        );
        Ok(settings)
    }

    /// Built-in scopes merged with `language_name_to_scopes`.
    pub fn scope_map(&self) -> ScopeMap {
        ScopeMap::with_overrides(&self.language_name_to_scopes)
    }

    /// [`Settings::scope_map`] restricted to `installed_languages`.
    pub fn installed_scope_map(&self) -> ScopeMap {
        let mut map = self.scope_map();
        map.retain_languages(&self.installed_languages);
        map
    }

    /// Debounce hint for `language`, zero when unset or not a positive number.
    pub fn debounce_for(&self, language: &str) -> Duration {
        let ms = self
            .language_name_to_debounce_ms
            .get(language)
            .copied()
            .unwrap_or(0.0);
        if ms.is_finite() && ms > 0.0 {
            Duration::from_millis(ms.round() as u64)
        } else {
            Duration::ZERO
        }
    }

    /// Compile `file_ignore_patterns`.
    pub fn ignore_patterns(&self) -> Result<IgnorePatterns, SettingsError> {
        IgnorePatterns::new(&self.file_ignore_patterns)
    }
}

/// Compiled file ignore patterns.
#[derive(Debug, Clone, Default)]
pub struct IgnorePatterns {
    patterns: Vec<Regex>,
}

impl IgnorePatterns {
    /// Compile a list of regexes.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, SettingsError> {
        let patterns = patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern.as_ref()).map_err(|source| {
                    SettingsError::InvalidIgnorePattern {
                        pattern: pattern.as_ref().to_string(),
                        source,
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Returns `true` if any pattern matches somewhere in `path`.
    pub fn is_ignored(&self, path: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.is_match(path))
    }

    /// Number of patterns.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Returns `true` if there are no patterns.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

//! Grammar registry: grammar name → loaded tree-sitter language.

use crate::error::{Error, Result};
use buffer_trees_lang::{ScopeMap, Settings};
use std::collections::HashMap;
use std::fmt;
use tree_sitter::Language;

#[derive(Clone)]
enum GrammarEntry {
    Loaded(Language),
    Unavailable(String),
}

/// Loaded grammars plus the scope table used to pick one for an editor scope.
#[derive(Clone)]
pub struct GrammarRegistry {
    grammars: HashMap<String, GrammarEntry>,
    all_scopes: ScopeMap,
    scopes: ScopeMap,
}

impl fmt::Debug for GrammarRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.grammars.keys().collect();
        names.sort();
        f.debug_struct("GrammarRegistry")
            .field("grammars", &names)
            .field("scopes", &self.scopes.scope_count())
            .finish()
    }
}

impl Default for GrammarRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl GrammarRegistry {
    /// An empty registry using the built-in scope table.
    pub fn new() -> Self {
        Self::with_scopes(ScopeMap::builtin())
    }

    /// An empty registry using `scopes` to map editor scopes to grammar names.
    pub fn with_scopes(scopes: ScopeMap) -> Self {
        Self {
            grammars: HashMap::new(),
            all_scopes: scopes,
            scopes: ScopeMap::new(),
        }
    }

    /// Build a registry from settings and the languages the host could load.
    ///
    /// When `installed_languages` is non-empty only those grammars are registered; an installed
    /// grammar missing from `languages` is recorded as unavailable.
    pub fn from_settings<I, S>(settings: &Settings, languages: I) -> Self
    where
        I: IntoIterator<Item = (S, Language)>,
        S: Into<String>,
    {
        let mut registry = Self::with_scopes(settings.scope_map());
        let installed = &settings.installed_languages;
        for (name, language) in languages {
            let name = name.into();
            if !installed.is_empty() && !installed.contains(&name) {
                tracing::debug!(grammar = %name, "skipping grammar that is not installed");
                continue;
            }
            registry.register(name, language);
        }
        for name in installed {
            if !registry.grammars.contains_key(name) {
                registry.mark_unavailable(name.clone(), "grammar was not provided by the host");
            }
        }
        registry
    }

    /// Register a loaded grammar, replacing any previous entry.
    pub fn register(&mut self, name: impl Into<String>, language: Language) -> &mut Self {
        self.grammars
            .insert(name.into(), GrammarEntry::Loaded(language));
        self.refresh_scopes();
        self
    }

    /// Record that `name` is known but cannot be loaded.
    pub fn mark_unavailable(
        &mut self,
        name: impl Into<String>,
        reason: impl Into<String>,
    ) -> &mut Self {
        let name = name.into();
        let reason = reason.into();
        tracing::warn!(grammar = %name, %reason, "grammar unavailable");
        self.grammars
            .insert(name, GrammarEntry::Unavailable(reason));
        self.refresh_scopes();
        self
    }

    fn refresh_scopes(&mut self) {
        let mut scopes = self.all_scopes.clone();
        let names: Vec<&str> = self.grammars.keys().map(String::as_str).collect();
        scopes.retain_languages(&names);
        self.scopes = scopes;
    }

    /// The language for `name`.
    pub fn grammar_for(&self, name: &str) -> Result<&Language> {
        match self.grammars.get(name) {
            Some(GrammarEntry::Loaded(language)) => Ok(language),
            Some(GrammarEntry::Unavailable(reason)) => Err(Error::GrammarUnavailable {
                grammar: name.to_string(),
                reason: reason.clone(),
            }),
            None => Err(Error::UnsupportedGrammar(name.to_string())),
        }
    }

    /// Returns `true` if `name` is registered, loaded or not.
    pub fn is_supported(&self, name: &str) -> bool {
        self.grammars.contains_key(name)
    }

    /// Grammar name for an editor scope: the exact scope, else the longest registered scope
    /// that `scope` extends with a dot.
    pub fn scope_to_grammar(&self, scope: &str) -> Option<&str> {
        self.scopes.language_for_scope(scope)
    }

    /// Registered grammar names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.grammars.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered grammars.
    pub fn len(&self) -> usize {
        self.grammars.len()
    }

    /// Returns `true` if no grammar is registered.
    pub fn is_empty(&self) -> bool {
        self.grammars.is_empty()
    }
}

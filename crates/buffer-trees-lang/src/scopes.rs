//! Editor scope → grammar name mapping.

use std::collections::{BTreeMap, HashMap};

/// Built-in `(grammar name, editor scopes)` table.
pub const LANGUAGE_NAME_TO_SCOPES: &[(&str, &[&str])] = &[
    ("bash", &["source.shell"]),
    ("c", &["source.c"]),
    ("c_sharp", &["source.cs"]),
    ("clojure", &["source.clojure"]),
    ("cpp", &["source.c++"]),
    ("css", &["source.css"]),
    ("dockerfile", &["source.dockerfile"]),
    ("elixir", &["source.elixir"]),
    ("elm", &["source.elm"]),
    ("erlang", &["source.erlang"]),
    ("go", &["source.go"]),
    ("hack", &["source.hack"]),
    ("haskell", &["source.haskell"]),
    ("hcl", &["source.hcl"]),
    ("html", &["text.html.basic", "text.xml"]),
    ("java", &["source.java"]),
    ("javascript", &["source.js", "source.jsx"]),
    ("json", &["source.json"]),
    ("julia", &["source.julia"]),
    ("kotlin", &["source.Kotlin"]),
    ("latex", &["text.tex.latex"]),
    ("lua", &["source.lua"]),
    ("make", &["source.makefile"]),
    ("markdown", &["text.html.markdown"]),
    ("objc", &["source.objc"]),
    ("ocaml", &["source.ocaml"]),
    ("perl", &["source.perl"]),
    ("php", &["source.php"]),
    ("python", &["source.python"]),
    ("query", &["source.scheme"]),
    ("r", &["source.r"]),
    ("regex", &["source.regexp"]),
    ("rst", &["text.restructuredtext"]),
    ("ruby", &["source.ruby"]),
    ("rust", &["source.rust"]),
    ("scala", &["source.scala"]),
    ("scss", &["source.scss"]),
    ("sql", &["source.sql"]),
    ("svelte", &["text.html.svelte"]),
    ("terraform", &["source.terraform"]),
    ("toml", &["source.toml"]),
    ("tsx", &["source.tsx"]),
    ("typescript", &["source.ts"]),
    ("vue", &["text.html.vue"]),
    ("yaml", &["source.yaml"]),
    ("zig", &["source.zig"]),
];

/// Bidirectional scope/grammar lookup.
///
/// A scope that is not registered resolves through the longest registered scope it extends
/// with a dot, so `source.yaml.sublime.syntax` uses the `source.yaml` grammar.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeMap {
    language_to_scopes: BTreeMap<String, Vec<String>>,
    scope_to_language: HashMap<String, String>,
}

impl ScopeMap {
    /// An empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in table.
    pub fn builtin() -> Self {
        let mut map = Self::new();
        for (language, scopes) in LANGUAGE_NAME_TO_SCOPES {
            map.insert(*language, scopes.iter().map(|s| s.to_string()));
        }
        map
    }

    /// The built-in table with `overrides` replacing the scopes of the languages they name.
    ///
    /// When two languages claim one scope, the override wins.
    pub fn with_overrides(overrides: &BTreeMap<String, Vec<String>>) -> Self {
        let mut map = Self::new();
        for (language, scopes) in LANGUAGE_NAME_TO_SCOPES {
            if !overrides.contains_key(*language) {
                map.insert(*language, scopes.iter().map(|s| s.to_string()));
            }
        }
        for (language, scopes) in overrides {
            tracing::debug!(language, ?scopes, "overriding language scopes");
            map.insert(language.clone(), scopes.iter().cloned());
        }
        map
    }

    /// Register `language` for `scopes`, replacing its previous scopes.
    pub fn insert<I>(&mut self, language: impl Into<String>, scopes: I)
    where
        I: IntoIterator<Item = String>,
    {
        let language = language.into();
        if let Some(old) = self.language_to_scopes.remove(&language) {
            for scope in old {
                if self.scope_to_language.get(&scope) == Some(&language) {
                    self.scope_to_language.remove(&scope);
                }
            }
        }

        let scopes: Vec<String> = scopes.into_iter().collect();
        for scope in &scopes {
            self.scope_to_language
                .insert(scope.clone(), language.clone());
        }
        self.language_to_scopes.insert(language, scopes);
    }

    /// Keep only the named languages.
    pub fn retain_languages<S: AsRef<str>>(&mut self, languages: &[S]) {
        self.language_to_scopes
            .retain(|language, _| languages.iter().any(|l| l.as_ref() == language.as_str()));
        let language_to_scopes = &self.language_to_scopes;
        self.scope_to_language
            .retain(|_, language| language_to_scopes.contains_key(language));
    }

    /// The registered scope `scope` resolves to: itself, or the longest registered dotted prefix.
    pub fn resolve_scope(&self, scope: &str) -> Option<&str> {
        if let Some((registered, _)) = self.scope_to_language.get_key_value(scope) {
            return Some(registered.as_str());
        }
        self.scope_to_language
            .keys()
            .filter(|registered| {
                scope
                    .strip_prefix(registered.as_str())
                    .is_some_and(|rest| rest.starts_with('.'))
            })
            .max_by_key(|registered| registered.len())
            .map(String::as_str)
    }

    /// Grammar name for a scope, resolving prefixes.
    pub fn language_for_scope(&self, scope: &str) -> Option<&str> {
        let resolved = self.resolve_scope(scope)?;
        self.scope_to_language.get(resolved).map(String::as_str)
    }

    /// Scopes registered for a language.
    pub fn scopes_for(&self, language: &str) -> &[String] {
        self.language_to_scopes
            .get(language)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Registered languages, sorted.
    pub fn languages(&self) -> impl Iterator<Item = &str> + '_ {
        self.language_to_scopes.keys().map(String::as_str)
    }

    /// Number of registered scopes.
    pub fn scope_count(&self) -> usize {
        self.scope_to_language.len()
    }
}

#![warn(missing_docs)]
//! `buffer-trees-lang` - data-driven language configuration for `buffer-trees`.
//!
//! This crate intentionally stays lightweight and does **not** depend on any parser. It maps
//! editor syntax scopes (such as `source.python`) to grammar names and carries the user
//! settings that shape a buffer tree store.

pub mod scopes;
pub mod settings;

pub use scopes::{LANGUAGE_NAME_TO_SCOPES, ScopeMap};
pub use settings::{IgnorePatterns, Settings, SettingsError};

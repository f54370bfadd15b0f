#![warn(missing_docs)]
//! `buffer-trees-treesitter` - Tree-sitter backed buffer trees.
//!
//! This crate keeps one incrementally re-parsed syntax tree per open buffer:
//!
//! - a grammar registry mapping grammar names and editor scopes to loaded languages
//! - a parse engine turning sources and edits into arena [`buffer_trees::SyntaxTree`]s
//! - a store holding the current tree for every buffer and broadcasting replacements
//! - query-based symbol extraction from `symbols.scm` files
//!
//! ```rust
//! use buffer_trees::{BufferId, Edit};
//! use buffer_trees_treesitter::{BufferTreeStore, GrammarRegistry};
//! use std::sync::Arc;
//!
//! let mut registry = GrammarRegistry::new();
//! registry.register("python", tree_sitter_python::LANGUAGE.into());
//! let store = BufferTreeStore::new(Arc::new(registry));
//!
//! let buffer = BufferId::new(1);
//! store.track(buffer, "python", b"def f():\n    pass\n").unwrap();
//!
//! let edit = Edit::insert("def f():\n    pass\n", 5, "oo").unwrap();
//! let tree = store.update(buffer, &edit, b"def foo():\n    pass\n").unwrap();
//! assert_eq!(tree.root().end_byte(), tree.source_len());
//! ```

mod convert;
mod engine;
mod error;
mod query;
mod registry;
mod store;

pub use convert::{input_edit, to_syntax_tree};
pub use engine::{ParseEngine, ParseMode, ParsedTree};
pub use error::{Error, Result};
pub use query::{SYMBOLS_FILE, SymbolQuery, load_query_source};
pub use registry::GrammarRegistry;
pub use store::{BufferEntry, BufferTreeStore, StoreOptions};

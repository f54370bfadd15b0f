use buffer_trees::{BufferId, EditError, NavigationError, TreeBuildError};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
/// Errors produced by the registry, the parse engine and the buffer tree store.
pub enum Error {
    #[error("no grammar registered under {0:?}")]
    /// No grammar is registered under the requested name.
    UnsupportedGrammar(String),

    #[error("source is not valid UTF-8 (valid up to byte {valid_up_to})")]
    /// The source bytes are not UTF-8.
    UnsupportedEncoding {
        /// Length of the longest valid UTF-8 prefix.
        valid_up_to: usize,
    },

    #[error("grammar {grammar:?} is unavailable: {reason}")]
    /// The grammar is known but its parser cannot be loaded.
    GrammarUnavailable {
        /// Grammar name.
        grammar: String,
        /// Why loading failed.
        reason: String,
    },

    #[error("{0} is not tracked")]
    /// The buffer has no entry; `track` it first.
    UntrackedBuffer(BufferId),

    #[error(transparent)]
    /// A navigation range was out of bounds.
    OutOfBounds(#[from] NavigationError),

    #[error("parser produced no tree for grammar {0:?}")]
    /// The parser gave up without producing a tree.
    ParseFailure(String),

    #[error("parser tree could not be converted: {0}")]
    /// The parser's tree did not convert into a well-formed arena tree.
    Conversion(#[from] TreeBuildError),

    #[error("invalid edit: {0}")]
    /// An edit or change does not fit the stored source.
    InvalidEdit(#[from] EditError),

    #[error("replaying the changes for {0} does not reproduce the new source")]
    /// Applying editor changes to the stored source did not yield the new source.
    EditMismatch(BufferId),

    #[error("{0} was mutated from inside its own change notification")]
    /// An observer re-entered the store for the buffer being notified.
    ReentrantUpdate(BufferId),

    #[error("query error: {0}")]
    /// A symbol query failed to compile or does not fit the buffer.
    Query(String),

    #[error("failed to read query file {path}: {source}")]
    /// A query file could not be read.
    QueryFile {
        /// Query file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;

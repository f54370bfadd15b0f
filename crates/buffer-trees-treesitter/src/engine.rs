//! Parse engine: full and incremental parses producing arena trees.

use crate::convert::{input_edit, to_syntax_tree};
use crate::error::{Error, Result};
use crate::registry::GrammarRegistry;
use buffer_trees::{Edit, SourceIndex, SyntaxTree, TextChange};
use std::sync::Arc;
use tree_sitter::{Parser, Tree};

/// How a [`ParsedTree`] was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// Parsed from scratch.
    Full,
    /// Re-parsed from an edited previous tree.
    Incremental,
}

/// A parse result: the parser's own tree plus its arena copy.
#[derive(Debug, Clone)]
pub struct ParsedTree {
    raw: Tree,
    tree: Arc<SyntaxTree>,
    mode: ParseMode,
}

impl ParsedTree {
    /// The parser's tree, kept for incremental reuse and queries.
    pub fn raw(&self) -> &Tree {
        &self.raw
    }

    /// The arena tree.
    pub fn tree(&self) -> &Arc<SyntaxTree> {
        &self.tree
    }

    /// How this tree was produced.
    pub fn mode(&self) -> ParseMode {
        self.mode
    }

    /// Grammar name.
    pub fn grammar(&self) -> &str {
        self.tree.grammar()
    }

    /// Parsed source text.
    pub fn source(&self) -> &str {
        self.tree.source()
    }
}

/// Parses sources with grammars from a [`GrammarRegistry`].
///
/// A fresh `tree_sitter::Parser` is created for every call, so one engine can be shared across
/// threads.
#[derive(Debug, Clone, Copy)]
pub struct ParseEngine<'r> {
    registry: &'r GrammarRegistry,
}

impl<'r> ParseEngine<'r> {
    /// Create an engine over `registry`.
    pub fn new(registry: &'r GrammarRegistry) -> Self {
        Self { registry }
    }

    /// Full parse of `source`.
    pub fn parse(&self, grammar: &str, source: &[u8]) -> Result<ParsedTree> {
        self.reparse(None, None, grammar, source)
    }

    /// Re-parse `source`, reusing `previous` when an `edit` describes how it changed.
    ///
    /// Falls back to a full parse when either is missing or when `previous` used another grammar.
    pub fn reparse(
        &self,
        previous: Option<&ParsedTree>,
        edit: Option<&Edit>,
        grammar: &str,
        source: &[u8],
    ) -> Result<ParsedTree> {
        let edits = edit.map(std::slice::from_ref).unwrap_or_default();
        self.reparse_with_edits(previous, edits, grammar, source)
    }

    /// Apply `edits` in order to `previous` and re-parse once.
    ///
    /// Each edit is expressed against the source produced by the edits before it; the last one
    /// must land on `source.len()`.
    pub fn reparse_with_edits(
        &self,
        previous: Option<&ParsedTree>,
        edits: &[Edit],
        grammar: &str,
        source: &[u8],
    ) -> Result<ParsedTree> {
        let text = decode(source)?;
        let mut parser = self.parser(grammar)?;

        let old = match previous {
            Some(previous) if previous.grammar() == grammar && !edits.is_empty() => {
                check_edits(previous.tree.source_len(), edits, text.len())?;
                let mut old = previous.raw.clone();
                for edit in edits {
                    old.edit(&input_edit(edit));
                }
                Some(old)
            }
            _ => None,
        };
        let mode = if old.is_some() {
            ParseMode::Incremental
        } else {
            ParseMode::Full
        };

        tracing::debug!(
            grammar,
            bytes = text.len(),
            incremental = old.is_some(),
            edits = edits.len(),
            "parsing"
        );
        let raw = parser
            .parse(text, old.as_ref())
            .ok_or_else(|| Error::ParseFailure(grammar.to_string()))?;
        let tree = to_syntax_tree(&raw, grammar, Arc::from(text))?;

        Ok(ParsedTree {
            raw,
            tree: Arc::new(tree),
            mode,
        })
    }

    /// Convert one editor change into an [`Edit`] against `source_before`.
    pub fn edit_for_change(source_before: &str, change: &TextChange) -> Result<Edit> {
        let index = SourceIndex::from_text(source_before);
        Ok(Edit::from_change(&index, change)?)
    }

    /// Convert a sequence of editor changes into edits, returning them with the replayed text.
    pub fn edits_for_changes(
        source_before: &str,
        changes: &[TextChange],
    ) -> Result<(Vec<Edit>, String)> {
        let mut index = SourceIndex::from_text(source_before);
        let mut edits = Vec::with_capacity(changes.len());
        for change in changes {
            edits.push(Edit::from_change(&index, change)?);
            change.apply(&mut index);
        }
        Ok((edits, index.text()))
    }

    fn parser(&self, grammar: &str) -> Result<Parser> {
        let language = self.registry.grammar_for(grammar)?;
        let mut parser = Parser::new();
        parser
            .set_language(language)
            .map_err(|err| Error::GrammarUnavailable {
                grammar: grammar.to_string(),
                reason: err.to_string(),
            })?;
        Ok(parser)
    }
}

fn decode(source: &[u8]) -> Result<&str> {
    std::str::from_utf8(source).map_err(|err| Error::UnsupportedEncoding {
        valid_up_to: err.valid_up_to(),
    })
}

fn check_edits(old_len: usize, edits: &[Edit], new_len: usize) -> Result<()> {
    let mut len = old_len;
    for (idx, edit) in edits.iter().enumerate() {
        let expected = if idx + 1 == edits.len() {
            new_len
        } else {
            (len + edit.new_end_byte.saturating_sub(edit.start_byte))
                .saturating_sub(edit.old_end_byte.saturating_sub(edit.start_byte))
        };
        edit.validate(len, expected)?;
        len = expected;
    }
    Ok(())
}

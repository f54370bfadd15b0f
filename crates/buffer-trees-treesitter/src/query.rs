//! Query-based symbol extraction.
//!
//! Query files live at `<queries_path>/<language>/<file>` and may pull in other languages'
//! queries with a `; inherits: a,b` line. Captures named `definition.<kind>` produce symbols.
//! A `breadcrumb.N` capture on the same node marks the ancestor `N` levels up as the scope that
//! symbol contains. Every other capture is ignored.

use crate::engine::ParsedTree;
use crate::error::{Error, Result};
use crate::registry::GrammarRegistry;
use buffer_trees::navigator::smallest_node_covering;
use buffer_trees::symbols::normalize_name;
use buffer_trees::{ByteRange, Symbol, SymbolKind};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use streaming_iterator::StreamingIterator;
use tree_sitter::{Language, Node, Query, QueryCursor};

/// Default symbol query file name.
pub const SYMBOLS_FILE: &str = "symbols.scm";

const INHERITS_PREFIX: &str = "; inherits:";
const DEFINITION_PREFIX: &str = "definition.";
const BREADCRUMB: &str = "breadcrumb";
const AD_HOC_CAPTURE: &str = "definition.query";

/// A compiled symbol query for one grammar.
#[derive(Debug)]
pub struct SymbolQuery {
    grammar: String,
    query: Query,
    captures: Vec<CaptureRole>,
}

impl SymbolQuery {
    /// Compile `source` for the grammar registered under `grammar`.
    pub fn new(registry: &GrammarRegistry, grammar: &str, source: &str) -> Result<Self> {
        let language = registry.grammar_for(grammar)?;
        Self::from_language(grammar, language, source)
    }

    /// Compile `source` against an already loaded language.
    pub fn from_language(grammar: &str, language: &Language, source: &str) -> Result<Self> {
        let query = Query::new(language, source).map_err(|err| Error::Query(err.to_string()))?;
        let captures = query
            .capture_names()
            .iter()
            .map(|name| CaptureRole::from_name(name))
            .collect();
        Ok(Self {
            grammar: grammar.to_string(),
            query,
            captures,
        })
    }

    /// Compile a query typed in by a user.
    ///
    /// A query with no capture at all is wrapped as `((query) @definition.query)`, so every node
    /// it matches becomes a symbol of unknown kind.
    pub fn ad_hoc(registry: &GrammarRegistry, grammar: &str, query: &str) -> Result<Self> {
        if query.contains('@') {
            Self::new(registry, grammar, query)
        } else {
            Self::new(registry, grammar, &format!("(({query}) @{AD_HOC_CAPTURE})"))
        }
    }

    /// Grammar the query was compiled for.
    pub fn grammar(&self) -> &str {
        &self.grammar
    }

    /// Run the query over a parsed buffer.
    ///
    /// The captured node is the symbol. Its name is the text of its `name` field child when it
    /// has one, else its own text.
    ///
    /// A definition capture that also carries `breadcrumb.N` opens a scope at the node `N` levels
    /// above it; otherwise the scope is the defining node, i.e. the parent when the capture is
    /// that parent's `name` field. A symbol's container is the symbol owning the nearest scope
    /// strictly above its own.
    pub fn run(&self, parsed: &ParsedTree) -> Result<Vec<Symbol>> {
        self.check_grammar(parsed)?;
        let root = parsed.raw().root_node();
        Ok(self.collect(parsed, &[root]))
    }

    /// Run the query only inside the nodes spanning `ranges`.
    ///
    /// Each range is widened to the smallest node covering it, then to that node's outermost
    /// ancestor with the same extent. With no ranges the whole tree is searched.
    pub fn run_within(&self, parsed: &ParsedTree, ranges: &[ByteRange]) -> Result<Vec<Symbol>> {
        self.check_grammar(parsed)?;
        let raw_root = parsed.raw().root_node();
        if ranges.is_empty() {
            return Ok(self.collect(parsed, &[raw_root]));
        }

        let mut search = Vec::with_capacity(ranges.len());
        for &range in ranges {
            let covering = smallest_node_covering(parsed.tree(), range)?;
            let Some(mut node) =
                raw_root.descendant_for_byte_range(covering.start_byte(), covering.end_byte())
            else {
                continue;
            };
            while let Some(parent) = node.parent() {
                if parent.byte_range() != node.byte_range() {
                    break;
                }
                node = parent;
            }
            search.push(node);
        }
        Ok(self.collect(parsed, &search))
    }

    fn check_grammar(&self, parsed: &ParsedTree) -> Result<()> {
        if parsed.grammar() != self.grammar {
            return Err(Error::Query(format!(
                "query compiled for {:?} cannot run on a {:?} tree",
                self.grammar,
                parsed.grammar()
            )));
        }
        Ok(())
    }

    fn collect(&self, parsed: &ParsedTree, search: &[Node<'_>]) -> Vec<Symbol> {
        let source = parsed.source().as_bytes();
        let mut cursor = QueryCursor::new();
        let mut definitions = Vec::new();
        let mut breadcrumbs: HashMap<usize, usize> = HashMap::new();

        for &search_node in search {
            let mut matches = cursor.matches(&self.query, search_node, source);
            while let Some(m) = matches.next() {
                for capture in m.captures {
                    match self.captures.get(capture.index as usize) {
                        Some(CaptureRole::Definition(kind)) => {
                            definitions.push((capture.node, *kind));
                        }
                        Some(CaptureRole::Breadcrumb(depth)) => {
                            breadcrumbs.insert(capture.node.id(), *depth);
                        }
                        _ => {}
                    }
                }
            }
        }

        let mut found: Vec<(Symbol, Node<'_>)> = Vec::new();
        for (node, kind) in definitions {
            let name_node = node.child_by_field_name("name").unwrap_or(node);
            let name = name_node
                .utf8_text(source)
                .map(normalize_name)
                .unwrap_or_default();
            if name.is_empty() {
                tracing::trace!(
                    kind = kind.as_str(),
                    start = node.start_byte(),
                    end = node.end_byte(),
                    "dropping capture with an empty name"
                );
                continue;
            }
            let symbol = Symbol {
                name,
                range: ByteRange::new(node.start_byte(), node.end_byte()),
                name_range: ByteRange::new(name_node.start_byte(), name_node.end_byte()),
                kind,
                container: None,
            };
            found.push((symbol, scope_of(node, breadcrumbs.get(&node.id()).copied())));
        }

        // Overlapping search nodes capture the same definition more than once.
        let mut seen = HashSet::new();
        found.retain(|(symbol, _)| {
            seen.insert((symbol.range, symbol.name_range, symbol.kind.as_str()))
        });
        found.sort_by_key(|(symbol, _)| symbol.range.start);

        let mut owners: HashMap<usize, &str> = HashMap::new();
        for (symbol, scope) in &found {
            owners.entry(scope.id()).or_insert(symbol.name.as_str());
        }
        let containers: Vec<Option<String>> = found
            .iter()
            .map(|(_, scope)| {
                std::iter::successors(scope.parent(), Node::parent)
                    .find_map(|ancestor| owners.get(&ancestor.id()))
                    .map(|name| name.to_string())
            })
            .collect();

        found
            .into_iter()
            .zip(containers)
            .map(|((mut symbol, _), container)| {
                symbol.container = container;
                symbol
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CaptureRole {
    Definition(SymbolKind),
    Breadcrumb(usize),
    Other,
}

impl CaptureRole {
    fn from_name(name: &str) -> Self {
        if name.starts_with(DEFINITION_PREFIX) {
            return Self::Definition(SymbolKind::from_capture_name(name));
        }
        match name.split('.').collect::<Vec<_>>().as_slice() {
            [BREADCRUMB, depth] => Self::Breadcrumb(depth.parse().unwrap_or(0)),
            [BREADCRUMB] => Self::Breadcrumb(0),
            _ => Self::Other,
        }
    }
}

/// The node a definition opens for the symbols nested below it.
fn scope_of(node: Node<'_>, breadcrumb_depth: Option<usize>) -> Node<'_> {
    match breadcrumb_depth {
        Some(depth) => {
            let mut scope = node;
            for _ in 0..depth {
                match scope.parent() {
                    Some(parent) => scope = parent,
                    None => break,
                }
            }
            scope
        }
        None => match node.parent() {
            Some(parent) if parent.child_by_field_name("name") == Some(node) => parent,
            _ => node,
        },
    }
}

/// Read `<queries_path>/<language>/<file>` and append every inherited language's query.
///
/// A missing top-level file is an error; missing inherited files are skipped.
pub fn load_query_source(
    queries_path: impl AsRef<Path>,
    language: &str,
    file: &str,
) -> Result<String> {
    let mut visiting = Vec::new();
    load(queries_path.as_ref(), language, file, false, &mut visiting)
}

fn load(
    queries_path: &Path,
    language: &str,
    file: &str,
    inherited: bool,
    visiting: &mut Vec<String>,
) -> Result<String> {
    if visiting.iter().any(|seen| seen == language) {
        tracing::debug!(language, "query inheritance cycle, skipping");
        return Ok(String::new());
    }

    let path = queries_path.join(language).join(file);
    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if inherited && err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "inherited query file not found, skipping");
            return Ok(String::new());
        }
        Err(source) => return Err(Error::QueryFile { path, source }),
    };

    let parents: Vec<String> = text
        .lines()
        .filter_map(|line| line.strip_prefix(INHERITS_PREFIX))
        .last()
        .map(|list| {
            list.split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    visiting.push(language.to_string());
    let mut parts = vec![text];
    for parent in parents {
        parts.push(load(queries_path, &parent, file, true, visiting)?);
    }
    visiting.pop();

    Ok(parts.join("\n"))
}

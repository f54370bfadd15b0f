//! Declarative symbol extraction.
//!
//! A [`PatternSet`] says which node kinds denote symbols and where each one's display name
//! lives. [`extract`] walks a tree once and returns the matching [`Symbol`]s in source order.
//! Patterns that cannot match anything (empty kind or name) and nodes that lack the declared
//! name child are skipped and logged; they never fail the whole extraction.

use crate::range::ByteRange;
use crate::tree::{Node, SyntaxTree};
use std::collections::HashMap;
use std::fmt;

/// A coarse symbol kind tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SymbolKind {
    /// A class.
    Class,
    /// A type alias or type definition.
    Type,
    /// An interface, trait or protocol.
    Interface,
    /// A variable.
    Variable,
    /// A constant.
    Constant,
    /// An object literal or singleton.
    Object,
    /// A markup element.
    Element,
    /// An import.
    Import,
    /// A function or method.
    Function,
    /// A call site.
    Call,
    /// A block.
    Block,
    /// A conditional.
    If,
    /// A loop.
    Loop,
    /// Anything else.
    Unknown,
}

impl SymbolKind {
    /// Map a capture name such as `"definition.function"` (or a bare `"function"`) to a kind.
    pub fn from_capture_name(name: &str) -> Self {
        let name = name.strip_prefix("definition.").unwrap_or(name);
        match name {
            "class" => Self::Class,
            "type" => Self::Type,
            "interface" => Self::Interface,
            "var" | "variable" => Self::Variable,
            "constant" => Self::Constant,
            "object" => Self::Object,
            "element" => Self::Element,
            "import" => Self::Import,
            "function" | "method" => Self::Function,
            "call" => Self::Call,
            "block" => Self::Block,
            "if" => Self::If,
            "loop" => Self::Loop,
            _ => Self::Unknown,
        }
    }

    /// Lower-case name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Type => "type",
            Self::Interface => "interface",
            Self::Variable => "var",
            Self::Constant => "constant",
            Self::Object => "object",
            Self::Element => "element",
            Self::Import => "import",
            Self::Function => "function",
            Self::Call => "call",
            Self::Block => "block",
            Self::If => "if",
            Self::Loop => "loop",
            Self::Unknown => "unknown",
        }
    }

    /// One-letter label for compact listings.
    pub fn label(self) -> char {
        match self {
            Self::Class | Self::Constant => 'c',
            Self::Type => 't',
            Self::Interface | Self::Import | Self::If => 'i',
            Self::Variable => 'v',
            Self::Object => 'o',
            Self::Element => 'e',
            Self::Function => 'f',
            Self::Call | Self::Loop => 'l',
            Self::Block => 'b',
            Self::Unknown => '?',
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, located construct.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Symbol {
    /// Display name, with runs of whitespace collapsed to one space.
    pub name: String,
    /// Range of the defining node.
    pub range: ByteRange,
    /// Range of the node that supplied the name.
    pub name_range: ByteRange,
    /// Kind tag.
    pub kind: SymbolKind,
    /// Name of the nearest enclosing symbol.
    pub container: Option<String>,
}

/// Where a symbol's display name comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NameSource {
    /// The child the parent assigns this field name to.
    Field(String),
    /// The first child of this kind.
    ChildKind(String),
}

impl NameSource {
    fn is_empty(&self) -> bool {
        match self {
            Self::Field(name) | Self::ChildKind(name) => name.is_empty(),
        }
    }

    fn find<'t>(&self, node: Node<'t>) -> Option<Node<'t>> {
        match self {
            Self::Field(field) => node.child_by_field_name(field),
            Self::ChildKind(kind) => node.children().find(|child| child.kind() == kind),
        }
    }
}

/// One rule: nodes of `node_kind` are symbols of `kind`, named by `name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SymbolPattern {
    /// Node kind that denotes a symbol.
    pub node_kind: String,
    /// Where the display name lives.
    pub name: NameSource,
    /// Kind tag of the resulting symbols.
    pub kind: SymbolKind,
}

impl SymbolPattern {
    /// Create a pattern.
    pub fn new(node_kind: impl Into<String>, name: NameSource, kind: SymbolKind) -> Self {
        Self {
            node_kind: node_kind.into(),
            name,
            kind,
        }
    }

    /// A pattern whose name is the child assigned to `field`.
    pub fn by_field(
        node_kind: impl Into<String>,
        field: impl Into<String>,
        kind: SymbolKind,
    ) -> Self {
        Self::new(node_kind, NameSource::Field(field.into()), kind)
    }

    /// A pattern whose name is the first child of `child_kind`.
    pub fn by_child_kind(
        node_kind: impl Into<String>,
        child_kind: impl Into<String>,
        kind: SymbolKind,
    ) -> Self {
        Self::new(node_kind, NameSource::ChildKind(child_kind.into()), kind)
    }

    /// Returns `true` if the pattern can match anything.
    pub fn is_well_formed(&self) -> bool {
        !self.node_kind.is_empty() && !self.name.is_empty()
    }
}

/// An ordered collection of [`SymbolPattern`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternSet {
    patterns: Vec<SymbolPattern>,
}

impl PatternSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pattern, builder style.
    pub fn with(mut self, pattern: SymbolPattern) -> Self {
        self.patterns.push(pattern);
        self
    }

    /// Add a pattern.
    pub fn push(&mut self, pattern: SymbolPattern) {
        self.patterns.push(pattern);
    }

    /// The patterns, in insertion order.
    pub fn patterns(&self) -> &[SymbolPattern] {
        &self.patterns
    }

    /// Number of patterns.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Returns `true` if the set has no patterns.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl FromIterator<SymbolPattern> for PatternSet {
    fn from_iter<I: IntoIterator<Item = SymbolPattern>>(iter: I) -> Self {
        Self {
            patterns: iter.into_iter().collect(),
        }
    }
}

/// Collapse runs of whitespace into single spaces.
pub fn normalize_name(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extract symbols from `tree`, in source byte order.
pub fn extract(tree: &SyntaxTree, patterns: &PatternSet) -> Vec<Symbol> {
    let mut by_kind: HashMap<&str, Vec<&SymbolPattern>> = HashMap::new();
    for (idx, pattern) in patterns.patterns().iter().enumerate() {
        if !pattern.is_well_formed() {
            tracing::debug!(pattern = idx, ?pattern, "skipping malformed symbol pattern");
            continue;
        }
        by_kind
            .entry(pattern.node_kind.as_str())
            .or_default()
            .push(pattern);
    }

    let mut symbols = Vec::new();
    if by_kind.is_empty() {
        return symbols;
    }

    for node in tree.nodes() {
        let Some(matching) = by_kind.get(node.kind()) else {
            continue;
        };
        for pattern in matching {
            let Some(name_node) = pattern.name.find(node) else {
                tracing::trace!(
                    kind = node.kind(),
                    byte_range = ?node.byte_range(),
                    name = ?pattern.name,
                    "symbol node has no name child"
                );
                continue;
            };
            symbols.push(Symbol {
                name: normalize_name(name_node.text()),
                range: node.byte_range(),
                name_range: name_node.byte_range(),
                kind: pattern.kind,
                container: None,
            });
        }
    }

    finish(symbols)
}

/// Sort by start offset, drop exact duplicates and fill in containers.
pub fn finish(mut symbols: Vec<Symbol>) -> Vec<Symbol> {
    symbols.sort_by_key(|symbol| symbol.range.start);
    symbols.dedup();
    assign_containers(&mut symbols);
    symbols
}

/// Set each symbol's container to the nearest preceding symbol whose range contains it.
///
/// `symbols` must be sorted by start offset, outer symbols before inner ones.
pub fn assign_containers(symbols: &mut [Symbol]) {
    let mut open: Vec<(ByteRange, String)> = Vec::new();
    for symbol in symbols.iter_mut() {
        while let Some((range, _)) = open.last() {
            if range.contains(symbol.range) {
                break;
            }
            open.pop();
        }
        symbol.container = open.last().map(|(_, name)| name.clone());
        open.push((symbol.range, symbol.name.clone()));
    }
}

//! Immutable arena syntax trees.
//!
//! A [`SyntaxTree`] stores its nodes in a flat vector in depth-first pre-order. Every node records
//! its parent index, its depth and the end of its subtree, so:
//!
//! - a node's subtree is the contiguous index range `id..subtree_end`
//! - its first child (if any) is `id + 1`
//! - the next sibling of a child is that child's `subtree_end`
//!
//! Parent lookup is an index read, never a retained pointer, so a tree can be dropped and
//! replaced wholesale after every re-parse without dangling references. [`Node`] is a cheap
//! `Copy` handle borrowing the tree.

use crate::range::{ByteRange, Point};
use crate::source_index::SourceIndex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Index of a node inside its [`SyntaxTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    /// The root node of every tree.
    pub const ROOT: NodeId = NodeId(0);

    /// Get the underlying index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: u32,
    field: Option<u32>,
    named: bool,
    error: bool,
    range: ByteRange,
    start: Point,
    end: Point,
    parent: Option<NodeId>,
    depth: u32,
    subtree_end: u32,
}

/// A structural snapshot of one buffer's source text at one point in time.
#[derive(Clone)]
pub struct SyntaxTree {
    grammar: Arc<str>,
    source: Arc<str>,
    nodes: Vec<NodeData>,
    kinds: Vec<Box<str>>,
    fields: Vec<Box<str>>,
}

impl fmt::Debug for SyntaxTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyntaxTree")
            .field("grammar", &self.grammar)
            .field("source_len", &self.source.len())
            .field("node_count", &self.nodes.len())
            .finish()
    }
}

impl SyntaxTree {
    /// Name of the grammar that produced this tree.
    pub fn grammar(&self) -> &str {
        &self.grammar
    }

    /// Source text the tree was built from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Shared handle to the source text.
    pub fn shared_source(&self) -> Arc<str> {
        Arc::clone(&self.source)
    }

    /// Byte length of the source text.
    pub fn source_len(&self) -> usize {
        self.source.len()
    }

    /// Number of nodes (named and anonymous).
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The root node. Its range is always `[0, source_len)`.
    pub fn root(&self) -> Node<'_> {
        Node {
            tree: self,
            id: NodeId::ROOT,
        }
    }

    /// Look up a node by id.
    pub fn node(&self, id: NodeId) -> Option<Node<'_>> {
        (id.index() < self.nodes.len()).then_some(Node { tree: self, id })
    }

    /// All nodes in depth-first pre-order.
    pub fn nodes(&self) -> impl Iterator<Item = Node<'_>> + '_ {
        (0..self.nodes.len()).map(move |idx| Node {
            tree: self,
            id: NodeId(idx as u32),
        })
    }

    fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index()]
    }
}

/// A position in a [`SyntaxTree`].
#[derive(Clone, Copy)]
pub struct Node<'t> {
    tree: &'t SyntaxTree,
    id: NodeId,
}

impl PartialEq for Node<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl Eq for Node<'_> {}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.byte_range())
    }
}

impl<'t> Node<'t> {
    /// The tree this node belongs to.
    pub fn tree(&self) -> &'t SyntaxTree {
        self.tree
    }

    /// Arena id.
    pub fn id(&self) -> NodeId {
        self.id
    }

    fn data(&self) -> &'t NodeData {
        self.tree.data(self.id)
    }

    /// Grammar-defined node type, e.g. `"function_definition"`.
    pub fn kind(&self) -> &'t str {
        &self.tree.kinds[self.data().kind as usize]
    }

    /// Returns `true` for named nodes (as opposed to anonymous tokens like `"("`).
    pub fn is_named(&self) -> bool {
        self.data().named
    }

    /// Returns `true` if the parser marked this node as an error or missing node.
    pub fn is_error(&self) -> bool {
        self.data().error
    }

    /// Field name the parent assigns to this node, if any.
    pub fn field_name(&self) -> Option<&'t str> {
        self.data()
            .field
            .map(|field| &*self.tree.fields[field as usize])
    }

    /// Byte range.
    pub fn byte_range(&self) -> ByteRange {
        self.data().range
    }

    /// First byte.
    pub fn start_byte(&self) -> usize {
        self.data().range.start
    }

    /// End byte (exclusive).
    pub fn end_byte(&self) -> usize {
        self.data().range.end
    }

    /// Size in bytes.
    pub fn len(&self) -> usize {
        self.data().range.len()
    }

    /// Returns `true` for zero-width nodes.
    pub fn is_empty(&self) -> bool {
        self.data().range.is_empty()
    }

    /// Start point.
    pub fn start_point(&self) -> Point {
        self.data().start
    }

    /// End point.
    pub fn end_point(&self) -> Point {
        self.data().end
    }

    /// Distance from the root (`0` for the root).
    pub fn depth(&self) -> usize {
        self.data().depth as usize
    }

    /// Returns `true` for the root node.
    pub fn is_root(&self) -> bool {
        self.id == NodeId::ROOT
    }

    /// Source text covered by the node.
    pub fn text(&self) -> &'t str {
        self.tree
            .source
            .get(self.data().range.as_range())
            .unwrap_or_default()
    }

    /// Parent node.
    pub fn parent(&self) -> Option<Node<'t>> {
        self.data().parent.map(|id| Node {
            tree: self.tree,
            id,
        })
    }

    /// Ancestors from the parent up to the root.
    pub fn ancestors(&self) -> impl Iterator<Item = Node<'t>> + use<'t> {
        std::iter::successors(self.parent(), |node| node.parent())
    }

    /// Children in source order, named and anonymous.
    pub fn children(&self) -> Children<'t> {
        let data = self.data();
        let first = self.id.0 + 1;
        Children {
            tree: self.tree,
            next: (first < data.subtree_end).then_some(NodeId(first)),
            end: data.subtree_end,
        }
    }

    /// Named children in source order.
    pub fn named_children(&self) -> impl Iterator<Item = Node<'t>> + use<'t> {
        self.children().filter(|child| child.is_named())
    }

    /// Number of children.
    pub fn child_count(&self) -> usize {
        self.children().count()
    }

    /// First child carrying the given field name.
    pub fn child_by_field_name(&self, field: &str) -> Option<Node<'t>> {
        self.children()
            .find(|child| child.field_name() == Some(field))
    }

    /// Position of this node among its parent's children.
    pub fn child_index(&self) -> Option<usize> {
        let parent = self.parent()?;
        parent.children().position(|child| child == *self)
    }

    /// Next sibling in source order.
    pub fn next_sibling(&self) -> Option<Node<'t>> {
        let parent = self.parent()?;
        let next = self.data().subtree_end;
        (next < parent.data().subtree_end).then_some(Node {
            tree: self.tree,
            id: NodeId(next),
        })
    }

    /// Previous sibling in source order.
    pub fn prev_sibling(&self) -> Option<Node<'t>> {
        let parent = self.parent()?;
        parent
            .children()
            .take_while(|child| child != self)
            .last()
    }

    /// Every node of this node's subtree, including itself, in pre-order.
    pub fn subtree(&self) -> impl Iterator<Item = Node<'t>> + use<'t> {
        let tree = self.tree;
        (self.id.0..self.data().subtree_end).map(move |idx| Node {
            tree,
            id: NodeId(idx),
        })
    }

    /// Returns `true` if `other` is this node or one of its descendants.
    pub fn is_ancestor_of(&self, other: &Node<'_>) -> bool {
        std::ptr::eq(self.tree, other.tree)
            && self.id.0 <= other.id.0
            && other.id.0 < self.data().subtree_end
    }
}

/// Iterator over a node's children.
#[derive(Clone)]
pub struct Children<'t> {
    tree: &'t SyntaxTree,
    next: Option<NodeId>,
    end: u32,
}

impl<'t> Iterator for Children<'t> {
    type Item = Node<'t>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        let subtree_end = self.tree.data(id).subtree_end;
        self.next = (subtree_end < self.end).then_some(NodeId(subtree_end));
        Some(Node {
            tree: self.tree,
            id,
        })
    }
}

/// Errors produced by [`TreeBuilder::finish`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeBuildError {
    /// No node was opened.
    #[error("tree has no root node")]
    Empty,
    /// A second top-level node was opened after the root closed.
    #[error("tree has more than one root node")]
    MultipleRoots,
    /// `close` was called with no open node.
    #[error("close called with no open node")]
    UnbalancedClose,
    /// Nodes were still open when the tree was finished.
    #[error("{0} node(s) still open")]
    Unclosed(usize),
    /// The tree has more nodes than the arena can index.
    #[error("tree exceeds the node limit")]
    TooLarge,
}

/// Description of one node handed to [`TreeBuilder`].
#[derive(Debug, Clone, Copy)]
pub struct NodeSpec<'a> {
    kind: &'a str,
    range: ByteRange,
    named: bool,
    error: bool,
    field: Option<&'a str>,
    points: Option<(Point, Point)>,
}

impl<'a> NodeSpec<'a> {
    /// A named node.
    pub fn named(kind: &'a str, range: impl Into<ByteRange>) -> Self {
        Self {
            kind,
            range: range.into(),
            named: true,
            error: false,
            field: None,
            points: None,
        }
    }

    /// An anonymous token such as `"("`.
    pub fn anonymous(kind: &'a str, range: impl Into<ByteRange>) -> Self {
        Self {
            named: false,
            ..Self::named(kind, range)
        }
    }

    /// Set the field name the parent assigns to this node.
    pub fn field(mut self, field: &'a str) -> Self {
        self.field = Some(field);
        self
    }

    /// Set an optional field name.
    pub fn maybe_field(mut self, field: Option<&'a str>) -> Self {
        self.field = field;
        self
    }

    /// Mark the node as an error node.
    pub fn error(mut self, error: bool) -> Self {
        self.error = error;
        self
    }

    /// Provide start/end points; when omitted they are computed from the source.
    pub fn points(mut self, start: Point, end: Point) -> Self {
        self.points = Some((start, end));
        self
    }
}

/// Incremental builder for a [`SyntaxTree`]; nodes must be opened in pre-order.
pub struct TreeBuilder {
    grammar: Arc<str>,
    source: Arc<str>,
    nodes: Vec<NodeData>,
    kinds: Vec<Box<str>>,
    kind_ids: HashMap<Box<str>, u32>,
    fields: Vec<Box<str>>,
    field_ids: HashMap<Box<str>, u32>,
    stack: Vec<NodeId>,
    index: Option<SourceIndex>,
    error: Option<TreeBuildError>,
}

impl TreeBuilder {
    /// Start building a tree for `source`.
    pub fn new(grammar: impl Into<Arc<str>>, source: impl Into<Arc<str>>) -> Self {
        Self {
            grammar: grammar.into(),
            source: source.into(),
            nodes: Vec::new(),
            kinds: Vec::new(),
            kind_ids: HashMap::new(),
            fields: Vec::new(),
            field_ids: HashMap::new(),
            stack: Vec::new(),
            index: None,
            error: None,
        }
    }

    /// Reserve room for `additional` nodes.
    pub fn reserve(&mut self, additional: usize) {
        self.nodes.reserve(additional);
    }

    fn intern(table: &mut Vec<Box<str>>, ids: &mut HashMap<Box<str>, u32>, name: &str) -> u32 {
        if let Some(id) = ids.get(name) {
            return *id;
        }
        let id = table.len() as u32;
        table.push(name.into());
        ids.insert(name.into(), id);
        id
    }

    fn points_for(&mut self, range: ByteRange) -> (Point, Point) {
        let source = &self.source;
        let index = self
            .index
            .get_or_insert_with(|| SourceIndex::from_text(source));
        (index.byte_to_point(range.start), index.byte_to_point(range.end))
    }

    /// Open a node; subsequent nodes become its descendants until [`TreeBuilder::close`].
    pub fn open(&mut self, spec: NodeSpec<'_>) -> NodeId {
        if self.stack.is_empty() && !self.nodes.is_empty() && self.error.is_none() {
            self.error = Some(TreeBuildError::MultipleRoots);
        }
        if self.nodes.len() >= u32::MAX as usize {
            self.error = Some(TreeBuildError::TooLarge);
        }

        let id = NodeId(self.nodes.len() as u32);
        let kind = Self::intern(&mut self.kinds, &mut self.kind_ids, spec.kind);
        let field = spec
            .field
            .map(|name| Self::intern(&mut self.fields, &mut self.field_ids, name));
        let (start, end) = match spec.points {
            Some(points) => points,
            None => self.points_for(spec.range),
        };

        self.nodes.push(NodeData {
            kind,
            field,
            named: spec.named,
            error: spec.error,
            range: spec.range,
            start,
            end,
            parent: self.stack.last().copied(),
            depth: self.stack.len() as u32,
            subtree_end: id.0 + 1,
        });
        self.stack.push(id);
        id
    }

    /// Close the most recently opened node.
    pub fn close(&mut self) {
        let Some(id) = self.stack.pop() else {
            self.error.get_or_insert(TreeBuildError::UnbalancedClose);
            return;
        };
        self.nodes[id.index()].subtree_end = self.nodes.len() as u32;
    }

    /// Open and immediately close a node.
    pub fn leaf(&mut self, spec: NodeSpec<'_>) -> NodeId {
        let id = self.open(spec);
        self.close();
        id
    }

    /// Finish the tree. The root's range is widened to the whole source.
    pub fn finish(mut self) -> Result<SyntaxTree, TreeBuildError> {
        if let Some(error) = self.error.take() {
            return Err(error);
        }
        if !self.stack.is_empty() {
            return Err(TreeBuildError::Unclosed(self.stack.len()));
        }
        if self.nodes.is_empty() {
            return Err(TreeBuildError::Empty);
        }

        let len = self.source.len();
        let (_, end_point) = self.points_for(ByteRange::new(len, len));
        let root = &mut self.nodes[0];
        root.range = ByteRange::new(0, len);
        root.start = Point::default();
        root.end = end_point;

        Ok(SyntaxTree {
            grammar: self.grammar,
            source: self.source,
            nodes: self.nodes,
            kinds: self.kinds,
            fields: self.fields,
        })
    }
}

//! Structural navigation over a [`SyntaxTree`].
//!
//! Every function here is pure: it borrows a tree for the duration of the call and returns
//! handles into it. Ranges stand in for the host editor's current selection.
//!
//! Containment rules used by [`smallest_node_covering`]:
//!
//! - a non-empty range is covered by a node whose range includes it (boundaries included)
//! - an empty range at offset `p` is covered by a node with `start <= p <= end`
//! - descent always takes the *first* covering child in source order, so at a boundary the node
//!   ending at `p` wins over the one starting there, and of two zero-width siblings at `p` the
//!   earlier one wins

use crate::range::ByteRange;
use crate::tree::{Node, SyntaxTree};
use thiserror::Error;

/// Errors produced by navigation calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NavigationError {
    /// The range is inverted or extends past the end of the source.
    #[error("range {range} is out of bounds for a source of {source_len} bytes")]
    OutOfBounds {
        /// Offending range.
        range: ByteRange,
        /// Byte length of the tree's source.
        source_len: usize,
    },
}

fn check_bounds(tree: &SyntaxTree, range: ByteRange) -> Result<(), NavigationError> {
    if !range.is_ordered() || range.end > tree.source_len() {
        return Err(NavigationError::OutOfBounds {
            range,
            source_len: tree.source_len(),
        });
    }
    Ok(())
}

fn covers(node: &Node<'_>, range: ByteRange) -> bool {
    if range.is_empty() {
        node.byte_range().touches(range.start)
    } else {
        node.byte_range().contains(range)
    }
}

/// The deepest node whose range contains `range`.
///
/// Nodes with identical ranges resolve to the deepest one. The result is idempotent: querying
/// again with the returned node's own range yields the same node.
pub fn smallest_node_covering(
    tree: &SyntaxTree,
    range: ByteRange,
) -> Result<Node<'_>, NavigationError> {
    check_bounds(tree, range)?;

    let mut node = tree.root();
    while let Some(child) = node.children().find(|child| covers(child, range)) {
        node = child;
    }
    Ok(node)
}

/// Walk `levels` parent steps up from `node`; `ancestor(node, 0)` is `node`.
pub fn ancestor(node: Node<'_>, levels: usize) -> Option<Node<'_>> {
    let mut current = node;
    for _ in 0..levels {
        current = current.parent()?;
    }
    Some(current)
}

/// Lazy pre-order walk of `node`'s subtree (including `node`), yielding nodes accepted by
/// `predicate`.
///
/// Each call starts a fresh traversal.
pub fn descendants<'t, P>(node: Node<'t>, mut predicate: P) -> impl Iterator<Item = Node<'t>> + 't
where
    P: FnMut(&Node<'t>) -> bool + 't,
{
    node.subtree().filter(move |candidate| predicate(candidate))
}

/// The children of `node`'s parent in source order, `node` included.
///
/// The root has no parent; its only sibling is itself.
pub fn siblings(node: Node<'_>) -> Vec<Node<'_>> {
    match node.parent() {
        Some(parent) => parent.children().collect(),
        None => vec![node],
    }
}

/// Nodes at `node`'s depth inside the subtree of the ancestor `generations` levels up, left to
/// right, excluding `node` itself.
///
/// Returns an empty list when `generations` is zero or the ancestor would be above the root.
pub fn cousins(node: Node<'_>, generations: usize) -> Vec<Node<'_>> {
    if generations == 0 {
        return Vec::new();
    }
    let Some(common) = ancestor(node, generations) else {
        return Vec::new();
    };

    let mut frontier = vec![common];
    for _ in 0..generations {
        frontier = frontier
            .iter()
            .flat_map(|parent| parent.children())
            .collect();
    }
    frontier.retain(|cousin| *cousin != node);
    frontier
}

/// Map each selection range to its covering node, preserving order.
///
/// An entry is dropped only when its range equals the previous range.
pub fn node_for_selection<'t>(
    tree: &'t SyntaxTree,
    ranges: &[ByteRange],
) -> Result<Vec<Node<'t>>, NavigationError> {
    let mut nodes = Vec::with_capacity(ranges.len());
    let mut previous: Option<ByteRange> = None;
    for range in ranges {
        if previous == Some(*range) {
            continue;
        }
        nodes.push(smallest_node_covering(tree, *range)?);
        previous = Some(*range);
    }
    Ok(nodes)
}

/// The nearest ancestor strictly larger than `node`.
pub fn larger_ancestor(node: Node<'_>) -> Option<Node<'_>> {
    node.ancestors().find(|candidate| candidate.len() > node.len())
}

/// The first node in pre-order under `node` that is strictly smaller than it.
///
/// Such a node almost always has siblings, which makes it a good target for "shrink selection".
pub fn first_smaller_descendant(node: Node<'_>) -> Option<Node<'_>> {
    node.subtree().find(|candidate| candidate.len() < node.len())
}

/// Expand a selection: the covering node if it is larger than `range`, else its nearest larger
/// ancestor, else its parent. `None` when the covering node is the root.
pub fn ancestor_for_selection(
    tree: &SyntaxTree,
    range: ByteRange,
) -> Result<Option<Node<'_>>, NavigationError> {
    let node = smallest_node_covering(tree, range)?;
    let Some(parent) = node.parent() else {
        return Ok(None);
    };
    if node.len() > range.len() {
        return Ok(Some(node));
    }
    Ok(Some(larger_ancestor(node).unwrap_or(parent)))
}

/// Shrink a selection to the first smaller descendant of its covering node.
pub fn descendant_for_selection(
    tree: &SyntaxTree,
    range: ByteRange,
) -> Result<Option<Node<'_>>, NavigationError> {
    let node = smallest_node_covering(tree, range)?;
    Ok(first_smaller_descendant(node))
}

/// The next (or previous) sibling of the node covering `range`.
///
/// Single-child chains are climbed first so the move happens at the first level that actually
/// has siblings, and the move wraps around at either end. When the covering node is the root,
/// the first smaller descendant's siblings are searched for the one adjacent to `range.start`.
pub fn sibling_for_selection(
    tree: &SyntaxTree,
    range: ByteRange,
    forward: bool,
) -> Result<Option<Node<'_>>, NavigationError> {
    let mut node = smallest_node_covering(tree, range)?;

    if node.is_root() {
        let Some(first) = first_smaller_descendant(node) else {
            return Ok(None);
        };
        let Some(parent) = first.parent() else {
            return Ok(Some(first));
        };
        let adjacent = if forward {
            parent
                .children()
                .find(|sibling| range.start <= sibling.start_byte())
        } else {
            parent
                .children()
                .filter(|sibling| range.start >= sibling.start_byte())
                .last()
        };
        return Ok(Some(adjacent.unwrap_or(first)));
    }

    while let Some(parent) = node.parent() {
        if parent.is_root() || parent.child_count() != 1 {
            break;
        }
        node = parent;
    }

    let Some(parent) = node.parent() else {
        return Ok(None);
    };
    let siblings: Vec<_> = parent.children().collect();
    let Some(idx) = siblings.iter().position(|sibling| *sibling == node) else {
        return Ok(None);
    };
    let len = siblings.len();
    let next = if forward {
        (idx + 1) % len
    } else {
        (idx + len - 1) % len
    };
    Ok(Some(siblings[next]))
}

/// Which of the matching cousins to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WhichCousins {
    /// Every match, in source order.
    #[default]
    All,
    /// The first match starting after the node, wrapping to the first match.
    Next,
    /// The last match starting before the node, wrapping to the last match.
    Previous,
}

/// Filter for [`cousins_matching`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CousinFilter {
    /// Require the same kind for the node and its ancestors.
    pub same_types: bool,
    /// Require identical source text.
    pub same_text: bool,
    /// Require the same depth.
    pub same_depth: bool,
    /// Limit the `same_types` comparison to this many nodes (the node itself counts as one).
    pub same_types_depth: Option<usize>,
    /// Which matches to return.
    pub which: WhichCousins,
}

impl Default for CousinFilter {
    fn default() -> Self {
        Self {
            same_types: true,
            same_text: false,
            same_depth: true,
            same_types_depth: None,
            which: WhichCousins::All,
        }
    }
}

fn kind_chain<'t>(node: Node<'t>, limit: Option<usize>) -> Vec<&'t str> {
    std::iter::once(node)
        .chain(node.ancestors())
        .take(limit.unwrap_or(usize::MAX))
        .map(|n| n.kind())
        .collect()
}

/// Nodes anywhere in the tree that look like `node` according to `filter`.
///
/// `node` itself is part of the candidate set, so [`WhichCousins::All`] normally includes it.
/// The root has no cousins.
pub fn cousins_matching<'t>(node: Node<'t>, filter: &CousinFilter) -> Vec<Node<'t>> {
    if node.is_root() {
        return Vec::new();
    }

    let depth = node.depth();
    let kinds = kind_chain(node, filter.same_types_depth);
    let text = node.text();

    let matches: Vec<Node<'t>> = node
        .tree()
        .nodes()
        .filter(|candidate| !filter.same_depth || candidate.depth() == depth)
        .filter(|candidate| !filter.same_text || candidate.text() == text)
        .filter(|candidate| {
            !filter.same_types || kind_chain(*candidate, filter.same_types_depth) == kinds
        })
        .collect();

    let start = node.start_byte();
    let picked = match filter.which {
        WhichCousins::All => return matches,
        WhichCousins::Next => matches
            .iter()
            .find(|cousin| cousin.start_byte() > start)
            .or(matches.first()),
        WhichCousins::Previous => matches
            .iter()
            .rev()
            .find(|cousin| cousin.start_byte() < start)
            .or(matches.last()),
    };
    picked.copied().into_iter().collect()
}

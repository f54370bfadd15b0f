//! Diagnostic rendering of trees and nodes.

use crate::range::{ByteRange, Point};
use crate::tree::Node;
use std::fmt::Write as _;

const INDENT: &str = "  ";

/// Climb to the shallowest ancestor with the same size as `node` (or `node` itself).
pub fn display_root(node: Node<'_>) -> Node<'_> {
    let mut current = node;
    while let Some(parent) = current.parent() {
        if parent.len() != current.len() {
            break;
        }
        current = parent;
    }
    current
}

/// Render `node`'s subtree, one line per node:
///
/// ```text
/// module  (0, 0) → (2, 0)
///   function_definition  (0, 0) → (1, 8)
///     def  (0, 0) → (0, 3)
///     identifier [name]  (0, 4) → (0, 5)
/// ```
///
/// Indentation is relative to `node`.
pub fn render_tree(node: Node<'_>) -> String {
    let base = node.depth();
    let mut out = String::new();
    for current in node.subtree() {
        let indent = INDENT.repeat(current.depth() - base);
        let _ = match current.field_name() {
            Some(field) => writeln!(
                out,
                "{indent}{} [{field}]  {} → {}",
                current.kind(),
                current.start_point(),
                current.end_point()
            ),
            None => writeln!(
                out,
                "{indent}{}  {} → {}",
                current.kind(),
                current.start_point(),
                current.end_point()
            ),
        };
    }
    out
}

/// Key facts about one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    /// Node kind.
    pub kind: String,
    /// Field name assigned by the parent.
    pub field: Option<String>,
    /// Distance from the root.
    pub depth: usize,
    /// Byte range.
    pub range: ByteRange,
    /// Start point.
    pub start: Point,
    /// End point.
    pub end: Point,
}

impl NodeInfo {
    /// Capture the facts about `node`.
    pub fn of(node: Node<'_>) -> Self {
        Self {
            kind: node.kind().to_string(),
            field: node.field_name().map(str::to_string),
            depth: node.depth(),
            range: node.byte_range(),
            start: node.start_point(),
            end: node.end_point(),
        }
    }

    /// `(key, value)` pairs, in display order.
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("type", self.kind.clone())];
        if let Some(field) = &self.field {
            pairs.push(("field", field.clone()));
        }
        pairs.push(("depth", self.depth.to_string()));
        pairs.push(("range", format!("{} → {}", self.start, self.end)));
        pairs
    }
}

/// Describe `node` and every ancestor with the same size, outermost first.
pub fn describe_node(node: Node<'_>) -> Vec<NodeInfo> {
    let mut infos = vec![NodeInfo::of(node)];
    let mut current = node;
    while let Some(parent) = current.parent() {
        if parent.len() != current.len() {
            break;
        }
        infos.push(NodeInfo::of(parent));
        current = parent;
    }
    infos.reverse();
    infos
}

//! Conversion between tree-sitter values and `buffer-trees` values.

use buffer_trees::{Edit, NodeSpec, Point, SyntaxTree, TreeBuildError, TreeBuilder};
use std::sync::Arc;
use tree_sitter::{InputEdit, Tree};

pub(crate) fn to_ts_point(point: Point) -> tree_sitter::Point {
    tree_sitter::Point {
        row: point.row,
        column: point.column,
    }
}

pub(crate) fn from_ts_point(point: tree_sitter::Point) -> Point {
    Point::new(point.row, point.column)
}

/// The tree-sitter form of an [`Edit`].
pub fn input_edit(edit: &Edit) -> InputEdit {
    InputEdit {
        start_byte: edit.start_byte,
        old_end_byte: edit.old_end_byte,
        new_end_byte: edit.new_end_byte,
        start_position: to_ts_point(edit.start_point),
        old_end_position: to_ts_point(edit.old_end_point),
        new_end_position: to_ts_point(edit.new_end_point),
    }
}

/// Copy a tree-sitter tree into an arena [`SyntaxTree`], keeping anonymous nodes and field
/// names.
pub fn to_syntax_tree(
    tree: &Tree,
    grammar: &str,
    source: Arc<str>,
) -> Result<SyntaxTree, TreeBuildError> {
    let mut builder = TreeBuilder::new(grammar, source);
    let mut cursor = tree.walk();

    'nodes: loop {
        let node = cursor.node();
        let range = node.start_byte()..node.end_byte();
        let spec = if node.is_named() {
            NodeSpec::named(node.kind(), range)
        } else {
            NodeSpec::anonymous(node.kind(), range)
        };
        builder.open(
            spec.maybe_field(cursor.field_name())
                .error(node.is_error() || node.is_missing())
                .points(
                    from_ts_point(node.start_position()),
                    from_ts_point(node.end_position()),
                ),
        );

        if cursor.goto_first_child() {
            continue;
        }
        builder.close();

        loop {
            if cursor.goto_next_sibling() {
                continue 'nodes;
            }
            if !cursor.goto_parent() {
                break 'nodes;
            }
            builder.close();
        }
    }

    builder.finish()
}

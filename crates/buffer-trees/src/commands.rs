//! Selection-level structural commands.
//!
//! A [`StructuralCommand`] turns the host editor's selection ranges into new selection ranges.
//! Ranges that produce no target stay as they were, so a command never loses a caret.

use crate::navigator::{
    self, CousinFilter, NavigationError, WhichCousins, ancestor_for_selection,
    descendant_for_selection, sibling_for_selection, smallest_node_covering,
};
use crate::range::ByteRange;
use crate::tree::SyntaxTree;
use std::collections::HashSet;

/// A structural selection move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuralCommand {
    /// Grow each range to the smallest strictly larger node. The root is never selected.
    SelectAncestor,
    /// Shrink each range to the first smaller descendant of its covering node.
    SelectDescendant,
    /// Move each range to the next or previous sibling, wrapping around.
    SelectSibling {
        /// Move towards the end of the source.
        forward: bool,
        /// Keep every range and add the sibling of the last one (first one when moving back).
        extend: bool,
    },
    /// Select cousins of each range's covering node.
    SelectCousins {
        /// Which cousins qualify.
        filter: CousinFilter,
        /// Keep every range and add cousins of the last one for [`WhichCousins::Next`], of the
        /// first one otherwise.
        extend: bool,
    },
    /// Snap each range to its covering node.
    SelectNode,
}

/// Run `command` against `ranges`.
///
/// The output keeps input order. Except for [`StructuralCommand::SelectNode`], duplicate output
/// ranges are dropped after their first occurrence.
pub fn execute(
    tree: &SyntaxTree,
    command: &StructuralCommand,
    ranges: &[ByteRange],
) -> Result<Vec<ByteRange>, NavigationError> {
    let mut out = Vec::with_capacity(ranges.len());

    match command {
        StructuralCommand::SelectAncestor => {
            for range in ranges {
                let target = ancestor_for_selection(tree, *range)?.filter(|node| !node.is_root());
                out.push(target.map_or(*range, |node| node.byte_range()));
            }
        }
        StructuralCommand::SelectDescendant => {
            for range in ranges {
                let target = descendant_for_selection(tree, *range)?;
                out.push(target.map_or(*range, |node| node.byte_range()));
            }
        }
        StructuralCommand::SelectSibling {
            forward,
            extend: true,
        } => {
            out.extend_from_slice(ranges);
            if let Some(origin) = extension_origin(ranges, *forward) {
                if let Some(node) = sibling_for_selection(tree, origin, *forward)? {
                    out.push(node.byte_range());
                }
            }
        }
        StructuralCommand::SelectSibling {
            forward,
            extend: false,
        } => {
            for range in ranges {
                let target = sibling_for_selection(tree, *range, *forward)?;
                out.push(target.map_or(*range, |node| node.byte_range()));
            }
        }
        StructuralCommand::SelectCousins {
            filter,
            extend: true,
        } => {
            out.extend_from_slice(ranges);
            if let Some(origin) = extension_origin(ranges, filter.which == WhichCousins::Next) {
                let node = smallest_node_covering(tree, origin)?;
                out.extend(
                    navigator::cousins_matching(node, filter)
                        .iter()
                        .map(|cousin| cousin.byte_range()),
                );
            }
        }
        StructuralCommand::SelectCousins {
            filter,
            extend: false,
        } => {
            for range in ranges {
                let node = smallest_node_covering(tree, *range)?;
                let cousins = navigator::cousins_matching(node, filter);
                if cousins.is_empty() {
                    out.push(*range);
                    continue;
                }
                // `All` extends the selection; `Next`/`Previous` move it.
                if filter.which == WhichCousins::All {
                    out.push(*range);
                }
                out.extend(cousins.iter().map(|cousin| cousin.byte_range()));
            }
        }
        StructuralCommand::SelectNode => {
            // One output per kept input, even when two inputs snap to the same node.
            return Ok(navigator::node_for_selection(tree, ranges)?
                .iter()
                .map(|node| node.byte_range())
                .collect());
        }
    }

    let mut seen = HashSet::with_capacity(out.len());
    out.retain(|range| seen.insert(*range));
    Ok(out)
}

/// The range an extending command grows from.
fn extension_origin(ranges: &[ByteRange], from_last: bool) -> Option<ByteRange> {
    if from_last {
        ranges.last().copied()
    } else {
        ranges.first().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{NodeSpec, TreeBuilder};

    // x = 1; y = 2;
    fn statements() -> SyntaxTree {
        let mut b = TreeBuilder::new("test", "x = 1; y = 2;");
        b.open(NodeSpec::named("program", 0..13));
        for start in [0, 7] {
            b.open(NodeSpec::named("statement", start..start + 6));
            b.open(NodeSpec::named("assignment", start..start + 5));
            b.leaf(NodeSpec::named("identifier", start..start + 1).field("left"));
            b.leaf(NodeSpec::anonymous("=", start + 2..start + 3));
            b.leaf(NodeSpec::named("number", start + 4..start + 5).field("right"));
            b.close();
            b.leaf(NodeSpec::anonymous(";", start + 5..start + 6));
            b.close();
        }
        b.close();
        b.finish().unwrap()
    }

    #[test]
    fn test_select_ancestor_grows_and_stops_below_root() {
        let tree = statements();
        let grown = execute(
            &tree,
            &StructuralCommand::SelectAncestor,
            &[ByteRange::new(0, 1)],
        )
        .unwrap();
        assert_eq!(grown, vec![ByteRange::new(0, 5)]);

        let top = execute(
            &tree,
            &StructuralCommand::SelectAncestor,
            &[ByteRange::new(0, 6)],
        )
        .unwrap();
        assert_eq!(top, vec![ByteRange::new(0, 6)]);
    }

    #[test]
    fn test_select_descendant_shrinks() {
        let tree = statements();
        let shrunk = execute(
            &tree,
            &StructuralCommand::SelectDescendant,
            &[ByteRange::new(7, 13)],
        )
        .unwrap();
        assert_eq!(shrunk, vec![ByteRange::new(7, 12)]);
    }

    #[test]
    fn test_select_sibling_forward() {
        let tree = statements();
        let moved = execute(
            &tree,
            &StructuralCommand::SelectSibling {
                forward: true,
                extend: false,
            },
            &[ByteRange::new(4, 5)],
        )
        .unwrap();
        assert_eq!(moved, vec![ByteRange::new(0, 1)]);
    }

    #[test]
    fn test_select_sibling_extend_grows_from_one_end() {
        let tree = statements();
        let selection = [ByteRange::new(0, 1), ByteRange::new(7, 8)];

        let forward = execute(
            &tree,
            &StructuralCommand::SelectSibling {
                forward: true,
                extend: true,
            },
            &selection,
        )
        .unwrap();
        assert_eq!(
            forward,
            vec![ByteRange::new(0, 1), ByteRange::new(7, 8), ByteRange::new(9, 10)]
        );

        let back = execute(
            &tree,
            &StructuralCommand::SelectSibling {
                forward: false,
                extend: true,
            },
            &selection,
        )
        .unwrap();
        assert_eq!(
            back,
            vec![ByteRange::new(0, 1), ByteRange::new(7, 8), ByteRange::new(4, 5)]
        );

        let nothing = execute(
            &tree,
            &StructuralCommand::SelectSibling {
                forward: true,
                extend: true,
            },
            &[],
        )
        .unwrap();
        assert!(nothing.is_empty());
    }

    #[test]
    fn test_select_cousins_all() {
        let tree = statements();
        let all = execute(
            &tree,
            &StructuralCommand::SelectCousins {
                filter: CousinFilter::default(),
                extend: false,
            },
            &[ByteRange::new(0, 1)],
        )
        .unwrap();
        assert_eq!(all, vec![ByteRange::new(0, 1), ByteRange::new(7, 8)]);
    }

    #[test]
    fn test_select_cousins_next_moves_or_extends() {
        let tree = statements();
        let next = CousinFilter {
            which: WhichCousins::Next,
            ..CousinFilter::default()
        };

        let moved = execute(
            &tree,
            &StructuralCommand::SelectCousins {
                filter: next,
                extend: false,
            },
            &[ByteRange::new(4, 5)],
        )
        .unwrap();
        assert_eq!(moved, vec![ByteRange::new(11, 12)]);

        let extended = execute(
            &tree,
            &StructuralCommand::SelectCousins {
                filter: next,
                extend: true,
            },
            &[ByteRange::new(4, 5)],
        )
        .unwrap();
        assert_eq!(extended, vec![ByteRange::new(4, 5), ByteRange::new(11, 12)]);
    }

    #[test]
    fn test_select_node_dedupes_equal_ranges() {
        let tree = statements();
        let nodes = execute(
            &tree,
            &StructuralCommand::SelectNode,
            &[ByteRange::new(0, 1), ByteRange::new(0, 1), ByteRange::point(12)],
        )
        .unwrap();
        assert_eq!(nodes, vec![ByteRange::new(0, 1), ByteRange::new(11, 12)]);
    }
}

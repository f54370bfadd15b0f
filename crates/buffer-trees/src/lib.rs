#![warn(missing_docs)]
//! Buffer Trees - Headless Per-Buffer Syntax Trees
//!
//! # Overview
//!
//! `buffer-trees` is the parser-agnostic half of a per-buffer syntax tree cache. It owns the
//! data model and every pure algorithm that runs over a tree; the incremental parser and the
//! buffer store live in `buffer-trees-treesitter`.
//!
//! # Core Features
//!
//! - **Byte geometry**: half-open byte ranges and `(row, byte column)` points
//! - **Source index**: rope-backed char/byte/point conversion, updated in place
//! - **Edits**: parser edit descriptors and editor-side character changes
//! - **Arena trees**: immutable pre-order node arenas with parent indices
//! - **Navigation**: covering nodes, ancestors, descendants, siblings and cousins
//! - **Structural commands**: selection in, selection out
//! - **Symbols**: declarative pattern sets with containers
//! - **Change notification**: ordered synchronous observers
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Structural Commands / Symbols / Debug      │  ← Public API
//! ├─────────────────────────────────────────────┤
//! │  Navigator                                  │  ← Tree Algorithms
//! ├─────────────────────────────────────────────┤
//! │  SyntaxTree (arena) + TreeBuilder           │  ← Data Model
//! ├─────────────────────────────────────────────┤
//! │  Edit / TextChange / SourceIndex / Range    │  ← Coordinates
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use buffer_trees::{ByteRange, NodeSpec, TreeBuilder, navigator};
//!
//! let mut builder = TreeBuilder::new("demo", "f(x)");
//! builder.open(NodeSpec::named("call", 0..4));
//! builder.leaf(NodeSpec::named("identifier", 0..1).field("function"));
//! builder.open(NodeSpec::named("arguments", 1..4));
//! builder.leaf(NodeSpec::anonymous("(", 1..2));
//! builder.leaf(NodeSpec::named("identifier", 2..3));
//! builder.leaf(NodeSpec::anonymous(")", 3..4));
//! builder.close();
//! builder.close();
//! let tree = builder.finish().unwrap();
//!
//! let node = navigator::smallest_node_covering(&tree, ByteRange::point(3)).unwrap();
//! assert_eq!(node.text(), "x");
//! assert_eq!(navigator::ancestor(node, 1).unwrap().kind(), "arguments");
//! ```

pub mod commands;
pub mod debug;
pub mod edit;
pub mod navigator;
pub mod notifier;
pub mod range;
pub mod source_index;
pub mod symbols;
pub mod tree;

pub use commands::{StructuralCommand, execute};
pub use debug::{NodeInfo, describe_node, display_root, render_tree};
pub use edit::{Edit, EditError, TextChange};
pub use navigator::{CousinFilter, NavigationError, WhichCousins};
pub use notifier::{BufferId, ChangeNotifier, ChangeObserver, SubscriptionId};
pub use range::{ByteRange, Point};
pub use source_index::SourceIndex;
pub use symbols::{NameSource, PatternSet, Symbol, SymbolKind, SymbolPattern};
pub use tree::{Children, Node, NodeId, NodeSpec, SyntaxTree, TreeBuildError, TreeBuilder};

//! flowsplit tree layer
//!
//! Weighted decomposition tree plus the read-side projections renderers need.
//!
//! # Core Concepts
//!
//! - **Tree store**: point mutation by id (attach children), depth bookkeeping
//! - **Queries**: ancestors, siblings, descendants of any node
//! - **Highlight**: relational emphasis set for a hovered node or edge
//! - **Layout**: deterministic 2-D projection, re-run after every mutation
//!
//! # Architecture
//!
//! ```text
//! DecompositionTree ──queries──→ HighlightSet
//!        │                            │
//!        └──────── project() ←────────┘
//!                     ↓
//!                LayoutGraph (nodes + parent/sibling edges)
//! ```
//!
//! # Example
//!
//! ```rust
//! use flowsplit_tree::{project, DecompositionNode, DecompositionTree, LayoutConfig};
//!
//! let mut tree = DecompositionTree::new();
//! let root = tree.set_root(DecompositionNode::root("ship feature"));
//! tree.attach_children(root, vec![
//!     DecompositionNode::child("design", 0.4),
//!     DecompositionNode::child("build", 0.6),
//! ])?;
//!
//! let graph = project(tree.root(), &LayoutConfig::default(), None);
//! assert_eq!(graph.nodes.len(), 3);
//! # Ok::<(), flowsplit_tree::TreeError>(())
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

// Core modules
pub mod error;
pub mod highlight;
pub mod layout;
pub mod node;
pub mod outline;
pub mod store;

// Re-exports for convenience
pub use error::{TreeError, TreeResult};
pub use highlight::{edge_emphasized, node_emphasized, HighlightSet};
pub use layout::{
    parent_edge_id, project, sibling_edge_id, EdgeKind, EdgeStyle, Handle, LayoutConfig,
    LayoutGraph, Point, PositionedEdge, PositionedNode,
};
pub use node::{DecompositionNode, NodeId, PreOrder, TransientFlags};
pub use outline::render_outline;
pub use store::{DecompositionTree, Lineage};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with decomposition trees
    pub use crate::error::{TreeError, TreeResult};
    pub use crate::highlight::HighlightSet;
    pub use crate::layout::{project, LayoutConfig, LayoutGraph};
    pub use crate::node::{DecompositionNode, NodeId};
    pub use crate::store::DecompositionTree;
}

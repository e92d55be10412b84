//! Indented text outline of a tree
//!
//! Sent to the backend as context so a decomposition can avoid repeating
//! items that already exist elsewhere in the tree.
//!
//! ```text
//!   ship feature
//!   ▶ design
//!       sketch
//!     build
//! ```

use crate::node::{DecompositionNode, NodeId};
use crate::store::DecompositionTree;
use std::fmt::Write;

const FOCUS_PREFIX: &str = "▶ ";
const PLAIN_PREFIX: &str = "  ";

/// Render a subtree, one node per line, marking `focus`
#[must_use]
pub fn render_outline(root: &DecompositionNode, focus: Option<NodeId>) -> String {
    let mut out = String::new();
    for node in root {
        let prefix = if Some(node.id()) == focus {
            FOCUS_PREFIX
        } else {
            PLAIN_PREFIX
        };
        // Writing to a String cannot fail
        let _ = writeln!(
            out,
            "{}{}{}",
            "  ".repeat(node.depth()),
            prefix,
            node.label()
        );
    }
    out
}

impl DecompositionTree {
    /// Outline of the whole tree; empty for an empty tree
    #[must_use]
    pub fn outline(&self, focus: Option<NodeId>) -> String {
        self.root()
            .map(|root| render_outline(root, focus))
            .unwrap_or_default()
    }
}

//! Relational highlight resolution
//!
//! Hovering a node emphasizes everything related to it:
//!
//! ```text
//! highlight(node) = {node} ∪ ancestors ∪ siblings ∪ descendants
//! highlight(edge) = highlight(source) ∪ highlight(target)
//! ```
//!
//! Sets are computed per interaction and thrown away afterwards. When no set
//! is active (or the active set is empty) everything renders at full emphasis.

use crate::error::TreeResult;
use crate::node::NodeId;
use crate::store::DecompositionTree;
use indexmap::IndexSet;
use serde::Serialize;

/// Node ids emphasized by one interaction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct HighlightSet {
    nodes: IndexSet<NodeId>,
}

impl HighlightSet {
    /// Create an empty set
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Node is in the set
    #[inline]
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains(&id)
    }

    /// Edge is in the set: both endpoints are
    #[inline]
    #[must_use]
    pub fn contains_edge(&self, source: NodeId, target: NodeId) -> bool {
        self.contains(source) && self.contains(target)
    }

    /// Number of highlighted nodes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// No nodes highlighted
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Highlighted ids, in the order they were added
    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().copied()
    }

    /// Add every id from another set
    pub fn extend(&mut self, other: &HighlightSet) {
        self.nodes.extend(other.nodes.iter().copied());
    }
}

impl FromIterator<NodeId> for HighlightSet {
    fn from_iter<I: IntoIterator<Item = NodeId>>(iter: I) -> Self {
        Self {
            nodes: iter.into_iter().collect(),
        }
    }
}

impl DecompositionTree {
    /// Nodes related to `id`: itself, ancestors, siblings, descendants
    ///
    /// # Errors
    /// Addressing errors from the tree store.
    pub fn highlight_for_node(&self, id: NodeId) -> TreeResult<HighlightSet> {
        let lineage = self.ancestors_and_siblings(id)?;
        let descendants = self.descendants(id)?;

        Ok(std::iter::once(id)
            .chain(lineage.ancestors)
            .chain(lineage.siblings)
            .chain(descendants)
            .collect())
    }

    /// Union of both endpoints' node highlights
    ///
    /// # Errors
    /// Addressing errors from the tree store, for either endpoint.
    pub fn highlight_for_edge(&self, source: NodeId, target: NodeId) -> TreeResult<HighlightSet> {
        let mut set = self.highlight_for_node(source)?;
        set.extend(&self.highlight_for_node(target)?);
        Ok(set)
    }
}

/// Full emphasis unless a non-empty highlight excludes the node
#[inline]
#[must_use]
pub fn node_emphasized(highlight: Option<&HighlightSet>, id: NodeId) -> bool {
    match highlight {
        Some(set) if !set.is_empty() => set.contains(id),
        _ => true,
    }
}

/// Full emphasis unless a non-empty highlight excludes either endpoint
#[inline]
#[must_use]
pub fn edge_emphasized(highlight: Option<&HighlightSet>, source: NodeId, target: NodeId) -> bool {
    match highlight {
        Some(set) if !set.is_empty() => set.contains_edge(source, target),
        _ => true,
    }
}

//! Hierarchical tree store
//!
//! Owns the decomposition tree for one session. Nodes are located by a full
//! depth-first traversal from the root on every call; trees are shallow and
//! small, so there is no secondary index.
//!
//! Every mutation bumps [`DecompositionTree::revision`], which renderers use
//! to decide when to re-run the layout projection.

use crate::error::{TreeError, TreeResult};
use crate::node::{DecompositionNode, NodeId};
use serde::Serialize;

/// Ancestors and siblings of one node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Lineage {
    /// Root first, down to the target's parent
    pub ancestors: Vec<NodeId>,
    /// Other children of the target's parent, in order
    pub siblings: Vec<NodeId>,
}

/// Decomposition tree store
#[derive(Debug, Clone, Default)]
pub struct DecompositionTree {
    root: Option<DecompositionNode>,
    revision: u64,
}

impl DecompositionTree {
    /// Create an empty tree
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Root node, if any
    #[inline]
    #[must_use]
    pub fn root(&self) -> Option<&DecompositionNode> {
        self.root.as_ref()
    }

    /// Tree has no root
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Total node count
    #[must_use]
    pub fn len(&self) -> usize {
        self.root.as_ref().map_or(0, DecompositionNode::subtree_len)
    }

    /// Mutation counter
    #[inline]
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Clear to an empty tree
    pub fn reset(&mut self) {
        self.root = None;
        self.revision += 1;
    }

    /// Install a fresh root, discarding the previous tree
    ///
    /// Depths are recomputed from 0 down.
    pub fn set_root(&mut self, mut root: DecompositionNode) -> NodeId {
        root.set_depths(0);
        let id = root.id();
        self.root = Some(root);
        self.revision += 1;
        id
    }

    /// Look up a node
    ///
    /// # Errors
    /// `EmptyTree` without a root, `NodeNotFound` for an unknown id.
    pub fn get(&self, id: NodeId) -> TreeResult<&DecompositionNode> {
        let root = self.root.as_ref().ok_or(TreeError::EmptyTree)?;
        root.find(id).ok_or(TreeError::NodeNotFound(id))
    }

    /// Replace a node's children, preserving their order
    ///
    /// Any previous children and their subtrees are discarded. The whole new
    /// subtree gets depths relative to the target.
    ///
    /// # Errors
    /// `EmptyTree` without a root, `NodeNotFound` for an unknown id.
    pub fn attach_children(
        &mut self,
        id: NodeId,
        children: Vec<DecompositionNode>,
    ) -> TreeResult<()> {
        let node = self.node_mut(id)?;
        node.replace_children(children);
        self.revision += 1;
        Ok(())
    }

    /// Append one child after a node's existing children
    ///
    /// Existing children keep their subtrees. Used while a batch streams in.
    ///
    /// # Errors
    /// `EmptyTree` without a root, `NodeNotFound` for an unknown id.
    pub fn append_child(&mut self, id: NodeId, child: DecompositionNode) -> TreeResult<()> {
        let node = self.node_mut(id)?;
        node.push_child(child);
        self.revision += 1;
        Ok(())
    }

    /// Overwrite the weights of a node's children, in order
    ///
    /// # Errors
    /// Addressing errors as for [`Self::attach_children`]; `WeightCount` if
    /// `weights` does not match the child count.
    pub fn reweight_children(&mut self, id: NodeId, weights: &[f64]) -> TreeResult<()> {
        let node = self.node_mut(id)?;
        let children = node.children_mut();
        if children.len() != weights.len() {
            return Err(TreeError::WeightCount {
                expected: children.len(),
                actual: weights.len(),
            });
        }
        for (child, weight) in children.iter_mut().zip(weights) {
            child.set_weight(*weight);
        }
        self.revision += 1;
        Ok(())
    }

    /// Clear the `is_new` flag on the given nodes
    ///
    /// Unknown ids are skipped; the nodes may have been discarded by a reset.
    /// Returns how many flags were actually cleared.
    pub fn clear_new_flags(&mut self, ids: &[NodeId]) -> usize {
        let Some(root) = self.root.as_mut() else {
            return 0;
        };

        let mut cleared = 0;
        for id in ids {
            if let Some(node) = root.find_mut(*id) {
                let flags = node.flags_mut();
                if flags.is_new {
                    flags.is_new = false;
                    cleared += 1;
                }
            }
        }
        if cleared > 0 {
            self.revision += 1;
        }
        cleared
    }

    /// Ancestors (root first) and siblings of a node
    ///
    /// The root has neither.
    ///
    /// # Errors
    /// `EmptyTree` without a root, `NodeNotFound` for an unknown id.
    pub fn ancestors_and_siblings(&self, id: NodeId) -> TreeResult<Lineage> {
        let path = self.path(id)?;
        let (_, ancestors) = path.split_last().ok_or(TreeError::NodeNotFound(id))?;

        let siblings = match ancestors.last() {
            Some(parent) => parent
                .children()
                .iter()
                .map(DecompositionNode::id)
                .filter(|sibling| *sibling != id)
                .collect(),
            None => Vec::new(),
        };

        Ok(Lineage {
            ancestors: ancestors.iter().map(|n| n.id()).collect(),
            siblings,
        })
    }

    /// All ids in the subtree rooted at `id`, itself included, in pre-order
    ///
    /// # Errors
    /// `EmptyTree` without a root, `NodeNotFound` for an unknown id.
    pub fn descendants(&self, id: NodeId) -> TreeResult<Vec<NodeId>> {
        Ok(self.get(id)?.iter().map(DecompositionNode::id).collect())
    }

    /// Parent of a node; `None` for the root
    ///
    /// # Errors
    /// `EmptyTree` without a root, `NodeNotFound` for an unknown id.
    pub fn parent(&self, id: NodeId) -> TreeResult<Option<NodeId>> {
        Ok(self.ancestors_and_siblings(id)?.ancestors.last().copied())
    }

    fn path(&self, id: NodeId) -> TreeResult<Vec<&DecompositionNode>> {
        let root = self.root.as_ref().ok_or(TreeError::EmptyTree)?;
        root.path_to(id).ok_or(TreeError::NodeNotFound(id))
    }

    fn node_mut(&mut self, id: NodeId) -> TreeResult<&mut DecompositionNode> {
        let root = self.root.as_mut().ok_or(TreeError::EmptyTree)?;
        root.find_mut(id).ok_or_else(|| {
            tracing::warn!(node = %id, "node not found in tree");
            TreeError::NodeNotFound(id)
        })
    }
}

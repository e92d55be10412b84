//! Decomposition guards and child batches
//!
//! A node may be split only when:
//! - its label has at least `min_label_chars` characters
//! - it has no children yet
//! - no other decomposition of it is in flight (see [`crate::inflight`])
//!
//! A [`ChildBatch`] accumulates streamed records as tree nodes. The session
//! appends each new node to the tree as soon as it arrives, so partial results
//! are visible immediately and survive a failed stream. Children decomposed
//! while the parent is still streaming keep their subtrees.

use crate::error::{SessionError, SessionResult};
use flowsplit_stream::{Normalized, StreamRecord};
use flowsplit_tree::{DecompositionNode, NodeId};

/// Check that `node` may be decomposed
///
/// # Errors
/// - `SessionError::NotDecomposable` if the label is too short
/// - `SessionError::AlreadyDecomposed` if the node has children
pub fn check_decomposable(node: &DecompositionNode, min_label_chars: usize) -> SessionResult<()> {
    let chars = node.label().trim().chars().count();
    if chars < min_label_chars {
        return Err(SessionError::NotDecomposable(format!(
            "label {:?} is shorter than {min_label_chars} characters",
            node.label()
        )));
    }
    if !node.is_leaf() {
        return Err(SessionError::AlreadyDecomposed(node.id()));
    }
    Ok(())
}

/// Children streamed for one parent, in arrival order
#[derive(Debug, Clone)]
pub struct ChildBatch {
    parent: NodeId,
    records: Vec<StreamRecord>,
    nodes: Vec<DecompositionNode>,
}

impl ChildBatch {
    /// Start an empty batch under `parent`
    #[inline]
    #[must_use]
    pub fn new(parent: NodeId) -> Self {
        Self {
            parent,
            records: Vec::new(),
            nodes: Vec::new(),
        }
    }

    /// Parent node
    #[inline]
    #[must_use]
    pub fn parent(&self) -> NodeId {
        self.parent
    }

    /// Append a record as a new child; returns a copy of the node to attach
    pub fn push(&mut self, record: StreamRecord) -> DecompositionNode {
        let node = DecompositionNode::child(record.text.clone(), record.ratio);
        self.records.push(record);
        self.nodes.push(node.clone());
        node
    }

    /// Records received so far
    #[inline]
    #[must_use]
    pub fn records(&self) -> &[StreamRecord] {
        &self.records
    }

    /// Child nodes, un-normalized weights
    #[inline]
    #[must_use]
    pub fn nodes(&self) -> &[DecompositionNode] {
        &self.nodes
    }

    /// Child ids in order
    #[must_use]
    pub fn ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(DecompositionNode::id).collect()
    }

    /// Number of children
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// No children yet
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Normalized weights, checked against the batch size
    #[must_use]
    pub fn weights_from(&self, normalized: &Normalized) -> Vec<f64> {
        debug_assert_eq!(normalized.records.len(), self.nodes.len());
        normalized.weights()
    }
}

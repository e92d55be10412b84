//! Error types for tree operations

use crate::node::NodeId;
use thiserror::Error;

/// Tree addressing errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// No node with this id exists in the tree
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    /// Tree has no root yet
    #[error("tree is empty")]
    EmptyTree,

    /// Weight list length differs from the child count
    #[error("expected {expected} weights, got {actual}")]
    WeightCount {
        /// Children under the node
        expected: usize,
        /// Weights supplied
        actual: usize,
    },
}

/// Result type for tree operations
pub type TreeResult<T> = std::result::Result<T, TreeError>;

//! Decomposition nodes
//!
//! A node is a named work item with a weight relative to its siblings. Nodes
//! own their children directly; the tree is a plain recursive value with no
//! parent pointers. Callers outside the store refer to nodes by [`NodeId`].

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use ulid::Ulid;

/// Unique node identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub Ulid);

impl NodeId {
    /// Generate new node ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NodeId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s).map(Self)
    }
}

/// Presentation-only flags
///
/// Never consulted by structural operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransientFlags {
    /// Node was just created by a decomposition
    pub is_new: bool,
}

/// One work item in the decomposition tree
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecompositionNode {
    id: NodeId,
    label: String,
    depth: usize,
    weight: f64,
    children: Vec<DecompositionNode>,
    flags: TransientFlags,
}

impl DecompositionNode {
    /// Synthetic root: depth 0, weight 1
    #[must_use]
    pub fn root(label: impl Into<String>) -> Self {
        Self {
            id: NodeId::new(),
            label: label.into(),
            depth: 0,
            weight: 1.0,
            children: Vec::new(),
            flags: TransientFlags::default(),
        }
    }

    /// Freshly decomposed child, flagged as new
    ///
    /// Depth is assigned when the node is attached.
    #[must_use]
    pub fn child(label: impl Into<String>, weight: f64) -> Self {
        Self {
            id: NodeId::new(),
            label: label.into(),
            depth: 0,
            weight,
            children: Vec::new(),
            flags: TransientFlags { is_new: true },
        }
    }

    /// With explicit id
    #[inline]
    #[must_use]
    pub fn with_id(mut self, id: NodeId) -> Self {
        self.id = id;
        self
    }

    /// With children (depths are fixed up on attach)
    #[inline]
    #[must_use]
    pub fn with_children(mut self, children: Vec<DecompositionNode>) -> Self {
        self.children = children;
        self
    }

    /// With transient flags
    #[inline]
    #[must_use]
    pub fn with_flags(mut self, flags: TransientFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Node id
    #[inline]
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Label
    #[inline]
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Depth below the root
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Weight relative to siblings
    #[inline]
    #[must_use]
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Children in order
    #[inline]
    #[must_use]
    pub fn children(&self) -> &[DecompositionNode] {
        &self.children
    }

    /// Transient flags
    #[inline]
    #[must_use]
    pub fn flags(&self) -> TransientFlags {
        self.flags
    }

    /// Node has no children
    #[inline]
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Pre-order traversal of this subtree, self first
    #[must_use]
    pub fn iter(&self) -> PreOrder<'_> {
        PreOrder { stack: vec![self] }
    }

    /// Number of nodes in this subtree, self included
    #[must_use]
    pub fn subtree_len(&self) -> usize {
        self.iter().count()
    }

    /// Depth-first search, first match wins
    #[must_use]
    pub fn find(&self, id: NodeId) -> Option<&DecompositionNode> {
        self.iter().find(|n| n.id == id)
    }

    pub(crate) fn find_mut(&mut self, id: NodeId) -> Option<&mut DecompositionNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(id))
    }

    /// Root-to-target chain, target included
    pub(crate) fn path_to(&self, id: NodeId) -> Option<Vec<&DecompositionNode>> {
        if self.id == id {
            return Some(vec![self]);
        }
        self.children.iter().find_map(|c| {
            c.path_to(id).map(|mut path| {
                path.insert(0, self);
                path
            })
        })
    }

    pub(crate) fn set_depths(&mut self, depth: usize) {
        self.depth = depth;
        for child in &mut self.children {
            child.set_depths(depth + 1);
        }
    }

    pub(crate) fn replace_children(&mut self, children: Vec<DecompositionNode>) {
        self.children = children;
        let depth = self.depth;
        for child in &mut self.children {
            child.set_depths(depth + 1);
        }
    }

    pub(crate) fn push_child(&mut self, mut child: DecompositionNode) {
        child.set_depths(self.depth + 1);
        self.children.push(child);
    }

    pub(crate) fn children_mut(&mut self) -> &mut [DecompositionNode] {
        &mut self.children
    }

    pub(crate) fn set_weight(&mut self, weight: f64) {
        self.weight = weight;
    }

    pub(crate) fn flags_mut(&mut self) -> &mut TransientFlags {
        &mut self.flags
    }
}

/// Pre-order iterator over a subtree
#[derive(Debug)]
pub struct PreOrder<'a> {
    stack: Vec<&'a DecompositionNode>,
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = &'a DecompositionNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

impl<'a> IntoIterator for &'a DecompositionNode {
    type Item = &'a DecompositionNode;
    type IntoIter = PreOrder<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

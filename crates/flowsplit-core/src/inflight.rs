//! Per-node in-flight claims
//!
//! At most one decomposition may stream into a node at a time. A claim is
//! taken atomically before the backend is contacted and released when the
//! returned [`InFlightClaim`] is dropped, which covers success, failure and
//! cancellation of the owning future alike.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use flowsplit_tree::NodeId;
use std::sync::Arc;
use std::time::Instant;

/// Registry of nodes with a decomposition in flight
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    nodes: Arc<DashMap<NodeId, Instant>>,
}

impl InFlight {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a node; `None` if already claimed
    #[must_use]
    pub fn claim(&self, id: NodeId) -> Option<InFlightClaim> {
        match self.nodes.entry(id) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(Instant::now());
                Some(InFlightClaim {
                    id,
                    nodes: Arc::clone(&self.nodes),
                })
            }
        }
    }

    /// Node has a claim outstanding
    #[inline]
    #[must_use]
    pub fn is_in_flight(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Number of outstanding claims
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// No claims outstanding
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Outstanding claim on one node
#[derive(Debug)]
pub struct InFlightClaim {
    id: NodeId,
    nodes: Arc<DashMap<NodeId, Instant>>,
}

impl InFlightClaim {
    /// Claimed node
    #[inline]
    #[must_use]
    pub fn node_id(&self) -> NodeId {
        self.id
    }
}

impl Drop for InFlightClaim {
    fn drop(&mut self) {
        if let Some((_, since)) = self.nodes.remove(&self.id) {
            tracing::trace!(node = %self.id, held_ms = since.elapsed().as_millis(), "released claim");
        }
    }
}

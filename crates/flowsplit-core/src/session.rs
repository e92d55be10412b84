//! Decomposition session
//!
//! The context object that owns one tree and drives decompositions into it:
//! - Installs the synthetic root for a new input
//! - Streams backend output record by record into the tree
//! - Normalizes each finished batch
//! - Broadcasts every tree change to subscribers
//! - Answers lineage, highlight and layout queries
//!
//! ```text
//! backend ─fragments→ RecordStream ─record→ ChildBatch ─append→ tree ─→ TreeUpdate
//!                                             │ (stream done)
//!                                             └→ RatioNormalizer ─reweight→ tree
//! ```
//!
//! Cloning a session shares its tree; separate sessions are fully isolated.

use crate::backend::DecompositionBackend;
use crate::decomposition::{check_decomposable, ChildBatch};
use crate::error::{SessionError, SessionResult};
use crate::inflight::InFlight;
use crate::test_cases::{mind_map, TestCaseReport};
use crate::types::{
    DecompositionReport, DecompositionRequest, SessionConfig, TreeUpdate, UpdateKind,
};
use flowsplit_stream::{
    collect_payload, parse_test_cases, Completion, FramingStatus, RatioNormalizer, RecordStream,
};
use flowsplit_tree::{
    project, DecompositionNode, DecompositionTree, HighlightSet, LayoutGraph, Lineage, NodeId,
};
use futures::StreamExt;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// One decomposition session
#[derive(Debug, Clone)]
pub struct DecompositionSession {
    /// Configuration
    config: SessionConfig,
    /// The tree; locks are never held across an await
    tree: Arc<Mutex<DecompositionTree>>,
    /// Nodes currently streaming
    in_flight: InFlight,
    /// Batch normalizer
    normalizer: RatioNormalizer,
    /// Tree change notifications
    events: broadcast::Sender<TreeUpdate>,
}

impl DecompositionSession {
    /// Create a session with an empty tree
    ///
    /// # Errors
    /// `SessionError::Config` if `config` does not validate.
    pub fn new(config: SessionConfig) -> SessionResult<Self> {
        config.validate()?;
        let (events, _) = broadcast::channel(config.event_capacity);
        Ok(Self {
            normalizer: RatioNormalizer::new(config.normalize_tolerance),
            config,
            tree: Arc::new(Mutex::new(DecompositionTree::new())),
            in_flight: InFlight::new(),
            events,
        })
    }

    /// Session configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Receive every subsequent tree change
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<TreeUpdate> {
        self.events.subscribe()
    }

    /// Clear the tree
    pub fn reset(&self) {
        let mut tree = self.tree.lock();
        tree.reset();
        publish(&self.events, &tree, UpdateKind::Reset);
    }

    /// Replace the tree with a fresh root labelled with the trimmed input
    ///
    /// # Errors
    /// `SessionError::NotDecomposable` for blank input.
    pub fn set_root(&self, input: &str) -> SessionResult<NodeId> {
        let label = input.trim();
        if label.is_empty() {
            return Err(SessionError::NotDecomposable("input is empty".into()));
        }

        let mut tree = self.tree.lock();
        tree.reset();
        publish(&self.events, &tree, UpdateKind::Reset);
        let root = tree.set_root(DecompositionNode::root(label));
        publish(&self.events, &tree, UpdateKind::RootSet { root });
        Ok(root)
    }

    /// Start a new session tree from `input` and decompose its root
    ///
    /// # Errors
    /// As [`Self::set_root`] and [`Self::decompose`].
    pub async fn start(
        &self,
        input: &str,
        backend: &dyn DecompositionBackend,
    ) -> SessionResult<DecompositionReport> {
        let root = self.set_root(input)?;
        tracing::info!(root = %root, "session started");
        self.decompose(root, backend).await
    }

    /// Decompose one node into weighted children
    ///
    /// Children appear in the tree as soon as each record arrives. On
    /// failure, children already attached stay in place with their raw
    /// weights.
    ///
    /// # Errors
    /// - `AlreadyDecomposing` if another decomposition of this node is in flight
    /// - `AlreadyDecomposed` / `NotDecomposable` from the guards
    /// - `Tree` for an unknown node, or if the tree was reset mid-stream
    /// - `Backend` if the backend fails to open or the stream breaks
    /// - `MalformedResponse` if no opening frame marker was seen
    /// - `Normalize` if the payload held no valid records
    pub async fn decompose(
        &self,
        node_id: NodeId,
        backend: &dyn DecompositionBackend,
    ) -> SessionResult<DecompositionReport> {
        let _claim = self
            .in_flight
            .claim(node_id)
            .ok_or(SessionError::AlreadyDecomposing(node_id))?;

        let request = {
            let tree = self.tree.lock();
            let node = tree.get(node_id)?;
            check_decomposable(node, self.config.min_label_chars)?;
            DecompositionRequest::workflow(node.label(), node_id, tree.outline(Some(node_id)))
        };
        tracing::info!(node = %node_id, label = %request.text, "decomposing node");

        let fragments = backend.open(&request).await?;
        let mut records = RecordStream::new(fragments, self.config.frame.clone());
        let mut batch = ChildBatch::new(node_id);
        let mut flags = FlagClear::new(self);

        while let Some(record) = records.next().await {
            let node = batch.push(record?);
            let child = node.id();
            flags.track(child);
            let mut tree = self.tree.lock();
            tree.append_child(node_id, node)?;
            publish(
                &self.events,
                &tree,
                UpdateKind::ChildAttached {
                    parent: node_id,
                    child,
                },
            );
        }

        let framing = records.framing();
        if framing == FramingStatus::MarkerNotFound {
            tracing::warn!(node = %node_id, "response had no framed payload");
            return Err(SessionError::MalformedResponse(format!(
                "opening marker {:?} not found",
                self.config.frame.open
            )));
        }

        let normalized = self.normalizer.normalize(batch.records())?;
        let weights = batch.weights_from(&normalized);
        {
            let mut tree = self.tree.lock();
            tree.reweight_children(node_id, &weights)?;
            publish(
                &self.events,
                &tree,
                UpdateKind::BatchNormalized {
                    parent: node_id,
                    adjusted: normalized.adjusted,
                },
            );
        }

        let children = batch.ids();

        tracing::info!(
            node = %node_id,
            children = children.len(),
            malformed = records.malformed(),
            adjusted = normalized.adjusted,
            "decomposition complete"
        );

        Ok(DecompositionReport {
            node_id,
            children,
            weights,
            original_sum: normalized.original_sum,
            adjusted: normalized.adjusted,
            malformed: records.malformed(),
            framing,
            completion: records.completion().unwrap_or(Completion::SourceEnded),
        })
    }

    /// Generate test cases for `input`
    ///
    /// Does not touch the tree.
    ///
    /// # Errors
    /// - `NotDecomposable` for blank input
    /// - `Backend` on transport failure
    /// - `MalformedResponse` if no opening frame marker was seen
    /// - `Document` if the payload is not a test-case document
    pub async fn generate_test_cases(
        &self,
        input: &str,
        backend: &dyn DecompositionBackend,
    ) -> SessionResult<TestCaseReport> {
        let text = input.trim();
        if text.is_empty() {
            return Err(SessionError::NotDecomposable("input is empty".into()));
        }

        let fragments = backend.open(&DecompositionRequest::test_cases(text)).await?;
        let (payload, framing) = collect_payload(fragments, self.config.frame.clone()).await?;
        if !framing.has_payload() {
            tracing::warn!("test-case response had no framed payload");
            return Err(SessionError::MalformedResponse(format!(
                "opening marker {:?} not found",
                self.config.frame.open
            )));
        }

        let cases = parse_test_cases(&payload)?;
        tracing::info!(count = cases.len(), "test cases generated");

        Ok(TestCaseReport {
            mind_map: mind_map(&cases),
            cases,
            framing,
        })
    }

    /// Clear `is_new` on the given nodes now; returns how many changed
    pub fn clear_new_flags(&self, ids: &[NodeId]) -> usize {
        clear_flags(&self.tree, &self.events, ids)
    }

    /// Copy of the current tree
    #[must_use]
    pub fn snapshot(&self) -> DecompositionTree {
        self.tree.lock().clone()
    }

    /// Copy of one node and its subtree
    ///
    /// # Errors
    /// `Tree` for an unknown node.
    pub fn node(&self, id: NodeId) -> SessionResult<DecompositionNode> {
        Ok(self.tree.lock().get(id)?.clone())
    }

    /// Current tree revision
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.tree.lock().revision()
    }

    /// A decomposition of `id` is streaming
    #[must_use]
    pub fn is_in_flight(&self, id: NodeId) -> bool {
        self.in_flight.is_in_flight(id)
    }

    /// Ancestors and siblings of a node
    ///
    /// # Errors
    /// `Tree` for an unknown node.
    pub fn lineage(&self, id: NodeId) -> SessionResult<Lineage> {
        Ok(self.tree.lock().ancestors_and_siblings(id)?)
    }

    /// Subtree ids of a node, itself included
    ///
    /// # Errors
    /// `Tree` for an unknown node.
    pub fn descendants(&self, id: NodeId) -> SessionResult<Vec<NodeId>> {
        Ok(self.tree.lock().descendants(id)?)
    }

    /// Highlight set for a hovered node
    ///
    /// # Errors
    /// `Tree` for an unknown node.
    pub fn highlight_for_node(&self, id: NodeId) -> SessionResult<HighlightSet> {
        Ok(self.tree.lock().highlight_for_node(id)?)
    }

    /// Highlight set for a hovered edge
    ///
    /// # Errors
    /// `Tree` if either endpoint is unknown.
    pub fn highlight_for_edge(&self, source: NodeId, target: NodeId) -> SessionResult<HighlightSet> {
        Ok(self.tree.lock().highlight_for_edge(source, target)?)
    }

    /// Layout of the current tree
    #[must_use]
    pub fn layout(&self, highlight: Option<&HighlightSet>) -> LayoutGraph {
        let tree = self.tree.lock();
        project(tree.root(), &self.config.layout, highlight)
    }

    /// Outline of the current tree
    #[must_use]
    pub fn outline(&self, focus: Option<NodeId>) -> String {
        self.tree.lock().outline(focus)
    }
}

/// Clears `is_new` on a batch's children after the TTL, once dropped
///
/// Runs on every exit path of a decomposition, cancellation included.
struct FlagClear {
    tree: Arc<Mutex<DecompositionTree>>,
    events: broadcast::Sender<TreeUpdate>,
    ttl: Duration,
    ids: Vec<NodeId>,
}

impl FlagClear {
    fn new(session: &DecompositionSession) -> Self {
        Self {
            tree: Arc::clone(&session.tree),
            events: session.events.clone(),
            ttl: session.config.new_flag_ttl(),
            ids: Vec::new(),
        }
    }

    fn track(&mut self, id: NodeId) {
        self.ids.push(id);
    }
}

impl Drop for FlagClear {
    fn drop(&mut self) {
        if self.ids.is_empty() {
            return;
        }
        let ids = std::mem::take(&mut self.ids);
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) if !self.ttl.is_zero() => handle,
            _ => {
                clear_flags(&self.tree, &self.events, &ids);
                return;
            }
        };

        let tree = Arc::clone(&self.tree);
        let events = self.events.clone();
        let ttl = self.ttl;
        handle.spawn(async move {
            tokio::time::sleep(ttl).await;
            clear_flags(&tree, &events, &ids);
        });
    }
}

fn publish(events: &broadcast::Sender<TreeUpdate>, tree: &DecompositionTree, kind: UpdateKind) {
    // No subscribers is fine
    let _ = events.send(TreeUpdate {
        revision: tree.revision(),
        kind,
    });
}

fn clear_flags(
    tree: &Mutex<DecompositionTree>,
    events: &broadcast::Sender<TreeUpdate>,
    ids: &[NodeId],
) -> usize {
    let mut tree = tree.lock();
    let count = tree.clear_new_flags(ids);
    if count > 0 {
        tracing::debug!(count, "cleared new flags");
        publish(events, &tree, UpdateKind::FlagsCleared { count });
    }
    count
}

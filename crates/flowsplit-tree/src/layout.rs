//! Layout projection
//!
//! Pure function from a tree snapshot to positioned nodes and edges. The same
//! tree always produces the same coordinates.
//!
//! Geometry:
//! - root at `origin`
//! - children on a band `vertical_spacing` below their parent
//! - the band is `n * node_width + (n - 1) * node_spacing` wide, centered on
//!   the parent's x
//!
//! Two edge kinds come out: parent → child, and left sibling → right sibling
//! (the "flows into" relation between consecutive sub-tasks).

use crate::highlight::{edge_emphasized, node_emphasized, HighlightSet};
use crate::node::{DecompositionNode, NodeId};
use serde::{Deserialize, Serialize};

/// 2-D coordinate
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal
    pub x: f64,
    /// Vertical, growing downwards
    pub y: f64,
}

impl Point {
    /// Create point
    #[inline]
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Layout geometry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Width reserved per node
    pub node_width: f64,
    /// Gap between siblings
    pub node_spacing: f64,
    /// Distance between depth bands
    pub vertical_spacing: f64,
    /// Root position
    pub origin: Point,
}

impl LayoutConfig {
    /// With node width
    #[inline]
    #[must_use]
    pub fn with_node_width(mut self, width: f64) -> Self {
        self.node_width = width;
        self
    }

    /// With sibling gap
    #[inline]
    #[must_use]
    pub fn with_node_spacing(mut self, spacing: f64) -> Self {
        self.node_spacing = spacing;
        self
    }

    /// With band distance
    #[inline]
    #[must_use]
    pub fn with_vertical_spacing(mut self, spacing: f64) -> Self {
        self.vertical_spacing = spacing;
        self
    }

    /// With root position
    #[inline]
    #[must_use]
    pub fn with_origin(mut self, origin: Point) -> Self {
        self.origin = origin;
        self
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_width: 200.0,
            node_spacing: 50.0,
            vertical_spacing: 150.0,
            origin: Point::default(),
        }
    }
}

/// Positioned node
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionedNode {
    /// Node id
    pub id: NodeId,
    /// Label
    pub label: String,
    /// Weight relative to siblings
    pub weight: f64,
    /// Depth below the root
    pub depth: usize,
    /// Top-left position
    pub position: Point,
    /// Just created
    pub is_new: bool,
    /// Rendered at full emphasis
    pub emphasized: bool,
    /// Stacking order; emphasized nodes draw on top
    pub z_index: u8,
}

/// Edge relation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    /// Parent → child
    Parent,
    /// Left sibling → next sibling
    Sibling,
}

/// Connection point on a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Handle {
    /// Top edge
    Top,
    /// Bottom edge
    Bottom,
    /// Left edge
    Left,
    /// Right edge
    Right,
}

/// Derived edge styling
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeStyle {
    /// 0.0 to 1.0
    pub opacity: f64,
    /// Stroke width
    pub stroke_width: f64,
    /// Flow animation on
    pub animated: bool,
}

/// Positioned edge
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionedEdge {
    /// Stable edge id
    pub id: String,
    /// Relation
    pub kind: EdgeKind,
    /// Source node
    pub source: NodeId,
    /// Target node
    pub target: NodeId,
    /// Source handle
    pub source_handle: Handle,
    /// Target handle
    pub target_handle: Handle,
    /// Styling
    pub style: EdgeStyle,
}

/// Full projection
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LayoutGraph {
    /// Nodes in pre-order
    pub nodes: Vec<PositionedNode>,
    /// Edges, each parent edge right after its target node
    pub edges: Vec<PositionedEdge>,
}

impl LayoutGraph {
    /// Find a positioned node
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&PositionedNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Find an edge by id
    #[must_use]
    pub fn edge(&self, id: &str) -> Option<&PositionedEdge> {
        self.edges.iter().find(|e| e.id == id)
    }
}

/// Id of a parent → child edge
#[must_use]
pub fn parent_edge_id(parent: NodeId, child: NodeId) -> String {
    format!("edge-{parent}-{child}")
}

/// Id of a sibling edge
#[must_use]
pub fn sibling_edge_id(left: NodeId, right: NodeId) -> String {
    format!("sibling-edge-{left}-{right}")
}

/// Project a tree into a positioned graph
///
/// `None` yields an empty graph.
#[must_use]
pub fn project(
    root: Option<&DecompositionNode>,
    config: &LayoutConfig,
    highlight: Option<&HighlightSet>,
) -> LayoutGraph {
    let mut projector = Projector {
        config,
        highlight,
        graph: LayoutGraph::default(),
    };
    if let Some(root) = root {
        projector.place(root, None, config.origin);
    }
    projector.graph
}

struct Projector<'a> {
    config: &'a LayoutConfig,
    highlight: Option<&'a HighlightSet>,
    graph: LayoutGraph,
}

impl Projector<'_> {
    fn place(&mut self, node: &DecompositionNode, parent: Option<NodeId>, at: Point) {
        let emphasized = node_emphasized(self.highlight, node.id());
        self.graph.nodes.push(PositionedNode {
            id: node.id(),
            label: node.label().to_string(),
            weight: node.weight(),
            depth: node.depth(),
            position: at,
            is_new: node.flags().is_new,
            emphasized,
            z_index: u8::from(emphasized),
        });

        if let Some(parent) = parent {
            self.parent_edge(parent, node.id());
        }

        let children = node.children();
        if children.is_empty() {
            return;
        }

        let cfg = self.config;
        #[allow(clippy::cast_precision_loss)]
        let n = children.len() as f64;
        let span = n * cfg.node_width + (n - 1.0) * cfg.node_spacing;
        let start = at.x - span / 2.0;
        let y = at.y + cfg.vertical_spacing;

        for (i, child) in children.iter().enumerate() {
            #[allow(clippy::cast_precision_loss)]
            let x = start + i as f64 * (cfg.node_width + cfg.node_spacing);
            self.place(child, Some(node.id()), Point::new(x, y));

            if i > 0 {
                self.sibling_edge(children[i - 1].id(), child.id());
            }
        }
    }

    fn parent_edge(&mut self, parent: NodeId, child: NodeId) {
        let on = edge_emphasized(self.highlight, parent, child);
        self.graph.edges.push(PositionedEdge {
            id: parent_edge_id(parent, child),
            kind: EdgeKind::Parent,
            source: parent,
            target: child,
            source_handle: Handle::Bottom,
            target_handle: Handle::Top,
            style: EdgeStyle {
                opacity: if on { 1.0 } else { 0.1 },
                stroke_width: 2.0,
                animated: on,
            },
        });
    }

    fn sibling_edge(&mut self, left: NodeId, right: NodeId) {
        let on = edge_emphasized(self.highlight, left, right);
        self.graph.edges.push(PositionedEdge {
            id: sibling_edge_id(left, right),
            kind: EdgeKind::Sibling,
            source: left,
            target: right,
            source_handle: Handle::Right,
            target_handle: Handle::Left,
            style: EdgeStyle {
                opacity: if on { 0.5 } else { 0.1 },
                stroke_width: 1.0,
                animated: false,
            },
        });
    }
}

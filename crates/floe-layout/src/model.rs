//! Layered-core labels and positioned output types.
//!
//! The positioned structs are plain serializable data (snapshot-friendly for
//! tests). All coordinates are center-based document coordinates after
//! `layout_document` returns; per-state passes work in state-local space and
//! are translated as the parent pass places each container.

use floe_model::geom::LayoutInfo;
use floe_model::{NodeId, StateId};

use crate::graph::DiGraph;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerNode {
    pub width: f64,
    pub height: f64,
    pub rank: Option<i32>,
    pub order: Option<usize>,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerEdge {
    pub minlen: i32,
    pub weight: f64,
}

pub type LayerGraph = DiGraph<LayerNode, LayerEdge>;

/// A fully laid-out document. Indices are parallel to the source document
/// (`states[i]` describes `doc.states[i]`, and so on down).
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct PositionedGraph {
    pub states: Vec<PositionedState>,
    /// Parallel to `doc.edges`; `None` marks an edge dropped as malformed.
    pub interstate_edges: Vec<Option<RoutedEdge>>,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct PositionedState {
    pub layout: LayoutInfo,
    /// Parallel to `state.nodes`.
    pub nodes: Vec<PositionedNode>,
    /// Parallel to `state.edges`; `None` marks an edge dropped (malformed
    /// endpoint/connector, fully inside a collapsed scope, or replaced by a
    /// shortcut around a hidden node).
    pub edges: Vec<Option<RoutedEdge>>,
    /// Synthesized edges bypassing hidden nodes; disappear again on
    /// re-layout with hiding disabled.
    pub shortcuts: Vec<ShortcutEdge>,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct PositionedNode {
    pub layout: LayoutInfo,
    /// Hidden by a collapsed enclosing scope or a display option; hidden
    /// nodes carry no meaningful geometry and are skipped by rendering and
    /// hit-testing.
    pub hidden: bool,
    /// Parallel to the node's connector name lists; points sit on the node
    /// boundary (in along the top edge, out along the bottom).
    pub in_connector_points: Vec<(f64, f64)>,
    pub out_connector_points: Vec<(f64, f64)>,
    /// Recursive layout of a nested document, already in document space.
    pub nested: Option<Box<PositionedGraph>>,
}

impl PositionedGraph {
    /// Shifts every coordinate in the laid-out tree. Used when a parent pass
    /// places the container this graph lives in.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        for state in &mut self.states {
            state.translate(dx, dy);
        }
        for edge in self.interstate_edges.iter_mut().flatten() {
            edge.translate(dx, dy);
        }
    }
}

impl PositionedState {
    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.layout.x += dx;
        self.layout.y += dy;
        for node in &mut self.nodes {
            node.translate(dx, dy);
        }
        for edge in self.edges.iter_mut().flatten() {
            edge.translate(dx, dy);
        }
        for shortcut in &mut self.shortcuts {
            shortcut.edge.translate(dx, dy);
        }
    }
}

impl PositionedNode {
    pub fn translate(&mut self, dx: f64, dy: f64) {
        if self.hidden {
            return;
        }
        self.layout.x += dx;
        self.layout.y += dy;
        for p in self
            .in_connector_points
            .iter_mut()
            .chain(self.out_connector_points.iter_mut())
        {
            p.0 += dx;
            p.1 += dy;
        }
        if let Some(nested) = &mut self.nested {
            nested.translate(dx, dy);
        }
    }
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct RoutedEdge {
    /// First/last points are snapped to the endpoint connector boundary.
    pub points: Vec<(f64, f64)>,
}

impl RoutedEdge {
    pub fn translate(&mut self, dx: f64, dy: f64) {
        for p in &mut self.points {
            p.0 += dx;
            p.1 += dy;
        }
    }

    /// Axis-aligned bounds of the path, as a center-based record.
    pub fn bounds(&self) -> LayoutInfo {
        let mut min = (f64::INFINITY, f64::INFINITY);
        let mut max = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for &(x, y) in &self.points {
            min.0 = min.0.min(x);
            min.1 = min.1.min(y);
            max.0 = max.0.max(x);
            max.1 = max.1.max(y);
        }
        if self.points.is_empty() {
            return LayoutInfo::default();
        }
        LayoutInfo::new(
            (min.0 + max.0) / 2.0,
            (min.1 + max.1) / 2.0,
            max.0 - min.0,
            max.1 - min.1,
        )
    }
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ShortcutEdge {
    pub src: NodeId,
    pub dst: NodeId,
    pub src_connector: Option<String>,
    pub dst_connector: Option<String>,
    /// The hidden node this edge bypasses.
    pub through: NodeId,
    pub edge: RoutedEdge,
}

/// Identifies a laid-out element for hit-testing and overlays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementRef {
    State(StateId),
    InterstateEdge(usize),
    Node(StateId, NodeId),
    Edge(StateId, usize),
    Shortcut(StateId, usize),
}

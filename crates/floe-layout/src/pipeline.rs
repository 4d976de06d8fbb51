//! Recursive document layout.
//!
//! Bottom-up: nested documents are laid out first and report their size to
//! the owning node, each state's internal graph is laid out flat (scopes are
//! expressed through ranks, not recursion), then the top-level pass lays out
//! the state graph using each state's aggregate bounding box as its node
//! size and translates the state-local geometry into place.
//!
//! Degradation rules: malformed edges are skipped with a warning, missing
//! sizing data falls back to minimum placeholder sizes, and graphs above the
//! large-graph threshold use plain longest-path ranking to bound latency.

use floe_model::geom::LayoutInfo;
use floe_model::traverse::scope_subtree;
use floe_model::{GraphDocument, NodeId, NodeKind, State};
use rustc_hash::FxHashMap;

use crate::model::{
    LayerEdge, LayerGraph, LayerNode, PositionedGraph, PositionedNode, PositionedState,
    RoutedEdge, ShortcutEdge,
};
use crate::rank::Ranker;
use crate::sizing::{
    CONNECTOR_SPACING, CONNECTOR_WIDTH, LABEL_HEIGHT, NESTED_MARGIN, STATE_LABEL_STRIP,
    STATE_PADDING, node_size, state_size,
};
use crate::{order, position, rank};

#[derive(Debug, Clone)]
pub struct LayoutOptions {
    pub nodesep: f64,
    pub ranksep: f64,
    /// Outer margin around the whole document (and each nested document).
    pub margin: f64,
    /// Elide access nodes and replace their edges with shortcut edges.
    pub hide_access_nodes: bool,
    pub ranker: Ranker,
    /// Above this visible-node count a graph is ranked with plain longest
    /// path instead of the tightened default.
    pub large_graph_threshold: usize,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            nodesep: 36.0,
            ranksep: 48.0,
            margin: 16.0,
            hide_access_nodes: false,
            ranker: Ranker::TightTree,
            large_graph_threshold: 1000,
        }
    }
}

/// Lays out a whole document. Deterministic: the same document and collapse
/// state always produce identical geometry.
pub fn layout_document(doc: &GraphDocument, opts: &LayoutOptions) -> PositionedGraph {
    let mut states: Vec<PositionedState> = Vec::with_capacity(doc.states.len());
    let mut contents: Vec<Option<(f64, f64)>> = Vec::with_capacity(doc.states.len());
    for state in &doc.states {
        let (positioned, content) = layout_state(state, opts);
        states.push(positioned);
        contents.push(content);
    }

    // Top-level pass over the state graph, using aggregate bounding boxes.
    let mut g = LayerGraph::new();
    for (state, content) in doc.states.iter().zip(&contents) {
        let (w, h) = state_size(state, *content);
        g.add_node(LayerNode {
            width: w,
            height: h,
            ..Default::default()
        });
    }

    let mut kept_interstate: Vec<Option<usize>> = vec![None; doc.edges.len()];
    for (i, edge) in doc.edges.iter().enumerate() {
        if edge.src >= doc.states.len() || edge.dst >= doc.states.len() {
            tracing::warn!(edge = i, "skipping malformed inter-state edge");
            continue;
        }
        kept_interstate[i] = Some(g.add_edge(edge.src, edge.dst, LayerEdge { minlen: 1, weight: 1.0 }));
    }

    run_layered(&mut g, opts);

    let rank_centers = rank_band_centers(&g);
    for (id, state) in states.iter_mut().enumerate() {
        let n = g.node(id);
        state.layout = LayoutInfo::new(
            n.x + opts.margin,
            n.y + opts.margin,
            n.width,
            n.height,
        );
        // Translate state-local content into place, centered horizontally
        // under the label strip.
        if let Some((cw, _ch)) = contents[id] {
            let dx = state.layout.x - cw / 2.0;
            let dy = state.layout.y - state.layout.height / 2.0 + STATE_LABEL_STRIP + STATE_PADDING;
            translate_state_content(state, dx, dy);
        }
    }

    let mut interstate_edges: Vec<Option<RoutedEdge>> = vec![None; doc.edges.len()];
    for (i, edge) in doc.edges.iter().enumerate() {
        if kept_interstate[i].is_none() {
            continue;
        }
        let src = &states[edge.src].layout;
        let dst = &states[edge.dst].layout;
        let points = route_between(
            (src.x, src.y + src.height / 2.0),
            (dst.x, dst.y - dst.height / 2.0),
            g.node(edge.src).rank.unwrap_or(0),
            g.node(edge.dst).rank.unwrap_or(0),
            &rank_centers,
            opts.margin,
        );
        interstate_edges[i] = Some(RoutedEdge { points });
    }

    let mut width: f64 = 0.0;
    let mut height: f64 = 0.0;
    for state in &states {
        let r = state.layout.rect();
        width = width.max(r.max_x());
        height = height.max(r.max_y());
    }
    for edge in interstate_edges.iter().flatten() {
        for &(x, y) in &edge.points {
            width = width.max(x);
            height = height.max(y);
        }
    }

    PositionedGraph {
        states,
        interstate_edges,
        width: width + opts.margin,
        height: height + opts.margin,
    }
}

fn run_layered(g: &mut LayerGraph, opts: &LayoutOptions) {
    let ranker = if g.node_count() > opts.large_graph_threshold {
        tracing::debug!(
            nodes = g.node_count(),
            "large graph: degrading to longest-path ranking"
        );
        Ranker::LongestPath
    } else {
        opts.ranker
    };
    rank::rank(g, ranker);
    order::order(g);
    position::position(g, opts.nodesep, opts.ranksep);
}

/// Per-rank vertical centers (every node in a rank shares its band center).
fn rank_band_centers(g: &LayerGraph) -> FxHashMap<i32, f64> {
    let mut centers = FxHashMap::default();
    for (_, n) in g.nodes() {
        if let Some(r) = n.rank {
            centers.entry(r).or_insert(n.y);
        }
    }
    centers
}

/// Straight route with one interior point per crossed rank band. Interior
/// point count depends only on the rank span, so a re-layout preserves it
/// and per-point position overrides stay applicable.
fn route_between(
    src: (f64, f64),
    dst: (f64, f64),
    src_rank: i32,
    dst_rank: i32,
    rank_centers: &FxHashMap<i32, f64>,
    offset: f64,
) -> Vec<(f64, f64)> {
    let mut points = vec![src];
    if dst_rank > src_rank + 1 {
        let span = (dst_rank - src_rank) as f64;
        for (step, r) in ((src_rank + 1)..dst_rank).enumerate() {
            let t = (step + 1) as f64 / span;
            let x = src.0 + (dst.0 - src.0) * t;
            let y = rank_centers
                .get(&r)
                .map(|c| c + offset)
                .unwrap_or_else(|| src.1 + (dst.1 - src.1) * t);
            points.push((x, y));
        }
    }
    points.push(dst);
    points
}

/// State-internal layout in state-local coordinates. Returns the positioned
/// state (its own `layout` left default for the parent pass to fill) and the
/// content size, or `None` for collapsed/empty states.
fn layout_state(state: &State, opts: &LayoutOptions) -> (PositionedState, Option<(f64, f64)>) {
    let n = state.nodes.len();
    let mut positioned = PositionedState {
        nodes: vec![PositionedNode::default(); n],
        edges: vec![None; state.edges.len()],
        ..Default::default()
    };

    if state.is_collapsed || n == 0 {
        for node in &mut positioned.nodes {
            node.hidden = true;
        }
        return (positioned, None);
    }

    // Visibility: collapsed scopes hide their subtree (members represented
    // by the entry), display options hide access nodes entirely.
    let mut hidden = vec![false; n];
    let mut rep: Vec<NodeId> = (0..n).collect();
    for id in 0..n {
        let node = &state.nodes[id];
        if matches!(node.kind, NodeKind::MapEntry { .. }) && node.is_collapsed && !hidden[id] {
            for member in scope_subtree(state, id) {
                hidden[member] = true;
                rep[member] = id;
            }
        }
    }
    let mut access_hidden = vec![false; n];
    if opts.hide_access_nodes {
        for (id, node) in state.nodes.iter().enumerate() {
            if matches!(node.kind, NodeKind::Access { .. }) && !hidden[id] {
                hidden[id] = true;
                access_hidden[id] = true;
            }
        }
    }

    // Classify edges: kept (with visibility-mapped endpoints), dropped, or
    // feeding shortcut synthesis around hidden access nodes.
    struct MappedEdge {
        original: usize,
        src: NodeId,
        dst: NodeId,
        src_connector: Option<String>,
        dst_connector: Option<String>,
    }
    let mut mapped: Vec<MappedEdge> = Vec::new();
    for (i, edge) in state.edges.iter().enumerate() {
        if !state.edge_is_well_formed(edge) {
            tracing::warn!(edge = i, src = edge.src, dst = edge.dst, "skipping malformed edge");
            continue;
        }
        if access_hidden[edge.src] || access_hidden[edge.dst] {
            continue; // handled by shortcut synthesis below
        }
        let (src, dst) = (rep[edge.src], rep[edge.dst]);
        if src == dst {
            continue; // fully inside a collapsed scope
        }
        // Connectors survive only if still present on the representative.
        let src_connector = edge
            .src_connector
            .clone()
            .filter(|c| state.nodes[src].out_connectors.iter().any(|n| n == c));
        let dst_connector = edge
            .dst_connector
            .clone()
            .filter(|c| state.nodes[dst].in_connectors.iter().any(|n| n == c));
        mapped.push(MappedEdge {
            original: i,
            src,
            dst,
            src_connector,
            dst_connector,
        });
    }

    // Shortcut edges: each (u -> a) x (a -> w) pair around a hidden access
    // node `a` becomes a direct u -> w edge flagged shortcut. Re-running the
    // layout with hiding disabled simply never synthesizes them ("un-hide").
    struct PendingShortcut {
        src: NodeId,
        dst: NodeId,
        src_connector: Option<String>,
        dst_connector: Option<String>,
        through: NodeId,
    }
    let mut pending_shortcuts: Vec<PendingShortcut> = Vec::new();
    for a in (0..n).filter(|&a| access_hidden[a]) {
        for (i, incoming) in state.in_edges(a) {
            if !state.edge_is_well_formed(incoming) {
                continue;
            }
            let src = rep[incoming.src];
            if access_hidden[src] {
                continue; // chained hidden nodes stay elided
            }
            for (j, outgoing) in state.out_edges(a) {
                if !state.edge_is_well_formed(outgoing) {
                    continue;
                }
                let dst = rep[outgoing.dst];
                if access_hidden[dst] || src == dst {
                    continue;
                }
                let _ = (i, j);
                pending_shortcuts.push(PendingShortcut {
                    src,
                    dst,
                    src_connector: incoming.src_connector.clone(),
                    dst_connector: outgoing.dst_connector.clone(),
                    through: a,
                });
            }
        }
    }

    // Layered core over the visible nodes.
    let mut g = LayerGraph::new();
    let mut layer_of: Vec<Option<usize>> = vec![None; n];
    let mut nested: Vec<Option<Box<PositionedGraph>>> = (0..n).map(|_| None).collect();
    for id in 0..n {
        if hidden[id] {
            continue;
        }
        let node = &state.nodes[id];
        let nested_size = match &node.kind {
            NodeKind::NestedGraph { document, .. } if !node.is_collapsed => {
                let inner = layout_document(document, opts);
                let size = (inner.width, inner.height);
                nested[id] = Some(Box::new(inner));
                Some(size)
            }
            _ => None,
        };
        let (w, h) = node_size(node, nested_size);
        layer_of[id] = Some(g.add_node(LayerNode {
            width: w,
            height: h,
            ..Default::default()
        }));
    }

    for e in &mapped {
        if let (Some(src), Some(dst)) = (layer_of[e.src], layer_of[e.dst]) {
            g.add_edge(src, dst, LayerEdge { minlen: 1, weight: 1.0 });
        }
    }
    for s in &pending_shortcuts {
        if let (Some(src), Some(dst)) = (layer_of[s.src], layer_of[s.dst]) {
            g.add_edge(src, dst, LayerEdge { minlen: 1, weight: 1.0 });
        }
    }

    run_layered(&mut g, opts);
    let rank_centers = rank_band_centers(&g);

    // Write node geometry and connector points back.
    for id in 0..n {
        let Some(v) = layer_of[id] else {
            positioned.nodes[id].hidden = true;
            continue;
        };
        let ln = g.node(v);
        let layout = LayoutInfo::new(ln.x, ln.y, ln.width, ln.height);
        let node = &state.nodes[id];
        positioned.nodes[id] = PositionedNode {
            in_connector_points: connector_points(&layout, node.in_connectors.len(), true),
            out_connector_points: connector_points(&layout, node.out_connectors.len(), false),
            layout,
            hidden: false,
            nested: None,
        };
        if let Some(mut inner) = nested[id].take() {
            let dx = layout.x - inner.width / 2.0;
            let dy = layout.y - layout.height / 2.0 + LABEL_HEIGHT + NESTED_MARGIN;
            inner.translate(dx, dy);
            positioned.nodes[id].nested = Some(inner);
        }
    }

    // Route kept edges against connector points (or node boundary centers
    // when a connector is absent), clipping endpoints to the boundary.
    let route = |src: NodeId,
                 dst: NodeId,
                 src_connector: &Option<String>,
                 dst_connector: &Option<String>,
                 nodes: &[PositionedNode]|
     -> RoutedEdge {
        let sp = attach_point(state, nodes, src, src_connector, false);
        let dp = attach_point(state, nodes, dst, dst_connector, true);
        let (sr, dr) = (
            layer_of[src].and_then(|v| g.node(v).rank).unwrap_or(0),
            layer_of[dst].and_then(|v| g.node(v).rank).unwrap_or(0),
        );
        RoutedEdge {
            points: route_between(sp, dp, sr, dr, &rank_centers, 0.0),
        }
    };

    let routed: Vec<(usize, RoutedEdge)> = mapped
        .iter()
        .map(|e| {
            (
                e.original,
                route(e.src, e.dst, &e.src_connector, &e.dst_connector, &positioned.nodes),
            )
        })
        .collect();
    for (original, edge) in routed {
        positioned.edges[original] = Some(edge);
    }
    let shortcuts: Vec<ShortcutEdge> = pending_shortcuts
        .into_iter()
        .map(|s| {
            let edge = route(s.src, s.dst, &s.src_connector, &s.dst_connector, &positioned.nodes);
            ShortcutEdge {
                src: s.src,
                dst: s.dst,
                src_connector: s.src_connector,
                dst_connector: s.dst_connector,
                through: s.through,
                edge,
            }
        })
        .collect();
    positioned.shortcuts = shortcuts;

    // Content bounds over visible geometry.
    let mut max = (0.0_f64, 0.0_f64);
    for node in positioned.nodes.iter().filter(|p| !p.hidden) {
        let r = node.layout.rect();
        max.0 = max.0.max(r.max_x());
        max.1 = max.1.max(r.max_y());
    }
    for edge in positioned.edges.iter().flatten() {
        for &(x, y) in &edge.points {
            max.0 = max.0.max(x);
            max.1 = max.1.max(y);
        }
    }
    let content = (max.0 > 0.0 && max.1 > 0.0).then_some(max);

    (positioned, content)
}

/// Evenly spaced connector centers along the top (in) or bottom (out) edge.
fn connector_points(layout: &LayoutInfo, count: usize, top: bool) -> Vec<(f64, f64)> {
    let y = if top {
        layout.y - layout.height / 2.0
    } else {
        layout.y + layout.height / 2.0
    };
    let row = count as f64 * (CONNECTOR_WIDTH + CONNECTOR_SPACING) - CONNECTOR_SPACING;
    (0..count)
        .map(|i| {
            let x = layout.x - row / 2.0
                + CONNECTOR_WIDTH / 2.0
                + i as f64 * (CONNECTOR_WIDTH + CONNECTOR_SPACING);
            (x, y)
        })
        .collect()
}

/// Where an edge attaches to a node: the named connector's point when it
/// exists, otherwise the midpoint of the facing boundary edge.
fn attach_point(
    state: &State,
    nodes: &[PositionedNode],
    node: NodeId,
    connector: &Option<String>,
    incoming: bool,
) -> (f64, f64) {
    let p = &nodes[node];
    if let Some(name) = connector {
        let (names, points) = if incoming {
            (&state.nodes[node].in_connectors, &p.in_connector_points)
        } else {
            (&state.nodes[node].out_connectors, &p.out_connector_points)
        };
        if let Some(i) = names.iter().position(|n| n == name) {
            if let Some(&pt) = points.get(i) {
                return pt;
            }
        }
    }
    if incoming {
        (p.layout.x, p.layout.y - p.layout.height / 2.0)
    } else {
        (p.layout.x, p.layout.y + p.layout.height / 2.0)
    }
}

/// Moves the already-built state-local geometry into document space. The
/// state's own `layout` is not touched; the caller owns it.
fn translate_state_content(state: &mut PositionedState, dx: f64, dy: f64) {
    for node in &mut state.nodes {
        node.translate(dx, dy);
    }
    for edge in state.edges.iter_mut().flatten() {
        edge.translate(dx, dy);
    }
    for shortcut in &mut state.shortcuts {
        shortcut.edge.translate(dx, dy);
    }
}

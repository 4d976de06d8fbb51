//! Typed hierarchical document model.
//!
//! A [`GraphDocument`] holds top-level [`State`]s connected by
//! [`InterstateEdge`]s; each state owns an internal graph of [`Node`]s and
//! [`Edge`]s plus a scope tree. Node kinds are a closed tagged variant so new
//! kinds require explicit exhaustive-match additions downstream.
//!
//! Ids are indices: `NodeId` indexes `State::nodes`, `StateId` indexes
//! `GraphDocument::states`, edge ids index the owning edge list. Deleting in
//! reverse id order therefore keeps remaining ids stable.

use indexmap::IndexMap;
use crate::uuid::ElementUuid;

pub type NodeId = usize;
pub type StateId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolType {
    #[default]
    Int,
    Float,
    Bool,
}

/// Named data container referenced by Access nodes. Shape dimensions are
/// symbolic expressions kept as text; consumers parse them on demand.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataDescriptor {
    pub shape: Vec<String>,
    pub transient: bool,
}

/// Validity error attached to a document by an upstream producer, pointing at
/// a specific element. Surfaced as a dismissible banner by the view; dismissal
/// clears it without touching document content.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentError {
    pub message: String,
    pub uuid: ElementUuid,
}

#[derive(Debug, Clone, Default)]
pub struct GraphDocument {
    pub label: String,
    /// Unique id of this graph within the document tree (`ElementUuid.graph`).
    /// The root document is 0; nested documents get increasing ids at load.
    pub graph_id: i64,
    pub states: Vec<State>,
    pub edges: Vec<InterstateEdge>,
    pub symbols: IndexMap<String, SymbolType>,
    pub constants: IndexMap<String, f64>,
    pub arrays: IndexMap<String, DataDescriptor>,
    pub error: Option<DocumentError>,
}

impl GraphDocument {
    pub fn state(&self, id: StateId) -> Option<&State> {
        self.states.get(id)
    }

    pub fn state_mut(&mut self, id: StateId) -> Option<&mut State> {
        self.states.get_mut(id)
    }

    /// Inter-state edges whose endpoints both exist. Malformed edges are
    /// skipped by consumers rather than failing the document.
    pub fn well_formed_interstate_edges(&self) -> impl Iterator<Item = (usize, &InterstateEdge)> {
        self.edges
            .iter()
            .enumerate()
            .filter(|(_, e)| e.src < self.states.len() && e.dst < self.states.len())
    }
}

#[derive(Debug, Clone, Default)]
pub struct State {
    pub label: String,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    /// Parent scope entry of each node (`None` = state root). Parallel to
    /// `nodes`; maintained by document edits, never by layout.
    pub scope_of: Vec<Option<NodeId>>,
    pub is_collapsed: bool,
}

impl State {
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// Direct children of a scope (insertion order). `None` is the state root.
    pub fn children_of(&self, scope: Option<NodeId>) -> Vec<NodeId> {
        self.scope_of
            .iter()
            .enumerate()
            .filter(|(_, parent)| **parent == scope)
            .map(|(id, _)| id)
            .collect()
    }

    pub fn parent_scope(&self, node: NodeId) -> Option<NodeId> {
        self.scope_of.get(node).copied().flatten()
    }

    /// The scope entry paired with a scope exit, if `node` is one.
    pub fn scope_entry_of(&self, node: NodeId) -> Option<NodeId> {
        match self.nodes.get(node)?.kind {
            NodeKind::MapExit { scope_entry } => Some(scope_entry),
            _ => None,
        }
    }

    pub fn in_edges(&self, node: NodeId) -> impl Iterator<Item = (usize, &Edge)> {
        self.edges.iter().enumerate().filter(move |(_, e)| e.dst == node)
    }

    pub fn out_edges(&self, node: NodeId) -> impl Iterator<Item = (usize, &Edge)> {
        self.edges.iter().enumerate().filter(move |(_, e)| e.src == node)
    }

    /// An edge is well formed when both endpoints exist and every named
    /// connector is present on its endpoint. Ill-formed edges are dropped at
    /// render/layout time, never eagerly.
    pub fn edge_is_well_formed(&self, edge: &Edge) -> bool {
        let (Some(src), Some(dst)) = (self.nodes.get(edge.src), self.nodes.get(edge.dst)) else {
            return false;
        };
        if let Some(c) = &edge.src_connector
            && !src.out_connectors.iter().any(|n| n == c)
        {
            return false;
        }
        if let Some(c) = &edge.dst_connector
            && !dst.in_connectors.iter().any(|n| n == c)
        {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, Default)]
pub struct Node {
    pub label: String,
    pub in_connectors: Vec<String>,
    pub out_connectors: Vec<String>,
    pub is_collapsed: bool,
    pub kind: NodeKind,
}

impl Node {
    pub fn new(label: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            label: label.into(),
            kind,
            ..Default::default()
        }
    }

    /// Scope entries and nested graphs contain other elements; collapse and
    /// cutout treat them as compound.
    pub fn is_compound(&self) -> bool {
        matches!(self.kind, NodeKind::MapEntry { .. } | NodeKind::NestedGraph { .. })
    }

    pub fn is_scope_node(&self) -> bool {
        matches!(self.kind, NodeKind::MapEntry { .. } | NodeKind::MapExit { .. })
    }
}

#[derive(Debug, Clone, Default)]
pub enum NodeKind {
    /// Atomic unit of compute.
    #[default]
    Tasklet,
    /// Named data access point referencing a [`DataDescriptor`].
    Access { data: String },
    /// Scope entry carrying iteration-range metadata (one range per
    /// parameter, as symbolic `begin:end:step` text).
    MapEntry {
        params: Vec<String>,
        ranges: Vec<String>,
    },
    /// Scope exit; always paired with its entry.
    MapExit { scope_entry: NodeId },
    /// Owns a full nested document. `symbol_mapping` maps inner symbol names
    /// to parent-scope expressions; parent symbols not mentioned pass through
    /// unchanged.
    NestedGraph {
        document: Box<GraphDocument>,
        symbol_mapping: IndexMap<String, String>,
    },
    Library { implementation: String },
    Reduce { axes: Vec<usize> },
}

impl NodeKind {
    /// Stable kind tag used by the wire format and by add-mode placement
    /// validation.
    pub fn tag(&self) -> &'static str {
        match self {
            NodeKind::Tasklet => "tasklet",
            NodeKind::Access { .. } => "access",
            NodeKind::MapEntry { .. } => "map_entry",
            NodeKind::MapExit { .. } => "map_exit",
            NodeKind::NestedGraph { .. } => "nested_graph",
            NodeKind::Library { .. } => "library",
            NodeKind::Reduce { .. } => "reduce",
        }
    }
}

/// Data-movement payload of an intra-state edge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Memlet {
    /// Referenced data container, if any (empty memlets model pure ordering).
    pub data: Option<String>,
    /// Symbolic access-volume expression.
    pub volume: Option<String>,
    /// Symbolic multidimensional subset, kept as text (e.g. `"0:N, i"`).
    pub subset: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Edge {
    pub src: NodeId,
    pub dst: NodeId,
    pub src_connector: Option<String>,
    pub dst_connector: Option<String>,
    pub memlet: Memlet,
    /// True for edges re-targeted around an intentionally hidden node,
    /// distinguishing them from genuine direct edges.
    pub shortcut: bool,
}

#[derive(Debug, Clone, Default)]
pub struct InterstateEdge {
    pub src: StateId,
    pub dst: StateId,
    /// Boolean condition expression (text; `"1"` means unconditional).
    pub condition: String,
    /// Ordered symbol assignments applied on transition.
    pub assignments: IndexMap<String, String>,
}

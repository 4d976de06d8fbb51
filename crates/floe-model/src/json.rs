//! JSON input contract.
//!
//! Documents arrive as JSON produced by an upstream compiler. The raw shapes
//! here are tolerant: unknown fields are ignored, most fields default, and
//! structural problems degrade (skip + `tracing::warn!`) instead of failing
//! the load wherever the model can represent the remainder.
//!
//! A per-element `position` attribute is not document content; it is
//! collected separately as a [`PositionOverride`] for the view session.

use indexmap::IndexMap;
use serde::Deserialize;

use crate::document::{
    DataDescriptor, DocumentError, Edge, GraphDocument, InterstateEdge, Memlet, Node, NodeId,
    NodeKind, State, SymbolType,
};
use crate::error::{Error, Result};
use crate::geom::PositionOverride;
use crate::uuid::ElementUuid;

/// A parsed document plus the manual position overrides it carried.
#[derive(Debug, Clone, Default)]
pub struct LoadedDocument {
    pub document: GraphDocument,
    pub overrides: Vec<(ElementUuid, PositionOverride)>,
}

pub fn parse_document(text: &str) -> Result<LoadedDocument> {
    let raw: RawDocument = serde_json::from_str(text).map_err(|e| Error::InvalidJson {
        message: e.to_string(),
    })?;
    let mut next_graph_id: i64 = 0;
    let mut overrides = Vec::new();
    let document = convert_document(raw, &mut next_graph_id, &mut overrides)?;
    Ok(LoadedDocument {
        document,
        overrides,
    })
}

pub fn parse_document_value(value: serde_json::Value) -> Result<LoadedDocument> {
    let raw: RawDocument = serde_json::from_value(value).map_err(|e| Error::InvalidJson {
        message: e.to_string(),
    })?;
    let mut next_graph_id: i64 = 0;
    let mut overrides = Vec::new();
    let document = convert_document(raw, &mut next_graph_id, &mut overrides)?;
    Ok(LoadedDocument {
        document,
        overrides,
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawDocument {
    #[serde(default)]
    label: String,
    #[serde(default)]
    states: Vec<RawState>,
    #[serde(default)]
    edges: Vec<RawInterstateEdge>,
    #[serde(default)]
    symbols: IndexMap<String, SymbolType>,
    #[serde(default)]
    constants: IndexMap<String, f64>,
    #[serde(default)]
    arrays: IndexMap<String, RawArray>,
    #[serde(default)]
    error: Option<RawDocumentError>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawArray {
    #[serde(default)]
    shape: Vec<serde_json::Value>,
    #[serde(default)]
    transient: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct RawDocumentError {
    message: String,
    uuid: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawState {
    #[serde(default)]
    label: String,
    #[serde(default)]
    collapsed: bool,
    #[serde(default)]
    nodes: Vec<RawNode>,
    #[serde(default)]
    edges: Vec<RawEdge>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawNode {
    kind: String,
    #[serde(default)]
    label: String,
    #[serde(default, rename = "inConnectors")]
    in_connectors: Vec<String>,
    #[serde(default, rename = "outConnectors")]
    out_connectors: Vec<String>,
    #[serde(default)]
    collapsed: bool,
    /// Parent scope entry node id; absent means the state root.
    #[serde(default)]
    scope: Option<NodeId>,
    #[serde(default)]
    position: Option<RawPosition>,

    // Kind-specific payloads.
    #[serde(default)]
    data: Option<String>,
    #[serde(default)]
    params: Vec<String>,
    #[serde(default)]
    ranges: Vec<String>,
    #[serde(default, rename = "scopeEntry")]
    scope_entry: Option<NodeId>,
    #[serde(default)]
    graph: Option<Box<RawDocument>>,
    #[serde(default, rename = "symbolMapping")]
    symbol_mapping: IndexMap<String, String>,
    #[serde(default)]
    implementation: Option<String>,
    #[serde(default)]
    axes: Vec<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawEdge {
    src: NodeId,
    dst: NodeId,
    #[serde(default, rename = "srcConnector")]
    src_connector: Option<String>,
    #[serde(default, rename = "dstConnector")]
    dst_connector: Option<String>,
    #[serde(default)]
    data: Option<String>,
    #[serde(default)]
    volume: Option<String>,
    #[serde(default)]
    subset: Option<String>,
    #[serde(default)]
    position: Option<RawPosition>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawInterstateEdge {
    src: usize,
    dst: usize,
    #[serde(default = "default_condition")]
    condition: String,
    #[serde(default)]
    assignments: IndexMap<String, String>,
}

fn default_condition() -> String {
    "1".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawPosition {
    #[serde(default)]
    dx: f64,
    #[serde(default)]
    dy: f64,
    #[serde(default)]
    points: Vec<(f64, f64)>,
}

impl RawPosition {
    fn into_override(self) -> PositionOverride {
        PositionOverride {
            dx: self.dx,
            dy: self.dy,
            points: self.points,
        }
    }
}

fn convert_document(
    raw: RawDocument,
    next_graph_id: &mut i64,
    overrides: &mut Vec<(ElementUuid, PositionOverride)>,
) -> Result<GraphDocument> {
    let graph_id = *next_graph_id;
    *next_graph_id += 1;

    let mut doc = GraphDocument {
        label: raw.label,
        graph_id,
        symbols: raw.symbols,
        constants: raw.constants,
        ..Default::default()
    };

    for (name, array) in raw.arrays {
        let shape = array
            .shape
            .into_iter()
            .map(|dim| match dim {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .collect();
        doc.arrays.insert(
            name,
            DataDescriptor {
                shape,
                transient: array.transient,
            },
        );
    }

    if let Some(err) = raw.error {
        match err.uuid.parse::<ElementUuid>() {
            Ok(uuid) => {
                doc.error = Some(DocumentError {
                    message: err.message,
                    uuid,
                });
            }
            Err(_) => {
                tracing::warn!(uuid = %err.uuid, "dropping document error with unparsable uuid");
            }
        }
    }

    for (state_id, raw_state) in raw.states.into_iter().enumerate() {
        doc.states.push(convert_state(
            raw_state,
            graph_id,
            state_id as i64,
            next_graph_id,
            overrides,
        )?);
    }

    for (edge_id, raw_edge) in raw.edges.into_iter().enumerate() {
        if raw_edge.src >= doc.states.len() || raw_edge.dst >= doc.states.len() {
            tracing::warn!(
                edge = edge_id,
                src = raw_edge.src,
                dst = raw_edge.dst,
                "skipping inter-state edge with dangling endpoint"
            );
            continue;
        }
        doc.edges.push(InterstateEdge {
            src: raw_edge.src,
            dst: raw_edge.dst,
            condition: raw_edge.condition,
            assignments: raw_edge.assignments,
        });
    }

    Ok(doc)
}

fn convert_state(
    raw: RawState,
    graph_id: i64,
    state_id: i64,
    next_graph_id: &mut i64,
    overrides: &mut Vec<(ElementUuid, PositionOverride)>,
) -> Result<State> {
    let mut state = State {
        label: raw.label,
        is_collapsed: raw.collapsed,
        ..Default::default()
    };

    let node_count = raw.nodes.len();
    for (node_id, raw_node) in raw.nodes.into_iter().enumerate() {
        let scope = raw_node.scope.filter(|&s| {
            if s < node_count {
                true
            } else {
                tracing::warn!(node = node_id, scope = s, "dropping dangling scope parent");
                false
            }
        });
        if let Some(pos) = &raw_node.position {
            overrides.push((
                ElementUuid::node(graph_id, state_id, node_id as i64),
                pos.clone().into_override(),
            ));
        }
        let kind = convert_kind(&raw_node, node_id, node_count, next_graph_id, overrides)?;
        state.nodes.push(Node {
            label: raw_node.label,
            in_connectors: raw_node.in_connectors,
            out_connectors: raw_node.out_connectors,
            is_collapsed: raw_node.collapsed,
            kind,
        });
        state.scope_of.push(scope);
    }

    for (edge_id, raw_edge) in raw.edges.into_iter().enumerate() {
        if raw_edge.src >= node_count || raw_edge.dst >= node_count {
            tracing::warn!(
                edge = edge_id,
                src = raw_edge.src,
                dst = raw_edge.dst,
                "skipping edge with dangling endpoint"
            );
            continue;
        }
        if let Some(pos) = raw_edge.position {
            overrides.push((
                ElementUuid::edge(graph_id, state_id, edge_id as i64),
                pos.into_override(),
            ));
        }
        state.edges.push(Edge {
            src: raw_edge.src,
            dst: raw_edge.dst,
            src_connector: raw_edge.src_connector,
            dst_connector: raw_edge.dst_connector,
            memlet: Memlet {
                data: raw_edge.data,
                volume: raw_edge.volume,
                subset: raw_edge.subset,
            },
            shortcut: false,
        });
    }

    Ok(state)
}

fn convert_kind(
    raw: &RawNode,
    node_id: NodeId,
    node_count: usize,
    next_graph_id: &mut i64,
    overrides: &mut Vec<(ElementUuid, PositionOverride)>,
) -> Result<NodeKind> {
    Ok(match raw.kind.as_str() {
        "tasklet" => NodeKind::Tasklet,
        "access" => NodeKind::Access {
            data: raw.data.clone().unwrap_or_default(),
        },
        "map_entry" => NodeKind::MapEntry {
            params: raw.params.clone(),
            ranges: raw.ranges.clone(),
        },
        "map_exit" => {
            let entry = raw.scope_entry.filter(|&e| e < node_count);
            match entry {
                Some(scope_entry) => NodeKind::MapExit { scope_entry },
                None => {
                    // Unmatched exits stay in the document; layout treats them
                    // as plain nodes and rendering flags them.
                    tracing::warn!(node = node_id, "map exit without a matching entry");
                    NodeKind::MapExit {
                        scope_entry: node_id,
                    }
                }
            }
        }
        "nested_graph" => {
            let inner = raw.graph.clone().map(|b| *b).unwrap_or_default();
            NodeKind::NestedGraph {
                document: Box::new(convert_document(inner, next_graph_id, overrides)?),
                symbol_mapping: raw.symbol_mapping.clone(),
            }
        }
        "library" => NodeKind::Library {
            implementation: raw.implementation.clone().unwrap_or_default(),
        },
        "reduce" => NodeKind::Reduce {
            axes: raw.axes.clone(),
        },
        other => {
            return Err(Error::malformed(
                "node",
                format!("unknown node kind `{other}`"),
            ));
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_minimal_two_tasklet_document() {
        let text = r#"{
            "label": "doc",
            "states": [{
                "label": "s0",
                "nodes": [
                    {"kind": "tasklet", "label": "a", "outConnectors": ["out"]},
                    {"kind": "tasklet", "label": "b", "inConnectors": ["in"]}
                ],
                "edges": [
                    {"src": 0, "dst": 1, "srcConnector": "out", "dstConnector": "in"}
                ]
            }]
        }"#;
        let loaded = parse_document(text).unwrap();
        let doc = &loaded.document;
        assert_eq!(doc.states.len(), 1);
        assert_eq!(doc.states[0].nodes.len(), 2);
        assert_eq!(doc.states[0].edges.len(), 1);
        assert!(doc.states[0].edge_is_well_formed(&doc.states[0].edges[0]));
    }

    #[test]
    fn dangling_edges_are_skipped_not_fatal() {
        let text = r#"{
            "states": [{
                "nodes": [{"kind": "tasklet"}],
                "edges": [{"src": 0, "dst": 7}]
            }],
            "edges": [{"src": 0, "dst": 3}]
        }"#;
        let loaded = parse_document(text).unwrap();
        assert!(loaded.document.states[0].edges.is_empty());
        assert!(loaded.document.edges.is_empty());
    }

    #[test]
    fn nested_documents_get_fresh_graph_ids() {
        let text = r#"{
            "states": [{
                "nodes": [
                    {"kind": "nested_graph", "label": "n", "graph": {
                        "states": [{"nodes": [{"kind": "tasklet"}]}]
                    }}
                ]
            }]
        }"#;
        let loaded = parse_document(text).unwrap();
        let doc = &loaded.document;
        assert_eq!(doc.graph_id, 0);
        let NodeKind::NestedGraph { document, .. } = &doc.states[0].nodes[0].kind else {
            panic!("expected nested graph");
        };
        assert_eq!(document.graph_id, 1);
    }

    #[test]
    fn position_attributes_become_overrides() {
        let text = r#"{
            "states": [{
                "nodes": [{"kind": "tasklet", "position": {"dx": 10.0, "dy": -4.0}}]
            }]
        }"#;
        let loaded = parse_document(text).unwrap();
        assert_eq!(loaded.overrides.len(), 1);
        let (uuid, ov) = &loaded.overrides[0];
        assert_eq!(*uuid, ElementUuid::node(0, 0, 0));
        assert_eq!((ov.dx, ov.dy), (10.0, -4.0));
    }

    #[test]
    fn document_error_round_trips_uuid() {
        let text = r#"{
            "states": [{"nodes": [{"kind": "tasklet"}]}],
            "error": {"message": "bad node", "uuid": "0/0/0/-1"}
        }"#;
        let loaded = parse_document(text).unwrap();
        let err = loaded.document.error.unwrap();
        assert_eq!(err.uuid, ElementUuid::node(0, 0, 0));
    }
}

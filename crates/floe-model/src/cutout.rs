//! Cutout: derive a reduced document from a selection.
//!
//! Selection expresses intent; the reduced document is a pure derivation.
//! The result keeps the selected nodes/states, every edge between kept
//! elements, the full contents of partially selected compounds (a selected
//! scope entry/exit drags its whole scope along, a nested graph travels with
//! its node), and the root graph's symbol/constant/array context.

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;

use crate::document::{GraphDocument, NodeId, NodeKind, State, StateId};
use crate::traverse::scope_subtree;

/// What the user currently has selected, by id. `states` are whole-state
/// selections; `nodes` are per-state node selections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub states: BTreeSet<StateId>,
    pub nodes: BTreeSet<(StateId, NodeId)>,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.states.is_empty() && self.nodes.is_empty()
    }

    pub fn select_all(doc: &GraphDocument) -> Self {
        Self {
            states: (0..doc.states.len()).collect(),
            nodes: BTreeSet::new(),
        }
    }
}

/// Derives the reduced document. An empty selection yields an empty document
/// carrying only the root context tables.
pub fn cutout(doc: &GraphDocument, selection: &Selection) -> GraphDocument {
    let mut out = GraphDocument {
        label: doc.label.clone(),
        graph_id: doc.graph_id,
        symbols: doc.symbols.clone(),
        constants: doc.constants.clone(),
        arrays: doc.arrays.clone(),
        ..Default::default()
    };

    // Old state id -> new state id, insertion-ordered by old id.
    let mut state_map: FxHashMap<StateId, StateId> = FxHashMap::default();

    let mut touched: BTreeSet<StateId> = selection.states.clone();
    touched.extend(selection.nodes.iter().map(|(s, _)| *s));

    for &state_id in &touched {
        let Some(state) = doc.state(state_id) else {
            continue;
        };
        let reduced = if selection.states.contains(&state_id) {
            state.clone()
        } else {
            let picked: BTreeSet<NodeId> = selection
                .nodes
                .iter()
                .filter(|(s, _)| *s == state_id)
                .map(|(_, n)| *n)
                .collect();
            reduce_state(state, &picked)
        };
        state_map.insert(state_id, out.states.len());
        out.states.push(reduced);
    }

    for edge in &doc.edges {
        let (Some(&src), Some(&dst)) = (state_map.get(&edge.src), state_map.get(&edge.dst))
        else {
            continue;
        };
        let mut e = edge.clone();
        e.src = src;
        e.dst = dst;
        out.edges.push(e);
    }

    out
}

/// Keeps `picked` nodes expanded by compound closure, then every edge whose
/// endpoints are both kept. Node ids are remapped to the new dense indices.
fn reduce_state(state: &State, picked: &BTreeSet<NodeId>) -> State {
    let mut keep: BTreeSet<NodeId> = BTreeSet::new();
    for &id in picked {
        if state.node(id).is_none() {
            continue;
        }
        keep.insert(id);
        // A selected scope entry or exit drags the whole scope: entry, exit
        // and all contents. Nested-graph contents travel inside the node.
        let entry = match state.nodes[id].kind {
            NodeKind::MapEntry { .. } => Some(id),
            NodeKind::MapExit { scope_entry } => Some(scope_entry),
            _ => None,
        };
        if let Some(entry) = entry.filter(|&e| state.node(e).is_some()) {
            keep.insert(entry);
            keep.extend(scope_subtree(state, entry));
        }
    }

    let mut node_map: FxHashMap<NodeId, NodeId> = FxHashMap::default();
    let mut out = State {
        label: state.label.clone(),
        is_collapsed: state.is_collapsed,
        ..Default::default()
    };

    for &old_id in &keep {
        node_map.insert(old_id, out.nodes.len());
        out.nodes.push(state.nodes[old_id].clone());
        out.scope_of.push(None);
    }

    // Remap scope parents and exit/entry pairing now that ids are dense.
    for &old_id in &keep {
        let new_id = node_map[&old_id];
        out.scope_of[new_id] = state
            .parent_scope(old_id)
            .and_then(|p| node_map.get(&p).copied());
        if let NodeKind::MapExit { scope_entry } = &mut out.nodes[new_id].kind {
            if let Some(&mapped) = node_map.get(scope_entry) {
                *scope_entry = mapped;
            }
        }
    }

    for edge in &state.edges {
        let (Some(&src), Some(&dst)) = (node_map.get(&edge.src), node_map.get(&edge.dst)) else {
            continue;
        };
        let mut e = edge.clone();
        e.src = src;
        e.dst = dst;
        out.edges.push(e);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Edge, Node, NodeKind};

    fn doc_with_nested_and_sibling() -> GraphDocument {
        let mut inner = GraphDocument {
            graph_id: 1,
            ..Default::default()
        };
        inner.states.push(State {
            label: "inner".into(),
            nodes: vec![Node::new("t_in", NodeKind::Tasklet)],
            scope_of: vec![None],
            ..Default::default()
        });

        let mut state = State {
            label: "s0".into(),
            ..Default::default()
        };
        state.nodes = vec![
            Node::new(
                "nested",
                NodeKind::NestedGraph {
                    document: Box::new(inner),
                    symbol_mapping: Default::default(),
                },
            ),
            Node::new("sibling", NodeKind::Tasklet),
            Node::new("other", NodeKind::Tasklet),
        ];
        state.scope_of = vec![None, None, None];
        state.edges = vec![
            Edge {
                src: 0,
                dst: 1,
                ..Default::default()
            },
            Edge {
                src: 2,
                dst: 1,
                ..Default::default()
            },
        ];

        GraphDocument {
            states: vec![state],
            ..Default::default()
        }
    }

    #[test]
    fn nested_graph_plus_sibling_keeps_contents_and_drops_dangling_edges() {
        let doc = doc_with_nested_and_sibling();
        let mut sel = Selection::default();
        sel.nodes.insert((0, 0));
        sel.nodes.insert((0, 1));

        let cut = cutout(&doc, &sel);
        assert_eq!(cut.states.len(), 1);
        let s = &cut.states[0];
        assert_eq!(s.nodes.len(), 2);
        // Edge nested -> sibling survives; edge other -> sibling is dropped.
        assert_eq!(s.edges.len(), 1);
        assert_eq!((s.edges[0].src, s.edges[0].dst), (0, 1));
        let NodeKind::NestedGraph { document, .. } = &s.nodes[0].kind else {
            panic!("nested graph not kept");
        };
        assert_eq!(document.states[0].nodes.len(), 1);
    }

    #[test]
    fn select_all_cutout_equals_the_original_document() {
        let doc = doc_with_nested_and_sibling();
        let cut = cutout(&doc, &Selection::select_all(&doc));
        assert_eq!(cut.states.len(), doc.states.len());
        assert_eq!(cut.states[0].nodes.len(), doc.states[0].nodes.len());
        assert_eq!(cut.states[0].edges.len(), doc.states[0].edges.len());
        assert_eq!(cut.edges.len(), doc.edges.len());
    }

    #[test]
    fn selected_scope_entry_drags_the_whole_scope() {
        let mut state = State::default();
        state.nodes = vec![
            Node::new(
                "map",
                NodeKind::MapEntry {
                    params: vec!["i".into()],
                    ranges: vec!["0:N".into()],
                },
            ),
            Node::new("t", NodeKind::Tasklet),
            Node::new("map", NodeKind::MapExit { scope_entry: 0 }),
        ];
        state.scope_of = vec![None, Some(0), Some(0)];
        state.edges = vec![
            Edge {
                src: 0,
                dst: 1,
                ..Default::default()
            },
            Edge {
                src: 1,
                dst: 2,
                ..Default::default()
            },
        ];
        let doc = GraphDocument {
            states: vec![state],
            ..Default::default()
        };

        let mut sel = Selection::default();
        sel.nodes.insert((0, 0));
        let cut = cutout(&doc, &sel);
        assert_eq!(cut.states[0].nodes.len(), 3);
        assert_eq!(cut.states[0].edges.len(), 2);
        assert_eq!(cut.states[0].scope_entry_of(2), Some(0));
    }
}

//! Explicit document edits.
//!
//! Ids are indices, so removals remap every reference to a later id. Callers
//! delete in reverse id order to keep not-yet-processed ids stable; these
//! functions handle the remapping for everything stored inside the document.

use crate::document::{GraphDocument, NodeId, NodeKind, State, StateId};

/// Removes a node, its incident edges, and re-parents its scope children to
/// the node's own parent scope. All later node ids shift down by one.
pub fn remove_node(state: &mut State, id: NodeId) {
    if id >= state.nodes.len() {
        return;
    }
    let parent = state.scope_of[id];

    state.edges.retain(|e| e.src != id && e.dst != id);
    for e in &mut state.edges {
        if e.src > id {
            e.src -= 1;
        }
        if e.dst > id {
            e.dst -= 1;
        }
    }

    state.nodes.remove(id);
    state.scope_of.remove(id);
    for scope in state.scope_of.iter_mut() {
        match scope {
            Some(s) if *s == id => *scope = parent,
            Some(s) if *s > id => *s -= 1,
            _ => {}
        }
    }
    for node in &mut state.nodes {
        if let NodeKind::MapExit { scope_entry } = &mut node.kind {
            if *scope_entry > id {
                *scope_entry -= 1;
            }
        }
    }
}

/// Removes a state and its incident inter-state edges. Later state ids shift
/// down by one.
pub fn remove_state(doc: &mut GraphDocument, id: StateId) {
    if id >= doc.states.len() {
        return;
    }
    doc.edges.retain(|e| e.src != id && e.dst != id);
    for e in &mut doc.edges {
        if e.src > id {
            e.src -= 1;
        }
        if e.dst > id {
            e.dst -= 1;
        }
    }
    doc.states.remove(id);
}

/// Removes an intra-state edge by index; later edge ids shift down.
pub fn remove_edge(state: &mut State, id: usize) {
    if id < state.edges.len() {
        state.edges.remove(id);
    }
}

/// Removes an inter-state edge by index.
pub fn remove_interstate_edge(doc: &mut GraphDocument, id: usize) {
    if id < doc.edges.len() {
        doc.edges.remove(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Edge, Node};

    fn three_node_state() -> State {
        let mut s = State::default();
        s.nodes = vec![
            Node::new("a", NodeKind::Tasklet),
            Node::new("b", NodeKind::Tasklet),
            Node::new("c", NodeKind::Tasklet),
        ];
        s.scope_of = vec![None, None, None];
        s.edges = vec![
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
        s
    }

    #[test]
    fn removing_a_node_remaps_edge_endpoints() {
        let mut s = three_node_state();
        remove_node(&mut s, 1);
        assert_eq!(s.nodes.len(), 2);
        assert!(s.edges.is_empty());

        let mut s = three_node_state();
        remove_node(&mut s, 0);
        assert_eq!(s.edges.len(), 1);
        assert_eq!((s.edges[0].src, s.edges[0].dst), (0, 1));
    }

    #[test]
    fn removing_a_scope_entry_reparents_children() {
        let mut s = State::default();
        s.nodes = vec![
            Node::new(
                "m",
                NodeKind::MapEntry {
                    params: vec![],
                    ranges: vec![],
                },
            ),
            Node::new("t", NodeKind::Tasklet),
        ];
        s.scope_of = vec![None, Some(0)];
        remove_node(&mut s, 0);
        assert_eq!(s.scope_of, vec![None]);
    }

    #[test]
    fn removing_a_state_drops_incident_interstate_edges() {
        let mut doc = GraphDocument {
            states: vec![State::default(), State::default(), State::default()],
            ..Default::default()
        };
        doc.edges.push(crate::document::InterstateEdge {
            src: 0,
            dst: 1,
            ..Default::default()
        });
        doc.edges.push(crate::document::InterstateEdge {
            src: 1,
            dst: 2,
            ..Default::default()
        });
        remove_state(&mut doc, 1);
        assert_eq!(doc.states.len(), 2);
        assert!(doc.edges.is_empty());
    }
}

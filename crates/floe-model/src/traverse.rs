//! Recursive walk helpers shared by layout, overlays and interaction.
//!
//! Nested documents and scope/parent back-links make naive recursion easy to
//! get wrong; every walk here uses an explicit work stack with a visited set
//! so traversal terminates even on documents with inconsistent parent links.

use rustc_hash::FxHashSet;

use crate::document::{GraphDocument, Node, NodeId, NodeKind, State};

/// All nodes inside the scope opened by `entry`, in discovery order. The
/// entry itself is not included; nested scope contents are.
pub fn scope_subtree(state: &State, entry: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut visited: FxHashSet<NodeId> = FxHashSet::default();
    let mut stack = vec![entry];
    while let Some(scope) = stack.pop() {
        for child in state.children_of(Some(scope)) {
            if !visited.insert(child) {
                continue;
            }
            out.push(child);
            if state
                .node(child)
                .is_some_and(|n| matches!(n.kind, NodeKind::MapEntry { .. }))
            {
                stack.push(child);
            }
        }
    }
    out
}

/// The multi-hop chain a memlet takes through scope entry/exit connectors,
/// as edge indices ordered source-to-destination, with `edge` somewhere in
/// the chain. Scope nodes pair `IN_<x>` with `OUT_<x>`: an edge arriving at
/// `IN_<x>` of a scope node continues as the edge leaving `OUT_<x>`, so the
/// walk follows that pairing upstream while the source is a scope node and
/// downstream while the destination is one. When several edges continue the
/// same connector the lowest edge index wins (deterministic).
pub fn memlet_path(state: &State, edge: usize) -> Vec<usize> {
    let mut chain = vec![edge];
    let mut visited: FxHashSet<usize> = FxHashSet::default();
    visited.insert(edge);

    // Upstream: src is a scope node forwarding OUT_<x> from its IN_<x>.
    let mut cur = edge;
    loop {
        let Some(e) = state.edges.get(cur) else { break };
        let src_is_scope = state.node(e.src).is_some_and(Node::is_scope_node);
        let Some(suffix) = (if src_is_scope {
            e.src_connector.as_deref().and_then(|c| c.strip_prefix("OUT_"))
        } else {
            None
        }) else {
            break;
        };
        let want = format!("IN_{suffix}");
        let Some((prev, _)) = state
            .in_edges(e.src)
            .find(|(_, cand)| cand.dst_connector.as_deref() == Some(want.as_str()))
        else {
            break;
        };
        if !visited.insert(prev) {
            break;
        }
        chain.insert(0, prev);
        cur = prev;
    }

    // Downstream: dst is a scope node forwarding IN_<x> to its OUT_<x>.
    let mut cur = edge;
    loop {
        let Some(e) = state.edges.get(cur) else { break };
        let dst_is_scope = state.node(e.dst).is_some_and(Node::is_scope_node);
        let Some(suffix) = (if dst_is_scope {
            e.dst_connector.as_deref().and_then(|c| c.strip_prefix("IN_"))
        } else {
            None
        }) else {
            break;
        };
        let want = format!("OUT_{suffix}");
        let Some((next, _)) = state
            .out_edges(e.dst)
            .find(|(_, cand)| cand.src_connector.as_deref() == Some(want.as_str()))
        else {
            break;
        };
        if !visited.insert(next) {
            break;
        }
        chain.push(next);
        cur = next;
    }

    chain
}

/// Visits `doc` and every nested document, parents before children. The
/// visited set is keyed by graph id so malformed documents with repeated ids
/// still terminate.
pub fn walk_documents<'a>(doc: &'a GraphDocument, f: &mut impl FnMut(&'a GraphDocument)) {
    let mut visited: FxHashSet<i64> = FxHashSet::default();
    let mut stack: Vec<&'a GraphDocument> = vec![doc];
    while let Some(d) = stack.pop() {
        if !visited.insert(d.graph_id) {
            continue;
        }
        f(d);
        for state in &d.states {
            for node in &state.nodes {
                if let NodeKind::NestedGraph { document, .. } = &node.kind {
                    stack.push(document);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Edge, Memlet, Node, NodeKind, State};

    fn map_scope_state() -> State {
        // access(A) -> entry -> tasklet -> exit -> access(B)
        let mut s = State {
            label: "s0".into(),
            ..Default::default()
        };
        s.nodes = vec![
            Node::new("A", NodeKind::Access { data: "A".into() }),
            Node {
                in_connectors: vec!["IN_a".into()],
                out_connectors: vec!["OUT_a".into()],
                ..Node::new(
                    "map",
                    NodeKind::MapEntry {
                        params: vec!["i".into()],
                        ranges: vec!["0:N".into()],
                    },
                )
            },
            Node {
                in_connectors: vec!["a".into()],
                out_connectors: vec!["b".into()],
                ..Node::new("t", NodeKind::Tasklet)
            },
            Node {
                in_connectors: vec!["IN_b".into()],
                out_connectors: vec!["OUT_b".into()],
                ..Node::new("map", NodeKind::MapExit { scope_entry: 1 })
            },
            Node::new("B", NodeKind::Access { data: "B".into() }),
        ];
        s.scope_of = vec![None, None, Some(1), Some(1), None];
        s.edges = vec![
            Edge {
                src: 0,
                dst: 1,
                dst_connector: Some("IN_a".into()),
                memlet: Memlet {
                    data: Some("A".into()),
                    volume: Some("N".into()),
                    subset: Some("0:N".into()),
                },
                ..Default::default()
            },
            Edge {
                src: 1,
                dst: 2,
                src_connector: Some("OUT_a".into()),
                dst_connector: Some("a".into()),
                ..Default::default()
            },
            Edge {
                src: 2,
                dst: 3,
                src_connector: Some("b".into()),
                dst_connector: Some("IN_b".into()),
                ..Default::default()
            },
            Edge {
                src: 3,
                dst: 4,
                src_connector: Some("OUT_b".into()),
                ..Default::default()
            },
        ];
        s
    }

    #[test]
    fn scope_subtree_collects_contents_without_the_entry() {
        let s = map_scope_state();
        let mut subtree = scope_subtree(&s, 1);
        subtree.sort_unstable();
        assert_eq!(subtree, vec![2, 3]);
    }

    #[test]
    fn memlet_path_spans_entry_and_exit_hops() {
        let s = map_scope_state();
        assert_eq!(memlet_path(&s, 1), vec![0, 1]);
        assert_eq!(memlet_path(&s, 2), vec![2, 3]);
        // An edge outside any scope pairing is its own chain.
        assert_eq!(memlet_path(&s, 0), vec![0, 1]);
    }
}

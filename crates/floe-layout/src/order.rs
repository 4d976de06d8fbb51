//! Crossing reduction.
//!
//! Barycenter sweeps over the ranked graph: alternate downward (sort each
//! layer by mean predecessor position) and upward passes, keep the ordering
//! with the fewest crossings. Nodes without neighbors in the fixed layer
//! keep their current position, which also makes the sweep stable for
//! disconnected nodes.

use crate::model::LayerGraph;

const MAX_SWEEPS: usize = 4;

pub fn order(g: &mut LayerGraph) {
    let mut layers = init_layers(g);
    if layers.iter().all(|l| l.len() <= 1) {
        write_back(g, &layers);
        return;
    }

    let mut best = layers.clone();
    let mut best_crossings = count_all_crossings(g, &layers);

    for sweep in 0..MAX_SWEEPS {
        if sweep % 2 == 0 {
            for fixed in 0..layers.len().saturating_sub(1) {
                sort_by_barycenter(g, &mut layers, fixed + 1, Direction::FromAbove);
            }
        } else {
            for fixed in (1..layers.len()).rev() {
                sort_by_barycenter(g, &mut layers, fixed - 1, Direction::FromBelow);
            }
        }
        let crossings = count_all_crossings(g, &layers);
        if crossings < best_crossings {
            best_crossings = crossings;
            best = layers.clone();
        }
        if best_crossings == 0 {
            break;
        }
    }

    write_back(g, &best);
}

/// Initial per-rank layers in DFS preorder from the sources, matching the
/// deterministic discovery order the rest of the pipeline relies on.
fn init_layers(g: &LayerGraph) -> Vec<Vec<usize>> {
    let max_rank = (0..g.node_count())
        .filter_map(|v| g.node(v).rank)
        .max()
        .unwrap_or(0);
    let mut layers: Vec<Vec<usize>> = vec![Vec::new(); (max_rank + 1) as usize];

    let mut visited = vec![false; g.node_count()];
    let mut stack: Vec<usize> = Vec::new();
    let roots: Vec<usize> = g.sources().collect();
    for root in roots.into_iter().chain(0..g.node_count()) {
        if visited[root] {
            continue;
        }
        stack.push(root);
        while let Some(v) = stack.pop() {
            if visited[v] {
                continue;
            }
            visited[v] = true;
            layers[g.node(v).rank.unwrap_or(0) as usize].push(v);
            // Reverse push keeps successor visit order = insertion order.
            let succs: Vec<usize> = g.successors(v).collect();
            for &w in succs.iter().rev() {
                if !visited[w] {
                    stack.push(w);
                }
            }
        }
    }

    layers
}

#[derive(Clone, Copy, PartialEq)]
enum Direction {
    FromAbove,
    FromBelow,
}

fn sort_by_barycenter(
    g: &LayerGraph,
    layers: &mut [Vec<usize>],
    movable: usize,
    dir: Direction,
) {
    let fixed = match dir {
        Direction::FromAbove => movable - 1,
        Direction::FromBelow => movable + 1,
    };
    let mut pos = vec![0usize; g.node_count()];
    for (i, &v) in layers[fixed].iter().enumerate() {
        pos[v] = i;
    }

    let current: Vec<usize> = layers[movable].clone();
    let mut keyed: Vec<(f64, usize, usize)> = Vec::with_capacity(current.len());
    for (i, &v) in current.iter().enumerate() {
        let neighbors: Vec<usize> = match dir {
            Direction::FromAbove => g
                .predecessors(v)
                .filter(|&w| g.node(w).rank == g.node(v).rank.map(|r| r - 1))
                .collect(),
            Direction::FromBelow => g
                .successors(v)
                .filter(|&w| g.node(w).rank == g.node(v).rank.map(|r| r + 1))
                .collect(),
        };
        let key = if neighbors.is_empty() {
            i as f64
        } else {
            neighbors.iter().map(|&w| pos[w] as f64).sum::<f64>() / neighbors.len() as f64
        };
        keyed.push((key, i, v));
    }
    // Stable by construction: ties fall back to the previous position.
    keyed.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal).then(a.1.cmp(&b.1)));
    layers[movable] = keyed.into_iter().map(|(_, _, v)| v).collect();
}

fn count_all_crossings(g: &LayerGraph, layers: &[Vec<usize>]) -> usize {
    let mut pos = vec![0usize; g.node_count()];
    for layer in layers {
        for (i, &v) in layer.iter().enumerate() {
            pos[v] = i;
        }
    }
    let mut total = 0usize;
    for upper in 0..layers.len().saturating_sub(1) {
        total += count_bilayer_crossings(g, &layers[upper], upper as i32 + 1, &pos);
    }
    total
}

/// Inversions among the lower endpoints of edges leaving `upper_layer`
/// toward rank `lower_rank`, scanned in upper order.
fn count_bilayer_crossings(
    g: &LayerGraph,
    upper_layer: &[usize],
    lower_rank: i32,
    pos: &[usize],
) -> usize {
    let mut endpoints: Vec<usize> = Vec::new();
    for &v in upper_layer {
        let mut outs: Vec<usize> = g
            .successors(v)
            .filter(|&w| g.node(w).rank == Some(lower_rank))
            .map(|w| pos[w])
            .collect();
        outs.sort_unstable();
        endpoints.extend(outs);
    }
    let mut crossings = 0usize;
    for i in 0..endpoints.len() {
        for j in (i + 1)..endpoints.len() {
            if endpoints[j] < endpoints[i] {
                crossings += 1;
            }
        }
    }
    crossings
}

fn write_back(g: &mut LayerGraph, layers: &[Vec<usize>]) {
    for layer in layers {
        for (i, &v) in layer.iter().enumerate() {
            g.node_mut(v).order = Some(i);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LayerEdge, LayerNode};

    fn ranked_graph(ranks: &[i32], edges: &[(usize, usize)]) -> LayerGraph {
        let mut g = LayerGraph::new();
        for &r in ranks {
            let v = g.add_node(LayerNode::default());
            g.node_mut(v).rank = Some(r);
        }
        for &(v, w) in edges {
            g.add_edge(v, w, LayerEdge::default());
        }
        g
    }

    #[test]
    fn removes_a_simple_crossing() {
        // 0 and 1 on rank 0; 2 and 3 on rank 1; edges 0->3, 1->2 cross in
        // initial order and should not after ordering.
        let mut g = ranked_graph(&[0, 0, 1, 1], &[(0, 3), (1, 2)]);
        order(&mut g);
        let layers = init_layers(&g);
        let mut final_layers: Vec<Vec<usize>> = vec![Vec::new(); layers.len()];
        for v in 0..g.node_count() {
            final_layers[g.node(v).rank.unwrap() as usize].push(v);
        }
        for layer in &mut final_layers {
            layer.sort_by_key(|&v| g.node(v).order.unwrap());
        }
        assert_eq!(count_all_crossings(&g, &final_layers), 0);
    }

    #[test]
    fn ordering_is_deterministic() {
        let build = || ranked_graph(&[0, 0, 0, 1, 1, 1], &[(0, 5), (1, 4), (2, 3), (0, 4)]);
        let mut a = build();
        let mut b = build();
        order(&mut a);
        order(&mut b);
        for v in 0..a.node_count() {
            assert_eq!(a.node(v).order, b.node(v).order);
        }
    }

    #[test]
    fn singleton_layers_get_order_zero() {
        let mut g = ranked_graph(&[0, 1], &[(0, 1)]);
        order(&mut g);
        assert_eq!(g.node(0).order, Some(0));
        assert_eq!(g.node(1).order, Some(0));
    }
}

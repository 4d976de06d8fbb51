//! Coordinate assignment.
//!
//! Ranks become horizontal bands (rank height = tallest member), orders
//! become an initial left-to-right packing, then a few median-alignment
//! sweeps pull nodes under their neighbors without ever violating the
//! in-layer ordering or minimum separation. Output is center-based with the
//! content's top-left at the origin.

use crate::model::LayerGraph;

pub fn position(g: &mut LayerGraph, nodesep: f64, ranksep: f64) {
    let layers = layers_in_order(g);
    if layers.is_empty() {
        return;
    }

    // Vertical: stack rank bands.
    let mut y = 0.0;
    for layer in &layers {
        let band = layer
            .iter()
            .map(|&v| g.node(v).height)
            .fold(0.0_f64, f64::max);
        for &v in layer {
            g.node_mut(v).y = y + band / 2.0;
        }
        y += band + ranksep;
    }

    // Horizontal: pack, then align toward neighbor medians.
    for layer in &layers {
        let mut cursor = 0.0;
        for &v in layer {
            let w = g.node(v).width;
            g.node_mut(v).x = cursor + w / 2.0;
            cursor += w + nodesep;
        }
    }
    for pass in 0..4 {
        let downward = pass % 2 == 0;
        let indices: Vec<usize> = if downward {
            (1..layers.len()).collect()
        } else {
            (0..layers.len().saturating_sub(1)).rev().collect()
        };
        for li in indices {
            align_layer(g, &layers[li], downward, nodesep);
        }
    }

    // Normalize so the content's minimum x is 0.
    let min_x = layers
        .iter()
        .flatten()
        .map(|&v| g.node(v).x - g.node(v).width / 2.0)
        .fold(f64::INFINITY, f64::min);
    if min_x.is_finite() && min_x != 0.0 {
        for layer in &layers {
            for &v in layer {
                g.node_mut(v).x -= min_x;
            }
        }
    }
}

fn layers_in_order(g: &LayerGraph) -> Vec<Vec<usize>> {
    let max_rank = (0..g.node_count())
        .filter_map(|v| g.node(v).rank)
        .max()
        .unwrap_or(-1);
    if max_rank < 0 {
        return Vec::new();
    }
    let mut layers: Vec<Vec<usize>> = vec![Vec::new(); (max_rank + 1) as usize];
    for v in 0..g.node_count() {
        layers[g.node(v).rank.unwrap_or(0) as usize].push(v);
    }
    for layer in &mut layers {
        layer.sort_by_key(|&v| g.node(v).order.unwrap_or(0));
    }
    layers
}

/// Moves each node toward the median x of its neighbors in the adjacent
/// fixed layer, then sweeps twice to restore minimum separation while
/// preserving order. Median of an empty neighbor set keeps the node put.
fn align_layer(g: &mut LayerGraph, layer: &[usize], downward: bool, nodesep: f64) {
    let desired: Vec<f64> = layer
        .iter()
        .map(|&v| {
            let mut xs: Vec<f64> = if downward {
                g.predecessors(v).map(|w| g.node(w).x).collect()
            } else {
                g.successors(v).map(|w| g.node(w).x).collect()
            };
            if xs.is_empty() {
                return g.node(v).x;
            }
            xs.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            xs[xs.len() / 2]
        })
        .collect();

    for (i, &v) in layer.iter().enumerate() {
        g.node_mut(v).x = desired[i];
    }
    // Left-to-right: push right neighbors out of overlap.
    for i in 1..layer.len() {
        let left = layer[i - 1];
        let v = layer[i];
        let min_x = g.node(left).x + g.node(left).width / 2.0 + nodesep + g.node(v).width / 2.0;
        if g.node(v).x < min_x {
            g.node_mut(v).x = min_x;
        }
    }
    // Right-to-left: pull back nodes that were pushed past their desire when
    // there is room, keeping separation intact.
    for i in (0..layer.len().saturating_sub(1)).rev() {
        let right = layer[i + 1];
        let v = layer[i];
        let max_x = g.node(right).x - g.node(right).width / 2.0 - nodesep - g.node(v).width / 2.0;
        if g.node(v).x > max_x {
            g.node_mut(v).x = max_x;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LayerEdge, LayerNode};

    fn node(g: &mut LayerGraph, rank: i32, order: usize, w: f64, h: f64) -> usize {
        g.add_node(LayerNode {
            width: w,
            height: h,
            rank: Some(rank),
            order: Some(order),
            ..Default::default()
        })
    }

    #[test]
    fn nodes_in_a_layer_do_not_overlap() {
        let mut g = LayerGraph::new();
        let a = node(&mut g, 0, 0, 60.0, 20.0);
        let b = node(&mut g, 0, 1, 40.0, 20.0);
        let c = node(&mut g, 1, 0, 40.0, 20.0);
        g.add_edge(a, c, LayerEdge::default());
        g.add_edge(b, c, LayerEdge::default());
        position(&mut g, 30.0, 40.0);

        let (ax, bx) = (g.node(a).x, g.node(b).x);
        assert!(bx - 20.0 >= ax + 30.0 + 30.0 - 1e-9, "a={ax} b={bx}");
    }

    #[test]
    fn ranks_become_separated_bands() {
        let mut g = LayerGraph::new();
        let a = node(&mut g, 0, 0, 40.0, 20.0);
        let b = node(&mut g, 1, 0, 40.0, 30.0);
        g.add_edge(a, b, LayerEdge::default());
        position(&mut g, 30.0, 40.0);
        assert_eq!(g.node(a).y, 10.0);
        assert_eq!(g.node(b).y, 20.0 + 40.0 + 15.0);
    }

    #[test]
    fn single_child_centers_under_its_parent() {
        let mut g = LayerGraph::new();
        let a = node(&mut g, 0, 0, 100.0, 20.0);
        let b = node(&mut g, 1, 0, 20.0, 20.0);
        g.add_edge(a, b, LayerEdge::default());
        position(&mut g, 30.0, 40.0);
        assert!((g.node(a).x - g.node(b).x).abs() < 1e-9);
    }
}

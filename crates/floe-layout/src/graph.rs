//! Directed multigraph container used by the layered pipeline.
//!
//! Index-based and insertion-ordered: node and edge handles are dense
//! `usize` indices, queries iterate in insertion order, and nothing here
//! allocates per query. Determinism of the layout output rests on this.

#[derive(Debug, Clone)]
pub struct EdgeEntry<E> {
    pub src: usize,
    pub dst: usize,
    pub label: E,
}

#[derive(Debug, Clone, Default)]
pub struct DiGraph<N, E> {
    nodes: Vec<N>,
    edges: Vec<EdgeEntry<E>>,
    out: Vec<Vec<usize>>,
    inc: Vec<Vec<usize>>,
}

impl<N, E> DiGraph<N, E> {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            out: Vec::new(),
            inc: Vec::new(),
        }
    }

    pub fn add_node(&mut self, label: N) -> usize {
        self.nodes.push(label);
        self.out.push(Vec::new());
        self.inc.push(Vec::new());
        self.nodes.len() - 1
    }

    /// Parallel edges are allowed; each call creates a distinct edge.
    /// Out-of-range endpoints are a caller bug and will panic in debug via
    /// the indexed pushes below, so callers validate document edges first.
    pub fn add_edge(&mut self, src: usize, dst: usize, label: E) -> usize {
        let idx = self.edges.len();
        self.edges.push(EdgeEntry { src, dst, label });
        self.out[src].push(idx);
        self.inc[dst].push(idx);
        idx
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn node(&self, v: usize) -> &N {
        &self.nodes[v]
    }

    pub fn node_mut(&mut self, v: usize) -> &mut N {
        &mut self.nodes[v]
    }

    pub fn nodes(&self) -> impl Iterator<Item = (usize, &N)> {
        self.nodes.iter().enumerate()
    }

    pub fn edge(&self, e: usize) -> &EdgeEntry<E> {
        &self.edges[e]
    }

    pub fn edge_mut(&mut self, e: usize) -> &mut EdgeEntry<E> {
        &mut self.edges[e]
    }

    pub fn edges(&self) -> impl Iterator<Item = (usize, &EdgeEntry<E>)> {
        self.edges.iter().enumerate()
    }

    pub fn out_edges(&self, v: usize) -> &[usize] {
        &self.out[v]
    }

    pub fn in_edges(&self, v: usize) -> &[usize] {
        &self.inc[v]
    }

    pub fn successors(&self, v: usize) -> impl Iterator<Item = usize> + '_ {
        self.out[v].iter().map(|&e| self.edges[e].dst)
    }

    pub fn predecessors(&self, v: usize) -> impl Iterator<Item = usize> + '_ {
        self.inc[v].iter().map(|&e| self.edges[e].src)
    }

    /// Nodes without incoming edges, in insertion order.
    pub fn sources(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.nodes.len()).filter(|&v| self.inc[v].is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insertion_order_is_preserved() {
        let mut g: DiGraph<&str, ()> = DiGraph::new();
        let a = g.add_node("a");
        let b = g.add_node("b");
        let c = g.add_node("c");
        g.add_edge(a, b, ());
        g.add_edge(a, c, ());
        g.add_edge(b, c, ());

        assert_eq!(g.successors(a).collect::<Vec<_>>(), vec![b, c]);
        assert_eq!(g.predecessors(c).collect::<Vec<_>>(), vec![a, b]);
        assert_eq!(g.sources().collect::<Vec<_>>(), vec![a]);
    }

    #[test]
    fn parallel_edges_are_distinct() {
        let mut g: DiGraph<(), u32> = DiGraph::new();
        let a = g.add_node(());
        let b = g.add_node(());
        g.add_edge(a, b, 1);
        g.add_edge(a, b, 2);
        assert_eq!(g.edge_count(), 2);
        assert_eq!(g.out_edges(a).len(), 2);
    }
}

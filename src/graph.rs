use crate::error::GraphError;
use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;

/// A simple undirected graph with labeled nodes and edges.
///
/// Wraps a petgraph [`UnGraph`] and refuses self loops and parallel edges, so
/// that every pair of nodes is joined by at most one edge. Nodes and edges are
/// addressed by plain `usize` ids in insertion order.
#[derive(Debug, Clone)]
pub struct MolGraph<N, E> {
    inner: UnGraph<N, E>,
}

impl<N, E> Default for MolGraph<N, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N, E> MolGraph<N, E> {
    pub fn new() -> Self {
        MolGraph {
            inner: UnGraph::new_undirected(),
        }
    }

    pub fn add_node(&mut self, weight: N) -> usize {
        self.inner.add_node(weight).index()
    }

    /// Adds an edge between `a` and `b`, rejecting self loops and duplicates.
    pub fn add_edge(&mut self, a: usize, b: usize, weight: E) -> Result<usize, GraphError> {
        for node in [a, b] {
            if node >= self.inner.node_count() {
                return Err(GraphError::MissingNode(node));
            }
        }
        if a == b {
            return Err(GraphError::SelfLoop(a));
        }
        if self.find_edge(a, b).is_some() {
            return Err(GraphError::DuplicateEdge(a, b));
        }
        Ok(self
            .inner
            .add_edge(NodeIndex::new(a), NodeIndex::new(b), weight)
            .index())
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    pub fn nodes(&self) -> impl Iterator<Item = usize> {
        0..self.inner.node_count()
    }

    pub fn edges(&self) -> impl Iterator<Item = usize> {
        0..self.inner.edge_count()
    }

    pub fn get_node(&self, id: usize) -> Option<&N> {
        self.inner.node_weight(NodeIndex::new(id))
    }

    pub fn get_edge(&self, id: usize) -> Option<&E> {
        self.inner.edge_weight(EdgeIndex::new(id))
    }

    /// # Panics
    ///
    /// Panics if `id` is out of range, like indexing a petgraph graph.
    pub fn node(&self, id: usize) -> &N {
        &self.inner[NodeIndex::new(id)]
    }

    pub fn node_mut(&mut self, id: usize) -> &mut N {
        &mut self.inner[NodeIndex::new(id)]
    }

    /// # Panics
    ///
    /// Panics if `id` is out of range.
    pub fn edge(&self, id: usize) -> &E {
        &self.inner[EdgeIndex::new(id)]
    }

    pub fn edge_mut(&mut self, id: usize) -> &mut E {
        &mut self.inner[EdgeIndex::new(id)]
    }

    /// Endpoints of an edge in the order they were given to [`MolGraph::add_edge`].
    pub fn endpoints(&self, id: usize) -> Option<(usize, usize)> {
        self.inner
            .edge_endpoints(EdgeIndex::new(id))
            .map(|(a, b)| (a.index(), b.index()))
    }

    pub fn find_edge(&self, a: usize, b: usize) -> Option<usize> {
        if a >= self.node_count() || b >= self.node_count() {
            return None;
        }
        self.inner
            .find_edge(NodeIndex::new(a), NodeIndex::new(b))
            .map(|e| e.index())
    }

    /// Neighbours of a node, sorted ascending.
    pub fn neighbors(&self, id: usize) -> Vec<usize> {
        let mut result: Vec<usize> = self
            .inner
            .neighbors(NodeIndex::new(id))
            .map(|n| n.index())
            .collect();
        result.sort_unstable();
        result
    }

    /// `(edge, neighbour)` pairs incident to a node, sorted by neighbour.
    pub fn incident(&self, id: usize) -> Vec<(usize, usize)> {
        let node = NodeIndex::new(id);
        let mut result: Vec<(usize, usize)> = self
            .inner
            .edges(node)
            .map(|e| {
                let other = if e.source() == node { e.target() } else { e.source() };
                (e.id().index(), other.index())
            })
            .collect();
        result.sort_unstable_by_key(|&(_, other)| other);
        result
    }

    pub fn degree(&self, id: usize) -> usize {
        self.inner.edges(NodeIndex::new(id)).count()
    }

    /// Adjacency lists indexed by node id, each sorted ascending.
    pub fn adjacency(&self) -> Vec<Vec<usize>> {
        self.nodes().map(|n| self.neighbors(n)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_graph_rules() {
        let mut graph: MolGraph<&str, u8> = MolGraph::new();
        let a = graph.add_node("a");
        let b = graph.add_node("b");
        let c = graph.add_node("c");
        assert_eq!(graph.add_edge(a, b, 1), Ok(0));
        assert_eq!(graph.add_edge(b, a, 2), Err(GraphError::DuplicateEdge(b, a)));
        assert_eq!(graph.add_edge(c, c, 1), Err(GraphError::SelfLoop(c)));
        assert_eq!(graph.add_edge(a, 7, 1), Err(GraphError::MissingNode(7)));
        assert_eq!(graph.add_edge(c, a, 3), Ok(1));

        assert_eq!(graph.neighbors(a), vec![b, c]);
        assert_eq!(graph.incident(a), vec![(0, b), (1, c)]);
        assert_eq!(graph.endpoints(1), Some((c, a)));
        assert_eq!(graph.find_edge(a, c), Some(1));
        assert_eq!(graph.find_edge(b, c), None);
        assert_eq!(graph.degree(a), 2);
        assert_eq!(graph.edge(1), &3);
        assert_eq!(graph.get_edge(5), None);
    }
}

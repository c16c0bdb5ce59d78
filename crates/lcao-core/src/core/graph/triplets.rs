use crate::core::models::graph::{AtomGraph, Edge, GraphError};
use tracing::trace;

/// Incoming edges of every node, in compressed sparse row layout.
///
/// `arena[offsets[n]..offsets[n + 1]]` holds the indices of the edges whose
/// target is `n`, in edge-list order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncidenceIndex {
    offsets: Vec<usize>,
    arena: Vec<usize>,
}

impl IncidenceIndex {
    pub fn new(n_nodes: usize, edges: &[Edge]) -> Self {
        let mut offsets = vec![0usize; n_nodes + 1];
        for edge in edges {
            offsets[edge.target + 1] += 1;
        }
        for n in 0..n_nodes {
            offsets[n + 1] += offsets[n];
        }

        let mut cursor = offsets[..n_nodes].to_vec();
        let mut arena = vec![0usize; edges.len()];
        for (e, edge) in edges.iter().enumerate() {
            arena[cursor[edge.target]] = e;
            cursor[edge.target] += 1;
        }

        Self { offsets, arena }
    }

    pub fn n_nodes(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Indices of the edges that end at `node`.
    #[inline]
    pub fn incoming(&self, node: usize) -> &[usize] {
        &self.arena[self.offsets[node]..self.offsets[node + 1]]
    }

    #[inline]
    pub fn in_degree(&self, node: usize) -> usize {
        self.offsets[node + 1] - self.offsets[node]
    }
}

/// Three-body terms `k -> j -> i` of a directed graph.
///
/// Entry `t` of every array describes one triplet: the centre `i`, the shared
/// neighbour `j`, the outer atom `k`, and the indices of the edges `k -> j`
/// and `j -> i`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Triplets {
    pub idx_i: Vec<usize>,
    pub idx_j: Vec<usize>,
    pub idx_k: Vec<usize>,
    pub edge_kj: Vec<usize>,
    pub edge_ji: Vec<usize>,
}

impl Triplets {
    /// Enumerates the triplets of `edges` on `n_nodes` nodes.
    ///
    /// Fails if an edge endpoint is not a valid node index.
    pub fn build(n_nodes: usize, edges: &[Edge]) -> Result<Self, GraphError> {
        for edge in edges {
            for (what, index) in [("edge source", edge.source), ("edge target", edge.target)] {
                if index >= n_nodes {
                    return Err(GraphError::IndexOutOfRange {
                        what,
                        index,
                        bound: n_nodes,
                    });
                }
            }
        }
        Ok(Self::enumerate(n_nodes, edges))
    }

    /// Enumerates the triplets of an already validated graph.
    pub fn from_graph(graph: &AtomGraph) -> Self {
        Self::enumerate(graph.n_atoms(), graph.edges())
    }

    fn enumerate(n_nodes: usize, edges: &[Edge]) -> Self {
        let incidence = IncidenceIndex::new(n_nodes, edges);
        let capacity: usize = edges
            .iter()
            .map(|e| incidence.in_degree(e.source))
            .sum();

        let mut triplets = Self {
            idx_i: Vec::with_capacity(capacity),
            idx_j: Vec::with_capacity(capacity),
            idx_k: Vec::with_capacity(capacity),
            edge_kj: Vec::with_capacity(capacity),
            edge_ji: Vec::with_capacity(capacity),
        };

        for (ji, edge) in edges.iter().enumerate() {
            let (j, i) = (edge.source, edge.target);
            for &kj in incidence.incoming(j) {
                let k = edges[kj].source;
                if k == i {
                    continue;
                }
                triplets.idx_i.push(i);
                triplets.idx_j.push(j);
                triplets.idx_k.push(k);
                triplets.edge_kj.push(kj);
                triplets.edge_ji.push(ji);
            }
        }

        trace!(
            n_nodes,
            n_edges = edges.len(),
            n_triplets = triplets.len(),
            "Enumerated triplets."
        );
        triplets
    }

    pub fn len(&self) -> usize {
        self.idx_i.len()
    }

    pub fn is_empty(&self) -> bool {
        self.idx_i.is_empty()
    }
}

use crate::core::models::graph::{AtomGraph, Periodicity};
use nalgebra::Vector3;

/// Displacement vectors and lengths of every edge of a graph.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeGeometry {
    /// `pos[target] - pos[source]`, plus the periodic image offset.
    pub vectors: Vec<Vector3<f64>>,
    pub distances: Vec<f64>,
}

/// Computes the displacement of every edge.
///
/// For periodic graphs the image offset `shift · lattice` is taken from the
/// lattice of the structure the source atom belongs to. Coincident atoms give
/// a zero distance, which the basis functions handle.
pub fn edge_geometry(graph: &AtomGraph) -> EdgeGeometry {
    let positions = graph.positions();
    let batch = graph.batch();

    let vectors: Vec<Vector3<f64>> = graph
        .edges()
        .iter()
        .enumerate()
        .map(|(e, edge)| {
            let mut v = positions[edge.target] - positions[edge.source];
            if let Periodicity::Periodic { lattices, shifts } = graph.periodicity() {
                let lattice = &lattices[batch.structure_of(edge.source)];
                v += lattice.tr_mul(&shifts[e]);
            }
            v
        })
        .collect();
    let distances = vectors.iter().map(|v| v.norm()).collect();

    EdgeGeometry { vectors, distances }
}

/// Angle at `j` between the bonds `j -> i` and `j -> k`, in radians.
///
/// `v_ji` is the displacement of edge `j -> i` and `v_kj` that of edge
/// `k -> j`. Degenerate vectors give an angle of zero.
#[inline]
pub fn bond_angle(v_ji: &Vector3<f64>, v_kj: &Vector3<f64>) -> f64 {
    let b = -v_kj;
    let cross = v_ji.cross(&b).norm();
    let dot = v_ji.dot(&b);
    if cross == 0.0 && dot == 0.0 {
        return 0.0;
    }
    cross.atan2(dot)
}

/// Angles of every triplet, given the edge displacements and the
/// `(edge_kj, edge_ji)` pair of each triplet.
pub fn triplet_angles(vectors: &[Vector3<f64>], edge_kj: &[usize], edge_ji: &[usize]) -> Vec<f64> {
    edge_kj
        .iter()
        .zip(edge_ji)
        .map(|(&kj, &ji)| bond_angle(&vectors[ji], &vectors[kj]))
        .collect()
}

use crate::core::models::graph::{AtomGraph, Batch, Edge, GraphError, Periodicity};
use crate::core::models::structure::Structure;
use kiddo::{ImmutableKdTree, SquaredEuclidean};
use nalgebra::{Matrix3, Point3, Vector3};
use tracing::debug;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Directed edges of a single structure with the periodic image each source
/// atom is taken from.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NeighborList {
    pub edges: Vec<Edge>,
    /// Image shift of every edge in lattice-vector units; the edge
    /// displacement is `pos[target] - pos[source] + shift · lattice`.
    pub shifts: Vec<Vector3<f64>>,
}

impl NeighborList {
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// Finds every ordered pair of atoms closer than `cutoff`.
///
/// Periodic directions of the cell are replicated far enough that every image
/// within the cutoff is found, so an atom can neighbour its own images. Both
/// directions of every pair are present. Edges are ordered by target, then
/// by source image.
pub fn radius_graph(structure: &Structure, cutoff: f64) -> NeighborList {
    if structure.is_empty() || cutoff <= 0.0 {
        return NeighborList::default();
    }

    let (lattice, ranges) = match structure.periodic_cell() {
        Some(cell) => {
            let mut ranges = [0i64; 3];
            for (axis, range) in ranges.iter_mut().enumerate() {
                let height = cell.perpendicular_height(axis);
                if cell.pbc[axis] && height > 0.0 {
                    *range = (cutoff / height).ceil() as i64;
                }
            }
            (cell.lattice, ranges)
        }
        None => (Matrix3::zeros(), [0; 3]),
    };

    // Atoms outside the home cell are wrapped back into it; `wraps[j]` holds
    // the lattice translation removed from atom j.
    let wraps = home_cell_wraps(structure, &lattice, &ranges);
    let wrapped: Vec<Point3<f64>> = structure
        .atoms
        .iter()
        .zip(&wraps)
        .map(|(atom, wrap)| atom.position - lattice.tr_mul(wrap))
        .collect();

    let mut points: Vec<[f64; 3]> = Vec::new();
    let mut sources: Vec<(usize, Vector3<f64>)> = Vec::new();
    for a in -ranges[0]..=ranges[0] {
        for b in -ranges[1]..=ranges[1] {
            for c in -ranges[2]..=ranges[2] {
                let image = Vector3::new(a as f64, b as f64, c as f64);
                let offset = lattice.tr_mul(&image);
                for (j, position) in wrapped.iter().enumerate() {
                    let p = position + offset;
                    points.push([p.x, p.y, p.z]);
                    sources.push((j, image));
                }
            }
        }
    }

    // Lattice images put many points on shared planes, which the immutable
    // tree tolerates.
    let kdtree: ImmutableKdTree<f64, 3> = ImmutableKdTree::new_from_slice(&points);
    let cutoff_sq = cutoff * cutoff;

    let mut list = NeighborList::default();
    for (i, position) in wrapped.iter().enumerate() {
        let query = [position.x, position.y, position.z];
        let mut hits: Vec<usize> = kdtree
            .within_unsorted::<SquaredEuclidean>(&query, cutoff_sq)
            .into_iter()
            .filter(|n| n.distance < cutoff_sq)
            .map(|n| n.item as usize)
            .collect();
        hits.sort_unstable();

        for hit in hits {
            let (j, image) = sources[hit];
            if j == i && image == Vector3::zeros() {
                continue;
            }
            list.edges.push(Edge::new(j, i));
            list.shifts.push(wraps[j] - wraps[i] - image);
        }
    }
    list
}

/// Whole-cell translations, in lattice-vector units, that bring every atom
/// into the home cell along the replicated axes.
fn home_cell_wraps(
    structure: &Structure,
    lattice: &Matrix3<f64>,
    ranges: &[i64; 3],
) -> Vec<Vector3<f64>> {
    let zero = vec![Vector3::zeros(); structure.len()];
    if ranges.iter().all(|&r| r == 0) {
        return zero;
    }
    let Some(to_fractional) = lattice.transpose().try_inverse() else {
        return zero;
    };
    structure
        .atoms
        .iter()
        .map(|atom| {
            let fractional = to_fractional * atom.position.coords;
            Vector3::from_fn(|axis, _| {
                if ranges[axis] > 0 {
                    fractional[axis].floor()
                } else {
                    0.0
                }
            })
        })
        .collect()
}

/// Builds the neighbour lists of several structures and joins them into one
/// batched graph.
///
/// Atom and edge indices of structure `b` are offset by the atoms of the
/// structures before it. The graph is periodic when any structure is; the
/// lattice of a non-periodic structure is then zero.
pub fn collate(structures: &[Structure], cutoff: f64) -> Result<AtomGraph, GraphError> {
    #[cfg(feature = "parallel")]
    let iter = structures.par_iter();
    #[cfg(not(feature = "parallel"))]
    let iter = structures.iter();

    let lists: Vec<NeighborList> = iter.map(|s| radius_graph(s, cutoff)).collect();

    let n_atoms: usize = structures.iter().map(Structure::len).sum();
    let n_edges: usize = lists.iter().map(NeighborList::len).sum();
    let periodic = structures.iter().any(|s| s.periodic_cell().is_some());

    let mut atomic_numbers = Vec::with_capacity(n_atoms);
    let mut positions = Vec::with_capacity(n_atoms);
    let mut assignment = Vec::with_capacity(n_atoms);
    let mut edges = Vec::with_capacity(n_edges);
    let mut shifts = Vec::with_capacity(n_edges);
    let mut lattices = Vec::with_capacity(structures.len());

    for (b, (structure, list)) in structures.iter().zip(lists).enumerate() {
        let offset = atomic_numbers.len();
        for atom in &structure.atoms {
            atomic_numbers.push(atom.atomic_number);
            positions.push(atom.position);
            assignment.push(b);
        }
        edges.extend(
            list.edges
                .iter()
                .map(|e| Edge::new(e.source + offset, e.target + offset)),
        );
        shifts.extend(list.shifts);
        lattices.push(
            structure
                .periodic_cell()
                .map_or_else(Matrix3::zeros, |c| c.lattice),
        );
    }

    debug!(
        n_structures = structures.len(),
        n_atoms, n_edges, periodic, "Collated structures into a graph."
    );

    let batch = if structures.len() == 1 {
        Batch::Single
    } else {
        Batch::Batched {
            assignment,
            n_structures: structures.len(),
        }
    };
    let periodicity = if periodic {
        Periodicity::Periodic { lattices, shifts }
    } else {
        Periodicity::None
    };

    AtomGraph::new(atomic_numbers, positions, edges, batch, periodicity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::core::models::structure::Cell;
    use crate::core::utils::geometry::edge_geometry;
    use nalgebra::Point3;

    fn water() -> Structure {
        Structure::molecule(vec![
            Atom::new(8, Point3::new(0.0, 0.0, 0.0)),
            Atom::new(1, Point3::new(0.96, 0.0, 0.0)),
            Atom::new(1, Point3::new(-0.24, 0.93, 0.0)),
        ])
    }

    #[test]
    fn radius_graph_is_symmetric_without_self_loops() {
        let list = radius_graph(&water(), 1.2);
        // O-H pairs within 1.2, H-H at ~1.52 excluded.
        assert_eq!(list.len(), 4);
        for e in &list.edges {
            assert_ne!(e.source, e.target);
            assert!(list.edges.contains(&e.reversed()));
        }
        assert!(list.shifts.iter().all(|s| *s == Vector3::zeros()));
    }

    #[test]
    fn radius_graph_orders_edges_by_target() {
        let list = radius_graph(&water(), 2.0);
        let targets: Vec<usize> = list.edges.iter().map(|e| e.target).collect();
        let mut sorted = targets.clone();
        sorted.sort();
        assert_eq!(targets, sorted);
        assert_eq!(list.len(), 6);
    }

    #[test]
    fn single_atom_in_periodic_cell_neighbours_its_images() {
        let cell = Cell::periodic(Matrix3::identity() * 2.0);
        let structure = Structure::new(vec![Atom::new(3, Point3::new(0.5, 0.5, 0.5))], Some(cell));
        let list = radius_graph(&structure, 2.5);
        // six face neighbours at 2.0, the edge-sharing ones sit at 2.83.
        assert_eq!(list.len(), 6);
        assert!(list.edges.iter().all(|e| *e == Edge::new(0, 0)));

        let graph = AtomGraph::new(
            vec![3],
            vec![structure.atoms[0].position],
            list.edges.clone(),
            Batch::Single,
            Periodicity::Periodic {
                lattices: vec![cell.lattice],
                shifts: list.shifts.clone(),
            },
        )
        .unwrap();
        for d in edge_geometry(&graph).distances {
            assert!((d - 2.0).abs() < 1e-12);
        }
    }

    #[test]
    fn periodic_shifts_reproduce_neighbour_distances() {
        let cell = Cell::periodic(Matrix3::identity() * 3.0);
        let structure = Structure::new(
            vec![
                Atom::new(11, Point3::new(0.2, 0.0, 0.0)),
                Atom::new(17, Point3::new(2.8, 0.0, 0.0)),
            ],
            Some(cell),
        );
        let graph = collate(std::slice::from_ref(&structure), 1.0).unwrap();
        // The two atoms are 0.4 apart through the boundary only.
        assert_eq!(graph.n_edges(), 2);
        for d in edge_geometry(&graph).distances {
            assert!((d - 0.4).abs() < 1e-12);
        }
    }

    #[test]
    fn atoms_outside_the_home_cell_keep_their_neighbours() {
        let cell = Cell::periodic(Matrix3::identity() * 3.0);
        let crystal = |cl_x: f64, na_y: f64| {
            Structure::new(
                vec![
                    Atom::new(11, Point3::new(0.2, na_y, 0.0)),
                    Atom::new(17, Point3::new(cl_x, 0.0, 0.0)),
                ],
                Some(cell),
            )
        };
        let reference = collate(&[crystal(2.8, 0.0)], 1.0).unwrap();
        let reference_distances = edge_geometry(&reference).distances;
        assert_eq!(reference.n_edges(), 2);

        for unwrapped in [crystal(11.8, 0.0), crystal(-3.2, 0.0), crystal(2.8, -6.0)] {
            let graph = collate(&[unwrapped], 1.0).unwrap();
            assert_eq!(graph.edges(), reference.edges());
            for (d, r) in edge_geometry(&graph).distances.iter().zip(&reference_distances) {
                assert!((d - r).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn open_directions_are_not_replicated() {
        let slab = Cell::new(Matrix3::identity() * 2.0, [true, true, false]);
        let structure = Structure::new(vec![Atom::new(6, Point3::origin())], Some(slab));
        let list = radius_graph(&structure, 2.1);
        assert_eq!(list.len(), 4);
        assert!(list.shifts.iter().all(|s| s.z == 0.0));
    }

    #[test]
    fn collate_offsets_indices_and_assigns_structures() {
        let structures = vec![water(), water()];
        let graph = collate(&structures, 1.2).unwrap();
        assert_eq!(graph.n_atoms(), 6);
        assert_eq!(graph.n_edges(), 8);
        assert_eq!(graph.assignment(), vec![0, 0, 0, 1, 1, 1]);
        assert!(graph.edges()[4..].iter().all(|e| e.source >= 3 && e.target >= 3));
        assert_eq!(graph.periodicity(), &Periodicity::None);
    }

    #[test]
    fn collate_of_single_structure_is_unbatched() {
        let graph = collate(&[water()], 1.2).unwrap();
        assert_eq!(graph.batch(), &Batch::Single);
    }

    #[test]
    fn empty_structure_has_no_edges() {
        assert!(radius_graph(&Structure::default(), 5.0).is_empty());
    }
}

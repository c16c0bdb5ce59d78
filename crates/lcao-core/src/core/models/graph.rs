use nalgebra::{Matrix3, Point3, Vector3};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("{what} index {index} is out of range (must be < {bound})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        bound: usize,
    },
    #[error("Length mismatch for {what}: expected {expected}, found {found}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("Unknown element symbol '{0}'")]
    UnknownElement(String),
    #[error("Atom {atom} has atomic number {atomic_number}, above the supported maximum {max_z}")]
    AtomicNumberOutOfRange {
        atom: usize,
        atomic_number: usize,
        max_z: usize,
    },
}

/// A directed edge `source -> target`.
///
/// In message passing `source` is the neighbour `j` and `target` the centre
/// atom `i` that receives the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge {
    pub source: usize,
    pub target: usize,
}

impl Edge {
    pub const fn new(source: usize, target: usize) -> Self {
        Self { source, target }
    }

    pub const fn reversed(&self) -> Self {
        Self::new(self.target, self.source)
    }
}

/// Assignment of atoms to structures.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Batch {
    /// Every atom belongs to the one and only structure.
    #[default]
    Single,
    /// `assignment[atom]` is the structure id of each atom.
    Batched {
        assignment: Vec<usize>,
        n_structures: usize,
    },
}

impl Batch {
    pub fn n_structures(&self) -> usize {
        match self {
            Batch::Single => 1,
            Batch::Batched { n_structures, .. } => *n_structures,
        }
    }

    #[inline]
    pub fn structure_of(&self, atom: usize) -> usize {
        match self {
            Batch::Single => 0,
            Batch::Batched { assignment, .. } => assignment[atom],
        }
    }

    /// Number of atoms in each structure.
    pub fn atom_counts(&self, n_atoms: usize) -> Vec<usize> {
        match self {
            Batch::Single => vec![n_atoms],
            Batch::Batched {
                assignment,
                n_structures,
            } => {
                let mut counts = vec![0; *n_structures];
                for &b in assignment {
                    counts[b] += 1;
                }
                counts
            }
        }
    }
}

/// Periodic boundary data of a graph.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Periodicity {
    #[default]
    None,
    /// One lattice per structure (rows are lattice vectors) and one image
    /// shift per edge, in integer multiples of the lattice vectors.
    Periodic {
        lattices: Vec<Matrix3<f64>>,
        shifts: Vec<Vector3<f64>>,
    },
}

/// The input graph of the model: atoms, directed edges and how they are
/// grouped into structures.
///
/// Construction validates every index and array length, so downstream code
/// may index freely.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomGraph {
    atomic_numbers: Vec<u8>,
    positions: Vec<Point3<f64>>,
    edges: Vec<Edge>,
    batch: Batch,
    periodicity: Periodicity,
}

impl AtomGraph {
    pub fn new(
        atomic_numbers: Vec<u8>,
        positions: Vec<Point3<f64>>,
        edges: Vec<Edge>,
        batch: Batch,
        periodicity: Periodicity,
    ) -> Result<Self, GraphError> {
        let n_atoms = atomic_numbers.len();
        check_len("positions", n_atoms, positions.len())?;

        for edge in &edges {
            check_index("edge source", edge.source, n_atoms)?;
            check_index("edge target", edge.target, n_atoms)?;
        }

        if let Batch::Batched {
            assignment,
            n_structures,
        } = &batch
        {
            check_len("batch assignment", n_atoms, assignment.len())?;
            for &b in assignment {
                check_index("batch id", b, *n_structures)?;
            }
        }

        if let Periodicity::Periodic { lattices, shifts } = &periodicity {
            check_len("lattices", batch.n_structures(), lattices.len())?;
            check_len("edge shifts", edges.len(), shifts.len())?;
        }

        Ok(Self {
            atomic_numbers,
            positions,
            edges,
            batch,
            periodicity,
        })
    }

    /// A single non-periodic structure.
    pub fn molecule(
        atomic_numbers: Vec<u8>,
        positions: Vec<Point3<f64>>,
        edges: Vec<Edge>,
    ) -> Result<Self, GraphError> {
        Self::new(
            atomic_numbers,
            positions,
            edges,
            Batch::Single,
            Periodicity::None,
        )
    }

    pub fn n_atoms(&self) -> usize {
        self.atomic_numbers.len()
    }

    pub fn n_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn n_structures(&self) -> usize {
        self.batch.n_structures()
    }

    pub fn atomic_numbers(&self) -> &[u8] {
        &self.atomic_numbers
    }

    pub fn positions(&self) -> &[Point3<f64>] {
        &self.positions
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn batch(&self) -> &Batch {
        &self.batch
    }

    pub fn periodicity(&self) -> &Periodicity {
        &self.periodicity
    }

    /// Structure id of every atom.
    pub fn assignment(&self) -> Vec<usize> {
        (0..self.n_atoms())
            .map(|a| self.batch.structure_of(a))
            .collect()
    }

    pub fn atom_counts(&self) -> Vec<usize> {
        self.batch.atom_counts(self.n_atoms())
    }

    /// Fails if any atom has an atomic number outside `1..=max_z`.
    pub fn check_atomic_numbers(&self, max_z: usize) -> Result<(), GraphError> {
        match self
            .atomic_numbers
            .iter()
            .enumerate()
            .find(|&(_, &z)| z == 0 || z as usize > max_z)
        {
            Some((atom, &z)) => Err(GraphError::AtomicNumberOutOfRange {
                atom,
                atomic_number: z as usize,
                max_z,
            }),
            None => Ok(()),
        }
    }
}

fn check_len(what: &'static str, expected: usize, found: usize) -> Result<(), GraphError> {
    if expected == found {
        Ok(())
    } else {
        Err(GraphError::LengthMismatch {
            what,
            expected,
            found,
        })
    }
}

fn check_index(what: &'static str, index: usize, bound: usize) -> Result<(), GraphError> {
    if index < bound {
        Ok(())
    } else {
        Err(GraphError::IndexOutOfRange { what, index, bound })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn positions(n: usize) -> Vec<Point3<f64>> {
        (0..n).map(|i| Point3::new(i as f64, 0.0, 0.0)).collect()
    }

    #[test]
    fn new_accepts_consistent_batched_periodic_graph() {
        let graph = AtomGraph::new(
            vec![1, 1, 8],
            positions(3),
            vec![Edge::new(0, 1), Edge::new(1, 0)],
            Batch::Batched {
                assignment: vec![0, 0, 1],
                n_structures: 2,
            },
            Periodicity::Periodic {
                lattices: vec![Matrix3::identity(); 2],
                shifts: vec![Vector3::zeros(); 2],
            },
        )
        .unwrap();
        assert_eq!(graph.n_structures(), 2);
        assert_eq!(graph.assignment(), vec![0, 0, 1]);
        assert_eq!(graph.atom_counts(), vec![2, 1]);
    }

    #[test]
    fn new_rejects_edge_index_out_of_range() {
        let err = AtomGraph::molecule(vec![1, 1], positions(2), vec![Edge::new(0, 2)]).unwrap_err();
        assert_eq!(
            err,
            GraphError::IndexOutOfRange {
                what: "edge target",
                index: 2,
                bound: 2
            }
        );
    }

    #[test]
    fn new_rejects_position_count_mismatch() {
        let err = AtomGraph::molecule(vec![1, 1], positions(3), vec![]).unwrap_err();
        assert!(matches!(err, GraphError::LengthMismatch { what: "positions", .. }));
    }

    #[test]
    fn new_rejects_batch_id_out_of_range() {
        let err = AtomGraph::new(
            vec![1, 1],
            positions(2),
            vec![],
            Batch::Batched {
                assignment: vec![0, 3],
                n_structures: 2,
            },
            Periodicity::None,
        )
        .unwrap_err();
        assert!(matches!(err, GraphError::IndexOutOfRange { what: "batch id", index: 3, .. }));
    }

    #[test]
    fn new_rejects_shift_count_mismatch() {
        let err = AtomGraph::new(
            vec![1, 1],
            positions(2),
            vec![Edge::new(0, 1)],
            Batch::Single,
            Periodicity::Periodic {
                lattices: vec![Matrix3::identity()],
                shifts: vec![],
            },
        )
        .unwrap_err();
        assert!(matches!(err, GraphError::LengthMismatch { what: "edge shifts", .. }));
    }

    #[test]
    fn check_atomic_numbers_flags_padding_and_heavy_atoms() {
        let graph = AtomGraph::molecule(vec![1, 26], positions(2), vec![]).unwrap();
        assert!(graph.check_atomic_numbers(26).is_ok());
        assert_eq!(
            graph.check_atomic_numbers(10),
            Err(GraphError::AtomicNumberOutOfRange {
                atom: 1,
                atomic_number: 26,
                max_z: 10
            })
        );
        let padded = AtomGraph::molecule(vec![0], positions(1), vec![]).unwrap();
        assert!(padded.check_atomic_numbers(10).is_err());
    }
}

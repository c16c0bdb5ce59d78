use super::atom::Atom;
use super::graph::GraphError;
use nalgebra::{Matrix3, Point3, Vector3};

/// Periodic cell of a crystal.
///
/// Rows of `lattice` are the lattice vectors `a`, `b` and `c` in Angstroms.
/// `pbc` selects the directions along which the structure repeats.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub lattice: Matrix3<f64>,
    pub pbc: [bool; 3],
}

impl Cell {
    pub fn new(lattice: Matrix3<f64>, pbc: [bool; 3]) -> Self {
        Self { lattice, pbc }
    }

    /// A cell that repeats along all three lattice vectors.
    pub fn periodic(lattice: Matrix3<f64>) -> Self {
        Self::new(lattice, [true; 3])
    }

    pub fn is_periodic(&self) -> bool {
        self.pbc.iter().any(|&p| p)
    }

    pub fn vector(&self, axis: usize) -> Vector3<f64> {
        self.lattice.row(axis).transpose()
    }

    pub fn volume(&self) -> f64 {
        self.lattice.determinant().abs()
    }

    /// Distance between the two lattice planes spanned by the other two
    /// vectors, measured along `axis`.
    pub fn perpendicular_height(&self, axis: usize) -> f64 {
        let u = self.vector((axis + 1) % 3);
        let v = self.vector((axis + 2) % 3);
        let normal = u.cross(&v);
        let norm = normal.norm();
        if norm == 0.0 {
            return 0.0;
        }
        self.volume() / norm
    }
}

/// A molecule or crystal: a list of atoms with an optional periodic cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Structure {
    pub atoms: Vec<Atom>,
    pub cell: Option<Cell>,
}

impl Structure {
    pub fn new(atoms: Vec<Atom>, cell: Option<Cell>) -> Self {
        Self { atoms, cell }
    }

    pub fn molecule(atoms: Vec<Atom>) -> Self {
        Self::new(atoms, None)
    }

    /// Builds a structure from parallel lists of element symbols and positions.
    pub fn from_symbols(
        symbols: &[&str],
        positions: &[Point3<f64>],
        cell: Option<Cell>,
    ) -> Result<Self, GraphError> {
        if symbols.len() != positions.len() {
            return Err(GraphError::LengthMismatch {
                what: "positions",
                expected: symbols.len(),
                found: positions.len(),
            });
        }
        let atoms = symbols
            .iter()
            .zip(positions)
            .map(|(&s, &p)| {
                Atom::from_symbol(s, p).ok_or_else(|| GraphError::UnknownElement(s.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(atoms, cell))
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// The cell, if it repeats along at least one direction.
    pub fn periodic_cell(&self) -> Option<&Cell> {
        self.cell.as_ref().filter(|c| c.is_periodic())
    }

    /// Returns a copy of the structure with every atom moved by `offset`.
    pub fn translated(&self, offset: &Vector3<f64>) -> Self {
        Self {
            atoms: self
                .atoms
                .iter()
                .map(|a| Atom::new(a.atomic_number, a.position + offset))
                .collect(),
            cell: self.cell,
        }
    }
}

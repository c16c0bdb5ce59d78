use crate::core::elements::table;
use nalgebra::Point3;

/// A single atom of a structure: its element and Cartesian position in
/// Angstroms.
///
/// Electron configuration is not stored; it is looked up from the atomic
/// number in the electron tables when a model consumes the atom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Atom {
    /// Atomic number (1 for hydrogen). Zero is reserved for padding.
    pub atomic_number: u8,
    /// Cartesian coordinates in Angstroms.
    pub position: Point3<f64>,
}

impl Atom {
    pub fn new(atomic_number: u8, position: Point3<f64>) -> Self {
        Self {
            atomic_number,
            position,
        }
    }

    /// Creates an atom from an element symbol such as `"C"` or `"Fe"`.
    ///
    /// Returns `None` if the symbol does not name a known element.
    pub fn from_symbol(symbol: &str, position: Point3<f64>) -> Option<Self> {
        table::atomic_number(symbol).map(|z| Self::new(z, position))
    }

    pub fn symbol(&self) -> Option<&'static str> {
        table::symbol(self.atomic_number as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_symbol_resolves_atomic_number() {
        let atom = Atom::from_symbol("Fe", Point3::new(1.0, 2.0, 3.0)).unwrap();
        assert_eq!(atom.atomic_number, 26);
        assert_eq!(atom.position, Point3::new(1.0, 2.0, 3.0));
        assert_eq!(atom.symbol(), Some("Fe"));
    }

    #[test]
    fn from_symbol_rejects_unknown_elements() {
        assert!(Atom::from_symbol("Xx", Point3::origin()).is_none());
    }
}

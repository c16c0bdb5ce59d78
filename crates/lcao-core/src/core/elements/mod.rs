//! Periodic-table data: element symbols, ground-state electron
//! configurations and the valence orbitals derived from them.

pub mod orbitals;
pub mod table;

pub use orbitals::{AUFBAU_ORDER, ElecInfo, ElementError, Orbital};
pub use table::{MAX_ATOMIC_NUMBER, atomic_number, symbol};

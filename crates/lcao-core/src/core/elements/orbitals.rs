use super::table::MAX_ATOMIC_NUMBER;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ElementError {
    #[error("Maximum atomic number must be within 1..={MAX_ATOMIC_NUMBER}, got {0}")]
    MaxAtomicNumber(usize),
    #[error("Unknown orbital '{0}'. Expected a label such as '1s', '2p' or '3d'")]
    UnknownOrbital(String),
}

const ANGULAR_LABELS: [char; 4] = ['s', 'p', 'd', 'f'];

/// An atomic subshell identified by its principal (`n`) and azimuthal (`l`)
/// quantum numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct Orbital {
    pub n: u8,
    pub l: u8,
}

impl Orbital {
    pub const fn new(n: u8, l: u8) -> Self {
        Self { n, l }
    }

    /// Maximum number of electrons the subshell can hold, `2(2l + 1)`.
    pub const fn capacity(&self) -> u8 {
        2 * (2 * self.l + 1)
    }
}

impl fmt::Display for Orbital {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.n, ANGULAR_LABELS[self.l as usize])
    }
}

impl FromStr for Orbital {
    type Err = ElementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().to_ascii_lowercase();
        let unknown = || ElementError::UnknownOrbital(s.to_string());
        let label = trimmed.chars().last().ok_or_else(unknown)?;
        let n: u8 = trimmed[..trimmed.len() - label.len_utf8()]
            .parse()
            .map_err(|_| unknown())?;
        let l = ANGULAR_LABELS
            .iter()
            .position(|&c| c == label)
            .ok_or_else(unknown)? as u8;
        let orbital = Orbital::new(n, l);
        if AUFBAU_ORDER.contains(&orbital) {
            Ok(orbital)
        } else {
            Err(unknown())
        }
    }
}

impl TryFrom<String> for Orbital {
    type Error = ElementError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Subshells in Madelung (n + l, then n) filling order, enough to hold the
/// ground state of every element up to oganesson.
pub const AUFBAU_ORDER: [Orbital; 19] = [
    Orbital::new(1, 0),
    Orbital::new(2, 0),
    Orbital::new(2, 1),
    Orbital::new(3, 0),
    Orbital::new(3, 1),
    Orbital::new(4, 0),
    Orbital::new(3, 2),
    Orbital::new(4, 1),
    Orbital::new(5, 0),
    Orbital::new(4, 2),
    Orbital::new(5, 1),
    Orbital::new(6, 0),
    Orbital::new(4, 3),
    Orbital::new(5, 2),
    Orbital::new(6, 1),
    Orbital::new(7, 0),
    Orbital::new(5, 3),
    Orbital::new(6, 2),
    Orbital::new(7, 1),
];

/// Ground-state occupation of every subshell in [`AUFBAU_ORDER`] for an
/// element with `atomic_number` electrons.
pub fn ground_state_occupation(atomic_number: usize) -> [u8; AUFBAU_ORDER.len()] {
    let mut occupation = [0u8; AUFBAU_ORDER.len()];
    let mut remaining = atomic_number;
    for (slot, orbital) in occupation.iter_mut().zip(AUFBAU_ORDER.iter()) {
        if remaining == 0 {
            break;
        }
        let filled = remaining.min(orbital.capacity() as usize);
        *slot = filled as u8;
        remaining -= filled;
    }
    occupation
}

/// Electron-configuration tables for every element up to `max_z`.
///
/// Row `z` of each table describes the element with atomic number `z`; row 0
/// is a dummy element with no electrons. Columns follow [`ElecInfo::orbitals`].
#[derive(Debug, Clone, PartialEq)]
pub struct ElecInfo {
    max_z: usize,
    orbitals: Vec<Orbital>,
    elec_table: Vec<Vec<u8>>,
    valence_table: Vec<Vec<bool>>,
    max_elec_idx: Vec<usize>,
}

impl ElecInfo {
    /// Builds the tables for elements `0..=max_z`.
    ///
    /// When `max_orb` is `None` the orbital set is the shortest Aufbau prefix
    /// holding every electron of element `max_z`; otherwise it runs up to and
    /// including `max_orb`, dropping electrons of heavier subshells.
    pub fn new(max_z: usize, max_orb: Option<Orbital>) -> Result<Self, ElementError> {
        if max_z == 0 || max_z > MAX_ATOMIC_NUMBER {
            return Err(ElementError::MaxAtomicNumber(max_z));
        }

        let n_orb = match max_orb {
            Some(orb) => {
                AUFBAU_ORDER
                    .iter()
                    .position(|&o| o == orb)
                    .ok_or_else(|| ElementError::UnknownOrbital(orb.to_string()))?
                    + 1
            }
            None => {
                let heaviest = ground_state_occupation(max_z);
                heaviest.iter().rposition(|&e| e > 0).map_or(1, |i| i + 1)
            }
        };
        let orbitals = AUFBAU_ORDER[..n_orb].to_vec();

        let mut elec_table = Vec::with_capacity(max_z + 1);
        let mut valence_table = Vec::with_capacity(max_z + 1);
        for z in 0..=max_z {
            let occupation = ground_state_occupation(z);
            let outer_n = AUFBAU_ORDER
                .iter()
                .zip(occupation.iter())
                .filter(|&(_, &e)| e > 0)
                .map(|(o, _)| o.n)
                .max()
                .unwrap_or(0);

            elec_table.push(occupation[..n_orb].to_vec());
            valence_table.push(
                AUFBAU_ORDER[..n_orb]
                    .iter()
                    .zip(occupation.iter())
                    .map(|(o, &e)| e > 0 && (o.n == outer_n || e < o.capacity()))
                    .collect(),
            );
        }

        let max_elec_idx = (0..n_orb)
            .map(|o| {
                elec_table
                    .iter()
                    .map(|row| row[o] as usize)
                    .max()
                    .unwrap_or(0)
                    + 1
            })
            .collect();

        Ok(Self {
            max_z,
            orbitals,
            elec_table,
            valence_table,
            max_elec_idx,
        })
    }

    pub fn max_z(&self) -> usize {
        self.max_z
    }

    pub fn n_orb(&self) -> usize {
        self.orbitals.len()
    }

    pub fn orbitals(&self) -> &[Orbital] {
        &self.orbitals
    }

    /// Number of electrons element `z` holds in each tabulated orbital.
    pub fn electrons(&self, z: usize) -> Option<&[u8]> {
        self.elec_table.get(z).map(Vec::as_slice)
    }

    /// Whether each tabulated orbital of element `z` is a valence orbital.
    pub fn valence(&self, z: usize) -> Option<&[bool]> {
        self.valence_table.get(z).map(Vec::as_slice)
    }

    /// Size of the embedding table required for each orbital (largest
    /// occupation over all tabulated elements, plus one for the empty state).
    pub fn max_elec_idx(&self) -> &[usize] {
        &self.max_elec_idx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orbital_parses_and_displays_labels() {
        let p: Orbital = "2p".parse().unwrap();
        assert_eq!(p, Orbital::new(2, 1));
        assert_eq!(p.to_string(), "2p");
        assert_eq!("3D".parse::<Orbital>().unwrap(), Orbital::new(3, 2));
    }

    #[test]
    fn orbital_rejects_invalid_labels() {
        assert!("".parse::<Orbital>().is_err());
        assert!("2x".parse::<Orbital>().is_err());
        assert!("p".parse::<Orbital>().is_err());
        // 1p does not exist.
        assert!("1p".parse::<Orbital>().is_err());
    }

    #[test]
    fn ground_state_occupation_sums_to_atomic_number() {
        for z in 0..=MAX_ATOMIC_NUMBER {
            let total: usize = ground_state_occupation(z).iter().map(|&e| e as usize).sum();
            assert_eq!(total, z);
        }
    }

    #[test]
    fn ground_state_of_iron_fills_4s_before_3d() {
        let occ = ground_state_occupation(26);
        // 1s2 2s2 2p6 3s2 3p6 4s2 3d6
        assert_eq!(&occ[..7], &[2, 2, 6, 2, 6, 2, 6]);
        assert!(occ[7..].iter().all(|&e| e == 0));
    }

    #[test]
    fn default_orbital_set_covers_heaviest_element() {
        let info = ElecInfo::new(10, None).unwrap();
        assert_eq!(info.orbitals(), &AUFBAU_ORDER[..3]);
        assert_eq!(info.electrons(10).unwrap(), &[2, 2, 6]);
        assert_eq!(info.electrons(0).unwrap(), &[0, 0, 0]);
    }

    #[test]
    fn explicit_max_orb_truncates_orbital_set() {
        let info = ElecInfo::new(18, Some(Orbital::new(2, 1))).unwrap();
        assert_eq!(info.n_orb(), 3);
        assert_eq!(info.electrons(18).unwrap(), &[2, 2, 6]);
    }

    #[test]
    fn max_elec_idx_is_largest_occupation_plus_one() {
        let info = ElecInfo::new(6, None).unwrap();
        // carbon: 1s2 2s2 2p2
        assert_eq!(info.max_elec_idx(), &[3, 3, 3]);
    }

    #[test]
    fn valence_table_marks_outer_shell_and_open_subshells() {
        let info = ElecInfo::new(30, None).unwrap();
        // carbon: 2s and 2p are valence, 1s is core
        assert_eq!(&info.valence(6).unwrap()[..3], &[false, true, true]);
        // iron: 4s and the open 3d shell
        let fe = info.valence(26).unwrap();
        assert!(fe[5] && fe[6]);
        assert!(!fe[4]);
        // zinc: closed 3d is not valence
        let zn = info.valence(30).unwrap();
        assert!(zn[5] && !zn[6]);
        assert!(info.valence(0).unwrap().iter().all(|&v| !v));
    }

    #[test]
    fn new_rejects_out_of_range_max_z() {
        assert_eq!(ElecInfo::new(0, None), Err(ElementError::MaxAtomicNumber(0)));
        assert_eq!(
            ElecInfo::new(MAX_ATOMIC_NUMBER + 1, None),
            Err(ElementError::MaxAtomicNumber(MAX_ATOMIC_NUMBER + 1))
        );
    }
}

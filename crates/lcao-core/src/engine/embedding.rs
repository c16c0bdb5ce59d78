use super::config::ConfigError;
use super::error::EngineError;
use crate::core::elements::ElecInfo;
use crate::core::nn::tensor::concat_gathered;
use crate::core::nn::{Activation, Dense, Embedding, Mlp, OrbitalTensor, WeightInit};
use nalgebra::DMatrix;
use rand::Rng;

/// Half-width of the uniform initialisation of embedding tables, giving
/// unit variance.
const EMBED_BOUND: f64 = 1.732_050_807_568_877_2;

/// Atomic-number embedding: one row per element.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbedZ {
    pub table: Embedding,
}

impl EmbedZ {
    pub fn new<R: Rng + ?Sized>(max_z: usize, dim: usize, rng: &mut R) -> Self {
        Self {
            table: Embedding::uniform(max_z + 1, dim, EMBED_BOUND, rng),
        }
    }

    /// `N × dim` embeddings of the atomic numbers `z`.
    pub fn forward(&self, z: &[usize]) -> DMatrix<f64> {
        self.table.lookup(z)
    }
}

/// Electron-configuration embedding: one table per orbital, indexed by the
/// number of electrons the element holds in that orbital.
///
/// Unless `extend_orb` is set, the "no electrons" row of every table is zero,
/// so empty orbitals contribute exactly nothing downstream.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbedElec {
    pub tables: Vec<Embedding>,
    elec: Vec<Vec<u8>>,
    dim: usize,
}

impl EmbedElec {
    pub fn new<R: Rng + ?Sized>(
        dim: usize,
        elec_info: &ElecInfo,
        extend_orb: bool,
        rng: &mut R,
    ) -> Self {
        let tables = elec_info
            .max_elec_idx()
            .iter()
            .map(|&rows| {
                let table = Embedding::uniform(rows, dim, EMBED_BOUND, rng);
                if extend_orb {
                    table
                } else {
                    table.with_padding_row(0)
                }
            })
            .collect();
        let elec = (0..=elec_info.max_z())
            .map(|z| elec_info.electrons(z).map(<[u8]>::to_vec).unwrap_or_default())
            .collect();
        Self { tables, elec, dim }
    }

    pub fn n_orb(&self) -> usize {
        self.tables.len()
    }

    /// `N × n_orb × dim` embeddings of the atoms `z`.
    pub fn forward(&self, z: &[usize]) -> OrbitalTensor {
        let n_orb = self.n_orb();
        let mut out = DMatrix::zeros(z.len() * n_orb, self.dim);
        for (a, &zi) in z.iter().enumerate() {
            for (o, table) in self.tables.iter().enumerate() {
                let count = self.elec[zi][o] as usize;
                out.row_mut(a * n_orb + o).copy_from(&table.table.row(count));
            }
        }
        OrbitalTensor::from_matrix(n_orb.max(1), out)
    }

    pub fn parameter_count(&self) -> usize {
        self.tables.iter().map(Embedding::parameter_count).sum()
    }
}

/// Initial node embedding: an MLP over the atomic-number embedding,
/// concatenated with the orbital-summed electron embedding when enabled.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbedNode {
    pub f_enc: Mlp,
    use_elec: bool,
}

impl EmbedNode {
    pub fn new<R: Rng + ?Sized>(
        hidden_dim: usize,
        z_dim: usize,
        e_dim: Option<usize>,
        activation: Activation,
        init: WeightInit,
        rng: &mut R,
    ) -> Self {
        let in_dim = z_dim + e_dim.unwrap_or(0);
        Self {
            f_enc: Mlp {
                layers: vec![
                    Dense::new(in_dim, hidden_dim, true, init, rng),
                    Dense::new(hidden_dim, hidden_dim, false, init, rng),
                ],
                activation,
                activate_output: true,
            },
            use_elec: e_dim.is_some(),
        }
    }

    pub fn forward(
        &self,
        z_embed: &DMatrix<f64>,
        e_embed: Option<&OrbitalTensor>,
    ) -> Result<DMatrix<f64>, EngineError> {
        if !self.use_elec {
            return Ok(self.f_enc.forward(z_embed));
        }
        let e_embed = e_embed.ok_or(ConfigError::MissingInput("electron embedding"))?;
        let summed = e_embed.sum_orbitals();
        let n = z_embed.nrows();
        EngineError::check_len("electron embedding rows", n, summed.nrows())?;
        let all: Vec<usize> = (0..n).collect();
        Ok(self
            .f_enc
            .forward(&concat_gathered(z_embed, &all, &summed, &all)))
    }
}

/// Per-edge orbital coefficients
/// `c[e] = f_e(elec[j]) + f_e(elec[j]) ⊙ f_z([z[i] ‖ z[j]])`
/// for the edge `j -> i`.
///
/// `f_e` has no biases, so an all-zero electron embedding of an orbital
/// gives exactly zero coefficients for it whatever the gate.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbedCoeffs {
    pub f_z: Mlp,
    pub f_e: Mlp,
}

impl EmbedCoeffs {
    pub fn new<R: Rng + ?Sized>(
        dim: usize,
        z_dim: usize,
        e_dim: usize,
        activation: Activation,
        init: WeightInit,
        rng: &mut R,
    ) -> Self {
        Self {
            f_z: Mlp::new(&[2 * z_dim, dim, dim], true, activation, true, init, rng),
            f_e: Mlp::new(&[e_dim, dim, dim], false, activation, true, init, rng),
        }
    }

    pub fn forward(
        &self,
        z_embed: &DMatrix<f64>,
        e_embed: &OrbitalTensor,
        idx_i: &[usize],
        idx_j: &[usize],
    ) -> OrbitalTensor {
        let gate = self
            .f_z
            .forward(&concat_gathered(z_embed, idx_i, z_embed, idx_j));
        let mut coeffs = e_embed.map(|m| self.f_e.forward(m)).gather(idx_j);
        coeffs.add_scaled_by_rows(&gate);
        coeffs
    }

    pub fn parameter_count(&self) -> usize {
        self.f_z.parameter_count() + self.f_e.parameter_count()
    }
}

/// 0/1 mask of the valence orbitals of each edge's neighbour atom.
#[derive(Debug, Clone, PartialEq)]
pub struct ValenceMask {
    valence: Vec<Vec<bool>>,
}

impl ValenceMask {
    pub fn new(elec_info: &ElecInfo) -> Self {
        Self {
            valence: (0..=elec_info.max_z())
                .map(|z| elec_info.valence(z).map(<[bool]>::to_vec).unwrap_or_default())
                .collect(),
        }
    }

    /// `E × n_orb` mask taken from the atom `idx_j[e]` of each edge.
    pub fn forward(&self, z: &[usize], idx_j: &[usize]) -> DMatrix<f64> {
        let n_orb = self.valence.first().map_or(0, Vec::len);
        DMatrix::from_fn(idx_j.len(), n_orb, |e, o| {
            if self.valence[z[idx_j[e]]][o] { 1.0 } else { 0.0 }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(17)
    }

    #[test]
    fn embed_elec_zeroes_empty_orbitals() {
        let info = ElecInfo::new(10, None).unwrap();
        let embed = EmbedElec::new(4, &info, false, &mut rng());
        // hydrogen: only 1s is occupied
        let e = embed.forward(&[1]);
        assert_eq!(e.n_orb(), 3);
        assert!(e.block(0).row(0).iter().any(|&v| v != 0.0));
        assert!(e.block(0).rows(1, 2).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn embed_elec_extended_orbitals_are_learnable() {
        let info = ElecInfo::new(10, None).unwrap();
        let embed = EmbedElec::new(4, &info, true, &mut rng());
        let e = embed.forward(&[1]);
        assert!(e.block(0).row(2).iter().any(|&v| v != 0.0));
    }

    #[test]
    fn embed_elec_rows_follow_electron_counts() {
        let info = ElecInfo::new(10, None).unwrap();
        let embed = EmbedElec::new(3, &info, false, &mut rng());
        let e = embed.forward(&[6, 8]);
        // carbon and oxygen share full 1s and 2s shells
        assert_eq!(e.block(0).row(0), e.block(1).row(0));
        assert_eq!(e.block(0).row(1), e.block(1).row(1));
        assert_ne!(e.block(0).row(2), e.block(1).row(2));
    }

    #[test]
    fn coefficients_of_empty_orbitals_are_exactly_zero() {
        let info = ElecInfo::new(10, None).unwrap();
        let mut r = rng();
        let elec = EmbedElec::new(5, &info, false, &mut r);
        let z_embed = EmbedZ::new(10, 5, &mut r);
        let coeffs = EmbedCoeffs::new(6, 5, 5, Activation::Silu, WeightInit::GlorotOrthogonal, &mut r);

        let z = [1, 8];
        let c = coeffs.forward(&z_embed.forward(&z), &elec.forward(&z), &[1, 0], &[0, 1]);
        assert_eq!((c.n_rows(), c.n_orb(), c.dim()), (2, 3, 6));
        // edge 0 has the hydrogen neighbour: 2s and 2p are empty
        assert!(c.block(0).rows(1, 2).iter().all(|&v| v == 0.0));
        assert!(c.block(0).row(0).iter().any(|&v| v != 0.0));
        // edge 1 has the oxygen neighbour: all orbitals occupied
        assert!(c.block(1).row(2).iter().any(|&v| v != 0.0));
    }

    #[test]
    fn embed_node_requires_electrons_when_configured() {
        let mut r = rng();
        let node = EmbedNode::new(4, 3, Some(2), Activation::Silu, WeightInit::GlorotOrthogonal, &mut r);
        let z = DMatrix::zeros(2, 3);
        let err = node.forward(&z, None).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Config {
                source: ConfigError::MissingInput(_)
            }
        ));
        let e = OrbitalTensor::zeros(2, 3, 2);
        assert_eq!(node.forward(&z, Some(&e)).unwrap().shape(), (2, 4));

        let plain = EmbedNode::new(4, 3, None, Activation::Silu, WeightInit::GlorotOrthogonal, &mut r);
        assert_eq!(plain.forward(&z, None).unwrap().shape(), (2, 4));
    }

    #[test]
    fn valence_mask_uses_the_neighbour_atom() {
        let info = ElecInfo::new(10, None).unwrap();
        let mask = ValenceMask::new(&info);
        let z = [1, 6];
        let m = mask.forward(&z, &[1, 0]);
        assert_eq!(m.shape(), (2, 3));
        // carbon neighbour: 2s and 2p
        assert_eq!(m.row(0).iter().copied().collect::<Vec<_>>(), vec![0.0, 1.0, 1.0]);
        // hydrogen neighbour: 1s
        assert_eq!(m.row(1).iter().copied().collect::<Vec<_>>(), vec![1.0, 0.0, 0.0]);
    }
}

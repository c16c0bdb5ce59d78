use super::error::EngineError;
use crate::core::models::graph::Batch;
use crate::core::nn::tensor::{scatter_mean, scatter_sum};
use crate::core::nn::{Activation, Dense, Mlp, WeightInit};
use nalgebra::{DMatrix, DVector};
use rand::Rng;

/// How per-atom contributions are combined into a per-structure value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    /// Extensive properties such as the total energy.
    Sum,
    /// Intensive properties.
    Mean,
}

impl Reduction {
    pub fn from_extensive(is_extensive: bool) -> Self {
        if is_extensive {
            Reduction::Sum
        } else {
            Reduction::Mean
        }
    }

    /// Reduces the rows of `per_atom` into one row per structure of `batch`.
    pub fn apply(self, per_atom: &DMatrix<f64>, batch: &Batch) -> DMatrix<f64> {
        let n_structures = batch.n_structures();
        let assignment: Vec<usize> = (0..per_atom.nrows())
            .map(|a| batch.structure_of(a))
            .collect();
        match self {
            Reduction::Sum => scatter_sum(per_atom, &assignment, n_structures),
            Reduction::Mean => scatter_mean(per_atom, &assignment, n_structures),
        }
    }
}

/// Readout MLP `h -> h -> h/2 -> out` followed by the per-structure
/// reduction.
#[derive(Debug, Clone, PartialEq)]
pub struct LcaoOut {
    pub out_lin: Mlp,
    pub reduction: Reduction,
}

impl LcaoOut {
    pub fn new<R: Rng + ?Sized>(
        hidden_dim: usize,
        out_dim: usize,
        is_extensive: bool,
        activation: Activation,
        init: WeightInit,
        rng: &mut R,
    ) -> Self {
        let half = hidden_dim / 2;
        Self {
            out_lin: Mlp {
                layers: vec![
                    Dense::new(hidden_dim, hidden_dim, true, init, rng),
                    Dense::new(hidden_dim, half, true, init, rng),
                    Dense::new(half, out_dim, true, init, rng),
                ],
                activation,
                activate_output: false,
            },
            reduction: Reduction::from_extensive(is_extensive),
        }
    }

    pub fn parameter_count(&self) -> usize {
        self.out_lin.parameter_count()
    }

    /// `B × out_dim` predictions from the `N × hidden` node embeddings.
    pub fn forward(&self, x: &DMatrix<f64>, batch: &Batch) -> DMatrix<f64> {
        self.reduction.apply(&self.out_lin.forward(x), batch)
    }
}

/// Fixed offsets added to the readout: per-element reference values pooled
/// over each structure, and a dataset mean.
#[derive(Debug, Clone, PartialEq)]
pub struct PostProcess {
    /// `(max_z + 1) × out_dim` reference value per element.
    pub atomref: Option<DMatrix<f64>>,
    pub mean: Option<DVector<f64>>,
    pub reduction: Reduction,
}

impl PostProcess {
    pub fn new(
        atomref: Option<DMatrix<f64>>,
        mean: Option<DVector<f64>>,
        reduction: Reduction,
    ) -> Self {
        Self {
            atomref,
            mean,
            reduction,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.atomref.is_none() && self.mean.is_none()
    }

    /// Adds the offsets to `out` in place.
    pub fn apply(
        &self,
        out: &mut DMatrix<f64>,
        z: &[usize],
        batch: &Batch,
        atom_counts: &[usize],
    ) -> Result<(), EngineError> {
        let reduction = self.reduction;
        if let Some(atomref) = &self.atomref {
            EngineError::check_len("atom reference columns", out.ncols(), atomref.ncols())?;
            if let Some(&bad) = z.iter().find(|&&zi| zi >= atomref.nrows()) {
                return Err(EngineError::ShapeMismatch {
                    what: "atom reference rows",
                    expected: bad + 1,
                    found: atomref.nrows(),
                });
            }
            *out += reduction.apply(&atomref.select_rows(z.iter()), batch);
        }
        if let Some(mean) = &self.mean {
            EngineError::check_len("mean offset", out.ncols(), mean.len())?;
            EngineError::check_len("structures", out.nrows(), atom_counts.len())?;
            for (mut row, &count) in out.row_iter_mut().zip(atom_counts) {
                let scale = match reduction {
                    Reduction::Sum => count as f64,
                    Reduction::Mean => 1.0,
                };
                row += mean.transpose() * scale;
            }
        }
        Ok(())
    }
}

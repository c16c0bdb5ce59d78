use super::config::ConfigError;
use super::error::EngineError;
use crate::core::graph::triplets::Triplets;
use crate::core::nn::activation::sigmoid;
use crate::core::nn::tensor::{
    concat_gathered, contract_orbitals, l2_normalize_rows, scatter_sum,
};
use crate::core::nn::{Activation, Dense, Mlp, OrbitalTensor, WeightInit};
use nalgebra::{DMatrix, DVector};
use rand::Rng;
use tracing::{instrument, trace};

/// Graph-level tensors shared read-only by every interaction layer.
#[derive(Debug, Clone, Copy)]
pub struct InteractionInputs<'a> {
    /// `E × n_orb × coeffs_dim` coefficient embedding.
    pub coeffs: &'a OrbitalTensor,
    /// `E × n_orb` valence mask, required when the valence path is enabled.
    pub valence_mask: Option<&'a DMatrix<f64>>,
    /// Per-edge smooth cutoff weights.
    pub cutoff_weights: Option<&'a DVector<f64>>,
    /// `E × n_orb` radial basis values.
    pub radial: &'a DMatrix<f64>,
    /// `T × n_orb` angular basis values.
    pub angular: &'a DMatrix<f64>,
    pub idx_i: &'a [usize],
    pub idx_j: &'a [usize],
    pub triplets: &'a Triplets,
}

/// One orbital-interaction message-passing layer.
///
/// A layer projects the per-edge coefficients, refines them with three-body
/// messages from the triplets `k -> j -> i`, contracts them against the radial
/// basis into two-body messages and adds the aggregated messages to the node
/// embeddings.
#[derive(Debug, Clone, PartialEq)]
pub struct LcaoInteraction {
    pub node_weight: Dense,
    pub f_coeffs: Mlp,
    pub f_three: Mlp,
    pub basis_weight: Dense,
    pub f_node: Mlp,
    pub out_weight: Dense,
    conv_dim: usize,
    add_valence: bool,
}

impl LcaoInteraction {
    pub fn new<R: Rng + ?Sized>(
        hidden_dim: usize,
        coeffs_dim: usize,
        conv_dim: usize,
        add_valence: bool,
        activation: Activation,
        init: WeightInit,
        rng: &mut R,
    ) -> Self {
        let coeff_out = if add_valence { 2 * conv_dim } else { conv_dim };
        Self {
            node_weight: Dense::new(hidden_dim, 2 * conv_dim, true, init, rng),
            f_coeffs: Mlp::new(
                &[coeffs_dim, conv_dim, coeff_out],
                false,
                activation,
                true,
                init,
                rng,
            ),
            f_three: Mlp::new(
                &[conv_dim, conv_dim, coeff_out],
                true,
                activation,
                true,
                init,
                rng,
            ),
            basis_weight: Dense::new(conv_dim, conv_dim, false, init, rng),
            f_node: Mlp::new(
                &[2 * conv_dim, conv_dim, conv_dim],
                true,
                activation,
                true,
                init,
                rng,
            ),
            out_weight: Dense::new(conv_dim, hidden_dim, false, init, rng),
            conv_dim,
            add_valence,
        }
    }

    pub fn conv_dim(&self) -> usize {
        self.conv_dim
    }

    pub fn add_valence(&self) -> bool {
        self.add_valence
    }

    pub fn parameter_count(&self) -> usize {
        self.node_weight.parameter_count()
            + self.f_coeffs.parameter_count()
            + self.f_three.parameter_count()
            + self.basis_weight.parameter_count()
            + self.f_node.parameter_count()
            + self.out_weight.parameter_count()
    }

    /// Zeroes every weight that feeds the node update, turning the layer
    /// into the identity on node embeddings.
    pub fn zero_message_weights(&mut self) {
        self.basis_weight.zero_weights();
        self.out_weight.zero_weights();
    }

    /// Returns the updated `N × hidden_dim` node embeddings.
    #[instrument(skip_all, name = "lcao_interaction")]
    pub fn forward(
        &self,
        x: &DMatrix<f64>,
        inputs: &InteractionInputs<'_>,
    ) -> Result<DMatrix<f64>, EngineError> {
        let mask = match (self.add_valence, inputs.valence_mask) {
            (true, None) => return Err(ConfigError::MissingInput("valence_mask").into()),
            (true, Some(mask)) => Some(mask),
            (false, _) => None,
        };
        self.check_inputs(x, inputs, mask)?;
        let coeffs = inputs.coeffs.map(|c| self.f_coeffs.forward(c));
        Ok(self.propagate(x, inputs, coeffs, mask))
    }

    /// Stages A to D on coefficients already projected by `f_coeffs`.
    fn propagate(
        &self,
        x: &DMatrix<f64>,
        inputs: &InteractionInputs<'_>,
        mut coeffs: OrbitalTensor,
        mask: Option<&DMatrix<f64>>,
    ) -> DMatrix<f64> {
        let n_atoms = x.nrows();
        let n_edges = inputs.idx_i.len();
        let triplets = inputs.triplets;
        trace!(n_atoms, n_edges, n_triplets = triplets.len(), "interaction inputs");

        // Stage A: node projections
        let projected = self.node_weight.forward(x);
        let x_upd = projected.columns(0, self.conv_dim).into_owned();
        let x_gate = projected
            .columns(self.conv_dim, self.conv_dim)
            .into_owned();

        let mut rb = inputs.radial.clone();
        if let Some(weights) = inputs.cutoff_weights {
            for (mut row, &w) in rb.row_iter_mut().zip(weights.iter()) {
                row.scale_mut(w);
            }
        }

        // Stage B: three-body refinement of the coefficients
        let mut weights = DMatrix::zeros(triplets.len(), rb.ncols());
        for (t, &kj) in triplets.edge_kj.iter().enumerate() {
            let rb_row = rb.row(kj);
            let ang_row = inputs.angular.row(t);
            for o in 0..rb.ncols() {
                weights[(t, o)] = rb_row[o] * ang_row[o];
            }
        }
        let mut three_body =
            self.contract(&weights, &coeffs, Some(triplets.edge_kj.as_slice()), mask);
        l2_normalize_rows(&mut three_body);
        for (mut row, &k) in three_body.row_iter_mut().zip(&triplets.idx_k) {
            for (v, &g) in row.iter_mut().zip(x_gate.row(k).iter()) {
                *v *= sigmoid(g);
            }
        }
        // Edges without triplets still pass through f_three with a zero input.
        let three_body = scatter_sum(&three_body, &triplets.edge_ji, n_edges);
        coeffs.add_scaled_by_rows(&self.f_three.forward(&three_body));

        // Stage C: two-body messages
        let mut messages = self.contract(&rb, &coeffs, None, mask);
        l2_normalize_rows(&mut messages);
        let mut messages = self.basis_weight.forward(&messages);
        let gate = self
            .f_node
            .forward(&concat_gathered(&x_upd, inputs.idx_i, &x_upd, inputs.idx_j));
        messages.component_mul_assign(&gate);
        let delta = scatter_sum(&messages, inputs.idx_i, n_atoms);

        // Stage D: residual update
        x + self.out_weight.forward(&delta)
    }

    /// Contracts the coefficients (split into core and valence halves when the
    /// valence path is on) against `weights`.
    fn contract(
        &self,
        weights: &DMatrix<f64>,
        coeffs: &OrbitalTensor,
        index: Option<&[usize]>,
        mask: Option<&DMatrix<f64>>,
    ) -> DMatrix<f64> {
        match mask {
            Some(mask) => {
                let (core, valence) = coeffs.split_columns(self.conv_dim);
                contract_orbitals(weights, &core, index, None)
                    + contract_orbitals(weights, &valence, index, Some(mask))
            }
            None => contract_orbitals(weights, coeffs, index, None),
        }
    }

    fn check_inputs(
        &self,
        x: &DMatrix<f64>,
        inputs: &InteractionInputs<'_>,
        mask: Option<&DMatrix<f64>>,
    ) -> Result<(), EngineError> {
        let n_edges = inputs.idx_i.len();
        let n_orb = inputs.coeffs.n_orb();
        EngineError::check_len("node embedding width", self.node_weight.in_dim(), x.ncols())?;
        EngineError::check_len("edge sources", n_edges, inputs.idx_j.len())?;
        EngineError::check_len("coefficient rows", n_edges, inputs.coeffs.n_rows())?;
        EngineError::check_len("radial basis rows", n_edges, inputs.radial.nrows())?;
        EngineError::check_len("radial basis channels", n_orb, inputs.radial.ncols())?;
        EngineError::check_len("angular basis rows", inputs.triplets.len(), inputs.angular.nrows())?;
        if !inputs.triplets.is_empty() {
            EngineError::check_len("angular basis channels", n_orb, inputs.angular.ncols())?;
        }
        if let Some(weights) = inputs.cutoff_weights {
            EngineError::check_len("cutoff weights", n_edges, weights.len())?;
        }
        if let Some(mask) = mask {
            EngineError::check_len("valence mask rows", n_edges, mask.nrows())?;
            EngineError::check_len("valence mask columns", n_orb, mask.ncols())?;
        }

        let n_atoms = x.nrows();
        let triplets = inputs.triplets;
        EngineError::check_indices("edge targets", n_atoms, inputs.idx_i)?;
        EngineError::check_indices("edge sources", n_atoms, inputs.idx_j)?;
        EngineError::check_indices("triplet neighbours", n_atoms, &triplets.idx_k)?;
        EngineError::check_indices("triplet edges k->j", n_edges, &triplets.edge_kj)?;
        EngineError::check_indices("triplet edges j->i", n_edges, &triplets.edge_ji)?;
        Ok(())
    }
}

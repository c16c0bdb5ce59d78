use super::activation::Activation;
use super::init::WeightInit;
use nalgebra::{DMatrix, DVector};
use rand::Rng;

/// Fully connected layer `y = x Wᵀ + b` acting on the rows of `x`.
#[derive(Debug, Clone, PartialEq)]
pub struct Dense {
    /// `out_dim × in_dim`.
    pub weight: DMatrix<f64>,
    pub bias: Option<DVector<f64>>,
}

impl Dense {
    /// Creates a layer with weights drawn from `init` and a zero bias.
    pub fn new<R: Rng + ?Sized>(
        in_dim: usize,
        out_dim: usize,
        bias: bool,
        init: WeightInit,
        rng: &mut R,
    ) -> Self {
        Self {
            weight: init.sample(out_dim, in_dim, rng),
            bias: bias.then(|| DVector::zeros(out_dim)),
        }
    }

    pub fn from_parts(weight: DMatrix<f64>, bias: Option<DVector<f64>>) -> Self {
        Self { weight, bias }
    }

    pub fn in_dim(&self) -> usize {
        self.weight.ncols()
    }

    pub fn out_dim(&self) -> usize {
        self.weight.nrows()
    }

    pub fn has_bias(&self) -> bool {
        self.bias.is_some()
    }

    pub fn parameter_count(&self) -> usize {
        self.weight.len() + self.bias.as_ref().map_or(0, |b| b.len())
    }

    pub fn forward(&self, x: &DMatrix<f64>) -> DMatrix<f64> {
        debug_assert_eq!(x.ncols(), self.in_dim());
        let mut y = x * self.weight.transpose();
        if let Some(bias) = &self.bias {
            for (mut column, &b) in y.column_iter_mut().zip(bias.iter()) {
                column.add_scalar_mut(b);
            }
        }
        y
    }

    pub fn zero_weights(&mut self) {
        self.weight.fill(0.0);
        if let Some(bias) = &mut self.bias {
            bias.fill(0.0);
        }
    }
}

/// A stack of dense layers with an activation after each of them.
///
/// When `activate_output` is false the last layer stays linear.
#[derive(Debug, Clone, PartialEq)]
pub struct Mlp {
    pub layers: Vec<Dense>,
    pub activation: Activation,
    pub activate_output: bool,
}

impl Mlp {
    /// Builds layers `dims[0] -> dims[1] -> ... -> dims[n]`.
    pub fn new<R: Rng + ?Sized>(
        dims: &[usize],
        bias: bool,
        activation: Activation,
        activate_output: bool,
        init: WeightInit,
        rng: &mut R,
    ) -> Self {
        let layers = dims
            .windows(2)
            .map(|w| Dense::new(w[0], w[1], bias, init, rng))
            .collect();
        Self {
            layers,
            activation,
            activate_output,
        }
    }

    pub fn out_dim(&self) -> usize {
        self.layers.last().map_or(0, Dense::out_dim)
    }

    pub fn forward(&self, x: &DMatrix<f64>) -> DMatrix<f64> {
        let last = self.layers.len().saturating_sub(1);
        let mut h = x.clone();
        for (n, layer) in self.layers.iter().enumerate() {
            h = layer.forward(&h);
            if n < last || self.activate_output {
                self.activation.apply_in_place(&mut h);
            }
        }
        h
    }

    pub fn parameter_count(&self) -> usize {
        self.layers.iter().map(Dense::parameter_count).sum()
    }

    pub fn zero_weights(&mut self) {
        self.layers.iter_mut().for_each(Dense::zero_weights);
    }
}

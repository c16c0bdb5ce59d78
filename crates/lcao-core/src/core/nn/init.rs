use crate::core::utils::selector::{SelectorError, normalize_selector};
use nalgebra::DMatrix;
use rand::Rng;
use serde::Deserialize;
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

/// Weight initialisation scheme of dense layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum WeightInit {
    /// Random orthogonal matrix rescaled to Glorot variance.
    #[default]
    GlorotOrthogonal,
    /// Uniform on `±sqrt(6 / (fan_in + fan_out))`.
    GlorotUniform,
    /// All weights zero.
    Zeros,
}

const EXPECTED: &str = "glorot-orthogonal, glorot-uniform, zeros";

impl WeightInit {
    /// Draws an `out_dim × in_dim` weight matrix.
    pub fn sample<R: Rng + ?Sized>(self, out_dim: usize, in_dim: usize, rng: &mut R) -> DMatrix<f64> {
        if out_dim == 0 || in_dim == 0 {
            return DMatrix::zeros(out_dim, in_dim);
        }
        match self {
            WeightInit::Zeros => DMatrix::zeros(out_dim, in_dim),
            WeightInit::GlorotUniform => {
                let bound = (6.0 / (in_dim + out_dim) as f64).sqrt();
                DMatrix::from_fn(out_dim, in_dim, |_, _| rng.gen_range(-bound..bound))
            }
            WeightInit::GlorotOrthogonal => {
                let mut w = orthogonal(out_dim, in_dim, rng);
                let var = unbiased_variance(&w);
                if var > 0.0 {
                    w *= (2.0 / ((in_dim + out_dim) as f64 * var)).sqrt();
                }
                w
            }
        }
    }
}

/// A random `rows × cols` matrix with orthonormal rows or columns
/// (whichever are fewer), from the QR decomposition of a Gaussian matrix.
pub fn orthogonal<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> DMatrix<f64> {
    let (tall, short) = (rows.max(cols), rows.min(cols));
    let gaussian = DMatrix::from_fn(tall, short, |_, _| standard_normal(rng));
    let qr = gaussian.qr();
    let mut q = qr.q();
    let r = qr.r();
    // Fix the sign ambiguity of the decomposition so that the result is
    // uniformly distributed.
    for c in 0..short {
        if r[(c, c)] < 0.0 {
            q.column_mut(c).neg_mut();
        }
    }
    if rows < cols { q.transpose() } else { q }
}

/// Standard normal sample by the Box-Muller transform.
pub fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u1: f64 = rng.gen_range(f64::MIN_POSITIVE..1.0);
    let u2: f64 = rng.gen_range(0.0..1.0);
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

fn unbiased_variance(m: &DMatrix<f64>) -> f64 {
    let n = m.len();
    if n < 2 {
        return 0.0;
    }
    let mean = m.mean();
    m.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64
}

impl FromStr for WeightInit {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_selector(s).as_str() {
            "glorotorthogonal" => Ok(WeightInit::GlorotOrthogonal),
            "glorotuniform" | "xavieruniform" | "glorot" => Ok(WeightInit::GlorotUniform),
            "zeros" | "zero" => Ok(WeightInit::Zeros),
            _ => Err(SelectorError::new("weight initializer", s, EXPECTED)),
        }
    }
}

impl TryFrom<String> for WeightInit {
    type Error = SelectorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for WeightInit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WeightInit::GlorotOrthogonal => "glorot-orthogonal",
            WeightInit::GlorotUniform => "glorot-uniform",
            WeightInit::Zeros => "zeros",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const EPS: f64 = 1e-9;

    #[test]
    fn orthogonal_matrix_has_orthonormal_columns_when_tall() {
        let mut rng = StdRng::seed_from_u64(7);
        let q = orthogonal(6, 3, &mut rng);
        let gram = q.transpose() * &q;
        assert!((gram - DMatrix::identity(3, 3)).abs().max() < EPS);
    }

    #[test]
    fn orthogonal_matrix_has_orthonormal_rows_when_wide() {
        let mut rng = StdRng::seed_from_u64(7);
        let q = orthogonal(2, 5, &mut rng);
        assert_eq!(q.shape(), (2, 5));
        let gram = &q * q.transpose();
        assert!((gram - DMatrix::identity(2, 2)).abs().max() < EPS);
    }

    #[test]
    fn glorot_orthogonal_rescales_to_glorot_variance() {
        let mut rng = StdRng::seed_from_u64(11);
        let w = WeightInit::GlorotOrthogonal.sample(16, 8, &mut rng);
        assert_eq!(w.shape(), (16, 8));
        let expected = 2.0 / 24.0;
        assert!((unbiased_variance(&w) - expected).abs() < EPS);
    }

    #[test]
    fn sampling_is_deterministic_for_a_seed() {
        let a = WeightInit::GlorotUniform.sample(4, 4, &mut StdRng::seed_from_u64(3));
        let b = WeightInit::GlorotUniform.sample(4, 4, &mut StdRng::seed_from_u64(3));
        assert_eq!(a, b);
        let bound = (6.0f64 / 8.0).sqrt();
        assert!(a.iter().all(|&x| x.abs() <= bound));
    }

    #[test]
    fn zeros_and_empty_shapes_are_zero() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(WeightInit::Zeros.sample(3, 2, &mut rng).iter().all(|&x| x == 0.0));
        assert_eq!(WeightInit::GlorotOrthogonal.sample(0, 4, &mut rng).shape(), (0, 4));
    }

    #[test]
    fn from_str_rejects_unknown_initializer() {
        assert_eq!(
            "Glorot_Orthogonal".parse::<WeightInit>().unwrap(),
            WeightInit::GlorotOrthogonal
        );
        assert!("he_normal".parse::<WeightInit>().is_err());
    }
}

use crate::core::elements::Orbital;
use nalgebra::DMatrix;
use std::f64::consts::PI;
use std::fmt;

/// Angular functions with one channel per orbital.
pub trait AngularBasis: Send + Sync + fmt::Debug {
    fn n_channels(&self) -> usize;

    fn value(&self, theta: f64, channel: usize) -> f64;

    /// `angles.len() × n_channels` matrix of basis values.
    fn compute(&self, angles: &[f64]) -> DMatrix<f64> {
        DMatrix::from_fn(angles.len(), self.n_channels(), |t, k| {
            self.value(angles[t], k)
        })
    }
}

/// Real spherical harmonics with `m = 0`,
/// `Y_l0(θ) = sqrt((2l+1)/4π) P_l(cos θ)`, using the `l` of each orbital.
#[derive(Debug, Clone, PartialEq)]
pub struct SphericalHarmonicsBasis {
    degrees: Vec<u8>,
}

impl SphericalHarmonicsBasis {
    pub fn new(orbitals: &[Orbital]) -> Self {
        Self {
            degrees: orbitals.iter().map(|o| o.l).collect(),
        }
    }
}

impl AngularBasis for SphericalHarmonicsBasis {
    fn n_channels(&self) -> usize {
        self.degrees.len()
    }

    fn value(&self, theta: f64, channel: usize) -> f64 {
        let l = self.degrees[channel] as usize;
        ((2 * l + 1) as f64 / (4.0 * PI)).sqrt() * legendre(l, theta.cos())
    }
}

/// Legendre polynomial `P_l(x)` by Bonnet's recurrence.
pub fn legendre(l: usize, x: f64) -> f64 {
    let mut prev = 1.0;
    if l == 0 {
        return prev;
    }
    let mut curr = x;
    for n in 1..l {
        let nf = n as f64;
        let next = ((2.0 * nf + 1.0) * x * curr - nf * prev) / (nf + 1.0);
        prev = curr;
        curr = next;
    }
    curr
}

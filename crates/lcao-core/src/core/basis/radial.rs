use super::cutoff::{CosineCutoff, CutoffFunction};
use super::{BasisError, require_cutoff};
use crate::core::elements::Orbital;
use crate::core::utils::selector::{SelectorError, normalize_selector};
use nalgebra::DMatrix;
use serde::Deserialize;
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

/// Bohr radius in Angstroms.
pub const BOHR_RADIUS: f64 = 0.529_177_210_9;

const NORMALIZATION_GRID: usize = 2000;

/// Radial functions with one channel per orbital.
pub trait RadialBasis: Send + Sync + fmt::Debug {
    fn n_channels(&self) -> usize;

    /// Value of `channel` at distance `r`. Finite for every `r >= 0`.
    fn value(&self, r: f64, channel: usize) -> f64;

    /// `distances.len() × n_channels` matrix of basis values.
    fn compute(&self, distances: &[f64]) -> DMatrix<f64> {
        DMatrix::from_fn(distances.len(), self.n_channels(), |e, k| {
            self.value(distances[e], k)
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum RadialBasisKind {
    #[default]
    Hydrogen,
    SphericalBessel,
    Gaussian,
}

impl RadialBasisKind {
    pub fn requires_cutoff(self) -> bool {
        !matches!(self, RadialBasisKind::Hydrogen)
    }

    /// Builds the basis for `orbitals`, one channel each.
    pub fn build(
        self,
        orbitals: &[Orbital],
        cutoff: Option<f64>,
    ) -> Result<Box<dyn RadialBasis>, BasisError> {
        Ok(match self {
            RadialBasisKind::Hydrogen => {
                let cutoff = cutoff
                    .map(|c| require_cutoff("hydrogen radial", Some(c)))
                    .transpose()?;
                Box::new(HydrogenRadialBasis::new(orbitals, cutoff))
            }
            RadialBasisKind::SphericalBessel => Box::new(SphericalBesselBasis {
                n_channels: orbitals.len(),
                cutoff: require_cutoff("spherical Bessel radial", cutoff)?,
            }),
            RadialBasisKind::Gaussian => Box::new(GaussianBasis::new(
                orbitals.len(),
                require_cutoff("Gaussian radial", cutoff)?,
            )),
        })
    }
}

impl FromStr for RadialBasisKind {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_selector(s).as_str() {
            "hydrogen" | "hydrogenradial" | "hydrogenradialbasis" => Ok(RadialBasisKind::Hydrogen),
            "sphericalbessel" | "bessel" => Ok(RadialBasisKind::SphericalBessel),
            "gaussian" | "gaussianrbf" => Ok(RadialBasisKind::Gaussian),
            _ => Err(SelectorError::new(
                "radial basis",
                s,
                "hydrogen, spherical-bessel, gaussian",
            )),
        }
    }
}

impl TryFrom<String> for RadialBasisKind {
    type Error = SelectorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for RadialBasisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RadialBasisKind::Hydrogen => "hydrogen",
            RadialBasisKind::SphericalBessel => "spherical-bessel",
            RadialBasisKind::Gaussian => "gaussian",
        })
    }
}

/// Hydrogen-like radial wave functions `R_nl(r)`.
///
/// Without a cutoff the functions are evaluated in physical units with their
/// analytic normalisation. With a cutoff `c`, distances are rescaled so that
/// `c` maps onto `2 n_max² a0` (the extent of the outermost orbital) and each
/// channel is normalised numerically over `[0, c]`.
#[derive(Debug, Clone, PartialEq)]
pub struct HydrogenRadialBasis {
    orbitals: Vec<Orbital>,
    scale: f64,
    norms: Vec<f64>,
}

impl HydrogenRadialBasis {
    pub fn new(orbitals: &[Orbital], cutoff: Option<f64>) -> Self {
        let orbitals = orbitals.to_vec();
        let analytic: Vec<f64> = orbitals.iter().map(|o| analytic_norm(o.n, o.l)).collect();

        let (scale, norms) = match cutoff {
            None => (1.0, analytic),
            Some(c) => {
                let n_max = orbitals.iter().map(|o| o.n).max().unwrap_or(1) as f64;
                let scale = 2.0 * n_max * n_max * BOHR_RADIUS / c;
                let norms = orbitals
                    .iter()
                    .map(|o| {
                        let integral = trapezoid(c, |r| {
                            let v = hydrogen_unnormalized(o.n, o.l, r * scale);
                            v * v * r * r
                        });
                        if integral > 0.0 { 1.0 / integral.sqrt() } else { 0.0 }
                    })
                    .collect();
                (scale, norms)
            }
        };

        Self {
            orbitals,
            scale,
            norms,
        }
    }

    pub fn orbitals(&self) -> &[Orbital] {
        &self.orbitals
    }
}

impl RadialBasis for HydrogenRadialBasis {
    fn n_channels(&self) -> usize {
        self.orbitals.len()
    }

    fn value(&self, r: f64, channel: usize) -> f64 {
        let o = self.orbitals[channel];
        self.norms[channel] * hydrogen_unnormalized(o.n, o.l, r * self.scale)
    }
}

/// `e^(-ρ/2) ρ^l L_(n-l-1)^(2l+1)(ρ)` with `ρ = 2r / (n a0)`.
fn hydrogen_unnormalized(n: u8, l: u8, r: f64) -> f64 {
    let rho = 2.0 * r / (n as f64 * BOHR_RADIUS);
    (-rho / 2.0).exp()
        * rho.powi(l as i32)
        * laguerre((n - l - 1) as usize, (2 * l + 1) as f64, rho)
}

fn analytic_norm(n: u8, l: u8) -> f64 {
    let nf = n as f64;
    let prefactor = (2.0 / (nf * BOHR_RADIUS)).powi(3);
    let ratio = factorial((n - l - 1) as u32) / (2.0 * nf * factorial((n + l) as u32));
    (prefactor * ratio).sqrt()
}

/// Generalised Laguerre polynomial `L_k^α(x)` by upward recurrence.
pub fn laguerre(k: usize, alpha: f64, x: f64) -> f64 {
    let mut prev = 1.0;
    if k == 0 {
        return prev;
    }
    let mut curr = 1.0 + alpha - x;
    for m in 1..k {
        let mf = m as f64;
        let next = ((2.0 * mf + 1.0 + alpha - x) * curr - (mf + alpha) * prev) / (mf + 1.0);
        prev = curr;
        curr = next;
    }
    curr
}

fn factorial(n: u32) -> f64 {
    (1..=n).map(f64::from).product()
}

fn trapezoid(upper: f64, f: impl Fn(f64) -> f64) -> f64 {
    let h = upper / NORMALIZATION_GRID as f64;
    let interior: f64 = (1..NORMALIZATION_GRID).map(|i| f(i as f64 * h)).sum();
    h * (0.5 * f(0.0) + interior + 0.5 * f(upper))
}

/// `sqrt(2/c) sin(kπr/c) / r` for `k = 1..=n`, zero from the cutoff on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphericalBesselBasis {
    pub n_channels: usize,
    pub cutoff: f64,
}

impl RadialBasis for SphericalBesselBasis {
    fn n_channels(&self) -> usize {
        self.n_channels
    }

    fn value(&self, r: f64, channel: usize) -> f64 {
        if r >= self.cutoff {
            return 0.0;
        }
        let norm = (2.0 / self.cutoff).sqrt();
        let freq = (channel + 1) as f64 * PI / self.cutoff;
        if r < 1e-9 {
            norm * freq
        } else {
            norm * (freq * r).sin() / r
        }
    }
}

/// Gaussians `exp(-γ (r - μ_k)²)` with centres `k c / n` for `k < n`, damped
/// by a cosine envelope so that every channel vanishes at the cutoff.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianBasis {
    centers: Vec<f64>,
    gamma: f64,
    envelope: CosineCutoff,
}

impl GaussianBasis {
    pub fn new(n_channels: usize, cutoff: f64) -> Self {
        let spacing = cutoff / n_channels.max(1) as f64;
        Self {
            centers: (0..n_channels).map(|k| k as f64 * spacing).collect(),
            gamma: 0.5 / (spacing * spacing),
            envelope: CosineCutoff { cutoff },
        }
    }
}

impl RadialBasis for GaussianBasis {
    fn n_channels(&self) -> usize {
        self.centers.len()
    }

    fn value(&self, r: f64, channel: usize) -> f64 {
        let envelope = self.envelope.value(r);
        if envelope == 0.0 {
            return 0.0;
        }
        let d = r - self.centers[channel];
        envelope * (-self.gamma * d * d).exp()
    }
}

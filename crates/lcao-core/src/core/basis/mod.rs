//! Basis functions evaluated on the graph geometry.
//!
//! Radial functions give one channel per orbital and edge, angular functions
//! one channel per orbital and triplet, and cutoff envelopes one weight per
//! edge. Families are chosen with the closed enums [`RadialBasisKind`] and
//! [`CutoffKind`], whose `build` methods act as factories.

pub mod angular;
pub mod cutoff;
pub mod radial;

pub use angular::{AngularBasis, SphericalHarmonicsBasis};
pub use cutoff::{CutoffFunction, CutoffKind};
pub use radial::{RadialBasis, RadialBasisKind};

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BasisError {
    #[error("The {basis} basis requires a cutoff radius")]
    MissingCutoff { basis: &'static str },
    #[error("Cutoff radius must be positive and finite, got {0}")]
    InvalidCutoff(f64),
}

pub(crate) fn require_cutoff(basis: &'static str, cutoff: Option<f64>) -> Result<f64, BasisError> {
    let c = cutoff.ok_or(BasisError::MissingCutoff { basis })?;
    if c.is_finite() && c > 0.0 {
        Ok(c)
    } else {
        Err(BasisError::InvalidCutoff(c))
    }
}

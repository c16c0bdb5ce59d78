use super::{BasisError, require_cutoff};
use crate::core::utils::selector::{SelectorError, normalize_selector};
use nalgebra::DVector;
use serde::Deserialize;
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

/// Smooth envelope that is 1 at `r = 0` and decays to exactly 0 at the
/// cutoff radius.
pub trait CutoffFunction: Send + Sync + fmt::Debug {
    fn cutoff(&self) -> f64;

    fn value(&self, r: f64) -> f64;

    fn compute(&self, distances: &[f64]) -> DVector<f64> {
        DVector::from_iterator(distances.len(), distances.iter().map(|&r| self.value(r)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum CutoffKind {
    Cosine,
    Polynomial,
}

impl CutoffKind {
    pub fn build(self, cutoff: Option<f64>) -> Result<Box<dyn CutoffFunction>, BasisError> {
        Ok(match self {
            CutoffKind::Cosine => Box::new(CosineCutoff {
                cutoff: require_cutoff("cosine cutoff", cutoff)?,
            }),
            CutoffKind::Polynomial => Box::new(PolynomialCutoff::new(
                require_cutoff("polynomial cutoff", cutoff)?,
                PolynomialCutoff::DEFAULT_EXPONENT,
            )),
        })
    }
}

impl FromStr for CutoffKind {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_selector(s).as_str() {
            "cosine" | "cosinecutoff" => Ok(CutoffKind::Cosine),
            "polynomial" | "polynomialcutoff" | "envelope" => Ok(CutoffKind::Polynomial),
            _ => Err(SelectorError::new("cutoff function", s, "cosine, polynomial")),
        }
    }
}

impl TryFrom<String> for CutoffKind {
    type Error = SelectorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for CutoffKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CutoffKind::Cosine => "cosine",
            CutoffKind::Polynomial => "polynomial",
        })
    }
}

/// `0.5 (cos(π r / c) + 1)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CosineCutoff {
    pub cutoff: f64,
}

impl CutoffFunction for CosineCutoff {
    fn cutoff(&self) -> f64 {
        self.cutoff
    }

    fn value(&self, r: f64) -> f64 {
        if r >= self.cutoff {
            0.0
        } else {
            0.5 * ((PI * r / self.cutoff).cos() + 1.0)
        }
    }
}

/// Polynomial envelope of DimeNet:
/// `1 - (p+1)(p+2)/2 x^p + p(p+2) x^(p+1) - p(p+1)/2 x^(p+2)` with `x = r / c`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolynomialCutoff {
    pub cutoff: f64,
    a: f64,
    b: f64,
    c: f64,
    p: i32,
}

impl PolynomialCutoff {
    pub const DEFAULT_EXPONENT: i32 = 6;

    pub fn new(cutoff: f64, p: i32) -> Self {
        let pf = p as f64;
        Self {
            cutoff,
            a: -(pf + 1.0) * (pf + 2.0) / 2.0,
            b: pf * (pf + 2.0),
            c: -pf * (pf + 1.0) / 2.0,
            p,
        }
    }
}

impl CutoffFunction for PolynomialCutoff {
    fn cutoff(&self) -> f64 {
        self.cutoff
    }

    fn value(&self, r: f64) -> f64 {
        let x = r / self.cutoff;
        if x >= 1.0 {
            return 0.0;
        }
        let xp = x.powi(self.p);
        1.0 + self.a * xp + self.b * xp * x + self.c * xp * x * x
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    fn all_kinds(cutoff: f64) -> Vec<Box<dyn CutoffFunction>> {
        [CutoffKind::Cosine, CutoffKind::Polynomial]
            .into_iter()
            .map(|k| k.build(Some(cutoff)).unwrap())
            .collect()
    }

    #[test]
    fn cutoffs_are_one_at_origin_and_zero_from_cutoff_on() {
        for f in all_kinds(4.0) {
            assert!((f.value(0.0) - 1.0).abs() < EPS, "{f:?}");
            assert_eq!(f.value(4.0), 0.0);
            assert_eq!(f.value(7.5), 0.0);
            assert!(f.value(3.999).abs() < 1e-6);
        }
    }

    #[test]
    fn cutoffs_decrease_monotonically() {
        for f in all_kinds(5.0) {
            let values = f.compute(&(0..=50).map(|n| n as f64 * 0.1).collect::<Vec<_>>());
            for w in values.as_slice().windows(2) {
                assert!(w[1] <= w[0] + EPS, "{f:?} is not monotonic");
                assert!((0.0..=1.0).contains(&w[1]));
            }
        }
    }

    #[test]
    fn build_requires_positive_cutoff() {
        assert_eq!(
            CutoffKind::Cosine.build(None).unwrap_err(),
            BasisError::MissingCutoff { basis: "cosine cutoff" }
        );
        assert_eq!(
            CutoffKind::Polynomial.build(Some(-1.0)).unwrap_err(),
            BasisError::InvalidCutoff(-1.0)
        );
    }

    #[test]
    fn from_str_rejects_unknown_cutoff() {
        assert_eq!("Cosine".parse::<CutoffKind>().unwrap(), CutoffKind::Cosine);
        assert_eq!("polynomial_cutoff".parse::<CutoffKind>().unwrap(), CutoffKind::Polynomial);
        assert!("smoothstep".parse::<CutoffKind>().is_err());
    }
}

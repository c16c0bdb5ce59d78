use crate::core::utils::selector::{SelectorError, normalize_selector};
use nalgebra::DMatrix;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Element-wise non-linearity applied between dense layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum Activation {
    /// `x * sigmoid(x)`.
    #[default]
    Silu,
    Relu,
    Tanh,
    Sigmoid,
    /// `ln(0.5 e^x + 0.5)`, softplus shifted to pass through the origin.
    ShiftedSoftplus,
    Identity,
}

const EXPECTED: &str = "silu, relu, tanh, sigmoid, shifted-softplus, identity";

impl Activation {
    #[inline]
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Activation::Silu => x * sigmoid(x),
            Activation::Relu => x.max(0.0),
            Activation::Tanh => x.tanh(),
            Activation::Sigmoid => sigmoid(x),
            Activation::ShiftedSoftplus => softplus(x) - std::f64::consts::LN_2,
            Activation::Identity => x,
        }
    }

    /// Applies the activation to every entry of `m` in place.
    pub fn apply_in_place(self, m: &mut DMatrix<f64>) {
        if self != Activation::Identity {
            m.apply(|x| *x = self.apply(*x));
        }
    }

    /// Whether `f(0) == 0`, which keeps zero rows zero.
    pub fn preserves_zero(self) -> bool {
        self != Activation::Sigmoid
    }
}

/// Logistic function, evaluated without overflow for large `|x|`.
#[inline]
pub fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

#[inline]
fn softplus(x: f64) -> f64 {
    x.max(0.0) + (-x.abs()).exp().ln_1p()
}

impl FromStr for Activation {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_selector(s).as_str() {
            "silu" | "swish" => Ok(Activation::Silu),
            "relu" => Ok(Activation::Relu),
            "tanh" => Ok(Activation::Tanh),
            "sigmoid" => Ok(Activation::Sigmoid),
            "shiftedsoftplus" | "ssp" => Ok(Activation::ShiftedSoftplus),
            "identity" | "linear" | "none" => Ok(Activation::Identity),
            _ => Err(SelectorError::new("activation", s, EXPECTED)),
        }
    }
}

impl TryFrom<String> for Activation {
    type Error = SelectorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Activation::Silu => "silu",
            Activation::Relu => "relu",
            Activation::Tanh => "tanh",
            Activation::Sigmoid => "sigmoid",
            Activation::ShiftedSoftplus => "shifted-softplus",
            Activation::Identity => "identity",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    #[test]
    fn from_str_accepts_aliases_and_separators() {
        assert_eq!("SiLU".parse::<Activation>().unwrap(), Activation::Silu);
        assert_eq!("swish".parse::<Activation>().unwrap(), Activation::Silu);
        assert_eq!(
            "shifted_softplus".parse::<Activation>().unwrap(),
            Activation::ShiftedSoftplus
        );
        assert_eq!("Identity".parse::<Activation>().unwrap(), Activation::Identity);
    }

    #[test]
    fn from_str_rejects_unknown_activation() {
        let err = "gelu2".parse::<Activation>().unwrap_err();
        assert_eq!(err.kind, "activation");
        assert_eq!(err.value, "gelu2");
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for act in [
            Activation::Silu,
            Activation::Relu,
            Activation::Tanh,
            Activation::Sigmoid,
            Activation::ShiftedSoftplus,
            Activation::Identity,
        ] {
            assert_eq!(act.to_string().parse::<Activation>().unwrap(), act);
        }
    }

    #[test]
    fn zero_preserving_activations_map_zero_to_zero() {
        for act in [
            Activation::Silu,
            Activation::Relu,
            Activation::Tanh,
            Activation::ShiftedSoftplus,
            Activation::Identity,
        ] {
            assert!(act.preserves_zero());
            assert!(act.apply(0.0).abs() < EPS, "{act} should map 0 to 0");
        }
        assert!(!Activation::Sigmoid.preserves_zero());
        assert!((Activation::Sigmoid.apply(0.0) - 0.5).abs() < EPS);
    }

    #[test]
    fn sigmoid_is_stable_for_large_inputs() {
        assert_eq!(sigmoid(1000.0), 1.0);
        assert_eq!(sigmoid(-1000.0), 0.0);
        assert!(Activation::Silu.apply(-1000.0).is_finite());
        assert!((Activation::ShiftedSoftplus.apply(800.0) - (800.0 - std::f64::consts::LN_2)).abs() < 1e-9);
    }

    #[test]
    fn apply_in_place_maps_every_entry() {
        let mut m = DMatrix::from_row_slice(2, 2, &[-1.0, 0.0, 2.0, -3.0]);
        Activation::Relu.apply_in_place(&mut m);
        assert_eq!(m, DMatrix::from_row_slice(2, 2, &[0.0, 0.0, 2.0, 0.0]));
    }
}

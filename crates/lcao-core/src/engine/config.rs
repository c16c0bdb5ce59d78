use crate::core::basis::{CutoffKind, RadialBasisKind};
use crate::core::elements::{MAX_ATOMIC_NUMBER, Orbital};
use crate::core::nn::{Activation, WeightInit};
use crate::core::utils::selector::SelectorError;
use nalgebra::{DMatrix, DVector};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for '{parameter}': {reason}")]
    InvalidValue {
        parameter: &'static str,
        reason: String,
    },
    #[error(transparent)]
    UnknownSelector(#[from] SelectorError),
    #[error("Required input '{0}' was not provided")]
    MissingInput(&'static str),
}

/// Architecture and initialisation of an LCAONet model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub hidden_dim: usize,
    pub coeffs_dim: usize,
    pub conv_dim: usize,
    pub out_dim: usize,
    pub n_interaction: usize,
    /// Radius within which basis functions are normalised and, with a
    /// cutoff network, smoothly switched off.
    pub cutoff: Option<f64>,
    pub rbf_type: RadialBasisKind,
    pub cutoff_net: Option<CutoffKind>,
    pub max_z: usize,
    /// Last orbital (in Aufbau order) to include; `None` covers `max_z`.
    pub max_orb: Option<Orbital>,
    pub elec_to_node: bool,
    pub add_valence: bool,
    pub extend_orb: bool,
    pub is_extensive: bool,
    pub activation: Activation,
    pub weight_init: WeightInit,
    /// `(max_z + 1) × out_dim` per-element reference values.
    pub atomref: Option<DMatrix<f64>>,
    /// `out_dim` offset added to every prediction.
    pub mean: Option<DVector<f64>>,
    /// Seed of the parameter initialisation.
    pub seed: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            hidden_dim: 128,
            coeffs_dim: 128,
            conv_dim: 128,
            out_dim: 1,
            n_interaction: 3,
            cutoff: None,
            rbf_type: RadialBasisKind::Hydrogen,
            cutoff_net: None,
            max_z: 36,
            max_orb: None,
            elec_to_node: true,
            add_valence: false,
            extend_orb: false,
            is_extensive: true,
            activation: Activation::Silu,
            weight_init: WeightInit::GlorotOrthogonal,
            atomref: None,
            mean: None,
            seed: 0,
        }
    }
}

#[derive(Default)]
pub struct ModelConfigBuilder {
    hidden_dim: Option<usize>,
    coeffs_dim: Option<usize>,
    conv_dim: Option<usize>,
    out_dim: Option<usize>,
    n_interaction: Option<usize>,
    cutoff: Option<f64>,
    rbf_type: Option<RadialBasisKind>,
    cutoff_net: Option<CutoffKind>,
    max_z: Option<usize>,
    max_orb: Option<Orbital>,
    elec_to_node: Option<bool>,
    add_valence: Option<bool>,
    extend_orb: Option<bool>,
    is_extensive: Option<bool>,
    activation: Option<Activation>,
    weight_init: Option<WeightInit>,
    atomref: Option<DMatrix<f64>>,
    mean: Option<DVector<f64>>,
    seed: Option<u64>,
}

impl ModelConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hidden_dim(mut self, dim: usize) -> Self {
        self.hidden_dim = Some(dim);
        self
    }
    pub fn coeffs_dim(mut self, dim: usize) -> Self {
        self.coeffs_dim = Some(dim);
        self
    }
    pub fn conv_dim(mut self, dim: usize) -> Self {
        self.conv_dim = Some(dim);
        self
    }
    pub fn out_dim(mut self, dim: usize) -> Self {
        self.out_dim = Some(dim);
        self
    }
    pub fn n_interaction(mut self, n: usize) -> Self {
        self.n_interaction = Some(n);
        self
    }
    pub fn cutoff(mut self, cutoff: f64) -> Self {
        self.cutoff = Some(cutoff);
        self
    }
    pub fn rbf_type(mut self, kind: RadialBasisKind) -> Self {
        self.rbf_type = Some(kind);
        self
    }
    pub fn cutoff_net(mut self, kind: CutoffKind) -> Self {
        self.cutoff_net = Some(kind);
        self
    }
    pub fn max_z(mut self, max_z: usize) -> Self {
        self.max_z = Some(max_z);
        self
    }
    pub fn max_orb(mut self, orbital: Orbital) -> Self {
        self.max_orb = Some(orbital);
        self
    }
    pub fn elec_to_node(mut self, enabled: bool) -> Self {
        self.elec_to_node = Some(enabled);
        self
    }
    pub fn add_valence(mut self, enabled: bool) -> Self {
        self.add_valence = Some(enabled);
        self
    }
    pub fn extend_orb(mut self, enabled: bool) -> Self {
        self.extend_orb = Some(enabled);
        self
    }
    pub fn is_extensive(mut self, extensive: bool) -> Self {
        self.is_extensive = Some(extensive);
        self
    }
    pub fn activation(mut self, activation: Activation) -> Self {
        self.activation = Some(activation);
        self
    }
    pub fn weight_init(mut self, init: WeightInit) -> Self {
        self.weight_init = Some(init);
        self
    }
    pub fn atomref(mut self, atomref: DMatrix<f64>) -> Self {
        self.atomref = Some(atomref);
        self
    }
    pub fn mean(mut self, mean: DVector<f64>) -> Self {
        self.mean = Some(mean);
        self
    }
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Fills unset parameters with their defaults and validates the result.
    pub fn build(self) -> Result<ModelConfig, ConfigError> {
        let d = ModelConfig::default();
        let config = ModelConfig {
            hidden_dim: self.hidden_dim.unwrap_or(d.hidden_dim),
            coeffs_dim: self.coeffs_dim.unwrap_or(d.coeffs_dim),
            conv_dim: self.conv_dim.unwrap_or(d.conv_dim),
            out_dim: self.out_dim.unwrap_or(d.out_dim),
            n_interaction: self.n_interaction.unwrap_or(d.n_interaction),
            cutoff: self.cutoff.or(d.cutoff),
            rbf_type: self.rbf_type.unwrap_or(d.rbf_type),
            cutoff_net: self.cutoff_net.or(d.cutoff_net),
            max_z: self.max_z.unwrap_or(d.max_z),
            max_orb: self.max_orb.or(d.max_orb),
            elec_to_node: self.elec_to_node.unwrap_or(d.elec_to_node),
            add_valence: self.add_valence.unwrap_or(d.add_valence),
            extend_orb: self.extend_orb.unwrap_or(d.extend_orb),
            is_extensive: self.is_extensive.unwrap_or(d.is_extensive),
            activation: self.activation.unwrap_or(d.activation),
            weight_init: self.weight_init.unwrap_or(d.weight_init),
            atomref: self.atomref.or(d.atomref),
            mean: self.mean.or(d.mean),
            seed: self.seed.unwrap_or(d.seed),
        };
        config.validate()?;
        Ok(config)
    }
}

impl ModelConfig {
    /// Checks the dimensions and the consistency of the optional parts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |parameter, reason: String| ConfigError::InvalidValue { parameter, reason };

        for (parameter, value) in [
            ("hidden_dim", self.hidden_dim),
            ("coeffs_dim", self.coeffs_dim),
            ("conv_dim", self.conv_dim),
            ("out_dim", self.out_dim),
        ] {
            if value == 0 {
                return Err(invalid(parameter, "must be positive".to_string()));
            }
        }
        if self.hidden_dim < 2 {
            return Err(invalid(
                "hidden_dim",
                "must be at least 2 for the output head".to_string(),
            ));
        }

        if let Some(c) = self.cutoff {
            if !(c.is_finite() && c > 0.0) {
                return Err(invalid("cutoff", format!("must be positive, got {c}")));
            }
        }
        if self.cutoff.is_none() {
            if let Some(kind) = self.cutoff_net {
                return Err(invalid(
                    "cutoff_net",
                    format!("the {kind} cutoff network requires a cutoff radius"),
                ));
            }
            if self.rbf_type.requires_cutoff() {
                return Err(invalid(
                    "rbf_type",
                    format!("the {} radial basis requires a cutoff radius", self.rbf_type),
                ));
            }
        }

        if self.max_z == 0 || self.max_z > MAX_ATOMIC_NUMBER {
            return Err(invalid(
                "max_z",
                format!("must be within 1..={MAX_ATOMIC_NUMBER}, got {}", self.max_z),
            ));
        }

        if let Some(atomref) = &self.atomref {
            if atomref.shape() != (self.max_z + 1, self.out_dim) {
                return Err(invalid(
                    "atomref",
                    format!(
                        "expected shape ({}, {}), got {:?}",
                        self.max_z + 1,
                        self.out_dim,
                        atomref.shape()
                    ),
                ));
            }
        }
        if let Some(mean) = &self.mean {
            if mean.len() != self.out_dim {
                return Err(invalid(
                    "mean",
                    format!("expected {} values, got {}", self.out_dim, mean.len()),
                ));
            }
        }
        Ok(())
    }
}

/// Settings of the prediction workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionConfig {
    pub model: ModelConfig,
    /// Radius of the neighbour list.
    pub graph_cutoff: f64,
    /// Number of structures collated into one graph.
    pub batch_size: usize,
}

#[derive(Default)]
pub struct PredictionConfigBuilder {
    model: Option<ModelConfig>,
    graph_cutoff: Option<f64>,
    batch_size: Option<usize>,
}

impl PredictionConfigBuilder {
    pub const DEFAULT_BATCH_SIZE: usize = 32;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn model(mut self, model: ModelConfig) -> Self {
        self.model = Some(model);
        self
    }
    pub fn graph_cutoff(mut self, cutoff: f64) -> Self {
        self.graph_cutoff = Some(cutoff);
        self
    }
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = Some(size);
        self
    }

    /// The neighbour-list radius defaults to the model cutoff.
    pub fn build(self) -> Result<PredictionConfig, ConfigError> {
        let model = self.model.ok_or(ConfigError::MissingParameter("model"))?;
        let graph_cutoff = self
            .graph_cutoff
            .or(model.cutoff)
            .ok_or(ConfigError::MissingParameter("graph_cutoff"))?;
        if !(graph_cutoff.is_finite() && graph_cutoff > 0.0) {
            return Err(ConfigError::InvalidValue {
                parameter: "graph_cutoff",
                reason: format!("must be positive, got {graph_cutoff}"),
            });
        }
        let batch_size = self.batch_size.unwrap_or(Self::DEFAULT_BATCH_SIZE);
        if batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                parameter: "batch_size",
                reason: "must be positive".to_string(),
            });
        }
        Ok(PredictionConfig {
            model,
            graph_cutoff,
            batch_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_applies_defaults() {
        let config = ModelConfigBuilder::new().build().unwrap();
        assert_eq!(config, ModelConfig::default());
        assert_eq!(config.hidden_dim, 128);
        assert_eq!(config.n_interaction, 3);
        assert_eq!(config.max_z, 36);
        assert_eq!(config.rbf_type, RadialBasisKind::Hydrogen);
        assert!(config.elec_to_node);
        assert!(!config.add_valence);
    }

    #[test]
    fn builder_overrides_defaults() {
        let config = ModelConfigBuilder::new()
            .hidden_dim(16)
            .cutoff(5.0)
            .cutoff_net(CutoffKind::Polynomial)
            .rbf_type(RadialBasisKind::SphericalBessel)
            .add_valence(true)
            .seed(42)
            .build()
            .unwrap();
        assert_eq!(config.hidden_dim, 16);
        assert_eq!(config.cutoff, Some(5.0));
        assert_eq!(config.cutoff_net, Some(CutoffKind::Polynomial));
        assert!(config.add_valence);
        assert_eq!(config.seed, 42);
    }

    #[test]
    fn cutoff_network_without_cutoff_is_rejected() {
        let err = ModelConfigBuilder::new()
            .cutoff_net(CutoffKind::Cosine)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { parameter: "cutoff_net", .. }));

        let err = ModelConfigBuilder::new()
            .rbf_type(RadialBasisKind::Gaussian)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { parameter: "rbf_type", .. }));
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        let err = ModelConfigBuilder::new().conv_dim(0).build().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { parameter: "conv_dim", .. }));
        let err = ModelConfigBuilder::new().hidden_dim(1).build().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { parameter: "hidden_dim", .. }));
    }

    #[test]
    fn post_processing_shapes_are_checked() {
        let err = ModelConfigBuilder::new()
            .max_z(10)
            .atomref(DMatrix::zeros(10, 1))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { parameter: "atomref", .. }));

        let err = ModelConfigBuilder::new()
            .out_dim(2)
            .mean(DVector::zeros(1))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { parameter: "mean", .. }));

        assert!(
            ModelConfigBuilder::new()
                .max_z(10)
                .atomref(DMatrix::zeros(11, 1))
                .mean(DVector::zeros(1))
                .build()
                .is_ok()
        );
    }

    #[test]
    fn max_z_must_be_a_known_element() {
        assert!(ModelConfigBuilder::new().max_z(0).build().is_err());
        assert!(ModelConfigBuilder::new().max_z(119).build().is_err());
        assert!(ModelConfigBuilder::new().max_z(118).build().is_ok());
    }

    #[test]
    fn unknown_selector_converts_into_config_error() {
        let err: ConfigError = "gelu2".parse::<Activation>().unwrap_err().into();
        assert!(matches!(err, ConfigError::UnknownSelector(_)));
        assert!(err.to_string().contains("gelu2"));
    }

    #[test]
    fn prediction_config_requires_model_and_some_cutoff() {
        assert_eq!(
            PredictionConfigBuilder::new().build().unwrap_err(),
            ConfigError::MissingParameter("model")
        );
        assert_eq!(
            PredictionConfigBuilder::new()
                .model(ModelConfig::default())
                .build()
                .unwrap_err(),
            ConfigError::MissingParameter("graph_cutoff")
        );
    }

    #[test]
    fn prediction_config_falls_back_to_model_cutoff() {
        let model = ModelConfigBuilder::new().cutoff(4.5).build().unwrap();
        let config = PredictionConfigBuilder::new().model(model).build().unwrap();
        assert_eq!(config.graph_cutoff, 4.5);
        assert_eq!(config.batch_size, PredictionConfigBuilder::DEFAULT_BATCH_SIZE);

        let err = PredictionConfigBuilder::new()
            .model(ModelConfig::default())
            .graph_cutoff(3.0)
            .batch_size(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { parameter: "batch_size", .. }));
    }
}

use crate::cli::PredictArgs;
use crate::error::{CliError, Result};
use lcaonet::core::basis::{CutoffKind, RadialBasisKind};
use lcaonet::core::elements::Orbital;
use lcaonet::core::io::reference::ReferenceTable;
use lcaonet::core::nn::{Activation, WeightInit};
use lcaonet::engine::config::{
    ModelConfig, ModelConfigBuilder, PredictionConfig, PredictionConfigBuilder,
};
use nalgebra::DVector;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

const SECTIONS: [&str; 2] = ["model", "prediction"];

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialModelConfig {
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
    atomref: Option<PathBuf>,
    mean: Option<Vec<f64>>,
    seed: Option<u64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialPredictionSection {
    graph_cutoff: Option<f64>,
    batch_size: Option<usize>,
}

/// The TOML configuration as written by the user, before defaults and
/// command-line overrides are applied.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialConfig {
    model: Option<PartialModelConfig>,
    prediction: Option<PartialPredictionSection>,
}

impl PartialConfig {
    /// Reads the optional config file and applies `-S key=value` overrides on
    /// top of it.
    pub fn load(path: Option<&Path>, set_values: &[String]) -> Result<Self> {
        let mut table = match path {
            Some(path) => Self::read_table(path)?,
            None => toml::Table::new(),
        };
        Self::apply_set_values(&mut table, set_values)?;
        toml::Value::Table(table)
            .try_into()
            .map_err(|e| CliError::Config(format!("Invalid configuration: {}", e)))
    }

    fn read_table(path: &Path) -> Result<toml::Table> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::file_parsing(path, e))
    }

    fn apply_set_values(table: &mut toml::Table, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let (key, value_str) = kv_pair.split_once('=').ok_or_else(|| {
                CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                ))
            })?;
            let (section, field) = key
                .trim()
                .split_once('.')
                .filter(|(section, field)| SECTIONS.contains(section) && !field.is_empty())
                .ok_or_else(|| {
                    CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'. Expected model.<key> or prediction.<key>.",
                        key
                    ))
                })?;

            let section_table = table
                .entry(section)
                .or_insert(toml::Value::Table(toml::Table::new()))
                .as_table_mut()
                .ok_or_else(|| CliError::Config(format!("'{}' must be a table", section)))?;
            section_table.insert(field.to_string(), parse_value(value_str.trim()));
        }
        Ok(())
    }

    /// Resolves the final prediction settings. Command-line flags win over
    /// `-S` overrides, which win over the file, which wins over defaults.
    pub fn merge_with_cli(self, args: &PredictArgs) -> Result<PredictionConfig> {
        let partial = self.model.unwrap_or_default();
        let prediction = self.prediction.unwrap_or_default();

        let mut builder = ModelConfigBuilder::new();
        if let Some(v) = partial.hidden_dim {
            builder = builder.hidden_dim(v);
        }
        if let Some(v) = partial.coeffs_dim {
            builder = builder.coeffs_dim(v);
        }
        if let Some(v) = partial.conv_dim {
            builder = builder.conv_dim(v);
        }
        if let Some(v) = partial.out_dim {
            builder = builder.out_dim(v);
        }
        if let Some(v) = partial.n_interaction {
            builder = builder.n_interaction(v);
        }
        if let Some(v) = args.cutoff.or(partial.cutoff) {
            builder = builder.cutoff(v);
        }
        if let Some(v) = partial.rbf_type {
            builder = builder.rbf_type(v);
        }
        if let Some(v) = partial.cutoff_net {
            builder = builder.cutoff_net(v);
        }
        if let Some(v) = partial.max_z {
            builder = builder.max_z(v);
        }
        if let Some(v) = partial.max_orb {
            builder = builder.max_orb(v);
        }
        if let Some(v) = partial.elec_to_node {
            builder = builder.elec_to_node(v);
        }
        if let Some(v) = partial.add_valence {
            builder = builder.add_valence(v);
        }
        if let Some(v) = partial.extend_orb {
            builder = builder.extend_orb(v);
        }
        if let Some(v) = partial.is_extensive {
            builder = builder.is_extensive(v);
        }
        if let Some(v) = partial.activation {
            builder = builder.activation(v);
        }
        if let Some(v) = partial.weight_init {
            builder = builder.weight_init(v);
        }
        if let Some(v) = partial.mean {
            builder = builder.mean(DVector::from_vec(v));
        }
        if let Some(v) = args.seed.or(partial.seed) {
            builder = builder.seed(v);
        }

        let max_z = partial.max_z.unwrap_or(ModelConfig::default().max_z);
        if let Some(path) = args.atomref.as_ref().or(partial.atomref.as_ref()) {
            debug!("Loading atom reference values from {:?}", path);
            let table = ReferenceTable::load(path, max_z)
                .map_err(|e| CliError::file_parsing(path, e))?;
            builder = builder.atomref(table.values);
        }

        let model = builder
            .build()
            .map_err(|e| CliError::Config(e.to_string()))?;

        let mut prediction_builder = PredictionConfigBuilder::new().model(model);
        if let Some(v) = prediction.graph_cutoff {
            prediction_builder = prediction_builder.graph_cutoff(v);
        }
        if let Some(v) = args.batch_size.or(prediction.batch_size) {
            prediction_builder = prediction_builder.batch_size(v);
        }
        prediction_builder
            .build()
            .map_err(|e| CliError::Config(e.to_string()))
    }
}

/// Parses a `-S` value as a TOML value, falling back to a plain string so
/// that `model.activation=silu` needs no quoting.
fn parse_value(raw: &str) -> toml::Value {
    toml::from_str::<toml::Table>(&format!("value = {}", raw))
        .ok()
        .and_then(|mut t| t.remove("value"))
        .unwrap_or_else(|| toml::Value::String(raw.to_string()))
}

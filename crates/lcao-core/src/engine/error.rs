use thiserror::Error;

use super::config::ConfigError;
use crate::core::basis::BasisError;
use crate::core::elements::ElementError;
use crate::core::models::graph::GraphError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Invalid input graph: {source}")]
    Graph {
        #[from]
        source: GraphError,
    },

    #[error("Electron configuration table error: {source}")]
    Element {
        #[from]
        source: ElementError,
    },

    #[error("Basis construction failed: {source}")]
    Basis {
        #[from]
        source: BasisError,
    },

    #[error("Shape mismatch for {what}: expected {expected}, found {found}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Index {index} in {what} is out of range for {bound} entries")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        bound: usize,
    },
}

impl EngineError {
    pub(crate) fn check_len(what: &'static str, expected: usize, found: usize) -> Result<(), Self> {
        if expected == found {
            Ok(())
        } else {
            Err(EngineError::ShapeMismatch {
                what,
                expected,
                found,
            })
        }
    }

    pub(crate) fn check_indices(
        what: &'static str,
        bound: usize,
        indices: &[usize],
    ) -> Result<(), Self> {
        match indices.iter().find(|&&index| index >= bound) {
            Some(&index) => Err(EngineError::IndexOutOfRange { what, index, bound }),
            None => Ok(()),
        }
    }
}

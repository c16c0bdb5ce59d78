//! # Core Module
//!
//! Stateless data and math shared by the engine.
//!
//! - **Data models** ([`models`]) - atoms, structures, and the validated atom graph
//! - **Periodic table** ([`elements`]) - element symbols, electron configurations, valence orbitals
//! - **Graph construction** ([`graph`]) - radius neighbour lists and triplet enumeration
//! - **Basis functions** ([`basis`]) - radial, angular and cutoff functions
//! - **Network primitives** ([`nn`]) - dense layers, activations, embeddings, tensor helpers
//! - **File I/O** ([`io`]) - extended XYZ and reference-value tables
//! - **Utilities** ([`utils`]) - edge geometry and selector parsing
//!
//! Nothing in this module holds learned state; parameters live in the
//! [`crate::engine`] layers.

pub mod basis;
pub mod elements;
pub mod graph;
pub mod io;
pub mod models;
pub mod nn;
pub mod utils;

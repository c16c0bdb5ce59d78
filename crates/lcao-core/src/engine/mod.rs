//! # Engine Module
//!
//! The LCAONet model: configuration, embeddings, the stacked orbital
//! interaction layers and the readout.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Model and prediction settings with validating builders
//! - **Embeddings** ([`embedding`]) - Atomic-number, electron-configuration, node and
//!   per-edge orbital coefficient embeddings, plus the valence mask
//! - **Interaction** ([`interaction`]) - One message-passing layer with three-body
//!   coefficient refinement and two-body orbital contraction
//! - **Output** ([`output`]) - Readout MLP, per-structure reduction and fixed offsets
//! - **Model** ([`model`]) - Graph preparation and the full forward pass
//! - **Progress** ([`progress`]) - Callback-based progress reporting
//! - **Error Handling** ([`error`]) - Engine-level error type
//!
//! The forward pass is pure and deterministic. Graph geometry, triplets and
//! basis values are computed once per graph ([`model::PreparedGraph`]) and
//! shared by every interaction layer.

pub mod config;
pub mod embedding;
pub mod error;
pub mod interaction;
pub mod model;
pub mod output;
pub mod progress;

//! # Workflows Module
//!
//! Top-level entry points of the library. Each workflow takes parsed
//! structures and a validated configuration, reports progress through a
//! [`ProgressReporter`](crate::engine::progress::ProgressReporter) where it
//! runs long, and returns plain result records.
//!
//! - **Prediction** ([`predict`]) - Builds the model, collates structures
//!   into batched graphs and predicts one property row per structure.
//! - **Inspection** ([`inspect`]) - Neighbour-list and triplet statistics per
//!   structure, without a model.

pub mod inspect;
pub mod predict;

//! # LCAONet Core Library
//!
//! A forward-only implementation of LCAONet, a message-passing network that
//! predicts properties of molecules and crystals from their atoms and
//! geometry, with interactions modelled on the linear combination of atomic
//! orbitals.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture.
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Structure`, `AtomGraph`),
//!   periodic-table data, triplet enumeration, basis functions, network primitives and I/O.
//!
//! - **[`engine`]: The Model.** The parameterised layers (embeddings, interaction layers,
//!   output head), their configuration, and the full forward pass in `LcaoNet`.
//!
//! - **[`workflows`]: The Public API.** End-to-end procedures that take structures and a
//!   configuration and return predictions, reporting progress along the way.

pub mod core;
pub mod engine;
pub mod workflows;

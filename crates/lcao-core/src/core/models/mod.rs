//! # Core Models Module
//!
//! Plain data describing what the model consumes:
//!
//! - [`atom`] - an element and its position
//! - [`structure`] - a molecule or a crystal with its periodic [`structure::Cell`]
//! - [`graph`] - the validated atom graph with explicit [`graph::Batch`] and
//!   [`graph::Periodicity`] modes
//!
//! Structures are turned into graphs by [`crate::core::graph::neighbors`], or
//! graphs can be assembled directly with [`graph::AtomGraph::new`].

pub mod atom;
pub mod graph;
pub mod structure;

//! Structure file formats and auxiliary data files.
//!
//! Structure formats implement [`traits::StructureFile`]; extended XYZ is the
//! supported format. [`reference`] loads per-element reference values used
//! in post-processing.

pub mod reference;
pub mod traits;
pub mod xyz;

pub mod geometry;
pub mod selector;

//! Graph construction: radius neighbour lists for molecules and crystals,
//! and the expansion of a directed edge list into three-body terms.

pub mod neighbors;
pub mod triplets;

use crate::core::graph::neighbors::collate;
use crate::core::graph::triplets::{IncidenceIndex, Triplets};
use crate::core::models::structure::Structure;
use crate::core::utils::geometry::edge_geometry;
use crate::engine::error::EngineError;
use tracing::{info, instrument};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Size and geometry statistics of the graph built for one structure.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphSummary {
    pub index: usize,
    pub n_atoms: usize,
    pub n_edges: usize,
    pub n_triplets: usize,
    pub periodic: bool,
    pub max_in_degree: usize,
    pub isolated_atoms: usize,
    /// Shortest edge length, `None` without edges.
    pub min_distance: Option<f64>,
}

/// Builds the radius graph of each structure and summarises it.
#[instrument(skip_all, name = "inspect_workflow")]
pub fn run(structures: &[Structure], cutoff: f64) -> Result<Vec<GraphSummary>, EngineError> {
    #[cfg(feature = "parallel")]
    let iter = structures.par_iter();
    #[cfg(not(feature = "parallel"))]
    let iter = structures.iter();

    let summaries: Vec<GraphSummary> = iter
        .enumerate()
        .map(|(index, structure)| summarize(index, structure, cutoff))
        .collect::<Result<_, _>>()?;

    info!("Inspected {} structure(s).", summaries.len());
    Ok(summaries)
}

fn summarize(index: usize, structure: &Structure, cutoff: f64) -> Result<GraphSummary, EngineError> {
    let graph = collate(std::slice::from_ref(structure), cutoff)?;
    let incidence = IncidenceIndex::new(graph.n_atoms(), graph.edges());
    let triplets = Triplets::from_graph(&graph);
    let geometry = edge_geometry(&graph);

    let degrees: Vec<usize> = (0..graph.n_atoms())
        .map(|n| incidence.in_degree(n))
        .collect();

    Ok(GraphSummary {
        index,
        n_atoms: graph.n_atoms(),
        n_edges: graph.n_edges(),
        n_triplets: triplets.len(),
        periodic: structure.periodic_cell().is_some(),
        max_in_degree: degrees.iter().copied().max().unwrap_or(0),
        isolated_atoms: degrees.iter().filter(|&&d| d == 0).count(),
        min_distance: geometry.distances.iter().copied().reduce(f64::min),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::structure::Cell;
    use nalgebra::{Matrix3, Point3};

    #[test]
    fn summary_of_a_bent_molecule_and_a_lone_atom() {
        let water = Structure::from_symbols(
            &["O", "H", "H", "Ar"],
            &[
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(0.96, 0.0, 0.0),
                Point3::new(-0.24, 0.93, 0.0),
                Point3::new(20.0, 0.0, 0.0),
            ],
            None,
        )
        .unwrap();
        let summary = run(&[water], 1.2).unwrap().remove(0);
        // only the two O-H bonds are within range
        assert_eq!(summary.n_edges, 4);
        assert_eq!(summary.n_triplets, 2);
        assert_eq!(summary.max_in_degree, 2);
        assert_eq!(summary.isolated_atoms, 1);
        assert!(!summary.periodic);
        assert!((summary.min_distance.unwrap() - 0.96).abs() < 1e-2);
    }

    #[test]
    fn periodic_single_atom_sees_its_images() {
        let cell = Cell::periodic(Matrix3::identity() * 2.0);
        let crystal = Structure::from_symbols(&["Po"], &[Point3::origin()], Some(cell)).unwrap();
        let summary = run(&[crystal], 2.5).unwrap().remove(0);
        assert!(summary.periodic);
        // six face neighbours at 2.0 Å
        assert_eq!(summary.n_edges, 6);
        assert_eq!(summary.isolated_atoms, 0);
        assert!((summary.min_distance.unwrap() - 2.0).abs() < 1e-12);
    }
}

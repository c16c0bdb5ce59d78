use crate::core::graph::neighbors::collate;
use crate::core::models::structure::Structure;
use crate::engine::config::PredictionConfig;
use crate::engine::error::EngineError;
use crate::engine::model::{LcaoNet, PreparedGraph};
use crate::engine::progress::{Progress, ProgressReporter};
use tracing::{debug, info, instrument};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Predicted properties of one input structure.
#[derive(Debug, Clone, PartialEq)]
pub struct StructurePrediction {
    /// Position of the structure in the input.
    pub index: usize,
    pub n_atoms: usize,
    pub n_edges: usize,
    pub n_triplets: usize,
    pub values: Vec<f64>,
}

/// Builds the model described by `config` and predicts every structure.
#[instrument(skip_all, name = "prediction_workflow")]
pub fn run(
    structures: &[Structure],
    config: &PredictionConfig,
    reporter: &ProgressReporter,
) -> Result<Vec<StructurePrediction>, EngineError> {
    reporter.report(Progress::PhaseStart {
        name: "Model Initialisation",
    });
    let model = LcaoNet::new(config.model.clone())?;
    reporter.report(Progress::PhaseFinish);

    predict_with(
        &model,
        structures,
        config.graph_cutoff,
        config.batch_size,
        reporter,
    )
}

/// Predicts `structures` with an existing model, collating `batch_size`
/// structures into each graph.
///
/// Batches run in parallel; the output keeps the input order.
#[instrument(skip_all, name = "predict_batches")]
pub fn predict_with(
    model: &LcaoNet,
    structures: &[Structure],
    graph_cutoff: f64,
    batch_size: usize,
    reporter: &ProgressReporter,
) -> Result<Vec<StructurePrediction>, EngineError> {
    info!(
        "Predicting {} structure(s) in batches of {}.",
        structures.len(),
        batch_size
    );
    reporter.report(Progress::PhaseStart { name: "Prediction" });
    reporter.report(Progress::TaskStart {
        total_steps: structures.len() as u64,
    });

    let batch_size = batch_size.max(1);
    let run_chunk = |(n, chunk): (usize, &[Structure])| {
        let predictions = predict_chunk(model, chunk, n * batch_size, graph_cutoff)?;
        reporter.advance(chunk.len() as u64);
        Ok::<_, EngineError>(predictions)
    };

    #[cfg(feature = "parallel")]
    let batches: Vec<Vec<StructurePrediction>> = structures
        .par_chunks(batch_size)
        .enumerate()
        .map(run_chunk)
        .collect::<Result<_, _>>()?;
    #[cfg(not(feature = "parallel"))]
    let batches: Vec<Vec<StructurePrediction>> = structures
        .chunks(batch_size)
        .enumerate()
        .map(run_chunk)
        .collect::<Result<_, _>>()?;

    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);

    let predictions: Vec<StructurePrediction> = batches.into_iter().flatten().collect();
    info!("Prediction complete for {} structure(s).", predictions.len());
    Ok(predictions)
}

fn predict_chunk(
    model: &LcaoNet,
    chunk: &[Structure],
    first_index: usize,
    graph_cutoff: f64,
) -> Result<Vec<StructurePrediction>, EngineError> {
    let graph = collate(chunk, graph_cutoff)?;
    let prepared = model.prepare(&graph)?;
    let out = model.forward_prepared(&prepared)?;
    debug!(
        first_index,
        n_structures = chunk.len(),
        n_triplets = prepared.triplets.len(),
        "Predicted batch."
    );

    let (edge_counts, triplet_counts) = per_structure_counts(&prepared);
    Ok(out
        .row_iter()
        .enumerate()
        .map(|(b, row)| StructurePrediction {
            index: first_index + b,
            n_atoms: prepared.atom_counts[b],
            n_edges: edge_counts[b],
            n_triplets: triplet_counts[b],
            values: row.iter().copied().collect(),
        })
        .collect())
}

/// Edges and triplets of each structure, attributed through the centre atom.
fn per_structure_counts(prepared: &PreparedGraph) -> (Vec<usize>, Vec<usize>) {
    let n = prepared.n_structures();
    let mut edges = vec![0usize; n];
    let mut triplets = vec![0usize; n];
    for &i in &prepared.idx_i {
        edges[prepared.batch.structure_of(i)] += 1;
    }
    for &i in &prepared.triplets.idx_i {
        triplets[prepared.batch.structure_of(i)] += 1;
    }
    (edges, triplets)
}

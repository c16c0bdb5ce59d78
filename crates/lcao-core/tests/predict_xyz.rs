use lcaonet::core::io::traits::StructureFile;
use lcaonet::core::io::xyz::XyzFile;
use lcaonet::core::models::structure::Structure;
use lcaonet::engine::config::{ModelConfigBuilder, PredictionConfig, PredictionConfigBuilder};
use lcaonet::engine::progress::ProgressReporter;
use lcaonet::workflows::predict;
use nalgebra::Vector3;
use std::io::Write;
use tempfile::NamedTempFile;

const FRAMES: &str = "\
3
water
O 0.000 0.000 0.117
H 0.000 0.757 -0.467
H 0.000 -0.757 -0.467
2
Lattice=\"3.6 0.0 0.0 0.0 3.6 0.0 0.0 0.0 3.6\" pbc=\"T T T\"
Na 0.0 0.0 0.0
Cl 1.8 1.8 1.8
1
lone
Ar 0.0 0.0 0.0
";

fn structures() -> Vec<Structure> {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(FRAMES.as_bytes()).unwrap();
    XyzFile::read_from_path(file.path()).unwrap()
}

fn config(batch_size: usize, add_valence: bool) -> PredictionConfig {
    let model = ModelConfigBuilder::new()
        .hidden_dim(16)
        .coeffs_dim(8)
        .conv_dim(8)
        .n_interaction(2)
        .max_z(18)
        .cutoff(4.0)
        .add_valence(add_valence)
        .seed(42)
        .build()
        .unwrap();
    PredictionConfigBuilder::new()
        .model(model)
        .batch_size(batch_size)
        .build()
        .unwrap()
}

#[test]
fn xyz_frames_predict_end_to_end() {
    let structures = structures();
    assert_eq!(structures.len(), 3);
    assert!(structures[1].periodic_cell().is_some());

    let predictions = predict::run(&structures, &config(4, true), &ProgressReporter::new()).unwrap();
    assert_eq!(predictions.len(), 3);
    assert!(predictions.iter().all(|p| p.values.iter().all(|v| v.is_finite())));
    // the lone argon atom has no neighbours
    assert_eq!(predictions[2].n_edges, 0);
    assert_eq!(predictions[2].n_triplets, 0);
    // NaCl in a periodic cell has neighbours through its images
    assert!(predictions[1].n_edges > 0);
}

#[test]
fn batched_prediction_equals_per_structure_prediction() {
    let structures = structures();
    let batched = predict::run(&structures, &config(3, false), &ProgressReporter::new()).unwrap();
    for (n, structure) in structures.iter().enumerate() {
        let single = predict::run(
            std::slice::from_ref(structure),
            &config(1, false),
            &ProgressReporter::new(),
        )
        .unwrap();
        assert!((single[0].values[0] - batched[n].values[0]).abs() < 1e-9);
        assert_eq!(single[0].n_edges, batched[n].n_edges);
    }
}

#[test]
fn rigid_translation_does_not_change_predictions() {
    let structures = structures();
    let offset = Vector3::new(1.5, -7.25, 3.0);
    let moved: Vec<Structure> = structures.iter().map(|s| s.translated(&offset)).collect();

    let cfg = config(8, false);
    let a = predict::run(&structures, &cfg, &ProgressReporter::new()).unwrap();
    let b = predict::run(&moved, &cfg, &ProgressReporter::new()).unwrap();
    for (x, y) in a.iter().zip(&b) {
        assert_eq!(x.n_edges, y.n_edges);
        assert!((x.values[0] - y.values[0]).abs() < 1e-9);
    }
}

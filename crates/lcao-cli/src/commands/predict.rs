use super::{csv_writer, read_structures};
use crate::cli::PredictArgs;
use crate::config::PartialConfig;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use lcaonet::engine::progress::ProgressReporter;
use lcaonet::workflows::predict::{self, StructurePrediction};
use std::io::Write;
use tracing::{info, warn};

pub fn run(args: PredictArgs, show_progress: bool) -> Result<()> {
    let partial_config = PartialConfig::load(args.config.as_deref(), &args.set_values)?;
    info!("Merging configuration from file and CLI arguments...");
    let config = partial_config.merge_with_cli(&args)?;

    let structures = read_structures(&args.input)?;
    if structures.is_empty() {
        warn!("Input file contains no structures.");
    }

    let progress_handler = if show_progress {
        CliProgressHandler::new()
    } else {
        CliProgressHandler::hidden()
    };
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    info!("Invoking the core prediction workflow...");
    let predictions = predict::run(&structures, &config, &reporter)?;

    let mut writer = csv_writer(args.output.as_deref())?;
    write_predictions(&mut writer, &predictions, config.model.out_dim)?;
    writer.flush()?;

    if let Some(path) = &args.output {
        eprintln!(
            "✓ Predictions for {} structure(s) written to: {}",
            predictions.len(),
            path.display()
        );
    }
    Ok(())
}

fn write_predictions<W: Write>(
    writer: &mut csv::Writer<W>,
    predictions: &[StructurePrediction],
    out_dim: usize,
) -> Result<()> {
    let mut header = vec![
        "index".to_string(),
        "n_atoms".to_string(),
        "n_edges".to_string(),
        "n_triplets".to_string(),
    ];
    header.extend((0..out_dim).map(|k| format!("value_{}", k)));
    writer.write_record(&header)?;

    for p in predictions {
        let mut record = vec![
            p.index.to_string(),
            p.n_atoms.to_string(),
            p.n_edges.to_string(),
            p.n_triplets.to_string(),
        ];
        record.extend(p.values.iter().map(|v| v.to_string()));
        writer.write_record(&record)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use std::fs;

    #[test]
    fn predictions_are_written_as_csv() {
        let predictions = vec![
            StructurePrediction {
                index: 0,
                n_atoms: 3,
                n_edges: 6,
                n_triplets: 6,
                values: vec![-1.25, 0.5],
            },
            StructurePrediction {
                index: 1,
                n_atoms: 1,
                n_edges: 0,
                n_triplets: 0,
                values: vec![2.0, 0.0],
            },
        ];
        let mut writer = csv::Writer::from_writer(Vec::new());
        write_predictions(&mut writer, &predictions, 2).unwrap();
        let text = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "index,n_atoms,n_edges,n_triplets,value_0,value_1");
        assert_eq!(lines[1], "0,3,6,6,-1.25,0.5");
        assert_eq!(lines[2], "1,1,0,0,2,0");
    }

    #[test]
    fn run_predicts_every_frame_of_an_xyz_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.xyz");
        let output = dir.path().join("out.csv");
        fs::write(
            &input,
            "2\nCO\nC 0 0 0\nO 1.13 0 0\n1\nneon\nNe 0 0 0\n",
        )
        .unwrap();

        let cli = Cli::parse_from([
            "lcaonet",
            "predict",
            "-i",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
            "--cutoff",
            "4.0",
            "-S",
            "model.hidden-dim=8",
            "-S",
            "model.coeffs-dim=4",
            "-S",
            "model.conv-dim=4",
            "-S",
            "model.max-z=10",
        ]);
        let Commands::Predict(args) = cli.command else {
            panic!("Expected 'predict' subcommand");
        };
        run(args, false).unwrap();

        let mut reader = csv::Reader::from_path(&output).unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][1], "2");
        assert_eq!(&rows[1][2], "0");
        assert!(rows[0][4].parse::<f64>().unwrap().is_finite());
    }
}

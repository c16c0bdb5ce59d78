use super::{csv_writer, read_structures};
use crate::cli::InspectArgs;
use crate::error::Result;
use lcaonet::workflows::inspect::{self, GraphSummary};
use std::io::Write;
use tracing::info;

pub fn run(args: InspectArgs) -> Result<()> {
    let structures = read_structures(&args.input)?;
    let summaries = inspect::run(&structures, args.cutoff)?;
    info!("Writing {} graph summaries.", summaries.len());

    let mut writer = csv_writer(args.output.as_deref())?;
    write_summaries(&mut writer, &summaries)?;
    writer.flush()?;
    Ok(())
}

fn write_summaries<W: Write>(writer: &mut csv::Writer<W>, summaries: &[GraphSummary]) -> Result<()> {
    writer.write_record([
        "index",
        "n_atoms",
        "n_edges",
        "n_triplets",
        "periodic",
        "max_in_degree",
        "isolated_atoms",
        "min_distance",
    ])?;
    for s in summaries {
        writer.write_record([
            s.index.to_string(),
            s.n_atoms.to_string(),
            s.n_edges.to_string(),
            s.n_triplets.to_string(),
            s.periodic.to_string(),
            s.max_in_degree.to_string(),
            s.isolated_atoms.to_string(),
            s.min_distance.map(|d| format!("{:.6}", d)).unwrap_or_default(),
        ])?;
    }
    Ok(())
}

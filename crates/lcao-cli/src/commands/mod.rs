pub mod inspect;
pub mod predict;

use crate::error::Result;
use lcaonet::core::io::traits::StructureFile;
use lcaonet::core::io::xyz::XyzFile;
use lcaonet::core::models::structure::Structure;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use tracing::info;

/// Reads every frame of an extended XYZ file.
pub(crate) fn read_structures(path: &Path) -> Result<Vec<Structure>> {
    info!("Loading structures from {:?}", path);
    let structures = XyzFile::read_from_path(path)
        .map_err(|e| crate::error::CliError::file_parsing(path, e))?;
    info!("Loaded {} structure(s).", structures.len());
    Ok(structures)
}

/// A CSV writer on `path`, or on stdout when no path is given.
pub(crate) fn csv_writer(path: Option<&Path>) -> Result<csv::Writer<Box<dyn Write>>> {
    let sink: Box<dyn Write> = match path {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(io::stdout().lock()),
    };
    Ok(csv::Writer::from_writer(sink))
}

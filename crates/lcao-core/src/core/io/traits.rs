use crate::core::models::structure::Structure;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Common interface of structure file formats.
///
/// A file may hold several frames; each frame is read as one [`Structure`].
pub trait StructureFile {
    /// The error type for I/O operations.
    type Error: Error + From<io::Error>;

    /// Reads every frame from a buffered reader.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails or the reader fails.
    fn read_from(reader: &mut impl BufRead) -> Result<Vec<Structure>, Self::Error>;

    /// Writes the structures as consecutive frames.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_to(structures: &[Structure], writer: &mut impl Write) -> Result<(), Self::Error>;

    /// Reads every frame of the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or parsing fails.
    fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<Structure>, Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }

    /// Writes the structures to the file at `path`, replacing it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or writing fails.
    fn write_to_path<P: AsRef<Path>>(structures: &[Structure], path: P) -> Result<(), Self::Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(structures, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}

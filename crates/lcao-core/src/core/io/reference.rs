use crate::core::elements::table;
use nalgebra::DMatrix;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReferenceLoadError {
    #[error("CSV parsing error for '{path}': {source}")]
    Csv { path: String, source: csv::Error },
    #[error("Record {record} of '{path}': unknown element '{species}'")]
    UnknownElement {
        path: String,
        record: usize,
        species: String,
    },
    #[error("Record {record} of '{path}': atomic number {atomic_number} exceeds the maximum {max_z}")]
    AtomicNumberOutOfRange {
        path: String,
        record: usize,
        atomic_number: usize,
        max_z: usize,
    },
    #[error("Record {record} of '{path}': expected {expected} values, found {found}")]
    ColumnCount {
        path: String,
        record: usize,
        expected: usize,
        found: usize,
    },
    #[error("Record {record} of '{path}': invalid value '{value}'")]
    InvalidValue {
        path: String,
        record: usize,
        value: String,
    },
    #[error("'{path}' contains no reference values")]
    Empty { path: String },
}

/// Per-element reference values of the predicted property.
///
/// Row `z` holds the `out_dim` values added for every atom with atomic number
/// `z`; row 0 and elements missing from the file are zero.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceTable {
    pub values: DMatrix<f64>,
}

impl ReferenceTable {
    pub fn new(values: DMatrix<f64>) -> Self {
        Self { values }
    }

    pub fn out_dim(&self) -> usize {
        self.values.ncols()
    }

    pub fn max_z(&self) -> usize {
        self.values.nrows().saturating_sub(1)
    }

    /// Loads a CSV table whose first column is an element (symbol or atomic
    /// number) followed by one column per output. A header row is expected.
    pub fn load(path: &Path, max_z: usize) -> Result<Self, ReferenceLoadError> {
        let path_str = path.to_string_lossy().to_string();
        let csv_err = |source| ReferenceLoadError::Csv {
            path: path_str.clone(),
            source,
        };

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .comment(Some(b'#'))
            .from_path(path)
            .map_err(csv_err)?;

        let mut rows: Vec<(usize, Vec<f64>)> = Vec::new();
        let mut out_dim = None;

        for (n, result) in reader.records().enumerate() {
            let record_num = n + 1;
            let record = result.map_err(csv_err)?;
            let species = record.get(0).unwrap_or_default();

            let atomic_number = match species.parse::<usize>() {
                Ok(z) => z,
                Err(_) => table::atomic_number(species).map(usize::from).ok_or_else(|| {
                    ReferenceLoadError::UnknownElement {
                        path: path_str.clone(),
                        record: record_num,
                        species: species.to_string(),
                    }
                })?,
            };
            if atomic_number > max_z {
                return Err(ReferenceLoadError::AtomicNumberOutOfRange {
                    path: path_str.clone(),
                    record: record_num,
                    atomic_number,
                    max_z,
                });
            }

            let values = record
                .iter()
                .skip(1)
                .map(|v| {
                    v.parse::<f64>().map_err(|_| ReferenceLoadError::InvalidValue {
                        path: path_str.clone(),
                        record: record_num,
                        value: v.to_string(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            let expected = *out_dim.get_or_insert(values.len());
            if values.len() != expected || expected == 0 {
                return Err(ReferenceLoadError::ColumnCount {
                    path: path_str.clone(),
                    record: record_num,
                    expected: expected.max(1),
                    found: values.len(),
                });
            }
            rows.push((atomic_number, values));
        }

        let out_dim = out_dim.ok_or(ReferenceLoadError::Empty {
            path: path_str.clone(),
        })?;
        let mut values = DMatrix::zeros(max_z + 1, out_dim);
        for (z, row) in rows {
            for (k, v) in row.into_iter().enumerate() {
                values[(z, k)] = v;
            }
        }
        Ok(Self { values })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn load_accepts_symbols_and_atomic_numbers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("atomref.csv");
        fs::write(
            &path,
            "element,energy,charge\n# hydrogen first\nH,-0.5,0.1\n8,-75.0,-0.2\n",
        )
        .unwrap();

        let table = ReferenceTable::load(&path, 10).unwrap();
        assert_eq!(table.values.shape(), (11, 2));
        assert_eq!(table.out_dim(), 2);
        assert_eq!(table.max_z(), 10);
        assert_eq!(table.values[(1, 0)], -0.5);
        assert_eq!(table.values[(8, 1)], -0.2);
        assert!(table.values.row(0).iter().all(|&v| v == 0.0));
        assert!(table.values.row(6).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn load_rejects_elements_beyond_max_z() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("atomref.csv");
        fs::write(&path, "element,energy\nFe,-1.0\n").unwrap();
        let err = ReferenceTable::load(&path, 10).unwrap_err();
        assert!(matches!(
            err,
            ReferenceLoadError::AtomicNumberOutOfRange { atomic_number: 26, .. }
        ));
    }

    #[test]
    fn load_rejects_unknown_elements_and_bad_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("atomref.csv");
        fs::write(&path, "element,energy\nQq,-1.0\n").unwrap();
        assert!(matches!(
            ReferenceTable::load(&path, 10).unwrap_err(),
            ReferenceLoadError::UnknownElement { record: 1, .. }
        ));

        fs::write(&path, "element,energy\nH,abc\n").unwrap();
        assert!(matches!(
            ReferenceTable::load(&path, 10).unwrap_err(),
            ReferenceLoadError::InvalidValue { .. }
        ));
    }

    #[test]
    fn load_fails_for_missing_or_empty_file() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.csv");
        assert!(matches!(
            ReferenceTable::load(&missing, 10).unwrap_err(),
            ReferenceLoadError::Csv { .. }
        ));

        let empty = dir.path().join("empty.csv");
        fs::write(&empty, "element,energy\n").unwrap();
        assert!(matches!(
            ReferenceTable::load(&empty, 10).unwrap_err(),
            ReferenceLoadError::Empty { .. }
        ));
    }
}

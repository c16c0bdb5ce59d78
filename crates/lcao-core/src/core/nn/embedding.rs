use nalgebra::DMatrix;
use rand::Rng;

/// A lookup table mapping integer ids to dense rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    pub table: DMatrix<f64>,
}

impl Embedding {
    /// Table of `rows × dim` entries drawn uniformly from `[-bound, bound)`.
    pub fn uniform<R: Rng + ?Sized>(rows: usize, dim: usize, bound: f64, rng: &mut R) -> Self {
        let table = if bound > 0.0 {
            DMatrix::from_fn(rows, dim, |_, _| rng.gen_range(-bound..bound))
        } else {
            DMatrix::zeros(rows, dim)
        };
        Self { table }
    }

    /// Forces row `id` to zero so that looking it up contributes nothing.
    pub fn with_padding_row(mut self, id: usize) -> Self {
        if id < self.table.nrows() {
            self.table.row_mut(id).fill(0.0);
        }
        self
    }

    pub fn rows(&self) -> usize {
        self.table.nrows()
    }

    pub fn dim(&self) -> usize {
        self.table.ncols()
    }

    pub fn parameter_count(&self) -> usize {
        self.table.len()
    }

    /// Rows for `ids`, in order. Ids must be below [`Embedding::rows`].
    pub fn lookup(&self, ids: &[usize]) -> DMatrix<f64> {
        self.table.select_rows(ids.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn lookup_returns_rows_in_order() {
        let emb = Embedding {
            table: DMatrix::from_row_slice(3, 2, &[0.0, 0.0, 1.0, 1.5, 2.0, 2.5]),
        };
        let out = emb.lookup(&[2, 1, 2]);
        assert_eq!(out, DMatrix::from_row_slice(3, 2, &[2.0, 2.5, 1.0, 1.5, 2.0, 2.5]));
    }

    #[test]
    fn padding_row_is_zero_and_others_are_bounded() {
        let bound = 3f64.sqrt();
        let emb = Embedding::uniform(5, 4, bound, &mut StdRng::seed_from_u64(9)).with_padding_row(0);
        assert!(emb.table.row(0).iter().all(|&v| v == 0.0));
        assert!(emb.table.iter().all(|&v| v.abs() <= bound));
        assert!(emb.table.row(1).iter().any(|&v| v != 0.0));
    }
}

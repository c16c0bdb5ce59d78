//! Dense tensor helpers on top of `nalgebra` matrices.
//!
//! Rank-3 `(rows × orbitals × dim)` tensors are stored as an
//! [`OrbitalTensor`], a `(rows · orbitals) × dim` matrix whose row
//! `r * n_orb + o` holds orbital `o` of row `r`.

use nalgebra::{DMatrix, DMatrixView, DVector};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

const NORMALIZE_EPS: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq)]
pub struct OrbitalTensor {
    n_orb: usize,
    data: DMatrix<f64>,
}

impl OrbitalTensor {
    pub fn zeros(n_rows: usize, n_orb: usize, dim: usize) -> Self {
        Self {
            n_orb,
            data: DMatrix::zeros(n_rows * n_orb, dim),
        }
    }

    /// Wraps a `(rows · n_orb) × dim` matrix.
    ///
    /// # Panics
    ///
    /// Panics if `n_orb` is zero or does not divide the row count.
    pub fn from_matrix(n_orb: usize, data: DMatrix<f64>) -> Self {
        assert!(
            n_orb > 0 && data.nrows() % n_orb == 0,
            "{} rows cannot be split into blocks of {} orbitals",
            data.nrows(),
            n_orb
        );
        Self { n_orb, data }
    }

    pub fn n_rows(&self) -> usize {
        self.data.nrows() / self.n_orb
    }

    pub fn n_orb(&self) -> usize {
        self.n_orb
    }

    pub fn dim(&self) -> usize {
        self.data.ncols()
    }

    pub fn as_matrix(&self) -> &DMatrix<f64> {
        &self.data
    }

    pub fn into_matrix(self) -> DMatrix<f64> {
        self.data
    }

    /// The `n_orb × dim` block of row `r`.
    pub fn block(&self, r: usize) -> DMatrixView<'_, f64> {
        self.data.rows(r * self.n_orb, self.n_orb)
    }

    /// Selects whole rows (all their orbitals), in the order of `index`.
    pub fn gather(&self, index: &[usize]) -> Self {
        let n_orb = self.n_orb;
        let rows: Vec<usize> = index
            .iter()
            .flat_map(|&r| (r * n_orb)..(r * n_orb + n_orb))
            .collect();
        Self {
            n_orb,
            data: self.data.select_rows(rows.iter()),
        }
    }

    /// Applies a row-wise map along the last axis, such as a dense layer.
    ///
    /// `f` must return one row per input row.
    pub fn map(&self, f: impl FnOnce(&DMatrix<f64>) -> DMatrix<f64>) -> Self {
        let data = f(&self.data);
        debug_assert_eq!(data.nrows(), self.data.nrows());
        Self {
            n_orb: self.n_orb,
            data,
        }
    }

    /// Splits the last axis into `[0, at)` and `[at, dim)`.
    pub fn split_columns(&self, at: usize) -> (Self, Self) {
        let dim = self.dim();
        (
            Self {
                n_orb: self.n_orb,
                data: self.data.columns(0, at).into_owned(),
            },
            Self {
                n_orb: self.n_orb,
                data: self.data.columns(at, dim - at).into_owned(),
            },
        )
    }

    /// Sums over the orbital axis, giving a `rows × dim` matrix.
    pub fn sum_orbitals(&self) -> DMatrix<f64> {
        let n_rows = self.n_rows();
        let mut out = DMatrix::zeros(n_rows, self.dim());
        for r in 0..n_rows {
            out.row_mut(r).copy_from(&self.block(r).row_sum());
        }
        out
    }

    /// `c ← c + c ⊙ g`, with one `g` row per tensor row broadcast over its
    /// orbitals. Zero entries of `c` stay zero.
    pub fn add_scaled_by_rows(&mut self, gate: &DMatrix<f64>) {
        debug_assert_eq!(gate.nrows(), self.n_rows());
        debug_assert_eq!(gate.ncols(), self.dim());
        let n_orb = self.n_orb;
        for r in 0..gate.nrows() {
            let g = gate.row(r);
            for o in 0..n_orb {
                let mut row = self.data.row_mut(r * n_orb + o);
                for (c, &w) in row.iter_mut().zip(g.iter()) {
                    *c += *c * w;
                }
            }
        }
    }
}

/// Orbital contraction `out[t, h] = Σ_o w[t, o] · m[s, o] · c[s, o, h]` with
/// `s = index[t]` (or `s = t` when `index` is `None`).
///
/// `mask`, when given, is indexed like `coeffs`.
pub fn contract_orbitals(
    weights: &DMatrix<f64>,
    coeffs: &OrbitalTensor,
    index: Option<&[usize]>,
    mask: Option<&DMatrix<f64>>,
) -> DMatrix<f64> {
    let n_out = weights.nrows();
    let n_orb = coeffs.n_orb();
    let dim = coeffs.dim();
    debug_assert_eq!(weights.ncols(), n_orb);

    let contract_row = |t: usize| -> DVector<f64> {
        let s = index.map_or(t, |idx| idx[t]);
        let block = coeffs.block(s);
        let mut acc = DVector::zeros(dim);
        for o in 0..n_orb {
            let mut w = weights[(t, o)];
            if let Some(m) = mask {
                w *= m[(s, o)];
            }
            if w != 0.0 {
                acc.axpy(w, &block.row(o).transpose(), 1.0);
            }
        }
        acc
    };

    #[cfg(feature = "parallel")]
    let rows: Vec<DVector<f64>> = (0..n_out).into_par_iter().map(contract_row).collect();
    #[cfg(not(feature = "parallel"))]
    let rows: Vec<DVector<f64>> = (0..n_out).map(contract_row).collect();

    let mut out = DMatrix::zeros(n_out, dim);
    for (t, row) in rows.iter().enumerate() {
        out.row_mut(t).tr_copy_from(row);
    }
    out
}

/// Sums the rows of `src` into `dim_size` buckets chosen by `index`.
///
/// Buckets that receive nothing stay zero.
pub fn scatter_sum(src: &DMatrix<f64>, index: &[usize], dim_size: usize) -> DMatrix<f64> {
    debug_assert_eq!(src.nrows(), index.len());
    let mut out = DMatrix::zeros(dim_size, src.ncols());
    for (r, &target) in index.iter().enumerate() {
        let mut dst = out.row_mut(target);
        dst += src.row(r);
    }
    out
}

/// Like [`scatter_sum`], divided by the number of contributions per bucket.
pub fn scatter_mean(src: &DMatrix<f64>, index: &[usize], dim_size: usize) -> DMatrix<f64> {
    let mut out = scatter_sum(src, index, dim_size);
    let mut counts = vec![0usize; dim_size];
    for &target in index {
        counts[target] += 1;
    }
    for (r, &n) in counts.iter().enumerate() {
        if n > 1 {
            out.row_mut(r).scale_mut(1.0 / n as f64);
        }
    }
    out
}

/// Divides each row by `max(‖row‖, 1e-12)`.
pub fn l2_normalize_rows(m: &mut DMatrix<f64>) {
    for mut row in m.row_iter_mut() {
        let norm = row.norm().max(NORMALIZE_EPS);
        row.unscale_mut(norm);
    }
}

/// Concatenates `[a[left[e]] ‖ b[right[e]]]` row by row.
pub fn concat_gathered(
    a: &DMatrix<f64>,
    left: &[usize],
    b: &DMatrix<f64>,
    right: &[usize],
) -> DMatrix<f64> {
    debug_assert_eq!(left.len(), right.len());
    let (ca, cb) = (a.ncols(), b.ncols());
    let mut out = DMatrix::zeros(left.len(), ca + cb);
    for (r, (&l, &rt)) in left.iter().zip(right).enumerate() {
        out.view_mut((r, 0), (1, ca)).copy_from(&a.row(l));
        out.view_mut((r, ca), (1, cb)).copy_from(&b.row(rt));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    fn tensor_2x2x3() -> OrbitalTensor {
        // row 0: orbitals [1,2,3], [4,5,6]; row 1: [7,8,9], [0,0,0]
        OrbitalTensor::from_matrix(
            2,
            DMatrix::from_row_slice(
                4,
                3,
                &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 0.0, 0.0, 0.0],
            ),
        )
    }

    #[test]
    fn gather_selects_whole_orbital_blocks() {
        let t = tensor_2x2x3();
        let g = t.gather(&[1, 0, 1]);
        assert_eq!(g.n_rows(), 3);
        assert_eq!(g.block(0), t.block(1));
        assert_eq!(g.block(1), t.block(0));
        assert_eq!(g.block(2), t.block(1));
    }

    #[test]
    fn map_keeps_orbital_layout() {
        let t = tensor_2x2x3();
        let doubled = t.map(|m| m * 2.0);
        assert_eq!(doubled.n_orb(), 2);
        assert_eq!(doubled.block(1).row(0)[2], 18.0);
    }

    #[test]
    fn sum_orbitals_reduces_each_block() {
        let s = tensor_2x2x3().sum_orbitals();
        assert_eq!(s, DMatrix::from_row_slice(2, 3, &[5.0, 7.0, 9.0, 7.0, 8.0, 9.0]));
    }

    #[test]
    fn split_columns_partitions_last_axis() {
        let (a, b) = tensor_2x2x3().split_columns(1);
        assert_eq!(a.dim(), 1);
        assert_eq!(b.dim(), 2);
        assert_eq!(a.n_orb(), 2);
        assert_eq!(b.as_matrix()[(2, 1)], 9.0);
    }

    #[test]
    fn add_scaled_by_rows_keeps_zero_orbitals_zero() {
        let mut t = tensor_2x2x3();
        let gate = DMatrix::from_row_slice(2, 3, &[1.0, 0.0, -1.0, 5.0, 5.0, 5.0]);
        t.add_scaled_by_rows(&gate);
        assert_eq!(t.block(0).row(0).iter().copied().collect::<Vec<_>>(), vec![2.0, 2.0, 0.0]);
        assert_eq!(t.block(1).row(0).iter().copied().collect::<Vec<_>>(), vec![42.0, 48.0, 54.0]);
        assert!(t.block(1).row(1).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn contract_orbitals_sums_weighted_orbitals() {
        let t = tensor_2x2x3();
        let w = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 0.5, 1.0]);
        let out = contract_orbitals(&w, &t, None, None);
        assert_eq!(out.row(0).iter().copied().collect::<Vec<_>>(), vec![9.0, 12.0, 15.0]);
        assert_eq!(out.row(1).iter().copied().collect::<Vec<_>>(), vec![3.5, 4.0, 4.5]);
    }

    #[test]
    fn contract_orbitals_applies_index_and_mask_to_coefficient_rows() {
        let t = tensor_2x2x3();
        let w = DMatrix::from_row_slice(1, 2, &[1.0, 1.0]);
        let mask = DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 1.0, 1.0]);
        let out = contract_orbitals(&w, &t, Some(&[0]), Some(&mask));
        assert_eq!(out.row(0).iter().copied().collect::<Vec<_>>(), vec![4.0, 5.0, 6.0]);
    }

    #[test]
    fn zero_mask_row_equals_dropping_the_orbital() {
        let t = tensor_2x2x3();
        let w = DMatrix::from_row_slice(2, 2, &[0.3, 0.7, 1.1, -0.4]);
        let mask = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 1.0, 0.0]);
        let masked = contract_orbitals(&w, &t, None, Some(&mask));
        let mut w_dropped = w.clone();
        w_dropped.column_mut(1).fill(0.0);
        let dropped = contract_orbitals(&w_dropped, &t, None, None);
        assert!((masked - dropped).abs().max() < EPS);
    }

    #[test]
    fn scatter_sum_leaves_untouched_buckets_zero() {
        let src = DMatrix::from_row_slice(3, 2, &[1.0, 1.0, 2.0, 2.0, 3.0, 3.0]);
        let out = scatter_sum(&src, &[0, 2, 0], 4);
        assert_eq!(
            out,
            DMatrix::from_row_slice(4, 2, &[4.0, 4.0, 0.0, 0.0, 2.0, 2.0, 0.0, 0.0])
        );
    }

    #[test]
    fn scatter_mean_divides_by_contribution_count() {
        let src = DMatrix::from_row_slice(3, 1, &[1.0, 2.0, 3.0]);
        let out = scatter_mean(&src, &[0, 1, 0], 3);
        assert_eq!(out, DMatrix::from_row_slice(3, 1, &[2.0, 2.0, 0.0]));
    }

    #[test]
    fn l2_normalize_rows_guards_zero_rows() {
        let mut m = DMatrix::from_row_slice(2, 2, &[3.0, 4.0, 0.0, 0.0]);
        l2_normalize_rows(&mut m);
        assert!((m[(0, 0)] - 0.6).abs() < EPS);
        assert!((m[(0, 1)] - 0.8).abs() < EPS);
        assert_eq!(m.row(1).iter().copied().collect::<Vec<_>>(), vec![0.0, 0.0]);
    }

    #[test]
    fn concat_gathered_joins_selected_rows() {
        let a = DMatrix::from_row_slice(2, 1, &[1.0, 2.0]);
        let b = DMatrix::from_row_slice(2, 2, &[10.0, 11.0, 20.0, 21.0]);
        let out = concat_gathered(&a, &[1, 0], &b, &[0, 1]);
        assert_eq!(out, DMatrix::from_row_slice(2, 3, &[2.0, 10.0, 11.0, 1.0, 20.0, 21.0]));
    }
}

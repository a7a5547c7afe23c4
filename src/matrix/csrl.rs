//! CSR with cached row-length groups.
//!
//! Rows are permuted so that rows with the same number of nonzeros sit next
//! to each other; the mat-vec then runs group by group with a fixed inner
//! loop length. Built from an existing CSR matrix, never directly.

use num_traits::Float;

use crate::core::traits::{Indexing, MatVec};
use crate::matrix::csr::CsrMatrix;

#[derive(Clone, Debug, PartialEq)]
pub struct CsrlMatrix<T> {
    nrow: usize,
    ncol: usize,
    /// Distinct row lengths, ascending.
    group_len: Vec<usize>,
    /// `group_start[g]..group_start[g + 1]` indexes `row_index` for group g.
    group_start: Vec<usize>,
    /// Original row number of each permuted row.
    row_index: Vec<usize>,
    /// Column indices in permuted row order.
    ja: Vec<usize>,
    val: Vec<T>,
}

impl<T: Float + Send + Sync> CsrlMatrix<T> {
    pub fn from_csr(csr: &CsrMatrix<T>) -> Self {
        let nrow = csr.nrows();
        let ia = csr.row_ptr();
        let mut order: Vec<usize> = (0..nrow).collect();
        order.sort_by_key(|&i| ia[i + 1] - ia[i]);

        let mut group_len = Vec::new();
        let mut group_start = vec![0usize];
        let mut ja = Vec::with_capacity(csr.nnz());
        let mut val = Vec::with_capacity(csr.nnz());
        for (pos, &i) in order.iter().enumerate() {
            let len = ia[i + 1] - ia[i];
            if group_len.last() != Some(&len) {
                if pos > 0 {
                    group_start.push(pos);
                }
                group_len.push(len);
            }
            ja.extend_from_slice(&csr.col_idx()[ia[i]..ia[i + 1]]);
            val.extend_from_slice(&csr.values()[ia[i]..ia[i + 1]]);
        }
        group_start.push(nrow);

        Self {
            nrow,
            ncol: csr.ncols(),
            group_len,
            group_start,
            row_index: order,
            ja,
            val,
        }
    }

    pub fn ngroup(&self) -> usize {
        self.group_len.len()
    }

    pub fn nnz(&self) -> usize {
        self.val.len()
    }

    /// y ← Ax, one group at a time with a fixed inner-loop length.
    pub fn spmv(&self, x: &[T], y: &mut [T]) {
        assert_eq!(x.len(), self.ncol);
        assert_eq!(y.len(), self.nrow);
        let mut pos = 0usize;
        for g in 0..self.group_len.len() {
            let len = self.group_len[g];
            for &row in &self.row_index[self.group_start[g]..self.group_start[g + 1]] {
                let mut sum = T::zero();
                for k in pos..pos + len {
                    sum = sum + self.val[k] * x[self.ja[k]];
                }
                y[row] = sum;
                pos += len;
            }
        }
    }

    /// y ← αAx + βy.
    pub fn spmv_axpby(&self, alpha: T, x: &[T], beta: T, y: &mut [T]) {
        assert_eq!(x.len(), self.ncol);
        assert_eq!(y.len(), self.nrow);
        let mut pos = 0usize;
        for g in 0..self.group_len.len() {
            let len = self.group_len[g];
            for &row in &self.row_index[self.group_start[g]..self.group_start[g + 1]] {
                let mut sum = T::zero();
                for k in pos..pos + len {
                    sum = sum + self.val[k] * x[self.ja[k]];
                }
                y[row] = alpha * sum + beta * y[row];
                pos += len;
            }
        }
    }
}

impl<T: Float + Send + Sync> MatVec<T> for CsrlMatrix<T> {
    fn matvec(&self, x: &[T], y: &mut [T]) {
        self.spmv(x, y)
    }
}

impl<T> Indexing for CsrlMatrix<T> {
    fn nrows(&self) -> usize {
        self.nrow
    }
    fn ncols(&self) -> usize {
        self.ncol
    }
}

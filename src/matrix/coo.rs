//! Coordinate (triple) storage. Used as a conversion way-point and for
//! scatter-add matrix-vector products on unassembled data.

use num_traits::Float;

use crate::core::traits::{Indexing, MatVec};
use crate::error::KsparError;
use crate::matrix::csr::CsrMatrix;

#[derive(Clone, Debug, PartialEq)]
pub struct CooMatrix<T> {
    nrow: usize,
    ncol: usize,
    rowind: Vec<usize>,
    colind: Vec<usize>,
    val: Vec<T>,
}

impl<T: Float + Send + Sync> CooMatrix<T> {
    pub fn new(
        nrow: usize,
        ncol: usize,
        rowind: Vec<usize>,
        colind: Vec<usize>,
        val: Vec<T>,
    ) -> Result<Self, KsparError> {
        if rowind.len() != val.len() || colind.len() != val.len() {
            return Err(KsparError::Format(
                "COO parallel arrays have mismatched lengths".into(),
            ));
        }
        if let Some(&i) = rowind.iter().find(|&&i| i >= nrow) {
            return Err(KsparError::Format(format!(
                "COO row index {} out of range (nrow = {})",
                i, nrow
            )));
        }
        if let Some(&j) = colind.iter().find(|&&j| j >= ncol) {
            return Err(KsparError::Format(format!(
                "COO column index {} out of range (ncol = {})",
                j, ncol
            )));
        }
        Ok(Self {
            nrow,
            ncol,
            rowind,
            colind,
            val,
        })
    }

    pub fn nrows(&self) -> usize {
        self.nrow
    }

    pub fn ncols(&self) -> usize {
        self.ncol
    }

    pub fn nnz(&self) -> usize {
        self.val.len()
    }

    pub fn triples(&self) -> impl Iterator<Item = (usize, usize, T)> + '_ {
        self.rowind
            .iter()
            .zip(&self.colind)
            .zip(&self.val)
            .map(|((&i, &j), &v)| (i, j, v))
    }

    /// Convert to CSR: count occurrences per row into `ia`, prefix-sum,
    /// scatter the entries, then shift `ia` back into place. Duplicate
    /// `(i, j)` entries are retained (no summing) and rows are not sorted
    /// by column; that is the established contract.
    pub fn to_csr(&self) -> CsrMatrix<T> {
        let nnz = self.nnz();
        let mut ia = vec![0usize; self.nrow + 1];
        for &i in &self.rowind {
            ia[i + 1] += 1;
        }
        for i in 0..self.nrow {
            ia[i + 1] += ia[i];
        }
        let mut ja = vec![0usize; nnz];
        let mut val = vec![T::zero(); nnz];
        let mut next = ia.clone();
        for k in 0..nnz {
            let i = self.rowind[k];
            let dst = next[i];
            ja[dst] = self.colind[k];
            val[dst] = self.val[k];
            next[i] += 1;
        }
        CsrMatrix::new(self.nrow, self.ncol, ia, ja, val)
            .expect("COO invariants guarantee a valid CSR structure")
    }

    /// y ← Ax by scatter-add; a single pass over the triples.
    pub fn spmv(&self, x: &[T], y: &mut [T]) {
        assert_eq!(x.len(), self.ncol);
        assert_eq!(y.len(), self.nrow);
        for yi in y.iter_mut() {
            *yi = T::zero();
        }
        for ((&i, &j), &v) in self.rowind.iter().zip(&self.colind).zip(&self.val) {
            y[i] = y[i] + v * x[j];
        }
    }

    /// y ← αAx + βy.
    pub fn spmv_axpby(&self, alpha: T, x: &[T], beta: T, y: &mut [T]) {
        assert_eq!(x.len(), self.ncol);
        assert_eq!(y.len(), self.nrow);
        for yi in y.iter_mut() {
            *yi = beta * *yi;
        }
        for ((&i, &j), &v) in self.rowind.iter().zip(&self.colind).zip(&self.val) {
            y[i] = y[i] + alpha * v * x[j];
        }
    }
}

impl<T: Float + Send + Sync> MatVec<T> for CooMatrix<T> {
    fn matvec(&self, x: &[T], y: &mut [T]) {
        self.spmv(x, y)
    }
}

impl<T> Indexing for CooMatrix<T> {
    fn nrows(&self) -> usize {
        self.nrow
    }
    fn ncols(&self) -> usize {
        self.ncol
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_csr_keeps_duplicates() {
        // two entries at (0, 0)
        let coo = CooMatrix::new(2, 2, vec![0, 0, 1], vec![0, 0, 1], vec![1.0, 2.0, 3.0]).unwrap();
        let csr = coo.to_csr();
        assert_eq!(csr.nnz(), 3);
        let x = vec![1.0, 1.0];
        let mut y = vec![0.0; 2];
        csr.spmv(&x, &mut y);
        assert_eq!(y, vec![3.0, 3.0]);
    }

    #[test]
    fn spmv_matches_csr() {
        let coo = CooMatrix::new(
            2,
            3,
            vec![0, 0, 1, 1],
            vec![0, 1, 1, 2],
            vec![1.0, 2.0, 3.0, 4.0],
        )
        .unwrap();
        let csr = coo.to_csr();
        let x = vec![1.0, -1.0, 2.0];
        let mut y1 = vec![0.0; 2];
        let mut y2 = vec![0.0; 2];
        coo.spmv(&x, &mut y1);
        csr.spmv(&x, &mut y2);
        assert_eq!(y1, y2);
    }

    #[test]
    fn out_of_range_triple_is_rejected() {
        let bad = CooMatrix::new(2, 2, vec![5], vec![0], vec![1.0]);
        assert!(matches!(bad, Err(KsparError::Format(_))));
    }
}

//! Compressed sparse row storage and its kernels.
//!
//! `ia` holds `nrow + 1` row pointers with `ia[0] = 0` and `ia[nrow] = nnz`;
//! `ja`/`val` hold column indices and values. Duplicate entries are permitted
//! (conversions never sum them) and columns within a row are not required to
//! be sorted, so the kernels must not assume either.

use num_traits::Float;

use crate::core::traits::{Indexing, MatVec};
use crate::error::KsparError;
use crate::matrix::coo::CooMatrix;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

#[derive(Clone, Debug, PartialEq)]
pub struct CsrMatrix<T> {
    nrow: usize,
    ncol: usize,
    ia: Vec<usize>,
    ja: Vec<usize>,
    val: Vec<T>,
}

impl<T: Float + Send + Sync> CsrMatrix<T> {
    /// Build a CSR matrix from raw arrays, checking the structural invariants.
    pub fn new(
        nrow: usize,
        ncol: usize,
        ia: Vec<usize>,
        ja: Vec<usize>,
        val: Vec<T>,
    ) -> Result<Self, KsparError> {
        let m = Self {
            nrow,
            ncol,
            ia,
            ja,
            val,
        };
        m.validate()?;
        Ok(m)
    }

    /// n × n identity.
    pub fn eye(n: usize) -> Self {
        Self {
            nrow: n,
            ncol: n,
            ia: (0..=n).collect(),
            ja: (0..n).collect(),
            val: vec![T::one(); n],
        }
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

    pub fn row_ptr(&self) -> &[usize] {
        &self.ia
    }

    pub fn col_idx(&self) -> &[usize] {
        &self.ja
    }

    pub fn values(&self) -> &[T] {
        &self.val
    }

    /// Check the structural invariants, reporting the first violation.
    pub fn validate(&self) -> Result<(), KsparError> {
        if self.ia.len() != self.nrow + 1 {
            return Err(KsparError::Format(format!(
                "CSR row pointer length {} does not match nrow {}",
                self.ia.len(),
                self.nrow
            )));
        }
        if self.ia[0] != 0 || self.ia[self.nrow] != self.val.len() {
            return Err(KsparError::Format(
                "CSR row pointers must start at 0 and end at nnz".into(),
            ));
        }
        if self.ja.len() != self.val.len() {
            return Err(KsparError::Format(
                "CSR column index and value lengths differ".into(),
            ));
        }
        for i in 0..self.nrow {
            if self.ia[i] > self.ia[i + 1] {
                return Err(KsparError::Format(format!(
                    "CSR row pointers decrease at row {}",
                    i
                )));
            }
        }
        if let Some(&j) = self.ja.iter().find(|&&j| j >= self.ncol) {
            return Err(KsparError::Format(format!(
                "CSR column index {} out of range (ncol = {})",
                j, self.ncol
            )));
        }
        Ok(())
    }

    /// Main diagonal; absent entries are zero, duplicates are summed.
    pub fn diagonal(&self) -> Vec<T> {
        let mut d = vec![T::zero(); self.nrow.min(self.ncol)];
        for i in 0..self.nrow {
            for k in self.ia[i]..self.ia[i + 1] {
                if self.ja[k] == i {
                    d[i] = d[i] + self.val[k];
                }
            }
        }
        d
    }

    /// Sort the columns within each row in place. Conversions do not sort;
    /// consumers that need ordered rows call this explicitly.
    pub fn sort_rows(&mut self) {
        for i in 0..self.nrow {
            let (lo, hi) = (self.ia[i], self.ia[i + 1]);
            let mut perm: Vec<usize> = (lo..hi).collect();
            perm.sort_by_key(|&k| self.ja[k]);
            let ja_row: Vec<usize> = perm.iter().map(|&k| self.ja[k]).collect();
            let val_row: Vec<T> = perm.iter().map(|&k| self.val[k]).collect();
            self.ja[lo..hi].copy_from_slice(&ja_row);
            self.val[lo..hi].copy_from_slice(&val_row);
        }
    }

    /// Transpose by counting, prefix-summing, and scattering `ja`.
    pub fn transpose(&self) -> CsrMatrix<T> {
        let mut ia_t = vec![0usize; self.ncol + 1];
        for &j in &self.ja {
            ia_t[j + 1] += 1;
        }
        for j in 0..self.ncol {
            ia_t[j + 1] += ia_t[j];
        }
        let mut ja_t = vec![0usize; self.nnz()];
        let mut val_t = vec![T::zero(); self.nnz()];
        let mut next = ia_t.clone();
        for i in 0..self.nrow {
            for k in self.ia[i]..self.ia[i + 1] {
                let j = self.ja[k];
                let dst = next[j];
                ja_t[dst] = i;
                val_t[dst] = self.val[k];
                next[j] += 1;
            }
        }
        CsrMatrix {
            nrow: self.ncol,
            ncol: self.nrow,
            ia: ia_t,
            ja: ja_t,
            val: val_t,
        }
    }

    /// C = A + αB with per-row structural union: each column index appears at
    /// most once per row of C, with summed values. Input rows may be unsorted,
    /// so each row pair is merged through sorted temporary buffers.
    pub fn add(&self, alpha: T, other: &CsrMatrix<T>) -> Result<CsrMatrix<T>, KsparError> {
        if self.nrow != other.nrow || self.ncol != other.ncol {
            return Err(KsparError::Format(format!(
                "cannot add {}x{} and {}x{} matrices",
                self.nrow, self.ncol, other.nrow, other.ncol
            )));
        }
        let mut ia = Vec::with_capacity(self.nrow + 1);
        ia.push(0usize);
        let mut ja = Vec::new();
        let mut val = Vec::new();
        let mut row_a: Vec<(usize, T)> = Vec::new();
        let mut row_b: Vec<(usize, T)> = Vec::new();
        for i in 0..self.nrow {
            row_a.clear();
            row_b.clear();
            for k in self.ia[i]..self.ia[i + 1] {
                row_a.push((self.ja[k], self.val[k]));
            }
            for k in other.ia[i]..other.ia[i + 1] {
                row_b.push((other.ja[k], alpha * other.val[k]));
            }
            row_a.sort_by_key(|&(j, _)| j);
            row_b.sort_by_key(|&(j, _)| j);
            let (mut p, mut q) = (0, 0);
            while p < row_a.len() || q < row_b.len() {
                let ja_next = row_a.get(p).map(|&(j, _)| j);
                let jb_next = row_b.get(q).map(|&(j, _)| j);
                let j = match (ja_next, jb_next) {
                    (Some(a), Some(b)) => a.min(b),
                    (Some(a), None) => a,
                    (None, Some(b)) => b,
                    (None, None) => unreachable!(),
                };
                let mut v = T::zero();
                while p < row_a.len() && row_a[p].0 == j {
                    v = v + row_a[p].1;
                    p += 1;
                }
                while q < row_b.len() && row_b[q].0 == j {
                    v = v + row_b[q].1;
                    q += 1;
                }
                ja.push(j);
                val.push(v);
            }
            ia.push(ja.len());
        }
        Ok(CsrMatrix {
            nrow: self.nrow,
            ncol: self.ncol,
            ia,
            ja,
            val,
        })
    }

    /// Expand back to coordinate triples (the conversion way-point).
    pub fn to_coo(&self) -> CooMatrix<T> {
        let mut rowind = Vec::with_capacity(self.nnz());
        let mut colind = Vec::with_capacity(self.nnz());
        let mut v = Vec::with_capacity(self.nnz());
        for i in 0..self.nrow {
            for k in self.ia[i]..self.ia[i + 1] {
                rowind.push(i);
                colind.push(self.ja[k]);
                v.push(self.val[k]);
            }
        }
        CooMatrix::new(self.nrow, self.ncol, rowind, colind, v)
            .expect("CSR invariants guarantee valid triples")
    }

    /// y ← Ax. Standard gather-accumulate, one pass over `ia, ja, val`.
    pub fn spmv(&self, x: &[T], y: &mut [T]) {
        assert_eq!(x.len(), self.ncol);
        assert_eq!(y.len(), self.nrow);
        #[cfg(feature = "rayon")]
        if self.nrow >= 4096 {
            y.par_iter_mut().enumerate().for_each(|(i, yi)| {
                let mut sum = T::zero();
                for k in self.ia[i]..self.ia[i + 1] {
                    sum = sum + self.val[k] * x[self.ja[k]];
                }
                *yi = sum;
            });
            return;
        }
        for i in 0..self.nrow {
            let mut sum = T::zero();
            for k in self.ia[i]..self.ia[i + 1] {
                sum = sum + self.val[k] * x[self.ja[k]];
            }
            y[i] = sum;
        }
    }

    /// y ← αAx + βy.
    pub fn spmv_axpby(&self, alpha: T, x: &[T], beta: T, y: &mut [T]) {
        assert_eq!(x.len(), self.ncol);
        assert_eq!(y.len(), self.nrow);
        for i in 0..self.nrow {
            let mut sum = T::zero();
            for k in self.ia[i]..self.ia[i + 1] {
                sum = sum + self.val[k] * x[self.ja[k]];
            }
            y[i] = alpha * sum + beta * y[i];
        }
    }
}

impl<T: Float + Send + Sync> MatVec<T> for CsrMatrix<T> {
    fn matvec(&self, x: &[T], y: &mut [T]) {
        self.spmv(x, y)
    }
}

impl<T> Indexing for CsrMatrix<T> {
    fn nrows(&self) -> usize {
        self.nrow
    }
    fn ncols(&self) -> usize {
        self.ncol
    }
}

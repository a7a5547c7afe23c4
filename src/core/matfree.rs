//! Matrix-free dispatch: one tagged handle over every storage format.
//!
//! Binding a concrete matrix to a [`MatFree`] lets each Krylov core exist in
//! a single implementation shared across formats; the core only ever calls
//! [`MatVec::matvec`]. The `Operator` variant carries a user function for
//! genuinely matrix-free problems.

use num_traits::Float;

use crate::core::traits::{Indexing, MatVec};
use crate::error::KsparError;
use crate::matrix::{BlcMatrix, BsrMatrix, CooMatrix, CsrMatrix, CsrlMatrix, StrMatrix};

pub enum MatFree<'a, T> {
    Csr(&'a CsrMatrix<T>),
    Csrl(&'a CsrlMatrix<T>),
    Bsr(&'a BsrMatrix<T>),
    Str(&'a StrMatrix<T>),
    Blc(&'a BlcMatrix<T>),
    Coo(&'a CooMatrix<T>),
    /// `apply(x, y)` computes `y ← Ax` for an n × n operator. The function
    /// must not read `y` and must not mutate anything else.
    Operator {
        n: usize,
        apply: &'a (dyn Fn(&[T], &mut [T]) + Sync),
    },
}

impl<'a, T: Float + Send + Sync> MatFree<'a, T> {
    /// Dimension sanity performed once by the dispatcher, so the kernels
    /// themselves never have to re-discover a malformed system mid-iteration.
    pub fn check_system(&self, b: &[T], x: &[T]) -> Result<(), KsparError> {
        if self.nrows() != self.ncols() {
            return Err(KsparError::Format(format!(
                "coefficient matrix is {}x{}, expected square",
                self.nrows(),
                self.ncols()
            )));
        }
        if b.len() != self.nrows() || x.len() != self.nrows() {
            return Err(KsparError::InputPar(format!(
                "rhs/solution sizes {}/{} do not match matrix dimension {}",
                b.len(),
                x.len(),
                self.nrows()
            )));
        }
        Ok(())
    }
}

impl<'a, T: Float + Send + Sync> MatVec<T> for MatFree<'a, T> {
    fn matvec(&self, x: &[T], y: &mut [T]) {
        match self {
            MatFree::Csr(m) => m.spmv(x, y),
            MatFree::Csrl(m) => m.spmv(x, y),
            MatFree::Bsr(m) => m.spmv(x, y),
            MatFree::Str(m) => m.spmv(x, y),
            MatFree::Blc(m) => m.spmv(x, y),
            MatFree::Coo(m) => m.spmv(x, y),
            MatFree::Operator { apply, .. } => apply(x, y),
        }
    }
}

impl<'a, T> Indexing for MatFree<'a, T> {
    fn nrows(&self) -> usize {
        match self {
            MatFree::Csr(m) => Indexing::nrows(*m),
            MatFree::Csrl(m) => Indexing::nrows(*m),
            MatFree::Bsr(m) => Indexing::nrows(*m),
            MatFree::Str(m) => Indexing::nrows(*m),
            MatFree::Blc(m) => Indexing::nrows(*m),
            MatFree::Coo(m) => Indexing::nrows(*m),
            MatFree::Operator { n, .. } => *n,
        }
    }

    fn ncols(&self) -> usize {
        match self {
            MatFree::Csr(m) => Indexing::ncols(*m),
            MatFree::Csrl(m) => Indexing::ncols(*m),
            MatFree::Bsr(m) => Indexing::ncols(*m),
            MatFree::Str(m) => Indexing::ncols(*m),
            MatFree::Blc(m) => Indexing::ncols(*m),
            MatFree::Coo(m) => Indexing::ncols(*m),
            MatFree::Operator { n, .. } => *n,
        }
    }
}

impl<'a, T> From<&'a CsrMatrix<T>> for MatFree<'a, T> {
    fn from(m: &'a CsrMatrix<T>) -> Self {
        MatFree::Csr(m)
    }
}

impl<'a, T> From<&'a CsrlMatrix<T>> for MatFree<'a, T> {
    fn from(m: &'a CsrlMatrix<T>) -> Self {
        MatFree::Csrl(m)
    }
}

impl<'a, T> From<&'a BsrMatrix<T>> for MatFree<'a, T> {
    fn from(m: &'a BsrMatrix<T>) -> Self {
        MatFree::Bsr(m)
    }
}

impl<'a, T> From<&'a StrMatrix<T>> for MatFree<'a, T> {
    fn from(m: &'a StrMatrix<T>) -> Self {
        MatFree::Str(m)
    }
}

impl<'a, T> From<&'a BlcMatrix<T>> for MatFree<'a, T> {
    fn from(m: &'a BlcMatrix<T>) -> Self {
        MatFree::Blc(m)
    }
}

impl<'a, T> From<&'a CooMatrix<T>> for MatFree<'a, T> {
    fn from(m: &'a CooMatrix<T>) -> Self {
        MatFree::Coo(m)
    }
}

//! Block composite storage: a two-dimensional grid of sub-matrices.
//!
//! Each cell of the `brow × bcol` grid is a CSR or BSR sub-matrix, or empty.
//! The row/column partitions must be consistent across the grid; they define
//! the logical shape. The usual client is a saddle-point system
//! `[[A, Bᵀ], [B, 0]]`.

use num_traits::Float;

use crate::core::traits::{Indexing, MatVec};
use crate::error::KsparError;
use crate::matrix::bsr::BsrMatrix;
use crate::matrix::csr::CsrMatrix;

#[derive(Clone, Debug)]
pub enum BlcBlock<T> {
    Csr(CsrMatrix<T>),
    Bsr(BsrMatrix<T>),
}

impl<T: Float + Send + Sync> BlcBlock<T> {
    fn nrows(&self) -> usize {
        match self {
            BlcBlock::Csr(m) => m.nrows(),
            BlcBlock::Bsr(m) => Indexing::nrows(m),
        }
    }

    fn ncols(&self) -> usize {
        match self {
            BlcBlock::Csr(m) => m.ncols(),
            BlcBlock::Bsr(m) => Indexing::ncols(m),
        }
    }

    fn spmv_axpby(&self, alpha: T, x: &[T], beta: T, y: &mut [T]) {
        match self {
            BlcBlock::Csr(m) => m.spmv_axpby(alpha, x, beta, y),
            BlcBlock::Bsr(m) => m.spmv_axpby(alpha, x, beta, y),
        }
    }
}

#[derive(Clone, Debug)]
pub struct BlcMatrix<T> {
    brow: usize,
    bcol: usize,
    blocks: Vec<Option<BlcBlock<T>>>,
    /// Partial sums of the block-row heights; length `brow + 1`.
    row_offsets: Vec<usize>,
    /// Partial sums of the block-column widths; length `bcol + 1`.
    col_offsets: Vec<usize>,
}

impl<T: Float + Send + Sync> BlcMatrix<T> {
    /// Build from a row-major grid of optional sub-matrices. Every block row
    /// must have a consistent height and every block column a consistent
    /// width; fully empty block rows or columns are rejected because their
    /// extent would be undefined.
    pub fn new(
        brow: usize,
        bcol: usize,
        blocks: Vec<Option<BlcBlock<T>>>,
    ) -> Result<Self, KsparError> {
        if blocks.len() != brow * bcol {
            return Err(KsparError::Format(format!(
                "BLC grid expects {} cells, got {}",
                brow * bcol,
                blocks.len()
            )));
        }
        let mut row_sizes = vec![None; brow];
        let mut col_sizes = vec![None; bcol];
        for i in 0..brow {
            for j in 0..bcol {
                if let Some(block) = &blocks[i * bcol + j] {
                    match row_sizes[i] {
                        None => row_sizes[i] = Some(block.nrows()),
                        Some(h) if h != block.nrows() => {
                            return Err(KsparError::Format(format!(
                                "BLC block ({}, {}) height {} conflicts with {}",
                                i,
                                j,
                                block.nrows(),
                                h
                            )));
                        }
                        _ => {}
                    }
                    match col_sizes[j] {
                        None => col_sizes[j] = Some(block.ncols()),
                        Some(w) if w != block.ncols() => {
                            return Err(KsparError::Format(format!(
                                "BLC block ({}, {}) width {} conflicts with {}",
                                i,
                                j,
                                block.ncols(),
                                w
                            )));
                        }
                        _ => {}
                    }
                }
            }
        }
        let mut row_offsets = vec![0usize; brow + 1];
        for i in 0..brow {
            let h = row_sizes[i].ok_or_else(|| {
                KsparError::Format(format!("BLC block row {} is entirely empty", i))
            })?;
            row_offsets[i + 1] = row_offsets[i] + h;
        }
        let mut col_offsets = vec![0usize; bcol + 1];
        for j in 0..bcol {
            let w = col_sizes[j].ok_or_else(|| {
                KsparError::Format(format!("BLC block column {} is entirely empty", j))
            })?;
            col_offsets[j + 1] = col_offsets[j] + w;
        }
        Ok(Self {
            brow,
            bcol,
            blocks,
            row_offsets,
            col_offsets,
        })
    }

    pub fn block_grid(&self) -> (usize, usize) {
        (self.brow, self.bcol)
    }

    pub fn block(&self, i: usize, j: usize) -> Option<&BlcBlock<T>> {
        self.blocks[i * self.bcol + j].as_ref()
    }

    fn accumulate(&self, alpha: T, x: &[T], y: &mut [T]) {
        for i in 0..self.brow {
            let yr = self.row_offsets[i]..self.row_offsets[i + 1];
            for j in 0..self.bcol {
                if let Some(block) = &self.blocks[i * self.bcol + j] {
                    let xr = self.col_offsets[j]..self.col_offsets[j + 1];
                    block.spmv_axpby(alpha, &x[xr], T::one(), &mut y[yr.clone()]);
                }
            }
        }
    }

    /// y ← Ax: dispatch every non-empty sub-block over partial views of
    /// `x` and `y`.
    pub fn spmv(&self, x: &[T], y: &mut [T]) {
        assert_eq!(x.len(), Indexing::ncols(self));
        assert_eq!(y.len(), Indexing::nrows(self));
        for yi in y.iter_mut() {
            *yi = T::zero();
        }
        self.accumulate(T::one(), x, y);
    }

    /// y ← αAx + βy.
    pub fn spmv_axpby(&self, alpha: T, x: &[T], beta: T, y: &mut [T]) {
        assert_eq!(x.len(), Indexing::ncols(self));
        assert_eq!(y.len(), Indexing::nrows(self));
        for yi in y.iter_mut() {
            *yi = beta * *yi;
        }
        self.accumulate(alpha, x, y);
    }
}

impl<T: Float + Send + Sync> MatVec<T> for BlcMatrix<T> {
    fn matvec(&self, x: &[T], y: &mut [T]) {
        self.spmv(x, y)
    }
}

impl<T> Indexing for BlcMatrix<T> {
    fn nrows(&self) -> usize {
        *self.row_offsets.last().unwrap()
    }
    fn ncols(&self) -> usize {
        *self.col_offsets.last().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_by_two_matches_assembled_csr() {
        // [[2, 1], [1, 2]] split into four 1x1 blocks, off-diagonals CSR
        let cell = |v: f64| {
            Some(BlcBlock::Csr(
                CsrMatrix::new(1, 1, vec![0, 1], vec![0], vec![v]).unwrap(),
            ))
        };
        let blc = BlcMatrix::new(2, 2, vec![cell(2.0), cell(1.0), cell(1.0), cell(2.0)]).unwrap();
        let x = vec![1.0, -2.0];
        let mut y = vec![0.0; 2];
        blc.spmv(&x, &mut y);
        assert_eq!(y, vec![0.0, -3.0]);
    }

    #[test]
    fn empty_cells_are_skipped() {
        // saddle-point shape [[A, B], [B, 0]] with 1x1 cells
        let a = Some(BlcBlock::Csr(
            CsrMatrix::new(1, 1, vec![0, 1], vec![0], vec![4.0]).unwrap(),
        ));
        let b1 = Some(BlcBlock::Csr(
            CsrMatrix::new(1, 1, vec![0, 1], vec![0], vec![1.0]).unwrap(),
        ));
        let b2 = Some(BlcBlock::Csr(
            CsrMatrix::new(1, 1, vec![0, 1], vec![0], vec![1.0]).unwrap(),
        ));
        let blc = BlcMatrix::new(2, 2, vec![a, b1, b2, None]).unwrap();
        let x = vec![1.0, 2.0];
        let mut y = vec![0.0; 2];
        blc.spmv(&x, &mut y);
        assert_eq!(y, vec![6.0, 1.0]);
    }

    #[test]
    fn inconsistent_block_heights_are_rejected() {
        let one = Some(BlcBlock::Csr(
            CsrMatrix::new(1, 1, vec![0, 1], vec![0], vec![1.0]).unwrap(),
        ));
        let two = Some(BlcBlock::Csr(
            CsrMatrix::new(2, 1, vec![0, 1, 2], vec![0, 0], vec![1.0, 1.0]).unwrap(),
        ));
        let bad = BlcMatrix::new(1, 2, vec![one, two]);
        assert!(matches!(bad, Err(KsparError::Format(_))));
    }
}

//! Structured/banded storage for matrices on a regular 3-D grid.
//!
//! Each of the `ngrid = nx·ny·nz` grid points carries `nc` unknowns. The
//! mandatory main diagonal holds one dense `nc × nc` block per grid point;
//! each off-diagonal band couples grid points a fixed grid-stride `offset`
//! apart and stores `(ngrid − |offset|)` blocks. Bands are clipped at the
//! grid boundary; a band whose |offset| reaches `ngrid` is empty.

use num_traits::Float;

use crate::core::traits::{Indexing, MatVec};
use crate::error::KsparError;

#[derive(Clone, Debug, PartialEq)]
pub struct Band<T> {
    pub offset: isize,
    pub data: Vec<T>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StrMatrix<T> {
    nx: usize,
    ny: usize,
    nz: usize,
    nc: usize,
    ngrid: usize,
    diag: Vec<T>,
    bands: Vec<Band<T>>,
}

impl<T: Float + Send + Sync> StrMatrix<T> {
    pub fn new(
        nx: usize,
        ny: usize,
        nz: usize,
        nc: usize,
        diag: Vec<T>,
        bands: Vec<Band<T>>,
    ) -> Result<Self, KsparError> {
        let ngrid = nx * ny * nz;
        if nc == 0 || ngrid == 0 {
            return Err(KsparError::Format(
                "STR grid and component counts must be positive".into(),
            ));
        }
        if diag.len() != ngrid * nc * nc {
            return Err(KsparError::Format(format!(
                "STR diagonal length {} does not equal ngrid·nc² = {}",
                diag.len(),
                ngrid * nc * nc
            )));
        }
        for (k, band) in bands.iter().enumerate() {
            if band.offset == 0 {
                return Err(KsparError::Format("STR band offset must be nonzero".into()));
            }
            let width = ngrid.saturating_sub(band.offset.unsigned_abs());
            if band.data.len() != width * nc * nc {
                return Err(KsparError::Format(format!(
                    "STR band {} (offset {}) has length {}, expected {}",
                    k,
                    band.offset,
                    band.data.len(),
                    width * nc * nc
                )));
            }
            if bands[..k].iter().any(|b| b.offset == band.offset) {
                return Err(KsparError::Format(format!(
                    "STR band offset {} repeated",
                    band.offset
                )));
            }
        }
        Ok(Self {
            nx,
            ny,
            nz,
            nc,
            ngrid,
            diag,
            bands,
        })
    }

    pub fn grid_dims(&self) -> (usize, usize, usize) {
        (self.nx, self.ny, self.nz)
    }

    pub fn ngrid(&self) -> usize {
        self.ngrid
    }

    pub fn ncomp(&self) -> usize {
        self.nc
    }

    pub fn nband(&self) -> usize {
        self.bands.len()
    }

    // y[g·nc..] += α · blk · x[h·nc..] for the nc×nc block at `base`.
    #[inline]
    fn block_mult(&self, data: &[T], base: usize, alpha: T, x: &[T], g: usize, h: usize, y: &mut [T]) {
        let nc = self.nc;
        for r in 0..nc {
            let mut sum = T::zero();
            for c in 0..nc {
                sum = sum + data[base + r * nc + c] * x[h * nc + c];
            }
            y[g * nc + r] = y[g * nc + r] + alpha * sum;
        }
    }

    fn accumulate(&self, alpha: T, x: &[T], y: &mut [T]) {
        let nc2 = self.nc * self.nc;
        // main diagonal: one block per grid point
        for g in 0..self.ngrid {
            self.block_mult(&self.diag, g * nc2, alpha, x, g, g, y);
        }
        // off-diagonal bands, clipped at the boundary
        for band in &self.bands {
            let stride = band.offset.unsigned_abs();
            if stride >= self.ngrid {
                continue;
            }
            let width = self.ngrid - stride;
            for k in 0..width {
                let (g, h) = if band.offset > 0 {
                    (k, k + stride)
                } else {
                    (k + stride, k)
                };
                self.block_mult(&band.data, k * nc2, alpha, x, g, h, y);
            }
        }
    }

    /// y ← Ax: stream the diagonal, then each band shifted by its offset.
    pub fn spmv(&self, x: &[T], y: &mut [T]) {
        assert_eq!(x.len(), self.ngrid * self.nc);
        assert_eq!(y.len(), self.ngrid * self.nc);
        for yi in y.iter_mut() {
            *yi = T::zero();
        }
        self.accumulate(T::one(), x, y);
    }

    /// y ← αAx + βy.
    pub fn spmv_axpby(&self, alpha: T, x: &[T], beta: T, y: &mut [T]) {
        assert_eq!(x.len(), self.ngrid * self.nc);
        assert_eq!(y.len(), self.ngrid * self.nc);
        for yi in y.iter_mut() {
            *yi = beta * *yi;
        }
        self.accumulate(alpha, x, y);
    }
}

impl<T: Float + Send + Sync> MatVec<T> for StrMatrix<T> {
    fn matvec(&self, x: &[T], y: &mut [T]) {
        self.spmv(x, y)
    }
}

impl<T> Indexing for StrMatrix<T> {
    fn nrows(&self) -> usize {
        self.ngrid * self.nc
    }
    fn ncols(&self) -> usize {
        self.ngrid * self.nc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 1-D Laplacian on 4 points: diag 2, off-diagonals -1 at offsets ±1.
    fn laplacian_1d(n: usize) -> StrMatrix<f64> {
        StrMatrix::new(
            n,
            1,
            1,
            1,
            vec![2.0; n],
            vec![
                Band {
                    offset: 1,
                    data: vec![-1.0; n - 1],
                },
                Band {
                    offset: -1,
                    data: vec![-1.0; n - 1],
                },
            ],
        )
        .unwrap()
    }

    #[test]
    fn laplacian_spmv() {
        let m = laplacian_1d(4);
        let x = vec![1.0, 2.0, 3.0, 4.0];
        let mut y = vec![0.0; 4];
        m.spmv(&x, &mut y);
        assert_eq!(y, vec![0.0, 0.0, 0.0, 5.0]);
    }

    #[test]
    fn repeated_offset_is_rejected() {
        let bad = StrMatrix::<f64>::new(
            3,
            1,
            1,
            1,
            vec![1.0; 3],
            vec![
                Band {
                    offset: 1,
                    data: vec![0.0; 2],
                },
                Band {
                    offset: 1,
                    data: vec![0.0; 2],
                },
            ],
        );
        assert!(matches!(bad, Err(KsparError::Format(_))));
    }

    #[test]
    fn zero_offset_is_rejected() {
        let bad = StrMatrix::<f64>::new(
            2,
            1,
            1,
            1,
            vec![1.0; 2],
            vec![Band {
                offset: 0,
                data: vec![0.0; 2],
            }],
        );
        assert!(matches!(bad, Err(KsparError::Format(_))));
    }

    #[test]
    fn multicomponent_diag() {
        // one grid point, nc = 2, diag block [[1,2],[3,4]]
        let m = StrMatrix::new(1, 1, 1, 2, vec![1.0, 2.0, 3.0, 4.0], vec![]).unwrap();
        let x = vec![1.0, 1.0];
        let mut y = vec![0.0; 2];
        m.spmv(&x, &mut y);
        assert_eq!(y, vec![3.0, 7.0]);
    }
}

//! Shared builders for the integration tests: model problems and a diagonal
//! preconditioner (the crate itself ships no preconditioner).

#![allow(dead_code)]

use kspar::{CooMatrix, CsrMatrix, KsparError, Preconditioner};

/// 5-point 2-D Poisson stencil on an `nx × ny` interior grid (Dirichlet
/// boundary): diagonal 4, neighbors −1, row-major grid numbering.
pub fn poisson2d(nx: usize, ny: usize) -> CsrMatrix<f64> {
    let n = nx * ny;
    let mut rowind = Vec::new();
    let mut colind = Vec::new();
    let mut val = Vec::new();
    for j in 0..ny {
        for i in 0..nx {
            let row = j * nx + i;
            rowind.push(row);
            colind.push(row);
            val.push(4.0);
            if i > 0 {
                rowind.push(row);
                colind.push(row - 1);
                val.push(-1.0);
            }
            if i + 1 < nx {
                rowind.push(row);
                colind.push(row + 1);
                val.push(-1.0);
            }
            if j > 0 {
                rowind.push(row);
                colind.push(row - nx);
                val.push(-1.0);
            }
            if j + 1 < ny {
                rowind.push(row);
                colind.push(row + nx);
                val.push(-1.0);
            }
        }
    }
    CooMatrix::new(n, n, rowind, colind, val).unwrap().to_csr()
}

/// 1-D advection-diffusion with first-order upwinding of the advection term:
/// rows `[-(1 + c), 2 + c, -1]`, Dirichlet boundaries. Nonsymmetric for any
/// `c > 0`.
pub fn upwind_advection_diffusion(n: usize, c: f64) -> CsrMatrix<f64> {
    let mut rowind = Vec::new();
    let mut colind = Vec::new();
    let mut val = Vec::new();
    for i in 0..n {
        if i > 0 {
            rowind.push(i);
            colind.push(i - 1);
            val.push(-(1.0 + c));
        }
        rowind.push(i);
        colind.push(i);
        val.push(2.0 + c);
        if i + 1 < n {
            rowind.push(i);
            colind.push(i + 1);
            val.push(-1.0);
        }
    }
    CooMatrix::new(n, n, rowind, colind, val).unwrap().to_csr()
}

/// Diagonal matrix in CSR form.
pub fn diag_csr(values: &[f64]) -> CsrMatrix<f64> {
    let n = values.len();
    CsrMatrix::new(
        n,
        n,
        (0..=n).collect(),
        (0..n).collect(),
        values.to_vec(),
    )
    .unwrap()
}

/// Diagonal (Jacobi-style) preconditioner built from a matrix diagonal.
pub struct DiagPc {
    inv_diag: Vec<f64>,
}

impl DiagPc {
    pub fn from_matrix(a: &CsrMatrix<f64>) -> Self {
        Self {
            inv_diag: a
                .diagonal()
                .iter()
                .map(|&d| if d != 0.0 { 1.0 / d } else { 0.0 })
                .collect(),
        }
    }
}

impl Preconditioner<f64> for DiagPc {
    fn apply(&self, r: &[f64], z: &mut [f64]) -> Result<(), KsparError> {
        for (zi, (&ri, &d)) in z.iter_mut().zip(r.iter().zip(&self.inv_diag)) {
            *zi = ri * d;
        }
        Ok(())
    }
}

/// ‖b − Ax‖₂ / ‖b‖₂ recomputed from scratch.
pub fn recomputed_relres(a: &CsrMatrix<f64>, b: &[f64], x: &[f64]) -> f64 {
    let mut ax = vec![0.0; b.len()];
    a.spmv(x, &mut ax);
    let rnorm = ax
        .iter()
        .zip(b)
        .map(|(&axi, &bi)| (bi - axi) * (bi - axi))
        .sum::<f64>()
        .sqrt();
    let bnorm = b.iter().map(|&bi| bi * bi).sum::<f64>().sqrt();
    rnorm / bnorm.max(1e-300)
}

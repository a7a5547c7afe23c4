//! Right-preconditioned restarted GMRES (Saad §6.5).
//!
//! Modified Gram–Schmidt orthogonalization with an incremental Givens
//! least-squares solve. Workspace is on the order of
//! `(restart+4)(restart+n)` reals; when that allocation fails the restart
//! value is shrunk by 5 and retried until it would fall below 5. When the
//! Hessenberg-implicit residual claims convergence, the true residual
//! `b − Ax` is recomputed and re-tested; a false claim logs one notice and
//! iteration continues from the true residual.

use num_traits::{Float, ToPrimitive};

use crate::config::options::{PrintLevel, StopType, SMALLREAL};
use crate::core::traits::MatVec;
use crate::error::KsparError;
use crate::preconditioner::{apply_or_copy, Preconditioner};
use crate::solver::KrylovSolver;
use crate::utils::convergence::{Convergence, SolveStats};
use crate::utils::{array, itinfo, workspace};

const METHOD: &str = "GMRes";

/// Krylov basis, Hessenberg and Givens storage for one restart cycle,
/// shared by the whole GMRES family.
pub(crate) struct ArnoldiWorkspace<T> {
    /// `m + 1` basis vectors of length n.
    pub p: Vec<Vec<T>>,
    /// `m` preconditioned basis vectors; empty unless flexible.
    pub z: Vec<Vec<T>>,
    /// Single preconditioned-vector buffer for the non-flexible variants.
    pub zbuf: Vec<T>,
    /// Residual / recombination buffer.
    pub r: Vec<T>,
    /// `(m + 1) × m` Hessenberg matrix.
    pub hh: Vec<Vec<T>>,
    pub c: Vec<T>,
    pub s: Vec<T>,
    pub rs: Vec<T>,
}

impl<T: Float> ArnoldiWorkspace<T> {
    fn alloc(n: usize, m: usize, flexible: bool) -> Result<Self, KsparError> {
        let mut p = Vec::with_capacity(m + 1);
        for _ in 0..=m {
            p.push(workspace::alloc(n)?);
        }
        let mut z = Vec::new();
        if flexible {
            for _ in 0..m {
                z.push(workspace::alloc(n)?);
            }
        }
        let mut hh = Vec::with_capacity(m + 1);
        for _ in 0..=m {
            hh.push(workspace::alloc(m)?);
        }
        Ok(Self {
            p,
            z,
            zbuf: workspace::alloc(n)?,
            r: workspace::alloc(n)?,
            hh,
            c: workspace::alloc(m)?,
            s: workspace::alloc(m)?,
            rs: workspace::alloc(m + 1)?,
        })
    }

    /// Allocate for the requested restart, shrinking by 5 on failure until
    /// the restart would fall below 5. Returns the restart actually used.
    pub(crate) fn alloc_shrinking(
        n: usize,
        restart: usize,
        flexible: bool,
    ) -> Result<(Self, usize), KsparError> {
        let mut m = restart.max(1);
        loop {
            match Self::alloc(n, m, flexible) {
                Ok(ws) => return Ok((ws, m)),
                Err(err) => {
                    if m <= 5 {
                        return Err(err);
                    }
                    m = m.saturating_sub(5).max(1);
                }
            }
        }
    }
}

/// Apply the stored rotations to Hessenberg column `i − 1`, compute the new
/// rotation, and rotate `rs`. Returns the updated implicit residual |rs[i]|.
pub(crate) fn givens_update<T: Float>(
    hh: &mut [Vec<T>],
    c: &mut [T],
    s: &mut [T],
    rs: &mut [T],
    i: usize,
    small: T,
) -> T {
    for j in 1..i {
        let t = hh[j - 1][i - 1];
        hh[j - 1][i - 1] = s[j - 1] * hh[j][i - 1] + c[j - 1] * t;
        hh[j][i - 1] = -s[j - 1] * t + c[j - 1] * hh[j][i - 1];
    }
    let mut gamma =
        (hh[i][i - 1] * hh[i][i - 1] + hh[i - 1][i - 1] * hh[i - 1][i - 1]).sqrt();
    if gamma == T::zero() {
        gamma = small;
    }
    c[i - 1] = hh[i - 1][i - 1] / gamma;
    s[i - 1] = hh[i][i - 1] / gamma;
    rs[i] = -s[i - 1] * rs[i - 1];
    rs[i - 1] = c[i - 1] * rs[i - 1];
    hh[i - 1][i - 1] = s[i - 1] * hh[i][i - 1] + c[i - 1] * hh[i - 1][i - 1];
    rs[i].abs()
}

/// Back-substitution on the rotated Hessenberg: overwrites `rs[..i]` with the
/// least-squares coefficients.
pub(crate) fn solve_upper_triangular<T: Float>(hh: &[Vec<T>], rs: &mut [T], i: usize) {
    rs[i - 1] = rs[i - 1] / hh[i - 1][i - 1];
    for k in (0..i.saturating_sub(1)).rev() {
        let mut t = rs[k];
        for j in k + 1..i {
            t = t - hh[k][j] * rs[j];
        }
        rs[k] = t / hh[k][k];
    }
}

/// Rebuild the residual vector in `p[0]` from the rotated basis without a
/// matrix-vector product; used when a cycle ends before convergence.
pub(crate) fn residual_recombination<T: Float + Send + Sync>(
    p: &mut [Vec<T>],
    c: &[T],
    s: &[T],
    rs: &mut [T],
    i: usize,
) {
    for j in (1..=i).rev() {
        rs[j - 1] = -s[j - 1] * rs[j];
        rs[j] = c[j - 1] * rs[j];
    }
    if i > 0 {
        let (head, tail) = p.split_at_mut(i);
        let pi = &mut tail[0];
        array::scale(rs[i], pi);
        for j in (1..i).rev() {
            array::axpy(rs[j], &head[j], pi);
        }
        array::scale(rs[0], &mut head[0]);
        array::axpy(T::one(), &*pi, &mut head[0]);
    }
}

pub struct GmresSolver<T> {
    pub conv: Convergence<T>,
    pub restart: usize,
    pub print_level: PrintLevel,
    /// Implicit residual |rs[i]| after each iteration of the most recent
    /// solve; non-increasing within a restart cycle by construction.
    pub residual_history: Vec<T>,
}

impl<T: Float + Send + Sync> GmresSolver<T> {
    pub fn new(restart: usize, tol: T, max_iter: usize) -> Self {
        Self {
            conv: Convergence::new(StopType::RelRes, tol, max_iter),
            restart,
            print_level: PrintLevel::None,
            residual_history: Vec::new(),
        }
    }

    pub fn with_stop_type(mut self, stop_type: StopType) -> Self {
        self.conv.stop_type = stop_type;
        self
    }

    pub fn with_print_level(mut self, level: PrintLevel) -> Self {
        self.print_level = level;
        self
    }
}

impl<T: Float + Send + Sync> KrylovSolver<T> for GmresSolver<T> {
    fn solve(
        &mut self,
        a: &dyn MatVec<T>,
        pc: Option<&dyn Preconditioner<T>>,
        b: &[T],
        x: &mut [T],
    ) -> Result<SolveStats<T>, KsparError> {
        let n = b.len();
        let small = T::from(SMALLREAL).unwrap();
        self.residual_history.clear();
        let restart = self.restart.min(self.conv.max_iter.max(1));
        let (mut ws, m) = ArnoldiWorkspace::<T>::alloc_shrinking(n, restart, false)?;
        if m < restart && self.print_level > PrintLevel::Min {
            println!("### WARNING: GMRes restart number reduced to {}", m);
        }

        // r0 = b - A x, kept in p[0]
        a.matvec(x, &mut ws.p[0]);
        array::axpby(T::one(), b, -T::one(), &mut ws.p[0]);

        array::copy(&ws.p[0], &mut ws.r);
        let den = self.conv.denominator(b, &ws.r, pc, &mut ws.zbuf)?;
        let mut r_norm = array::norm2(&ws.p[0]);
        let epsilon = self.conv.tol * den;
        let mut relres = r_norm / den;
        itinfo::print_itinfo(
            self.print_level,
            self.conv.stop_type,
            0,
            relres,
            r_norm,
            T::zero(),
        );
        if r_norm <= epsilon || r_norm < self.conv.tol * T::from(1e-3).unwrap() {
            itinfo::print_final(self.print_level, METHOD, 0, relres);
            return Ok(SolveStats {
                iterations: 0,
                final_residual: r_norm,
                relative_residual: relres,
                converged: true,
            });
        }

        let mut iter = 0usize;
        while iter < self.conv.max_iter {
            ws.rs[0] = r_norm;
            if r_norm == T::zero() {
                break;
            }
            array::scale(T::one() / r_norm, &mut ws.p[0]);

            // restart cycle (right preconditioning)
            let mut i = 0usize;
            while i < m && iter < self.conv.max_iter {
                i += 1;
                iter += 1;
                apply_or_copy(pc, &ws.p[i - 1], &mut ws.zbuf)?;
                {
                    let (head, tail) = ws.p.split_at_mut(i);
                    let pi = &mut tail[0];
                    a.matvec(&ws.zbuf, pi);
                    // modified Gram–Schmidt
                    for j in 0..i {
                        ws.hh[j][i - 1] = array::dot(&head[j], pi);
                        array::axpy(-ws.hh[j][i - 1], &head[j], pi);
                    }
                    let t = array::norm2(pi);
                    ws.hh[i][i - 1] = t;
                    if t != T::zero() {
                        array::scale(T::one() / t, pi);
                    }
                }
                let absres_old = r_norm;
                r_norm = givens_update(&mut ws.hh, &mut ws.c, &mut ws.s, &mut ws.rs, i, small);
                self.residual_history.push(r_norm);
                relres = r_norm / den;
                itinfo::print_itinfo(
                    self.print_level,
                    self.conv.stop_type,
                    iter,
                    relres,
                    r_norm,
                    r_norm / absres_old.max(small),
                );
                if r_norm <= epsilon {
                    break;
                }
            }

            // least-squares coefficients, then x += M⁻¹ (Σ rs_j p_j)
            solve_upper_triangular(&ws.hh, &mut ws.rs, i);
            array::copy(&ws.p[i - 1], &mut ws.r);
            array::scale(ws.rs[i - 1], &mut ws.r);
            for j in (0..i.saturating_sub(1)).rev() {
                array::axpy(ws.rs[j], &ws.p[j], &mut ws.r);
            }
            apply_or_copy(pc, &ws.r, &mut ws.zbuf)?;
            array::axpy(T::one(), &ws.zbuf, x);

            if r_norm <= epsilon {
                // re-test against the recomputed residual
                a.matvec(x, &mut ws.r);
                array::axpby(T::one(), b, -T::one(), &mut ws.r);
                r_norm = array::norm2(&ws.r);
                apply_or_copy(pc, &ws.r, &mut ws.zbuf)?;
                let absres = self.conv.absres(&ws.r, &ws.zbuf);
                relres = self.conv.relres(absres, den, x);
                if self.conv.is_converged(relres) {
                    itinfo::print_final(self.print_level, METHOD, iter, relres);
                    return Ok(SolveStats {
                        iterations: iter,
                        final_residual: absres,
                        relative_residual: relres,
                        converged: true,
                    });
                }
                itinfo::print_false_convergence(self.print_level);
                array::copy(&ws.r, &mut ws.p[0]);
                continue;
            }

            // rebuild the residual vector in p[0] and continue
            residual_recombination(&mut ws.p, &ws.c, &ws.s, &mut ws.rs, i);
        }

        Err(KsparError::MaxIter {
            method: METHOD,
            iterations: self.conv.max_iter,
            residual: relres.to_f64().unwrap_or(f64::NAN),
        })
    }
}

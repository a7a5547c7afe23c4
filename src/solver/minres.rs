//! Preconditioned MINRES (Paige & Saunders; Saad §6.5.3).
//!
//! Minimum-residual method for symmetric, possibly indefinite systems. The
//! Lanczos three-term recurrence is combined with a running Givens rotation
//! on the tridiagonal; the preconditioner must be symmetric positive
//! definite, and a negative ⟨r, M⁻¹r⟩ is reported as breakdown.

use num_traits::{Float, ToPrimitive};

use crate::config::options::{PrintLevel, StopType, SMALLREAL};
use crate::core::traits::MatVec;
use crate::error::KsparError;
use crate::preconditioner::{apply_or_copy, Preconditioner};
use crate::solver::KrylovSolver;
use crate::utils::convergence::{Convergence, ResidualWatch, SolveStats};
use crate::utils::{array, itinfo, workspace};

const METHOD: &str = "MinRes";

pub struct MinresSolver<T> {
    pub conv: Convergence<T>,
    pub print_level: PrintLevel,
}

impl<T: Float + Send + Sync> MinresSolver<T> {
    pub fn new(tol: T, max_iter: usize) -> Self {
        Self {
            conv: Convergence::new(StopType::RelRes, tol, max_iter),
            print_level: PrintLevel::None,
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

    /// Recompute `b − Ax` and evaluate the stopping quantities against it.
    fn true_residual(
        &self,
        a: &dyn MatVec<T>,
        pc: Option<&dyn Preconditioner<T>>,
        b: &[T],
        x: &[T],
        den: T,
        r: &mut [T],
        z: &mut [T],
    ) -> Result<(T, T), KsparError> {
        a.matvec(x, r);
        array::axpby(T::one(), b, -T::one(), r);
        apply_or_copy(pc, r, z)?;
        let absres = self.conv.absres(r, z);
        let relres = self.conv.relres(absres, den, x);
        Ok((absres, relres))
    }
}

impl<T: Float + Send + Sync> KrylovSolver<T> for MinresSolver<T> {
    fn solve(
        &mut self,
        a: &dyn MatVec<T>,
        pc: Option<&dyn Preconditioner<T>>,
        b: &[T],
        x: &mut [T],
    ) -> Result<SolveStats<T>, KsparError> {
        let n = b.len();
        let small = T::from(SMALLREAL).unwrap();

        let mut r1 = workspace::alloc::<T>(n)?;
        let mut r2 = workspace::alloc::<T>(n)?;
        let mut y = workspace::alloc::<T>(n)?;
        let mut v = workspace::alloc::<T>(n)?;
        let mut w = workspace::alloc::<T>(n)?;
        let mut w1 = workspace::alloc::<T>(n)?;
        let mut w2 = workspace::alloc::<T>(n)?;
        let mut rt = workspace::alloc::<T>(n)?;
        let mut zt = workspace::alloc::<T>(n)?;

        // r1 = b - A x, y = M⁻¹ r1
        a.matvec(x, &mut r1);
        array::axpby(T::one(), b, -T::one(), &mut r1);
        apply_or_copy(pc, &r1, &mut y)?;

        let den = self.conv.denominator(b, &r1, pc, &mut v)?;
        let beta1_sq = array::dot(&r1, &y);
        if beta1_sq < T::zero() {
            return Err(KsparError::Breakdown {
                method: METHOD,
                iterations: 0,
            });
        }
        let beta1 = beta1_sq.sqrt();
        let mut absres = self.conv.absres(&r1, &y);
        let mut relres = self.conv.relres(absres, den, x);
        itinfo::print_itinfo(
            self.print_level,
            self.conv.stop_type,
            0,
            relres,
            absres,
            T::zero(),
        );
        if beta1 <= small || self.conv.is_converged(relres) {
            itinfo::print_final(self.print_level, METHOD, 0, relres);
            return Ok(SolveStats {
                iterations: 0,
                final_residual: absres,
                relative_residual: relres,
                converged: true,
            });
        }

        array::copy(&r1, &mut r2);

        let mut oldb = T::zero();
        let mut beta = beta1;
        let mut dbar = T::zero();
        let mut epsln = T::zero();
        let mut phibar = beta1;
        let mut cs = -T::one();
        let mut sn = T::zero();
        let mut watch = ResidualWatch::new(METHOD);

        for iter in 1..=self.conv.max_iter {
            // Lanczos step on the preconditioned operator
            let s = T::one() / beta;
            array::copy(&y, &mut v);
            array::scale(s, &mut v);
            a.matvec(&v, &mut y);
            if iter >= 2 {
                array::axpy(-(beta / oldb), &r1, &mut y);
            }
            let alfa = array::dot(&v, &y);
            array::axpy(-(alfa / beta), &r2, &mut y);
            std::mem::swap(&mut r1, &mut r2);
            std::mem::swap(&mut r2, &mut y);
            apply_or_copy(pc, &r2, &mut y)?;
            oldb = beta;
            let beta_sq = array::dot(&r2, &y);
            if beta_sq < T::zero() {
                return Err(KsparError::Breakdown {
                    method: METHOD,
                    iterations: iter,
                });
            }
            beta = beta_sq.sqrt();

            // previous rotation applied to the new tridiagonal column
            let oldeps = epsln;
            let delta = cs * dbar + sn * alfa;
            let gbar = sn * dbar - cs * alfa;
            epsln = sn * beta;
            dbar = -cs * beta;

            // current rotation annihilating the subdiagonal
            let gamma = (gbar * gbar + beta * beta).sqrt().max(small);
            cs = gbar / gamma;
            sn = beta / gamma;
            let phi = cs * phibar;
            phibar = sn * phibar;

            // w-recurrence and solution update
            std::mem::swap(&mut w1, &mut w2);
            std::mem::swap(&mut w2, &mut w);
            for i in 0..n {
                w[i] = (v[i] - oldeps * w1[i] - delta * w2[i]) / gamma;
            }
            array::axpy(phi, &w, x);

            let absres_old = absres;
            absres = phibar.abs();
            relres = self.conv.relres(absres, den, x);
            itinfo::print_itinfo(
                self.print_level,
                self.conv.stop_type,
                iter,
                relres,
                absres,
                absres / absres_old.max(small),
            );
            watch.observe(relres, iter)?;

            let lanczos_exhausted = beta <= small;
            if self.conv.is_converged(relres) || lanczos_exhausted {
                let (true_abs, true_rel) =
                    self.true_residual(a, pc, b, x, den, &mut rt, &mut zt)?;
                if self.conv.is_converged(true_rel) {
                    itinfo::print_final(self.print_level, METHOD, iter, true_rel);
                    return Ok(SolveStats {
                        iterations: iter,
                        final_residual: true_abs,
                        relative_residual: true_rel,
                        converged: true,
                    });
                }
                if lanczos_exhausted {
                    // Krylov space exhausted without reaching the tolerance
                    return Err(KsparError::Breakdown {
                        method: METHOD,
                        iterations: iter,
                    });
                }
                itinfo::print_false_convergence(self.print_level);
            }
        }

        Err(KsparError::MaxIter {
            method: METHOD,
            iterations: self.conv.max_iter,
            residual: relres.to_f64().unwrap_or(f64::NAN),
        })
    }
}

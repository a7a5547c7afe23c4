//! Preconditioned Conjugate Gradient (Saad §9.2).
//!
//! Requires a symmetric positive-definite matrix and preconditioner. When the
//! convergence test passes on the recurrence residual, the true residual
//! `b − Ax` is recomputed and re-tested before convergence is declared.

use num_traits::Float;

use crate::config::options::{PrintLevel, StopType, SMALLREAL};
use crate::core::traits::MatVec;
use crate::error::KsparError;
use crate::preconditioner::{apply_or_copy, Preconditioner};
use crate::solver::KrylovSolver;
use crate::utils::convergence::{Convergence, ResidualWatch, SolveStats};
use crate::utils::{array, itinfo, workspace};

const METHOD: &str = "CG";

pub struct CgSolver<T> {
    pub conv: Convergence<T>,
    pub print_level: PrintLevel,
}

impl<T: Float + Send + Sync> CgSolver<T> {
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
}

impl<T: Float + Send + Sync> KrylovSolver<T> for CgSolver<T> {
    fn solve(
        &mut self,
        a: &dyn MatVec<T>,
        pc: Option<&dyn Preconditioner<T>>,
        b: &[T],
        x: &mut [T],
    ) -> Result<SolveStats<T>, KsparError> {
        let n = b.len();
        let small = T::from(SMALLREAL).unwrap();

        let mut r = workspace::alloc::<T>(n)?;
        let mut z = workspace::alloc::<T>(n)?;
        let mut p = workspace::alloc::<T>(n)?;
        let mut ap = workspace::alloc::<T>(n)?;

        // r = b - A x
        a.matvec(x, &mut r);
        array::axpby(T::one(), b, -T::one(), &mut r);
        apply_or_copy(pc, &r, &mut z)?;

        let den = self.conv.denominator(b, &r, pc, &mut ap)?;
        let mut absres = self.conv.absres(&r, &z);
        let mut relres = self.conv.relres(absres, den, x);
        itinfo::print_itinfo(
            self.print_level,
            self.conv.stop_type,
            0,
            relres,
            absres,
            T::zero(),
        );
        if self.conv.is_converged(relres) {
            itinfo::print_final(self.print_level, METHOD, 0, relres);
            return Ok(SolveStats {
                iterations: 0,
                final_residual: absres,
                relative_residual: relres,
                converged: true,
            });
        }

        array::copy(&z, &mut p);
        let mut rho = array::dot(&r, &z);
        let mut watch = ResidualWatch::new(METHOD);

        for iter in 1..=self.conv.max_iter {
            a.matvec(&p, &mut ap);
            let pap = array::dot(&p, &ap);
            if pap.abs() <= small {
                return Err(KsparError::Breakdown {
                    method: METHOD,
                    iterations: iter,
                });
            }
            let alpha = rho / pap;
            array::axpy(alpha, &p, x);
            array::axpy(-alpha, &ap, &mut r);
            apply_or_copy(pc, &r, &mut z)?;

            let absres_old = absres;
            absres = self.conv.absres(&r, &z);
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

            if self.conv.is_converged(relres) {
                // re-test against the recomputed residual
                a.matvec(x, &mut ap);
                array::copy(b, &mut r);
                array::axpy(-T::one(), &ap, &mut r);
                apply_or_copy(pc, &r, &mut z)?;
                absres = self.conv.absres(&r, &z);
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
                rho = array::dot(&r, &z);
                array::copy(&z, &mut p);
                continue;
            }

            let rho_new = array::dot(&r, &z);
            let beta = rho_new / rho;
            rho = rho_new;
            // p = z + beta p
            array::axpby(T::one(), &z, beta, &mut p);
        }

        Err(KsparError::MaxIter {
            method: METHOD,
            iterations: self.conv.max_iter,
            residual: num_traits::ToPrimitive::to_f64(&relres).unwrap_or(f64::NAN),
        })
    }
}

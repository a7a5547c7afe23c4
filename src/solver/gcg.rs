//! Preconditioned Generalized Conjugate Gradient.
//!
//! Short-recurrence residual-minimizing method for nonsymmetric systems with
//! an SPD preconditioner: the step length minimizes ‖r − αAp‖₂ and the new
//! search direction is A-image-orthogonalized against the previous one only,
//! so storage stays at a handful of vectors regardless of iteration count.

use num_traits::{Float, ToPrimitive};

use crate::config::options::{PrintLevel, StopType, SMALLREAL};
use crate::core::traits::MatVec;
use crate::error::KsparError;
use crate::preconditioner::{apply_or_copy, Preconditioner};
use crate::solver::KrylovSolver;
use crate::utils::convergence::{Convergence, ResidualWatch, SolveStats};
use crate::utils::{array, itinfo, workspace};

const METHOD: &str = "GCG";

pub struct GcgSolver<T> {
    pub conv: Convergence<T>,
    pub print_level: PrintLevel,
}

impl<T: Float + Send + Sync> GcgSolver<T> {
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

impl<T: Float + Send + Sync> KrylovSolver<T> for GcgSolver<T> {
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
        let mut az = workspace::alloc::<T>(n)?;

        // r = b - A x, z = M⁻¹ r, p = z, Ap
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
        a.matvec(&p, &mut ap);
        let mut watch = ResidualWatch::new(METHOD);

        for iter in 1..=self.conv.max_iter {
            let app = array::dot(&ap, &ap);
            if app <= small {
                return Err(KsparError::Breakdown {
                    method: METHOD,
                    iterations: iter,
                });
            }
            // residual-minimizing step along p
            let alpha = array::dot(&r, &ap) / app;
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
                a.matvec(x, &mut az);
                array::copy(b, &mut r);
                array::axpy(-T::one(), &az, &mut r);
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
                array::copy(&z, &mut p);
                a.matvec(&p, &mut ap);
                continue;
            }

            // A-image orthogonalization of the next direction
            a.matvec(&z, &mut az);
            let beta = -array::dot(&az, &ap) / app;
            array::axpby(T::one(), &z, beta, &mut p);
            array::axpby(T::one(), &az, beta, &mut ap);
        }

        Err(KsparError::MaxIter {
            method: METHOD,
            iterations: self.conv.max_iter,
            residual: relres.to_f64().unwrap_or(f64::NAN),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::CsrMatrix;

    #[test]
    fn gcg_solves_nonsymmetric_system() {
        // [[3,1,0],[0,2,1],[1,0,4]]
        let a = CsrMatrix::new(
            3,
            3,
            vec![0, 2, 4, 6],
            vec![0, 1, 1, 2, 0, 2],
            vec![3.0, 1.0, 2.0, 1.0, 1.0, 4.0],
        )
        .unwrap();
        let x_true = vec![1.0, -1.0, 2.0];
        let mut b = vec![0.0; 3];
        a.spmv(&x_true, &mut b);
        let mut x = vec![0.0; 3];
        let mut solver = GcgSolver::new(1e-10, 200);
        let stats = solver.solve(&a, None, &b, &mut x).unwrap();
        assert!(stats.converged);
        for (xi, ei) in x.iter().zip(x_true.iter()) {
            assert!((xi - ei).abs() < 1e-7, "xi = {}, expected = {}", xi, ei);
        }
    }

    #[test]
    fn gcg_solves_spd_system() {
        let a = CsrMatrix::new(
            2,
            2,
            vec![0, 2, 4],
            vec![0, 1, 0, 1],
            vec![4.0, 1.0, 1.0, 3.0],
        )
        .unwrap();
        let b = vec![1.0, 2.0];
        let mut x = vec![0.0; 2];
        let mut solver = GcgSolver::new(1e-10, 100);
        let stats = solver.solve(&a, None, &b, &mut x).unwrap();
        assert!(stats.converged);
        let expected = [0.09090909090909091, 0.6363636363636364];
        for (xi, ei) in x.iter().zip(expected.iter()) {
            assert!((xi - ei).abs() < 1e-8);
        }
    }
}

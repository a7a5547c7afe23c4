//! Preconditioned BiCGStab (Saad §7.4.2) and the variable variant that
//! refreshes the shadow residual on breakdown.
//!
//! Breakdown is signalled when ⟨r̂₀, r⟩, ⟨r̂₀, Ap̂⟩, ⟨t, t⟩ or ω become
//! numerically zero. The plain solver aborts immediately; the variable
//! variant restarts once with a fresh shadow vector `r̂₀ ← r` and only aborts
//! when the breakdown repeats before the next successful iteration.

use num_traits::{Float, ToPrimitive};

use crate::config::options::{PrintLevel, StopType, SMALLREAL};
use crate::core::traits::MatVec;
use crate::error::KsparError;
use crate::preconditioner::{apply_or_copy, Preconditioner};
use crate::solver::KrylovSolver;
use crate::utils::convergence::{Convergence, ResidualWatch, SolveStats};
use crate::utils::{array, itinfo, workspace};

pub struct BiCgStabSolver<T> {
    pub conv: Convergence<T>,
    pub print_level: PrintLevel,
}

impl<T: Float + Send + Sync> BiCgStabSolver<T> {
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

impl<T: Float + Send + Sync> KrylovSolver<T> for BiCgStabSolver<T> {
    fn solve(
        &mut self,
        a: &dyn MatVec<T>,
        pc: Option<&dyn Preconditioner<T>>,
        b: &[T],
        x: &mut [T],
    ) -> Result<SolveStats<T>, KsparError> {
        bcgs_core(a, pc, b, x, &self.conv, self.print_level, false, "BiCGstab")
    }
}

/// BiCGStab with shadow-residual restart on breakdown.
pub struct VBiCgStabSolver<T> {
    pub conv: Convergence<T>,
    pub print_level: PrintLevel,
}

impl<T: Float + Send + Sync> VBiCgStabSolver<T> {
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

impl<T: Float + Send + Sync> KrylovSolver<T> for VBiCgStabSolver<T> {
    fn solve(
        &mut self,
        a: &dyn MatVec<T>,
        pc: Option<&dyn Preconditioner<T>>,
        b: &[T],
        x: &mut [T],
    ) -> Result<SolveStats<T>, KsparError> {
        bcgs_core(a, pc, b, x, &self.conv, self.print_level, true, "VBiCGstab")
    }
}

#[allow(clippy::too_many_arguments)]
fn bcgs_core<T: Float + Send + Sync>(
    a: &dyn MatVec<T>,
    pc: Option<&dyn Preconditioner<T>>,
    b: &[T],
    x: &mut [T],
    conv: &Convergence<T>,
    print_level: PrintLevel,
    allow_refresh: bool,
    method: &'static str,
) -> Result<SolveStats<T>, KsparError> {
    let n = b.len();
    let small = T::from(SMALLREAL).unwrap();

    let mut r = workspace::alloc::<T>(n)?;
    let mut rhat = workspace::alloc::<T>(n)?;
    let mut p = workspace::alloc::<T>(n)?;
    let mut phat = workspace::alloc::<T>(n)?;
    let mut v = workspace::alloc::<T>(n)?;
    let mut shat = workspace::alloc::<T>(n)?;
    let mut t = workspace::alloc::<T>(n)?;

    // r = b - A x; the shadow residual starts as a copy of r
    a.matvec(x, &mut r);
    array::axpby(T::one(), b, -T::one(), &mut r);
    array::copy(&r, &mut rhat);

    let den = conv.denominator(b, &r, pc, &mut t)?;
    apply_or_copy(pc, &r, &mut shat)?;
    let mut absres = conv.absres(&r, &shat);
    let mut relres = conv.relres(absres, den, x);
    itinfo::print_itinfo(print_level, conv.stop_type, 0, relres, absres, T::zero());
    if conv.is_converged(relres) {
        itinfo::print_final(print_level, method, 0, relres);
        return Ok(SolveStats {
            iterations: 0,
            final_residual: absres,
            relative_residual: relres,
            converged: true,
        });
    }

    let mut rho_old = T::one();
    let mut alpha = T::one();
    let mut omega = T::one();
    let mut first = true;
    let mut refreshed = false;
    let mut watch = ResidualWatch::new(method);

    for iter in 1..=conv.max_iter {
        let rho = array::dot(&rhat, &r);
        if rho.abs() < small {
            if allow_refresh && !refreshed {
                array::copy(&r, &mut rhat);
                first = true;
                refreshed = true;
                continue;
            }
            return Err(KsparError::Breakdown {
                method,
                iterations: iter,
            });
        }

        if first {
            array::copy(&r, &mut p);
            first = false;
        } else {
            let beta = (rho / rho_old) * (alpha / omega);
            // p = r + beta (p - omega v)
            array::axpy(-omega, &v, &mut p);
            array::axpby(T::one(), &r, beta, &mut p);
        }

        apply_or_copy(pc, &p, &mut phat)?;
        a.matvec(&phat, &mut v);
        let rv = array::dot(&rhat, &v);
        if rv.abs() < small {
            if allow_refresh && !refreshed {
                array::copy(&r, &mut rhat);
                first = true;
                refreshed = true;
                continue;
            }
            return Err(KsparError::Breakdown {
                method,
                iterations: iter,
            });
        }
        alpha = rho / rv;

        // s = r - alpha v, kept in the residual buffer
        array::axpy(-alpha, &v, &mut r);
        apply_or_copy(pc, &r, &mut shat)?;
        a.matvec(&shat, &mut t);
        let tt = array::dot(&t, &t);
        if tt.abs() <= small {
            if allow_refresh && !refreshed {
                // complete the half-step so r stays consistent with x; the
                // half-step alone may already have converged
                array::axpy(alpha, &phat, x);
                apply_or_copy(pc, &r, &mut shat)?;
                absres = conv.absres(&r, &shat);
                relres = conv.relres(absres, den, x);
                if conv.is_converged(relres) {
                    itinfo::print_final(print_level, method, iter, relres);
                    return Ok(SolveStats {
                        iterations: iter,
                        final_residual: absres,
                        relative_residual: relres,
                        converged: true,
                    });
                }
                // otherwise restart with a fresh shadow vector
                array::copy(&r, &mut rhat);
                first = true;
                refreshed = true;
                continue;
            }
            return Err(KsparError::Breakdown {
                method,
                iterations: iter,
            });
        }
        omega = array::dot(&t, &r) / tt;

        // x += alpha p̂ + omega ŝ;  r = s - omega t
        array::axpy(alpha, &phat, x);
        array::axpy(omega, &shat, x);
        array::axpy(-omega, &t, &mut r);

        let absres_old = absres;
        apply_or_copy(pc, &r, &mut shat)?;
        absres = conv.absres(&r, &shat);
        relres = conv.relres(absres, den, x);
        itinfo::print_itinfo(
            print_level,
            conv.stop_type,
            iter,
            relres,
            absres,
            absres / absres_old.max(small),
        );
        watch.observe(relres, iter)?;

        if conv.is_converged(relres) {
            // re-test against the recomputed residual
            a.matvec(x, &mut t);
            array::copy(b, &mut r);
            array::axpy(-T::one(), &t, &mut r);
            apply_or_copy(pc, &r, &mut shat)?;
            absres = conv.absres(&r, &shat);
            relres = conv.relres(absres, den, x);
            if conv.is_converged(relres) {
                itinfo::print_final(print_level, method, iter, relres);
                return Ok(SolveStats {
                    iterations: iter,
                    final_residual: absres,
                    relative_residual: relres,
                    converged: true,
                });
            }
            itinfo::print_false_convergence(print_level);
            first = true;
            continue;
        }

        if omega.abs() < small {
            if allow_refresh && !refreshed {
                array::copy(&r, &mut rhat);
                first = true;
                refreshed = true;
                continue;
            }
            return Err(KsparError::Breakdown {
                method,
                iterations: iter,
            });
        }

        rho_old = rho;
        refreshed = false;
    }

    Err(KsparError::MaxIter {
        method,
        iterations: conv.max_iter,
        residual: relres.to_f64().unwrap_or(f64::NAN),
    })
}

//! Flexible GMRES with a variable restart parameter (Saad §9.4.1).
//!
//! The preconditioned basis vectors `z_i` are stored explicitly and the
//! correction is `x += Σ rs_i z_i`, so the preconditioner may change between
//! applications (a nested iterative preconditioner is allowed). The restart
//! parameter follows the same convergence-rate policy as the non-flexible
//! variable-restart solver. The true residual is only recomputed when the
//! implicit estimate claims convergence; mid-cycle drift is not corrected.

use num_traits::{Float, ToPrimitive};

use crate::config::options::{PrintLevel, StopType, SMALLREAL};
use crate::core::traits::MatVec;
use crate::error::KsparError;
use crate::preconditioner::{FixedAsFlexible, FlexiblePreconditioner, Preconditioner};
use crate::solver::gmres::{
    givens_update, residual_recombination, solve_upper_triangular, ArnoldiWorkspace,
};
use crate::solver::KrylovSolver;
use crate::utils::convergence::{Convergence, SolveStats};
use crate::utils::{array, itinfo};

const METHOD: &str = "vFGMRes";

const CR_MAX: f64 = 0.99;
const CR_MIN: f64 = 0.174;
const RESTART_STEP: usize = 3;
const RESTART_MIN: usize = 3;

pub struct VFGmresSolver<T> {
    pub conv: Convergence<T>,
    pub restart: usize,
    pub print_level: PrintLevel,
    /// Restart length chosen for each cycle of the most recent solve.
    pub restart_history: Vec<usize>,
}

impl<T: Float + Send + Sync> VFGmresSolver<T> {
    pub fn new(restart: usize, tol: T, max_iter: usize) -> Self {
        Self {
            conv: Convergence::new(StopType::RelRes, tol, max_iter),
            restart,
            print_level: PrintLevel::None,
            restart_history: Vec::new(),
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

    fn adapt_restart(current: usize, restart_max: usize, first_cycle: bool, cr: T) -> usize {
        if first_cycle || cr > T::from(CR_MAX).unwrap() {
            restart_max
        } else if cr < T::from(CR_MIN).unwrap() {
            current
        } else if current >= RESTART_STEP + RESTART_MIN {
            current - RESTART_STEP
        } else {
            restart_max
        }
    }

    /// Solve with a preconditioner whose action may change every application.
    pub fn solve_flexible(
        &mut self,
        a: &dyn MatVec<T>,
        mut pc: Option<&mut dyn FlexiblePreconditioner<T>>,
        b: &[T],
        x: &mut [T],
    ) -> Result<SolveStats<T>, KsparError> {
        let n = b.len();
        let small = T::from(SMALLREAL).unwrap();
        self.restart_history.clear();

        let restart = self.restart.min(self.conv.max_iter.max(1));
        let (mut ws, restart_max) = ArnoldiWorkspace::<T>::alloc_shrinking(n, restart, true)?;
        if restart_max < restart && self.print_level > PrintLevel::Min {
            println!("### WARNING: vFGMRes restart number reduced to {}", restart_max);
        }

        a.matvec(x, &mut ws.p[0]);
        array::axpby(T::one(), b, -T::one(), &mut ws.p[0]);

        let b_norm = array::norm2(b);
        let mut r_norm = array::norm2(&ws.p[0]);
        let den = if b_norm > T::zero() { b_norm } else { r_norm }.max(small);
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
        let mut m = restart_max;
        let mut cr = T::one();
        while iter < self.conv.max_iter {
            ws.rs[0] = r_norm;
            let r_norm_old = r_norm;
            if r_norm == T::zero() {
                break;
            }

            m = Self::adapt_restart(m, restart_max, iter == 0, cr);
            self.restart_history.push(m);

            array::scale(T::one() / r_norm, &mut ws.p[0]);

            // restart cycle (right preconditioning, stored z basis)
            let mut i = 0usize;
            while i < m && iter < self.conv.max_iter {
                i += 1;
                iter += 1;
                match pc.as_deref_mut() {
                    Some(p) => p.apply(&ws.p[i - 1], &mut ws.z[i - 1])?,
                    None => array::copy(&ws.p[i - 1], &mut ws.z[i - 1]),
                }
                {
                    let (head, tail) = ws.p.split_at_mut(i);
                    let pi = &mut tail[0];
                    a.matvec(&ws.z[i - 1], pi);
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

            // x += Σ rs_j z_j
            solve_upper_triangular(&ws.hh, &mut ws.rs, i);
            array::copy(&ws.z[i - 1], &mut ws.r);
            array::scale(ws.rs[i - 1], &mut ws.r);
            for j in (0..i.saturating_sub(1)).rev() {
                array::axpy(ws.rs[j], &ws.z[j], &mut ws.r);
            }
            array::axpy(T::one(), &ws.r, x);

            if r_norm <= epsilon {
                a.matvec(x, &mut ws.r);
                array::axpby(T::one(), b, -T::one(), &mut ws.r);
                r_norm = array::norm2(&ws.r);
                relres = r_norm / den;
                if r_norm <= epsilon {
                    itinfo::print_final(self.print_level, METHOD, iter, relres);
                    return Ok(SolveStats {
                        iterations: iter,
                        final_residual: r_norm,
                        relative_residual: relres,
                        converged: true,
                    });
                }
                itinfo::print_false_convergence(self.print_level);
                array::copy(&ws.r, &mut ws.p[0]);
                cr = r_norm / r_norm_old.max(small);
                continue;
            }

            residual_recombination(&mut ws.p, &ws.c, &ws.s, &mut ws.rs, i);
            cr = r_norm / r_norm_old.max(small);
        }

        Err(KsparError::MaxIter {
            method: METHOD,
            iterations: self.conv.max_iter,
            residual: relres.to_f64().unwrap_or(f64::NAN),
        })
    }
}

impl<T: Float + Send + Sync> KrylovSolver<T> for VFGmresSolver<T> {
    fn solve(
        &mut self,
        a: &dyn MatVec<T>,
        pc: Option<&dyn Preconditioner<T>>,
        b: &[T],
        x: &mut [T],
    ) -> Result<SolveStats<T>, KsparError> {
        match pc {
            Some(pc) => {
                let mut adapter = FixedAsFlexible(pc);
                self.solve_flexible(a, Some(&mut adapter), b, x)
            }
            None => self.solve_flexible(a, None, b, x),
        }
    }
}

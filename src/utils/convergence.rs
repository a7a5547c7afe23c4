//! Convergence tracking & tolerance checks shared by all Krylov cores.

use num_traits::{Float, ToPrimitive};

use crate::config::options::{StopType, BIGREAL, SMALLREAL};
use crate::error::KsparError;
use crate::preconditioner::{apply_or_copy, Preconditioner};
use crate::utils::array;

/// Residuals below `relres > DIVERGE_RATIO` abort the solve as divergent.
const DIVERGE_RATIO: f64 = 1e4;

/// Iterations without any residual improvement before declaring stagnation.
const STAG_WINDOW: usize = 50;

/// Outcome of a successful solve.
#[derive(Clone, Debug)]
pub struct SolveStats<T> {
    pub iterations: usize,
    /// Residual norm in the sense of the chosen stopping criterion.
    pub final_residual: T,
    /// `final_residual` divided by the stopping denominator.
    pub relative_residual: T,
    pub converged: bool,
}

/// Stopping criteria shared by every iteration core.
#[derive(Clone, Debug)]
pub struct Convergence<T> {
    pub stop_type: StopType,
    pub tol: T,
    pub max_iter: usize,
}

impl<T: Float + Send + Sync> Convergence<T> {
    pub fn new(stop_type: StopType, tol: T, max_iter: usize) -> Self {
        Self {
            stop_type,
            tol,
            max_iter,
        }
    }

    /// Stopping denominator fixed at entry: ‖b‖ in the requested norm, with
    /// ‖r₀‖ as the fallback for a zero right-hand side. `RelModRes`
    /// denominators depend on the current iterate instead and are produced
    /// by [`Convergence::relres`].
    pub fn denominator(
        &self,
        b: &[T],
        r0: &[T],
        pc: Option<&dyn Preconditioner<T>>,
        work: &mut [T],
    ) -> Result<T, KsparError> {
        let small = T::from(SMALLREAL).unwrap();
        let den = match self.stop_type {
            StopType::RelRes | StopType::RelModRes => {
                let bnorm = array::norm2(b);
                if bnorm > T::zero() {
                    bnorm
                } else {
                    array::norm2(r0)
                }
            }
            StopType::RelPrecRes => {
                apply_or_copy(pc, b, work)?;
                let bnorm = array::dot(b, work).abs().sqrt();
                if bnorm > T::zero() {
                    bnorm
                } else {
                    array::norm2(r0)
                }
            }
        };
        Ok(den.max(small))
    }

    /// Residual norm for the chosen criterion. `z` must hold `M⁻¹r` when the
    /// criterion is `RelPrecRes`; it is ignored otherwise.
    pub fn absres(&self, r: &[T], z: &[T]) -> T {
        match self.stop_type {
            StopType::RelRes | StopType::RelModRes => array::norm2(r),
            StopType::RelPrecRes => array::dot(r, z).abs().sqrt(),
        }
    }

    /// Relative residual for the chosen criterion.
    pub fn relres(&self, absres: T, den: T, x: &[T]) -> T {
        let small = T::from(SMALLREAL).unwrap();
        match self.stop_type {
            StopType::RelRes | StopType::RelPrecRes => absres / den,
            StopType::RelModRes => absres / array::norm2(x).max(small),
        }
    }

    pub fn is_converged(&self, relres: T) -> bool {
        relres <= self.tol
    }
}

/// Guards a running solve against stagnation and divergence.
///
/// `observe` is fed the relative residual once per iteration; it returns the
/// appropriate error as soon as the residual has grown past a bounded
/// multiple of the initial one, or has not improved over a fixed window.
#[derive(Clone, Debug)]
pub struct ResidualWatch<T> {
    method: &'static str,
    best: T,
    since_best: usize,
}

impl<T: Float> ResidualWatch<T> {
    pub fn new(method: &'static str) -> Self {
        Self {
            method,
            best: T::from(BIGREAL).unwrap(),
            since_best: 0,
        }
    }

    pub fn observe(&mut self, relres: T, iteration: usize) -> Result<(), KsparError> {
        if relres > T::from(DIVERGE_RATIO).unwrap() {
            return Err(KsparError::Diverge {
                method: self.method,
                iterations: iteration,
                residual: relres.to_f64().unwrap_or(f64::NAN),
            });
        }
        if relres < self.best {
            self.best = relres;
            self.since_best = 0;
        } else {
            self.since_best += 1;
            if self.since_best >= STAG_WINDOW {
                return Err(KsparError::Stagnation {
                    method: self.method,
                    iterations: iteration,
                    window: STAG_WINDOW,
                });
            }
        }
        Ok(())
    }
}

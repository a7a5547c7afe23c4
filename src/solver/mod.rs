//! Krylov iteration cores.
//!
//! Every core consumes a [`MatVec`] operator and an optional opaque
//! preconditioner; workspace lives for one solve and is released on every
//! exit path. The dispatcher in [`crate::context`] selects a core from the
//! parameter record.

use crate::core::traits::MatVec;
use crate::error::KsparError;
use crate::preconditioner::Preconditioner;
use crate::utils::convergence::SolveStats;

/// Common interface for the iteration cores.
pub trait KrylovSolver<T> {
    /// Solve A·x = b starting from the initial guess in `x`, writing the
    /// result back into `x`. Returns iteration stats on convergence.
    fn solve(
        &mut self,
        a: &dyn MatVec<T>,
        pc: Option<&dyn Preconditioner<T>>,
        b: &[T],
        x: &mut [T],
    ) -> Result<SolveStats<T>, KsparError>;
}

pub mod cg;
pub use cg::CgSolver;

pub mod bicgstab;
pub use bicgstab::{BiCgStabSolver, VBiCgStabSolver};

pub mod minres;
pub use minres::MinresSolver;

pub mod gmres;
pub use gmres::GmresSolver;

pub mod vgmres;
pub use vgmres::VGmresSolver;

pub mod vfgmres;
pub use vfgmres::VFGmresSolver;

pub mod gcr;
pub use gcr::GcrSolver;

pub mod gcg;
pub use gcg::GcgSolver;

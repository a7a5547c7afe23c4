//! kspar: preconditioned Krylov subspace solvers over sparse PDE matrices.
//!
//! Sparse containers (CSR, BSR, structured bands, block composite,
//! coordinate), format conversion and mat-vec kernels, a matrix-free
//! dispatch layer, and the Krylov iteration cores (CG, BiCGStab, MinRes,
//! the GMRES family, GCR, GCG) behind a single parameterized entry point.

pub mod config;
pub mod context;
pub mod core;
pub mod error;
pub mod matrix;
pub mod preconditioner;
pub mod solver;
pub mod utils;

// Re-exports for convenience
pub use config::{ItParam, PrintLevel, SolverKind, StopType};
pub use context::{solve, solve_flexible, solve_krylov};
pub use self::core::{Indexing, MatFree, MatVec};
pub use error::KsparError;
pub use matrix::{Band, BlcBlock, BlcMatrix, BsrMatrix, CooMatrix, CsrMatrix, CsrlMatrix,
    StorageManner, StrMatrix};
pub use preconditioner::{FixedAsFlexible, FlexiblePreconditioner, Preconditioner};
pub use solver::{
    BiCgStabSolver, CgSolver, GcgSolver, GcrSolver, GmresSolver, KrylovSolver, MinresSolver,
    VBiCgStabSolver, VFGmresSolver, VGmresSolver,
};
pub use utils::convergence::SolveStats;

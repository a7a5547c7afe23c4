//! Entry points for configured solves.

pub mod itsolver;

pub use itsolver::{solve, solve_flexible, solve_krylov};

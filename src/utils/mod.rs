//! Array primitives, convergence machinery, and iteration logging.

pub mod array;
pub mod convergence;
pub mod itinfo;
pub mod workspace;

pub use convergence::{Convergence, ResidualWatch, SolveStats};

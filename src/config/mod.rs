//! Solver configuration.

pub mod options;

pub use options::{ItParam, PrintLevel, SolverKind, StopType, BIGREAL, SMALLREAL};

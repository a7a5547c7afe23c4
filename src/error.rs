use thiserror::Error;

// Unified error type for kspar. Solvers return errors, they never panic;
// the dispatcher does not retry.

#[derive(Error, Debug)]
pub enum KsparError {
    #[error("workspace allocation of {requested} reals failed")]
    Alloc { requested: usize },

    #[error("{method} reached max iterations ({iterations}) with relative residual {residual:.4e}")]
    MaxIter {
        method: &'static str,
        iterations: usize,
        residual: f64,
    },

    #[error("numerical breakdown in {method} at iteration {iterations}")]
    Breakdown {
        method: &'static str,
        iterations: usize,
    },

    #[error("{method} stagnated over {window} iterations (iteration {iterations})")]
    Stagnation {
        method: &'static str,
        iterations: usize,
        window: usize,
    },

    #[error("{method} diverged at iteration {iterations}, relative residual {residual:.4e}")]
    Diverge {
        method: &'static str,
        iterations: usize,
        residual: f64,
    },

    #[error("unknown solver type {0}")]
    SolverType(i32),

    #[error("invalid input parameter: {0}")]
    InputPar(String),

    #[error("invalid matrix format: {0}")]
    Format(String),
}

//! The solver dispatcher: one entry point over every format and method.
//!
//! `solve` checks the parameter record, routes the matrix-free handle to the
//! chosen iteration core, times the solve, and prints a one-line summary when
//! asked to. Retry policy lives with the caller; the dispatcher never
//! re-runs a failed solve.

use std::time::Instant;

use num_traits::Float;

use crate::config::options::{ItParam, PrintLevel, SolverKind};
use crate::core::matfree::MatFree;
use crate::error::KsparError;
use crate::preconditioner::{FlexiblePreconditioner, Preconditioner};
use crate::solver::{
    BiCgStabSolver, CgSolver, GcgSolver, GcrSolver, GmresSolver, KrylovSolver, MinresSolver,
    VBiCgStabSolver, VFGmresSolver, VGmresSolver,
};
use crate::utils::convergence::SolveStats;
use crate::utils::itinfo;

/// Solve A·x = b with the configured Krylov method and an optional
/// preconditioner. Returns iteration stats on success.
pub fn solve<T: Float + Send + Sync>(
    mf: &MatFree<T>,
    b: &[T],
    x: &mut [T],
    pc: Option<&dyn Preconditioner<T>>,
    param: &ItParam<T>,
) -> Result<SolveStats<T>, KsparError> {
    param.validate()?;
    mf.check_system(b, x)?;

    let start = Instant::now();
    let result = dispatch(mf, b, x, pc, param);
    finish(param, start, &result);
    result
}

/// Convenience entry without a preconditioner.
pub fn solve_krylov<T: Float + Send + Sync>(
    mf: &MatFree<T>,
    b: &[T],
    x: &mut [T],
    param: &ItParam<T>,
) -> Result<SolveStats<T>, KsparError> {
    solve(mf, b, x, None, param)
}

/// Solve with a preconditioner whose action may change between applications.
/// Routed to the flexible GMRES variant regardless of `solver_kind`.
pub fn solve_flexible<T: Float + Send + Sync>(
    mf: &MatFree<T>,
    b: &[T],
    x: &mut [T],
    pc: &mut dyn FlexiblePreconditioner<T>,
    param: &ItParam<T>,
) -> Result<SolveStats<T>, KsparError> {
    let checked = ItParam {
        solver_kind: SolverKind::Vfgmres,
        ..param.clone()
    };
    checked.validate()?;
    mf.check_system(b, x)?;

    let start = Instant::now();
    let mut solver = VFGmresSolver::new(checked.restart, checked.tol, checked.max_iter)
        .with_stop_type(checked.stop_type)
        .with_print_level(checked.print_level);
    let result = solver.solve_flexible(mf, Some(pc), b, x);
    finish(&checked, start, &result);
    result
}

fn dispatch<T: Float + Send + Sync>(
    mf: &MatFree<T>,
    b: &[T],
    x: &mut [T],
    pc: Option<&dyn Preconditioner<T>>,
    param: &ItParam<T>,
) -> Result<SolveStats<T>, KsparError> {
    let tol = param.tol;
    let max_iter = param.max_iter;
    match param.solver_kind {
        SolverKind::Cg => CgSolver::new(tol, max_iter)
            .with_stop_type(param.stop_type)
            .with_print_level(param.print_level)
            .solve(mf, pc, b, x),
        SolverKind::Bicgstab => BiCgStabSolver::new(tol, max_iter)
            .with_stop_type(param.stop_type)
            .with_print_level(param.print_level)
            .solve(mf, pc, b, x),
        SolverKind::VBicgstab => VBiCgStabSolver::new(tol, max_iter)
            .with_stop_type(param.stop_type)
            .with_print_level(param.print_level)
            .solve(mf, pc, b, x),
        SolverKind::Minres => MinresSolver::new(tol, max_iter)
            .with_stop_type(param.stop_type)
            .with_print_level(param.print_level)
            .solve(mf, pc, b, x),
        SolverKind::Gmres => GmresSolver::new(param.restart, tol, max_iter)
            .with_stop_type(param.stop_type)
            .with_print_level(param.print_level)
            .solve(mf, pc, b, x),
        SolverKind::Vgmres => VGmresSolver::new(param.restart, tol, max_iter)
            .with_stop_type(param.stop_type)
            .with_print_level(param.print_level)
            .solve(mf, pc, b, x),
        SolverKind::Vfgmres => VFGmresSolver::new(param.restart, tol, max_iter)
            .with_stop_type(param.stop_type)
            .with_print_level(param.print_level)
            .solve(mf, pc, b, x),
        SolverKind::Gcg => GcgSolver::new(tol, max_iter)
            .with_stop_type(param.stop_type)
            .with_print_level(param.print_level)
            .solve(mf, pc, b, x),
        SolverKind::Gcr => GcrSolver::new(param.restart, tol, max_iter)
            .with_stop_type(param.stop_type)
            .with_print_level(param.print_level)
            .solve(mf, pc, b, x),
    }
}

fn finish<T: Float + Send + Sync>(
    param: &ItParam<T>,
    start: Instant,
    result: &Result<SolveStats<T>, KsparError>,
) {
    if param.print_level < PrintLevel::Min {
        return;
    }
    let elapsed = start.elapsed().as_secs_f64();
    match result {
        Ok(stats) => {
            println!(
                "{}: {} iterations, relative residual {:.6e}",
                param.solver_kind.name(),
                stats.iterations,
                num_traits::ToPrimitive::to_f64(&stats.relative_residual).unwrap_or(f64::NAN),
            );
        }
        Err(err) => {
            println!("{}: {}", param.solver_kind.name(), err);
        }
    }
    itinfo::print_cputime(param.print_level, "Iterative method", elapsed);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::options::StopType;
    use crate::matrix::CsrMatrix;

    #[test]
    fn dispatcher_runs_every_kind_on_spd_tridiagonal() {
        // A = [[4,1,0,0],[1,3,1,0],[0,1,2,1],[0,0,1,3]], b = A·1
        let a = CsrMatrix::new(
            4,
            4,
            vec![0, 2, 5, 8, 10],
            vec![0, 1, 0, 1, 2, 1, 2, 3, 2, 3],
            vec![4.0, 1.0, 1.0, 3.0, 1.0, 1.0, 2.0, 1.0, 1.0, 3.0],
        )
        .unwrap();
        let mf = MatFree::from(&a);
        let mut b = vec![0.0; 4];
        a.spmv(&[1.0, 1.0, 1.0, 1.0], &mut b);
        let kinds = [
            SolverKind::Cg,
            SolverKind::Bicgstab,
            SolverKind::VBicgstab,
            SolverKind::Minres,
            SolverKind::Gmres,
            SolverKind::Vgmres,
            SolverKind::Vfgmres,
            SolverKind::Gcg,
            SolverKind::Gcr,
        ];
        for kind in kinds {
            let mut x = vec![0.0; 4];
            let param = ItParam {
                solver_kind: kind,
                tol: 1e-10,
                max_iter: 200,
                ..ItParam::default()
            };
            let stats = solve(&mf, &b, &mut x, None, &param)
                .unwrap_or_else(|e| panic!("{:?} failed: {}", kind, e));
            assert!(stats.converged, "{:?} did not converge", kind);
            for xi in &x {
                assert!((xi - 1.0).abs() < 1e-7, "{:?}: xi = {}", kind, xi);
            }
        }
    }

    #[test]
    fn unpreconditioned_entry_matches_solve_with_none() {
        let a = CsrMatrix::<f64>::eye(4);
        let mf = MatFree::from(&a);
        let b = vec![3.0; 4];
        let mut x = vec![0.0; 4];
        let param = ItParam {
            tol: 1e-12,
            max_iter: 10,
            ..ItParam::default()
        };
        let stats = solve_krylov(&mf, &b, &mut x, &param).unwrap();
        assert!(stats.converged);
        for xi in &x {
            assert!((xi - 3.0).abs() < 1e-10);
        }
    }

    #[test]
    fn rejects_invalid_parameters() {
        let a = CsrMatrix::<f64>::eye(2);
        let mf = MatFree::from(&a);
        let b = vec![1.0; 2];
        let mut x = vec![0.0; 2];
        let param = ItParam {
            tol: -1.0,
            ..ItParam::default()
        };
        assert!(matches!(
            solve(&mf, &b, &mut x, None, &param),
            Err(KsparError::InputPar(_))
        ));
    }

    #[test]
    fn rejects_mismatched_dimensions() {
        let a = CsrMatrix::<f64>::eye(3);
        let mf = MatFree::from(&a);
        let b = vec![1.0; 2];
        let mut x = vec![0.0; 3];
        let param = ItParam::<f64>::default();
        assert!(solve(&mf, &b, &mut x, None, &param).is_err());
    }

    #[test]
    fn stop_types_all_converge() {
        let a = CsrMatrix::<f64>::eye(4);
        let mf = MatFree::from(&a);
        let b = vec![2.0; 4];
        for stop in [StopType::RelRes, StopType::RelPrecRes, StopType::RelModRes] {
            let mut x = vec![0.0; 4];
            let param = ItParam {
                stop_type: stop,
                tol: 1e-10,
                max_iter: 20,
                ..ItParam::default()
            };
            let stats = solve(&mf, &b, &mut x, None, &param).unwrap();
            assert!(stats.converged);
        }
    }
}

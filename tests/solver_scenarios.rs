//! End-to-end solver scenarios: model PDE problems driven through the
//! dispatcher, with every declared convergence re-checked against the
//! recomputed residual.

mod common;

use common::{diag_csr, poisson2d, recomputed_relres, upwind_advection_diffusion, DiagPc};
use kspar::{solve, CsrMatrix, ItParam, KsparError, MatFree, SolverKind};

#[test]
fn identity_converges_in_one_iteration() {
    let a = CsrMatrix::<f64>::eye(10);
    let mf = MatFree::from(&a);
    let b = vec![1.0; 10];
    let mut x = vec![0.0; 10];
    let param = ItParam {
        solver_kind: SolverKind::Cg,
        tol: 1e-12,
        max_iter: 10,
        ..ItParam::default()
    };
    let stats = solve(&mf, &b, &mut x, None, &param).unwrap();
    assert!(stats.converged);
    assert_eq!(stats.iterations, 1);
    for xi in &x {
        assert!((xi - 1.0).abs() < 1e-12);
    }
}

#[test]
fn diagonal_preconditioner_solves_diagonal_system_in_one_iteration() {
    let values: Vec<f64> = (1..=100).map(|i| i as f64).collect();
    let a = diag_csr(&values);
    let pc = DiagPc::from_matrix(&a);
    let mf = MatFree::from(&a);
    let b = vec![1.0; 100];
    let mut x = vec![0.0; 100];
    let param = ItParam {
        solver_kind: SolverKind::Cg,
        tol: 1e-12,
        max_iter: 10,
        ..ItParam::default()
    };
    let stats = solve(&mf, &b, &mut x, Some(&pc), &param).unwrap();
    assert!(stats.converged);
    assert_eq!(stats.iterations, 1);
    for (i, xi) in x.iter().enumerate() {
        assert!((xi - 1.0 / (i + 1) as f64).abs() < 1e-10);
    }
}

#[test]
fn unpreconditioned_cg_on_diagonal_system_stays_within_dimension() {
    let values: Vec<f64> = (1..=100).map(|i| i as f64).collect();
    let a = diag_csr(&values);
    let mf = MatFree::from(&a);
    let b = vec![1.0; 100];
    let mut x = vec![0.0; 100];
    let param = ItParam {
        solver_kind: SolverKind::Cg,
        tol: 1e-8,
        max_iter: 200,
        ..ItParam::default()
    };
    let stats = solve(&mf, &b, &mut x, None, &param).unwrap();
    assert!(stats.converged);
    assert!(
        stats.iterations <= 100,
        "CG needed {} iterations on a matrix with 100 distinct eigenvalues",
        stats.iterations
    );
    assert!(recomputed_relres(&a, &b, &x) <= 1e-7);
}

#[test]
fn gmres_with_diagonal_pc_solves_poisson() {
    let a = poisson2d(32, 32);
    let pc = DiagPc::from_matrix(&a);
    let mf = MatFree::from(&a);
    let n = a.nrows();
    let b = vec![1.0; n];
    let mut x = vec![0.0; n];
    let param = ItParam {
        solver_kind: SolverKind::Gmres,
        tol: 1e-8,
        max_iter: 20000,
        restart: 30,
        ..ItParam::default()
    };
    let stats = solve(&mf, &b, &mut x, Some(&pc), &param).unwrap();
    assert!(stats.converged);
    assert!(stats.iterations >= 30, "Poisson should need several cycles");
    assert!(recomputed_relres(&a, &b, &x) <= 1e-8 * 1.01 + 1e-12);
}

#[test]
fn bicgstab_converges_on_upwind_advection_diffusion() {
    let a = upwind_advection_diffusion(500, 0.5);
    let mf = MatFree::from(&a);
    let n = a.nrows();
    let b = vec![1.0; n];
    let mut x = vec![0.0; n];
    let param = ItParam {
        solver_kind: SolverKind::Bicgstab,
        tol: 1e-8,
        max_iter: 5000,
        ..ItParam::default()
    };
    // must converge, and in particular must never report breakdown
    let stats = solve(&mf, &b, &mut x, None, &param).unwrap();
    assert!(stats.converged);
    assert!(recomputed_relres(&a, &b, &x) <= 1e-7);
}

#[test]
fn antidiagonal_system_forces_bicgstab_breakdown() {
    let a = CsrMatrix::new(2, 2, vec![0, 1, 2], vec![1, 0], vec![1.0, 1.0]).unwrap();
    let mf = MatFree::from(&a);
    let b = vec![1.0, 1.0];
    let mut x = vec![0.0; 2];
    let param = ItParam {
        solver_kind: SolverKind::Bicgstab,
        tol: 1e-12,
        max_iter: 100,
        ..ItParam::default()
    };
    let err = solve(&mf, &b, &mut x, None, &param).unwrap_err();
    assert!(matches!(err, KsparError::Breakdown { .. }));
}

#[test]
fn vgmres_shrinks_restart_on_poisson() {
    let a = poisson2d(64, 64);
    let pc = DiagPc::from_matrix(&a);
    let n = a.nrows();
    let b = vec![1.0; n];
    let mut x = vec![0.0; n];
    let mut solver = kspar::VGmresSolver::new(30, 1e-6, 20000);
    let stats = kspar::KrylovSolver::solve(&mut solver, &a, Some(&pc), &b, &mut x).unwrap();
    assert!(stats.converged);
    assert!(recomputed_relres(&a, &b, &x) <= 1e-5);

    let history = &solver.restart_history;
    assert!(!history.is_empty());
    // the first cycle always runs at the full restart length
    assert_eq!(history[0], 30);
    if history.len() >= 4 {
        // mid-range convergence rates must have reduced the restart length
        assert!(
            history.iter().any(|&m| m < 30),
            "restart never adapted: {:?}",
            history
        );
    }
}

#[test]
fn every_method_passes_the_recomputed_residual_check() {
    let a = poisson2d(16, 16);
    let pc = DiagPc::from_matrix(&a);
    let mf = MatFree::from(&a);
    let n = a.nrows();
    let b: Vec<f64> = (0..n).map(|i| 1.0 + ((i % 7) as f64) * 0.1).collect();
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
        let mut x = vec![0.0; n];
        let param = ItParam {
            solver_kind: kind,
            tol: 1e-8,
            max_iter: 10000,
            restart: 20,
            ..ItParam::default()
        };
        let stats = solve(&mf, &b, &mut x, Some(&pc), &param)
            .unwrap_or_else(|e| panic!("{:?} failed: {}", kind, e));
        assert!(stats.converged, "{:?} did not converge", kind);
        let rel = recomputed_relres(&a, &b, &x);
        assert!(
            rel <= 1e-7,
            "{:?}: recomputed relative residual {:.3e} too large",
            kind,
            rel
        );
    }
}

#[test]
fn cg_solves_random_spd_system() {
    use kspar::CooMatrix;
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let n = 12;
    let m: Vec<f64> = (0..n * n).map(|_| rng.gen::<f64>()).collect();
    // A = MᵀM + I is SPD; assemble densely as triples
    let mut rowind = Vec::new();
    let mut colind = Vec::new();
    let mut val = Vec::new();
    for i in 0..n {
        for j in 0..n {
            let mut v = if i == j { 1.0 } else { 0.0 };
            for k in 0..n {
                v += m[k * n + i] * m[k * n + j];
            }
            rowind.push(i);
            colind.push(j);
            val.push(v);
        }
    }
    let a = CooMatrix::new(n, n, rowind, colind, val).unwrap().to_csr();
    let b: Vec<f64> = (0..n).map(|_| rng.gen::<f64>()).collect();
    let mf = MatFree::from(&a);
    let mut x = vec![0.0; n];
    let param = ItParam {
        solver_kind: SolverKind::Cg,
        tol: 1e-10,
        max_iter: 1000,
        ..ItParam::default()
    };
    let stats = solve(&mf, &b, &mut x, None, &param).unwrap();
    assert!(stats.converged);
    assert!(recomputed_relres(&a, &b, &x) <= 1e-8);
}

#[test]
fn flexible_entry_point_accepts_fixed_preconditioner() {
    let a = poisson2d(8, 8);
    let pc = DiagPc::from_matrix(&a);
    let mut flex = kspar::FixedAsFlexible(&pc);
    let mf = MatFree::from(&a);
    let n = a.nrows();
    let b = vec![1.0; n];
    let mut x = vec![0.0; n];
    let param = ItParam {
        tol: 1e-9,
        max_iter: 2000,
        restart: 15,
        ..ItParam::default()
    };
    let stats = kspar::solve_flexible(&mf, &b, &mut x, &mut flex, &param).unwrap();
    assert!(stats.converged);
    assert!(recomputed_relres(&a, &b, &x) <= 1e-8);
}

#[test]
fn matrix_free_operator_matches_assembled_solve() {
    let a = poisson2d(8, 8);
    let n = a.nrows();
    let apply = |x: &[f64], y: &mut [f64]| a.spmv(x, y);
    let mf = MatFree::Operator { n, apply: &apply };
    let b = vec![1.0; n];
    let mut x_free = vec![0.0; n];
    let param = ItParam {
        solver_kind: SolverKind::Cg,
        tol: 1e-10,
        max_iter: 500,
        ..ItParam::default()
    };
    let stats = solve(&mf, &b, &mut x_free, None, &param).unwrap();
    assert!(stats.converged);

    let mf_csr = MatFree::from(&a);
    let mut x_csr = vec![0.0; n];
    solve(&mf_csr, &b, &mut x_csr, None, &param).unwrap();
    for (p, q) in x_free.iter().zip(&x_csr) {
        assert!((p - q).abs() < 1e-8);
    }
}

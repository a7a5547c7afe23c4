//! Format-conversion properties: COO↔CSR round trips, transpose involution,
//! structural addition, and the row-length-grouped layout.

mod common;

use common::poisson2d;
use kspar::{CooMatrix, CsrMatrix, CsrlMatrix};

fn sorted_triples(m: &CooMatrix<f64>) -> Vec<(usize, usize, u64)> {
    let mut t: Vec<(usize, usize, u64)> = m
        .triples()
        .map(|(i, j, v)| (i, j, v.to_bits()))
        .collect();
    t.sort();
    t
}

#[test]
fn coo_csr_round_trip_preserves_multiset() {
    // duplicates included on purpose; conversion must keep them
    let coo = CooMatrix::new(
        4,
        4,
        vec![2, 0, 3, 0, 0, 1, 2],
        vec![1, 3, 3, 3, 0, 2, 1],
        vec![1.5, -2.0, 3.25, -2.0, 0.5, 7.0, -1.0],
    )
    .unwrap();
    let back = coo.to_csr().to_coo();
    assert_eq!(back.nnz(), coo.nnz());
    assert_eq!(sorted_triples(&back), sorted_triples(&coo));
}

#[test]
fn transpose_is_involution_on_poisson() {
    let mut a = poisson2d(7, 5);
    let mut tt = a.transpose().transpose();
    a.sort_rows();
    tt.sort_rows();
    assert_eq!(a, tt);
}

#[test]
fn transpose_swaps_matvec_roles() {
    // ⟨Ax, y⟩ = ⟨x, Aᵀy⟩
    let a = poisson2d(6, 6);
    let at = a.transpose();
    let n = a.nrows();
    let x: Vec<f64> = (0..n).map(|i| (i as f64).sin()).collect();
    let y: Vec<f64> = (0..n).map(|i| (i as f64 * 0.3).cos()).collect();
    let mut ax = vec![0.0; n];
    let mut aty = vec![0.0; n];
    a.spmv(&x, &mut ax);
    at.spmv(&y, &mut aty);
    let lhs: f64 = ax.iter().zip(&y).map(|(&p, &q)| p * q).sum();
    let rhs: f64 = x.iter().zip(&aty).map(|(&p, &q)| p * q).sum();
    assert!((lhs - rhs).abs() < 1e-10 * lhs.abs().max(1.0));
}

#[test]
fn add_matches_elementwise_reference() {
    let a = poisson2d(4, 4);
    let b = a.transpose();
    let alpha = 0.5;
    let c = a.add(alpha, &b).unwrap();
    let n = a.nrows();
    let x: Vec<f64> = (0..n).map(|i| 1.0 + (i % 3) as f64).collect();
    let mut ax = vec![0.0; n];
    let mut bx = vec![0.0; n];
    let mut cx = vec![0.0; n];
    a.spmv(&x, &mut ax);
    b.spmv(&x, &mut bx);
    c.spmv(&x, &mut cx);
    for i in 0..n {
        assert!((cx[i] - (ax[i] + alpha * bx[i])).abs() < 1e-12);
    }
}

#[test]
fn add_unions_unsorted_rows_without_duplicates() {
    // rows deliberately unsorted; the sum must still have one entry per column
    let a = CsrMatrix::new(2, 3, vec![0, 2, 3], vec![2, 0, 1], vec![1.0, 2.0, 3.0]).unwrap();
    let b = CsrMatrix::new(2, 3, vec![0, 2, 3], vec![0, 2, 1], vec![5.0, 7.0, 9.0]).unwrap();
    let c = a.add(1.0, &b).unwrap();
    assert_eq!(c.nnz(), 3);
    let x = vec![1.0, 1.0, 1.0];
    let mut y = vec![0.0; 2];
    c.spmv(&x, &mut y);
    assert_eq!(y, vec![15.0, 12.0]);
}

#[test]
fn csrl_groups_cover_every_row() {
    let a = poisson2d(8, 3);
    let csrl = CsrlMatrix::from_csr(&a);
    assert_eq!(csrl.nnz(), a.nnz());
    // interior rows have 5 entries, edge rows fewer: more than one group
    assert!(csrl.ngroup() > 1);
    let n = a.nrows();
    let x: Vec<f64> = (0..n).map(|i| (i as f64 * 0.17).sin()).collect();
    let mut y1 = vec![0.0; n];
    let mut y2 = vec![0.0; n];
    a.spmv(&x, &mut y1);
    csrl.spmv(&x, &mut y2);
    for i in 0..n {
        assert!((y1[i] - y2[i]).abs() < 1e-13);
    }
}

#[test]
fn sort_rows_orders_columns() {
    let mut a = CsrMatrix::new(
        2,
        4,
        vec![0, 3, 5],
        vec![3, 0, 2, 1, 0],
        vec![1.0, 2.0, 3.0, 4.0, 5.0],
    )
    .unwrap();
    a.sort_rows();
    assert_eq!(a.col_idx(), &[0, 2, 3, 0, 1]);
    assert_eq!(a.values(), &[2.0, 3.0, 1.0, 5.0, 4.0]);
}

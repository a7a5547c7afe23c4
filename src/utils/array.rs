//! Dense BLAS-1 primitives over contiguous real arrays.
//!
//! These are the inner computational fabric of every Krylov core: copy, fill,
//! scale, axpy/axpby, dot product and 2-norm. All operate in place and none
//! allocate. With the `rayon` feature the elementwise operations run on a
//! fork-join pool; reductions keep a deterministic order in serial builds.

use num_traits::Float;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Parallel dispatch below this length is not worth the fork-join overhead.
#[cfg(feature = "rayon")]
const PAR_MIN_LEN: usize = 8192;

/// dst ← src.
pub fn copy<T: Copy>(src: &[T], dst: &mut [T]) {
    dst.copy_from_slice(src);
}

/// x ← val everywhere.
pub fn fill<T: Copy>(x: &mut [T], val: T) {
    for xi in x.iter_mut() {
        *xi = val;
    }
}

/// x ← αx.
pub fn scale<T: Float + Send + Sync>(alpha: T, x: &mut [T]) {
    #[cfg(feature = "rayon")]
    if x.len() >= PAR_MIN_LEN {
        x.par_iter_mut().for_each(|xi| *xi = alpha * *xi);
        return;
    }
    for xi in x.iter_mut() {
        *xi = alpha * *xi;
    }
}

/// y ← αx + y.
pub fn axpy<T: Float + Send + Sync>(alpha: T, x: &[T], y: &mut [T]) {
    debug_assert_eq!(x.len(), y.len());
    #[cfg(feature = "rayon")]
    if x.len() >= PAR_MIN_LEN {
        y.par_iter_mut()
            .zip(x.par_iter())
            .for_each(|(yi, &xi)| *yi = *yi + alpha * xi);
        return;
    }
    for (yi, &xi) in y.iter_mut().zip(x) {
        *yi = *yi + alpha * xi;
    }
}

/// y ← αx + βy.
pub fn axpby<T: Float + Send + Sync>(alpha: T, x: &[T], beta: T, y: &mut [T]) {
    debug_assert_eq!(x.len(), y.len());
    #[cfg(feature = "rayon")]
    if x.len() >= PAR_MIN_LEN {
        y.par_iter_mut()
            .zip(x.par_iter())
            .for_each(|(yi, &xi)| *yi = alpha * xi + beta * *yi);
        return;
    }
    for (yi, &xi) in y.iter_mut().zip(x) {
        *yi = alpha * xi + beta * *yi;
    }
}

/// ⟨x, y⟩.
pub fn dot<T: Float + Send + Sync>(x: &[T], y: &[T]) -> T {
    debug_assert_eq!(x.len(), y.len());
    #[cfg(feature = "rayon")]
    if x.len() >= PAR_MIN_LEN {
        return x
            .par_iter()
            .zip(y.par_iter())
            .fold(T::zero, |acc, (&xi, &yi)| acc + xi * yi)
            .reduce(T::zero, |a, b| a + b);
    }
    x.iter()
        .zip(y)
        .fold(T::zero(), |acc, (&xi, &yi)| acc + xi * yi)
}

/// ‖x‖₂.
pub fn norm2<T: Float + Send + Sync>(x: &[T]) -> T {
    dot(x, x).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axpy_and_axpby() {
        let x = vec![1.0, 2.0, 3.0];
        let mut y = vec![1.0, 1.0, 1.0];
        axpy(2.0, &x, &mut y);
        assert_eq!(y, vec![3.0, 5.0, 7.0]);
        axpby(1.0, &x, -1.0, &mut y);
        assert_eq!(y, vec![-2.0, -3.0, -4.0]);
    }

    #[test]
    fn dot_and_norm() {
        let x = vec![3.0, 4.0];
        assert_eq!(dot(&x, &x), 25.0);
        assert_eq!(norm2(&x), 5.0);
    }

    #[test]
    fn scale_and_fill() {
        let mut x = vec![1.0, -2.0];
        scale(-2.0, &mut x);
        assert_eq!(x, vec![-2.0, 4.0]);
        fill(&mut x, 0.5);
        assert_eq!(x, vec![0.5, 0.5]);
    }
}

//! Fallible workspace allocation for the iteration cores.
//!
//! Krylov workspace can be large (the GMRES family needs on the order of
//! `(restart+4)(restart+n)` reals), so allocation failure is reported as
//! [`KsparError::Alloc`] rather than aborting the process.

use num_traits::Float;

use crate::error::KsparError;

/// Allocate a zeroed vector of `len` reals, reporting failure as an error.
pub fn alloc<T: Float>(len: usize) -> Result<Vec<T>, KsparError> {
    let mut v: Vec<T> = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|_| KsparError::Alloc { requested: len })?;
    v.resize(len, T::zero());
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_allocations_succeed() {
        let v: Vec<f64> = alloc(100).unwrap();
        assert_eq!(v.len(), 100);
        assert!(v.iter().all(|&x| x == 0.0));
    }
}

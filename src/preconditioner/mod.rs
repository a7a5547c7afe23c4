//! Preconditioner contracts.
//!
//! The core consumes preconditioners, it does not build them: AMG, ILU,
//! Schwarz and friends live with the caller and arrive here as an opaque
//! object applying an approximate inverse, `z ← M⁻¹ r`.

use crate::error::KsparError;
use crate::utils::array;

/// A fixed preconditioner M ≈ A⁻¹.
pub trait Preconditioner<T> {
    /// Apply M⁻¹ to `r`, writing `z = M⁻¹ r`.
    fn apply(&self, r: &[T], z: &mut [T]) -> Result<(), KsparError>;
}

/// A preconditioner whose action M⁻¹ may change at every application.
/// Required by the flexible GMRES variant, which stores the preconditioned
/// basis explicitly instead of assuming a fixed linear operator.
pub trait FlexiblePreconditioner<T> {
    fn apply(&mut self, r: &[T], z: &mut [T]) -> Result<(), KsparError>;
}

/// Adapter treating a fixed preconditioner as a flexible one.
pub struct FixedAsFlexible<'a, T>(pub &'a dyn Preconditioner<T>);

impl<'a, T> FlexiblePreconditioner<T> for FixedAsFlexible<'a, T> {
    fn apply(&mut self, r: &[T], z: &mut [T]) -> Result<(), KsparError> {
        self.0.apply(r, z)
    }
}

/// `z ← M⁻¹ r`, with a plain copy when no preconditioner is given.
pub fn apply_or_copy<T: Copy>(
    pc: Option<&dyn Preconditioner<T>>,
    r: &[T],
    z: &mut [T],
) -> Result<(), KsparError> {
    match pc {
        Some(pc) => pc.apply(r, z),
        None => {
            array::copy(r, z);
            Ok(())
        }
    }
}

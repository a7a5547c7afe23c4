//! Solver parameter record and the enums it is built from.
//!
//! `ItParam` is the single record handed to the dispatcher: which Krylov
//! method to run, the stopping criterion, iteration and restart limits, and
//! how chatty the solve should be.

use crate::error::KsparError;

/// Absolute tolerance floor; quantities are never divided by anything
/// smaller than this.
pub const SMALLREAL: f64 = 1e-20;

/// Upper sentinel for residual bookkeeping.
pub const BIGREAL: f64 = 1e20;

/// Which Krylov method the dispatcher should run.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SolverKind {
    Cg,
    Bicgstab,
    VBicgstab,
    Minres,
    Gmres,
    Vgmres,
    Vfgmres,
    Gcg,
    Gcr,
}

impl SolverKind {
    /// Human-readable method name used in logs and errors.
    pub fn name(self) -> &'static str {
        match self {
            SolverKind::Cg => "CG",
            SolverKind::Bicgstab => "BiCGstab",
            SolverKind::VBicgstab => "VBiCGstab",
            SolverKind::Minres => "MinRes",
            SolverKind::Gmres => "GMRes",
            SolverKind::Vgmres => "vGMRes",
            SolverKind::Vfgmres => "vFGMRes",
            SolverKind::Gcg => "GCG",
            SolverKind::Gcr => "GCR",
        }
    }

    /// True for the methods that take a restart parameter.
    pub fn uses_restart(self) -> bool {
        matches!(
            self,
            SolverKind::Gmres | SolverKind::Vgmres | SolverKind::Vfgmres | SolverKind::Gcr
        )
    }
}

/// Numeric tags for callers that configure solvers from integer parameters.
impl TryFrom<i32> for SolverKind {
    type Error = KsparError;

    fn try_from(tag: i32) -> Result<Self, KsparError> {
        match tag {
            1 => Ok(SolverKind::Cg),
            2 => Ok(SolverKind::Bicgstab),
            3 => Ok(SolverKind::Minres),
            4 => Ok(SolverKind::Gmres),
            5 => Ok(SolverKind::Vgmres),
            6 => Ok(SolverKind::Vfgmres),
            7 => Ok(SolverKind::Gcg),
            8 => Ok(SolverKind::Gcr),
            9 => Ok(SolverKind::VBicgstab),
            other => Err(KsparError::SolverType(other)),
        }
    }
}

/// Stopping criterion used by the shared convergence test.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StopType {
    /// ‖r‖₂ / ‖b‖₂ (falls back to ‖r₀‖₂ when ‖b‖₂ = 0).
    RelRes,
    /// √⟨r, M⁻¹r⟩ / √⟨b, M⁻¹b⟩.
    RelPrecRes,
    /// ‖r‖₂ / max(SMALLREAL, ‖x‖₂).
    RelModRes,
}

/// How much iteration information to print.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum PrintLevel {
    None,
    Min,
    Some,
    More,
}

/// Parameters for one iterative solve.
#[derive(Clone, Debug)]
pub struct ItParam<T> {
    pub solver_kind: SolverKind,
    pub stop_type: StopType,
    pub print_level: PrintLevel,
    pub max_iter: usize,
    pub tol: T,
    /// Restart length for the GMRES family and GCR; ignored elsewhere.
    pub restart: usize,
}

impl<T: num_traits::Float> Default for ItParam<T> {
    fn default() -> Self {
        Self {
            solver_kind: SolverKind::Cg,
            stop_type: StopType::RelRes,
            print_level: PrintLevel::None,
            max_iter: 500,
            tol: T::from(1e-6).unwrap(),
            restart: 25,
        }
    }
}

impl<T: num_traits::Float> ItParam<T> {
    /// Safe-guard checks performed before any workspace is allocated.
    pub fn validate(&self) -> Result<(), KsparError> {
        if self.tol <= T::zero() {
            return Err(KsparError::InputPar("tol must be positive".into()));
        }
        if self.solver_kind.uses_restart() && self.restart < 1 {
            return Err(KsparError::InputPar("restart must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solver_tags_round_trip() {
        for tag in 1..=9 {
            let kind = SolverKind::try_from(tag).unwrap();
            assert!(!kind.name().is_empty());
        }
        assert!(matches!(
            SolverKind::try_from(42),
            Err(KsparError::SolverType(42))
        ));
    }

    #[test]
    fn bad_parameters_are_rejected() {
        let mut p = ItParam::<f64>::default();
        p.tol = 0.0;
        assert!(p.validate().is_err());

        let mut p = ItParam::<f64>::default();
        p.solver_kind = SolverKind::Gmres;
        p.restart = 0;
        assert!(p.validate().is_err());
    }

    #[test]
    fn print_levels_are_ordered() {
        assert!(PrintLevel::None < PrintLevel::Min);
        assert!(PrintLevel::Min < PrintLevel::Some);
        assert!(PrintLevel::Some < PrintLevel::More);
    }
}

//! Sparse matrix containers, format conversion, and mat-vec kernels.

pub mod blc;
pub mod bsr;
pub mod coo;
pub mod csr;
pub mod csrl;
pub mod structured;

pub use blc::{BlcBlock, BlcMatrix};
pub use bsr::{BsrMatrix, StorageManner};
pub use coo::CooMatrix;
pub use csr::CsrMatrix;
pub use csrl::CsrlMatrix;
pub use structured::{Band, StrMatrix};

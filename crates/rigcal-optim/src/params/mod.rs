//! Parameter blocks and the flat-vector contract shared by every unknown.
//!
//! Each block provides:
//!
//! - **`params`** - its unknowns flattened in a fixed order,
//! - **`with_params`** - a new block rebuilt from a vector of exactly that length,
//! - **`sparsity`** - which of its columns each indexed residual may touch.
//!
//! `with_params(x).params() == x` holds exactly for every block.
//!
//! # Available blocks
//!
//! - [`Cameras`] - per-camera intrinsics and distortion, 9 values each
//! - [`CameraPoses`] - per-camera `camera_from_rig` extrinsics, 6 values each
//! - motion models in [`crate::motion`]

mod camera_poses;
mod cameras;
pub mod pose;

pub use camera_poses::CameraPoses;
pub use cameras::{Cameras, CAMERA_DIM};

use nalgebra::DVector;
use rigcal_core::{Error, Real, Result};

use crate::sparsity::{IndexTable, SparsityPattern};

/// A bundle of unknowns that round-trips through a flat vector.
pub trait Parameters: Sized {
    /// Length of [`Parameters::params`].
    fn num_params(&self) -> usize;

    fn params(&self) -> DVector<Real>;

    /// Rebuild from `params`; `ParameterLengthMismatch` unless the length is exact.
    fn with_params(&self, params: &DVector<Real>) -> Result<Self>;

    /// Columns of this block each entry of `index` depends on.
    fn sparsity(&self, index: &IndexTable) -> SparsityPattern;
}

pub(crate) fn check_length(expected: usize, params: &DVector<Real>) -> Result<()> {
    if params.len() != expected {
        return Err(Error::ParameterLengthMismatch {
            expected,
            got: params.len(),
        });
    }
    Ok(())
}

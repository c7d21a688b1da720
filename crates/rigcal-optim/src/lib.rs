//! Parameter blocks, motion models and sparsity patterns for rig calibration.
//!
//! This crate turns a calibration state into the data contracts a
//! non-linear least-squares solver needs: a flat parameter vector that
//! round-trips exactly, a flat residual vector and a Jacobian sparsity
//! pattern. The solver itself is not part of this crate.

pub mod calibration;
pub mod motion;
pub mod packing;
pub mod params;
pub mod problem;
pub mod robust;
pub mod sparsity;

pub use calibration::{Calibration, OptimizeFlags};
pub use motion::{Independent, Motion, MotionKind, MotionModel, Static};
pub use params::{CameraPoses, Cameras, Parameters};
pub use problem::ReprojectionProblem;
pub use robust::RobustKernel;
pub use sparsity::{IndexTable, SparsityPattern};

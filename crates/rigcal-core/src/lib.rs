//! Core tables, geometry and statistics for `rigcal`.
//!
//! This crate contains:
//! - linear algebra type aliases (`Real`, `Vec2`, `Pt3`, `Iso3`, ...),
//! - composable camera models (projection + distortion + intrinsics),
//! - masked n-dimensional tables indexed by `(camera, frame, board, point)`,
//! - broadcast pose composition and projection over those tables,
//! - reprojection error statistics at several granularities,
//! - per-view health shading for reports,
//! - deterministic synthetic rig scenes.
//!
//! Pose conventions: camera poses are `camera_from_rig`, frame poses
//! `rig_from_board`, so `view = camera_from_rig * rig_from_board`.

/// Error taxonomy shared by the workspace.
pub mod error;
/// Broadcast pose composition and point transforms.
pub mod geometry;
/// Linear algebra type aliases and helpers.
pub mod math;
/// Camera models and distortion utilities.
pub mod models;
pub mod report;
pub mod stats;
pub mod synthetic;
/// Masked n-dimensional tables.
pub mod table;

pub use error::{Error, Result};
pub use math::*;
pub use models::*;

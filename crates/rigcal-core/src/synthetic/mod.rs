//! Deterministic synthetic rig scenes for tests and demos.
//!
//! - planar board grids and multi-board layouts,
//! - rig camera layouts (`camera_from_rig`) and board sweeps (`rig_from_board`),
//! - [`RigScene`], which projects the boards through every camera into a
//!   `(camera, frame, board, point)` detection table,
//! - splitmix-based pixel noise.
//!
//! Everything is seeded explicitly and ordered stably.
//!
//! ```no_run
//! use rigcal_core::synthetic::{self, RigScene};
//! use rigcal_core::table::Table;
//!
//! let board = synthetic::grid_points(4, 3, 0.05);
//! let scene = RigScene::new(
//!     vec![synthetic::default_camera(); 2],
//!     synthetic::rig_layout(2, 0.2, 0.05),
//!     synthetic::board_sweep(3, -0.2, 0.2, 1.0),
//!     vec![board],
//! )
//! .unwrap();
//! let detections = scene.detections().unwrap();
//! assert_eq!(detections.shape(), &[2, 3, 1, 12]);
//! ```

pub mod noise;
mod rig;

pub use noise::UniformPixelNoise;
pub use rig::{board_sweep, default_camera, grid_points, rig_layout, RigScene};

use anyhow::{ensure, Result};
use nalgebra::{Translation3, UnitQuaternion, Vector3};
use ndarray::Axis;

use super::UniformPixelNoise;
use crate::geometry::{expand_poses, project_views, transform_boards, transform_points};
use crate::models::{CameraParams, DistortionParams, FxFyCxCySkew, PinholeCamera};
use crate::table::{PointTable, PoseEstimates, PoseTable, Table};
use crate::{Iso3, Pt3, Real};

/// Planar grid (Z=0) of `nx * ny` points, row-major with Y major.
pub fn grid_points(nx: usize, ny: usize, spacing: Real) -> Vec<Pt3> {
    (0..ny)
        .flat_map(|j| (0..nx).map(move |i| Pt3::new(i as Real * spacing, j as Real * spacing, 0.0)))
        .collect()
}

/// 640x480 pinhole camera without distortion.
pub fn default_camera() -> CameraParams {
    CameraParams {
        intrinsics: FxFyCxCySkew {
            fx: 600.0,
            fy: 600.0,
            cx: 320.0,
            cy: 240.0,
            skew: 0.0,
        },
        distortion: DistortionParams::None,
    }
}

/// `camera_from_rig` for `n` cameras on a horizontal bar centred on the rig origin.
///
/// Cameras are `baseline` apart and toed in towards the centre by `toe_in`
/// radians per step from the middle. The first camera is not the identity;
/// pose estimates are only defined up to the rig frame anyway.
pub fn rig_layout(n: usize, baseline: Real, toe_in: Real) -> Vec<Iso3> {
    let mid = (n as Real - 1.0) / 2.0;
    (0..n)
        .map(|c| {
            let offset = c as Real - mid;
            let rig_from_camera = Iso3::from_parts(
                Translation3::new(offset * baseline, 0.0, 0.0),
                UnitQuaternion::from_scaled_axis(Vector3::y() * (-toe_in * offset)),
            );
            rig_from_camera.inverse()
        })
        .collect()
}

/// `rig_from_board` for `n_frames` captures of a board centred at `(cx, cy)`.
///
/// The board sits `distance` in front of the rig, yawed about +Y from
/// `yaw_start` in steps of `yaw_step`, and shifted slightly in X and Y per frame.
pub fn board_sweep(n_frames: usize, yaw_start: Real, yaw_step: Real, distance: Real) -> Vec<Iso3> {
    (0..n_frames)
        .map(|f| {
            let yaw = yaw_start + yaw_step * f as Real;
            let shift = 0.02 * (f as Real - (n_frames as Real - 1.0) / 2.0);
            Iso3::from_parts(
                Translation3::new(shift, -shift, distance),
                UnitQuaternion::from_scaled_axis(Vector3::y() * yaw),
            )
        })
        .collect()
}

/// Ground truth for a rig observing one or more planar boards.
#[derive(Debug, Clone)]
pub struct RigScene {
    pub cameras: Vec<CameraParams>,
    pub estimates: PoseEstimates,
    /// `base_from_board` for each board, shape `(B,)`.
    pub board_poses: PoseTable,
    pub boards: Vec<Vec<Pt3>>,
    pub noise: UniformPixelNoise,
}

impl RigScene {
    /// Scene with boards centred on the base board frame origin.
    ///
    /// Every board is recentred so that the sweep poses aim at its middle;
    /// additional boards are stacked along +X, 1.5 board widths apart.
    pub fn new(
        cameras: Vec<CameraParams>,
        camera_from_rig: Vec<Iso3>,
        rig_from_board: Vec<Iso3>,
        boards: Vec<Vec<Pt3>>,
    ) -> Result<Self> {
        ensure!(!cameras.is_empty(), "scene needs at least one camera");
        ensure!(
            cameras.len() == camera_from_rig.len(),
            "{} cameras but {} camera poses",
            cameras.len(),
            camera_from_rig.len()
        );
        ensure!(!boards.is_empty(), "scene needs at least one board");

        let boards: Vec<Vec<Pt3>> = boards.into_iter().map(centred).collect();
        let width = boards[0]
            .iter()
            .map(|p| p.x.abs())
            .fold(0.0, Real::max)
            * 2.0;
        let board_poses: Vec<Iso3> = (0..boards.len())
            .map(|b| Iso3::translation(1.5 * width * b as Real, 0.0, 0.0))
            .collect();

        Ok(Self {
            cameras,
            estimates: PoseEstimates {
                camera: PoseTable::from_poses(camera_from_rig),
                frames: PoseTable::from_poses(rig_from_board),
            },
            board_poses: PoseTable::from_poses(board_poses),
            boards,
            noise: UniformPixelNoise::default(),
        })
    }

    pub fn with_noise(mut self, noise: UniformPixelNoise) -> Self {
        self.noise = noise;
        self
    }

    pub fn num_cameras(&self) -> usize {
        self.cameras.len()
    }

    pub fn num_frames(&self) -> usize {
        self.estimates.frames.len()
    }

    pub fn camera_models(&self) -> Vec<PinholeCamera> {
        self.cameras.iter().map(CameraParams::build).collect()
    }

    /// Board points in the base board frame, shape `(B, P)`.
    pub fn world_points(&self) -> Result<PointTable<Pt3>> {
        Ok(transform_boards(&self.board_poses, &self.boards)?)
    }

    /// Noiseless projections, shape `(C, F, B, P)`.
    ///
    /// Points behind a camera are invalid.
    pub fn projected(&self) -> Result<PointTable> {
        let views = expand_poses(&self.estimates)?;
        let camera_points = transform_points(&self.world_points()?, &views)?;
        Ok(project_views(&self.camera_models(), &camera_points)?)
    }

    /// Projections with the scene's pixel noise applied.
    pub fn detections(&self) -> Result<PointTable> {
        Ok(self.noise.apply(&self.projected()?)?)
    }

    /// Detections with every point of the listed `(camera, frame)` views removed.
    pub fn detections_without(&self, missing: &[(usize, usize)]) -> Result<PointTable> {
        let detections = self.detections()?;
        let mut valid = detections.valid_points().clone();
        for &(c, f) in missing {
            ensure!(
                c < self.num_cameras() && f < self.num_frames(),
                "view ({c}, {f}) outside {}x{} scene",
                self.num_cameras(),
                self.num_frames()
            );
            valid
                .index_axis_mut(Axis(0), c)
                .index_axis_mut(Axis(0), f)
                .fill(false);
        }
        Ok(detections.with_valid(valid)?)
    }
}

fn centred(board: Vec<Pt3>) -> Vec<Pt3> {
    let n = board.len().max(1) as Real;
    let centre = board.iter().fold(Vector3::zeros(), |acc, p| acc + p.coords) / n;
    board.into_iter().map(|p| p - centre).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose_distance;

    fn scene() -> RigScene {
        RigScene::new(
            vec![default_camera(); 2],
            rig_layout(2, 0.2, 0.05),
            board_sweep(3, -0.2, 0.2, 1.0),
            vec![grid_points(3, 2, 0.05)],
        )
        .unwrap()
    }

    #[test]
    fn grid_points_order_is_stable() {
        let pts = grid_points(2, 3, 0.5);
        assert_eq!(pts.len(), 6);
        assert_eq!(pts[0], Pt3::new(0.0, 0.0, 0.0));
        assert_eq!(pts[1], Pt3::new(0.5, 0.0, 0.0));
        assert_eq!(pts[2], Pt3::new(0.0, 0.5, 0.0));
    }

    #[test]
    fn rig_layout_is_symmetric() {
        let rig = rig_layout(3, 0.1, 0.0);
        assert!(pose_distance(&rig[1], &Iso3::identity()) < 1e-12);
        let a = rig[0].inverse().translation.vector;
        let b = rig[2].inverse().translation.vector;
        assert!((a.x + b.x).abs() < 1e-12);
        assert!((b.x - 0.1).abs() < 1e-12);
    }

    #[test]
    fn every_point_is_detected_in_front_of_the_rig() {
        let scene = scene();
        let detections = scene.detections().unwrap();
        assert_eq!(detections.shape(), &[2, 3, 1, 6]);
        assert_eq!(detections.count_valid(), 36);
        for p in detections.points().iter() {
            assert!(p.x > 0.0 && p.x < 640.0 && p.y > 0.0 && p.y < 480.0);
        }
    }

    #[test]
    fn removed_views_are_invalid() {
        let detections = scene().detections_without(&[(0, 1)]).unwrap();
        assert_eq!(detections.count_valid(), 30);
        assert_eq!(detections.get(&[0, 1, 0, 0]).unwrap(), None);
        assert!(detections.get(&[1, 1, 0, 0]).unwrap().is_some());
        assert!(scene().detections_without(&[(2, 0)]).is_err());
    }

    #[test]
    fn noise_moves_detections_deterministically() {
        let clean = scene().detections().unwrap();
        let noisy = scene().with_noise(UniformPixelNoise::new(1, 0.5));
        let a = noisy.detections().unwrap();
        assert_eq!(a, noisy.detections().unwrap());
        let diff = ndarray::Zip::from(a.points())
            .and(clean.points())
            .fold(0.0, |m: Real, p, q| m.max((p - q).amax()));
        assert!(diff > 0.0 && diff <= 0.5);
    }

    #[test]
    fn rejects_mismatched_cameras() {
        let err = RigScene::new(
            vec![default_camera(); 2],
            rig_layout(3, 0.2, 0.0),
            board_sweep(1, 0.0, 0.0, 1.0),
            vec![grid_points(2, 2, 0.1)],
        );
        assert!(err.is_err());
    }

    #[test]
    fn multiple_boards_are_laid_side_by_side() {
        let scene = RigScene::new(
            vec![default_camera()],
            rig_layout(1, 0.0, 0.0),
            board_sweep(1, 0.0, 0.0, 2.0),
            vec![grid_points(2, 2, 0.1), grid_points(2, 2, 0.1)],
        )
        .unwrap();
        let world = scene.world_points().unwrap();
        assert_eq!(world.shape(), &[2, 4]);
        let first = world.get(&[0, 0]).unwrap().unwrap();
        let second = world.get(&[1, 0]).unwrap().unwrap();
        assert!((second.x - first.x - 0.15).abs() < 1e-12);
    }
}

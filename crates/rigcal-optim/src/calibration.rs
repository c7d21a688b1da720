//! The full calibration state: cameras, extrinsics, motion and observations.

use anyhow::ensure;
use log::debug;
use nalgebra::DVector;
use ndarray::{ArrayD, Zip};
use rigcal_core::geometry::view_poses;
use rigcal_core::stats::{
    inlier_mask, inlier_threshold, reprojection_error, reprojection_tables, ErrorTable,
    LabelledErrors, OutlierPolicy, StatsTable,
};
use rigcal_core::table::{Granularity, PointTable, PoseEstimates, Table};
use rigcal_core::{Error, Iso3, Pt3, Real, Result};
use serde::{Deserialize, Serialize};

use crate::motion::{Motion, MotionModel};
use crate::packing::{pack, unpack};
use crate::params::{CameraPoses, Cameras, Parameters};
use crate::sparsity::{IndexTable, SparsityPattern};

/// Which parameter blocks the solver may change.
///
/// Fixed blocks are left out of `params` and carried forward unchanged by
/// `with_params`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizeFlags {
    pub cameras: bool,
    pub camera_poses: bool,
    pub motion: bool,
}

impl Default for OptimizeFlags {
    fn default() -> Self {
        Self {
            cameras: true,
            camera_poses: true,
            motion: true,
        }
    }
}

impl OptimizeFlags {
    /// Poses only, intrinsics held fixed.
    pub fn poses_only() -> Self {
        Self {
            cameras: false,
            ..Self::default()
        }
    }
}

/// Calibration state over a `(camera, frame, board, point)` detection table.
///
/// Selected blocks are flattened in the order cameras, camera poses, motion.
#[derive(Debug, Clone)]
pub struct Calibration {
    cameras: Cameras,
    camera_poses: CameraPoses,
    motion: Motion,
    world_points: PointTable<Pt3>,
    detections: PointTable,
    inliers: ArrayD<bool>,
    optimize: OptimizeFlags,
}

impl Calibration {
    /// Assemble a calibration; every detection starts as an inlier.
    ///
    /// `world_points` is `(B, P)` and `detections` `(C, F, B, P)`; the camera,
    /// extrinsic and motion counts must agree with it.
    pub fn new(
        cameras: Cameras,
        camera_poses: CameraPoses,
        motion: Motion,
        world_points: PointTable<Pt3>,
        detections: PointTable,
    ) -> anyhow::Result<Self> {
        let &[n_cameras, n_frames, n_boards, n_points] = detections.shape() else {
            anyhow::bail!("detections must be (camera, frame, board, point), got {:?}", detections.shape());
        };
        ensure!(
            cameras.len() == n_cameras,
            "{} camera models for {} detection cameras",
            cameras.len(),
            n_cameras
        );
        ensure!(
            camera_poses.num_cameras() == n_cameras,
            "{} camera poses for {} detection cameras",
            camera_poses.num_cameras(),
            n_cameras
        );
        ensure!(
            motion.num_frames() == n_frames,
            "motion has {} frames, detections have {}",
            motion.num_frames(),
            n_frames
        );
        if let Motion::Independent(m) = &motion {
            ensure!(
                m.num_cameras() == n_cameras,
                "independent motion has {} cameras, detections have {}",
                m.num_cameras(),
                n_cameras
            );
        }
        ensure!(
            world_points.shape() == [n_boards, n_points],
            "world points {:?} do not match {} boards of {} points",
            world_points.shape(),
            n_boards,
            n_points
        );

        debug!(
            "calibration: {} cameras, {} frames, {} boards, {} valid detections, {:?} motion",
            n_cameras,
            n_frames,
            n_boards,
            detections.count_valid(),
            motion.kind()
        );
        let inliers = detections.valid_points().clone();
        Ok(Self {
            cameras,
            camera_poses,
            motion,
            world_points,
            detections,
            inliers,
            optimize: OptimizeFlags::default(),
        })
    }

    pub fn with_optimize(mut self, optimize: OptimizeFlags) -> Self {
        self.optimize = optimize;
        self
    }

    /// Replace the inlier mask; entries are also restricted to valid detections.
    pub fn with_inliers(mut self, inliers: ArrayD<bool>) -> Result<Self> {
        if inliers.shape() != self.detections.shape() {
            return Err(Error::shape_mismatch("inliers", self.detections.shape(), inliers.shape()));
        }
        self.inliers = Zip::from(&inliers)
            .and(self.detections.valid_points())
            .map_collect(|&i, &v| i && v);
        Ok(self)
    }

    pub fn cameras(&self) -> &Cameras {
        &self.cameras
    }

    pub fn camera_poses(&self) -> &CameraPoses {
        &self.camera_poses
    }

    pub fn motion(&self) -> &Motion {
        &self.motion
    }

    pub fn world_points(&self) -> &PointTable<Pt3> {
        &self.world_points
    }

    pub fn detections(&self) -> &PointTable {
        &self.detections
    }

    pub fn inliers(&self) -> &ArrayD<bool> {
        &self.inliers
    }

    pub fn optimize(&self) -> OptimizeFlags {
        self.optimize
    }

    /// Residual index over detections currently classified as inliers.
    pub fn index_table(&self) -> Result<IndexTable> {
        IndexTable::from_valid(&self.detections.with_valid(self.inliers.clone())?)
    }

    /// Predicted points for every board point, detected or not.
    pub fn projected(&self) -> Result<PointTable> {
        self.motion.project(
            self.cameras.models(),
            &self.camera_poses.poses()?,
            &self.world_points,
        )
    }

    pub fn errors(&self) -> Result<ErrorTable> {
        reprojection_error(&self.projected()?, &self.detections)
    }

    /// Errors with the current inlier mask attached.
    pub fn labelled_errors(&self) -> Result<LabelledErrors> {
        self.errors()?.extend("inliers", self.inliers.clone())
    }

    /// Statistics at every granularity.
    pub fn reprojection_tables(&self, inlier_only: bool) -> Result<Granularity<StatsTable>> {
        reprojection_tables(&self.labelled_errors()?, inlier_only)
    }

    /// Reclassify inliers against a threshold fitted by `policy`.
    pub fn reject_outliers(&self, policy: &OutlierPolicy) -> Result<Self> {
        let errors = self.errors()?;
        let threshold = inlier_threshold(&errors, policy)?;
        let inliers = inlier_mask(&errors, threshold);
        let kept = inliers.iter().filter(|&&i| i).count();
        debug!(
            "outlier rejection: kept {} of {} points (threshold {:.3} px)",
            kept,
            self.detections.count_valid(),
            threshold
        );
        Ok(Self {
            inliers,
            ..self.clone()
        })
    }

    pub fn pose_estimates(&self) -> Result<PoseEstimates> {
        self.motion.pose_estimates(&self.camera_poses.poses()?)
    }

    /// Inverted view poses per frame, per camera, `None` where invalid.
    pub fn view_poses(&self) -> Result<Vec<Vec<Option<Iso3>>>> {
        view_poses(&self.pose_estimates()?)
    }

    fn selected_lens(&self) -> Vec<usize> {
        let flags = self.optimize;
        [
            (flags.cameras, self.cameras.num_params()),
            (flags.camera_poses, self.camera_poses.num_params()),
            (flags.motion, self.motion.num_params()),
        ]
        .into_iter()
        .filter_map(|(selected, len)| selected.then_some(len))
        .collect()
    }
}

impl Parameters for Calibration {
    fn num_params(&self) -> usize {
        self.selected_lens().iter().sum()
    }

    fn params(&self) -> DVector<Real> {
        let flags = self.optimize;
        let mut parts = Vec::new();
        if flags.cameras {
            parts.push(self.cameras.params());
        }
        if flags.camera_poses {
            parts.push(self.camera_poses.params());
        }
        if flags.motion {
            parts.push(self.motion.params());
        }
        pack(&parts)
    }

    fn with_params(&self, params: &DVector<Real>) -> Result<Self> {
        let flags = self.optimize;
        let mut parts = unpack(params, &self.selected_lens())?.into_iter();
        let mut next = |selected: bool| if selected { parts.next() } else { None };

        let mut updated = self.clone();
        if let Some(x) = next(flags.cameras) {
            updated.cameras = self.cameras.with_params(&x)?;
        }
        if let Some(x) = next(flags.camera_poses) {
            updated.camera_poses = self.camera_poses.with_params(&x)?;
        }
        if let Some(x) = next(flags.motion) {
            updated.motion = self.motion.with_params(&x)?;
        }
        Ok(updated)
    }

    fn sparsity(&self, index: &IndexTable) -> SparsityPattern {
        let flags = self.optimize;
        let mut pattern = SparsityPattern::empty(index);
        if flags.cameras {
            pattern = pattern.join(&self.cameras.sparsity(index));
        }
        if flags.camera_poses {
            pattern = pattern.join(&self.camera_poses.sparsity(index));
        }
        if flags.motion {
            pattern = pattern.join(&self.motion.sparsity(index));
        }
        pattern
    }
}

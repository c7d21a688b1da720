//! Motion models: how boards move relative to the rig across frames.
//!
//! Every model implements [`Parameters`] plus [`MotionModel`], which turns
//! its unknowns into the per-frame object poses consumed by
//! [`expand_views`]. New models are added as a variant of [`Motion`].

mod independent;
mod static_rig;

pub use independent::Independent;
pub use static_rig::Static;

use log::debug;
use nalgebra::DVector;
use ndarray::Zip;
use rigcal_core::geometry::{expand_views, project_views, transform_points, ProjectPoints};
use rigcal_core::table::{PointTable, PoseEstimates, PoseTable, Table};
use rigcal_core::{Error, Pt3, Real, Result};
use serde::{Deserialize, Serialize};

use crate::params::Parameters;
use crate::sparsity::{IndexTable, SparsityPattern};

/// Reconstruction of object poses from a parameter set.
pub trait MotionModel: Parameters {
    fn num_frames(&self) -> usize;

    /// Object poses, `(F,)` when shared by all cameras or `(C, F)`.
    fn frame_poses(&self) -> Result<PoseTable>;

    /// Compact estimates for viewers and pose expansion.
    fn pose_estimates(&self, camera_poses: &PoseTable) -> Result<PoseEstimates> {
        Ok(PoseEstimates {
            camera: camera_poses.clone(),
            frames: self.frame_poses()?,
        })
    }

    /// Predicted image points `(C, F, B, P)` for board points `(B, P)`.
    ///
    /// A point is valid where its view is valid and it projects in front of
    /// the camera; detections play no part.
    fn project<C: ProjectPoints>(
        &self,
        cameras: &[C],
        camera_poses: &PoseTable,
        world_points: &PointTable<Pt3>,
    ) -> Result<PointTable> {
        let views = expand_views(camera_poses, &self.frame_poses()?)?;
        let transformed = transform_points(world_points, &views)?;
        project_views(cameras, &transformed)
    }

    /// [`MotionModel::project`] restricted to points that were detected.
    fn reproject<C: ProjectPoints>(
        &self,
        cameras: &[C],
        camera_poses: &PoseTable,
        world_points: &PointTable<Pt3>,
        detected: &PointTable,
    ) -> Result<PointTable> {
        let projected = self.project(cameras, camera_poses, world_points)?;
        if projected.shape() != detected.shape() {
            return Err(Error::shape_mismatch("detected", projected.shape(), detected.shape()));
        }
        let valid = Zip::from(projected.valid_points())
            .and(detected.valid_points())
            .map_collect(|&p, &d| p && d);
        projected.with_valid(valid)
    }
}

/// Motion model selected at run time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Motion {
    Static(Static),
    Independent(Independent),
}

impl Motion {
    pub fn kind(&self) -> MotionKind {
        match self {
            Motion::Static(_) => MotionKind::Static,
            Motion::Independent(_) => MotionKind::Independent,
        }
    }
}

impl From<Static> for Motion {
    fn from(model: Static) -> Self {
        Motion::Static(model)
    }
}

impl From<Independent> for Motion {
    fn from(model: Independent) -> Self {
        Motion::Independent(model)
    }
}

impl Parameters for Motion {
    fn num_params(&self) -> usize {
        match self {
            Motion::Static(m) => m.num_params(),
            Motion::Independent(m) => m.num_params(),
        }
    }

    fn params(&self) -> DVector<Real> {
        match self {
            Motion::Static(m) => m.params(),
            Motion::Independent(m) => m.params(),
        }
    }

    fn with_params(&self, params: &DVector<Real>) -> Result<Self> {
        Ok(match self {
            Motion::Static(m) => Motion::Static(m.with_params(params)?),
            Motion::Independent(m) => Motion::Independent(m.with_params(params)?),
        })
    }

    fn sparsity(&self, index: &IndexTable) -> SparsityPattern {
        match self {
            Motion::Static(m) => m.sparsity(index),
            Motion::Independent(m) => m.sparsity(index),
        }
    }
}

impl MotionModel for Motion {
    fn num_frames(&self) -> usize {
        match self {
            Motion::Static(m) => MotionModel::num_frames(m),
            Motion::Independent(m) => MotionModel::num_frames(m),
        }
    }

    fn frame_poses(&self) -> Result<PoseTable> {
        match self {
            Motion::Static(m) => m.frame_poses(),
            Motion::Independent(m) => m.frame_poses(),
        }
    }
}

/// Configuration choosing which motion model to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionKind {
    #[default]
    Static,
    Independent,
}

impl MotionKind {
    /// Build the model from initial object poses.
    ///
    /// `Static` takes `(F,)` poses. `Independent` takes `(C, F)` poses, or
    /// `(F,)` poses which every camera starts from.
    pub fn init(self, num_cameras: usize, frames: &PoseTable) -> Result<Motion> {
        debug!(
            "initialising {:?} motion for {} cameras, frame poses {:?}",
            self,
            num_cameras,
            frames.shape()
        );
        match (self, frames.rank()) {
            (MotionKind::Static, _) => Ok(Static::from_poses(frames)?.into()),
            (MotionKind::Independent, 1) => Ok(Independent::from_shared(num_cameras, frames)?.into()),
            (MotionKind::Independent, _) => {
                if frames.shape().first() != Some(&num_cameras) {
                    return Err(Error::shape_mismatch(
                        "frame_poses",
                        &[num_cameras, frames.shape().get(1).copied().unwrap_or(0)],
                        frames.shape(),
                    ));
                }
                Ok(Independent::from_poses(frames)?.into())
            }
        }
    }
}

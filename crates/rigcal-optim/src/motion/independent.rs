use nalgebra::DVector;
use ndarray::{ArrayD, IxDyn};
use rigcal_core::table::{PoseTable, Table};
use rigcal_core::{Error, Real, Result};
use serde::{Deserialize, Serialize};

use super::MotionModel;
use crate::params::pose::{params_to_poses, poses_to_params, POSE_DIM};
use crate::params::{check_length, Parameters};
use crate::sparsity::{IndexTable, SparsityPattern};

/// One board pose per (camera, frame), each camera moving on its own.
///
/// Parameters are laid out camera-major: block `c * F + f`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawIndependent")]
pub struct Independent {
    params: DVector<Real>,
    num_cameras: usize,
    num_frames: usize,
    valid: Vec<bool>,
}

impl Independent {
    /// From a `(C, F)` pose table.
    pub fn from_poses(poses: &PoseTable) -> Result<Self> {
        let [num_cameras, num_frames] = *poses.shape() else {
            return Err(Error::shape_mismatch("frame_poses", &[0, 0], poses.shape()));
        };
        Ok(Self {
            params: poses_to_params(poses.poses().iter()),
            num_cameras,
            num_frames,
            valid: poses.valid_poses().iter().copied().collect(),
        })
    }

    /// Every camera starts from the same `(F,)` frame poses.
    pub fn from_shared(num_cameras: usize, frames: &PoseTable) -> Result<Self> {
        if frames.rank() != 1 {
            return Err(Error::shape_mismatch("frame_poses", &[frames.len()], frames.shape()));
        }
        let tiled: Vec<PoseTable> = (0..num_cameras).map(|_| frames.clone()).collect();
        Self::from_poses(&PoseTable::stack(&tiled)?)
    }

    pub fn num_cameras(&self) -> usize {
        self.num_cameras
    }
}

#[derive(Deserialize)]
struct RawIndependent {
    params: DVector<Real>,
    num_cameras: usize,
    num_frames: usize,
    valid: Vec<bool>,
}

impl TryFrom<RawIndependent> for Independent {
    type Error = Error;

    fn try_from(raw: RawIndependent) -> Result<Self> {
        let views = raw.num_cameras * raw.num_frames;
        if raw.valid.len() != views {
            return Err(Error::shape_mismatch(
                "valid",
                &[raw.num_cameras, raw.num_frames],
                &[raw.valid.len()],
            ));
        }
        check_length(POSE_DIM * views, &raw.params)?;
        Ok(Self {
            params: raw.params,
            num_cameras: raw.num_cameras,
            num_frames: raw.num_frames,
            valid: raw.valid,
        })
    }
}

impl Parameters for Independent {
    fn num_params(&self) -> usize {
        POSE_DIM * self.num_cameras * self.num_frames
    }

    fn params(&self) -> DVector<Real> {
        self.params.clone()
    }

    fn with_params(&self, params: &DVector<Real>) -> Result<Self> {
        check_length(self.num_params(), params)?;
        Ok(Self {
            params: params.clone(),
            ..self.clone()
        })
    }

    fn sparsity(&self, index: &IndexTable) -> SparsityPattern {
        let frames = self.num_frames;
        SparsityPattern::blocks(index, self.num_cameras * frames, POSE_DIM, |e| {
            e[0] * frames + e[1]
        })
    }
}

impl MotionModel for Independent {
    fn num_frames(&self) -> usize {
        self.num_frames
    }

    fn frame_poses(&self) -> Result<PoseTable> {
        let shape = IxDyn(&[self.num_cameras, self.num_frames]);
        let poses = params_to_poses(&self.params)?;
        let flat = |idx: &IxDyn| idx[0] * self.num_frames + idx[1];
        PoseTable::create(
            ArrayD::from_shape_fn(shape.clone(), |idx| poses[flat(&idx)]),
            ArrayD::from_shape_fn(shape, |idx| self.valid[flat(&idx)]),
        )
    }
}

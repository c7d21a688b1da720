use nalgebra::DVector;
use rigcal_core::table::{PoseTable, Table};
use rigcal_core::{Error, Iso3, Real, Result};
use serde::{Deserialize, Serialize};

use super::MotionModel;
use crate::params::pose::{params_to_poses, poses_to_params, RawPoses, POSE_DIM};
use crate::params::{check_length, Parameters};
use crate::sparsity::{IndexTable, SparsityPattern};

/// One `rig_from_board` pose per frame, shared by every camera.
///
/// Parameters are the frame pose vectors in frame order. A residual from
/// frame `f` depends only on block `f`, so the pattern is block-diagonal in
/// the frame axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPoses")]
pub struct Static {
    params: DVector<Real>,
    valid: Vec<bool>,
}

impl Static {
    /// From a `(F,)` table of `rig_from_board` poses.
    pub fn from_poses(poses: &PoseTable) -> Result<Self> {
        if poses.rank() != 1 {
            return Err(Error::shape_mismatch("frame_poses", &[poses.len()], poses.shape()));
        }
        Ok(Self {
            params: poses_to_params(poses.poses().iter()),
            valid: poses.valid_poses().iter().copied().collect(),
        })
    }
}

impl TryFrom<RawPoses> for Static {
    type Error = Error;

    fn try_from(raw: RawPoses) -> Result<Self> {
        let (params, valid) = raw.checked()?;
        Ok(Self { params, valid })
    }
}

impl Parameters for Static {
    fn num_params(&self) -> usize {
        POSE_DIM * self.num_frames()
    }

    fn params(&self) -> DVector<Real> {
        self.params.clone()
    }

    fn with_params(&self, params: &DVector<Real>) -> Result<Self> {
        check_length(self.num_params(), params)?;
        Ok(Self {
            params: params.clone(),
            valid: self.valid.clone(),
        })
    }

    fn sparsity(&self, index: &IndexTable) -> SparsityPattern {
        SparsityPattern::blocks(index, self.num_frames(), POSE_DIM, |e| e[1])
    }
}

impl MotionModel for Static {
    fn num_frames(&self) -> usize {
        self.valid.len()
    }

    fn frame_poses(&self) -> Result<PoseTable> {
        let poses: Vec<Option<Iso3>> = params_to_poses(&self.params)?
            .into_iter()
            .zip(&self.valid)
            .map(|(pose, &valid)| valid.then_some(pose))
            .collect();
        Ok(PoseTable::from_options(&poses))
    }
}

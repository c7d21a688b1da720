use nalgebra::DVector;
use rigcal_core::table::{PoseTable, Table};
use rigcal_core::{Error, Iso3, Real, Result};
use serde::{Deserialize, Serialize};

use super::pose::{params_to_poses, poses_to_params, RawPoses, POSE_DIM};
use super::{check_length, Parameters};
use crate::sparsity::{IndexTable, SparsityPattern};

/// Per-camera `camera_from_rig` extrinsics, one pose vector per camera.
///
/// The raw vector is the stored state, so round-trips are exact.
/// Validity is carried alongside and never optimized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPoses")]
pub struct CameraPoses {
    params: DVector<Real>,
    valid: Vec<bool>,
}

impl CameraPoses {
    /// From a `(C,)` pose table.
    pub fn from_table(poses: &PoseTable) -> Result<Self> {
        if poses.rank() != 1 {
            return Err(Error::shape_mismatch(
                "camera_poses",
                &[poses.len()],
                poses.shape(),
            ));
        }
        Ok(Self {
            params: poses_to_params(poses.poses().iter()),
            valid: poses.valid_poses().iter().copied().collect(),
        })
    }

    pub fn num_cameras(&self) -> usize {
        self.valid.len()
    }

    pub fn poses(&self) -> Result<PoseTable> {
        let poses: Vec<Option<Iso3>> = params_to_poses(&self.params)?
            .into_iter()
            .zip(&self.valid)
            .map(|(pose, &valid)| valid.then_some(pose))
            .collect();
        Ok(PoseTable::from_options(&poses))
    }
}

impl TryFrom<RawPoses> for CameraPoses {
    type Error = Error;

    fn try_from(raw: RawPoses) -> Result<Self> {
        let (params, valid) = raw.checked()?;
        Ok(Self { params, valid })
    }
}

impl Parameters for CameraPoses {
    fn num_params(&self) -> usize {
        POSE_DIM * self.num_cameras()
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
        SparsityPattern::blocks(index, self.num_cameras(), POSE_DIM, |e| e[0])
    }
}

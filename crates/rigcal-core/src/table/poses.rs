use ndarray::{Array1, ArrayD, IxDyn};
use serde::{Deserialize, Serialize};

use super::{check_shape, concat_field, insert_field, take_field, Table};
use crate::{Error, Iso3, Result};

/// Rigid poses with a companion validity flag per entry.
///
/// An invalid entry stores an identity placeholder that must never be used
/// as geometry; composition propagates validity with a logical AND.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseTable {
    poses: ArrayD<Iso3>,
    valid: ArrayD<bool>,
}

impl PoseTable {
    pub fn create(poses: ArrayD<Iso3>, valid: ArrayD<bool>) -> Result<Self> {
        check_shape("valid_poses", poses.shape(), valid.shape())?;
        Ok(Self { poses, valid })
    }

    /// Rank-1 table of valid poses.
    pub fn from_poses(poses: Vec<Iso3>) -> Self {
        let n = poses.len();
        Self {
            poses: Array1::from(poses).into_dyn(),
            valid: ArrayD::from_elem(IxDyn(&[n]), true),
        }
    }

    /// Rank-1 table where `None` marks an invalid (unknown) pose.
    pub fn from_options(poses: &[Option<Iso3>]) -> Self {
        let n = poses.len();
        Self {
            poses: ArrayD::from_shape_fn(IxDyn(&[n]), |idx| {
                poses[idx[0]].unwrap_or_else(Iso3::identity)
            }),
            valid: ArrayD::from_shape_fn(IxDyn(&[n]), |idx| poses[idx[0]].is_some()),
        }
    }

    pub fn poses(&self) -> &ArrayD<Iso3> {
        &self.poses
    }

    pub fn valid_poses(&self) -> &ArrayD<bool> {
        &self.valid
    }

    /// Pose at full-rank `coords`, `None` when it is not valid.
    pub fn get(&self, coords: &[usize]) -> Result<Option<Iso3>> {
        let in_range = coords.len() == self.poses.ndim()
            && coords.iter().zip(self.poses.shape()).all(|(&c, &n)| c < n);
        if !in_range {
            return Err(Error::IndexOutOfRange {
                index: coords.to_vec(),
                shape: self.poses.shape().to_vec(),
            });
        }
        Ok(self.valid[coords].then(|| self.poses[coords]))
    }

    /// Element-wise rigid inverse; validity is unchanged.
    pub fn inverse(&self) -> Self {
        Self {
            poses: self.poses.map(|p| p.inverse()),
            valid: self.valid.clone(),
        }
    }

    pub fn count_valid(&self) -> usize {
        self.valid.iter().filter(|&&v| v).count()
    }
}

impl Table for PoseTable {
    fn shape(&self) -> &[usize] {
        self.poses.shape()
    }

    fn take(&self, axis: usize, index: usize) -> Self {
        Self {
            poses: take_field(&self.poses, axis, index),
            valid: take_field(&self.valid, axis, index),
        }
    }

    fn insert_axis(&self, axis: usize) -> Self {
        Self {
            poses: insert_field(&self.poses, axis),
            valid: insert_field(&self.valid, axis),
        }
    }

    fn concat_fields(axis: usize, parts: &[Self]) -> Result<Self> {
        Ok(Self {
            poses: concat_field("poses", axis, parts.iter().map(|p| p.poses.view()))?,
            valid: concat_field("valid_poses", axis, parts.iter().map(|p| p.valid.view()))?,
        })
    }
}

/// Compact pose estimates of a rig capture.
///
/// `camera` holds one `camera_from_rig` extrinsic per camera, `frames` one
/// `rig_from_board` pose per frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseEstimates {
    pub camera: PoseTable,
    pub frames: PoseTable,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{iso3_from_rtvec, pose_distance, Vec3};

    fn sample_pose(seed: f64) -> Iso3 {
        iso3_from_rtvec(
            &Vec3::new(0.3 * seed, -0.2, 0.1 + seed),
            &Vec3::new(seed, 2.0 - seed, 0.5),
        )
    }

    #[test]
    fn inverse_twice_recovers_pose() {
        let table = PoseTable::from_poses((0..5).map(|i| sample_pose(i as f64 * 0.7)).collect());
        let back = table.inverse().inverse();
        for (a, b) in table.poses().iter().zip(back.poses().iter()) {
            assert!(pose_distance(a, b) < 1e-9);
        }
        assert_eq!(back.valid_poses(), table.valid_poses());
    }

    #[test]
    fn options_mark_missing_poses_invalid() {
        let table = PoseTable::from_options(&[Some(sample_pose(1.0)), None]);
        assert_eq!(table.count_valid(), 1);
        assert!(table.get(&[0]).unwrap().is_some());
        assert!(table.get(&[1]).unwrap().is_none());
        assert!(table.get(&[2]).is_err());
    }

    #[test]
    fn pose_table_json_roundtrip() {
        let table = PoseTable::from_options(&[Some(sample_pose(0.5)), None]);
        let json = serde_json::to_string(&table).unwrap();
        let back: PoseTable = serde_json::from_str(&json).unwrap();
        assert_eq!(back.valid_poses(), table.valid_poses());
        let a = table.get(&[0]).unwrap().unwrap();
        let b = back.get(&[0]).unwrap().unwrap();
        assert!(pose_distance(&a, &b) < 1e-12);
    }
}

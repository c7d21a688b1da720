//! Axis-angle pose vectors `[rx, ry, rz, tx, ty, tz]`.

use nalgebra::DVector;
use rigcal_core::{iso3_from_rtvec, Error, Iso3, Real, Result, Vec3};
use serde::Deserialize;

/// Length of one pose vector.
pub const POSE_DIM: usize = 6;

/// Convert an `Iso3` into `[rx, ry, rz, tx, ty, tz]`.
pub fn iso3_to_rtvec(pose: &Iso3) -> DVector<Real> {
    let r = pose.rotation.scaled_axis();
    let t = pose.translation.vector;
    nalgebra::dvector![r.x, r.y, r.z, t.x, t.y, t.z]
}

/// Convert `[rx, ry, rz, tx, ty, tz]` into an `Iso3`.
pub fn rtvec_to_iso3(v: &[Real]) -> Result<Iso3> {
    let [rx, ry, rz, tx, ty, tz] = *v else {
        return Err(Error::ParameterLengthMismatch {
            expected: POSE_DIM,
            got: v.len(),
        });
    };
    Ok(iso3_from_rtvec(&Vec3::new(rx, ry, rz), &Vec3::new(tx, ty, tz)))
}

/// Concatenated pose vectors.
pub(crate) fn poses_to_params<'a>(poses: impl IntoIterator<Item = &'a Iso3>) -> DVector<Real> {
    let flat: Vec<Real> = poses
        .into_iter()
        .flat_map(|p| iso3_to_rtvec(p).data.as_vec().clone())
        .collect();
    DVector::from_vec(flat)
}

/// Poses of a flat vector; a trailing partial pose is an error.
pub(crate) fn params_to_poses(params: &DVector<Real>) -> Result<Vec<Iso3>> {
    params.as_slice().chunks(POSE_DIM).map(rtvec_to_iso3).collect()
}

/// Serialized form of a pose block, checked before it becomes a model.
#[derive(Deserialize)]
pub(crate) struct RawPoses {
    pub params: DVector<Real>,
    pub valid: Vec<bool>,
}

impl RawPoses {
    /// Split into parts once `params` holds exactly one pose per flag.
    pub fn checked(self) -> Result<(DVector<Real>, Vec<bool>)> {
        super::check_length(POSE_DIM * self.valid.len(), &self.params)?;
        Ok((self.params, self.valid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rigcal_core::pose_distance;

    #[test]
    fn rtvec_roundtrip() {
        let pose = iso3_from_rtvec(&Vec3::new(0.1, -0.2, 0.3), &Vec3::new(1.0, 2.0, -0.5));
        let v = iso3_to_rtvec(&pose);
        assert_eq!(v.len(), POSE_DIM);
        let restored = rtvec_to_iso3(v.as_slice()).unwrap();
        assert!(pose_distance(&pose, &restored) < 1e-12);
        assert!((v[0] - 0.1).abs() < 1e-12 && (v[5] + 0.5).abs() < 1e-12);
    }

    #[test]
    fn rejects_wrong_length() {
        assert_eq!(
            rtvec_to_iso3(&[0.0; 5]),
            Err(Error::ParameterLengthMismatch { expected: 6, got: 5 })
        );
    }

    #[test]
    fn flat_vectors_split_per_pose() {
        let poses = vec![Iso3::identity(), Iso3::translation(1.0, 0.0, 0.0)];
        let params = poses_to_params(&poses);
        assert_eq!(params.len(), 2 * POSE_DIM);
        let restored = params_to_poses(&params).unwrap();
        assert!(pose_distance(&restored[1], &poses[1]) < 1e-12);

        let ragged = DVector::from_element(2 * POSE_DIM - 1, 0.0);
        assert!(params_to_poses(&ragged).is_err());
    }

    #[test]
    fn raw_block_checks_length() {
        let raw = RawPoses {
            params: DVector::zeros(12),
            valid: vec![true, false],
        };
        assert!(raw.checked().is_ok());

        let raw = RawPoses {
            params: DVector::zeros(10),
            valid: vec![true, false],
        };
        assert_eq!(
            raw.checked(),
            Err(Error::ParameterLengthMismatch { expected: 12, got: 10 })
        );
    }
}

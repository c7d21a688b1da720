use nalgebra::DVector;
use rigcal_core::models::{CameraParams, PinholeCamera};
use rigcal_core::{Real, Result};

use super::{check_length, Parameters};
use crate::sparsity::{IndexTable, SparsityPattern};

/// Values per camera: `[fx, fy, cx, cy, k1, k2, k3, p1, p2]`.
pub const CAMERA_DIM: usize = 9;

/// Intrinsics and distortion of every rig camera.
///
/// Skew and the undistortion iteration count are carried through unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct Cameras {
    cameras: Vec<PinholeCamera>,
}

impl Cameras {
    pub fn new(cameras: Vec<PinholeCamera>) -> Self {
        Self { cameras }
    }

    pub fn from_params(params: &[CameraParams]) -> Self {
        Self::new(params.iter().map(CameraParams::build).collect())
    }

    pub fn models(&self) -> &[PinholeCamera] {
        &self.cameras
    }

    pub fn to_params(&self) -> Vec<CameraParams> {
        self.cameras.iter().map(CameraParams::from_camera).collect()
    }

    pub fn len(&self) -> usize {
        self.cameras.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cameras.is_empty()
    }
}

fn camera_to_slice(camera: &PinholeCamera) -> [Real; CAMERA_DIM] {
    let (k, d) = (&camera.k, &camera.dist);
    [k.fx, k.fy, k.cx, k.cy, d.k1, d.k2, d.k3, d.p1, d.p2]
}

fn camera_from_slice(template: &PinholeCamera, v: &[Real]) -> PinholeCamera {
    let mut camera = template.clone();
    camera.k.fx = v[0];
    camera.k.fy = v[1];
    camera.k.cx = v[2];
    camera.k.cy = v[3];
    camera.dist.k1 = v[4];
    camera.dist.k2 = v[5];
    camera.dist.k3 = v[6];
    camera.dist.p1 = v[7];
    camera.dist.p2 = v[8];
    camera
}

impl Parameters for Cameras {
    fn num_params(&self) -> usize {
        CAMERA_DIM * self.cameras.len()
    }

    fn params(&self) -> DVector<Real> {
        let flat: Vec<Real> = self.cameras.iter().flat_map(camera_to_slice).collect();
        DVector::from_vec(flat)
    }

    fn with_params(&self, params: &DVector<Real>) -> Result<Self> {
        check_length(self.num_params(), params)?;
        let cameras = self
            .cameras
            .iter()
            .zip(params.as_slice().chunks_exact(CAMERA_DIM))
            .map(|(camera, v)| camera_from_slice(camera, v))
            .collect();
        Ok(Self { cameras })
    }

    fn sparsity(&self, index: &IndexTable) -> SparsityPattern {
        SparsityPattern::blocks(index, self.cameras.len(), CAMERA_DIM, |e| e[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rigcal_core::models::{BrownConrady5, DistortionParams, FxFyCxCySkew};

    fn camera_params() -> CameraParams {
        CameraParams {
            intrinsics: FxFyCxCySkew {
                fx: 800.0,
                fy: 780.0,
                cx: 640.0,
                cy: 360.0,
                skew: 0.5,
            },
            distortion: DistortionParams::BrownConrady5 {
                params: BrownConrady5 {
                    k1: -0.2,
                    k2: 0.05,
                    k3: 0.0,
                    p1: 0.001,
                    p2: -0.001,
                    iters: 5,
                },
            },
        }
    }

    #[test]
    fn params_are_ordered_per_camera() {
        let cameras = Cameras::from_params(&[camera_params(), camera_params()]);
        let x = cameras.params();
        assert_eq!(x.len(), 18);
        assert_eq!(x[0], 800.0);
        assert_eq!(x[4], -0.2);
        assert_eq!(x[9 + 1], 780.0);
        assert_eq!(x[9 + 8], -0.001);
    }

    #[test]
    fn roundtrip_keeps_skew_and_iterations() {
        let cameras = Cameras::from_params(&[camera_params()]);
        let x = DVector::from_fn(9, |i, _| 1.0 + i as f64);
        let updated = cameras.with_params(&x).unwrap();
        assert_eq!(updated.params(), x);

        let model = &updated.models()[0];
        assert_eq!(model.k.skew, 0.5);
        assert_eq!(model.dist.iters, 5);
        assert_eq!(model.k.cy, 4.0);
    }

    #[test]
    fn rejects_wrong_length() {
        let cameras = Cameras::from_params(&[camera_params()]);
        assert!(cameras.with_params(&DVector::zeros(10)).is_err());
    }
}

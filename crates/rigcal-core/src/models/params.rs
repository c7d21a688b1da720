use nalgebra::{RealField, Vector2, Vector3};
use serde::{Deserialize, Serialize};

use super::{BrownConrady5, Camera, IntrinsicsModel, ProjectionModel};
use crate::Real;

/// Perspective division by depth.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pinhole;

impl<S: RealField + Copy> ProjectionModel<S> for Pinhole {
    fn project_dir(&self, dir_c: &Vector3<S>) -> Option<Vector2<S>> {
        (dir_c.z > S::zero()).then(|| dir_c.xy() / dir_c.z)
    }

    fn unproject_dir(&self, n: &Vector2<S>) -> Vector3<S> {
        Vector3::new(n.x, n.y, S::one())
    }
}

/// Focal lengths and principal point in pixels, plus a skew term.
///
/// Skew is carried through serialization but is not an optimized unknown.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FxFyCxCySkew<S: RealField + Copy> {
    pub fx: S,
    pub fy: S,
    pub cx: S,
    pub cy: S,
    pub skew: S,
}

impl<S: RealField + Copy> IntrinsicsModel<S> for FxFyCxCySkew<S> {
    fn to_pixel(&self, n: &Vector2<S>) -> Vector2<S> {
        Vector2::new(
            self.fx * n.x + self.skew * n.y + self.cx,
            self.fy * n.y + self.cy,
        )
    }

    fn from_pixel(&self, pixel: &Vector2<S>) -> Vector2<S> {
        let y = (pixel.y - self.cy) / self.fy;
        Vector2::new((pixel.x - self.cx - self.skew * y) / self.fx, y)
    }
}

/// Pinhole camera with Brown-Conrady distortion, the model optimized per rig camera.
pub type PinholeCamera = Camera<Real, Pinhole, BrownConrady5<Real>, FxFyCxCySkew<Real>>;

/// Serializable distortion model parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DistortionParams {
    /// No distortion.
    None,
    /// Brown-Conrady 5-parameter radial-tangential model.
    BrownConrady5 {
        #[serde(flatten)]
        params: BrownConrady5<Real>,
    },
}

/// Serializable camera parameters for building a runtime [`PinholeCamera`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CameraParams {
    pub intrinsics: FxFyCxCySkew<Real>,
    pub distortion: DistortionParams,
}

impl CameraParams {
    /// Build the runtime camera model.
    ///
    /// `DistortionParams::None` maps to an all-zero Brown-Conrady model so every
    /// rig camera shares one parameter layout.
    pub fn build(&self) -> PinholeCamera {
        let dist = match &self.distortion {
            DistortionParams::None => BrownConrady5::zeros(),
            DistortionParams::BrownConrady5 { params } => *params,
        };
        Camera::new(Pinhole, dist, self.intrinsics)
    }

    /// Recover serializable parameters from a runtime camera.
    pub fn from_camera(camera: &PinholeCamera) -> Self {
        Self {
            intrinsics: camera.k,
            distortion: DistortionParams::BrownConrady5 {
                params: camera.dist,
            },
        }
    }
}

use nalgebra::{Point3, RealField, Vector2, Vector3};

/// Maps a ray direction in camera coordinates onto the normalized image plane.
pub trait ProjectionModel<S: RealField + Copy> {
    /// `None` when the direction has no image (at or behind the optical centre).
    fn project_dir(&self, dir_c: &Vector3<S>) -> Option<Vector2<S>>;
    fn unproject_dir(&self, n: &Vector2<S>) -> Vector3<S>;
}

/// Lens distortion in normalized image coordinates.
pub trait DistortionModel<S: RealField + Copy> {
    fn distort(&self, n_undist: &Vector2<S>) -> Vector2<S>;
    fn undistort(&self, n_dist: &Vector2<S>) -> Vector2<S>;
}

/// Maps distorted normalized coordinates to pixels and back.
pub trait IntrinsicsModel<S: RealField + Copy> {
    fn to_pixel(&self, n: &Vector2<S>) -> Vector2<S>;
    fn from_pixel(&self, pixel: &Vector2<S>) -> Vector2<S>;
}

/// Unit-norm viewing ray in camera coordinates.
#[derive(Clone, Copy, Debug)]
pub struct Ray<S: RealField + Copy> {
    pub dir: Vector3<S>,
}

/// Camera composed of projection, distortion and intrinsics stages.
#[derive(Clone, Debug, PartialEq)]
pub struct Camera<S, P, D, K>
where
    S: RealField + Copy,
    P: ProjectionModel<S>,
    D: DistortionModel<S>,
    K: IntrinsicsModel<S>,
{
    pub proj: P,
    pub dist: D,
    pub k: K,
    _phantom: core::marker::PhantomData<S>,
}

impl<S, P, D, K> Camera<S, P, D, K>
where
    S: RealField + Copy,
    P: ProjectionModel<S>,
    D: DistortionModel<S>,
    K: IntrinsicsModel<S>,
{
    pub fn new(proj: P, dist: D, k: K) -> Self {
        Self {
            proj,
            dist,
            k,
            _phantom: core::marker::PhantomData,
        }
    }

    /// Pixel of a camera-frame point, `None` if it is not in front of the camera.
    pub fn project_point_c(&self, p_c: &Vector3<S>) -> Option<Vector2<S>> {
        let undistorted = self.proj.project_dir(p_c)?;
        Some(self.k.to_pixel(&self.dist.distort(&undistorted)))
    }

    pub fn project_point(&self, p_c: &Point3<S>) -> Option<Vector2<S>> {
        self.project_point_c(&p_c.coords)
    }

    pub fn backproject_pixel(&self, px: &Vector2<S>) -> Ray<S> {
        let undistorted = self.dist.undistort(&self.k.from_pixel(px));
        let dir = self.proj.unproject_dir(&undistorted);
        Ray {
            dir: dir.normalize(),
        }
    }
}

//! Linear algebra type aliases and small geometric helpers.

use nalgebra::{Isometry3, Point3, UnitQuaternion, Vector2, Vector3};

/// Scalar type used throughout the workspace (currently `f64`).
pub type Real = f64;

/// 2D vector with [`Real`] components (image coordinates).
pub type Vec2 = Vector2<Real>;
/// 3D vector with [`Real`] components.
pub type Vec3 = Vector3<Real>;
/// 3D point with [`Real`] coordinates.
pub type Pt3 = Point3<Real>;
/// 3D rigid transform (SE(3)) using [`Real`].
pub type Iso3 = Isometry3<Real>;

/// Build a rigid transform from an axis-angle rotation vector and a translation.
pub fn iso3_from_rtvec(rvec: &Vec3, tvec: &Vec3) -> Iso3 {
    Iso3::from_parts(
        (*tvec).into(),
        UnitQuaternion::from_scaled_axis(*rvec),
    )
}

/// Largest component-wise difference between two poses.
///
/// Rotations are compared through their matrices, translations directly.
pub fn pose_distance(a: &Iso3, b: &Iso3) -> Real {
    let dr = (a.rotation.to_rotation_matrix().matrix() - b.rotation.to_rotation_matrix().matrix())
        .amax();
    let dt = (a.translation.vector - b.translation.vector).amax();
    dr.max(dt)
}

use nalgebra::{RealField, Vector2};
use serde::{Deserialize, Serialize};

use super::DistortionModel;

/// Brown-Conrady radial (k1, k2, k3) and tangential (p1, p2) distortion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BrownConrady5<S: RealField> {
    pub k1: S,
    pub k2: S,
    pub k3: S,
    pub p1: S,
    pub p2: S,
    /// Fixed-point iterations used by [`DistortionModel::undistort`] (0 means 8).
    #[serde(default)]
    pub iters: u32,
}

impl<S: RealField + Copy> BrownConrady5<S> {
    /// Distortion with every coefficient set to zero.
    pub fn zeros() -> Self {
        Self {
            k1: S::zero(),
            k2: S::zero(),
            k3: S::zero(),
            p1: S::zero(),
            p2: S::zero(),
            iters: 8,
        }
    }

    fn distort_impl(&self, x: S, y: S) -> (S, S) {
        let r2 = x * x + y * y;
        let r4 = r2 * r2;
        let r6 = r4 * r2;

        let radial = S::one() + self.k1 * r2 + self.k2 * r4 + self.k3 * r6;

        let two = S::one() + S::one();
        let xy = x * y;
        let x_tan = two * self.p1 * xy + self.p2 * (r2 + two * x * x);
        let y_tan = self.p1 * (r2 + two * y * y) + two * self.p2 * xy;

        (x * radial + x_tan, y * radial + y_tan)
    }
}

impl<S: RealField + Copy> DistortionModel<S> for BrownConrady5<S> {
    fn distort(&self, n_undist: &Vector2<S>) -> Vector2<S> {
        let (xd, yd) = self.distort_impl(n_undist.x, n_undist.y);
        Vector2::new(xd, yd)
    }

    fn undistort(&self, n_dist: &Vector2<S>) -> Vector2<S> {
        let mut x = n_dist.x;
        let mut y = n_dist.y;

        let iters = if self.iters == 0 { 8 } else { self.iters };
        for _ in 0..iters {
            let (xd, yd) = self.distort_impl(x, y);
            x -= xd - n_dist.x;
            y -= yd - n_dist.y;
        }
        Vector2::new(x, y)
    }
}

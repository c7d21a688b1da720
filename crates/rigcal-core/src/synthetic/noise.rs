//! Deterministic pixel noise for synthetic detections.
//!
//! Samples come from a splitmix64 stream keyed by observation index, so a
//! dataset is identical across platforms and `rand` versions.

use ndarray::ArrayD;

use crate::table::{PointTable, Table};
use crate::{Real, Result, Vec2};

/// Uniform pixel noise in `[-max_abs_px, +max_abs_px]` per axis.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UniformPixelNoise {
    pub seed: u64,
    pub max_abs_px: Real,
}

impl UniformPixelNoise {
    pub fn new(seed: u64, max_abs_px: Real) -> Self {
        Self { seed, max_abs_px }
    }

    /// Noise vector for the observation keyed by `(view_idx, point_idx)`.
    #[inline]
    pub fn sample(&self, view_idx: usize, point_idx: usize) -> Vec2 {
        let max_abs = self.max_abs_px.abs();
        if max_abs == 0.0 {
            return Vec2::zeros();
        }

        let key = mix_key(self.seed, view_idx, point_idx);
        let u = unit_interval(splitmix64(key));
        let v = unit_interval(splitmix64(key ^ 0x94D0_49BB_1331_11EB));
        Vec2::new((u - 0.5) * 2.0 * max_abs, (v - 0.5) * 2.0 * max_abs)
    }

    /// Perturb every valid point of a table.
    ///
    /// The key is the row-major index over all axes but the last, paired with
    /// the index along the last axis. Invalid entries are left untouched.
    pub fn apply(&self, table: &PointTable) -> Result<PointTable> {
        let shape = table.shape();
        let n_last = shape.last().copied().unwrap_or(1).max(1);
        let points = table.points();
        let valid = table.valid_points();

        let mut noisy: ArrayD<Vec2> = points.clone();
        for (flat, ((p, out), &v)) in points.iter().zip(noisy.iter_mut()).zip(valid.iter()).enumerate() {
            if v {
                *out = p + self.sample(flat / n_last, flat % n_last);
            }
        }
        PointTable::create(noisy, valid.clone())
    }
}

#[inline]
fn mix_key(seed: u64, view_idx: usize, point_idx: usize) -> u64 {
    seed ^ (view_idx as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (point_idx as u64).wrapping_mul(0xBF58_476D_1CE4_E5B9)
}

#[inline]
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Top 53 bits as a double in `[0, 1)`.
#[inline]
fn unit_interval(x: u64) -> Real {
    (x >> 11) as Real * (1.0 / (1u64 << 53) as Real)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::IxDyn;

    #[test]
    fn samples_are_deterministic_and_bounded() {
        let noise = UniformPixelNoise::new(123, 0.5);
        let a = noise.sample(0, 0);
        assert_eq!(a, noise.sample(0, 0));
        assert_ne!(a, noise.sample(0, 1));
        assert_ne!(a, noise.sample(1, 0));
        for i in 0..100 {
            let s = noise.sample(i / 10, i % 10);
            assert!(s.x.abs() <= 0.5 && s.y.abs() <= 0.5);
        }
    }

    #[test]
    fn apply_skips_invalid_points() {
        let points = ArrayD::from_elem(IxDyn(&[2, 3]), Vec2::new(10.0, 20.0));
        let valid = ArrayD::from_shape_fn(IxDyn(&[2, 3]), |idx| idx[1] != 2);
        let table = PointTable::create(points, valid).unwrap();

        let noisy = UniformPixelNoise::new(7, 1.0).apply(&table).unwrap();
        assert_eq!(noisy.valid_points(), table.valid_points());
        assert_eq!(noisy.get(&[0, 2]).unwrap(), None);
        assert_eq!(noisy.points()[[1, 2].as_slice()], Vec2::new(10.0, 20.0));
        assert_ne!(noisy.points()[[1, 1].as_slice()], Vec2::new(10.0, 20.0));
    }

    #[test]
    fn zero_amplitude_is_identity() {
        let table = PointTable::all_valid(ArrayD::from_elem(IxDyn(&[4]), Vec2::new(1.0, 2.0)));
        assert_eq!(UniformPixelNoise::default().apply(&table).unwrap(), table);
    }
}

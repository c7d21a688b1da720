//! Reprojection error and its masked statistics.
//!
//! Every aggregate honours the validity mask: invalid points are excluded,
//! never counted as zero error. Slices without valid points report
//! `detected == 0` and [`NO_DATA`] in every float field.

mod table;

pub use table::{ErrorTable, LabelledErrors, StatsTable, ViewStats, NO_DATA};

use log::debug;
use ndarray::{ArrayD, Zip};
use serde::{Deserialize, Serialize};

use crate::table::{check_shape, reduce_axes, Granularity, PointTable, Table, REDUCTION_AXES};
use crate::{Error, Real, Result};

/// Quantiles reported by [`reprojection_statistics`].
pub const FIVE_POINT: [Real; 5] = [0.0, 0.25, 0.5, 0.75, 1.0];

/// Euclidean distance between projected and detected points.
///
/// The validity of the result is the AND of both inputs; entries invalid in
/// either table hold [`NO_DATA`].
pub fn reprojection_error(projected: &PointTable, detected: &PointTable) -> Result<ErrorTable> {
    check_shape("detected", projected.shape(), detected.shape())?;
    let valid = Zip::from(projected.valid_points())
        .and(detected.valid_points())
        .map_collect(|&a, &b| a && b);
    let error = Zip::from(projected.points())
        .and(detected.points())
        .and(&valid)
        .map_collect(|p, d, &v| if v { (p - d).norm() } else { NO_DATA });
    ErrorTable::create(error, valid)
}

/// Linear-interpolated quantile of an ascending sample, `NO_DATA` when empty.
pub fn quantile_sorted(sorted: &[Real], q: Real) -> Real {
    if sorted.is_empty() {
        return NO_DATA;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as Real;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as Real)
}

fn sorted_valid(samples: impl Iterator<Item = (Real, bool)>) -> Vec<Real> {
    let mut values: Vec<Real> = samples.filter_map(|(e, v)| v.then_some(e)).collect();
    values.sort_by(|a, b| a.total_cmp(b));
    values
}

/// Quantiles of `values` over `axes`, ignoring entries where `mask` is false.
///
/// Returns one array per requested quantile, shaped like the kept axes.
/// A slice with no unmasked entry yields [`NO_DATA`].
pub fn masked_quantile(
    values: &ArrayD<Real>,
    mask: &ArrayD<bool>,
    quantiles: &[Real],
    axes: &[usize],
) -> Result<Vec<ArrayD<Real>>> {
    check_shape("mask", values.shape(), mask.shape())?;
    let samples = Zip::from(values).and(mask).map_collect(|&e, &v| (e, v));
    let per_slice = reduce_axes(&samples, axes, |slice| {
        let sorted = sorted_valid(slice.iter().copied());
        quantiles
            .iter()
            .map(|&q| quantile_sorted(&sorted, q))
            .collect::<Vec<_>>()
    })?;
    Ok((0..quantiles.len())
        .map(|i| per_slice.map(|qs| qs[i]))
        .collect())
}

#[derive(Clone, Copy)]
struct Sample {
    error: Real,
    valid: bool,
    inlier: bool,
}

fn slice_stats(slice: &[Sample]) -> ViewStats {
    let sorted = sorted_valid(slice.iter().map(|s| (s.error, s.valid)));
    let detected = sorted.len();
    let outliers = slice.iter().filter(|s| s.valid && !s.inlier).count();

    let mse = if detected == 0 {
        NO_DATA
    } else {
        sorted.iter().map(|e| e * e).sum::<Real>() / detected as Real
    };
    let [min, lower_q, median, upper_q, max] = FIVE_POINT.map(|q| quantile_sorted(&sorted, q));

    ViewStats {
        detected,
        outliers,
        mse,
        rms: mse.sqrt(),
        min,
        lower_q,
        median,
        upper_q,
        max,
    }
}

/// Detection count, outlier count, MSE/RMS and five-point summary over `axes`.
///
/// `outliers` counts points that are valid but not inliers.
pub fn reprojection_statistics(
    error: &ArrayD<Real>,
    valid: &ArrayD<bool>,
    inlier: &ArrayD<bool>,
    axes: &[usize],
) -> Result<StatsTable> {
    check_shape("valid", error.shape(), valid.shape())?;
    check_shape("inlier", error.shape(), inlier.shape())?;
    let samples = Zip::from(error)
        .and(valid)
        .and(inlier)
        .map_collect(|&error, &valid, &inlier| Sample {
            error,
            valid,
            inlier,
        });
    let entries = reduce_axes(&samples, axes, slice_stats)?;
    Ok(StatsTable::from_entries(&entries))
}

/// Statistics at every granularity of a `(camera, frame, board, point)` table.
///
/// With `inlier_only`, validity is first restricted to inliers.
pub fn reprojection_tables(errors: &LabelledErrors, inlier_only: bool) -> Result<Granularity<StatsTable>> {
    check_rank(errors.shape(), 4)?;
    let inliers = errors.extra();
    let base = errors.base();
    let valid = if inlier_only {
        Zip::from(base.valid()).and(inliers).map_collect(|&v, &i| v && i)
    } else {
        base.valid().clone()
    };
    REDUCTION_AXES.try_map(|axes| reprojection_statistics(base.error(), &valid, inliers, axes))
}

/// Number of valid detections at every granularity.
pub fn detection_tables(points: &PointTable) -> Result<Granularity<ArrayD<usize>>> {
    check_rank(points.shape(), 4)?;
    REDUCTION_AXES.try_map(|axes| {
        reduce_axes(points.valid_points(), axes, |slice| {
            slice.iter().filter(|&&v| v).count()
        })
    })
}

fn check_rank(shape: &[usize], rank: usize) -> Result<()> {
    if shape.len() != rank {
        return Err(Error::shape_mismatch("rank", &[rank], &[shape.len()]));
    }
    Ok(())
}

/// Policy deriving the inlier threshold from the error distribution.
///
/// The threshold is `factor` times the `quantile` of all valid errors,
/// floored at `min_threshold` pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlierPolicy {
    pub quantile: Real,
    pub factor: Real,
    pub min_threshold: Real,
}

impl Default for OutlierPolicy {
    fn default() -> Self {
        Self {
            quantile: 0.75,
            factor: 2.0,
            min_threshold: 0.5,
        }
    }
}

/// Fit the inlier threshold; `Err(NoValidData)` when nothing is valid.
pub fn inlier_threshold(errors: &ErrorTable, policy: &OutlierPolicy) -> Result<Real> {
    let mut values = errors.valid_errors();
    if values.is_empty() {
        return Err(Error::NoValidData);
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let threshold = (quantile_sorted(&values, policy.quantile) * policy.factor).max(policy.min_threshold);
    debug!(
        "inlier threshold {:.4} from {} valid points (q={}, factor={})",
        threshold,
        values.len(),
        policy.quantile,
        policy.factor
    );
    Ok(threshold)
}

/// Points that are valid and within `threshold`.
pub fn inlier_mask(errors: &ErrorTable, threshold: Real) -> ArrayD<bool> {
    Zip::from(errors.error())
        .and(errors.valid())
        .map_collect(|&e, &v| v && e <= threshold)
}

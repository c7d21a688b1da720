use ndarray::ArrayD;
use serde::{Deserialize, Serialize};

use crate::table::{check_shape, concat_field, insert_field, take_field, Extended, Table};
use crate::{Error, Real, Result};

/// Value stored for statistics of a slice without valid data.
pub const NO_DATA: Real = Real::NAN;

/// Per-point reprojection error with its validity mask.
///
/// Invalid entries hold [`NO_DATA`] and never enter an aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorTable {
    error: ArrayD<Real>,
    valid: ArrayD<bool>,
}

/// Reprojection errors labelled with the current inlier classification.
pub type LabelledErrors = Extended<ErrorTable, bool>;

impl ErrorTable {
    pub fn create(error: ArrayD<Real>, valid: ArrayD<bool>) -> Result<Self> {
        check_shape("valid", error.shape(), valid.shape())?;
        Ok(Self { error, valid })
    }

    pub fn error(&self) -> &ArrayD<Real> {
        &self.error
    }

    pub fn valid(&self) -> &ArrayD<bool> {
        &self.valid
    }

    /// Errors of valid entries, in row-major order.
    pub fn valid_errors(&self) -> Vec<Real> {
        self.error
            .iter()
            .zip(self.valid.iter())
            .filter_map(|(&e, &v)| v.then_some(e))
            .collect()
    }
}

impl Table for ErrorTable {
    fn shape(&self) -> &[usize] {
        self.error.shape()
    }

    fn take(&self, axis: usize, index: usize) -> Self {
        Self {
            error: take_field(&self.error, axis, index),
            valid: take_field(&self.valid, axis, index),
        }
    }

    fn insert_axis(&self, axis: usize) -> Self {
        Self {
            error: insert_field(&self.error, axis),
            valid: insert_field(&self.valid, axis),
        }
    }

    fn concat_fields(axis: usize, parts: &[Self]) -> Result<Self> {
        Ok(Self {
            error: concat_field("error", axis, parts.iter().map(|p| p.error.view()))?,
            valid: concat_field("valid", axis, parts.iter().map(|p| p.valid.view()))?,
        })
    }
}

/// Statistics of one reduced slice.
///
/// Float fields hold [`NO_DATA`] when `detected == 0`; use
/// [`ViewStats::require_data`] before comparing them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewStats {
    pub detected: usize,
    pub outliers: usize,
    pub mse: Real,
    pub rms: Real,
    pub min: Real,
    pub lower_q: Real,
    pub median: Real,
    pub upper_q: Real,
    pub max: Real,
}

impl ViewStats {
    pub fn has_data(&self) -> bool {
        self.detected > 0
    }

    /// `Err(NoValidData)` for an empty slice, so the sentinel cannot leak into
    /// comparisons unnoticed.
    pub fn require_data(&self) -> Result<&Self> {
        if self.has_data() {
            Ok(self)
        } else {
            Err(Error::NoValidData)
        }
    }
}

/// Struct-of-arrays table of [`ViewStats`] over the non-reduced axes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsTable {
    pub(crate) detected: ArrayD<usize>,
    pub(crate) outliers: ArrayD<usize>,
    pub(crate) mse: ArrayD<Real>,
    pub(crate) rms: ArrayD<Real>,
    pub(crate) min: ArrayD<Real>,
    pub(crate) lower_q: ArrayD<Real>,
    pub(crate) median: ArrayD<Real>,
    pub(crate) upper_q: ArrayD<Real>,
    pub(crate) max: ArrayD<Real>,
}

impl StatsTable {
    pub(crate) fn from_entries(entries: &ArrayD<ViewStats>) -> Self {
        Self {
            detected: entries.map(|s| s.detected),
            outliers: entries.map(|s| s.outliers),
            mse: entries.map(|s| s.mse),
            rms: entries.map(|s| s.rms),
            min: entries.map(|s| s.min),
            lower_q: entries.map(|s| s.lower_q),
            median: entries.map(|s| s.median),
            upper_q: entries.map(|s| s.upper_q),
            max: entries.map(|s| s.max),
        }
    }

    /// Statistics at full-rank `coords` (empty for the overall table).
    pub fn get(&self, coords: &[usize]) -> Result<ViewStats> {
        let in_range = coords.len() == self.detected.ndim()
            && coords.iter().zip(self.detected.shape()).all(|(&c, &n)| c < n);
        if !in_range {
            return Err(Error::IndexOutOfRange {
                index: coords.to_vec(),
                shape: self.detected.shape().to_vec(),
            });
        }
        Ok(ViewStats {
            detected: self.detected[coords],
            outliers: self.outliers[coords],
            mse: self.mse[coords],
            rms: self.rms[coords],
            min: self.min[coords],
            lower_q: self.lower_q[coords],
            median: self.median[coords],
            upper_q: self.upper_q[coords],
            max: self.max[coords],
        })
    }

    pub fn detected(&self) -> &ArrayD<usize> {
        &self.detected
    }

    pub fn outliers(&self) -> &ArrayD<usize> {
        &self.outliers
    }

    pub fn mse(&self) -> &ArrayD<Real> {
        &self.mse
    }

    pub fn rms(&self) -> &ArrayD<Real> {
        &self.rms
    }

    pub fn min(&self) -> &ArrayD<Real> {
        &self.min
    }

    pub fn lower_q(&self) -> &ArrayD<Real> {
        &self.lower_q
    }

    pub fn median(&self) -> &ArrayD<Real> {
        &self.median
    }

    pub fn upper_q(&self) -> &ArrayD<Real> {
        &self.upper_q
    }

    pub fn max(&self) -> &ArrayD<Real> {
        &self.max
    }
}

impl Table for StatsTable {
    fn shape(&self) -> &[usize] {
        self.detected.shape()
    }

    fn take(&self, axis: usize, index: usize) -> Self {
        Self {
            detected: take_field(&self.detected, axis, index),
            outliers: take_field(&self.outliers, axis, index),
            mse: take_field(&self.mse, axis, index),
            rms: take_field(&self.rms, axis, index),
            min: take_field(&self.min, axis, index),
            lower_q: take_field(&self.lower_q, axis, index),
            median: take_field(&self.median, axis, index),
            upper_q: take_field(&self.upper_q, axis, index),
            max: take_field(&self.max, axis, index),
        }
    }

    fn insert_axis(&self, axis: usize) -> Self {
        Self {
            detected: insert_field(&self.detected, axis),
            outliers: insert_field(&self.outliers, axis),
            mse: insert_field(&self.mse, axis),
            rms: insert_field(&self.rms, axis),
            min: insert_field(&self.min, axis),
            lower_q: insert_field(&self.lower_q, axis),
            median: insert_field(&self.median, axis),
            upper_q: insert_field(&self.upper_q, axis),
            max: insert_field(&self.max, axis),
        }
    }

    fn concat_fields(axis: usize, parts: &[Self]) -> Result<Self> {
        macro_rules! join {
            ($field:ident) => {
                concat_field(stringify!($field), axis, parts.iter().map(|p| p.$field.view()))?
            };
        }
        Ok(Self {
            detected: join!(detected),
            outliers: join!(outliers),
            mse: join!(mse),
            rms: join!(rms),
            min: join!(min),
            lower_q: join!(lower_q),
            median: join!(median),
            upper_q: join!(upper_q),
            max: join!(max),
        })
    }
}

//! Axis-labelled struct-of-arrays tables.
//!
//! Every table kind holds a fixed set of named fields, each an `ndarray`
//! array, and all fields share one leading shape. Detections and projections
//! use the axis order `(camera, frame, board, point)`; pose tables use
//! `(camera,)`, `(frame,)` or `(camera, frame)`.
//!
//! Tables are immutable values: every operation returns a fresh table.

mod extended;
mod granularity;
mod points;
mod poses;
mod reduce;

pub use extended::Extended;
pub use granularity::{Granularity, REDUCTION_AXES};
pub use points::PointTable;
pub use poses::{PoseEstimates, PoseTable};
pub use reduce::reduce_axes;

use ndarray::{ArrayD, ArrayViewD, Axis};

use crate::{Error, Result};

/// Common behaviour of every table kind.
///
/// Implementors provide the four field-level primitives; indexing,
/// sequencing, concatenation and extension are derived from them.
pub trait Table: Sized + Clone {
    /// Leading shape shared by every field.
    fn shape(&self) -> &[usize];

    /// Sub-table at `index` along `axis`.
    ///
    /// Panics if `axis` or `index` is out of bounds; use [`Table::select`]
    /// for a checked version.
    fn take(&self, axis: usize, index: usize) -> Self;

    /// Same table with a new unit axis inserted at `axis`.
    fn insert_axis(&self, axis: usize) -> Self;

    /// Concatenate same-kind tables along an existing axis.
    ///
    /// Callers have already checked that ranks agree and that every
    /// non-concatenated axis has the same length.
    fn concat_fields(axis: usize, parts: &[Self]) -> Result<Self>;

    fn rank(&self) -> usize {
        self.shape().len()
    }

    /// Number of rows along the leading axis (0 for a rank-0 table).
    fn len(&self) -> usize {
        self.shape().first().copied().unwrap_or(0)
    }

    fn is_empty(&self) -> bool {
        self.shape().iter().product::<usize>() == 0
    }

    /// Checked sub-table along one axis.
    fn select(&self, axis: usize, index: usize) -> Result<Self> {
        check_axis(axis, self.rank())?;
        if index >= self.shape()[axis] {
            let mut coords = vec![0; self.rank()];
            coords[axis] = index;
            return Err(Error::IndexOutOfRange {
                index: coords,
                shape: self.shape().to_vec(),
            });
        }
        Ok(self.take(axis, index))
    }

    /// Index the leading axes with `coords`, returning a lower-rank table.
    fn index(&self, coords: &[usize]) -> Result<Self> {
        if coords.len() > self.rank()
            || coords.iter().zip(self.shape()).any(|(&c, &n)| c >= n)
        {
            return Err(Error::IndexOutOfRange {
                index: coords.to_vec(),
                shape: self.shape().to_vec(),
            });
        }
        Ok(coords
            .iter()
            .fold(self.clone(), |table, &c| table.take(0, c)))
    }

    /// Lazy, restartable walk over the sub-tables along `axis`.
    fn sequence(&self, axis: usize) -> Result<Sequence<'_, Self>> {
        check_axis(axis, self.rank())?;
        Ok(Sequence {
            table: self,
            axis,
            range: 0..self.shape()[axis],
        })
    }

    /// Concatenate tables along an existing axis.
    fn concatenate(axis: usize, parts: &[Self]) -> Result<Self> {
        let first = parts
            .first()
            .ok_or_else(|| Error::shape_mismatch("concatenate", &[1], &[0]))?;
        check_axis(axis, first.rank())?;
        for part in &parts[1..] {
            let compatible = part.rank() == first.rank()
                && part
                    .shape()
                    .iter()
                    .zip(first.shape())
                    .enumerate()
                    .all(|(a, (x, y))| a == axis || x == y);
            if !compatible {
                return Err(Error::shape_mismatch(
                    "concatenate",
                    first.shape(),
                    part.shape(),
                ));
            }
        }
        Self::concat_fields(axis, parts)
    }

    /// Stack same-shape tables along a new leading axis.
    fn stack(parts: &[Self]) -> Result<Self> {
        let lifted: Vec<Self> = parts.iter().map(|p| p.insert_axis(0)).collect();
        Self::concatenate(0, &lifted)
    }

    /// Attach one more field sharing this table's shape.
    fn extend<U: Clone>(self, field: &'static str, extra: ArrayD<U>) -> Result<Extended<Self, U>> {
        Extended::new(self, field, extra)
    }
}

/// Iterator over the sub-tables of one axis; see [`Table::sequence`].
///
/// A clone continues independently from the same position; calling
/// `sequence` again restarts from the first sub-table.
#[derive(Debug, Clone)]
pub struct Sequence<'a, T> {
    table: &'a T,
    axis: usize,
    range: std::ops::Range<usize>,
}

impl<T: Table> Iterator for Sequence<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let index = self.range.next()?;
        Some(self.table.take(self.axis, index))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.range.size_hint()
    }
}

impl<T: Table> DoubleEndedIterator for Sequence<'_, T> {
    fn next_back(&mut self) -> Option<T> {
        let index = self.range.next_back()?;
        Some(self.table.take(self.axis, index))
    }
}

impl<T: Table> ExactSizeIterator for Sequence<'_, T> {}

pub(crate) fn check_axis(axis: usize, rank: usize) -> Result<()> {
    if axis >= rank {
        return Err(Error::AxisOutOfRange { axis, rank });
    }
    Ok(())
}

pub(crate) fn check_shape(field: &'static str, expected: &[usize], got: &[usize]) -> Result<()> {
    if expected != got {
        return Err(Error::shape_mismatch(field, expected, got));
    }
    Ok(())
}

/// Concatenate one field of several tables along `axis`.
pub(crate) fn concat_field<'a, T: Clone + 'a>(
    field: &'static str,
    axis: usize,
    parts: impl IntoIterator<Item = ArrayViewD<'a, T>>,
) -> Result<ArrayD<T>> {
    let views: Vec<ArrayViewD<'a, T>> = parts.into_iter().collect();
    let expected = views.first().map(|v| v.shape().to_vec()).unwrap_or_default();
    ndarray::concatenate(Axis(axis), &views).map_err(|_| {
        let got = views
            .iter()
            .find(|v| v.ndim() != expected.len())
            .map(|v| v.shape().to_vec())
            .unwrap_or_default();
        Error::shape_mismatch(field, &expected, &got)
    })
}

pub(crate) fn take_field<T: Clone>(array: &ArrayD<T>, axis: usize, index: usize) -> ArrayD<T> {
    array.index_axis(Axis(axis), index).to_owned()
}

pub(crate) fn insert_field<T: Clone>(array: &ArrayD<T>, axis: usize) -> ArrayD<T> {
    array.clone().insert_axis(Axis(axis))
}

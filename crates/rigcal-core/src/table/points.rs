use ndarray::{ArrayD, IxDyn, Zip};
use serde::{Deserialize, Serialize};

use super::{check_shape, concat_field, insert_field, take_field, Table};
use crate::{Error, Result, Vec2};

/// Points with a per-point validity mask.
///
/// With `P = Vec2` this is the detection / projection table of shape
/// `(camera, frame, board, point)`; with `P = Pt3` it holds board geometry
/// `(board, point)` or camera-frame points `(camera, frame, board, point)`.
///
/// Where `valid` is `false` the stored point carries no meaning and is
/// excluded from every aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointTable<P = Vec2> {
    points: ArrayD<P>,
    valid: ArrayD<bool>,
}

impl<P: Clone> PointTable<P> {
    /// Build a table from points and a validity mask of identical shape.
    pub fn create(points: ArrayD<P>, valid: ArrayD<bool>) -> Result<Self> {
        check_shape("valid_points", points.shape(), valid.shape())?;
        Ok(Self { points, valid })
    }

    /// Build a table where every point is valid.
    pub fn all_valid(points: ArrayD<P>) -> Self {
        let valid = ArrayD::from_elem(IxDyn(points.shape()), true);
        Self { points, valid }
    }

    pub fn points(&self) -> &ArrayD<P> {
        &self.points
    }

    pub fn valid_points(&self) -> &ArrayD<bool> {
        &self.valid
    }

    /// Same points with a replacement validity mask (e.g. restricted to inliers).
    pub fn with_valid(&self, valid: ArrayD<bool>) -> Result<Self> {
        Self::create(self.points.clone(), valid)
    }

    /// Point at full-rank `coords`, `None` when it is not valid.
    pub fn get(&self, coords: &[usize]) -> Result<Option<P>> {
        let in_range = coords.len() == self.points.ndim()
            && coords.iter().zip(self.points.shape()).all(|(&c, &n)| c < n);
        if !in_range {
            return Err(Error::IndexOutOfRange {
                index: coords.to_vec(),
                shape: self.points.shape().to_vec(),
            });
        }
        Ok(self.valid[coords].then(|| self.points[coords].clone()))
    }

    pub fn count_valid(&self) -> usize {
        self.valid.iter().filter(|&&v| v).count()
    }

    /// Map every point, keeping validity; `f` returns `None` to invalidate a point.
    ///
    /// Invalid inputs are passed through `fill` without calling `f`.
    pub fn filter_map<Q: Clone>(&self, fill: Q, mut f: impl FnMut(&P) -> Option<Q>) -> PointTable<Q> {
        let mapped = Zip::from(&self.points)
            .and(&self.valid)
            .map_collect(|p, &valid| match valid.then(|| f(p)).flatten() {
                Some(q) => (q, true),
                None => (fill.clone(), false),
            });
        PointTable {
            points: mapped.map(|(q, _)| q.clone()),
            valid: mapped.map(|(_, v)| *v),
        }
    }
}

impl<P: Clone> Table for PointTable<P> {
    fn shape(&self) -> &[usize] {
        self.points.shape()
    }

    fn take(&self, axis: usize, index: usize) -> Self {
        Self {
            points: take_field(&self.points, axis, index),
            valid: take_field(&self.valid, axis, index),
        }
    }

    fn insert_axis(&self, axis: usize) -> Self {
        Self {
            points: insert_field(&self.points, axis),
            valid: insert_field(&self.valid, axis),
        }
    }

    fn concat_fields(axis: usize, parts: &[Self]) -> Result<Self> {
        Ok(Self {
            points: concat_field("points", axis, parts.iter().map(|p| p.points.view()))?,
            valid: concat_field("valid_points", axis, parts.iter().map(|p| p.valid.view()))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Pt3;
    use ndarray::Array;

    fn grid(shape: &[usize]) -> PointTable {
        let n: usize = shape.iter().product();
        let points = Array::from_shape_vec(
            IxDyn(shape),
            (0..n).map(|i| Vec2::new(i as f64, -(i as f64))).collect(),
        )
        .unwrap();
        PointTable::all_valid(points)
    }

    #[test]
    fn create_rejects_mismatched_mask() {
        let points = ArrayD::from_elem(IxDyn(&[2, 3]), Vec2::zeros());
        let valid = ArrayD::from_elem(IxDyn(&[2, 4]), true);
        let err = PointTable::create(points, valid).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { field: "valid_points", .. }));
    }

    #[test]
    fn index_yields_lower_rank_table() {
        let table = grid(&[2, 3, 1, 4]);
        let view = table.index(&[1, 2]).unwrap();
        assert_eq!(view.shape(), &[1, 4]);
        let first = view.get(&[0, 0]).unwrap().unwrap();
        assert_eq!(first, Vec2::new(20.0, -20.0));
    }

    #[test]
    fn index_out_of_range_fails() {
        let table = grid(&[2, 3, 1, 4]);
        assert!(matches!(
            table.index(&[2]),
            Err(Error::IndexOutOfRange { .. })
        ));
        assert!(matches!(
            table.get(&[0, 0, 0, 4]),
            Err(Error::IndexOutOfRange { .. })
        ));
        assert!(matches!(
            table.select(4, 0),
            Err(Error::AxisOutOfRange { axis: 4, rank: 4 })
        ));
    }

    #[test]
    fn sequence_is_lazy_and_restartable() {
        let table = grid(&[2, 3, 1, 4]);
        let frames = table.sequence(1).unwrap();
        assert_eq!(frames.len(), 3);

        let again = frames.clone();
        let a: Vec<_> = frames.collect();
        let b: Vec<_> = again.collect();
        assert_eq!(a, b);
        assert_eq!(a[0].shape(), &[2, 1, 4]);

        let restarted: Vec<_> = table.sequence(1).unwrap().collect();
        assert_eq!(restarted, a);
    }

    #[test]
    fn concatenate_then_select_recovers_parts() {
        let a = grid(&[2, 3]);
        let b = grid(&[2, 1]);
        let joined = PointTable::concatenate(1, &[a.clone(), b.clone()]).unwrap();
        assert_eq!(joined.shape(), &[2, 4]);
        assert_eq!(joined.select(1, 3).unwrap(), b.select(1, 0).unwrap());
        assert_eq!(joined.select(1, 0).unwrap(), a.select(1, 0).unwrap());

        let bad = grid(&[3, 1]);
        assert!(matches!(
            PointTable::concatenate(1, &[a, bad]),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn stack_adds_leading_axis() {
        let a = grid(&[3, 4]);
        let stacked = PointTable::stack(&[a.clone(), a.clone()]).unwrap();
        assert_eq!(stacked.shape(), &[2, 3, 4]);
        assert_eq!(stacked.take(0, 1), a);
    }

    #[test]
    fn filter_map_invalidates_rejected_points() {
        let points = ArrayD::from_shape_vec(
            IxDyn(&[3]),
            vec![Pt3::new(0.0, 0.0, 1.0), Pt3::new(0.0, 0.0, -1.0), Pt3::new(1.0, 0.0, 2.0)],
        )
        .unwrap();
        let valid = ArrayD::from_shape_vec(IxDyn(&[3]), vec![true, true, false]).unwrap();
        let table = PointTable::create(points, valid).unwrap();

        let projected = table.filter_map(Vec2::zeros(), |p| (p.z > 0.0).then(|| Vec2::new(p.x, p.y)));
        assert_eq!(projected.count_valid(), 1);
        assert_eq!(projected.get(&[1]).unwrap(), None);
        assert_eq!(projected.get(&[2]).unwrap(), None);
    }
}

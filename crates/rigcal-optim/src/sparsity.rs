//! Residual index lists and Jacobian sparsity patterns.
//!
//! Residuals come in pairs: every valid `(camera, frame, board, point)`
//! detection contributes an x and a y row. A [`SparsityPattern`] records,
//! per detection, which parameter columns those two rows may depend on.

use std::ops::Range;

use nalgebra::DMatrix;
use rigcal_core::table::{PointTable, Table};
use rigcal_core::{Error, Result};

/// Residual rows contributed by one detection.
pub const RESIDUAL_DIM: usize = 2;

/// Ordered list of valid detections, one residual pair each.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexTable {
    shape: [usize; 4],
    entries: Vec<[usize; 4]>,
}

impl IndexTable {
    /// Every valid entry of a `(camera, frame, board, point)` table, row-major.
    pub fn from_valid(points: &PointTable) -> Result<Self> {
        let [c, f, b, p] = *points.shape() else {
            return Err(Error::shape_mismatch("index_table", &[0, 0, 0, 0], points.shape()));
        };
        let entries = points
            .valid_points()
            .indexed_iter()
            .filter(|(_, &v)| v)
            .map(|(idx, _)| [idx[0], idx[1], idx[2], idx[3]])
            .collect();
        Ok(Self {
            shape: [c, f, b, p],
            entries,
        })
    }

    pub fn shape(&self) -> [usize; 4] {
        self.shape
    }

    pub fn entries(&self) -> &[[usize; 4]] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn num_residuals(&self) -> usize {
        RESIDUAL_DIM * self.entries.len()
    }
}

/// Column ranges each residual pair may depend on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparsityPattern {
    cols: usize,
    entries: Vec<Vec<Range<usize>>>,
}

impl SparsityPattern {
    /// Pattern for a parameter set of `n_blocks` blocks of `block_dim` columns,
    /// where each detection depends on exactly one block chosen by `block_of`.
    ///
    /// Blocks no detection maps to stay present as columns with no rows.
    pub fn blocks(
        index: &IndexTable,
        n_blocks: usize,
        block_dim: usize,
        block_of: impl Fn(&[usize; 4]) -> usize,
    ) -> Self {
        let entries = index
            .entries()
            .iter()
            .map(|e| {
                let b = block_of(e);
                vec![b * block_dim..(b + 1) * block_dim]
            })
            .collect();
        Self {
            cols: n_blocks * block_dim,
            entries,
        }
    }

    /// Pattern with no columns.
    pub fn empty(index: &IndexTable) -> Self {
        Self {
            cols: 0,
            entries: vec![Vec::new(); index.len()],
        }
    }

    pub fn rows(&self) -> usize {
        RESIDUAL_DIM * self.entries.len()
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn num_entries(&self) -> usize {
        self.entries.len()
    }

    /// Column ranges of detection `entry` (rows `2 * entry` and `2 * entry + 1`).
    pub fn dependencies(&self, entry: usize) -> &[Range<usize>] {
        &self.entries[entry]
    }

    /// Side-by-side patterns over one index table; columns of later parts are offset.
    pub fn hstack(parts: &[SparsityPattern]) -> Result<Self> {
        let n = parts.first().map_or(0, |p| p.entries.len());
        if let Some(part) = parts.iter().find(|p| p.entries.len() != n) {
            return Err(Error::shape_mismatch("sparsity", &[n], &[part.entries.len()]));
        }
        let empty = Self {
            cols: 0,
            entries: vec![Vec::new(); n],
        };
        Ok(parts.iter().fold(empty, Self::join))
    }

    /// Append the columns of `right`; both patterns must come from the same index table.
    pub fn join(mut self, right: &SparsityPattern) -> Self {
        debug_assert_eq!(self.entries.len(), right.entries.len());
        let offset = self.cols;
        for (out, ranges) in self.entries.iter_mut().zip(&right.entries) {
            out.extend(ranges.iter().map(|r| r.start + offset..r.end + offset));
        }
        self.cols += right.cols;
        self
    }

    /// Dense `rows x cols` mask.
    pub fn to_mask(&self) -> DMatrix<bool> {
        let mut mask = DMatrix::from_element(self.rows(), self.cols, false);
        for (row, col) in self.triplets() {
            mask[(row, col)] = true;
        }
        mask
    }

    /// `(row, col)` of every structural non-zero, row-major.
    pub fn triplets(&self) -> Vec<(usize, usize)> {
        self.entries
            .iter()
            .enumerate()
            .flat_map(|(entry, ranges)| {
                (0..RESIDUAL_DIM).flat_map(move |k| {
                    ranges
                        .iter()
                        .flat_map(|r| r.clone())
                        .map(move |col| (RESIDUAL_DIM * entry + k, col))
                })
            })
            .collect()
    }

    pub fn nnz(&self) -> usize {
        let per_entry: usize = self
            .entries
            .iter()
            .map(|ranges| ranges.iter().map(|r| r.len()).sum::<usize>())
            .sum();
        RESIDUAL_DIM * per_entry
    }

    /// Rows touching each column, for column-wise finite differences.
    pub fn rows_per_column(&self) -> Vec<Vec<usize>> {
        let mut rows = vec![Vec::new(); self.cols];
        for (row, col) in self.triplets() {
            rows[col].push(row);
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{ArrayD, Dimension, IxDyn};
    use rigcal_core::Vec2;

    fn index(shape: [usize; 4], valid: impl Fn(&[usize]) -> bool) -> IndexTable {
        let points = PointTable::create(
            ArrayD::from_elem(IxDyn(&shape), Vec2::zeros()),
            ArrayD::from_shape_fn(IxDyn(&shape), |idx| valid(idx.slice())),
        )
        .unwrap();
        IndexTable::from_valid(&points).unwrap()
    }

    #[test]
    fn index_table_lists_valid_entries_in_order() {
        let idx = index([2, 2, 1, 2], |i| i[0] != i[1]);
        assert_eq!(idx.len(), 4);
        assert_eq!(idx.num_residuals(), 8);
        assert_eq!(idx.entries()[0], [0, 1, 0, 0]);
        assert_eq!(idx.entries()[3], [1, 0, 0, 1]);
    }

    #[test]
    fn index_table_requires_rank_four() {
        let points = PointTable::all_valid(ArrayD::from_elem(IxDyn(&[2, 2]), Vec2::zeros()));
        assert!(matches!(
            IndexTable::from_valid(&points),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn block_pattern_and_mask() {
        let idx = index([2, 3, 1, 1], |_| true);
        let frames = SparsityPattern::blocks(&idx, 3, 6, |e| e[1]);
        assert_eq!(frames.rows(), 12);
        assert_eq!(frames.cols(), 18);
        assert_eq!(frames.nnz(), 12 * 6);

        let mask = frames.to_mask();
        assert!(mask[(0, 0)] && mask[(1, 5)]);
        assert!(!mask[(0, 6)]);
        // entry 4 is camera 1, frame 1
        assert!(mask[(8, 6)] && !mask[(8, 0)]);
        assert_eq!(mask.iter().filter(|&&m| m).count(), frames.nnz());
    }

    #[test]
    fn hstack_offsets_columns() {
        let idx = index([2, 1, 1, 1], |_| true);
        let cameras = SparsityPattern::blocks(&idx, 2, 9, |e| e[0]);
        let frames = SparsityPattern::blocks(&idx, 1, 6, |e| e[1]);
        let joint = SparsityPattern::hstack(&[cameras, frames]).unwrap();
        assert_eq!(joint.cols(), 24);
        assert_eq!(joint.dependencies(1), &[9..18, 18..24]);
        assert_eq!(joint.nnz(), 2 * 2 * 15);
    }

    #[test]
    fn hstack_rejects_different_index_tables() {
        let a = SparsityPattern::empty(&index([1, 1, 1, 2], |_| true));
        let b = SparsityPattern::empty(&index([1, 1, 1, 3], |_| true));
        assert!(SparsityPattern::hstack(&[a, b]).is_err());
    }

    #[test]
    fn unused_block_has_no_rows() {
        // camera 1 never detects anything
        let idx = index([2, 2, 1, 3], |i| i[0] == 0);
        let cameras = SparsityPattern::blocks(&idx, 2, 9, |e| e[0]);
        assert_eq!(cameras.cols(), 18);
        let rows = cameras.rows_per_column();
        assert!(rows[..9].iter().all(|r| r.len() == 12));
        assert!(rows[9..].iter().all(|r| r.is_empty()));
    }
}

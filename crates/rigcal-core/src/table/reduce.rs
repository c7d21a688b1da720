use ndarray::{ArrayD, IxDyn};

use super::check_axis;
use crate::{Error, Result};

/// Reduce `array` over `axes`, calling `f` once per slice of the kept axes.
///
/// The result has the shape of the kept axes in their original order
/// (rank 0 when every axis is reduced). Slices are handed to `f` in
/// row-major order of the reduced axes; an empty slice is still visited.
pub fn reduce_axes<T, U, F>(array: &ArrayD<T>, axes: &[usize], mut f: F) -> Result<ArrayD<U>>
where
    T: Clone,
    F: FnMut(&[T]) -> U,
{
    let rank = array.ndim();
    let mut reduced = axes.to_vec();
    reduced.sort_unstable();
    reduced.dedup();
    for &axis in &reduced {
        check_axis(axis, rank)?;
    }

    let kept: Vec<usize> = (0..rank).filter(|a| !reduced.contains(a)).collect();
    let kept_shape: Vec<usize> = kept.iter().map(|&a| array.shape()[a]).collect();
    let slice_len: usize = reduced.iter().map(|&a| array.shape()[a]).product();
    let n_out: usize = kept_shape.iter().product();

    let perm: Vec<usize> = kept.iter().chain(&reduced).copied().collect();
    let data: Vec<T> = array.view().permuted_axes(perm).iter().cloned().collect();

    let out: Vec<U> = if slice_len == 0 {
        (0..n_out).map(|_| f(&[])).collect()
    } else {
        data.chunks(slice_len).map(&mut f).collect()
    };

    let n = out.len();
    ArrayD::from_shape_vec(IxDyn(&kept_shape), out)
        .map_err(|_| Error::shape_mismatch("reduction", &kept_shape, &[n]))
}

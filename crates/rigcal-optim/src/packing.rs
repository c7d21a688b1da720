//! Concatenation of parameter blocks into one solver vector.

use nalgebra::DVector;
use rigcal_core::{Error, Real, Result};

/// Concatenate blocks in order.
pub fn pack(parts: &[DVector<Real>]) -> DVector<Real> {
    let n = parts.iter().map(|p| p.len()).sum();
    DVector::from_iterator(n, parts.iter().flat_map(|p| p.iter().copied()))
}

/// Split `x` into blocks of `lens`; the lengths must add up to `x.len()`.
pub fn unpack(x: &DVector<Real>, lens: &[usize]) -> Result<Vec<DVector<Real>>> {
    let expected: usize = lens.iter().sum();
    if x.len() != expected {
        return Err(Error::ParameterLengthMismatch {
            expected,
            got: x.len(),
        });
    }
    let mut offset = 0;
    Ok(lens
        .iter()
        .map(|&len| {
            let part = x.rows(offset, len).into_owned();
            offset += len;
            part
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_then_unpack() {
        let parts = vec![
            nalgebra::dvector![1.0, 2.0],
            DVector::zeros(0),
            nalgebra::dvector![3.0, 4.0, 5.0],
        ];
        let x = pack(&parts);
        assert_eq!(x.as_slice(), &[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(unpack(&x, &[2, 0, 3]).unwrap(), parts);
    }

    #[test]
    fn unpack_checks_total_length() {
        let x = DVector::zeros(4);
        assert_eq!(
            unpack(&x, &[2, 3]),
            Err(Error::ParameterLengthMismatch { expected: 5, got: 4 })
        );
    }
}

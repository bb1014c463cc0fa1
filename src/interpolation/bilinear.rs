//! Bilinear interpolation.
//!
//! Linear interpolation in two dimensions using the four surrounding grid
//! points. A NaN among them makes the result NaN.

use super::common::{check_indices, linear_weight};
use super::Interpolator;
use crate::error::Result;

/// Bilinear interpolator
pub struct BilinearInterpolator;

impl Interpolator for BilinearInterpolator {
    fn interpolate(&self, data: &[f32], shape: &[usize], indices: &[f64]) -> Result<f32> {
        let (rows, cols, row, col) = check_indices(data, shape, indices)?;

        let j0 = (row.floor() as usize).min(rows - 1);
        let i0 = (col.floor() as usize).min(cols - 1);
        let j1 = (j0 + 1).min(rows - 1);
        let i1 = (i0 + 1).min(cols - 1);

        let (wy0, wy1) = linear_weight(row - j0 as f64);
        let (wx0, wx1) = linear_weight(col - i0 as f64);

        let at = |j: usize, i: usize| data[j * cols + i] as f64;
        let value = wy0 * (wx0 * at(j0, i0) + wx1 * at(j0, i1)) + wy1 * (wx0 * at(j1, i0) + wx1 * at(j1, i1));
        Ok(value as f32)
    }

    fn name(&self) -> &str {
        "bilinear"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bilinear_interpolation() {
        let data = [0.0, 10.0, 20.0, 30.0];
        let shape = [2, 2];

        let centre = BilinearInterpolator.interpolate(&data, &shape, &[0.5, 0.5]).unwrap();
        assert!((centre - 15.0).abs() < 1e-6);

        let edge = BilinearInterpolator.interpolate(&data, &shape, &[1.0, 0.25]).unwrap();
        assert!((edge - 22.5).abs() < 1e-6);

        let corner = BilinearInterpolator.interpolate(&data, &shape, &[1.0, 1.0]).unwrap();
        assert_eq!(corner, 30.0);
    }

    #[test]
    fn test_nan_propagates() {
        let data = [0.0, f32::NAN, 20.0, 30.0];
        let value = BilinearInterpolator.interpolate(&data, &[2, 2], &[0.5, 0.5]).unwrap();
        assert!(value.is_nan());
    }
}

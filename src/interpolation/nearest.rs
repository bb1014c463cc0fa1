//! Nearest neighbour interpolation.
//!
//! Picks the value of the closest grid point. Used for `block` plots, where
//! each grid cell should render as a flat rectangle.

use super::common::check_indices;
use super::Interpolator;
use crate::error::Result;

/// Nearest neighbor interpolator
pub struct NearestInterpolator;

impl Interpolator for NearestInterpolator {
    fn interpolate(&self, data: &[f32], shape: &[usize], indices: &[f64]) -> Result<f32> {
        let (rows, cols, row, col) = check_indices(data, shape, indices)?;
        let j = (row.round() as usize).min(rows - 1);
        let i = (col.round() as usize).min(cols - 1);
        Ok(data[j * cols + i])
    }

    fn name(&self) -> &str {
        "nearest"
    }
}

//! Bicubic (Catmull-Rom) interpolation.
//!
//! Uses the 4x4 neighbourhood around the sample point. Neighbours beyond the
//! grid edge are clamped to the edge, so the interpolant still passes
//! through every grid value.

use super::common::check_indices;
use super::Interpolator;
use crate::error::Result;

/// Bicubic interpolator
pub struct BicubicInterpolator;

/// Catmull-Rom weights for the four points around fraction `t`.
fn catmull_rom_weights(t: f64) -> [f64; 4] {
    let t2 = t * t;
    let t3 = t2 * t;
    [
        0.5 * (-t3 + 2.0 * t2 - t),
        0.5 * (3.0 * t3 - 5.0 * t2 + 2.0),
        0.5 * (-3.0 * t3 + 4.0 * t2 + t),
        0.5 * (t3 - t2),
    ]
}

impl Interpolator for BicubicInterpolator {
    fn interpolate(&self, data: &[f32], shape: &[usize], indices: &[f64]) -> Result<f32> {
        let (rows, cols, row, col) = check_indices(data, shape, indices)?;

        let j0 = row.floor() as i64;
        let i0 = col.floor() as i64;
        let wy = catmull_rom_weights(row - j0 as f64);
        let wx = catmull_rom_weights(col - i0 as f64);

        let clamp = |k: i64, n: usize| k.clamp(0, n as i64 - 1) as usize;

        let mut value = 0.0;
        for (dj, wj) in wy.iter().enumerate() {
            let j = clamp(j0 + dj as i64 - 1, rows);
            let mut row_value = 0.0;
            for (di, wi) in wx.iter().enumerate() {
                let i = clamp(i0 + di as i64 - 1, cols);
                row_value += wi * data[j * cols + i] as f64;
            }
            value += wj * row_value;
        }
        Ok(value as f32)
    }

    fn name(&self) -> &str {
        "bicubic"
    }
}

//! Common utilities for interpolation algorithms.

use crate::error::{IsobarError, Result};

/// Map a coordinate value to a fractional grid index.
///
/// `coord_values` must be monotonic, either increasing (longitudes) or
/// decreasing (latitudes stored north to south). Values outside the axis
/// are an error.
pub fn coord_to_index(coord: f64, coord_values: &[f64]) -> Result<f64> {
    let n = coord_values.len();
    if n == 0 {
        return Err(IsobarError::Interpolation {
            message: "empty coordinate axis".to_string(),
        });
    }
    if coord.is_nan() {
        return Err(IsobarError::Interpolation {
            message: "cannot locate a NaN coordinate".to_string(),
        });
    }
    if n == 1 {
        return if coord == coord_values[0] {
            Ok(0.0)
        } else {
            Err(out_of_range(coord, coord_values))
        };
    }

    let descending = coord_values[n - 1] < coord_values[0];
    let (lo, hi) = if descending {
        (coord_values[n - 1], coord_values[0])
    } else {
        (coord_values[0], coord_values[n - 1])
    };
    if coord < lo || coord > hi {
        return Err(out_of_range(coord, coord_values));
    }

    // First index whose value is past `coord` in axis order.
    let upper = if descending {
        coord_values.partition_point(|v| *v > coord)
    } else {
        coord_values.partition_point(|v| *v < coord)
    };
    if upper == 0 {
        return Ok(0.0);
    }
    let upper = upper.min(n - 1);
    let (a, b) = (coord_values[upper - 1], coord_values[upper]);
    let fraction = if b == a { 0.0 } else { (coord - a) / (b - a) };
    Ok((upper - 1) as f64 + fraction)
}

fn out_of_range(coord: f64, coord_values: &[f64]) -> IsobarError {
    IsobarError::Interpolation {
        message: format!(
            "coordinate {} is outside the axis [{}, {}]",
            coord,
            coord_values[0],
            coord_values[coord_values.len() - 1]
        ),
    }
}

/// Check that `indices` address a 2-D grid of `shape`, returning
/// `(rows, cols, row_index, col_index)`.
pub(crate) fn check_indices(data: &[f32], shape: &[usize], indices: &[f64]) -> Result<(usize, usize, f64, f64)> {
    let (rows, cols) = match shape {
        [rows, cols] => (*rows, *cols),
        _ => {
            return Err(IsobarError::Interpolation {
                message: format!("expected a 2-D shape, got {:?}", shape),
            })
        }
    };
    if data.len() != rows * cols || rows == 0 || cols == 0 {
        return Err(IsobarError::Interpolation {
            message: format!("{} values do not fill a {}x{} grid", data.len(), rows, cols),
        });
    }
    let (row, col) = match indices {
        [row, col] => (*row, *col),
        _ => {
            return Err(IsobarError::Interpolation {
                message: format!("expected 2 indices, got {}", indices.len()),
            })
        }
    };
    if !(0.0..=(rows - 1) as f64).contains(&row) || !(0.0..=(cols - 1) as f64).contains(&col) {
        return Err(IsobarError::Interpolation {
            message: format!("index ({}, {}) is outside a {}x{} grid", row, col, rows, cols),
        });
    }
    Ok((rows, cols, row, col))
}

/// Clamp an index to valid bounds
pub fn clamp_index(index: f64, size: usize) -> f64 {
    index.max(0.0).min(size.saturating_sub(1) as f64)
}

/// Get the weight for linear interpolation
pub fn linear_weight(fraction: f64) -> (f64, f64) {
    (1.0 - fraction, fraction)
}

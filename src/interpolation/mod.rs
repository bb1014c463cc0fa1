//! Interpolation algorithms for gridded data.
//!
//! Renderers sample a field at fractional grid indices when reprojecting it
//! onto the pixels of a map. Grids are row-major `[rows, columns]` slices and
//! indices are `[row, column]`.

pub mod bicubic;
pub mod bilinear;
pub mod common;
pub mod nearest;

use crate::error::{IsobarError, Result};

/// Trait for interpolation methods
pub trait Interpolator {
    /// Interpolate a value at the given fractional indices
    fn interpolate(&self, data: &[f32], shape: &[usize], indices: &[f64]) -> Result<f32>;

    /// Get the name of this interpolation method
    fn name(&self) -> &str;
}

/// Get an interpolator by name
pub fn get_interpolator(name: &str) -> Result<Box<dyn Interpolator>> {
    match name.to_lowercase().as_str() {
        "nearest" => Ok(Box::new(nearest::NearestInterpolator)),
        "bilinear" => Ok(Box::new(bilinear::BilinearInterpolator)),
        "bicubic" => Ok(Box::new(bicubic::BicubicInterpolator)),
        _ => Err(IsobarError::invalid(
            "interpolation",
            format!("Unknown interpolation method: {}", name),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_interpolator() {
        assert_eq!(get_interpolator("Nearest").unwrap().name(), "nearest");
        assert_eq!(get_interpolator("bilinear").unwrap().name(), "bilinear");
        assert_eq!(get_interpolator("bicubic").unwrap().name(), "bicubic");
        assert!(get_interpolator("kriging").is_err());
    }
}

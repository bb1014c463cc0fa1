//! Resampling gridded data onto pixels.

use image::{Rgba, RgbaImage};
use ndarray::ArrayView2;

use super::Transform;
use crate::error::{IsobarError, Result};
use crate::interpolation::common::coord_to_index;
use crate::interpolation::{get_interpolator, Interpolator};

/// Samples a regular lat/lon grid at arbitrary coordinates.
///
/// Points up to half a cell beyond the outer grid points still hit the
/// edge cells, and a grid spanning the whole globe wraps around in
/// longitude.
pub struct GridSampler {
    latitudes: Vec<f64>,
    longitudes: Vec<f64>,
    values: Vec<f32>,
    shape: [usize; 2],
    lat_margin: f64,
    lon_margin: f64,
    interpolator: Box<dyn Interpolator>,
}

impl GridSampler {
    pub fn new(latitudes: &[f64], longitudes: &[f64], values: ArrayView2<'_, f32>, method: &str) -> Result<Self> {
        let interpolator = get_interpolator(method)?;
        let (rows, cols) = values.dim();
        if rows != latitudes.len() || cols != longitudes.len() || rows == 0 || cols == 0 {
            return Err(IsobarError::Data {
                message: format!(
                    "cannot sample a {}x{} grid with {} latitudes and {} longitudes",
                    rows,
                    cols,
                    latitudes.len(),
                    longitudes.len()
                ),
            });
        }

        let mut lons = longitudes.to_vec();
        let spacing = half_spacing(longitudes) * 2.0;
        let span = (longitudes[cols - 1] - longitudes[0]).abs();
        let cyclic = cols > 1 && span + spacing >= 360.0 - 1e-6 && span < 360.0;

        let width = if cyclic { cols + 1 } else { cols };
        let mut data = Vec::with_capacity(rows * width);
        for row in values.rows() {
            data.extend(row.iter().copied());
            if cyclic {
                data.push(row[0]);
            }
        }
        if cyclic {
            let direction = if longitudes[cols - 1] >= longitudes[0] { 1.0 } else { -1.0 };
            lons.push(longitudes[0] + direction * 360.0);
        }

        Ok(Self {
            latitudes: latitudes.to_vec(),
            lat_margin: half_spacing(latitudes),
            lon_margin: if cyclic { 0.0 } else { half_spacing(longitudes) },
            longitudes: lons,
            values: data,
            shape: [rows, width],
            interpolator,
        })
    }

    /// The value at a point, or `None` off the grid or on missing data.
    pub fn sample(&self, lon: f64, lat: f64) -> Option<f32> {
        let lat = within(lat, &self.latitudes, self.lat_margin)?;
        let row = coord_to_index(lat, &self.latitudes).ok()?;
        [lon, lon + 360.0, lon - 360.0]
            .into_iter()
            .find_map(|candidate| within(candidate, &self.longitudes, self.lon_margin))
            .and_then(|lon| coord_to_index(lon, &self.longitudes).ok())
            .and_then(|col| self.interpolator.interpolate(&self.values, &self.shape, &[row, col]).ok())
            .filter(|v| !v.is_nan())
    }
}

fn half_spacing(axis: &[f64]) -> f64 {
    match axis {
        [a, b, ..] => (b - a).abs() / 2.0,
        _ => 0.5,
    }
}

/// `coord` clamped onto the axis when it lies no further than `margin`
/// beyond either end.
fn within(coord: f64, axis: &[f64], margin: f64) -> Option<f64> {
    let (first, last) = (axis[0], axis[axis.len() - 1]);
    let (lo, hi) = (first.min(last), first.max(last));
    if coord < lo - margin || coord > hi + margin {
        None
    } else {
        Some(coord.clamp(lo, hi))
    }
}

/// Colour every pixel of the transform's rectangle by its data coordinates.
/// Pixels where `color_at` gives `None` stay transparent.
pub fn rasterize(transform: &Transform, mut color_at: impl FnMut(f64, f64) -> Option<[u8; 4]>) -> RgbaImage {
    let rect = transform.rect();
    let width = rect.width.round().max(0.0) as u32;
    let height = rect.height.round().max(0.0) as u32;
    let mut image = RgbaImage::new(width, height);
    for (px, py, pixel) in image.enumerate_pixels_mut() {
        let (x, y) = transform.invert(rect.x + px as f32 + 0.5, rect.y + py as f32 + 0.5);
        if let Some(color) = color_at(x, y) {
            *pixel = Rgba(color);
        }
    }
    image
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::PixelRect;
    use ndarray::array;

    #[test]
    fn test_sample_with_half_cell_margin() {
        let values = array![[1.0f32, 2.0], [3.0, 4.0]];
        let sampler = GridSampler::new(&[10.0, 0.0], &[0.0, 10.0], values.view(), "nearest").unwrap();
        assert_eq!(sampler.sample(0.0, 10.0), Some(1.0));
        assert_eq!(sampler.sample(12.0, -3.0), Some(4.0));
        assert_eq!(sampler.sample(20.0, 0.0), None);
    }

    #[test]
    fn test_global_grid_wraps() {
        let lons: Vec<f64> = (0..4).map(|i| i as f64 * 90.0).collect();
        let values = array![[0.0f32, 1.0, 2.0, 3.0]];
        let sampler = GridSampler::new(&[0.0], &lons, values.view(), "bilinear").unwrap();
        let wrapped = sampler.sample(315.0, 0.0).unwrap();
        assert!((wrapped - 1.5).abs() < 1e-6);
        assert_eq!(sampler.sample(-90.0, 0.0), Some(3.0));
    }

    #[test]
    fn test_nan_is_missing() {
        let values = array![[f32::NAN, 1.0]];
        let sampler = GridSampler::new(&[0.0], &[0.0, 1.0], values.view(), "nearest").unwrap();
        assert_eq!(sampler.sample(0.0, 0.0), None);
        assert_eq!(sampler.sample(1.0, 0.0), Some(1.0));
    }

    #[test]
    fn test_rasterize() {
        let transform = Transform::new([0.0, 4.0, 0.0, 2.0], PixelRect::new(0.0, 0.0, 4.0, 2.0));
        let image = rasterize(&transform, |x, _| (x < 2.0).then_some([255, 0, 0, 255]));
        assert_eq!(image.dimensions(), (4, 2));
        assert_eq!(image.get_pixel(0, 0).0, [255, 0, 0, 255]);
        assert_eq!(image.get_pixel(3, 1).0[3], 0);
    }
}

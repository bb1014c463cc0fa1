//! Bounding boxes in projected coordinates.

use std::ops::Add;
use tracing::warn;

use super::crs::Crs;
use super::optimisers::CrsOptimiser;
use crate::error::{IsobarError, Result};

/// Points sampled along each edge when reprojecting a box
const EDGE_SAMPLES: usize = 100;

/// An axis-aligned box in the coordinates of `crs`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
    pub crs: Crs,
}

impl BoundingBox {
    pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64, crs: Crs) -> Self {
        Self {
            x_min,
            x_max,
            y_min,
            y_max,
            crs,
        }
    }

    /// Build from `[x_min, x_max, y_min, y_max]`.
    pub fn from_array(bounds: [f64; 4], crs: Crs) -> Self {
        let [x_min, x_max, y_min, y_max] = bounds;
        Self::new(x_min, x_max, y_min, y_max, crs)
    }

    /// Reproject `[west, east, south, north]` from `source_crs` (Plate Carrée
    /// when `None`) into `target_crs`.
    ///
    /// The edges are sampled and projected, so the result encloses the whole
    /// source box even where the projection curves its edges. Without a
    /// target, a geographic box gets the projection [`CrsOptimiser`] picks
    /// for it and a projected box keeps its own CRS.
    pub fn from_bbox(
        bbox: [f64; 4],
        source_crs: Option<Crs>,
        target_crs: Option<Crs>,
    ) -> Result<Self> {
        let source = source_crs.unwrap_or_default();
        let target = match target_crs {
            Some(crs) => crs,
            None if source.is_geographic() => {
                let [west, east, south, north] = bbox;
                let shift = source.central_longitude();
                CrsOptimiser::new([west + shift, east + shift, south, north]).crs()
            }
            None => return Ok(Self::from_array(bbox, source)),
        };
        if target == source {
            return Ok(Self::from_array(bbox, source));
        }

        let mut points: Vec<(f64, f64)> = perimeter_lonlat(bbox, &source)
            .into_iter()
            .filter_map(|(lon, lat)| target.forward_unwrapped(lon, lat))
            .collect();

        // A projected box around a pole covers every longitude at that pole
        if !source.is_geographic() {
            let source_box = Self::from_array(bbox, source);
            for pole in [90.0, -90.0] {
                let inside = source
                    .forward(0.0, pole)
                    .is_some_and(|point| source_box.contains_point(point));
                if inside {
                    let centre = target.central_longitude();
                    points.extend((0..=EDGE_SAMPLES).filter_map(|i| {
                        let lon = centre - 180.0 + 360.0 * i as f64 / EDGE_SAMPLES as f64;
                        target.forward_unwrapped(lon, pole)
                    }));
                }
            }
        }

        if points.is_empty() {
            return Err(IsobarError::Projection {
                message: format!(
                    "no part of the box {:?} can be shown in the {} projection",
                    bbox, target
                ),
            });
        }

        if let Some(period) = target.x_period() {
            recentre_x(&mut points, period);
        }

        let mut result = Self::new(
            f64::INFINITY,
            f64::NEG_INFINITY,
            f64::INFINITY,
            f64::NEG_INFINITY,
            target,
        );
        for (x, y) in points {
            result.x_min = result.x_min.min(x);
            result.x_max = result.x_max.max(x);
            result.y_min = result.y_min.min(y);
            result.y_max = result.y_max.max(y);
        }
        Ok(result)
    }

    pub fn to_array(&self) -> [f64; 4] {
        [self.x_min, self.x_max, self.y_min, self.y_max]
    }

    /// The bounds in `[x_min, x_max, y_min, y_max]` order.
    pub fn iter(&self) -> impl Iterator<Item = f64> {
        self.to_array().into_iter()
    }

    pub fn west(&self) -> f64 {
        self.x_min
    }

    pub fn east(&self) -> f64 {
        self.x_max
    }

    pub fn south(&self) -> f64 {
        self.y_min
    }

    pub fn north(&self) -> f64 {
        self.y_max
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    /// Whether `(x, y)` lies inside the box or on its edge.
    pub fn contains_point(&self, (x, y): (f64, f64)) -> bool {
        (self.x_min..=self.x_max).contains(&x) && (self.y_min..=self.y_max).contains(&y)
    }

    /// The smallest box in `target` enclosing this one.
    pub fn to_bbox(&self, target: Crs) -> Result<Self> {
        Self::from_bbox(self.to_array(), Some(self.crs), Some(target))
    }

    /// This box as longitudes and latitudes.
    pub fn to_latlon_bbox(&self) -> Result<Self> {
        if self.crs.is_geographic() {
            let shift = self.crs.central_longitude();
            return Ok(Self::new(
                self.x_min + shift,
                self.x_max + shift,
                self.y_min,
                self.y_max,
                Crs::default(),
            ));
        }
        self.to_bbox(Crs::default())
    }

    /// Reproject into the CRS best suited to this box's extent.
    pub fn to_optimised_bbox(&self) -> Result<Self> {
        let latlon = self.to_latlon_bbox()?;
        let target = CrsOptimiser::new(latlon.to_array()).crs();
        Self::from_bbox(latlon.to_array(), Some(latlon.crs), Some(target))
    }

    /// The smallest box enclosing both, in this box's CRS.
    pub fn union(&self, other: &Self) -> Result<Self> {
        let other = if other.crs == self.crs {
            *other
        } else {
            other.to_bbox(self.crs)?
        };
        Ok(Self::new(
            self.x_min.min(other.x_min),
            self.x_max.max(other.x_max),
            self.y_min.min(other.y_min),
            self.y_max.max(other.y_max),
            self.crs,
        ))
    }
}

impl Add for BoundingBox {
    type Output = BoundingBox;

    fn add(self, other: BoundingBox) -> BoundingBox {
        match self.union(&other) {
            Ok(union) => union,
            Err(e) => {
                warn!(error = %e, "Could not reproject bounding box; combining raw bounds");
                Self::new(
                    self.x_min.min(other.x_min),
                    self.x_max.max(other.x_max),
                    self.y_min.min(other.y_min),
                    self.y_max.max(other.y_max),
                    self.crs,
                )
            }
        }
    }
}

impl IntoIterator for BoundingBox {
    type Item = f64;
    type IntoIter = std::array::IntoIter<f64, 4>;

    fn into_iter(self) -> Self::IntoIter {
        self.to_array().into_iter()
    }
}

/// Longitude/latitude points along the edges of a box given in `crs`.
fn perimeter_lonlat(bbox: [f64; 4], crs: &Crs) -> Vec<(f64, f64)> {
    let [x0, mut x1, y0, y1] = bbox;
    if crs.is_geographic() && x1 < x0 {
        // Crosses the dateline
        x1 += 360.0;
    }

    let mut edge = Vec::with_capacity(4 * (EDGE_SAMPLES + 1));
    for i in 0..=EDGE_SAMPLES {
        let t = i as f64 / EDGE_SAMPLES as f64;
        let x = x0 + t * (x1 - x0);
        let y = y0 + t * (y1 - y0);
        edge.extend([(x, y0), (x, y1), (x0, y), (x1, y)]);
    }

    if crs.is_geographic() {
        let shift = crs.central_longitude();
        edge.into_iter().map(|(x, y)| (x + shift, y)).collect()
    } else {
        edge.into_iter()
            .filter_map(|(x, y)| crs.inverse(x, y))
            .collect()
    }
}

/// Shift unwrapped x values by whole turns so their middle sits within half a
/// turn of the central meridian.
fn recentre_x(points: &mut [(f64, f64)], period: f64) {
    let (min, max) = points
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(x, _)| {
            (lo.min(x), hi.max(x))
        });
    let mut middle = (min + max) / 2.0;
    let mut shift = 0.0;
    while middle > period / 2.0 {
        middle -= period;
        shift -= period;
    }
    while middle < -period / 2.0 {
        middle += period;
        shift += period;
    }
    if shift != 0.0 {
        for (x, _) in points.iter_mut() {
            *x += shift;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64, tolerance: f64) {
        assert!(
            (actual - expected).abs() <= tolerance,
            "expected {} within {} of {}",
            actual,
            tolerance,
            expected
        );
    }

    #[test]
    fn test_bounding_box_accessors() {
        let bbox = BoundingBox::new(-180.0, 180.0, -90.0, 90.0, Crs::default());
        assert_eq!(bbox.iter().collect::<Vec<_>>(), vec![-180.0, 180.0, -90.0, 90.0]);
        assert_eq!(bbox.west(), -180.0);
        assert_eq!(bbox.east(), 180.0);
        assert_eq!(bbox.south(), -90.0);
        assert_eq!(bbox.north(), 90.0);
        assert_eq!(bbox.width(), 360.0);
    }

    #[test]
    fn test_contains_point_is_inclusive() {
        let bbox = BoundingBox::new(-10.0, 10.0, -10.0, 10.0, Crs::default());
        assert!(bbox.contains_point((0.0, 0.0)));
        assert!(bbox.contains_point((-10.0, 10.0)));
        assert!(!bbox.contains_point((-11.0, 10.0)));
        assert!(!bbox.contains_point((-10.0, 11.0)));
    }

    #[test]
    fn test_addition() {
        let first = BoundingBox::new(-10.0, 10.0, -10.0, 10.0, Crs::default());
        let second = BoundingBox::new(0.0, 11.0, -12.0, 12.0, Crs::default());
        assert_eq!((first + second).to_array(), [-10.0, 11.0, -12.0, 12.0]);
    }

    #[test]
    fn test_from_bbox_0_360() {
        let bbox = BoundingBox::from_bbox([0.0, 360.0, -90.0, 90.0], None, None).unwrap();
        assert_close(bbox.x_min, -180.0, 1e-9);
        assert_close(bbox.x_max, 180.0, 1e-9);
        assert_close(bbox.y_min, -90.0, 1e-9);
        assert_close(bbox.y_max, 90.0, 1e-9);
        assert_eq!(bbox.crs, Crs::plate_carree(180.0));
    }

    #[test]
    fn test_from_bbox_recentres() {
        let bbox = BoundingBox::from_bbox([-10.0, 20.0, -10.0, 20.0], None, None).unwrap();
        assert_eq!(bbox.crs, Crs::plate_carree(5.0));
        assert_close(bbox.x_min, -15.0, 1e-9);
        assert_close(bbox.x_max, 15.0, 1e-9);
        assert_close(bbox.y_min, -10.0, 1e-9);
        assert_close(bbox.y_max, 20.0, 1e-9);
    }

    #[test]
    fn test_optimised_global() {
        let bbox = BoundingBox::new(-180.0, 180.0, -90.0, 90.0, Crs::default());
        let optimised = bbox.to_optimised_bbox().unwrap();
        assert_eq!(optimised.crs, Crs::plate_carree(0.0));
        assert_close(optimised.x_min, -180.0, 1e-9);
        assert_close(optimised.x_max, 180.0, 1e-9);
    }

    #[test]
    fn test_optimised_europe() {
        let bbox = BoundingBox::new(-25.0, 40.0, 34.0, 72.0, Crs::default());
        let optimised = bbox.to_optimised_bbox().unwrap();

        assert!(matches!(optimised.crs, Crs::AlbersEqualArea { .. }));
        assert_close(optimised.x_min, -optimised.x_max, 1.0);
        assert_close(optimised.x_max, 2_968_299.0, 60_000.0);
        assert!(optimised.y_min < 0.0 && optimised.y_max > 0.0);
    }

    #[test]
    fn test_to_latlon_bbox() {
        let bbox = BoundingBox::new(-2e6, 3e6, 3e6, 7e6, Crs::lambert_azimuthal(0.0, 0.0));
        let latlon = bbox.to_latlon_bbox().unwrap();
        assert_eq!(latlon.crs, Crs::default());
        assert_close(latlon.x_min, -36.64, 0.5);
        assert_close(latlon.x_max, 52.96, 0.5);
        assert_close(latlon.y_min, 26.49, 0.5);
        assert_close(latlon.y_max, 66.68, 0.5);
    }

    #[test]
    fn test_polar_box_reaches_pole() {
        let arctic = BoundingBox::new(
            -3.5e6,
            3.5e6,
            -3.5e6,
            3.5e6,
            Crs::NorthPolarStereo { central_longitude: 0.0 },
        );
        let latlon = arctic.to_latlon_bbox().unwrap();
        assert_close(latlon.north(), 90.0, 1e-9);
        assert_close(latlon.west(), -180.0, 1e-6);
        assert_close(latlon.east(), 180.0, 1e-6);
        assert!(latlon.south() > 40.0);
    }

    #[test]
    fn test_union_reprojects_other() {
        let albers = BoundingBox::new(-25.0, 40.0, 34.0, 72.0, Crs::default())
            .to_optimised_bbox()
            .unwrap();
        let latlon = BoundingBox::new(-30.0, 40.0, 34.0, 72.0, Crs::default());
        let union = albers.union(&latlon).unwrap();
        assert_eq!(union.crs, albers.crs);
        assert!(union.x_min < albers.x_min);
        assert_close(union.x_max, albers.x_max, 1.0);
    }
}

//! Geographic helpers: projections, bounding boxes and named domains.
//!
//! Longitudes come in two conventions (-180..180 and 0..360) and bounding
//! boxes may cross the dateline; the helpers here keep both straight.

pub mod bounds;
pub mod coastlines;
pub mod crs;
pub mod domains;
pub mod optimisers;

pub use bounds::BoundingBox;
pub use coastlines::{load_coastlines, parse_geojson, Polyline};
pub use crs::{default_crs, dict_to_crs, parse_crs, string_to_crs, Crs};
pub use domains::{format_name, union, Domain, GridSubset};
pub use optimisers::{CrsOptimiser, LatitudeClass, Shape, Size};

use crate::error::{IsobarError, Result};

/// Tolerance used when deciding whether a longitude sits exactly on an edge
const EDGE_TOLERANCE: f64 = 1e-8;

/// Normalize a longitude value to the range [-180, 180)
pub fn normalize_longitude(lon: f64) -> f64 {
    let normalized = (lon + 180.0).rem_euclid(360.0) - 180.0;
    if normalized == 180.0 {
        -180.0
    } else {
        normalized
    }
}

/// Map a longitude into [-180, 180], keeping an original +180 as +180 so that
/// the east edge of a grid does not fold onto its west edge.
pub fn force_minus_180_to_180(lon: f64) -> f64 {
    if (lon - 180.0).abs() < EDGE_TOLERANCE {
        180.0
    } else {
        normalize_longitude(lon)
    }
}

/// Map a longitude into [0, 360], keeping an original 360 as 360.
pub fn force_0_to_360(lon: f64) -> f64 {
    if (lon - 360.0).abs() < EDGE_TOLERANCE {
        360.0
    } else {
        lon.rem_euclid(360.0)
    }
}

/// Parse a bounding box string "west,east,south,north"
pub fn parse_bbox(bbox: &str) -> Result<[f64; 4]> {
    let parts: Vec<&str> = bbox.split(',').map(str::trim).collect();
    if parts.len() != 4 {
        return Err(IsobarError::invalid(
            "bbox",
            "Bounding box must be in format 'west,east,south,north'",
        ));
    }

    let mut values = [0.0; 4];
    for ((value, part), label) in values
        .iter_mut()
        .zip(&parts)
        .zip(["west", "east", "south", "north"])
    {
        *value = part
            .parse::<f64>()
            .map_err(|_| IsobarError::invalid("bbox", format!("Invalid {}: {}", label, part)))?;
    }

    let [_, _, south, north] = values;
    if south > north {
        return Err(IsobarError::invalid(
            "bbox",
            format!("south ({}) must be <= north ({})", south, north),
        ));
    }
    if !(-90.0..=90.0).contains(&south) || !(-90.0..=90.0).contains(&north) {
        return Err(IsobarError::invalid(
            "bbox",
            "Latitude must be in the range -90 to 90",
        ));
    }

    Ok(values)
}

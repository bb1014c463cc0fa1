//! Recognising coordinate and variable names.
//!
//! Data files name their axes in many ways (`lat`, `latitude`, `y`, ...).
//! These lists, searched in order, let the loaders and plotting code find
//! the right axis without the caller spelling it out.

pub const X: &[&str] = &[
    "x",
    "X",
    "xc",
    "projection_x_coordinate",
    "longitude",
    "long",
    "lon",
];

pub const Y: &[&str] = &["y", "Y", "yc", "projection_y_coordinate", "latitude", "lat"];

pub const U: &[&str] = &[
    "u",
    "U",
    "10u",
    "u10",
    "100u",
    "u100",
    "eastward_wind",
    "U component of wind",
    "10m_u_component_of_wind",
    "100m_u_component_of_wind",
    "10 metre U wind component",
    "100 metre U wind component",
    "u_component_of_wind",
];

pub const V: &[&str] = &[
    "v",
    "V",
    "10v",
    "v10",
    "100v",
    "v100",
    "northward_wind",
    "V component of wind",
    "10m_v_component_of_wind",
    "100m_v_component_of_wind",
    "10 metre V wind component",
    "100 metre V wind component",
    "v_component_of_wind",
];

pub const LATITUDE: &[&str] = &["latitude", "lat"];

pub const LONGITUDE: &[&str] = &["longitude", "long", "lon"];

pub const TIME: &[&str] = &[
    "time",
    "valid_time",
    "t",
    "date",
    "dayofyear",
    "month",
    "year",
];

/// Names that describe coordinates or bookkeeping rather than the data itself.
pub const COORDINATE_DIMS: &[&str] = &[
    "x",
    "y",
    "z",
    "X",
    "Y",
    "Z",
    "longitude",
    "long",
    "lon",
    "latitude",
    "lat",
    "time",
    "valid_time",
    "t",
    "date",
    "dayofyear",
    "month",
    "year",
    "level",
    "height",
    "depth",
    "pressure",
    "altitude",
    "ensemble",
    "member",
    "realization",
    "forecast_time",
    "forecast_period",
    "lead_time",
    "step",
    "step_type",
    "step_units",
    "grid_type",
    "grid_name",
    "projection_x_coordinate",
    "projection_y_coordinate",
    "xc",
    "yc",
    "time_bnds",
    "lat_bnds",
    "lon_bnds",
];

/// Attribute names tried, in order, for a human-readable variable name.
pub const VARIABLE_NAME_PREFERENCE: &[&str] = &["long_name", "standard_name", "name", "short_name"];

/// Return the first candidate present in `names`.
///
/// Exact matches win; a case-insensitive match is accepted as a fallback.
pub fn find<'a, S: AsRef<str>>(names: &'a [S], candidates: &[&str]) -> Option<&'a str> {
    for candidate in candidates {
        if let Some(name) = names.iter().find(|n| n.as_ref() == *candidate) {
            return Some(name.as_ref());
        }
    }
    for candidate in candidates {
        if let Some(name) = names
            .iter()
            .find(|n| n.as_ref().eq_ignore_ascii_case(candidate))
        {
            return Some(name.as_ref());
        }
    }
    None
}

pub fn find_y<S: AsRef<str>>(names: &[S]) -> Option<&str> {
    find(names, Y)
}

pub fn find_u<S: AsRef<str>>(names: &[S]) -> Option<&str> {
    find(names, U)
}

pub fn find_v<S: AsRef<str>>(names: &[S]) -> Option<&str> {
    find(names, V)
}

/// The first matching pair of wind components, e.g. `("u10", "v10")`.
pub fn find_uv_pair<S: AsRef<str>>(names: &[S]) -> Option<(&'static str, &'static str)> {
    U.iter().zip(V.iter()).find_map(|(u, v)| {
        let has = |wanted: &str| names.iter().any(|n| n.as_ref() == wanted);
        (has(u) && has(v)).then_some((*u, *v))
    })
}

pub fn find_latitude<S: AsRef<str>>(names: &[S]) -> Option<&str> {
    find(names, LATITUDE)
}

pub fn find_longitude<S: AsRef<str>>(names: &[S]) -> Option<&str> {
    find(names, LONGITUDE)
}

pub fn find_time<S: AsRef<str>>(names: &[S]) -> Option<&str> {
    find(names, TIME)
}

/// Pick the name most likely to be the data variable among `names`.
///
/// Coordinate-like names are skipped; among several candidates, one that
/// does not look like an axis is preferred.
pub fn identify_primary<S: AsRef<str>>(names: &[S]) -> Option<&str> {
    let primary: Vec<&str> = names
        .iter()
        .map(|n| n.as_ref())
        .filter(|n| !COORDINATE_DIMS.contains(n))
        .collect();

    match primary.as_slice() {
        [] => None,
        [only] => Some(*only),
        _ => primary
            .iter()
            .find(|name| {
                let lower = name.to_lowercase();
                !["x", "y", "z", "time", "lat", "lon"]
                    .iter()
                    .any(|axis| lower.contains(axis))
            })
            .or_else(|| primary.first())
            .copied(),
    }
}

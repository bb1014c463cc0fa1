//! Test data generation utilities.
//!
//! Builders for in-memory fields and series with known patterns, and writers
//! for the JSON grid files read by `isobar::sources::load_field` and
//! `isobar::sources::load_vector_field`.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use isobar::{GriddedField, TimeSeries, VectorField};
use ndarray::Array3;
use serde_json::{json, Value};
use std::path::Path;

/// Latitudes from 90 down to -90 and longitudes from -180 up to (but not
/// including) 180, every `step` degrees.
pub fn global_axes(step: f64) -> (Vec<f64>, Vec<f64>) {
    let n_lat = (180.0 / step).round() as usize;
    let n_lon = (360.0 / step).round() as usize;
    let lats = (0..=n_lat).map(|j| 90.0 - j as f64 * step).collect();
    let lons = (0..n_lon).map(|i| -180.0 + i as f64 * step).collect();
    (lats, lons)
}

/// A global 2-metre temperature field in kelvin: warm at the equator, cold
/// at the poles, with a zonal wave on top.
pub fn global_temperature(step: f64) -> GriddedField {
    let (lats, lons) = global_axes(step);
    isobar::sources::field_from_fn("2t", lats, lons, |lat, lon| {
        (273.15 + 30.0 * lat.to_radians().cos() - 10.0 + 3.0 * (2.0 * lon.to_radians()).sin()) as f32
    })
    .unwrap()
    .with_long_name("2 metre temperature")
    .with_units("K")
}

/// The first time step used by the multi-step fixtures.
pub fn start_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 7, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// A mean sea level pressure field with `steps` six-hourly steps; a low
/// drifts east by ten degrees per step.
pub fn moving_low(steps: usize, step: f64) -> GriddedField {
    let (lats, lons) = global_axes(step);
    let values = Array3::from_shape_fn((steps, lats.len(), lons.len()), |(t, j, i)| {
        let centre = -40.0 + 10.0 * t as f64;
        let d2 = (lats[j] - 55.0).powi(2) + (lons[i] - centre).powi(2);
        (101_325.0 - 3_000.0 * (-d2 / 400.0).exp()) as f32
    });
    let times = (0..steps)
        .map(|t| start_time() + Duration::hours(6 * t as i64))
        .collect();
    GriddedField::from_steps("msl", lats, lons, values)
        .unwrap()
        .with_long_name("Mean sea level pressure")
        .with_units("Pa")
        .with_times(times)
        .unwrap()
}

/// Annual temperature anomalies warming steadily from -0.6 to about 1.0.
pub fn warming_anomalies(start_year: i32, years: usize) -> TimeSeries {
    let times = (0..years)
        .map(|i| {
            NaiveDate::from_ymd_opt(start_year + i as i32, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        })
        .collect();
    let values = (0..years)
        .map(|i| -0.6 + 1.6 * i as f64 / (years.max(2) - 1) as f64)
        .collect();
    TimeSeries::new("t2m_anomaly", times, values)
        .unwrap()
        .with_units("K")
}

/// Daily values of a seasonal cycle.
pub fn daily_cycle(days: usize) -> TimeSeries {
    let times = (0..days)
        .map(|d| start_time() + Duration::days(d as i64))
        .collect();
    let values = (0..days)
        .map(|d| 15.0 + 8.0 * (d as f64 / 365.0 * std::f64::consts::TAU).cos())
        .collect();
    TimeSeries::new("tas", times, values).unwrap().with_units("degC")
}

/// The same wind everywhere on a global grid, in m/s.
pub fn uniform_wind(step: f64, u: f32, v: f32) -> VectorField {
    let (lats, lons) = global_axes(step);
    let component = |name: &str, long_name: &str, value: f32| {
        isobar::sources::field_from_fn(name, lats.clone(), lons.clone(), move |_, _| value)
            .unwrap()
            .with_long_name(long_name)
            .with_units("m s**-1")
    };
    VectorField::new(
        component("u10", "10 metre U wind component", u),
        component("v10", "10 metre V wind component", v),
    )
    .unwrap()
}

fn grid_document(field: &GriddedField) -> Value {
    let steps: Vec<Vec<Vec<Option<f32>>>> = field
        .all_values()
        .outer_iter()
        .map(|step| {
            step.outer_iter()
                .map(|row| row.iter().map(|v| v.is_finite().then_some(*v)).collect())
                .collect()
        })
        .collect();
    let times: Vec<String> = field
        .times()
        .iter()
        .map(|t| t.format("%Y-%m-%dT%H:%M:%S").to_string())
        .collect();
    json!({
        "name": field.name(),
        "long_name": field.long_name(),
        "units": field.units(),
        "latitudes": field.latitudes(),
        "longitudes": field.longitudes(),
        "values": steps,
        "times": times,
    })
}

/// Write a JSON grid of `field`'s steps, with `null` for missing values.
pub fn write_json_grid(path: &Path, field: &GriddedField) -> std::io::Result<()> {
    std::fs::write(path, serde_json::to_string_pretty(&grid_document(field))?)
}

/// Write several fields as one JSON list of grids.
pub fn write_json_grids(path: &Path, fields: &[&GriddedField]) -> std::io::Result<()> {
    let documents: Vec<Value> = fields.iter().map(|field| grid_document(field)).collect();
    std::fs::write(path, serde_json::to_string(&documents)?)
}

/// A small single-step grid with one missing value, as JSON text.
pub fn small_grid_json() -> String {
    json!({
        "name": "tp",
        "long_name": "Total precipitation",
        "units": "m",
        "latitudes": [10.0, 0.0],
        "longitudes": [0.0, 10.0, 20.0],
        "values": [[0.001, 0.002, null], [0.0, 0.004, 0.008]],
        "attributes": {"institution": "isobar tests"}
    })
    .to_string()
}

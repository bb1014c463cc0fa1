//! Coastline outlines read from GeoJSON.

use serde_json::Value;
use std::path::Path;
use tracing::debug;

use crate::error::{IsobarError, Result};

/// A polyline of `(longitude, latitude)` vertices.
pub type Polyline = Vec<(f64, f64)>;

/// Read every line and polygon ring from a GeoJSON file.
pub fn load_coastlines(path: &Path) -> Result<Vec<Polyline>> {
    if !path.is_file() {
        return Err(IsobarError::DataNotFound {
            message: format!("coastline file {} does not exist", path.display()),
        });
    }
    let text = std::fs::read_to_string(path)?;
    let lines = parse_geojson(&serde_json::from_str(&text)?)?;
    debug!(path = %path.display(), lines = lines.len(), "Loaded coastlines");
    Ok(lines)
}

/// Collect the lines of a GeoJSON object. Points are ignored; polygons
/// contribute each of their rings.
pub fn parse_geojson(value: &Value) -> Result<Vec<Polyline>> {
    let mut lines = Vec::new();
    collect(value, &mut lines)?;
    Ok(lines)
}

fn collect(value: &Value, lines: &mut Vec<Polyline>) -> Result<()> {
    let kind = value.get("type").and_then(Value::as_str).unwrap_or_default();
    match kind {
        "FeatureCollection" => {
            for feature in value.get("features").and_then(Value::as_array).into_iter().flatten() {
                collect(feature, lines)?;
            }
        }
        "Feature" => {
            if let Some(geometry) = value.get("geometry").filter(|g| !g.is_null()) {
                collect(geometry, lines)?;
            }
        }
        "GeometryCollection" => {
            for geometry in value.get("geometries").and_then(Value::as_array).into_iter().flatten() {
                collect(geometry, lines)?;
            }
        }
        "LineString" => lines.push(line(coordinates(value)?)?),
        "MultiLineString" | "Polygon" => {
            for ring in as_array(coordinates(value)?)? {
                lines.push(line(ring)?);
            }
        }
        "MultiPolygon" => {
            for polygon in as_array(coordinates(value)?)? {
                for ring in as_array(polygon)? {
                    lines.push(line(ring)?);
                }
            }
        }
        "Point" | "MultiPoint" => {}
        other => {
            return Err(IsobarError::Data {
                message: format!("unsupported GeoJSON type '{}'", other),
            })
        }
    }
    Ok(())
}

fn coordinates(geometry: &Value) -> Result<&Value> {
    geometry.get("coordinates").ok_or_else(|| IsobarError::Data {
        message: "GeoJSON geometry has no coordinates".to_string(),
    })
}

fn as_array(value: &Value) -> Result<&Vec<Value>> {
    value.as_array().ok_or_else(|| IsobarError::Data {
        message: format!("expected a GeoJSON coordinate array, got {}", value),
    })
}

fn line(value: &Value) -> Result<Polyline> {
    as_array(value)?
        .iter()
        .map(|position| match position.as_array().map(Vec::as_slice) {
            Some([lon, lat, ..]) => match (lon.as_f64(), lat.as_f64()) {
                (Some(lon), Some(lat)) => Ok((lon, lat)),
                _ => Err(IsobarError::Data {
                    message: format!("non-numeric GeoJSON position {}", position),
                }),
            },
            _ => Err(IsobarError::Data {
                message: format!("invalid GeoJSON position {}", position),
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_feature_collection() {
        let geojson = json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "geometry": {"type": "LineString", "coordinates": [[0, 0], [1, 1]]}},
                {"type": "Feature", "geometry": {"type": "MultiPolygon", "coordinates": [
                    [[[0, 0], [1, 0], [1, 1], [0, 0]]],
                    [[[5, 5], [6, 5], [6, 6], [5, 5]], [[5.2, 5.2], [5.4, 5.2], [5.4, 5.4], [5.2, 5.2]]]
                ]}},
                {"type": "Feature", "geometry": {"type": "Point", "coordinates": [3, 3]}},
                {"type": "Feature", "geometry": null}
            ]
        });
        let lines = parse_geojson(&geojson).unwrap();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], vec![(0.0, 0.0), (1.0, 1.0)]);
        assert_eq!(lines[3].len(), 4);
    }

    #[test]
    fn test_invalid_geojson() {
        assert!(parse_geojson(&json!({"type": "Blob"})).is_err());
        assert!(parse_geojson(&json!({"type": "LineString", "coordinates": [[0]]})).is_err());
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let err = load_coastlines(Path::new("/nonexistent/coast.geojson")).unwrap_err();
        assert!(err.is_not_found());
    }
}

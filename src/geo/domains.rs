//! Named geographic domains.
//!
//! A [`Domain`] pairs a bounding box with the projection it should be drawn
//! in. Named domains come from the bundled domain table; anything else can be
//! built from a bounding box or from the data being plotted.

use ndarray::{Array2, ArrayView2, Axis};
use serde_json::Value;
use std::ops::Add;
use tracing::{debug, warn};

use super::bounds::BoundingBox;
use super::crs::{default_crs, dict_to_crs, Crs};
use super::{force_0_to_360, force_minus_180_to_180};
use crate::ancillary;
use crate::error::{IsobarError, Result};
use crate::sources::GriddedField;
use crate::utils::list_to_human;

const GLOBAL_BOUNDS: [f64; 4] = [-180.0, 180.0, -90.0, 90.0];

/// A row of the domain table.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainRecord {
    pub name: String,
    /// `[west, east, south, north]`, or projected bounds when `crs` is set
    pub bounds: [f64; 4],
    pub crs: Option<Crs>,
}

/// Normalise a domain name to its key in the domain table.
///
/// Matching ignores case and treats underscores as spaces; alternate names
/// (e.g. "UK") resolve to their canonical domain.
pub fn format_name(name: &str) -> Result<Option<String>> {
    let table = ancillary::domain_table()?;
    let wanted = name.to_lowercase().replace('_', " ");

    if let Some(Value::Object(domains)) = table.get("domains") {
        if let Some(key) = domains.keys().find(|key| key.to_lowercase() == wanted) {
            return Ok(Some(key.clone()));
        }
    }

    if let Some(Value::Object(alternates)) = table.get("alternate_names") {
        for (canonical, names) in alternates {
            let matches = names
                .as_array()
                .map(|names| {
                    names
                        .iter()
                        .filter_map(Value::as_str)
                        .any(|alt| alt.to_lowercase() == wanted)
                })
                .unwrap_or(false);
            if matches {
                return Ok(Some(canonical.clone()));
            }
        }
    }

    Ok(None)
}

/// Look a domain up in the domain table.
pub fn lookup(name: &str) -> Result<Option<DomainRecord>> {
    let Some(key) = format_name(name)? else {
        return Ok(None);
    };
    let table = ancillary::domain_table()?;
    let Some(entry) = table.get("domains").and_then(|domains| domains.get(&key)) else {
        return Ok(None);
    };

    let (bounds, crs) = match entry {
        Value::Array(_) => (parse_bounds(&key, entry)?, None),
        Value::Object(_) => {
            let bounds = entry.get("bounds").ok_or_else(|| IsobarError::Config {
                message: format!("domain '{}' has no bounds", key),
            })?;
            let crs = match entry.get("crs") {
                Some(spec) => Some(dict_to_crs(spec)?),
                None => None,
            };
            (parse_bounds(&key, bounds)?, crs)
        }
        _ => {
            return Err(IsobarError::Config {
                message: format!("domain '{}' must be a list of bounds or a mapping", key),
            })
        }
    };

    Ok(Some(DomainRecord {
        name: key,
        bounds,
        crs,
    }))
}

fn parse_bounds(name: &str, value: &Value) -> Result<[f64; 4]> {
    let numbers: Vec<f64> = value
        .as_array()
        .map(|items| items.iter().filter_map(Value::as_f64).collect())
        .unwrap_or_default();
    numbers.try_into().map_err(|_| IsobarError::Config {
        message: format!("domain '{}' bounds must be four numbers", name),
    })
}

/// Combine several domains into one covering all of them.
pub fn union(domains: Vec<Domain>, name: Option<&str>) -> Result<Domain> {
    let mut domains = domains.into_iter();
    let first = domains.next().ok_or_else(|| IsobarError::invalid("domains", "cannot take the union of no domains"))?;
    let mut combined = domains.fold(first, |acc, domain| acc + domain);
    if let Some(name) = name {
        combined.names = vec![name.to_string()];
    }
    Ok(combined)
}

/// [`union`] of named domains, e.g. `["Norway", "Sweden", "Finland"]`.
pub fn union_names(names: &[&str], name: Option<&str>) -> Result<Domain> {
    let domains = names
        .iter()
        .map(|name| Domain::from_string(name, None))
        .collect::<Result<Vec<_>>>()?;
    union(domains, name)
}

/// A regular grid cut down to a domain.
#[derive(Debug, Clone, PartialEq)]
pub struct GridSubset {
    pub longitudes: Vec<f64>,
    pub latitudes: Vec<f64>,
    /// Latitude by longitude
    pub values: Array2<f32>,
}

/// A region to map, with the projection to draw it in.
#[derive(Debug, Clone)]
pub struct Domain {
    names: Vec<String>,
    bbox: Option<BoundingBox>,
    crs: Crs,
}

impl Domain {
    /// A domain covering `bounds`, given in the coordinates of `crs`.
    pub fn new(bounds: [f64; 4], crs: Crs) -> Self {
        Self {
            names: Vec::new(),
            bbox: Some(BoundingBox::from_array(bounds, crs)),
            crs,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.names = vec![name.into()];
        self
    }

    pub fn with_names<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Resolve a domain name such as "France" or "UK".
    ///
    /// Plain bounding-box records are drawn in the projection chosen by
    /// [`super::CrsOptimiser`] unless `crs` is given. Unknown names give a
    /// global Plate Carrée domain that keeps the requested name.
    pub fn from_string(name: &str, crs: Option<Crs>) -> Result<Self> {
        let Some(record) = lookup(name)? else {
            warn!(domain = name, "Unknown domain; falling back to a global map");
            return Ok(Self::new(GLOBAL_BOUNDS, Crs::default()).with_name(name));
        };

        let bbox = match (crs, record.crs) {
            (Some(target), source) => BoundingBox::from_bbox(record.bounds, source, Some(target))?,
            (None, Some(source)) => BoundingBox::from_array(record.bounds, source),
            (None, None) => BoundingBox::from_bbox(record.bounds, None, None)?,
        };
        debug!(domain = %record.name, crs = %bbox.crs, "Resolved named domain");

        Ok(Self {
            names: vec![record.name],
            crs: bbox.crs,
            bbox: Some(bbox),
        })
    }

    /// A domain from a `[west, east, south, north]` box, projected the way
    /// [`BoundingBox::from_bbox`] chooses.
    pub fn from_bbox(bbox: [f64; 4], name: Option<&str>) -> Result<Self> {
        let bbox = BoundingBox::from_bbox(bbox, None, None)?;
        Ok(Self {
            names: name.map(|n| vec![n.to_string()]).unwrap_or_default(),
            crs: bbox.crs,
            bbox: Some(bbox),
        })
    }

    /// Interpret user input: a "west,east,south,north" string or a name.
    pub fn parse(text: &str) -> Result<Self> {
        match super::parse_bbox(text) {
            Ok(bbox) => Self::from_bbox(bbox, None),
            Err(_) => Self::from_string(text, None),
        }
    }

    /// A domain fitting the field's own grid: Plate Carrée centred on its
    /// middle longitude, with the extent left open.
    pub fn from_data(field: &GriddedField) -> Self {
        let lons = field.longitudes();
        let central_longitude = lons.get(lons.len() / 2).copied().unwrap_or(0.0);
        Self {
            names: Vec::new(),
            bbox: None,
            crs: Crs::plate_carree(central_longitude),
        }
    }

    /// The name, with several names joined as "a, b and c".
    pub fn name(&self) -> Option<String> {
        match self.names.as_slice() {
            [] => None,
            [single] => Some(single.clone()),
            names => Some(list_to_human(names)),
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn crs(&self) -> Crs {
        self.crs
    }

    pub fn bbox(&self) -> Option<&BoundingBox> {
        self.bbox.as_ref()
    }

    /// The name, or the bounds as e.g. "-180°W, 180°E, 0°, 90°N".
    pub fn title(&self) -> String {
        if let Some(name) = self.name() {
            return name;
        }
        let Some(bbox) = self.bbox else {
            return self.crs.name();
        };
        let latlon = bbox.to_latlon_bbox().unwrap_or(bbox);
        latlon
            .iter()
            .zip(['W', 'E', 'S', 'N'])
            .map(|(value, ordinal)| {
                if value == 0.0 {
                    format!("{}°", format_significant(value))
                } else {
                    format!("{}°{}", format_significant(value), ordinal)
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Whether the domain has a full extent.
    pub fn is_complete(&self) -> bool {
        self.bbox.is_some()
    }

    /// Whether data can be cropped to a lat/lon box for this domain.
    pub fn can_bbox(&self) -> bool {
        !matches!(
            self.crs,
            Crs::NorthPolarStereo { .. } | Crs::SouthPolarStereo { .. } | Crs::TransverseMercator { .. }
        )
    }

    /// Crop a regular lat/lon grid to this domain, with one cell of context
    /// on each side.
    ///
    /// Longitudes are rolled into the convention of the domain (-180..180 or
    /// 0..360), so a 0..360 grid can be cut to Europe and a -180..180 grid to
    /// the Pacific. Domains that cannot be boxed, and crops that would leave
    /// nothing, return the grid unchanged.
    pub fn extract(
        &self,
        longitudes: &[f64],
        latitudes: &[f64],
        values: ArrayView2<f32>,
    ) -> Result<GridSubset> {
        if values.dim() != (latitudes.len(), longitudes.len()) {
            return Err(IsobarError::Data {
                message: format!(
                    "grid of shape {:?} does not match {} latitudes by {} longitudes",
                    values.dim(),
                    latitudes.len(),
                    longitudes.len()
                ),
            });
        }

        let whole = || GridSubset {
            longitudes: longitudes.to_vec(),
            latitudes: latitudes.to_vec(),
            values: values.to_owned(),
        };

        let Some(bbox) = self.bbox else {
            return Ok(whole());
        };
        if !self.can_bbox() || longitudes.is_empty() || latitudes.is_empty() {
            return Ok(whole());
        }

        let [west, east, south, north] = bbox.to_latlon_bbox()?.to_array();
        let east = if east < west { east + 360.0 } else { east };

        let shifted: Vec<f64> = longitudes
            .iter()
            .map(|&lon| {
                if west >= 0.0 && east <= 360.0 {
                    force_0_to_360(lon)
                } else if west >= -180.0 && east <= 180.0 {
                    force_minus_180_to_180(lon)
                } else {
                    west + (lon - west).rem_euclid(360.0)
                }
            })
            .collect();

        let mut order: Vec<usize> = (0..shifted.len()).collect();
        order.sort_by(|&a, &b| shifted[a].total_cmp(&shifted[b]));

        let step_x = resolution(order.iter().map(|&i| shifted[i]));
        let step_y = resolution(latitudes.iter().copied());

        let columns: Vec<usize> = order
            .into_iter()
            .filter(|&i| (west - step_x..=east + step_x).contains(&shifted[i]))
            .collect();
        let rows: Vec<usize> = (0..latitudes.len())
            .filter(|&j| (south - step_y..=north + step_y).contains(&latitudes[j]))
            .collect();

        if columns.is_empty() || rows.is_empty() {
            warn!(
                domain = %self.title(),
                "No grid points fall inside the domain; keeping the full grid"
            );
            return Ok(whole());
        }

        Ok(GridSubset {
            longitudes: columns.iter().map(|&i| shifted[i]).collect(),
            latitudes: rows.iter().map(|&j| latitudes[j]).collect(),
            values: values.select(Axis(0), &rows).select(Axis(1), &columns),
        })
    }
}

impl PartialEq for Domain {
    fn eq(&self, other: &Self) -> bool {
        self.bbox == other.bbox && self.crs == other.crs
    }
}

impl Add for Domain {
    type Output = Domain;

    fn add(self, other: Domain) -> Domain {
        let mut names = self.names;
        names.extend(other.names);
        let bbox = match (self.bbox, other.bbox) {
            (Some(a), Some(b)) => Some(a + b),
            (a, b) => a.or(b),
        };
        Domain {
            names,
            crs: bbox.map(|b| b.crs).unwrap_or(self.crs),
            bbox,
        }
    }
}

/// Spacing between neighbouring coordinates, assuming a regular axis.
fn resolution(values: impl Iterator<Item = f64>) -> f64 {
    let (count, min, max) = values.fold((0usize, f64::INFINITY, f64::NEG_INFINITY), |(n, lo, hi), v| {
        (n + 1, lo.min(v), hi.max(v))
    });
    if count < 2 {
        0.0
    } else {
        (max - min) / (count - 1) as f64
    }
}

/// Format with up to five significant figures, dropping trailing zeros.
fn format_significant(value: f64) -> String {
    if value == 0.0 || !value.is_finite() {
        return format!("{}", value);
    }
    let magnitude = value.abs().log10().floor() as i32;
    let decimals = (4 - magnitude).max(0) as usize;
    let text = format!("{:.*}", decimals, value);
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn test_format_name() {
        assert_eq!(format_name("UK").unwrap().as_deref(), Some("United Kingdom"));
        assert_eq!(format_name("united_kingdom").unwrap().as_deref(), Some("United Kingdom"));
        assert_eq!(format_name("FRANCE").unwrap().as_deref(), Some("France"));
        assert_eq!(format_name("Atlantis").unwrap(), None);
    }

    #[test]
    fn test_lookup_france() {
        let record = lookup("France").unwrap().unwrap();
        assert_eq!(record.name, "France");
        assert_eq!(record.bounds, [-5.5, 10.0, 41.0, 51.5]);
        assert_eq!(record.crs, None);
    }

    #[test]
    fn test_lookup_projected_record() {
        let record = lookup("Arctic").unwrap().unwrap();
        assert_eq!(record.crs, Some(Crs::NorthPolarStereo { central_longitude: 0.0 }));
        assert_eq!(record.bounds, [-3.5e6, 3.5e6, -3.5e6, 3.5e6]);
    }

    #[test]
    fn test_from_string_named() {
        let domain = Domain::from_string("France", None).unwrap();
        assert_eq!(domain.name().as_deref(), Some("France"));
        assert!(domain.is_complete());
        assert!(matches!(domain.crs(), Crs::AlbersEqualArea { .. }));
    }

    #[test]
    fn test_from_string_with_crs() {
        let domain = Domain::from_string("France", Some(Crs::default())).unwrap();
        let bbox = domain.bbox().unwrap();
        assert_eq!(bbox.to_array(), [-5.5, 10.0, 41.0, 51.5]);
    }

    #[test]
    fn test_from_string_projected() {
        let domain = Domain::from_string("north pole", None).unwrap();
        assert_eq!(domain.name().as_deref(), Some("Arctic"));
        assert!(!domain.can_bbox());
        assert_eq!(domain.bbox().unwrap().x_max, 3.5e6);
    }

    #[test]
    fn test_from_string_unknown_falls_back_to_global() {
        let domain = Domain::from_string("Atlantis", None).unwrap();
        assert_eq!(domain.name().as_deref(), Some("Atlantis"));
        assert_eq!(domain.crs(), Crs::plate_carree(0.0));
        assert_eq!(domain.bbox().unwrap().to_array(), GLOBAL_BOUNDS);
    }

    #[test]
    fn test_from_bbox() {
        let domain = Domain::from_bbox([-10.0, 20.0, -10.0, 20.0], None).unwrap();
        let bounds = domain.bbox().unwrap().to_array();
        for (actual, expected) in bounds.iter().zip([-15.0, 15.0, -10.0, 20.0]) {
            assert!((actual - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn test_parse_accepts_bbox_or_name() {
        assert_eq!(
            Domain::parse("-10,20,-10,20").unwrap().crs(),
            Crs::plate_carree(5.0)
        );
        assert_eq!(Domain::parse("uk").unwrap().name().as_deref(), Some("United Kingdom"));
    }

    #[test]
    fn test_name_multiple() {
        let domain = Domain::new(GLOBAL_BOUNDS, Crs::default()).with_names(["foo", "bar", "baz"]);
        assert_eq!(domain.name().as_deref(), Some("foo, bar and baz"));
    }

    #[test]
    fn test_title() {
        let named = Domain::new(GLOBAL_BOUNDS, Crs::default()).with_name("foo");
        assert_eq!(named.title(), "foo");

        let unnamed = Domain::new(GLOBAL_BOUNDS, Crs::default());
        assert_eq!(unnamed.title(), "-180°W, 180°E, -90°S, 90°N");

        let zero = Domain::new([-180.0, 180.0, 0.0, 90.0], Crs::default());
        assert_eq!(zero.title(), "-180°W, 180°E, 0°, 90°N");
    }

    #[test]
    fn test_format_significant() {
        assert_eq!(format_significant(-180.0), "-180");
        assert_eq!(format_significant(7.5), "7.5");
        assert_eq!(format_significant(12.345678), "12.346");
    }

    #[test]
    fn test_union() {
        let domain = union_names(&["UK", "France"], None).unwrap();
        assert_eq!(domain.name().as_deref(), Some("United Kingdom and France"));

        let uk = Domain::from_string("UK", None).unwrap();
        assert_eq!(domain.crs(), uk.crs());
        let combined = domain.bbox().unwrap();
        let uk_box = uk.bbox().unwrap();
        assert!(combined.x_min <= uk_box.x_min && combined.y_min < uk_box.y_min);

        let renamed = union_names(&["Norway", "Sweden", "Finland"], Some("Fennoscandia")).unwrap();
        assert_eq!(renamed.name().as_deref(), Some("Fennoscandia"));
    }

    #[test]
    fn test_union_of_nothing_fails() {
        assert!(union(Vec::new(), None).is_err());
    }

    #[test]
    fn test_can_bbox() {
        assert!(Domain::new(GLOBAL_BOUNDS, Crs::default()).can_bbox());
        assert!(!Domain::new(GLOBAL_BOUNDS, Crs::transverse_mercator(0.0, 0.0)).can_bbox());
    }

    #[test]
    fn test_extract_rolls_0_360_grid() {
        let lons: Vec<f64> = (0..36).map(|i| i as f64 * 10.0).collect();
        let lats: Vec<f64> = (0..19).map(|j| 90.0 - j as f64 * 10.0).collect();
        let values = Array2::from_shape_fn((19, 36), |(_, i)| i as f32);

        let domain = Domain::new([-30.0, 30.0, 20.0, 40.0], Crs::default());
        let subset = domain.extract(&lons, &lats, values.view()).unwrap();

        assert_eq!(
            subset.longitudes,
            vec![-40.0, -30.0, -20.0, -10.0, 0.0, 10.0, 20.0, 30.0, 40.0]
        );
        assert_eq!(subset.latitudes, vec![50.0, 40.0, 30.0, 20.0, 10.0]);
        assert_eq!(subset.values.dim(), (5, 9));
        assert_eq!(subset.values[[0, 0]], 32.0);
        assert_eq!(subset.values[[0, 4]], 0.0);
    }

    #[test]
    fn test_extract_crossing_dateline() {
        let lons: Vec<f64> = (0..36).map(|i| -180.0 + i as f64 * 10.0).collect();
        let lats = vec![10.0, 0.0, -10.0];
        let values = Array2::from_shape_fn((3, 36), |(_, i)| i as f32);

        let domain = Domain::new([150.0, 210.0, -10.0, 10.0], Crs::default());
        let subset = domain.extract(&lons, &lats, values.view()).unwrap();

        assert_eq!(subset.longitudes.first(), Some(&140.0));
        assert_eq!(subset.longitudes.last(), Some(&220.0));
        assert!(subset.longitudes.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_extract_shape_mismatch() {
        let values = Array2::<f32>::zeros((2, 3));
        let domain = Domain::new(GLOBAL_BOUNDS, Crs::default());
        assert!(domain.extract(&[0.0, 1.0], &[0.0, 1.0], values.view()).is_err());
    }
}

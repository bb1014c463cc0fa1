//! Coordinate reference systems.
//!
//! A small set of map projections on a spherical earth. Plate Carrée works
//! in degrees (like cartopy's); the others work in metres.

use serde_json::Value;
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};
use std::fmt;
use std::str::FromStr;

use crate::error::{IsobarError, Result};
use crate::utils::split_camel_case;

/// Mean earth radius in metres
pub const EARTH_RADIUS: f64 = 6_371_008.8;

const DEG_TO_RAD: f64 = PI / 180.0;
const RAD_TO_DEG: f64 = 180.0 / PI;

/// Latitude limit used by the Mercator projection
const MERCATOR_MAX_LAT: f64 = 85.0;

/// A map projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Crs {
    PlateCarree {
        central_longitude: f64,
    },
    AlbersEqualArea {
        central_longitude: f64,
        central_latitude: f64,
        standard_parallels: (f64, f64),
    },
    LambertAzimuthalEqualArea {
        central_longitude: f64,
        central_latitude: f64,
        false_easting: f64,
        false_northing: f64,
    },
    TransverseMercator {
        central_longitude: f64,
        central_latitude: f64,
        scale_factor: f64,
        false_easting: f64,
        false_northing: f64,
    },
    Mercator {
        central_longitude: f64,
    },
    NorthPolarStereo {
        central_longitude: f64,
    },
    SouthPolarStereo {
        central_longitude: f64,
    },
}

impl Default for Crs {
    fn default() -> Self {
        Crs::plate_carree(0.0)
    }
}

impl Crs {
    pub fn plate_carree(central_longitude: f64) -> Self {
        Crs::PlateCarree { central_longitude }
    }

    pub fn albers(central_longitude: f64, central_latitude: f64, standard_parallels: (f64, f64)) -> Self {
        Crs::AlbersEqualArea {
            central_longitude,
            central_latitude,
            standard_parallels,
        }
    }

    pub fn lambert_azimuthal(central_longitude: f64, central_latitude: f64) -> Self {
        Crs::LambertAzimuthalEqualArea {
            central_longitude,
            central_latitude,
            false_easting: 0.0,
            false_northing: 0.0,
        }
    }

    pub fn transverse_mercator(central_longitude: f64, central_latitude: f64) -> Self {
        Crs::TransverseMercator {
            central_longitude,
            central_latitude,
            scale_factor: 1.0,
            false_easting: 0.0,
            false_northing: 0.0,
        }
    }

    /// The Ordnance Survey national grid of Great Britain.
    pub fn osgb() -> Self {
        Crs::TransverseMercator {
            central_longitude: -2.0,
            central_latitude: 49.0,
            scale_factor: 0.999_601_271_7,
            false_easting: 400_000.0,
            false_northing: -100_000.0,
        }
    }

    /// The class-style name of the projection, e.g. `"AlbersEqualArea"`.
    pub fn class_name(&self) -> &'static str {
        match self {
            Crs::PlateCarree { .. } => "PlateCarree",
            Crs::AlbersEqualArea { .. } => "AlbersEqualArea",
            Crs::LambertAzimuthalEqualArea { .. } => "LambertAzimuthalEqualArea",
            Crs::TransverseMercator { .. } => "TransverseMercator",
            Crs::Mercator { .. } => "Mercator",
            Crs::NorthPolarStereo { .. } => "NorthPolarStereo",
            Crs::SouthPolarStereo { .. } => "SouthPolarStereo",
        }
    }

    /// A human-readable name, e.g. `"Albers Equal Area"`.
    pub fn name(&self) -> String {
        split_camel_case(self.class_name()).join(" ")
    }

    pub fn central_longitude(&self) -> f64 {
        match *self {
            Crs::PlateCarree { central_longitude }
            | Crs::AlbersEqualArea { central_longitude, .. }
            | Crs::LambertAzimuthalEqualArea { central_longitude, .. }
            | Crs::TransverseMercator { central_longitude, .. }
            | Crs::Mercator { central_longitude }
            | Crs::NorthPolarStereo { central_longitude }
            | Crs::SouthPolarStereo { central_longitude } => central_longitude,
        }
    }

    /// Whether meridians and parallels are straight, perpendicular lines.
    pub fn is_cylindrical(&self) -> bool {
        matches!(self, Crs::PlateCarree { .. } | Crs::Mercator { .. })
    }

    /// Whether projected coordinates are degrees rather than metres.
    pub fn is_geographic(&self) -> bool {
        matches!(self, Crs::PlateCarree { .. })
    }

    /// The projected extent of the whole globe, where finite.
    pub fn global_extent(&self) -> Option<[f64; 4]> {
        match self {
            Crs::PlateCarree { .. } => Some([-180.0, 180.0, -90.0, 90.0]),
            Crs::Mercator { .. } => {
                let (x, y) = self.forward(180.0 + self.central_longitude() - 1e-9, MERCATOR_MAX_LAT)?;
                Some([-x, x, -y, y])
            }
            _ => None,
        }
    }

    /// Project a longitude/latitude pair (degrees). Returns `None` for points
    /// the projection cannot represent.
    pub fn forward(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        if !lon.is_finite() || !lat.is_finite() || lat.abs() > 90.0 + 1e-9 {
            return None;
        }
        let lat = lat.clamp(-90.0, 90.0);

        match *self {
            Crs::PlateCarree { central_longitude } => {
                Some((wrap_degrees(lon - central_longitude), lat))
            }
            Crs::Mercator { central_longitude } => {
                let phi = lat.clamp(-MERCATOR_MAX_LAT, MERCATOR_MAX_LAT) * DEG_TO_RAD;
                let lambda = wrap_degrees(lon - central_longitude) * DEG_TO_RAD;
                Some((
                    EARTH_RADIUS * lambda,
                    EARTH_RADIUS * (FRAC_PI_4 + phi / 2.0).tan().ln(),
                ))
            }
            Crs::AlbersEqualArea {
                central_longitude,
                central_latitude,
                standard_parallels,
            } => {
                let albers = AlbersParams::new(central_latitude, standard_parallels);
                let theta = albers.n * wrap_degrees(lon - central_longitude) * DEG_TO_RAD;
                let rho = albers.rho(lat * DEG_TO_RAD)?;
                Some((rho * theta.sin(), albers.rho0 - rho * theta.cos()))
            }
            Crs::LambertAzimuthalEqualArea {
                central_longitude,
                central_latitude,
                false_easting,
                false_northing,
            } => {
                let phi = lat * DEG_TO_RAD;
                let phi0 = central_latitude * DEG_TO_RAD;
                let dlambda = wrap_degrees(lon - central_longitude) * DEG_TO_RAD;
                let denom = 1.0 + phi0.sin() * phi.sin() + phi0.cos() * phi.cos() * dlambda.cos();
                if denom <= 1e-12 {
                    // Antipode of the centre
                    return None;
                }
                let k = (2.0 / denom).sqrt();
                Some((
                    EARTH_RADIUS * k * phi.cos() * dlambda.sin() + false_easting,
                    EARTH_RADIUS * k * (phi0.cos() * phi.sin() - phi0.sin() * phi.cos() * dlambda.cos())
                        + false_northing,
                ))
            }
            Crs::TransverseMercator {
                central_longitude,
                central_latitude,
                scale_factor,
                false_easting,
                false_northing,
            } => {
                let phi = lat * DEG_TO_RAD;
                let dlambda = wrap_degrees(lon - central_longitude) * DEG_TO_RAD;
                let b = phi.cos() * dlambda.sin();
                if b.abs() >= 1.0 - 1e-12 {
                    return None;
                }
                let k0r = scale_factor * EARTH_RADIUS;
                let x = k0r * b.atanh();
                let y = k0r * (phi.tan().atan2(dlambda.cos()) - central_latitude * DEG_TO_RAD);
                let y = if phi.abs() >= FRAC_PI_2 - 1e-12 {
                    k0r * (phi.signum() * FRAC_PI_2 - central_latitude * DEG_TO_RAD)
                } else {
                    y
                };
                Some((x + false_easting, y + false_northing))
            }
            Crs::NorthPolarStereo { central_longitude } => {
                if lat <= -89.999 {
                    return None;
                }
                let rho = 2.0 * EARTH_RADIUS * (FRAC_PI_4 - lat * DEG_TO_RAD / 2.0).tan();
                let dlambda = (lon - central_longitude) * DEG_TO_RAD;
                Some((rho * dlambda.sin(), -rho * dlambda.cos()))
            }
            Crs::SouthPolarStereo { central_longitude } => {
                if lat >= 89.999 {
                    return None;
                }
                let rho = 2.0 * EARTH_RADIUS * (FRAC_PI_4 + lat * DEG_TO_RAD / 2.0).tan();
                let dlambda = (lon - central_longitude) * DEG_TO_RAD;
                Some((rho * dlambda.sin(), rho * dlambda.cos()))
            }
        }
    }

    /// Like [`Crs::forward`], but cylindrical projections leave x unwrapped so
    /// a run of increasing longitudes stays increasing across the dateline.
    pub(crate) fn forward_unwrapped(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        let (_, y) = self.forward(lon, lat)?;
        match *self {
            Crs::PlateCarree { central_longitude } => Some((lon - central_longitude, y)),
            Crs::Mercator { central_longitude } => {
                Some((EARTH_RADIUS * (lon - central_longitude) * DEG_TO_RAD, y))
            }
            _ => self.forward(lon, lat),
        }
    }

    /// The x distance covering one full turn of longitude, for cylindrical
    /// projections.
    pub(crate) fn x_period(&self) -> Option<f64> {
        match self {
            Crs::PlateCarree { .. } => Some(360.0),
            Crs::Mercator { .. } => Some(2.0 * PI * EARTH_RADIUS),
            _ => None,
        }
    }

    /// Recover longitude/latitude (degrees) from projected coordinates.
    pub fn inverse(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        if !x.is_finite() || !y.is_finite() {
            return None;
        }

        let (lon, lat) = match *self {
            Crs::PlateCarree { central_longitude } => {
                if y.abs() > 90.0 + 1e-9 {
                    return None;
                }
                (x + central_longitude, y.clamp(-90.0, 90.0))
            }
            Crs::Mercator { central_longitude } => (
                x / EARTH_RADIUS * RAD_TO_DEG + central_longitude,
                (2.0 * (y / EARTH_RADIUS).exp().atan() - FRAC_PI_2) * RAD_TO_DEG,
            ),
            Crs::AlbersEqualArea {
                central_longitude,
                central_latitude,
                standard_parallels,
            } => {
                let albers = AlbersParams::new(central_latitude, standard_parallels);
                let (x, dy) = if albers.n < 0.0 {
                    (-x, -(albers.rho0 - y))
                } else {
                    (x, albers.rho0 - y)
                };
                let rho = (x * x + dy * dy).sqrt();
                let theta = x.atan2(dy);
                let sin_phi = (albers.c - (rho * albers.n / EARTH_RADIUS).powi(2)) / (2.0 * albers.n);
                if sin_phi.abs() > 1.0 + 1e-9 {
                    return None;
                }
                (
                    central_longitude + theta / albers.n * RAD_TO_DEG,
                    sin_phi.clamp(-1.0, 1.0).asin() * RAD_TO_DEG,
                )
            }
            Crs::LambertAzimuthalEqualArea {
                central_longitude,
                central_latitude,
                false_easting,
                false_northing,
            } => {
                let x = x - false_easting;
                let y = y - false_northing;
                let phi0 = central_latitude * DEG_TO_RAD;
                let rho = (x * x + y * y).sqrt();
                if rho < 1e-9 {
                    return Some((central_longitude, central_latitude));
                }
                if rho > 2.0 * EARTH_RADIUS {
                    return None;
                }
                let c = 2.0 * (rho / (2.0 * EARTH_RADIUS)).asin();
                let lat = (c.cos() * phi0.sin() + y * c.sin() * phi0.cos() / rho)
                    .clamp(-1.0, 1.0)
                    .asin();
                let lon = (x * c.sin()).atan2(rho * phi0.cos() * c.cos() - y * phi0.sin() * c.sin());
                (
                    central_longitude + lon * RAD_TO_DEG,
                    lat * RAD_TO_DEG,
                )
            }
            Crs::TransverseMercator {
                central_longitude,
                central_latitude,
                scale_factor,
                false_easting,
                false_northing,
            } => {
                let k0r = scale_factor * EARTH_RADIUS;
                let xr = (x - false_easting) / k0r;
                let d = (y - false_northing) / k0r + central_latitude * DEG_TO_RAD;
                let lat = (d.sin() / xr.cosh()).clamp(-1.0, 1.0).asin();
                let lon = xr.sinh().atan2(d.cos());
                (central_longitude + lon * RAD_TO_DEG, lat * RAD_TO_DEG)
            }
            Crs::NorthPolarStereo { central_longitude } => {
                let rho = (x * x + y * y).sqrt();
                let lat = FRAC_PI_2 - 2.0 * (rho / (2.0 * EARTH_RADIUS)).atan();
                (central_longitude + x.atan2(-y) * RAD_TO_DEG, lat * RAD_TO_DEG)
            }
            Crs::SouthPolarStereo { central_longitude } => {
                let rho = (x * x + y * y).sqrt();
                let lat = -FRAC_PI_2 + 2.0 * (rho / (2.0 * EARTH_RADIUS)).atan();
                (central_longitude + x.atan2(y) * RAD_TO_DEG, lat * RAD_TO_DEG)
            }
        };

        Some((wrap_degrees(lon), lat))
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Crs {
    type Err = IsobarError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        string_to_crs(s)
    }
}

/// Derived constants of an Albers projection.
struct AlbersParams {
    n: f64,
    c: f64,
    rho0: f64,
}

impl AlbersParams {
    fn new(central_latitude: f64, (lat1, lat2): (f64, f64)) -> Self {
        let phi1 = lat1 * DEG_TO_RAD;
        let phi2 = lat2 * DEG_TO_RAD;
        let mut n = (phi1.sin() + phi2.sin()) / 2.0;
        if n.abs() < 1e-9 {
            // Parallels symmetric about the equator
            n = 1e-9_f64.copysign(n);
        }
        let c = phi1.cos().powi(2) + 2.0 * n * phi1.sin();
        let rho0 = EARTH_RADIUS * (c - 2.0 * n * (central_latitude * DEG_TO_RAD).sin()).max(0.0).sqrt() / n;
        Self { n, c, rho0 }
    }

    fn rho(&self, phi: f64) -> Option<f64> {
        let inner = self.c - 2.0 * self.n * phi.sin();
        if inner < 0.0 {
            return None;
        }
        Some(EARTH_RADIUS * inner.sqrt() / self.n)
    }
}

/// Wrap an angle in degrees to [-180, 180], keeping +180 as is.
fn wrap_degrees(value: f64) -> f64 {
    if (-180.0..=180.0).contains(&value) {
        value
    } else {
        (value + 180.0).rem_euclid(360.0) - 180.0
    }
}

/// Build a CRS from its name, e.g. `"LambertAzimuthalEqualArea"` or
/// `"EPSG:4326"`. Matching ignores case, spaces and underscores.
pub fn string_to_crs(name: &str) -> Result<Crs> {
    let key: String = name
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .collect::<String>()
        .to_lowercase();

    let crs = match key.as_str() {
        "platecarree" | "epsg:4326" | "latlon" | "equirectangular" => Crs::plate_carree(0.0),
        "albersequalarea" | "albers" => Crs::albers(0.0, 0.0, (20.0, 50.0)),
        "lambertazimuthalequalarea" | "laea" => Crs::lambert_azimuthal(0.0, 0.0),
        "transversemercator" => Crs::transverse_mercator(0.0, 0.0),
        "mercator" | "epsg:3857" => Crs::Mercator {
            central_longitude: 0.0,
        },
        "northpolarstereo" => Crs::NorthPolarStereo {
            central_longitude: 0.0,
        },
        "southpolarstereo" => Crs::SouthPolarStereo {
            central_longitude: 0.0,
        },
        "osgb" | "epsg:27700" => Crs::osgb(),
        _ => {
            return Err(IsobarError::Projection {
                message: format!("unsupported coordinate reference system '{}'", name),
            })
        }
    };
    Ok(crs)
}

/// Build a CRS from a mapping such as
/// `{"name": "PlateCarree", "central_longitude": 50}`.
pub fn dict_to_crs(spec: &Value) -> Result<Crs> {
    let name = spec
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| IsobarError::Projection {
            message: "CRS mapping needs a 'name'".to_string(),
        })?;
    let mut crs = string_to_crs(name)?;
    let num = |key: &str| spec.get(key).and_then(Value::as_f64);

    match &mut crs {
        Crs::PlateCarree { central_longitude }
        | Crs::Mercator { central_longitude }
        | Crs::NorthPolarStereo { central_longitude }
        | Crs::SouthPolarStereo { central_longitude } => {
            *central_longitude = num("central_longitude").unwrap_or(*central_longitude);
        }
        Crs::AlbersEqualArea {
            central_longitude,
            central_latitude,
            standard_parallels,
        } => {
            *central_longitude = num("central_longitude").unwrap_or(*central_longitude);
            *central_latitude = num("central_latitude").unwrap_or(*central_latitude);
            if let Some(Value::Array(parallels)) = spec.get("standard_parallels") {
                if let [Some(a), Some(b)] = [
                    parallels.first().and_then(Value::as_f64),
                    parallels.get(1).and_then(Value::as_f64),
                ] {
                    *standard_parallels = (a, b);
                }
            }
        }
        Crs::LambertAzimuthalEqualArea {
            central_longitude,
            central_latitude,
            false_easting,
            false_northing,
        } => {
            *central_longitude = num("central_longitude").unwrap_or(*central_longitude);
            *central_latitude = num("central_latitude").unwrap_or(*central_latitude);
            *false_easting = num("false_easting").unwrap_or(*false_easting);
            *false_northing = num("false_northing").unwrap_or(*false_northing);
        }
        Crs::TransverseMercator {
            central_longitude,
            central_latitude,
            scale_factor,
            false_easting,
            false_northing,
        } => {
            *central_longitude = num("central_longitude").unwrap_or(*central_longitude);
            *central_latitude = num("central_latitude").unwrap_or(*central_latitude);
            *scale_factor = num("scale_factor").unwrap_or(*scale_factor);
            *false_easting = num("false_easting").unwrap_or(*false_easting);
            *false_northing = num("false_northing").unwrap_or(*false_northing);
        }
    }
    Ok(crs)
}

/// Interpret an optional CRS description; nothing means Plate Carrée.
pub fn parse_crs(spec: Option<&Value>) -> Result<Crs> {
    match spec {
        None | Some(Value::Null) => Ok(Crs::default()),
        Some(Value::String(name)) => string_to_crs(name),
        Some(map @ Value::Object(_)) => dict_to_crs(map),
        Some(other) => Err(IsobarError::Projection {
            message: format!("cannot interpret {} as a CRS", other),
        }),
    }
}

/// The schema's default CRS.
pub fn default_crs() -> Crs {
    crate::schema::with_schema(|schema| parse_crs(schema.raw("default_crs")))
        .unwrap_or_default()
}

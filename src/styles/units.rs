//! Conversions between the handful of units that weather styles care about.

use crate::error::{IsobarError, Result};

/// A recognised physical unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Kelvin,
    Celsius,
    Fahrenheit,
    Pascal,
    Hectopascal,
    MetresPerSecond,
    KilometresPerHour,
    Knots,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dimension {
    Temperature,
    Pressure,
    Speed,
}

impl Unit {
    /// Recognise a unit string, as written in CF metadata or by hand.
    pub fn parse(text: &str) -> Option<Self> {
        let key: String = text
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        let unit = match key.as_str() {
            "k" | "kelvin" | "kelvins" => Unit::Kelvin,
            "degc" | "°c" | "c" | "celsius" | "deg_c" | "degreesc" | "degrees_celsius" => Unit::Celsius,
            "degf" | "°f" | "f" | "fahrenheit" | "deg_f" | "degreesf" | "degrees_fahrenheit" => {
                Unit::Fahrenheit
            }
            "pa" | "pascal" | "pascals" => Unit::Pascal,
            "hpa" | "mbar" | "mb" | "millibar" | "millibars" | "hectopascal" => Unit::Hectopascal,
            "m/s" | "ms**-1" | "ms-1" | "ms^-1" | "m.s-1" | "metrespersecond" => Unit::MetresPerSecond,
            "km/h" | "kmh**-1" | "kmh-1" | "kph" | "kmph" => Unit::KilometresPerHour,
            "kt" | "kts" | "knot" | "knots" | "kn" => Unit::Knots,
            _ => return None,
        };
        Some(unit)
    }

    /// The label used in titles and legends.
    pub fn label(&self) -> &'static str {
        match self {
            Unit::Kelvin => "K",
            Unit::Celsius => "°C",
            Unit::Fahrenheit => "°F",
            Unit::Pascal => "Pa",
            Unit::Hectopascal => "hPa",
            Unit::MetresPerSecond => "m/s",
            Unit::KilometresPerHour => "km/h",
            Unit::Knots => "kt",
        }
    }

    fn dimension(&self) -> Dimension {
        match self {
            Unit::Kelvin | Unit::Celsius | Unit::Fahrenheit => Dimension::Temperature,
            Unit::Pascal | Unit::Hectopascal => Dimension::Pressure,
            Unit::MetresPerSecond | Unit::KilometresPerHour | Unit::Knots => Dimension::Speed,
        }
    }

    /// Into the SI base unit of the dimension.
    fn to_base(self, value: f64) -> f64 {
        match self {
            Unit::Kelvin | Unit::Pascal | Unit::MetresPerSecond => value,
            Unit::Celsius => value + 273.15,
            Unit::Fahrenheit => (value - 32.0) * 5.0 / 9.0 + 273.15,
            Unit::Hectopascal => value * 100.0,
            Unit::KilometresPerHour => value / 3.6,
            Unit::Knots => value * 1852.0 / 3600.0,
        }
    }

    fn from_base(self, value: f64) -> f64 {
        match self {
            Unit::Kelvin | Unit::Pascal | Unit::MetresPerSecond => value,
            Unit::Celsius => value - 273.15,
            Unit::Fahrenheit => (value - 273.15) * 9.0 / 5.0 + 32.0,
            Unit::Hectopascal => value / 100.0,
            Unit::KilometresPerHour => value * 3.6,
            Unit::Knots => value * 3600.0 / 1852.0,
        }
    }
}

/// A pretty label for a unit string; unknown units are returned unchanged.
pub fn format_units(units: &str) -> String {
    Unit::parse(units)
        .map(|u| u.label().to_string())
        .unwrap_or_else(|| units.to_string())
}

/// Whether two unit strings name the same unit.
pub fn are_equal(a: &str, b: &str) -> bool {
    match (Unit::parse(a), Unit::parse(b)) {
        (Some(a), Some(b)) => a == b,
        _ => a.trim() == b.trim(),
    }
}

/// Units whose differences convert without an offset (temperature
/// anomalies are equal in K and °C).
pub fn anomaly_equivalence(units: &str) -> bool {
    matches!(Unit::parse(units), Some(Unit::Kelvin) | Some(Unit::Celsius))
}

/// A converter from `source` to `target` units.
///
/// Identical strings convert trivially, even when unrecognised.
pub fn converter(source: &str, target: &str) -> Result<impl Fn(f64) -> f64> {
    let identity = source.trim() == target.trim();
    let units = match (Unit::parse(source), Unit::parse(target)) {
        (Some(s), Some(t)) if s.dimension() == t.dimension() => Some((s, t)),
        _ if identity => None,
        _ => {
            return Err(IsobarError::invalid(
                "units",
                format!("cannot convert from '{}' to '{}'", source, target),
            ))
        }
    };
    Ok(move |value: f64| match units {
        Some((s, t)) if s != t => t.from_base(s.to_base(value)),
        _ => value,
    })
}

/// Convert a single value.
pub fn convert(value: f64, source: &str, target: &str) -> Result<f64> {
    Ok(converter(source, target)?(value))
}

//! Gridded fields on a regular latitude/longitude grid.

use chrono::NaiveDateTime;
use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{IsobarError, Result};
use crate::geo::Domain;
use crate::identifiers::VARIABLE_NAME_PREFERENCE;

/// Possible attribute values attached to a field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AttributeValue {
    /// String attribute
    Text(String),
    /// Numeric attribute (stored as f64 for simplicity)
    Number(f64),
    /// Array of numbers
    NumberArray(Vec<f64>),
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Text(text) => write!(f, "{}", text),
            AttributeValue::Number(value) => write!(f, "{}", value),
            AttributeValue::NumberArray(values) => {
                let parts: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
        }
    }
}

/// A metadata value for use in titles and labels.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    Text(String),
    Number(f64),
    Time(NaiveDateTime),
    /// Lead times, in hours
    Hours(f64),
}

impl MetadataValue {
    /// Render the value, using `spec` as a strftime pattern for times or a
    /// precision such as `.1f` for numbers.
    pub fn format(&self, spec: Option<&str>) -> String {
        match (self, spec) {
            (MetadataValue::Time(time), Some(pattern)) => time.format(pattern).to_string(),
            (MetadataValue::Time(time), None) => time.format("%Y-%m-%d %H:%M").to_string(),
            (MetadataValue::Number(value) | MetadataValue::Hours(value), Some(spec)) => {
                match parse_precision(spec) {
                    Some(precision) => format!("{:.*}", precision, value),
                    None => value.to_string(),
                }
            }
            (MetadataValue::Number(value) | MetadataValue::Hours(value), None) => value.to_string(),
            (MetadataValue::Text(text), _) => text.clone(),
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(None))
    }
}

/// Parse a precision spec such as `.2f` or `.2`.
pub(crate) fn parse_precision(spec: &str) -> Option<usize> {
    spec.strip_prefix('.')
        .map(|rest| rest.trim_end_matches(|c: char| c.is_ascii_alphabetic()))
        .and_then(|digits| digits.parse().ok())
}

/// A variable on a regular lat/lon grid, possibly with several time steps.
///
/// Values are stored as `time x latitude x longitude`; a field without a time
/// axis has a single step.
#[derive(Debug, Clone, PartialEq)]
pub struct GriddedField {
    name: String,
    long_name: Option<String>,
    units: Option<String>,
    latitudes: Vec<f64>,
    longitudes: Vec<f64>,
    values: Array3<f32>,
    times: Vec<NaiveDateTime>,
    base_time: Option<NaiveDateTime>,
    attributes: BTreeMap<String, AttributeValue>,
}

impl GriddedField {
    /// A single 2-D field of `latitudes.len() x longitudes.len()` values.
    pub fn new(
        name: impl Into<String>,
        latitudes: Vec<f64>,
        longitudes: Vec<f64>,
        values: Array2<f32>,
    ) -> Result<Self> {
        Self::from_steps(name, latitudes, longitudes, values.insert_axis(Axis(0)))
    }

    /// A stack of time steps, `time x latitude x longitude`.
    pub fn from_steps(
        name: impl Into<String>,
        latitudes: Vec<f64>,
        longitudes: Vec<f64>,
        values: Array3<f32>,
    ) -> Result<Self> {
        let (steps, ny, nx) = values.dim();
        if ny != latitudes.len() || nx != longitudes.len() {
            return Err(IsobarError::Data {
                message: format!(
                    "values of shape {:?} do not match {} latitudes by {} longitudes",
                    values.shape(),
                    latitudes.len(),
                    longitudes.len()
                ),
            });
        }
        if steps == 0 {
            return Err(IsobarError::Data {
                message: "a field needs at least one time step".to_string(),
            });
        }

        Ok(Self {
            name: name.into(),
            long_name: None,
            units: None,
            latitudes,
            longitudes,
            values,
            times: Vec::new(),
            base_time: None,
            attributes: BTreeMap::new(),
        })
    }

    pub fn with_long_name(mut self, long_name: impl Into<String>) -> Self {
        self.long_name = Some(long_name.into());
        self
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }

    /// Attach a valid time to each step.
    pub fn with_times(mut self, times: Vec<NaiveDateTime>) -> Result<Self> {
        if times.len() != self.n_steps() {
            return Err(IsobarError::Data {
                message: format!(
                    "{} times given for a field with {} steps",
                    times.len(),
                    self.n_steps()
                ),
            });
        }
        self.times = times;
        Ok(self)
    }

    pub fn with_base_time(mut self, base_time: NaiveDateTime) -> Self {
        self.base_time = Some(base_time);
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: AttributeValue) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn long_name(&self) -> Option<&str> {
        self.long_name.as_deref()
    }

    pub fn units(&self) -> Option<&str> {
        self.units.as_deref()
    }

    pub fn latitudes(&self) -> &[f64] {
        &self.latitudes
    }

    pub fn longitudes(&self) -> &[f64] {
        &self.longitudes
    }

    pub fn times(&self) -> &[NaiveDateTime] {
        &self.times
    }

    pub fn base_time(&self) -> Option<NaiveDateTime> {
        self.base_time
    }

    pub fn attributes(&self) -> &BTreeMap<String, AttributeValue> {
        &self.attributes
    }

    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    pub fn n_steps(&self) -> usize {
        self.values.len_of(Axis(0))
    }

    /// `(latitudes, longitudes)`
    pub fn grid_shape(&self) -> (usize, usize) {
        (self.latitudes.len(), self.longitudes.len())
    }

    /// The values of time step `index`.
    pub fn step(&self, index: usize) -> Result<ArrayView2<'_, f32>> {
        if index >= self.n_steps() {
            return Err(IsobarError::invalid(
                "time_index",
                format!("step {} out of range for {} steps", index, self.n_steps()),
            ));
        }
        Ok(self.values.index_axis(Axis(0), index))
    }

    /// The values of the first step.
    pub fn values(&self) -> ArrayView2<'_, f32> {
        self.values.index_axis(Axis(0), 0)
    }

    pub fn all_values(&self) -> ArrayView3<'_, f32> {
        self.values.view()
    }

    /// A field holding only step `index`.
    pub fn select_step(&self, index: usize) -> Result<Self> {
        let values = self.step(index)?.to_owned().insert_axis(Axis(0));
        Ok(Self {
            values,
            times: self.times.get(index).map(|t| vec![*t]).unwrap_or_default(),
            ..self.clone()
        })
    }

    /// Minimum and maximum over all steps, ignoring NaN.
    pub fn value_range(&self) -> Option<(f32, f32)> {
        finite_range(self.values.iter().copied())
    }

    /// Crop every step to a domain.
    pub fn crop(&self, domain: &Domain) -> Result<Self> {
        let mut steps = Vec::with_capacity(self.n_steps());
        let mut grid = None;
        for step in self.values.outer_iter() {
            let subset = domain.extract(&self.longitudes, &self.latitudes, step)?;
            steps.push(subset.values.insert_axis(Axis(0)));
            grid = Some((subset.latitudes, subset.longitudes));
        }
        let Some((latitudes, longitudes)) = grid else {
            return Ok(self.clone());
        };
        let views: Vec<_> = steps.iter().map(|s| s.view()).collect();
        let values = ndarray::concatenate(Axis(0), &views).map_err(|e| IsobarError::Data {
            message: format!("could not stack cropped steps: {}", e),
        })?;
        Ok(Self {
            latitudes,
            longitudes,
            values,
            ..self.clone()
        })
    }

    /// Title metadata for the first step.
    pub fn metadata(&self, key: &str) -> Option<MetadataValue> {
        self.metadata_at(key, 0)
    }

    /// Title metadata for step `index`.
    ///
    /// Besides the field's own attributes this knows `variable_name`,
    /// `short_name`, `units`, `time`/`valid_time`, `base_time` and
    /// `lead_time` (hours from base to valid time).
    pub fn metadata_at(&self, key: &str, index: usize) -> Option<MetadataValue> {
        let valid_time = self.times.get(index).copied();
        match key {
            "variable_name" => Some(MetadataValue::Text(self.variable_name())),
            "short_name" | "name" => Some(MetadataValue::Text(self.name.clone())),
            "long_name" => self.long_name.clone().map(MetadataValue::Text),
            "units" => self.units.clone().map(MetadataValue::Text),
            "time" | "valid_time" => valid_time.map(MetadataValue::Time),
            "base_time" => self.base_time.or(self.times.first().copied()).map(MetadataValue::Time),
            "lead_time" => {
                let base = self.base_time.or(self.times.first().copied())?;
                let valid = valid_time?;
                Some(MetadataValue::Hours((valid - base).num_minutes() as f64 / 60.0))
            }
            _ => self.attributes.get(key).map(|value| match value {
                AttributeValue::Number(n) => MetadataValue::Number(*n),
                other => MetadataValue::Text(other.to_string()),
            }),
        }
    }

    /// The most descriptive name available.
    pub fn variable_name(&self) -> String {
        if let Some(long_name) = &self.long_name {
            return long_name.clone();
        }
        VARIABLE_NAME_PREFERENCE
            .iter()
            .find_map(|key| match self.attributes.get(*key) {
                Some(AttributeValue::Text(text)) => Some(text.clone()),
                _ => None,
            })
            .unwrap_or_else(|| self.name.clone())
    }
}

/// Minimum and maximum of the finite values.
pub(crate) fn finite_range(values: impl Iterator<Item = f32>) -> Option<(f32, f32)> {
    values
        .filter(|v| v.is_finite())
        .fold(None, |range, v| match range {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use ndarray::array;

    fn field() -> GriddedField {
        GriddedField::new(
            "t2m",
            vec![10.0, 0.0],
            vec![0.0, 10.0, 20.0],
            array![[1.0, 2.0, f32::NAN], [4.0, 5.0, 6.0]],
        )
        .unwrap()
    }

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_shape_checked() {
        let result = GriddedField::new("x", vec![0.0], vec![0.0, 1.0], Array2::zeros((2, 2)));
        assert!(matches!(result, Err(IsobarError::Data { .. })));
    }

    #[test]
    fn test_value_range_ignores_nan() {
        assert_eq!(field().value_range(), Some((1.0, 6.0)));
    }

    #[test]
    fn test_step_out_of_range() {
        assert!(field().step(0).is_ok());
        assert!(field().step(1).is_err());
    }

    #[test]
    fn test_variable_name_preference() {
        assert_eq!(field().variable_name(), "t2m");

        let with_attr = field().with_attribute(
            "standard_name",
            AttributeValue::Text("air_temperature".to_string()),
        );
        assert_eq!(with_attr.variable_name(), "air_temperature");

        let with_long = with_attr.with_long_name("2 metre temperature");
        assert_eq!(with_long.variable_name(), "2 metre temperature");
    }

    #[test]
    fn test_time_metadata() {
        let values = Array3::<f32>::zeros((2, 2, 3));
        let field = GriddedField::from_steps("t2m", vec![10.0, 0.0], vec![0.0, 10.0, 20.0], values)
            .unwrap()
            .with_times(vec![at(1, 0), at(2, 6)])
            .unwrap()
            .with_units("K");

        assert_eq!(field.metadata("units"), Some(MetadataValue::Text("K".to_string())));
        assert_eq!(field.metadata_at("time", 1), Some(MetadataValue::Time(at(2, 6))));
        assert_eq!(field.metadata_at("lead_time", 1), Some(MetadataValue::Hours(30.0)));
        assert_eq!(
            field.metadata_at("valid_time", 1).unwrap().format(Some("%H:%M on %Y-%m-%d")),
            "06:00 on 2024-01-02"
        );
        assert_eq!(field.metadata("nonexistent"), None);
    }

    #[test]
    fn test_times_must_match_steps() {
        assert!(field().with_times(vec![at(1, 0), at(1, 6)]).is_err());
    }

    #[test]
    fn test_select_step() {
        let values = Array3::from_shape_fn((3, 2, 3), |(t, _, _)| t as f32);
        let field = GriddedField::from_steps("x", vec![1.0, 0.0], vec![0.0, 1.0, 2.0], values)
            .unwrap()
            .with_times(vec![at(1, 0), at(1, 6), at(1, 12)])
            .unwrap();
        let second = field.select_step(1).unwrap();
        assert_eq!(second.n_steps(), 1);
        assert_eq!(second.values()[[0, 0]], 1.0);
        assert_eq!(second.times(), &[at(1, 6)]);
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(MetadataValue::Number(3.14159).format(Some(".2f")), "3.14");
        assert_eq!(MetadataValue::Number(2.5).format(None), "2.5");
        assert_eq!(parse_precision(".1f"), Some(1));
        assert_eq!(parse_precision("%Y"), None);
    }

    #[test]
    fn test_attribute_value_serialization() {
        let text = AttributeValue::Text("test".to_string());
        assert_eq!(serde_json::to_string(&text).unwrap(), r#""test""#);

        let array: AttributeValue = serde_json::from_str("[1.0, 2.5]").unwrap();
        assert_eq!(array, AttributeValue::NumberArray(vec![1.0, 2.5]));
        assert_eq!(array.to_string(), "[1, 2.5]");
    }
}

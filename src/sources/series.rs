//! One-dimensional time series.

use chrono::NaiveDateTime;

use super::field::MetadataValue;
use crate::error::{IsobarError, Result};
use crate::utils::{to_datetime, TimeValue};

/// Values indexed by time, e.g. annual mean temperature anomalies.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    name: String,
    units: Option<String>,
    times: Vec<NaiveDateTime>,
    values: Vec<f64>,
}

impl TimeSeries {
    pub fn new(name: impl Into<String>, times: Vec<NaiveDateTime>, values: Vec<f64>) -> Result<Self> {
        if times.len() != values.len() {
            return Err(IsobarError::Data {
                message: format!("{} times given for {} values", times.len(), values.len()),
            });
        }
        Ok(Self {
            name: name.into(),
            units: None,
            times,
            values,
        })
    }

    /// Build from `(time, value)` pairs; times may be anything
    /// [`to_datetime`] understands.
    pub fn from_pairs<T, I>(name: impl Into<String>, pairs: I) -> Result<Self>
    where
        T: Into<TimeValue>,
        I: IntoIterator<Item = (T, f64)>,
    {
        let mut times = Vec::new();
        let mut values = Vec::new();
        for (time, value) in pairs {
            times.push(to_datetime(time)?);
            values.push(value);
        }
        Self::new(name, times, values)
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn units(&self) -> Option<&str> {
        self.units.as_deref()
    }

    pub fn times(&self) -> &[NaiveDateTime] {
        &self.times
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDateTime, f64)> + '_ {
        self.times.iter().copied().zip(self.values.iter().copied())
    }

    /// Minimum and maximum, ignoring NaN.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.values
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |range, v| match range {
                None => Some((v, v)),
                Some((lo, hi)) => Some((f64::min(lo, v), f64::max(hi, v))),
            })
    }

    /// First and last time.
    pub fn time_range(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        Some((*self.times.first()?, *self.times.last()?))
    }

    /// Title metadata: `variable_name`, `short_name`, `units`, and `time`
    /// (the first time).
    pub fn metadata(&self, key: &str) -> Option<MetadataValue> {
        match key {
            "variable_name" | "short_name" | "name" => Some(MetadataValue::Text(self.name.clone())),
            "units" => self.units.clone().map(MetadataValue::Text),
            "time" | "valid_time" | "start_time" => self.times.first().copied().map(MetadataValue::Time),
            "end_time" => self.times.last().copied().map(MetadataValue::Time),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_mismatch() {
        let result = TimeSeries::new("x", Vec::new(), vec![1.0]);
        assert!(matches!(result, Err(IsobarError::Data { .. })));
    }

    #[test]
    fn test_from_pairs() {
        let series = TimeSeries::from_pairs(
            "anomaly",
            [("1990-01-01", -0.2), ("1991-01-01", f64::NAN), ("1992-01-01", 0.4)],
        )
        .unwrap()
        .with_units("K");

        assert_eq!(series.len(), 3);
        assert_eq!(series.value_range(), Some((-0.2, 0.4)));
        assert_eq!(series.units(), Some("K"));
        assert_eq!(
            series.metadata("time").unwrap().format(Some("%Y")),
            "1990"
        );
        assert_eq!(series.time_range().unwrap().1.format("%Y").to_string(), "1992");
    }

    #[test]
    fn test_empty_range() {
        let series = TimeSeries::new("x", Vec::new(), Vec::new()).unwrap();
        assert!(series.is_empty());
        assert_eq!(series.value_range(), None);
    }
}

//! Time-series subplots.

use serde_json::Value;
use std::ops::{Deref, DerefMut};

use crate::components::{Figure, Subplot};
use crate::error::Result;
use crate::sources::TimeSeries;

/// Default figure size for a time series, in pixels.
pub const DEFAULT_SIZE: (u32, u32) = (800, 400);

/// A subplot with a date axis along x.
#[derive(Debug, Clone)]
pub struct TimeSeriesPlot {
    subplot: Subplot,
}

impl Default for TimeSeriesPlot {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSeriesPlot {
    pub fn new() -> Self {
        let mut subplot = Subplot::new();
        subplot.set_time_axis(true);
        Self { subplot }
    }

    pub fn line(&mut self, series: &TimeSeries, options: &Value) -> Result<&mut Self> {
        self.subplot.line(series.clone(), options)?;
        Ok(self)
    }

    pub fn scatter(&mut self, series: &TimeSeries, options: &Value) -> Result<&mut Self> {
        self.subplot.scatter(series.clone(), options)?;
        Ok(self)
    }

    pub fn bar(&mut self, series: &TimeSeries, options: &Value) -> Result<&mut Self> {
        self.subplot.bar(series.clone(), options)?;
        Ok(self)
    }

    pub fn into_subplot(self) -> Subplot {
        self.subplot
    }

    /// A single-subplot figure of the default time-series size.
    pub fn into_figure(self) -> Result<Figure> {
        let mut figure = Figure::default().with_size(DEFAULT_SIZE.0, DEFAULT_SIZE.1);
        figure.push_subplot(self.subplot)?;
        Ok(figure)
    }
}

impl Deref for TimeSeriesPlot {
    type Target = Subplot;

    fn deref(&self) -> &Subplot {
        &self.subplot
    }
}

impl DerefMut for TimeSeriesPlot {
    fn deref_mut(&mut self) -> &mut Subplot {
        &mut self.subplot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn series() -> TimeSeries {
        TimeSeries::from_pairs(
            "t2m",
            [("2024-01-01", 1.0), ("2024-01-02", 3.0), ("2024-01-03", 2.0)],
        )
        .unwrap()
        .with_units("K")
    }

    #[test]
    fn test_line_then_legend() {
        let mut plot = TimeSeriesPlot::new();
        plot.line(&series(), &json!({"label": "Site A"})).unwrap();
        plot.legend(&json!({})).unwrap();
        assert_eq!(plot.layers()[0].label(), "Site A");

        let image = plot.into_figure().unwrap().render().unwrap();
        assert_eq!(image.dimensions(), DEFAULT_SIZE);
    }

    #[test]
    fn test_units_option_converts() {
        let mut plot = TimeSeriesPlot::new();
        plot.bar(&series(), &json!({"units": "degC"})).unwrap();
        let (_, y) = plot.layers()[0].xy().unwrap();
        assert!((y[0] + 272.15).abs() < 1e-9);
    }
}

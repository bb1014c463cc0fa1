//! One-call plots: a figure, one layer, and the schema's finishing steps.

use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

use crate::components::{Figure, LayerKind, Source};
use crate::error::{IsobarError, Result};
use crate::schema;
use crate::sources::TimeSeries;
use crate::temporal::{Stripes, TimeSeriesPlot};

/// How a quick plot draws its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotMethod {
    Line,
    Scatter,
    Bar,
    Pcolormesh,
    Block,
    Contour,
    Contourf,
    Quiver,
    Barbs,
}

impl PlotMethod {
    pub const ALL: [PlotMethod; 9] = [
        PlotMethod::Line,
        PlotMethod::Scatter,
        PlotMethod::Bar,
        PlotMethod::Pcolormesh,
        PlotMethod::Block,
        PlotMethod::Contour,
        PlotMethod::Contourf,
        PlotMethod::Quiver,
        PlotMethod::Barbs,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PlotMethod::Line => "line",
            PlotMethod::Scatter => "scatter",
            PlotMethod::Bar => "bar",
            PlotMethod::Pcolormesh => "pcolormesh",
            PlotMethod::Block => "block",
            PlotMethod::Contour => "contour",
            PlotMethod::Contourf => "contourf",
            PlotMethod::Quiver => "quiver",
            PlotMethod::Barbs => "barbs",
        }
    }

    pub fn kind(&self) -> LayerKind {
        match self {
            PlotMethod::Line => LayerKind::Line,
            PlotMethod::Scatter => LayerKind::Scatter,
            PlotMethod::Bar => LayerKind::Bar,
            PlotMethod::Pcolormesh => LayerKind::Pcolormesh,
            PlotMethod::Block => LayerKind::Block,
            PlotMethod::Contour => LayerKind::Contour,
            PlotMethod::Contourf => LayerKind::Contourf,
            PlotMethod::Quiver => LayerKind::Quiver,
            PlotMethod::Barbs => LayerKind::Barbs,
        }
    }
}

impl fmt::Display for PlotMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PlotMethod {
    type Err = IsobarError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        PlotMethod::ALL
            .into_iter()
            .find(|method| method.name() == wanted)
            .ok_or_else(|| {
                IsobarError::invalid(
                    "method",
                    format!(
                        "unknown plot method '{}'; expected one of {}",
                        s,
                        crate::utils::list_to_human(&PlotMethod::ALL.map(|m| m.name()))
                    ),
                )
            })
    }
}

/// Plot `source` on plain axes and run the schema's `quickplot_workflow`.
/// Any failure is returned.
pub fn quickplot(source: impl Into<Source>, method: PlotMethod, options: &Value) -> Result<Figure> {
    let source = source.into();
    info!(source = source.name(), method = %method, "Quick plot");

    let mut figure = Figure::default();
    let subplot = figure.add_subplot()?;
    subplot.plot(method, &source, options)?;
    for step in schema::with_schema(|s| s.workflow("quickplot_workflow")) {
        debug!(step = %step, "Applying finishing step");
        subplot.apply_finishing(&step)?;
    }
    Ok(figure)
}

/// A line plot of a time series with a date axis.
pub fn quickplot_series(series: &TimeSeries, options: &Value) -> Result<Figure> {
    let mut plot = TimeSeriesPlot::new();
    plot.line(series, options)?;
    for step in schema::with_schema(|s| s.workflow("quickplot_workflow")) {
        plot.apply_finishing(&step)?;
    }
    plot.into_figure()
}

/// Warming stripes of a time series.
pub fn stripes(series: &TimeSeries, options: &Value) -> Result<Figure> {
    let mut plot = Stripes::new();
    plot.stripes(series, options)?;
    plot.into_figure()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Points;
    use crate::sources::field_from_fn;
    use serde_json::json;

    #[test]
    fn test_parse_method() {
        assert_eq!("Contourf".parse::<PlotMethod>().unwrap(), PlotMethod::Contourf);
        assert_eq!(PlotMethod::Block.to_string(), "block");
        assert_eq!("BARBS".parse::<PlotMethod>().unwrap().kind(), LayerKind::Barbs);
        let err = "wiggle".parse::<PlotMethod>().unwrap_err();
        assert!(err.to_string().contains("unknown plot method 'wiggle'"));
    }

    #[test]
    fn test_quickplot_line() {
        let points = Points::new("height", vec![0.0, 1.0, 2.0], vec![3.0, 1.0, 2.0]).unwrap();
        let figure = quickplot(points, PlotMethod::Line, &json!({})).unwrap();
        let subplot = &figure.subplots()[0];
        assert!(subplot.has_legend());
        assert_eq!(subplot.title_text(), Some("height"));
    }

    #[test]
    fn test_quickplot_field_on_axes() {
        let field = field_from_fn("t", vec![0.0, 1.0], vec![0.0, 1.0], |lat, lon| (lat * lon) as f32).unwrap();
        let figure = quickplot(field, PlotMethod::Contourf, &json!({})).unwrap();
        assert!(!figure.subplots()[0].is_map());
    }

    #[test]
    fn test_quickplot_errors_propagate() {
        let series = TimeSeries::from_pairs("s", [("2024-01-01", 1.0)]).unwrap();
        assert!(quickplot(series, PlotMethod::Pcolormesh, &json!({})).is_err());
    }

    #[test]
    fn test_stripes_shortcut() {
        let series = TimeSeries::from_pairs("s", [("2000-01-01", -1.0), ("2001-01-01", 1.0)]).unwrap();
        let figure = stripes(&series, &json!({})).unwrap();
        assert_eq!(figure.size(), (800, 300));
    }
}

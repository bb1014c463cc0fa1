//! A plotly-compatible chart built trace by trace.
//!
//! Traces start from the schema's `interactive.<kind>` defaults; caller
//! options are merged over them, so any plotly attribute can be set.

use serde_json::{json, Value};
use tracing::debug;

use crate::components::Source;
use crate::error::{IsobarError, Result};
use crate::schema;
use crate::sources::TimeSeries;
use crate::utils::dict_utils::merged;
use crate::utils::{symmetrical_iter, Symmetric};

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.27.0.min.js";

#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    traces: Vec<Value>,
    layout: Value,
}

impl Default for Chart {
    fn default() -> Self {
        Self::new()
    }
}

impl Chart {
    pub fn new() -> Self {
        let layout = schema::with_schema(|s| {
            let mut layout = s.get("interactive.layout").unwrap_or_else(|| json!({}));
            layout["colorway"] = Value::from(s.get_str_list("colorway"));
            layout
        });
        Self {
            traces: Vec::new(),
            layout,
        }
    }

    pub fn traces(&self) -> &[Value] {
        &self.traces
    }

    pub fn layout(&self) -> &Value {
        &self.layout
    }

    /// The colorway colour for the next trace.
    pub fn next_color(&self) -> String {
        let colorway: Vec<&str> = self.layout["colorway"]
            .as_array()
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        if colorway.is_empty() {
            return "#000000".to_string();
        }
        colorway[self.traces.len() % colorway.len()].to_string()
    }

    pub fn add_line(&mut self, source: impl Into<Source>, options: &Value) -> Result<&mut Self> {
        let source = source.into();
        let trace = json!({
            "type": "scatter",
            "line": {"color": self.next_color()},
        });
        self.push("line", trace, &source, options)
    }

    pub fn add_scatter(&mut self, source: impl Into<Source>, options: &Value) -> Result<&mut Self> {
        let source = source.into();
        let trace = json!({
            "type": "scatter",
            "marker": {"color": self.next_color()},
        });
        self.push("scatter", trace, &source, options)
    }

    pub fn add_bar(&mut self, source: impl Into<Source>, options: &Value) -> Result<&mut Self> {
        let source = source.into();
        let trace = json!({
            "type": "bar",
            "marker": {"color": self.next_color()},
        });
        self.push("bar", trace, &source, options)
    }

    /// A one-row heatmap of `series`. With `diverging` (the default) the
    /// colour range is symmetric around `divergence_point`.
    pub fn add_stripes(&mut self, series: &TimeSeries, options: &Value) -> Result<&mut Self> {
        let diverging = options.get("diverging").and_then(Value::as_bool).unwrap_or(true);
        let centre = options.get("divergence_point").and_then(Value::as_f64).unwrap_or(0.0);
        let finite = series.values().iter().copied().filter(|v| v.is_finite());
        let (mut zmin, mut zmax) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
        if !zmin.is_finite() {
            return Err(IsobarError::Data {
                message: format!("'{}' has no finite values to draw as stripes", series.name()),
            });
        }
        if diverging {
            let reach = (zmax - centre).max(centre - zmin);
            zmin = centre - reach;
            zmax = centre + reach;
        }

        let mut trace = schema::with_schema(|s| s.get("interactive.stripes")).unwrap_or_else(|| json!({}));
        let body = json!({
            "type": "heatmap",
            "name": series.name(),
            "x": time_strings(series),
            "y": vec![1; series.len()],
            "z": series.values().iter().map(|v| Value::from(*v)).collect::<Vec<_>>(),
            "zmin": zmin,
            "zmax": zmax,
        });
        trace = merged(&trace, &body);
        if !diverging && options.get("colorscale").is_none() {
            trace["colorscale"] = Value::from("Viridis");
        }
        let trace = merged(&trace, &strip_keys(options, &["diverging", "divergence_point"]));
        debug!(name = series.name(), zmin, zmax, "Added stripes trace");
        self.traces.push(trace);
        Ok(self)
    }

    /// Shade between pairs of bounds, outermost first; an odd middle bound
    /// is drawn as a line. Bounds should be ordered lowest to highest.
    pub fn add_envelope(&mut self, bounds: &[Source], options: &Value) -> Result<&mut Self> {
        if bounds.is_empty() {
            return Err(IsobarError::invalid("bounds", "an envelope needs at least one bound"));
        }
        let color = options
            .pointer("/line/color")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| self.next_color());
        let defaults = schema::with_schema(|s| s.get("interactive.envelope")).unwrap_or_else(|| json!({}));
        let group = options
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("trace {}", self.traces.len()));

        for (i, pair) in symmetrical_iter(bounds).into_iter().enumerate() {
            let (lower, upper) = match &pair {
                Symmetric::Pair(lower, upper) => (lower, Some(upper)),
                Symmetric::Single(middle) => (middle, None),
            };
            let width = if upper.is_some() { 0.0 } else { 2.0 };
            let style = json!({
                "type": "scatter",
                "mode": "lines",
                "line": {"color": color.clone(), "width": width},
                "legendgroup": group.clone(),
            });
            let lower_trace = merged(&merged(&defaults, &style), &json!({"showlegend": false}));
            self.traces.push(merged(&with_xy(lower_trace, lower)?, options));
            if let Some(upper) = upper {
                let upper_trace = merged(
                    &merged(&defaults, &style),
                    &json!({"fill": "tonexty", "showlegend": i == 0}),
                );
                self.traces.push(merged(&with_xy(upper_trace, upper)?, options));
            }
        }
        Ok(self)
    }

    pub fn title(&mut self, title: &str) -> &mut Self {
        self.layout["title"] = json!({ "text": title });
        self
    }

    /// Merge plotly layout settings.
    pub fn update_layout(&mut self, layout: &Value) -> &mut Self {
        self.layout = merged(&self.layout, layout);
        self
    }

    pub fn to_json(&self) -> Value {
        json!({
            "data": self.traces,
            "layout": self.layout,
        })
    }

    /// A standalone HTML page that draws the chart with plotly.js.
    pub fn to_html(&self) -> String {
        let figure = self.to_json();
        format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<script src=\"{}\"></script>\n</head>\n<body>\n<div id=\"chart\"></div>\n<script>\nvar figure = {};\nPlotly.newPlot(\"chart\", figure.data, figure.layout);\n</script>\n</body>\n</html>\n",
            PLOTLY_CDN, figure
        )
    }

    fn push(&mut self, kind: &str, trace: Value, source: &Source, options: &Value) -> Result<&mut Self> {
        let defaults = schema::with_schema(|s| s.get(&format!("interactive.{}", kind))).unwrap_or_else(|| json!({}));
        let trace = with_xy(merged(&defaults, &trace), source)?;
        self.traces.push(merged(&trace, options));
        Ok(self)
    }
}

/// Add `name`, `x` and `y` for a one-dimensional source.
fn with_xy(mut trace: Value, source: &Source) -> Result<Value> {
    let x = match source {
        Source::Series(series) => Value::from(time_strings(series)),
        _ => Value::from(source.xy()?.0),
    };
    let (_, y) = source.xy()?;
    trace["name"] = Value::from(source.name());
    trace["x"] = x;
    trace["y"] = Value::Array(y.into_iter().map(Value::from).collect());
    Ok(trace)
}

fn time_strings(series: &TimeSeries) -> Vec<String> {
    series
        .times()
        .iter()
        .map(|t| t.format("%Y-%m-%dT%H:%M:%S").to_string())
        .collect()
}

fn strip_keys(options: &Value, keys: &[&str]) -> Value {
    match options {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(k, _)| !keys.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        ),
        _ => json!({}),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Points;

    fn series(name: &str, values: &[f64]) -> TimeSeries {
        let pairs: Vec<(String, f64)> = values
            .iter()
            .enumerate()
            .map(|(i, v)| (format!("2024-01-{:02}", i + 1), *v))
            .collect();
        TimeSeries::from_pairs(name, pairs.iter().map(|(t, v)| (t.as_str(), *v))).unwrap()
    }

    #[test]
    fn test_line_uses_colorway_and_schema() {
        let mut chart = Chart::new();
        chart.add_line(series("a", &[1.0, 2.0]), &json!({})).unwrap();
        chart.add_line(series("b", &[1.0, 2.0]), &json!({"line": {"dash": "dot"}})).unwrap();

        let traces = chart.traces();
        assert_eq!(traces[0]["line"]["color"], "#636EFA");
        assert_eq!(traces[0]["mode"], "lines");
        assert_eq!(traces[0]["hovertemplate"], "%{y:.1f}");
        assert_eq!(traces[0]["x"][0], "2024-01-01T00:00:00");
        assert_eq!(traces[1]["line"]["color"], "#EF553B");
        assert_eq!(traces[1]["line"]["dash"], "dot");
        assert_eq!(traces[1]["line"]["width"], 2);
    }

    #[test]
    fn test_points_and_bars() {
        let mut chart = Chart::new();
        let points = Points::new("p", vec![1.0, 2.0], vec![3.0, f64::NAN]).unwrap();
        chart.add_bar(points, &json!({})).unwrap();
        assert_eq!(chart.traces()[0]["type"], "bar");
        assert_eq!(chart.traces()[0]["x"], json!([1.0, 2.0]));
        assert!(chart.traces()[0]["y"][1].is_null());
    }

    #[test]
    fn test_stripes_are_symmetric() {
        let mut chart = Chart::new();
        chart.add_stripes(&series("anomaly", &[-0.5, 0.2, 1.5]), &json!({})).unwrap();
        let trace = &chart.traces()[0];
        assert_eq!(trace["type"], "heatmap");
        assert_eq!(trace["y"], json!([1, 1, 1]));
        assert_eq!(trace["zmin"], -1.5);
        assert_eq!(trace["zmax"], 1.5);
        assert_eq!(trace["showscale"], false);
        assert_eq!(trace["colorscale"], "RdBu_r");
        assert!(trace.get("diverging").is_none());
    }

    #[test]
    fn test_envelope_pairs_bounds() {
        let bounds: Vec<Source> = [1.0, 2.0, 3.0, 4.0, 5.0]
            .iter()
            .map(|v| series("q", &[*v, *v]).into())
            .collect();
        let mut chart = Chart::new();
        chart.add_envelope(&bounds, &json!({})).unwrap();

        let traces = chart.traces();
        assert_eq!(traces.len(), 5);
        assert_eq!(traces[0]["y"][0], 1.0);
        assert_eq!(traces[1]["y"][0], 5.0);
        assert_eq!(traces[1]["fill"], "tonexty");
        assert_eq!(traces[3]["fill"], "tonexty");
        assert_eq!(traces[4]["y"][0], 3.0);
        assert!(traces[4].get("fill").is_none());
        assert!(traces.iter().all(|t| t["line"]["color"] == "#636EFA"));
    }

    #[test]
    fn test_json_and_html() {
        let mut chart = Chart::new();
        chart.title("Temperature");
        let figure = chart.to_json();
        assert_eq!(figure["layout"]["title"]["text"], "Temperature");
        assert_eq!(figure["layout"]["hovermode"], "x");
        assert!(chart.to_html().contains("Plotly.newPlot"));
    }
}

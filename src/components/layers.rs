//! Layers: one plotted dataset on a subplot.

use serde_json::Value;

use super::formatter::{format_value, unique_join};
use crate::error::{IsobarError, Result};
use crate::render::contour::Contour;
use crate::schema;
use crate::sources::{GriddedField, MetadataValue, TimeSeries, VectorField};
use crate::styles::{parse_color, Style};
use crate::utils::unique;

/// Plain x/y data without a time axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Points {
    pub name: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub units: Option<String>,
}

impl Points {
    pub fn new(name: impl Into<String>, x: Vec<f64>, y: Vec<f64>) -> Result<Self> {
        if x.len() != y.len() {
            return Err(IsobarError::Data {
                message: format!("{} x values given for {} y values", x.len(), y.len()),
            });
        }
        Ok(Self {
            name: name.into(),
            x,
            y,
            units: None,
        })
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }
}

/// Data that can be plotted.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Field(GriddedField),
    Series(TimeSeries),
    Points(Points),
    Vectors(VectorField),
}

impl From<GriddedField> for Source {
    fn from(field: GriddedField) -> Self {
        Source::Field(field)
    }
}

impl From<TimeSeries> for Source {
    fn from(series: TimeSeries) -> Self {
        Source::Series(series)
    }
}

impl From<Points> for Source {
    fn from(points: Points) -> Self {
        Source::Points(points)
    }
}

impl From<VectorField> for Source {
    fn from(vectors: VectorField) -> Self {
        Source::Vectors(vectors)
    }
}

impl Source {
    pub fn name(&self) -> &str {
        match self {
            Source::Field(field) => field.name(),
            Source::Series(series) => series.name(),
            Source::Points(points) => &points.name,
            Source::Vectors(vectors) => vectors.name(),
        }
    }

    pub fn units(&self) -> Option<&str> {
        match self {
            Source::Field(field) => field.units(),
            Source::Series(series) => series.units(),
            Source::Points(points) => points.units.as_deref(),
            Source::Vectors(vectors) => vectors.units(),
        }
    }

    /// Metadata for titles and labels.
    pub fn metadata(&self, key: &str) -> Option<MetadataValue> {
        match self {
            Source::Field(field) => field.metadata(key),
            Source::Series(series) => series.metadata(key),
            Source::Points(points) => match key {
                "variable_name" | "short_name" | "name" => Some(MetadataValue::Text(points.name.clone())),
                "units" => points.units.clone().map(MetadataValue::Text),
                _ => None,
            },
            Source::Vectors(vectors) => vectors.metadata(key),
        }
    }

    /// x/y pairs for one-dimensional data; times become unix seconds.
    pub fn xy(&self) -> Result<(Vec<f64>, Vec<f64>)> {
        match self {
            Source::Series(series) => Ok((
                series
                    .times()
                    .iter()
                    .map(|t| t.and_utc().timestamp() as f64)
                    .collect(),
                series.values().to_vec(),
            )),
            Source::Points(points) => Ok((points.x.clone(), points.y.clone())),
            Source::Field(field) => Err(IsobarError::invalid(
                "data",
                format!("'{}' is gridded; use a map or a 2-D plot method", field.name()),
            )),
            Source::Vectors(vectors) => Err(IsobarError::invalid(
                "data",
                format!("'{}' holds wind components; use quiver or barbs", vectors.name()),
            )),
        }
    }

    pub fn as_field(&self) -> Option<&GriddedField> {
        match self {
            Source::Field(field) => Some(field),
            _ => None,
        }
    }

    pub fn as_vectors(&self) -> Option<&VectorField> {
        match self {
            Source::Vectors(vectors) => Some(vectors),
            _ => None,
        }
    }

    /// `(latitudes, longitudes)` of gridded sources.
    pub fn grid_axes(&self) -> Option<(&[f64], &[f64])> {
        match self {
            Source::Field(field) => Some((field.latitudes(), field.longitudes())),
            Source::Vectors(vectors) => Some((vectors.latitudes(), vectors.longitudes())),
            _ => None,
        }
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, Source::Series(_))
    }
}

/// How a layer is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    Line,
    Scatter,
    Bar,
    Pcolormesh,
    Block,
    Contour,
    Contourf,
    Stripes,
    Quiver,
    Barbs,
}

impl LayerKind {
    /// The schema section holding defaults for this kind.
    pub fn schema_key(&self) -> &'static str {
        match self {
            LayerKind::Line => "line",
            LayerKind::Scatter => "scatter",
            LayerKind::Bar => "bar",
            LayerKind::Pcolormesh | LayerKind::Block => "pcolormesh",
            LayerKind::Contour => "contour",
            LayerKind::Contourf => "contourf",
            LayerKind::Stripes => "stripes",
            LayerKind::Quiver => "quiver",
            LayerKind::Barbs => "barbs",
        }
    }

    /// Whether the layer colours values through a style.
    pub fn is_shaded(&self) -> bool {
        matches!(
            self,
            LayerKind::Pcolormesh | LayerKind::Block | LayerKind::Contourf | LayerKind::Stripes
        )
    }

    pub fn is_gridded(&self) -> bool {
        matches!(
            self,
            LayerKind::Pcolormesh | LayerKind::Block | LayerKind::Contour | LayerKind::Contourf
        )
    }

    /// Whether the layer draws wind glyphs from u/v components.
    pub fn is_vector(&self) -> bool {
        matches!(self, LayerKind::Quiver | LayerKind::Barbs)
    }
}

/// Line and marker settings, resolved from the schema and caller options.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerOptions {
    pub color: Option<[u8; 4]>,
    pub width: f32,
    pub size: f32,
    pub width_fraction: f32,
    pub labels: bool,
    pub smoothing: u32,
    pub label: Option<String>,
    pub interpolation: Option<String>,
    /// Pixels between wind glyphs.
    pub spacing: f32,
    /// Barb staff length in pixels.
    pub length: f32,
    /// Speed drawn as an arrow one spacing long; the largest speed when unset.
    pub scale: Option<f64>,
}

impl LayerOptions {
    /// Merge the schema defaults for `kind` under `options`.
    pub fn resolve(kind: LayerKind, options: &Value) -> Result<Self> {
        let merged = schema::with_schema(|s| s.apply(&[kind.schema_key()], options));
        let color = match merged.get("color") {
            Some(Value::String(text)) => Some(parse_color(text)?),
            _ => None,
        };
        let number = |key: &str, default: f64| merged.get(key).and_then(Value::as_f64).unwrap_or(default) as f32;
        Ok(Self {
            color,
            width: number("width", 1.5),
            size: number("size", 4.0),
            width_fraction: number("width_fraction", 0.8).clamp(0.05, 1.0),
            labels: merged.get("labels").and_then(Value::as_bool).unwrap_or(false),
            smoothing: merged.get("smoothing").and_then(Value::as_u64).unwrap_or(0) as u32,
            label: merged.get("label").and_then(Value::as_str).map(str::to_string),
            interpolation: merged
                .get("interpolation")
                .and_then(Value::as_str)
                .map(str::to_string),
            spacing: number("spacing", 30.0).max(4.0),
            length: number("length", 20.0).max(1.0),
            scale: merged.get("scale").and_then(Value::as_f64).filter(|s| *s > 0.0),
        })
    }
}

/// One plotted dataset.
#[derive(Debug, Clone)]
pub struct Layer {
    pub(crate) source: Source,
    pub(crate) kind: LayerKind,
    pub(crate) style: Option<Style>,
    pub(crate) levels: Vec<f64>,
    pub(crate) grid: Option<ndarray::Array2<f32>>,
    pub(crate) xy: Option<(Vec<f64>, Vec<f64>)>,
    pub(crate) vectors: Option<(ndarray::Array2<f32>, ndarray::Array2<f32>)>,
    pub(crate) contours: Vec<Contour>,
    pub(crate) options: LayerOptions,
}

impl Layer {
    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    pub fn style(&self) -> Option<&Style> {
        self.style.as_ref()
    }

    /// Levels resolved for this layer's data.
    pub fn levels(&self) -> &[f64] {
        &self.levels
    }

    pub fn options(&self) -> &LayerOptions {
        &self.options
    }

    /// Contour lines, in grid coordinates, for contour layers.
    pub fn contours(&self) -> &[Contour] {
        &self.contours
    }

    /// The values as drawn, after unit conversion.
    pub fn grid(&self) -> Option<&ndarray::Array2<f32>> {
        self.grid.as_ref()
    }

    /// x/y values as drawn, for one-dimensional layers.
    pub fn xy(&self) -> Option<(&[f64], &[f64])> {
        self.xy.as_ref().map(|(x, y)| (x.as_slice(), y.as_slice()))
    }

    /// u and v as drawn, for wind layers.
    pub fn vectors(&self) -> Option<(&ndarray::Array2<f32>, &ndarray::Array2<f32>)> {
        self.vectors.as_ref().map(|(u, v)| (u, v))
    }

    /// The label shown in line legends.
    pub fn label(&self) -> String {
        self.options
            .label
            .clone()
            .unwrap_or_else(|| match self.source.metadata("variable_name") {
                Some(value) => value.to_string(),
                None => self.source.name().to_string(),
            })
    }

    /// Metadata for `key`, with `units` taken from the style when it
    /// converts the data.
    pub fn metadata(&self, key: &str) -> Option<MetadataValue> {
        if key == "units" {
            if let Some(label) = self.style.as_ref().and_then(Style::units_label) {
                return Some(MetadataValue::Text(label));
            }
            return self
                .source
                .units()
                .map(|u| MetadataValue::Text(crate::styles::units::format_units(u)));
        }
        self.source.metadata(key)
    }
}

/// Layers that share a legend or title.
pub struct LayerGroup<'a> {
    layers: Vec<&'a Layer>,
}

impl<'a> LayerGroup<'a> {
    pub fn new(layers: Vec<&'a Layer>) -> Self {
        Self { layers }
    }

    pub fn layers(&self) -> &[&'a Layer] {
        &self.layers
    }

    /// The first styled layer's style.
    pub fn style(&self) -> Option<&'a Style> {
        self.layers.iter().find_map(|layer| layer.style.as_ref())
    }

    /// Formatted values of `key` across the layers, without repeats.
    pub fn unique_values(&self, key: &str, spec: Option<&str>) -> Vec<String> {
        let values: Vec<String> = self
            .layers
            .iter()
            .filter_map(|layer| layer.metadata(key))
            .map(|value| format_value(&value, spec))
            .collect();
        unique(&values)
    }

    /// `key` across the layers as one phrase, e.g. "a and b".
    pub fn joined(&self, key: &str, spec: Option<&str>) -> String {
        unique_join(self.unique_values(key, spec))
    }
}

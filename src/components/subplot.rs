//! Subplots: one set of axes, or one map, within a figure.

use serde_json::{json, Value};
use std::f64::consts::PI;
use std::path::PathBuf;
use tracing::{debug, warn};

use super::formatter::{format_string, format_value, unique_join};
use super::layers::{Layer, LayerGroup, LayerKind, LayerOptions, Source};
use crate::error::{IsobarError, Result};
use crate::geo::{default_crs, load_coastlines, BoundingBox, Crs, Domain, Polyline};
use crate::quickplot::PlotMethod;
use crate::render::contour::contour_lines;
use crate::render::vectors::{arrow, barb, glyph_positions, magnitude, uv_to_speed_direction};
use crate::render::{rasterize, Canvas, GridSampler, HAlign, PixelRect, Transform, VAlign};
use crate::sources::{GriddedField, TimeSeries, VectorField};
use crate::styles::{auto_range, bin_index, format_tick, legend_ticks, parse_color, Levels, Style};
use crate::{ancillary, schema, temporal};

/// Options that select a style rather than a line or marker setting.
const STYLE_KEYS: &[&str] = &[
    "colors",
    "cmap",
    "colormap",
    "levels",
    "divergence_point",
    "units",
    "units_label",
];

/// What a subplot's coordinates mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubplotKind {
    /// Plain x/y axes.
    Cartesian,
    /// Projected map coordinates.
    Map,
}

#[derive(Debug, Clone)]
struct LineOverlay {
    lines: Vec<Polyline>,
    color: [u8; 4],
    width: f32,
}

#[derive(Debug, Clone)]
struct Gridlines {
    color: [u8; 4],
    width: f32,
    dash: Option<Vec<f32>>,
    step: Option<f64>,
}

#[derive(Debug, Clone, Default)]
struct Legend {
    label: Option<String>,
}

/// Schema values used while drawing.
struct Theme {
    background: [u8; 4],
    frame_color: [u8; 4],
    frame_width: f32,
    text_color: [u8; 4],
    title_size: f32,
    label_size: f32,
    legend_thickness: f32,
    legend_label_size: f32,
    max_ticks: usize,
}

impl Theme {
    fn load(kind: SubplotKind) -> Self {
        schema::with_schema(|s| {
            let color = |key: &str, fallback: [u8; 4]| {
                s.get_str(key)
                    .and_then(|c| parse_color(&c).ok())
                    .unwrap_or(fallback)
            };
            let background_key = match kind {
                SubplotKind::Map => "map.background",
                SubplotKind::Cartesian => "subplot.background",
            };
            Theme {
                background: color(background_key, [255, 255, 255, 255]),
                frame_color: color("subplot.frame_color", [51, 51, 51, 255]),
                frame_width: s.get_f32("subplot.frame_width").unwrap_or(1.0),
                text_color: color("figure.text_color", [26, 26, 26, 255]),
                title_size: s.get_f32("subplot.title_size").unwrap_or(18.0),
                label_size: s.get_f32("subplot.label_size").unwrap_or(12.0),
                legend_thickness: s.get_f32("legend.thickness").unwrap_or(16.0),
                legend_label_size: s.get_f32("legend.label_size").unwrap_or(12.0),
                max_ticks: s.get_u32("legend.max_ticks").unwrap_or(11) as usize,
            }
        })
    }
}

/// A single plotting region: layers of data plus the decorations that
/// finishing steps add.
#[derive(Debug, Clone)]
pub struct Subplot {
    kind: SubplotKind,
    domain: Option<Domain>,
    crs: Crs,
    layers: Vec<Layer>,
    title: Option<String>,
    legend: Option<Legend>,
    coastlines: Option<LineOverlay>,
    gridlines: Option<Gridlines>,
    time_axis: bool,
    axes: bool,
    next_color: usize,
}

impl Default for Subplot {
    fn default() -> Self {
        Self::new()
    }
}

impl Subplot {
    /// A subplot with plain x/y axes.
    pub fn new() -> Self {
        Self {
            kind: SubplotKind::Cartesian,
            domain: None,
            crs: Crs::default(),
            layers: Vec::new(),
            title: None,
            legend: None,
            coastlines: None,
            gridlines: None,
            time_axis: false,
            axes: true,
            next_color: 0,
        }
    }

    /// A map of `domain`, or of whatever data is plotted on it when `None`.
    pub fn map(domain: Option<Domain>) -> Self {
        let crs = domain.as_ref().map(Domain::crs).unwrap_or_else(default_crs);
        Self {
            kind: SubplotKind::Map,
            domain,
            crs,
            ..Self::new()
        }
    }

    pub fn kind(&self) -> SubplotKind {
        self.kind
    }

    pub fn is_map(&self) -> bool {
        self.kind == SubplotKind::Map
    }

    pub fn domain(&self) -> Option<&Domain> {
        self.domain.as_ref()
    }

    pub fn crs(&self) -> Crs {
        self.crs
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// The title text, once [`title`](Self::title) has run.
    pub fn title_text(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn has_legend(&self) -> bool {
        self.legend.is_some()
    }

    pub fn has_coastlines(&self) -> bool {
        self.coastlines.is_some()
    }

    pub fn has_gridlines(&self) -> bool {
        self.gridlines.is_some()
    }

    /// Label the x axis with dates; x values are unix seconds.
    pub fn set_time_axis(&mut self, time_axis: bool) -> &mut Self {
        self.time_axis = time_axis;
        self
    }

    /// Show or hide the frame and tick labels.
    pub fn set_axes(&mut self, axes: bool) -> &mut Self {
        self.axes = axes;
        self
    }

    /// Plot `source` with `method`.
    pub fn plot(&mut self, method: PlotMethod, source: &Source, options: &Value) -> Result<&mut Self> {
        let kind = method.kind();
        if kind.is_gridded() {
            let field = source.as_field().ok_or_else(|| {
                IsobarError::invalid(
                    "data",
                    format!("{} needs a gridded field, but '{}' is not one", method, source.name()),
                )
            })?;
            self.add_styled(kind, Source::Field(field.clone()), None, options)
        } else if kind.is_vector() && source.as_vectors().is_none() {
            Err(IsobarError::invalid(
                "data",
                format!("{} needs u and v wind components, but '{}' is not a pair", method, source.name()),
            ))
        } else {
            self.add_styled(kind, source.clone(), None, options)
        }
    }

    pub fn line(&mut self, source: impl Into<Source>, options: &Value) -> Result<&mut Self> {
        self.add_styled(LayerKind::Line, source.into(), None, options)
    }

    pub fn scatter(&mut self, source: impl Into<Source>, options: &Value) -> Result<&mut Self> {
        self.add_styled(LayerKind::Scatter, source.into(), None, options)
    }

    pub fn bar(&mut self, source: impl Into<Source>, options: &Value) -> Result<&mut Self> {
        self.add_styled(LayerKind::Bar, source.into(), None, options)
    }

    /// Shade each grid cell by its value.
    pub fn pcolormesh(&mut self, field: &GriddedField, options: &Value) -> Result<&mut Self> {
        self.add_styled(LayerKind::Pcolormesh, field.clone().into(), None, options)
    }

    /// Like [`pcolormesh`](Self::pcolormesh), always with flat cells.
    pub fn block(&mut self, field: &GriddedField, options: &Value) -> Result<&mut Self> {
        self.add_styled(LayerKind::Block, field.clone().into(), None, options)
    }

    /// Contour lines, labelled when the `labels` option is set.
    pub fn contour(&mut self, field: &GriddedField, options: &Value) -> Result<&mut Self> {
        self.add_styled(LayerKind::Contour, field.clone().into(), None, options)
    }

    /// Filled contours.
    pub fn contourf(&mut self, field: &GriddedField, options: &Value) -> Result<&mut Self> {
        self.add_styled(LayerKind::Contourf, field.clone().into(), None, options)
    }

    /// Arrows along the wind, scaled by speed.
    pub fn quiver(&mut self, vectors: &VectorField, options: &Value) -> Result<&mut Self> {
        self.add_styled(LayerKind::Quiver, vectors.clone().into(), None, options)
    }

    /// Wind barbs: pennants, full and half barbs for each 50, 10 and 5
    /// units of speed.
    pub fn barbs(&mut self, vectors: &VectorField, options: &Value) -> Result<&mut Self> {
        self.add_styled(LayerKind::Barbs, vectors.clone().into(), None, options)
    }

    /// Warming stripes: one full-height bar per value.
    pub fn stripes(&mut self, series: &TimeSeries, options: &Value) -> Result<&mut Self> {
        self.add_styled(LayerKind::Stripes, series.clone().into(), None, options)
    }

    /// Add a layer, with an explicit style or one chosen from `options`.
    pub fn add_styled(
        &mut self,
        kind: LayerKind,
        source: Source,
        style: Option<Style>,
        options: &Value,
    ) -> Result<&mut Self> {
        let layer = match kind {
            LayerKind::Pcolormesh | LayerKind::Block | LayerKind::Contour | LayerKind::Contourf => {
                let field = source.as_field().ok_or_else(|| {
                    IsobarError::invalid("data", format!("'{}' is not a gridded field", source.name()))
                })?;
                self.grid_layer(kind, field, style, options)?
            }
            LayerKind::Quiver | LayerKind::Barbs => {
                let vectors = source.as_vectors().ok_or_else(|| {
                    IsobarError::invalid("data", format!("'{}' is not a pair of wind components", source.name()))
                })?;
                self.vector_layer(kind, vectors, style, options)?
            }
            LayerKind::Stripes => stripes_layer(source, options)?,
            LayerKind::Line | LayerKind::Scatter | LayerKind::Bar => self.xy_layer(kind, source, style, options)?,
        };
        debug!(
            kind = ?layer.kind,
            source = layer.source.name(),
            levels = layer.levels.len(),
            "Added layer"
        );
        self.layers.push(layer);
        Ok(self)
    }

    fn grid_layer(
        &mut self,
        kind: LayerKind,
        field: &GriddedField,
        style: Option<Style>,
        options: &Value,
    ) -> Result<Layer> {
        let merged = schema::with_schema(|s| s.apply(&[kind.schema_key()], options));
        let layer_options = LayerOptions::resolve(kind, options)?;

        let field = match &self.domain {
            Some(domain) if self.is_map() && domain.is_complete() && domain.can_bbox() => field.crop(domain)?,
            _ => field.clone(),
        };

        let style = match style {
            Some(style) => style,
            None => choose_style(&field, options, &merged)?,
        };
        let mut grid = field.values().to_owned();
        style.convert_units(&mut grid, field.units(), field.name())?;
        let levels = style.levels_for_grid(grid.view())?;

        let contours = if kind == LayerKind::Contour {
            let (rows, cols) = grid.dim();
            let data: Vec<f32> = grid.iter().copied().collect();
            let thresholds: Vec<f32> = levels.iter().map(|l| *l as f32).collect();
            contour_lines(&data, cols, rows, &thresholds, layer_options.smoothing)
        } else {
            Vec::new()
        };

        Ok(Layer {
            source: Source::Field(field),
            kind,
            style: Some(style),
            levels,
            grid: Some(grid),
            xy: None,
            vectors: None,
            contours,
            options: layer_options,
        })
    }

    fn vector_layer(
        &mut self,
        kind: LayerKind,
        vectors: &VectorField,
        style: Option<Style>,
        options: &Value,
    ) -> Result<Layer> {
        let merged = schema::with_schema(|s| s.apply(&[kind.schema_key()], options));
        let layer_options = LayerOptions::resolve(kind, options)?;

        let vectors = match &self.domain {
            Some(domain) if self.is_map() && domain.is_complete() && domain.can_bbox() => vectors.crop(domain)?,
            _ => vectors.clone(),
        };

        // Glyphs take colours from a style only when one is asked for.
        let colored = style.is_some()
            || options
                .as_object()
                .is_some_and(|map| STYLE_KEYS.iter().any(|key| !key.starts_with("units") && map.contains_key(*key)));
        let style = match (style, options.get("units").and_then(Value::as_str)) {
            (Some(style), _) => Some(style),
            (None, _) if colored => {
                let default_cmap = merged.get("cmap").and_then(Value::as_str).unwrap_or("viridis");
                Some(Style::from_options(&merged, default_cmap)?)
            }
            (None, Some(units)) => Some(Style::default().with_units(units)),
            (None, None) => None,
        };

        let mut u = vectors.u().values().to_owned();
        let mut v = vectors.v().values().to_owned();
        if let Some(style) = &style {
            style.convert_units(&mut u, vectors.u().units(), vectors.u().name())?;
            style.convert_units(&mut v, vectors.v().units(), vectors.v().name())?;
        }
        let speed = magnitude(u.view(), v.view());
        let levels = match &style {
            Some(style) if colored => style.levels_for_grid(speed.view())?,
            _ => Vec::new(),
        };

        Ok(Layer {
            source: Source::Vectors(vectors),
            kind,
            style,
            levels,
            grid: Some(speed),
            xy: None,
            vectors: Some((u, v)),
            contours: Vec::new(),
            options: layer_options,
        })
    }

    fn xy_layer(&mut self, kind: LayerKind, source: Source, style: Option<Style>, options: &Value) -> Result<Layer> {
        let mut layer_options = LayerOptions::resolve(kind, options)?;
        if layer_options.color.is_none() {
            layer_options.color = Some(self.next_color());
        }

        let (x, mut y) = source.xy()?;
        let style = match (style, options.get("units").and_then(Value::as_str)) {
            (Some(style), _) => Some(style),
            (None, Some(units)) => Some(Style::default().with_units(units)),
            (None, None) => None,
        };
        if let Some(style) = &style {
            style.convert_series(&mut y, source.units(), source.name())?;
        }
        if source.is_temporal() {
            self.time_axis = true;
        }

        Ok(Layer {
            source,
            kind,
            style,
            levels: Vec::new(),
            grid: None,
            xy: Some((x, y)),
            vectors: None,
            contours: Vec::new(),
            options: layer_options,
        })
    }

    /// The next colour of the schema's colorway.
    fn next_color(&mut self) -> [u8; 4] {
        let colorway = schema::with_schema(|s| s.get_str_list("colorway"));
        let index = self.next_color;
        self.next_color += 1;
        colorway
            .get(index % colorway.len().max(1))
            .and_then(|c| parse_color(c).ok())
            .unwrap_or([0, 0, 0, 255])
    }

    /// Show a legend: a colorbar for shaded layers, otherwise a key of line
    /// labels. `label` overrides the colorbar label.
    pub fn legend(&mut self, options: &Value) -> Result<&mut Self> {
        if self.layers.is_empty() {
            return Err(IsobarError::invalid("legend", "there is nothing to put in a legend"));
        }
        self.legend = Some(Legend {
            label: options.get("label").and_then(Value::as_str).map(str::to_string),
        });
        Ok(self)
    }

    /// Draw coastlines from GeoJSON: `path` in `options`, the schema's
    /// `coastlines.path`, or the ancillary coastline file.
    pub fn coastlines(&mut self, options: &Value) -> Result<&mut Self> {
        if !self.is_map() {
            return Err(IsobarError::invalid("coastlines", "coastlines can only be drawn on a map"));
        }
        let merged = schema::with_schema(|s| s.apply(&["coastlines"], options));
        let path = merged
            .get("path")
            .and_then(Value::as_str)
            .map(PathBuf::from)
            .unwrap_or_else(ancillary::coastlines_path);
        let lines = load_coastlines(&path)?;

        self.coastlines = Some(LineOverlay {
            lines,
            color: color_option(&merged, "color", [77, 77, 77, 255])?,
            width: merged.get("width").and_then(Value::as_f64).unwrap_or(1.0) as f32,
        });
        Ok(self)
    }

    /// Draw meridians and parallels on a map, or a grid on plain axes.
    pub fn gridlines(&mut self, options: &Value) -> Result<&mut Self> {
        let merged = schema::with_schema(|s| s.apply(&["gridlines"], options));
        let dash = match merged.get("dash") {
            Some(Value::Array(items)) => {
                let pattern: Vec<f32> = items.iter().filter_map(Value::as_f64).map(|v| v as f32).collect();
                (pattern.len() >= 2).then_some(pattern)
            }
            _ => None,
        };
        let step = merged.get("step").and_then(Value::as_f64);
        if step.is_some_and(|s| s <= 0.0) {
            return Err(IsobarError::invalid("gridlines", "the grid step must be positive"));
        }

        self.gridlines = Some(Gridlines {
            color: color_option(&merged, "color", [154, 154, 154, 255])?,
            width: merged.get("width").and_then(Value::as_f64).unwrap_or(0.6) as f32,
            dash,
            step,
        });
        Ok(self)
    }

    /// Set the title from a template; without one, the schema's map or
    /// subplot title is used.
    pub fn title(&mut self, label: Option<&str>) -> Result<&mut Self> {
        let template = match label {
            Some(label) => label.to_string(),
            None => {
                let timed = self.is_map() && self.layers.iter().any(|l| l.metadata("time").is_some());
                let key = if timed { "map.title" } else { "subplot.title" };
                schema::with_schema(|s| s.raw(key).and_then(Value::as_str).map(str::to_string))
                    .unwrap_or_else(|| "{variable_name}".to_string())
            }
        };
        let title = self.format_string(&template);
        debug!(template = %template, title = %title, "Formatted subplot title");
        self.title = Some(title);
        Ok(self)
    }

    /// Run a workflow step by name.
    pub fn apply_finishing(&mut self, name: &str) -> Result<&mut Self> {
        match name {
            "legend" => self.legend(&json!({})),
            "coastlines" => self.coastlines(&json!({})),
            "gridlines" => self.gridlines(&json!({})),
            "title" => self.title(None),
            other => Err(IsobarError::invalid(
                "workflow",
                format!("unknown finishing step '{}'", other),
            )),
        }
    }

    /// Run a workflow step, logging instead of failing.
    pub(crate) fn try_finishing(&mut self, name: &str) {
        if let Err(e) = self.apply_finishing(name) {
            warn!(step = name, error = %e, "Skipping finishing step");
        }
    }

    /// Fill a template from the layers' metadata, plus `domain` and `crs`.
    pub fn format_string(&self, template: &str) -> String {
        let group = LayerGroup::new(self.layers.iter().collect());
        let context = |key: &str, spec: Option<&str>| -> Vec<String> {
            match key {
                "domain" => match &self.domain {
                    Some(domain) => vec![domain.title()],
                    None if self.is_map() => vec!["Global".to_string()],
                    None => Vec::new(),
                },
                "crs" => vec![self.crs.name()],
                _ => group
                    .layers()
                    .iter()
                    .filter_map(|layer| layer.metadata(key))
                    .map(|value| format_value(&value, spec))
                    .collect(),
            }
        };
        format_string(template, &context)
    }

    fn project(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        match self.kind {
            SubplotKind::Map => self.crs.forward(lon, lat),
            SubplotKind::Cartesian => Some((lon, lat)),
        }
    }

    fn unproject(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        match self.kind {
            SubplotKind::Map => self.crs.inverse(x, y),
            SubplotKind::Cartesian => Some((x, y)),
        }
    }

    /// The projected extent `[x_min, x_max, y_min, y_max]` to draw.
    pub fn extent(&self) -> Result<[f64; 4]> {
        match self.kind {
            SubplotKind::Map => self.map_extent(),
            SubplotKind::Cartesian => Ok(self.data_extent()),
        }
    }

    fn map_extent(&self) -> Result<[f64; 4]> {
        if let Some(bbox) = self.domain.as_ref().and_then(Domain::bbox) {
            return Ok(bbox.to_array());
        }
        let grids: Vec<(&[f64], &[f64])> = self.layers.iter().filter_map(|l| l.source.grid_axes()).collect();
        if grids.is_empty() {
            return self.crs.global_extent().ok_or_else(|| IsobarError::Layout {
                message: format!("a {} map needs a domain or some data", self.crs.name()),
            });
        }

        let mut bounds = [f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY];
        for (latitudes, longitudes) in grids {
            for lon in longitudes {
                bounds[0] = bounds[0].min(*lon);
                bounds[1] = bounds[1].max(*lon);
            }
            for lat in latitudes {
                bounds[2] = bounds[2].min(*lat);
                bounds[3] = bounds[3].max(*lat);
            }
        }
        Ok(BoundingBox::from_bbox(bounds, None, Some(self.crs))?.to_array())
    }

    fn data_extent(&self) -> [f64; 4] {
        let mut extent = [f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY];
        let mut include = |x: f64, y: f64| {
            if x.is_finite() {
                extent[0] = extent[0].min(x);
                extent[1] = extent[1].max(x);
            }
            if y.is_finite() {
                extent[2] = extent[2].min(y);
                extent[3] = extent[3].max(y);
            }
        };
        let mut pad_y = false;
        let mut bar_halfwidth: f64 = 0.0;

        for layer in &self.layers {
            match (layer.kind, layer.source.grid_axes(), &layer.xy) {
                (LayerKind::Stripes, _, Some((_, y))) => {
                    include(0.0, 0.0);
                    include(y.len() as f64, 1.0);
                }
                (_, Some((latitudes, longitudes)), _) => {
                    for lon in longitudes {
                        include(*lon, f64::NAN);
                    }
                    for lat in latitudes {
                        include(f64::NAN, *lat);
                    }
                }
                (kind, _, Some((x, y))) => {
                    pad_y = true;
                    for (x, y) in x.iter().zip(y) {
                        include(*x, *y);
                    }
                    if kind == LayerKind::Bar {
                        include(f64::NAN, 0.0);
                        bar_halfwidth = bar_halfwidth.max(bar_width(x, layer.options.width_fraction) / 2.0);
                    }
                }
                _ => {}
            }
        }

        if !extent.iter().all(|v| v.is_finite()) {
            return [0.0, 1.0, 0.0, 1.0];
        }
        extent[0] -= bar_halfwidth;
        extent[1] += bar_halfwidth;
        if pad_y {
            let pad = (extent[3] - extent[2]) * 0.05;
            extent[2] -= pad;
            extent[3] += pad;
        }
        for (lo, hi) in [(0, 1), (2, 3)] {
            if extent[lo] == extent[hi] {
                extent[lo] -= 0.5;
                extent[hi] += 0.5;
            }
        }
        extent
    }

    fn colorbar_layer(&self) -> Option<&Layer> {
        self.layers
            .iter()
            .find(|l| {
                ((l.kind.is_shaded() && l.kind != LayerKind::Stripes) || l.kind.is_vector())
                    && l.levels.len() >= 2
                    && l.style.is_some()
            })
    }

    /// Draw into `rect` of `canvas`.
    pub fn render(&self, canvas: &mut Canvas, rect: PixelRect) -> Result<()> {
        let theme = Theme::load(self.kind);
        let mut area = rect.inset(4.0, 4.0, 4.0, 4.0);

        if self.title.is_some() {
            area = area.inset(0.0, theme.title_size * 1.6, 0.0, 0.0);
        }
        let colorbar = self.legend.as_ref().and(self.colorbar_layer());
        let colorbar_height = theme.legend_thickness + theme.legend_label_size * 3.6;
        if colorbar.is_some() {
            area = area.inset(0.0, 0.0, 0.0, colorbar_height);
        }
        let cartesian_axes = self.axes && self.kind == SubplotKind::Cartesian;
        if cartesian_axes {
            area = area.inset(theme.label_size * 5.0, theme.label_size * 0.6, theme.label_size * 1.5, theme.label_size * 2.2);
        }

        let extent = self.extent()?;
        let plot_rect = match self.kind {
            SubplotKind::Map => {
                let aspect = (extent[1] - extent[0]) / (extent[3] - extent[2]);
                area.fit_aspect(aspect)
            }
            SubplotKind::Cartesian => area,
        };
        if plot_rect.width < 1.0 || plot_rect.height < 1.0 {
            return Err(IsobarError::Layout {
                message: format!("no room to draw a subplot in {}x{} pixels", rect.width, rect.height),
            });
        }
        let transform = Transform::new(extent, plot_rect);

        canvas.fill_rect(plot_rect, theme.background);
        canvas.set_clip(Some(plot_rect));
        for layer in &self.layers {
            self.draw_layer(canvas, &transform, layer, &theme)?;
        }
        if let Some(coastlines) = &self.coastlines {
            for line in &coastlines.lines {
                self.draw_geo_line(canvas, &transform, line.iter().copied(), coastlines.color, coastlines.width, None);
            }
        }
        if let Some(gridlines) = &self.gridlines {
            self.draw_gridlines(canvas, &transform, gridlines, &theme);
        }
        canvas.set_clip(None);

        if self.axes {
            canvas.stroke_rect(plot_rect, theme.frame_color, theme.frame_width);
        }
        if cartesian_axes {
            self.draw_axes(canvas, &transform, &theme);
        }
        if self.legend.is_some() {
            match colorbar {
                Some(layer) => {
                    let strip = PixelRect::new(rect.x, plot_rect.bottom(), rect.width, colorbar_height);
                    self.draw_colorbar(canvas, strip, plot_rect, layer, &theme)?;
                }
                None => self.draw_key(canvas, plot_rect, &theme),
            }
        }
        if let Some(title) = &self.title {
            let (cx, _) = plot_rect.center();
            canvas.text(
                title.clone(),
                cx,
                plot_rect.y - theme.title_size * 0.4,
                theme.title_size,
                theme.text_color,
                HAlign::Center,
                VAlign::Bottom,
            );
        }
        Ok(())
    }

    fn draw_layer(&self, canvas: &mut Canvas, transform: &Transform, layer: &Layer, theme: &Theme) -> Result<()> {
        match layer.kind {
            LayerKind::Pcolormesh | LayerKind::Block | LayerKind::Contourf => self.draw_shaded(canvas, transform, layer),
            LayerKind::Contour => self.draw_contours(canvas, transform, layer, theme),
            LayerKind::Stripes => draw_stripes(canvas, transform, layer),
            LayerKind::Quiver | LayerKind::Barbs => self.draw_vectors(canvas, transform, layer),
            LayerKind::Line | LayerKind::Scatter | LayerKind::Bar => {
                draw_xy(canvas, transform, layer);
                Ok(())
            }
        }
    }

    fn draw_shaded(&self, canvas: &mut Canvas, transform: &Transform, layer: &Layer) -> Result<()> {
        let (Some(field), Some(grid), Some(style)) = (layer.source.as_field(), &layer.grid, &layer.style) else {
            return Ok(());
        };
        let method = match layer.kind {
            LayerKind::Block => "nearest",
            LayerKind::Contourf => layer.options.interpolation.as_deref().unwrap_or("bilinear"),
            _ => layer.options.interpolation.as_deref().unwrap_or("nearest"),
        };
        let sampler = GridSampler::new(field.latitudes(), field.longitudes(), grid.view(), method)?;
        let colors = style.level_colors(&layer.levels)?;
        if colors.is_empty() {
            return Ok(());
        }

        let image = rasterize(transform, |x, y| {
            let (lon, lat) = self.unproject(x, y)?;
            let value = sampler.sample(lon, lat)?;
            bin_index(value as f64, &layer.levels).map(|i| colors[i.min(colors.len() - 1)])
        });
        canvas.draw_image(&image, transform.rect(), false)
    }

    fn draw_contours(&self, canvas: &mut Canvas, transform: &Transform, layer: &Layer, theme: &Theme) -> Result<()> {
        let Some(field) = layer.source.as_field() else {
            return Ok(());
        };
        let level_colors = match (&layer.options.color, &layer.style) {
            (Some(_), _) | (None, None) => None,
            (None, Some(style)) => Some(style.level_colors(&layer.levels)?).filter(|c| !c.is_empty()),
        };
        let (lats, lons) = (field.latitudes(), field.longitudes());
        let plot_rect = transform.rect();

        for contour in &layer.contours {
            let color = match &level_colors {
                Some(colors) => bin_index(contour.level as f64, &layer.levels)
                    .map(|i| colors[i.min(colors.len() - 1)])
                    .unwrap_or([0, 0, 0, 255]),
                None => layer.options.color.unwrap_or([0, 0, 0, 255]),
            };
            let points = contour
                .points
                .iter()
                .map(|p| (axis_value(lons, p.x as f64), axis_value(lats, p.y as f64)));
            self.draw_geo_line(canvas, transform, points, color, layer.options.width, None);

            if layer.options.labels && contour.length() > 4.0 {
                if let Some(mid) = contour.midpoint() {
                    let lonlat = (axis_value(lons, mid.x as f64), axis_value(lats, mid.y as f64));
                    if let Some((x, y)) = self.project(lonlat.0, lonlat.1) {
                        let (px, py) = transform.apply(x, y);
                        if plot_rect.contains((px, py)) {
                            canvas.text(
                                format_tick(contour.level as f64, &layer.levels),
                                px,
                                py,
                                theme.label_size * 0.85,
                                color,
                                HAlign::Center,
                                VAlign::Middle,
                            );
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn draw_vectors(&self, canvas: &mut Canvas, transform: &Transform, layer: &Layer) -> Result<()> {
        let (Some((lats, lons)), Some((u, v))) = (layer.source.grid_axes(), &layer.vectors) else {
            return Ok(());
        };
        let method = layer.options.interpolation.as_deref().unwrap_or("nearest");
        let u_sampler = GridSampler::new(lats, lons, u.view(), method)?;
        let v_sampler = GridSampler::new(lats, lons, v.view(), method)?;
        let colors = match &layer.style {
            Some(style) if layer.levels.len() >= 2 => style.level_colors(&layer.levels)?,
            _ => Vec::new(),
        };
        let fallback = layer.options.color.unwrap_or([0, 0, 0, 255]);

        let mut glyphs = Vec::new();
        for (px, py) in glyph_positions(transform.rect(), layer.options.spacing) {
            let (x, y) = transform.invert(px, py);
            let Some((lon, lat)) = self.unproject(x, y) else {
                continue;
            };
            let (Some(u), Some(v)) = (u_sampler.sample(lon, lat), v_sampler.sample(lon, lat)) else {
                continue;
            };
            if let Some((page_u, page_v)) = self.page_vector(transform, lon, lat, u, v) {
                glyphs.push(((px, py), uv_to_speed_direction(page_u, page_v)));
            }
        }

        let scale = layer
            .options
            .scale
            .unwrap_or_else(|| glyphs.iter().map(|(_, (speed, _))| *speed).fold(0.0, f64::max));
        debug!(kind = ?layer.kind, glyphs = glyphs.len(), scale, "Drawing wind glyphs");
        for ((px, py), (speed, from)) in glyphs {
            let color = bin_index(speed, &layer.levels)
                .and_then(|i| colors.get(i.min(colors.len().saturating_sub(1))))
                .copied()
                .unwrap_or(fallback);
            let glyph = match layer.kind {
                LayerKind::Barbs => barb(px, py, speed, from, layer.options.length),
                _ if scale > 0.0 => arrow(px, py, from + PI, (speed / scale) as f32 * layer.options.spacing * 0.9),
                _ => continue,
            };
            glyph.draw(canvas, color, layer.options.width);
        }
        Ok(())
    }

    /// The wind `(u, v)` at a point as a page direction, keeping its speed.
    /// On maps the direction follows the projection's local rotation.
    fn page_vector(&self, transform: &Transform, lon: f64, lat: f64, u: f32, v: f32) -> Option<(f32, f32)> {
        let speed = u.hypot(v);
        if !self.is_map() || speed == 0.0 {
            return Some((u, v));
        }
        let (east, north) = ((u / speed) as f64, (v / speed) as f64);
        const STEP: f64 = 0.01;
        let stretch = lat.to_radians().cos().max(1e-6);
        let (x0, y0) = self.project(lon, lat)?;
        let (x1, y1) = self.project(lon + STEP * east / stretch, (lat + STEP * north).clamp(-90.0, 90.0))?;

        let [x_min, x_max, y_min, y_max] = transform.extent();
        let rect = transform.rect();
        let dx = (x1 - x0) / (x_max - x_min) * rect.width as f64;
        let dy = (y1 - y0) / (y_max - y_min) * rect.height as f64;
        let length = dx.hypot(dy);
        let speed = speed as f64;
        (length.is_finite() && length > 0.0).then(|| ((dx / length * speed) as f32, (dy / length * speed) as f32))
    }

    /// Stroke a lon/lat polyline, breaking it where the projection cannot
    /// place a point or where it jumps across the map edge.
    fn draw_geo_line(
        &self,
        canvas: &mut Canvas,
        transform: &Transform,
        points: impl Iterator<Item = (f64, f64)>,
        color: [u8; 4],
        width: f32,
        dash: Option<&[f32]>,
    ) {
        let [x_min, x_max, ..] = transform.extent();
        let jump = (x_max - x_min).abs() / 2.0;
        let mut run: Vec<(f32, f32)> = Vec::new();
        let mut last_x: Option<f64> = None;

        for (lon, lat) in points {
            match self.project(lon, lat) {
                Some((x, y)) => {
                    if self.is_map() && last_x.is_some_and(|last| (x - last).abs() > jump) {
                        canvas.stroke_polyline(&run, color, width, dash, false);
                        run.clear();
                    }
                    run.push(transform.apply(x, y));
                    last_x = Some(x);
                }
                None => {
                    canvas.stroke_polyline(&run, color, width, dash, false);
                    run.clear();
                    last_x = None;
                }
            }
        }
        canvas.stroke_polyline(&run, color, width, dash, false);
    }

    fn draw_gridlines(&self, canvas: &mut Canvas, transform: &Transform, gridlines: &Gridlines, theme: &Theme) {
        let dash = gridlines.dash.as_deref();
        if !self.is_map() {
            let [x_min, x_max, y_min, y_max] = transform.extent();
            for x in ticks(x_min, x_max) {
                let (px, _) = transform.apply(x, y_min);
                let rect = transform.rect();
                canvas.stroke_polyline(&[(px, rect.y), (px, rect.bottom())], gridlines.color, gridlines.width, dash, false);
            }
            for y in ticks(y_min, y_max) {
                let (_, py) = transform.apply(x_min, y);
                let rect = transform.rect();
                canvas.stroke_polyline(&[(rect.x, py), (rect.right(), py)], gridlines.color, gridlines.width, dash, false);
            }
            return;
        }

        let (lon_range, lat_range) = self.visible_lonlat(transform);
        let step = gridlines.step.unwrap_or_else(|| {
            let span = (lon_range.1 - lon_range.0).max(lat_range.1 - lat_range.0);
            nice_degree_step(span)
        });

        let rect = transform.rect();
        let mut meridian = (lon_range.0 / step).floor() * step;
        while meridian <= lon_range.1 + 1e-9 {
            let points = (0..=90).map(|i| (meridian, -90.0 + 2.0 * i as f64));
            self.draw_geo_line(canvas, transform, points, gridlines.color, gridlines.width, dash);
            if self.crs.is_cylindrical() {
                if let Some((x, _)) = self.project(meridian, 0.0) {
                    let (px, _) = transform.apply(x, 0.0);
                    if px >= rect.x && px <= rect.right() {
                        canvas.text(
                            super::formatter::format_longitude(crate::geo::normalize_longitude(meridian)),
                            px,
                            rect.bottom() + 3.0,
                            theme.label_size * 0.85,
                            theme.text_color,
                            HAlign::Center,
                            VAlign::Top,
                        );
                    }
                }
            }
            meridian += step;
        }

        let mut parallel = (lat_range.0 / step).floor() * step;
        while parallel <= lat_range.1 + 1e-9 {
            if parallel.abs() <= 90.0 {
                let centre = self.crs.central_longitude();
                let points = (0..=180).map(|i| (centre - 180.0 + 2.0 * i as f64, parallel));
                self.draw_geo_line(canvas, transform, points, gridlines.color, gridlines.width, dash);
                if self.crs.is_cylindrical() {
                    if let Some((_, y)) = self.project(centre, parallel) {
                        let (_, py) = transform.apply(0.0, y);
                        if py >= rect.y && py <= rect.bottom() {
                            canvas.text(
                                super::formatter::format_latitude(parallel),
                                rect.x - 3.0,
                                py,
                                theme.label_size * 0.85,
                                theme.text_color,
                                HAlign::Right,
                                VAlign::Middle,
                            );
                        }
                    }
                }
            }
            parallel += step;
        }
    }

    /// Longitude and latitude ranges visible in the plot, found by sampling
    /// the rectangle's edges and centre.
    fn visible_lonlat(&self, transform: &Transform) -> ((f64, f64), (f64, f64)) {
        let rect = transform.rect();
        let mut lon = (f64::INFINITY, f64::NEG_INFINITY);
        let mut lat = (f64::INFINITY, f64::NEG_INFINITY);
        const SAMPLES: usize = 24;
        for i in 0..=SAMPLES {
            for j in 0..=SAMPLES {
                let on_edge = i == 0 || j == 0 || i == SAMPLES || j == SAMPLES || (i == SAMPLES / 2 && j == SAMPLES / 2);
                if !on_edge {
                    continue;
                }
                let px = rect.x + rect.width * i as f32 / SAMPLES as f32;
                let py = rect.y + rect.height * j as f32 / SAMPLES as f32;
                let (x, y) = transform.invert(px, py);
                if let Some((lo, la)) = self.unproject(x, y) {
                    let centre = self.crs.central_longitude();
                    let lo = centre + crate::geo::normalize_longitude(lo - centre);
                    lon = (lon.0.min(lo), lon.1.max(lo));
                    lat = (lat.0.min(la), lat.1.max(la));
                }
            }
        }
        if !lon.0.is_finite() {
            let centre = self.crs.central_longitude();
            return ((centre - 180.0, centre + 180.0), (-90.0, 90.0));
        }
        // A pole inside the map brings every meridian into view.
        for pole in [90.0, -90.0] {
            if let Some((x, y)) = self.project(0.0, pole) {
                if rect.contains(transform.apply(x, y)) && !self.crs.is_cylindrical() {
                    let centre = self.crs.central_longitude();
                    lon = (centre - 180.0, centre + 180.0);
                    lat = (lat.0.min(pole), lat.1.max(pole));
                }
            }
        }
        (lon, lat)
    }

    fn draw_axes(&self, canvas: &mut Canvas, transform: &Transform, theme: &Theme) {
        let rect = transform.rect();
        let [x_min, x_max, y_min, y_max] = transform.extent();
        let stripes_only = self.layers.iter().all(|l| l.kind == LayerKind::Stripes);
        if stripes_only && !self.layers.is_empty() {
            return;
        }

        let x_ticks: Vec<(f64, String)> = if self.time_axis {
            temporal::time_ticks(x_min, x_max)
        } else {
            let values = ticks(x_min, x_max);
            values.iter().map(|v| (*v, format_tick(*v, &values))).collect()
        };
        for (x, label) in x_ticks {
            let (px, _) = transform.apply(x, y_min);
            canvas.stroke_polyline(&[(px, rect.bottom()), (px, rect.bottom() + 4.0)], theme.frame_color, 1.0, None, false);
            canvas.text(label, px, rect.bottom() + 6.0, theme.label_size, theme.text_color, HAlign::Center, VAlign::Top);
        }

        let y_values = ticks(y_min, y_max);
        for y in &y_values {
            let (_, py) = transform.apply(x_min, *y);
            canvas.stroke_polyline(&[(rect.x - 4.0, py), (rect.x, py)], theme.frame_color, 1.0, None, false);
            canvas.text(
                format_tick(*y, &y_values),
                rect.x - 6.0,
                py,
                theme.label_size,
                theme.text_color,
                HAlign::Right,
                VAlign::Middle,
            );
        }
    }

    fn draw_colorbar(
        &self,
        canvas: &mut Canvas,
        strip: PixelRect,
        plot_rect: PixelRect,
        layer: &Layer,
        theme: &Theme,
    ) -> Result<()> {
        let Some(style) = &layer.style else {
            return Ok(());
        };
        let colors = style.level_colors(&layer.levels)?;
        let bins = colors.len().max(1);
        let bar = PixelRect::new(
            plot_rect.x + plot_rect.width * 0.1,
            strip.y + theme.legend_label_size * 0.8,
            plot_rect.width * 0.8,
            theme.legend_thickness,
        );
        let bin_width = bar.width / bins as f32;
        for (i, color) in colors.iter().enumerate() {
            canvas.fill_rect(
                PixelRect::new(bar.x + i as f32 * bin_width, bar.y, bin_width + 0.5, bar.height),
                *color,
            );
        }
        canvas.stroke_rect(bar, theme.frame_color, 1.0);

        let positions = layer.levels.len().saturating_sub(1).max(1) as f32;
        for tick in legend_ticks(&layer.levels, theme.max_ticks) {
            let Some(index) = layer.levels.iter().position(|l| *l == tick) else {
                continue;
            };
            let px = bar.x + bar.width * index as f32 / positions;
            canvas.stroke_polyline(&[(px, bar.bottom()), (px, bar.bottom() + 3.0)], theme.frame_color, 1.0, None, false);
            canvas.text(
                format_tick(tick, &layer.levels),
                px,
                bar.bottom() + 4.0,
                theme.legend_label_size,
                theme.text_color,
                HAlign::Center,
                VAlign::Top,
            );
        }

        let label = match self.legend.as_ref().and_then(|l| l.label.clone()) {
            Some(template) => self.format_string(&template),
            None => {
                let group = LayerGroup::new(vec![layer]);
                let name = group.joined("variable_name", None);
                match unique_join(group.unique_values("units", None)) {
                    units if units.is_empty() => name,
                    units => format!("{} ({})", name, units),
                }
            }
        };
        let (cx, _) = bar.center();
        canvas.text(
            label,
            cx,
            bar.bottom() + theme.legend_label_size * 1.6,
            theme.legend_label_size,
            theme.text_color,
            HAlign::Center,
            VAlign::Top,
        );
        Ok(())
    }

    /// A key of line colours and labels in the top-right corner.
    fn draw_key(&self, canvas: &mut Canvas, plot_rect: PixelRect, theme: &Theme) {
        let entries: Vec<(String, [u8; 4])> = self
            .layers
            .iter()
            .filter(|l| l.xy.is_some() && l.kind != LayerKind::Stripes)
            .map(|l| (l.label(), l.options.color.unwrap_or([0, 0, 0, 255])))
            .collect();
        if entries.is_empty() {
            return;
        }
        let size = theme.label_size;
        let widest = entries
            .iter()
            .map(|(label, _)| canvas.measure_text(label, size).0)
            .fold(0.0f32, f32::max);
        let box_rect = PixelRect::new(
            plot_rect.right() - widest - size * 4.0,
            plot_rect.y + size * 0.5,
            widest + size * 3.5,
            entries.len() as f32 * size * 1.5 + size * 0.5,
        );
        canvas.fill_rect(box_rect, [255, 255, 255, 220]);
        canvas.stroke_rect(box_rect, theme.frame_color, 0.5);
        for (i, (label, color)) in entries.into_iter().enumerate() {
            let y = box_rect.y + size * (1.0 + 1.5 * i as f32);
            canvas.stroke_polyline(&[(box_rect.x + size * 0.5, y), (box_rect.x + size * 2.0, y)], color, 2.0, None, false);
            canvas.text(label, box_rect.x + size * 2.5, y, size, theme.text_color, HAlign::Left, VAlign::Middle);
        }
    }
}

/// Pick a style for a field from plotting options. Without style options
/// the data decide; a schema level setting still applies to sequential
/// styles.
fn choose_style(field: &GriddedField, options: &Value, merged: &Value) -> Result<Style> {
    let explicit = options
        .as_object()
        .is_some_and(|map| STYLE_KEYS.iter().any(|key| map.contains_key(*key)));
    if explicit {
        let default_cmap = merged.get("cmap").and_then(Value::as_str).unwrap_or("viridis");
        return Style::from_options(merged, default_cmap);
    }

    let style = Style::auto(field);
    match (style.level_spec(), merged.get("levels")) {
        (Levels::Auto { divergence_point: None }, Some(levels)) if !levels.is_null() => {
            Ok(style.with_levels(Levels::from_value(levels)?))
        }
        _ => Ok(style),
    }
}

/// Stripes colour each value by an evenly binned, optionally symmetric,
/// range with one bin per colour.
fn stripes_layer(source: Source, options: &Value) -> Result<Layer> {
    let merged = schema::with_schema(|s| s.apply(&["stripes"], options));
    let (x, y) = source.xy()?;

    let colors: Vec<String> = match merged.get("colors") {
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).map(str::to_string).collect(),
        _ => temporal::DEFAULT_COLORS.iter().map(|c| c.to_string()).collect(),
    };
    let style = Style::from_color_list(colors.clone());

    let finite = y.iter().copied().filter(|v| v.is_finite());
    let (min, max) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !min.is_finite() {
        return Err(IsobarError::Data {
            message: format!("'{}' has no finite values to draw as stripes", source.name()),
        });
    }
    let (lower, upper) = if merged.get("diverging").and_then(Value::as_bool).unwrap_or(true) {
        let centre = merged.get("divergence_point").and_then(Value::as_f64).unwrap_or(0.0);
        let reach = (max - centre).abs().max((min - centre).abs());
        (centre - reach, centre + reach)
    } else {
        (min, max)
    };
    let bins = colors.len().max(2);
    let levels: Vec<f64> = if upper > lower {
        (0..=bins).map(|i| lower + (upper - lower) * i as f64 / bins as f64).collect()
    } else {
        vec![lower - 0.5, upper + 0.5]
    };

    Ok(Layer {
        source,
        kind: LayerKind::Stripes,
        style: Some(style.with_levels(Levels::Explicit(levels.clone()))),
        levels,
        grid: None,
        xy: Some((x, y)),
        vectors: None,
        contours: Vec::new(),
        options: LayerOptions::resolve(LayerKind::Stripes, options)?,
    })
}

fn draw_stripes(canvas: &mut Canvas, transform: &Transform, layer: &Layer) -> Result<()> {
    let (Some((_, values)), Some(style)) = (&layer.xy, &layer.style) else {
        return Ok(());
    };
    let colors = style.values_to_colors(values, &layer.levels)?;
    for (i, color) in colors.into_iter().enumerate() {
        let (left, top) = transform.apply(i as f64, 1.0);
        let (right, bottom) = transform.apply(i as f64 + 1.0, 0.0);
        // Overlap by half a pixel so that no seams show between stripes.
        canvas.fill_rect(PixelRect::new(left, top, right - left + 0.5, bottom - top), color);
    }
    Ok(())
}

fn draw_xy(canvas: &mut Canvas, transform: &Transform, layer: &Layer) {
    let Some((x, y)) = &layer.xy else {
        return;
    };
    let color = layer.options.color.unwrap_or([0, 0, 0, 255]);
    match layer.kind {
        LayerKind::Line => {
            let mut run = Vec::new();
            for (x, y) in x.iter().zip(y) {
                if x.is_finite() && y.is_finite() {
                    run.push(transform.apply(*x, *y));
                } else {
                    canvas.stroke_polyline(&run, color, layer.options.width, None, false);
                    run.clear();
                }
            }
            canvas.stroke_polyline(&run, color, layer.options.width, None, false);
        }
        LayerKind::Scatter => {
            for (x, y) in x.iter().zip(y).filter(|(x, y)| x.is_finite() && y.is_finite()) {
                let (px, py) = transform.apply(*x, *y);
                canvas.fill_circle(px, py, (layer.options.size / 2.0).max(1.0), color);
            }
        }
        LayerKind::Bar => {
            let half = bar_width(x, layer.options.width_fraction) / 2.0;
            for (x, y) in x.iter().zip(y).filter(|(x, y)| x.is_finite() && y.is_finite()) {
                let (left, top) = transform.apply(x - half, y.max(0.0));
                let (right, bottom) = transform.apply(x + half, y.min(0.0));
                canvas.fill_rect(PixelRect::new(left, top, right - left, bottom - top), color);
            }
        }
        _ => {}
    }
}

/// Bar width in data units: a fraction of the closest spacing of `x`.
fn bar_width(x: &[f64], fraction: f32) -> f64 {
    let mut sorted: Vec<f64> = x.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(f64::total_cmp);
    let spacing = sorted
        .windows(2)
        .map(|w| w[1] - w[0])
        .filter(|d| *d > 0.0)
        .fold(f64::INFINITY, f64::min);
    let spacing = if spacing.is_finite() { spacing } else { 1.0 };
    spacing * fraction as f64
}

/// Value along a coordinate axis at a fractional index.
fn axis_value(axis: &[f64], index: f64) -> f64 {
    if axis.is_empty() {
        return f64::NAN;
    }
    let i = index.floor().max(0.0) as usize;
    let i = i.min(axis.len() - 1);
    let j = (i + 1).min(axis.len() - 1);
    let fraction = index - i as f64;
    axis[i] + (axis[j] - axis[i]) * fraction
}

/// Round tick values inside `[min, max]`.
fn ticks(min: f64, max: f64) -> Vec<f64> {
    auto_range(min, max, 6, None)
        .into_iter()
        .filter(|v| *v >= min - 1e-9 && *v <= max + 1e-9)
        .collect()
}

fn nice_degree_step(span: f64) -> f64 {
    const STEPS: &[f64] = &[1.0, 2.0, 5.0, 10.0, 15.0, 20.0, 30.0, 45.0, 60.0];
    STEPS
        .iter()
        .copied()
        .find(|step| span / step <= 8.0)
        .unwrap_or(60.0)
}

fn color_option(options: &Value, key: &str, fallback: [u8; 4]) -> Result<[u8; 4]> {
    match options.get(key) {
        Some(Value::String(text)) => parse_color(text),
        _ => Ok(fallback),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::field_from_fn;
    use crate::styles::TRANSPARENT;

    fn field() -> GriddedField {
        let lats: Vec<f64> = (0..=18).map(|i| 90.0 - i as f64 * 10.0).collect();
        let lons: Vec<f64> = (0..36).map(|i| i as f64 * 10.0).collect();
        field_from_fn("2t", lats, lons, |lat, _| 300.0 - lat.abs() as f32 * 0.5)
            .unwrap()
            .with_units("K")
    }

    #[test]
    fn test_plot_gridded_on_map() {
        let mut subplot = Subplot::map(None);
        subplot.pcolormesh(&field(), &json!({})).unwrap();
        let layer = &subplot.layers()[0];
        assert_eq!(layer.kind(), LayerKind::Pcolormesh);
        assert!(layer.levels().len() >= 2);
        assert!(subplot.extent().is_ok());
    }

    #[test]
    fn test_unit_conversion_changes_levels_and_label() {
        let mut subplot = Subplot::new();
        subplot.contourf(&field(), &json!({"units": "degC"})).unwrap();
        let layer = &subplot.layers()[0];
        let max = layer.grid().unwrap().iter().copied().fold(f32::MIN, f32::max);
        assert!((max - 26.85).abs() < 1e-3);
        subplot.title(Some("{variable_name} ({units})")).unwrap();
        assert_eq!(subplot.title_text(), Some("2t (°C)"));
    }

    #[test]
    fn test_gridded_method_needs_field() {
        let series = TimeSeries::from_pairs("s", [("2020-01-01", 1.0)]).unwrap();
        let mut subplot = Subplot::new();
        let err = subplot.plot(PlotMethod::Contour, &Source::from(series), &json!({}));
        assert!(matches!(err, Err(IsobarError::InvalidParameter { .. })));
    }

    #[test]
    fn test_line_colors_follow_colorway() {
        let series = TimeSeries::from_pairs("s", [("2020-01-01", 1.0), ("2020-01-02", 2.0)]).unwrap();
        let mut subplot = Subplot::new();
        subplot.line(series.clone(), &json!({})).unwrap();
        subplot.line(series, &json!({"color": "red"})).unwrap();
        assert_eq!(subplot.layers()[0].options().color, Some([0x63, 0x6e, 0xfa, 255]));
        assert_eq!(subplot.layers()[1].options().color, Some([255, 0, 0, 255]));
    }

    #[test]
    fn test_contour_layers_hold_lines() {
        let mut subplot = Subplot::map(None);
        subplot.contour(&field(), &json!({"levels": [270.0, 280.0, 290.0]})).unwrap();
        assert!(!subplot.layers()[0].contours().is_empty());
    }

    #[test]
    fn test_finishing_steps() {
        let mut subplot = Subplot::new();
        assert!(subplot.apply_finishing("legend").is_err());
        subplot.block(&field(), &json!({})).unwrap();
        subplot.apply_finishing("legend").unwrap();
        subplot.apply_finishing("gridlines").unwrap();
        assert!(subplot.has_legend() && subplot.has_gridlines());
        assert!(matches!(
            subplot.apply_finishing("coastlines"),
            Err(IsobarError::InvalidParameter { .. })
        ));
        assert!(subplot.apply_finishing("sparkles").is_err());
    }

    #[test]
    fn test_missing_coastlines_file() {
        let mut subplot = Subplot::map(None);
        let err = subplot
            .coastlines(&json!({"path": "/nonexistent/coast.geojson"}))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_title_defaults() {
        let mut subplot = Subplot::map(Some(Domain::from_string("France", None).unwrap()));
        subplot.pcolormesh(&field(), &json!({})).unwrap();
        subplot.title(None).unwrap();
        assert_eq!(subplot.title_text(), Some("2t"));
        subplot.title(Some("{domain} in {crs}")).unwrap();
        assert!(subplot.title_text().unwrap().starts_with("France in "));
    }

    #[test]
    fn test_render_draws_data() {
        let mut subplot = Subplot::map(None);
        subplot.pcolormesh(&field(), &json!({})).unwrap();
        subplot.legend(&json!({})).unwrap();
        let mut canvas = Canvas::new(200, 150).unwrap();
        canvas.fill([255, 255, 255, 255]);
        let bounds = canvas.bounds();
        subplot.render(&mut canvas, bounds).unwrap();
        let image = canvas.finish();
        let (w, h) = image.dimensions();
        assert!(image.get_pixel(w / 2, h / 3).0 != [255, 255, 255, 255]);
    }

    #[test]
    fn test_stripes_are_symmetric() {
        let series = TimeSeries::from_pairs(
            "anomaly",
            [("1990-01-01", -0.5), ("1991-01-01", 0.1), ("1992-01-01", 1.0)],
        )
        .unwrap();
        let mut subplot = Subplot::new();
        subplot.stripes(&series, &json!({})).unwrap();
        let levels = subplot.layers()[0].levels();
        assert_eq!(levels.len(), 18);
        assert!((levels[0] + 1.0).abs() < 1e-12);
        assert!((levels[17] - 1.0).abs() < 1e-12);

        let style = subplot.layers()[0].style().unwrap();
        let colors = style.values_to_colors(&[1.0, f64::NAN], levels).unwrap();
        assert_eq!(colors[0], [0x67, 0x00, 0x0d, 255]);
        assert_eq!(colors[1], TRANSPARENT);
    }

    fn wind(u: f32, v: f32) -> VectorField {
        let lats: Vec<f64> = (0..=18).map(|i| 90.0 - i as f64 * 10.0).collect();
        let lons: Vec<f64> = (0..36).map(|i| i as f64 * 10.0).collect();
        let u = field_from_fn("u10", lats.clone(), lons.clone(), move |_, _| u)
            .unwrap()
            .with_units("m s**-1");
        let v = field_from_fn("v10", lats, lons, move |_, _| v).unwrap().with_units("m s**-1");
        VectorField::new(u, v).unwrap()
    }

    /// Pixels a frameless subplot paints over a white canvas.
    fn painted_pixels(subplot: &mut Subplot) -> usize {
        subplot.set_axes(false);
        let mut canvas = Canvas::new(360, 200).unwrap();
        canvas.fill([255, 255, 255, 255]);
        let bounds = canvas.bounds();
        subplot.render(&mut canvas, bounds).unwrap();
        canvas.finish().pixels().filter(|p| p.0 != [255, 255, 255, 255]).count()
    }

    #[test]
    fn test_quiver_draws_uniform_wind() {
        let mut subplot = Subplot::map(None);
        subplot.quiver(&wind(10.0, 5.0), &json!({})).unwrap();
        let layer = &subplot.layers()[0];
        assert_eq!(layer.kind(), LayerKind::Quiver);
        assert!(layer.levels().is_empty());
        let (u, _) = layer.vectors().unwrap();
        assert_eq!(u[[3, 3]], 10.0);
        assert!(painted_pixels(&mut subplot) > 50);
    }

    #[test]
    fn test_barbs_draw_uniform_wind() {
        let mut subplot = Subplot::map(None);
        subplot.barbs(&wind(-20.0, 0.0), &json!({"units": "knots"})).unwrap();
        let (u, v) = subplot.layers()[0].vectors().unwrap();
        assert!((u[[0, 0]] + 38.877).abs() < 1e-2);
        assert_eq!(v[[0, 0]], 0.0);
        subplot.title(Some("{variable_name} ({units})")).unwrap();
        assert_eq!(subplot.title_text(), Some("u10 and v10 (kt)"));
        assert!(painted_pixels(&mut subplot) > 50);
    }

    #[test]
    fn test_calm_wind_still_marks_points() {
        let mut calm = Subplot::map(None);
        calm.barbs(&wind(0.0, 0.0), &json!({})).unwrap();
        assert!(painted_pixels(&mut calm) > 0);

        // Arrows have no length without any wind.
        let mut still = Subplot::map(None);
        still.quiver(&wind(0.0, 0.0), &json!({})).unwrap();
        assert_eq!(painted_pixels(&mut still), 0);
    }

    #[test]
    fn test_quiver_coloured_by_speed() {
        let mut subplot = Subplot::new();
        subplot.quiver(&wind(3.0, 4.0), &json!({"cmap": "viridis", "levels": [0, 2, 4, 6]})).unwrap();
        let layer = &subplot.layers()[0];
        assert_eq!(layer.levels(), &[0.0, 2.0, 4.0, 6.0]);
        assert_eq!(layer.grid().unwrap()[[0, 0]], 5.0);
        assert!(subplot.colorbar_layer().is_some());
        assert_eq!(subplot.extent().unwrap(), [0.0, 350.0, -90.0, 90.0]);
    }

    #[test]
    fn test_wind_methods_need_components() {
        let mut subplot = Subplot::map(None);
        let err = subplot.plot(PlotMethod::Barbs, &Source::from(field()), &json!({}));
        assert!(matches!(err, Err(IsobarError::InvalidParameter { .. })));
        let err = subplot.plot(PlotMethod::Contour, &Source::from(wind(1.0, 1.0)), &json!({}));
        assert!(matches!(err, Err(IsobarError::InvalidParameter { .. })));
        subplot.plot(PlotMethod::Quiver, &Source::from(wind(1.0, 1.0)), &json!({})).unwrap();
    }

    #[test]
    fn test_page_vector_on_map() {
        let subplot = Subplot::map(None);
        let transform = Transform::new([-180.0, 180.0, -90.0, 90.0], PixelRect::new(0.0, 0.0, 360.0, 180.0));
        let (u, v) = subplot.page_vector(&transform, 10.0, 45.0, 0.0, 7.0).unwrap();
        assert!(u.abs() < 1e-3);
        assert!((v - 7.0).abs() < 1e-3);
    }

    #[test]
    fn test_bar_width_and_axis_value() {
        assert_eq!(bar_width(&[0.0, 2.0, 3.0], 0.5), 0.5);
        assert_eq!(bar_width(&[1.0], 0.8), 0.8);
        assert_eq!(axis_value(&[0.0, 10.0, 20.0], 1.5), 15.0);
    }
}

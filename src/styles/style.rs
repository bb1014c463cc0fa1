//! Styles: how values turn into colours.

use ndarray::{Array2, ArrayView2};
use serde_json::Value;
use tracing::debug;

use super::colormap::{get_colormap, parse_color, Colormap, ListedColormap};
use super::levels::Levels;
use super::units;
use crate::error::{IsobarError, Result};
use crate::schema;
use crate::sources::GriddedField;

/// Colour used for missing values.
pub const TRANSPARENT: [u8; 4] = [0, 0, 0, 0];

/// Where a style's colours come from.
#[derive(Debug, Clone, PartialEq)]
pub enum ColorSpec {
    /// A named colormap, e.g. `"viridis"` or `"RdBu_r"`.
    Named(String),
    /// Explicit CSS colours. When there are exactly as many colours as
    /// bins they are used one per bin; otherwise they are blended.
    List(Vec<String>),
}

/// Colours, levels and units for drawing a field.
#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    colors: ColorSpec,
    levels: Levels,
    units: Option<String>,
    units_label: Option<String>,
}

impl Default for Style {
    fn default() -> Self {
        let cmap = schema::with_schema(|s| s.get_str("pcolormesh.cmap"))
            .unwrap_or_else(|| "viridis".to_string());
        Self::new(cmap)
    }
}

impl Style {
    /// A style over a named colormap with automatic levels.
    pub fn new(cmap: impl Into<String>) -> Self {
        Self {
            colors: ColorSpec::Named(cmap.into()),
            levels: Levels::default(),
            units: None,
            units_label: None,
        }
    }

    /// A style over an explicit list of colours.
    pub fn from_color_list<S: Into<String>>(colors: impl IntoIterator<Item = S>) -> Self {
        Self {
            colors: ColorSpec::List(colors.into_iter().map(Into::into).collect()),
            ..Self::new("viridis")
        }
    }

    /// A diverging style centred on `divergence_point`, using the schema's
    /// diverging colormap.
    pub fn diverging(divergence_point: f64) -> Self {
        let cmap = schema::with_schema(|s| s.get_str("diverging.cmap"))
            .unwrap_or_else(|| "RdBu_r".to_string());
        Self::new(cmap).with_levels(Levels::Auto {
            divergence_point: Some(divergence_point),
        })
    }

    /// Pick a style for a field: diverging around zero when the data
    /// straddle it, sequential otherwise.
    pub fn auto(field: &GriddedField) -> Self {
        match field.value_range() {
            Some((min, max)) if min < 0.0 && max > 0.0 => {
                debug!(field = field.name(), min, max, "Using a diverging style");
                Self::diverging(0.0)
            }
            _ => Self::default(),
        }
    }

    /// Build a style from plotting options. Recognised keys are `cmap`
    /// (or `colormap`), `colors`, `levels`, `divergence_point`, `units` and
    /// `units_label`. Missing colours fall back to `default_cmap`.
    pub fn from_options(options: &Value, default_cmap: &str) -> Result<Self> {
        let colors = match options.get("colors").or_else(|| options.get("cmap")).or_else(|| options.get("colormap")) {
            Some(Value::String(name)) => ColorSpec::Named(name.clone()),
            Some(Value::Array(items)) => ColorSpec::List(
                items
                    .iter()
                    .map(|item| {
                        item.as_str()
                            .map(str::to_string)
                            .ok_or_else(|| IsobarError::invalid("colors", format!("expected a colour string, got {}", item)))
                    })
                    .collect::<Result<Vec<_>>>()?,
            ),
            Some(Value::Null) | None => ColorSpec::Named(default_cmap.to_string()),
            Some(other) => {
                return Err(IsobarError::invalid("colors", format!("cannot read colours from {}", other)))
            }
        };

        let mut levels = Levels::from_value(options.get("levels").unwrap_or(&Value::Null))?;
        if let (Levels::Auto { .. }, Some(point)) = (&levels, options.get("divergence_point").and_then(Value::as_f64)) {
            levels = Levels::Auto {
                divergence_point: Some(point),
            };
        }

        Ok(Self {
            colors,
            levels,
            units: options.get("units").and_then(Value::as_str).map(str::to_string),
            units_label: options.get("units_label").and_then(Value::as_str).map(str::to_string),
        })
    }

    pub fn with_levels(mut self, levels: Levels) -> Self {
        self.levels = levels;
        self
    }

    /// Plot in these units, converting data on the way in.
    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }

    pub fn with_units_label(mut self, label: impl Into<String>) -> Self {
        self.units_label = Some(label.into());
        self
    }

    pub fn color_spec(&self) -> &ColorSpec {
        &self.colors
    }

    pub fn level_spec(&self) -> &Levels {
        &self.levels
    }

    /// Target units, if this style converts data.
    pub fn target_units(&self) -> Option<&str> {
        self.units.as_deref()
    }

    /// Units as shown in titles and legends.
    pub fn units_label(&self) -> Option<String> {
        self.units_label
            .clone()
            .or_else(|| self.units.as_deref().map(units::format_units))
    }

    /// The continuous colormap behind this style.
    pub fn colormap(&self) -> Result<Box<dyn Colormap>> {
        match &self.colors {
            ColorSpec::Named(name) => get_colormap(name),
            ColorSpec::List(colors) => {
                let stops: Vec<&str> = colors.iter().map(String::as_str).collect();
                super::colormap::from_colors(&stops)
            }
        }
    }

    /// Levels for some data (NaNs ignored).
    pub fn levels(&self, data: impl IntoIterator<Item = f64>) -> Result<Vec<f64>> {
        self.levels.apply(data)
    }

    /// Levels for a grid of values.
    pub fn levels_for_grid(&self, values: ArrayView2<'_, f32>) -> Result<Vec<f64>> {
        self.levels(values.iter().map(|v| *v as f64))
    }

    fn converter(&self, source_units: Option<&str>, short_name: &str) -> Result<Option<Box<dyn Fn(f64) -> f64>>> {
        let (target, source) = match (self.units.as_deref(), source_units) {
            (Some(target), Some(source)) => (target, source),
            _ => return Ok(None),
        };
        // Anomalies are differences; K and °C anomalies are the same numbers.
        if short_name.to_lowercase().contains("anomaly")
            && units::anomaly_equivalence(source)
            && units::anomaly_equivalence(target)
        {
            return Ok(None);
        }
        if units::are_equal(source, target) {
            return Ok(None);
        }
        debug!(source, target, "Converting units");
        Ok(Some(Box::new(units::converter(source, target)?)))
    }

    /// Convert gridded values from `source_units` into this style's units.
    pub fn convert_units(&self, values: &mut Array2<f32>, source_units: Option<&str>, short_name: &str) -> Result<()> {
        if let Some(convert) = self.converter(source_units, short_name)? {
            values.mapv_inplace(|v| convert(v as f64) as f32);
        }
        Ok(())
    }

    /// Convert series values from `source_units` into this style's units.
    pub fn convert_series(&self, values: &mut [f64], source_units: Option<&str>, short_name: &str) -> Result<()> {
        if let Some(convert) = self.converter(source_units, short_name)? {
            values.iter_mut().for_each(|v| *v = convert(*v));
        }
        Ok(())
    }

    /// One colour per bin between consecutive `levels`.
    pub fn level_colors(&self, levels: &[f64]) -> Result<Vec<[u8; 4]>> {
        let bins = levels.len().saturating_sub(1).max(1);

        if let ColorSpec::List(colors) = &self.colors {
            if colors.len() == bins {
                return colors.iter().map(|c| parse_color(c)).collect();
            }
        }

        let cmap = self.colormap()?;
        Ok((0..bins)
            .map(|i| {
                let t = if bins == 1 { 0.5 } else { i as f32 / (bins - 1) as f32 };
                cmap.map_normalized(t)
            })
            .collect())
    }

    /// A discrete colormap matching [`level_colors`](Self::level_colors).
    pub fn listed_colormap(&self, levels: &[f64]) -> Result<ListedColormap> {
        let name = match &self.colors {
            ColorSpec::Named(name) => name.clone(),
            ColorSpec::List(_) => "custom".to_string(),
        };
        ListedColormap::new(name, self.level_colors(levels)?)
    }

    /// Map values to colours on the bins defined by `levels`. Values beyond
    /// the outer levels take the outermost colours; NaN is transparent.
    pub fn values_to_colors(&self, values: &[f64], levels: &[f64]) -> Result<Vec<[u8; 4]>> {
        let colors = self.level_colors(levels)?;
        Ok(values
            .iter()
            .map(|v| match bin_index(*v, levels) {
                Some(i) => colors[i.min(colors.len() - 1)],
                None => TRANSPARENT,
            })
            .collect())
    }
}

/// The bin of `levels` that `value` falls in, clamped to the outer bins.
pub fn bin_index(value: f64, levels: &[f64]) -> Option<usize> {
    if value.is_nan() {
        return None;
    }
    let bins = levels.len().saturating_sub(1);
    if bins == 0 {
        return Some(0);
    }
    let above = levels.partition_point(|level| *level <= value);
    Some(above.saturating_sub(1).min(bins - 1))
}

/// At most `max_ticks` of `levels` for labelling a colorbar, always
/// keeping the first.
pub fn legend_ticks(levels: &[f64], max_ticks: usize) -> Vec<f64> {
    let max_ticks = max_ticks.max(2);
    if levels.len() <= max_ticks {
        return levels.to_vec();
    }
    let stride = (levels.len() + max_ticks - 1) / max_ticks;
    levels.iter().copied().step_by(stride).collect()
}

/// Format a tick label with no more decimals than the levels need.
pub fn format_tick(value: f64, levels: &[f64]) -> String {
    let step = levels
        .windows(2)
        .map(|w| (w[1] - w[0]).abs())
        .filter(|d| *d > 0.0)
        .fold(f64::INFINITY, f64::min);
    let decimals = if step.is_finite() {
        (0..6)
            .find(|d| {
                let scaled = step * 10f64.powi(*d);
                (scaled - scaled.round()).abs() < 1e-6
            })
            .unwrap_or(6) as usize
    } else {
        0
    };
    let text = format!("{:.*}", decimals, value);
    // Avoid "-0".
    if text.trim_start_matches('-').chars().all(|c| c == '0' || c == '.') {
        text.trim_start_matches('-').to_string()
    } else {
        text
    }
}

//! Colormap trait and utilities.
//!
//! Named maps are backed by `colorgrad` presets. A `_r` suffix reverses any
//! named map, so `"RdBu_r"` runs from red to blue.

use colorgrad::{Color, CustomGradient, Gradient};

use crate::error::{IsobarError, Result};

/// Trait for color mapping implementations
pub trait Colormap {
    /// Map a normalized value (0.0 to 1.0) to an RGBA color
    fn map_normalized(&self, value: f32) -> [u8; 4];

    /// Map a value to an RGBA color given the data range
    fn map(&self, value: f32, min: f32, max: f32) -> [u8; 4] {
        let normalized = if max > min {
            ((value - min) / (max - min)).clamp(0.0, 1.0)
        } else {
            0.5
        };
        self.map_normalized(normalized)
    }

    /// Get the name of this colormap
    fn name(&self) -> &str;
}

/// A continuous colormap sampled from a `colorgrad` gradient.
pub struct GradientColormap {
    name: String,
    gradient: Gradient,
    reversed: bool,
}

impl GradientColormap {
    pub fn new(name: impl Into<String>, gradient: Gradient) -> Self {
        Self {
            name: name.into(),
            gradient,
            reversed: false,
        }
    }

    pub fn reversed(mut self) -> Self {
        self.reversed = !self.reversed;
        if self.reversed {
            self.name.push_str("_r");
        } else if let Some(stripped) = self.name.strip_suffix("_r") {
            self.name = stripped.to_string();
        }
        self
    }
}

impl Colormap for GradientColormap {
    fn map_normalized(&self, value: f32) -> [u8; 4] {
        let t = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
        let t = if self.reversed { 1.0 - t } else { t };
        self.gradient.at(t as f64).to_rgba8()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A discrete colormap: the unit interval is split into equal bins, one per
/// colour.
#[derive(Debug, Clone, PartialEq)]
pub struct ListedColormap {
    name: String,
    colors: Vec<[u8; 4]>,
}

impl ListedColormap {
    pub fn new(name: impl Into<String>, colors: Vec<[u8; 4]>) -> Result<Self> {
        if colors.is_empty() {
            return Err(IsobarError::invalid("colors", "a colormap needs at least one colour"));
        }
        Ok(Self {
            name: name.into(),
            colors,
        })
    }

    pub fn colors(&self) -> &[[u8; 4]] {
        &self.colors
    }
}

impl Colormap for ListedColormap {
    fn map_normalized(&self, value: f32) -> [u8; 4] {
        let t = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
        let n = self.colors.len();
        let index = ((t * n as f32) as usize).min(n - 1);
        self.colors[index]
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Get a colormap by name
pub fn get_colormap(name: &str) -> Result<Box<dyn Colormap>> {
    let (base, reverse) = match name.strip_suffix("_r") {
        Some(base) => (base, true),
        None => (name, false),
    };

    let gradient = match base.to_lowercase().replace(['-', '_'], "").as_str() {
        "viridis" => colorgrad::viridis(),
        "plasma" => colorgrad::plasma(),
        "inferno" => colorgrad::inferno(),
        "magma" => colorgrad::magma(),
        "turbo" => colorgrad::turbo(),
        "cividis" => colorgrad::cividis(),
        "rdbu" => colorgrad::rd_bu(),
        "rdylbu" => colorgrad::rd_yl_bu(),
        "brbg" => colorgrad::br_bg(),
        "spectral" => colorgrad::spectral(),
        "greys" | "grays" => colorgrad::greys(),
        "blues" => colorgrad::blues(),
        "reds" => colorgrad::reds(),
        "greens" => colorgrad::greens(),
        "oranges" => colorgrad::oranges(),
        "purples" => colorgrad::purples(),
        "ylorrd" => colorgrad::yl_or_rd(),
        "rainbow" => colorgrad::rainbow(),
        "coolwarm" => coolwarm()?,
        _ => {
            return Err(IsobarError::invalid(
                "colormap",
                format!("Unknown colormap: {}", name),
            ))
        }
    };

    let colormap = GradientColormap::new(base, gradient);
    Ok(Box::new(if reverse { colormap.reversed() } else { colormap }))
}

/// A continuous colormap through the given colours, evenly spaced.
pub fn from_colors(colors: &[&str]) -> Result<Box<dyn Colormap>> {
    if colors.is_empty() {
        return Err(IsobarError::invalid("colors", "a colormap needs at least one colour"));
    }
    // A single colour still needs two stops.
    let stops: Vec<&str> = if colors.len() == 1 {
        vec![colors[0], colors[0]]
    } else {
        colors.to_vec()
    };
    let gradient = CustomGradient::new()
        .html_colors(&stops)
        .build()
        .map_err(|e| IsobarError::invalid("colors", e.to_string()))?;
    Ok(Box::new(GradientColormap::new("custom", gradient)))
}

/// Matplotlib's `coolwarm` anchors.
fn coolwarm() -> Result<Gradient> {
    CustomGradient::new()
        .html_colors(&["#3b4cc0", "#8db0fe", "#dddddd", "#f49a7b", "#b40426"])
        .build()
        .map_err(|e| IsobarError::invalid("colormap", e.to_string()))
}

/// Parse a CSS colour (`"#ff0000"`, `"red"`, `"rgb(255,0,0)"`) to RGBA.
pub fn parse_color(text: &str) -> Result<[u8; 4]> {
    Color::from_html(text)
        .map(|c| c.to_rgba8())
        .map_err(|e| IsobarError::invalid("color", format!("'{}': {}", text, e)))
}

/// Parse a colour, falling back to `fallback` when the text is not a colour.
pub fn parse_color_or(text: Option<&str>, fallback: [u8; 4]) -> [u8; 4] {
    text.and_then(|t| parse_color(t).ok()).unwrap_or(fallback)
}

/// Linear interpolation between two colors
pub fn lerp_color(c1: [u8; 4], c2: [u8; 4], t: f32) -> [u8; 4] {
    let t = t.clamp(0.0, 1.0);
    let mut out = [0u8; 4];
    for i in 0..4 {
        out[i] = (c1[i] as f32 * (1.0 - t) + c2[i] as f32 * t) as u8;
    }
    out
}

//! Warming stripes.

use serde_json::Value;
use std::ops::Deref;

use crate::components::{Figure, Subplot};
use crate::error::Result;
use crate::sources::TimeSeries;

/// Blue through white to red, one colour per stripe bin.
pub const DEFAULT_COLORS: [&str; 17] = [
    "#08306b", "#08519c", "#2171b5", "#4292c6", "#6baed6", "#9ecae1", "#c6dbef", "#deebf7", "#ffffff",
    "#fee0d2", "#fcbba1", "#fc9272", "#fb6a4a", "#ef3b2c", "#cb181d", "#a50f15", "#67000d",
];

/// Default figure size for stripes, in pixels.
pub const DEFAULT_SIZE: (u32, u32) = (800, 300);

/// A frameless subplot of full-height stripes, one per value.
#[derive(Debug, Clone)]
pub struct Stripes {
    subplot: Subplot,
}

impl Default for Stripes {
    fn default() -> Self {
        Self::new()
    }
}

impl Stripes {
    pub fn new() -> Self {
        let mut subplot = Subplot::new();
        subplot.set_axes(false);
        Self { subplot }
    }

    /// Add stripes. The schema's stripe palette applies unless `options`
    /// names `colors`; `diverging` and `divergence_point` centre the
    /// colour range.
    pub fn stripes(&mut self, series: &TimeSeries, options: &Value) -> Result<&mut Self> {
        self.subplot.stripes(series, options)?;
        Ok(self)
    }

    pub fn title(&mut self, label: Option<&str>) -> Result<&mut Self> {
        self.subplot.title(label)?;
        Ok(self)
    }

    pub fn into_subplot(self) -> Subplot {
        self.subplot
    }

    pub fn into_figure(self) -> Result<Figure> {
        let mut figure = Figure::default().with_size(DEFAULT_SIZE.0, DEFAULT_SIZE.1);
        figure.push_subplot(self.subplot)?;
        Ok(figure)
    }
}

impl Deref for Stripes {
    type Target = Subplot;

    fn deref(&self) -> &Subplot {
        &self.subplot
    }
}

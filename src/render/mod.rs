//! Raster drawing primitives.
//!
//! Figures are drawn onto a [`Canvas`], a `tiny-skia` pixmap with text
//! queued and rasterised last. A [`Transform`] maps projected map or axis
//! coordinates onto a pixel rectangle of the canvas. Wind glyphs are
//! built as page-space geometry in [`vectors`].

pub mod canvas;
pub mod contour;
pub mod raster;
pub mod text;
pub mod vectors;

pub use canvas::{Canvas, HAlign, VAlign};
pub use contour::{connect_segments, filled_band_mask, march_squares, smooth_polyline, Contour, Point, Segment};
pub use raster::{rasterize, GridSampler};
pub use vectors::{arrow, barb, glyph_positions, uv_to_speed_direction, BarbIncrements, Glyph};

/// An axis-aligned rectangle in pixel coordinates (y grows downwards).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PixelRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn contains(&self, (x, y): (f32, f32)) -> bool {
        x >= self.x && x <= self.right() && y >= self.y && y <= self.bottom()
    }

    /// Shrink by `left`, `top`, `right`, `bottom` pixels; never below zero size.
    pub fn inset(&self, left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            x: self.x + left,
            y: self.y + top,
            width: (self.width - left - right).max(0.0),
            height: (self.height - top - bottom).max(0.0),
        }
    }

    /// The largest rectangle of the given aspect ratio (width / height)
    /// centred inside this one.
    pub fn fit_aspect(&self, aspect: f64) -> Self {
        if !(aspect.is_finite() && aspect > 0.0) || self.height <= 0.0 {
            return *self;
        }
        let own = self.width as f64 / self.height as f64;
        if own > aspect {
            let width = (self.height as f64 * aspect) as f32;
            Self::new(self.x + (self.width - width) / 2.0, self.y, width, self.height)
        } else {
            let height = (self.width as f64 / aspect) as f32;
            Self::new(self.x, self.y + (self.height - height) / 2.0, self.width, height)
        }
    }
}

/// Affine mapping from a data extent `[x_min, x_max, y_min, y_max]` onto a
/// pixel rectangle, with y flipped so that larger values sit higher.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    extent: [f64; 4],
    rect: PixelRect,
}

impl Transform {
    pub fn new(extent: [f64; 4], rect: PixelRect) -> Self {
        Self { extent, rect }
    }

    pub fn extent(&self) -> [f64; 4] {
        self.extent
    }

    pub fn rect(&self) -> PixelRect {
        self.rect
    }

    fn spans(&self) -> (f64, f64) {
        let [x_min, x_max, y_min, y_max] = self.extent;
        let dx = if x_max != x_min { x_max - x_min } else { 1.0 };
        let dy = if y_max != y_min { y_max - y_min } else { 1.0 };
        (dx, dy)
    }

    /// Data coordinates to pixels.
    pub fn apply(&self, x: f64, y: f64) -> (f32, f32) {
        let [x_min, _, _, y_max] = self.extent;
        let (dx, dy) = self.spans();
        let px = self.rect.x as f64 + (x - x_min) / dx * self.rect.width as f64;
        let py = self.rect.y as f64 + (y_max - y) / dy * self.rect.height as f64;
        (px as f32, py as f32)
    }

    /// Pixels to data coordinates.
    pub fn invert(&self, px: f32, py: f32) -> (f64, f64) {
        let [x_min, _, _, y_max] = self.extent;
        let (dx, dy) = self.spans();
        let x = x_min + (px - self.rect.x) as f64 / self.rect.width.max(f32::EPSILON) as f64 * dx;
        let y = y_max - (py - self.rect.y) as f64 / self.rect.height.max(f32::EPSILON) as f64 * dy;
        (x, y)
    }
}

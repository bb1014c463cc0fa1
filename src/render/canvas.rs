//! An RGBA drawing surface.

use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_text_mut;
use rusttype::Scale;
use tiny_skia::{
    ColorU8, FillRule, FilterQuality, LineCap, LineJoin, Mask, Paint, PathBuilder, Pixmap, PixmapPaint,
    Rect, Stroke, StrokeDash,
};
use tracing::debug;

use super::{text, PixelRect};
use crate::error::{IsobarError, Result};

/// Horizontal text alignment relative to the anchor point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HAlign {
    Left,
    Center,
    Right,
}

/// Vertical text alignment relative to the anchor point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VAlign {
    Top,
    Middle,
    Bottom,
}

#[derive(Debug, Clone)]
struct TextItem {
    text: String,
    x: f32,
    y: f32,
    size: f32,
    color: [u8; 4],
    halign: HAlign,
    valign: VAlign,
}

/// A raster canvas. Shapes are drawn immediately with anti-aliasing; text
/// is queued and drawn over everything by [`finish`](Canvas::finish).
pub struct Canvas {
    pixmap: Pixmap,
    clip: Option<Mask>,
    texts: Vec<TextItem>,
    text_scale: f32,
}

fn paint(color: [u8; 4]) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(color[0], color[1], color[2], color[3]);
    paint.anti_alias = true;
    paint
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let pixmap = Pixmap::new(width, height).ok_or_else(|| IsobarError::Render {
            message: format!("cannot create a {}x{} canvas", width, height),
        })?;
        Ok(Self {
            pixmap,
            clip: None,
            texts: Vec::new(),
            text_scale: 1.0,
        })
    }

    /// Scale every text size by `scale`, e.g. 1.5 for a 150 dpi figure.
    pub fn set_text_scale(&mut self, scale: f32) {
        if scale.is_finite() && scale > 0.0 {
            self.text_scale = scale;
        }
    }

    /// Restrict shape drawing to `rect`; `None` lifts the restriction.
    /// Queued text is never clipped.
    pub fn set_clip(&mut self, rect: Option<PixelRect>) {
        self.clip = rect.and_then(|r| {
            let mut mask = Mask::new(self.pixmap.width(), self.pixmap.height())?;
            let path = PathBuilder::from_rect(Rect::from_xywh(r.x, r.y, r.width, r.height)?);
            mask.fill_path(&path, FillRule::Winding, false, tiny_skia::Transform::identity());
            Some(mask)
        });
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// The whole canvas as a rectangle.
    pub fn bounds(&self) -> PixelRect {
        PixelRect::new(0.0, 0.0, self.width() as f32, self.height() as f32)
    }

    /// Number of text items waiting for [`finish`](Self::finish).
    pub fn queued_text(&self) -> usize {
        self.texts.len()
    }

    pub fn fill(&mut self, color: [u8; 4]) {
        self.pixmap
            .fill(tiny_skia::Color::from_rgba8(color[0], color[1], color[2], color[3]));
    }

    pub fn fill_rect(&mut self, rect: PixelRect, color: [u8; 4]) {
        if let Some(r) = Rect::from_xywh(rect.x, rect.y, rect.width, rect.height) {
            self.pixmap
                .fill_rect(r, &paint(color), tiny_skia::Transform::identity(), self.clip.as_ref());
        }
    }

    pub fn stroke_rect(&mut self, rect: PixelRect, color: [u8; 4], width: f32) {
        let corners = [
            (rect.x, rect.y),
            (rect.right(), rect.y),
            (rect.right(), rect.bottom()),
            (rect.x, rect.bottom()),
        ];
        self.stroke_polyline(&corners, color, width, None, true);
    }

    /// Stroke a polyline. `dash` is an on/off pattern in pixels.
    pub fn stroke_polyline(
        &mut self,
        points: &[(f32, f32)],
        color: [u8; 4],
        width: f32,
        dash: Option<&[f32]>,
        closed: bool,
    ) {
        if points.len() < 2 || width <= 0.0 {
            return;
        }
        let mut pb = PathBuilder::new();
        pb.move_to(points[0].0, points[0].1);
        for &(x, y) in &points[1..] {
            pb.line_to(x, y);
        }
        if closed {
            pb.close();
        }
        let Some(path) = pb.finish() else {
            return;
        };

        let mut stroke = Stroke {
            width,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Stroke::default()
        };
        if let Some(pattern) = dash {
            stroke.dash = StrokeDash::new(pattern.to_vec(), 0.0);
        }
        self.pixmap
            .stroke_path(&path, &paint(color), &stroke, tiny_skia::Transform::identity(), self.clip.as_ref());
    }

    /// Fill one or more rings as a single shape; holes follow the even-odd
    /// rule.
    pub fn fill_polygon(&mut self, rings: &[Vec<(f32, f32)>], color: [u8; 4]) {
        let mut pb = PathBuilder::new();
        for ring in rings.iter().filter(|ring| ring.len() >= 3) {
            pb.move_to(ring[0].0, ring[0].1);
            for &(x, y) in &ring[1..] {
                pb.line_to(x, y);
            }
            pb.close();
        }
        if let Some(path) = pb.finish() {
            self.pixmap.fill_path(
                &path,
                &paint(color),
                FillRule::EvenOdd,
                tiny_skia::Transform::identity(),
                self.clip.as_ref(),
            );
        }
    }

    pub fn fill_circle(&mut self, x: f32, y: f32, radius: f32, color: [u8; 4]) {
        if let Some(path) = PathBuilder::from_circle(x, y, radius) {
            self.pixmap.fill_path(
                &path,
                &paint(color),
                FillRule::Winding,
                tiny_skia::Transform::identity(),
                self.clip.as_ref(),
            );
        }
    }

    /// Draw an image scaled into `rect`. `smooth` selects bilinear
    /// filtering; otherwise pixels stay crisp.
    pub fn draw_image(&mut self, image: &RgbaImage, rect: PixelRect, smooth: bool) -> Result<()> {
        if image.width() == 0 || image.height() == 0 || rect.width <= 0.0 || rect.height <= 0.0 {
            return Ok(());
        }
        let source = image_to_pixmap(image)?;
        let scale_x = rect.width / image.width() as f32;
        let scale_y = rect.height / image.height() as f32;
        let paint = PixmapPaint {
            quality: if smooth {
                FilterQuality::Bilinear
            } else {
                FilterQuality::Nearest
            },
            ..PixmapPaint::default()
        };
        self.pixmap.draw_pixmap(
            0,
            0,
            source.as_ref(),
            &paint,
            tiny_skia::Transform::from_row(scale_x, 0.0, 0.0, scale_y, rect.x, rect.y),
            self.clip.as_ref(),
        );
        Ok(())
    }

    /// Queue text anchored at `(x, y)`.
    #[allow(clippy::too_many_arguments)]
    pub fn text(
        &mut self,
        text: impl Into<String>,
        x: f32,
        y: f32,
        size: f32,
        color: [u8; 4],
        halign: HAlign,
        valign: VAlign,
    ) {
        let text = text.into();
        let size = size * self.text_scale;
        if text.is_empty() || size <= 0.0 {
            return;
        }
        self.texts.push(TextItem {
            text,
            x,
            y,
            size,
            color,
            halign,
            valign,
        });
    }

    /// Width and height that `text` will occupy.
    pub fn measure_text(&self, text: &str, size: f32) -> (f32, f32) {
        text::measure(text::font().as_ref(), text, size * self.text_scale)
    }

    /// Flatten to an image, drawing queued text on top.
    pub fn finish(self) -> RgbaImage {
        let (width, height) = (self.pixmap.width(), self.pixmap.height());
        let mut raw = Vec::with_capacity((width * height * 4) as usize);
        for pixel in self.pixmap.pixels() {
            let c = pixel.demultiply();
            raw.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
        }
        let mut image = RgbaImage::from_raw(width, height, raw)
            .unwrap_or_else(|| RgbaImage::new(width, height));

        if self.texts.is_empty() {
            return image;
        }
        let Some(font) = text::font() else {
            debug!(skipped = self.texts.len(), "No font available; skipping text");
            return image;
        };

        for item in &self.texts {
            let (w, h) = text::measure(Some(&font), &item.text, item.size);
            let x = match item.halign {
                HAlign::Left => item.x,
                HAlign::Center => item.x - w / 2.0,
                HAlign::Right => item.x - w,
            };
            let y = match item.valign {
                VAlign::Top => item.y,
                VAlign::Middle => item.y - h / 2.0,
                VAlign::Bottom => item.y - h,
            };
            draw_text_mut(
                &mut image,
                Rgba(item.color),
                x.round() as i32,
                y.round() as i32,
                Scale::uniform(item.size),
                &font,
                &item.text,
            );
        }
        image
    }
}

fn image_to_pixmap(image: &RgbaImage) -> Result<Pixmap> {
    let mut pixmap = Pixmap::new(image.width(), image.height()).ok_or_else(|| IsobarError::Render {
        message: format!("cannot create a {}x{} pixmap", image.width(), image.height()),
    })?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(image.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Ok(pixmap)
}
